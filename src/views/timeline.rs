//! Timeline of conflicts as bars spanning their years.

use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};

use crate::data::{format_number, ConflictRecord};
use crate::filters::{highlight_opacity, FilterState};
use crate::scales::{LinearScale, LogScale, ValueScale};

use super::{frame, shade, ChartView};

/// Domain used when the filtered data has no deaths at all.
const FALLBACK_MAX: f64 = 1_000_000.0;
/// Lower bound of the log axis.
const LOG_FLOOR: f64 = 1000.0;
/// Narrowest bar, in years.
const MIN_BAR_YEARS: f64 = 2.0;

/// A named window of history the timeline can zoom to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimelinePeriod {
    #[default]
    All,
    TwentiethCentury,
    WorldWars,
    ColdWar,
}

impl TimelinePeriod {
    pub fn bounds(&self) -> (i32, i32) {
        match self {
            TimelinePeriod::All => (700, 2030),
            TimelinePeriod::TwentiethCentury => (1900, 2000),
            TimelinePeriod::WorldWars => (1914, 1945),
            TimelinePeriod::ColdWar => (1945, 1991),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimelinePeriod::All => "Full History",
            TimelinePeriod::TwentiethCentury => "20th Century",
            TimelinePeriod::WorldWars => "World Wars Era",
            TimelinePeriod::ColdWar => "Cold War Era",
        }
    }

    pub fn next(&self) -> TimelinePeriod {
        match self {
            TimelinePeriod::All => TimelinePeriod::TwentiethCentury,
            TimelinePeriod::TwentiethCentury => TimelinePeriod::WorldWars,
            TimelinePeriod::WorldWars => TimelinePeriod::ColdWar,
            TimelinePeriod::ColdWar => TimelinePeriod::All,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimelineBar {
    pub name: String,
    pub start_year: f64,
    pub end_year: f64,
    /// Bar height as a share of the plot height
    pub height: f64,
    pub color: (u8, u8, u8),
    pub opacity: f64,
}

#[derive(Clone, Debug, Default)]
pub struct TimelineView {
    period: TimelinePeriod,
    log_scale: bool,
    data: Vec<ConflictRecord>,
    selected: Option<String>,
    bars: Vec<TimelineBar>,
    max_deaths: f64,
}

impl TimelineView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self) -> TimelinePeriod {
        self.period
    }

    pub fn is_log(&self) -> bool {
        self.log_scale
    }

    pub fn bars(&self) -> &[TimelineBar] {
        &self.bars
    }

    fn value_scale(&self) -> ValueScale {
        if self.log_scale {
            ValueScale::Log(LogScale::new((LOG_FLOOR, self.max_deaths.max(LOG_FLOOR * 10.0)), (0.0, 1.0)))
        } else {
            ValueScale::Linear(LinearScale::new((0.0, self.max_deaths), (0.0, 1.0)))
        }
    }

    fn rebuild(&mut self) {
        let (start, end) = self.period.bounds();
        let visible: Vec<&ConflictRecord> = self.data.iter().filter(|r| r.overlaps(start, end)).collect();

        self.max_deaths = visible
            .iter()
            .map(|r| r.total_deaths)
            .max()
            .filter(|m| *m > 0)
            .map_or(FALLBACK_MAX, |m| m as f64);
        let scale = self.value_scale();

        self.bars = visible
            .iter()
            .map(|r| TimelineBar {
                name: r.name.clone(),
                start_year: r.start_year as f64,
                end_year: (r.end_year as f64).max(r.start_year as f64 + MIN_BAR_YEARS),
                height: scale.map(r.total_deaths as f64),
                color: r.conflict_type.color(),
                opacity: 0.8 * highlight_opacity(self.selected.as_deref(), &r.name),
            })
            .collect();
    }
}

impl ChartView for TimelineView {
    fn name(&self) -> &'static str {
        "Timeline"
    }

    fn update(&mut self, data: &[ConflictRecord], state: &FilterState) {
        self.data = data.to_vec();
        self.selected = state.selected_conflict.clone();
        self.rebuild();
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let scale_name = if self.log_scale { "log" } else { "linear" };
        let title = format!("{} | {} | {}", self.name(), self.period.label(), scale_name);
        let inner = frame(area, buf, &title);
        let (start, end) = self.period.bounds();
        let max_label = format_number(self.max_deaths);

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([start as f64, end as f64])
            .y_bounds([0.0, 1.0])
            .paint(|ctx| {
                for bar in &self.bars {
                    let color = shade(bar.color, bar.opacity);
                    // Fill the span with vertical strokes one year apart.
                    let mut year = bar.start_year;
                    while year <= bar.end_year {
                        ctx.draw(&CanvasLine { x1: year, y1: 0.0, x2: year, y2: bar.height, color });
                        year += 1.0;
                    }
                }
                ctx.print(start as f64, 1.0, max_label.clone().gray());
                ctx.print(start as f64, 0.0, start.to_string().gray());
                ctx.print(end as f64 - (end - start) as f64 * 0.06, 0.0, end.to_string().gray());
            })
            .render(inner, buf);
    }

    fn toggle_scale(&mut self, log: bool) -> bool {
        self.log_scale = log;
        self.rebuild();
        true
    }

    fn zoom_to_period(&mut self, period: TimelinePeriod) -> bool {
        self.period = period;
        self.rebuild();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ConflictType;

    fn records() -> Vec<ConflictRecord> {
        vec![
            ConflictRecord::new("Hundred Years War", 1337, 1453, 3_000_000, 1_000_000, 2_000_000, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("World War I", 1914, 1918, 20_000_000, 10_000_000, 10_000_000, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("Korean War", 1950, 1953, 3_000_000, 1_000_000, 2_000_000, ConflictType::Interstate, "Asia"),
        ]
    }

    #[test]
    fn test_linear_heights() {
        let mut view = TimelineView::new();
        view.update(&records(), &FilterState::default());
        assert_eq!(view.bars().len(), 3);
        let ww1 = view.bars().iter().find(|b| b.name == "World War I").unwrap();
        assert_eq!(ww1.height, 1.0);
        let korea = view.bars().iter().find(|b| b.name == "Korean War").unwrap();
        assert!((korea.height - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_log_scale_lifts_small_bars() {
        let mut view = TimelineView::new();
        view.update(&records(), &FilterState::default());
        let linear = view.bars().iter().find(|b| b.name == "Korean War").unwrap().height;
        assert!(view.toggle_scale(true));
        assert!(view.is_log());
        let log = view.bars().iter().find(|b| b.name == "Korean War").unwrap().height;
        assert!(log > linear);
    }

    #[test]
    fn test_zoom_restricts_to_overlapping() {
        let mut view = TimelineView::new();
        view.update(&records(), &FilterState::default());
        assert!(view.zoom_to_period(TimelinePeriod::WorldWars));
        let names: Vec<&str> = view.bars().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["World War I"]);
        assert!(view.zoom_to_period(TimelinePeriod::ColdWar));
        assert_eq!(view.bars()[0].name, "Korean War");
    }

    #[test]
    fn test_selection_dims_others() {
        let mut view = TimelineView::new();
        let state = FilterState { selected_conflict: Some("Korean War".into()), ..FilterState::default() };
        view.update(&records(), &state);
        for bar in view.bars() {
            if bar.name == "Korean War" {
                assert!((bar.opacity - 0.8).abs() < 1e-9);
            } else {
                assert!(bar.opacity < 0.8);
            }
        }
    }

    #[test]
    fn test_empty_data_uses_fallback_domain() {
        let mut view = TimelineView::new();
        view.update(&[], &FilterState::default());
        assert!(view.bars().is_empty());
        assert_eq!(view.max_deaths, FALLBACK_MAX);
    }

    #[test]
    fn test_period_cycle() {
        let mut p = TimelinePeriod::All;
        for _ in 0..4 {
            p = p.next();
        }
        assert_eq!(p, TimelinePeriod::All);
    }
}
