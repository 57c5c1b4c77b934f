//! Stacked area of cumulative deaths by conflict type.

use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};

use crate::data::queries::{cumulative_series, cumulative_until, CumulativePoint};
use crate::data::{format_number, ConflictRecord, ConflictType, Dataset};
use crate::filters::FilterState;

use super::{frame, shade, ChartView};

/// The series is built once from the whole dataset; filter changes only
/// move the end year.
#[derive(Clone, Debug)]
pub struct AreaView {
    series: Vec<CumulativePoint>,
    end_year: i32,
}

impl AreaView {
    pub fn new(dataset: &Dataset) -> Self {
        let series = cumulative_series(dataset.records());
        let end_year = series.last().map_or(i32::MAX, |p| p.year);
        Self { series, end_year }
    }

    /// Points currently shown.
    pub fn visible(&self) -> &[CumulativePoint] {
        cumulative_until(&self.series, self.end_year)
    }

    /// Layers in stacking order with (year, lower, upper) bands.
    pub fn layers(&self) -> Vec<(ConflictType, Vec<(f64, f64, f64)>)> {
        let visible = self.visible();
        let Some(first) = visible.first() else {
            return Vec::new();
        };
        let mut floor = vec![0.0; visible.len()];
        first
            .by_type
            .iter()
            .map(|(conflict_type, _)| {
                let bands = visible
                    .iter()
                    .zip(floor.iter_mut())
                    .map(|(point, lower)| {
                        let upper = *lower + point.value(conflict_type);
                        let band = (point.year as f64, *lower, upper);
                        *lower = upper;
                        band
                    })
                    .collect();
                (conflict_type.clone(), bands)
            })
            .collect()
    }
}

impl ChartView for AreaView {
    fn name(&self) -> &'static str {
        "Cumulative deaths"
    }

    fn update(&mut self, _data: &[ConflictRecord], state: &FilterState) {
        self.end_year = state.time_range.1;
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let inner = frame(area, buf, self.name());
        let visible = self.visible();
        let (Some(first), Some(last)) = (visible.first(), visible.last()) else {
            buf.set_string(inner.x, inner.y, "No data in range", Style::default().fg(Color::DarkGray));
            return;
        };
        let max_total = if last.total > 0.0 { last.total } else { 1_000_000.0 };
        let x_bounds = [first.year as f64, (last.year as f64).max(first.year as f64 + 1.0)];
        let layers = self.layers();

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds([0.0, max_total])
            .paint(|ctx| {
                for (conflict_type, bands) in &layers {
                    let color = shade(conflict_type.color(), 0.7);
                    for &(year, lower, upper) in bands {
                        if upper > lower {
                            ctx.draw(&CanvasLine { x1: year, y1: lower, x2: year, y2: upper, color });
                        }
                    }
                }
                ctx.print(x_bounds[0], max_total, format_number(max_total).gray());
                ctx.print(x_bounds[0], 0.0, first.year.to_string().gray());
            })
            .render(inner, buf);

        // Legend along the top edge
        let mut x = inner.x + 8;
        for conflict_type in ConflictType::canonical() {
            let (r, g, b) = conflict_type.color();
            let label = format!("■ {} ", conflict_type.name());
            if x + label.chars().count() as u16 > inner.x + inner.width {
                break;
            }
            buf.set_string(x, inner.y, &label, Style::default().fg(Color::Rgb(r, g, b)));
            x += label.chars().count() as u16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            ConflictRecord::new("A", 1900, 1903, 400, 200, 200, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("B", 1902, 1905, 800, 400, 400, ConflictType::CivilWar, "Asia"),
        ])
    }

    #[test]
    fn test_truncates_at_end_year() {
        let mut view = AreaView::new(&dataset());
        assert_eq!(view.visible().len(), 6);
        let state = FilterState { time_range: (700, 1902), ..FilterState::default() };
        view.update(&[], &state);
        assert_eq!(view.visible().len(), 3);
        assert_eq!(view.visible().last().unwrap().year, 1902);
    }

    #[test]
    fn test_layers_stack() {
        let view = AreaView::new(&dataset());
        let layers = view.layers();
        assert_eq!(layers[0].0, ConflictType::Interstate);
        assert_eq!(layers[1].0, ConflictType::CivilWar);
        let (_, lower, upper) = layers[1].1[5];
        assert_eq!(lower, 400.0);
        assert_eq!(upper, 1200.0);
    }

    #[test]
    fn test_range_before_data_is_empty() {
        let mut view = AreaView::new(&dataset());
        let state = FilterState { time_range: (700, 1800), ..FilterState::default() };
        view.update(&[], &state);
        assert!(view.visible().is_empty());
        assert!(view.layers().is_empty());
    }
}
