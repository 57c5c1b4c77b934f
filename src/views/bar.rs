//! Ranking of the deadliest conflicts with their military/civilian split.

use ratatui::prelude::*;

use crate::data::queries::deadliest;
use crate::data::{format_number, ConflictRecord};
use crate::filters::{highlight_opacity, FilterState};

use super::{frame, shade, ChartView};

const MILITARY_COLOR: (u8, u8, u8) = (0x27, 0xae, 0x60);
const CIVILIAN_COLOR: (u8, u8, u8) = (0xf3, 0x9c, 0x12);
/// Columns reserved for the conflict name.
const NAME_WIDTH: usize = 22;

#[derive(Clone, Debug, PartialEq)]
pub struct BarRow {
    pub name: String,
    pub total_deaths: u64,
    pub military_deaths: u64,
    pub civilian_deaths: u64,
    /// Civilian share in percent
    pub civilian_share: f64,
    pub opacity: f64,
}

#[derive(Clone, Debug)]
pub struct BarView {
    top_n: usize,
    rows: Vec<BarRow>,
    cursor: usize,
}

impl BarView {
    pub fn new(top_n: usize) -> Self {
        Self { top_n, rows: Vec::new(), cursor: 0 }
    }

    pub fn rows(&self) -> &[BarRow] {
        &self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the selection cursor, staying on the chart.
    pub fn move_cursor(&mut self, delta: i32) {
        if self.rows.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.rows.len() as i32 - 1;
        self.cursor = (self.cursor as i32 + delta).clamp(0, last) as usize;
    }

    /// Name of the conflict under the cursor.
    pub fn selected_name(&self) -> Option<&str> {
        self.rows.get(self.cursor).map(|r| r.name.as_str())
    }
}

impl ChartView for BarView {
    fn name(&self) -> &'static str {
        "Deadliest conflicts"
    }

    fn update(&mut self, data: &[ConflictRecord], state: &FilterState) {
        let selected = state.selected_conflict.as_deref();
        self.rows = deadliest(data, self.top_n)
            .into_iter()
            .map(|r| BarRow {
                name: r.name.clone(),
                total_deaths: r.total_deaths,
                military_deaths: r.military_deaths,
                civilian_deaths: r.civilian_deaths,
                civilian_share: r.civilian_pct * 100.0,
                opacity: 0.8 * highlight_opacity(selected, &r.name),
            })
            .collect();
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let inner = frame(area, buf, self.name());
        let max = self.rows.first().map_or(1, |r| r.total_deaths.max(1)) as f64;
        // name, space, bar, space, "12.3M 45% civ"
        let bar_width = (inner.width as usize).saturating_sub(NAME_WIDTH + 16);

        for (i, row) in self.rows.iter().enumerate().take(inner.height as usize) {
            let y = inner.y + i as u16;
            let marker = if i == self.cursor { '>' } else { ' ' };
            let name: String = row.name.chars().take(NAME_WIDTH - 2).collect();
            let name_style = if i == self.cursor {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            buf.set_string(inner.x, y, format!("{}{:<w$}", marker, name, w = NAME_WIDTH - 1), name_style);

            let total_cells = (row.total_deaths as f64 / max * bar_width as f64).round() as usize;
            let military_cells = if row.total_deaths == 0 {
                0
            } else {
                (row.military_deaths as f64 / row.total_deaths as f64 * total_cells as f64).round() as usize
            };
            let x0 = inner.x + NAME_WIDTH as u16;
            for c in 0..total_cells {
                let rgb = if c < military_cells { MILITARY_COLOR } else { CIVILIAN_COLOR };
                if let Some(cell) = buf.cell_mut((x0 + c as u16, y)) {
                    cell.set_char('█').set_fg(shade(rgb, row.opacity));
                }
            }

            let label = format!(" {} {:.1}% civ", format_number(row.total_deaths as f64), row.civilian_share);
            buf.set_string(x0 + total_cells as u16, y, label, Style::default().fg(Color::Gray));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ConflictType;

    fn records() -> Vec<ConflictRecord> {
        (0..20)
            .map(|i| {
                let total = (i as u64 + 1) * 1000;
                ConflictRecord::new(format!("War {}", i), 1900 + i, 1901 + i, total, total / 4, total - total / 4, ConflictType::Interstate, "Europe")
            })
            .collect()
    }

    #[test]
    fn test_top_fifteen_descending() {
        let mut view = BarView::new(15);
        view.update(&records(), &FilterState::default());
        assert_eq!(view.rows().len(), 15);
        assert_eq!(view.rows()[0].name, "War 19");
        assert!(view.rows().windows(2).all(|w| w[0].total_deaths >= w[1].total_deaths));
        assert!((view.rows()[0].civilian_share - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_clamps() {
        let mut view = BarView::new(15);
        view.update(&records(), &FilterState::default());
        view.move_cursor(-3);
        assert_eq!(view.cursor(), 0);
        view.move_cursor(100);
        assert_eq!(view.cursor(), 14);
        assert_eq!(view.selected_name(), Some("War 5"));

        // Shrinking the data pulls the cursor back onto the chart.
        view.update(&records()[..3], &FilterState::default());
        assert_eq!(view.cursor(), 2);
    }

    #[test]
    fn test_render_marks_cursor_row() {
        let mut view = BarView::new(15);
        view.update(&records(), &FilterState::default());
        let area = Rect::new(0, 0, 80, 10);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        assert_eq!(buf[(1, 1)].symbol(), ">");
    }
}
