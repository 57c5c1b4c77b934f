//! Terminal front end: the scrolling story and the chart explorer.

pub mod explore;
pub mod story;

use std::io::{self, stdout, Stdout};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine, Points, Rectangle};

use crate::narrative::{Rgb, Scene, Shape};

pub use explore::run_explore;
pub use story::run_story;

/// Dark page behind the terminal canvas.
const BACKGROUND: Rgb = Rgb::new(0x12, 0x16, 0x1c);

pub(crate) type Term = Terminal<CrosstermBackend<Stdout>>;

pub(crate) fn setup_terminal() -> io::Result<Term> {
    terminal::enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

pub(crate) fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()
}

fn blend(color: Rgb, opacity: f64) -> Color {
    let c = color.over(BACKGROUND, opacity);
    Color::Rgb(c.r, c.g, c.b)
}

/// Paint the narrative scene onto a braille canvas. Scene y grows
/// downwards, the canvas y upwards.
pub fn draw_scene(scene: &Scene, canvas: (f64, f64), area: Rect, buf: &mut Buffer) {
    let (w, h) = canvas;
    // Below about a dot per radius a circle outline degenerates; draw a point.
    let dot = w / (area.width.max(1) as f64 * 2.0);

    Canvas::default()
        .marker(Marker::Braille)
        .background_color(blend(BACKGROUND, 1.0))
        .x_bounds([0.0, w])
        .y_bounds([0.0, h])
        .paint(|ctx| {
            for mark in scene.marks() {
                if mark.opacity <= 0.01 {
                    continue;
                }
                let color = blend(mark.color, mark.opacity);
                let y = h - mark.y;
                match &mark.shape {
                    Shape::Circle if mark.radius <= dot => {
                        ctx.draw(&Points { coords: &[(mark.x, y)], color });
                    }
                    Shape::Circle => {
                        ctx.draw(&Circle { x: mark.x, y, radius: mark.radius, color });
                    }
                    Shape::Rect { width, height } => {
                        ctx.draw(&Rectangle { x: mark.x, y: y - height, width: *width, height: *height, color });
                    }
                    Shape::Line { dx, dy, .. } => {
                        ctx.draw(&CanvasLine { x1: mark.x, y1: y, x2: mark.x + dx, y2: y - dy, color });
                    }
                    Shape::Axis { scale, ticks } => {
                        let (r0, r1) = scale.range;
                        ctx.draw(&CanvasLine { x1: r0, y1: y, x2: r1, y2: y, color });
                        for tick in scale.ticks(*ticks) {
                            let x = scale.map(tick);
                            ctx.draw(&CanvasLine { x1: x, y1: y, x2: x, y2: y - 6.0, color });
                            ctx.print(x, y - 20.0, Span::styled(format!("{}", tick as i32), Style::default().fg(color)));
                        }
                    }
                }
            }
        })
        .render(area, buf);
}

/// Greedy word wrap.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{Mark, MarkClass};

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert!(wrap("", 10).is_empty());
        assert_eq!(wrap("unbreakableword", 4), vec!["unbreakableword"]);
    }

    #[test]
    fn test_draw_scene_paints_marks() {
        let mut scene = Scene::new();
        scene.add(Mark::new(MarkClass::SingleCircle, Shape::Circle, 600.0, 400.0, Rgb::new(0xe7, 0x4c, 0x3c)).radius(200.0));
        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);
        draw_scene(&scene, (1200.0, 800.0), area, &mut buf);
        let painted = buf.content().iter().filter(|c| c.symbol() != " " && c.symbol() != "\u{2800}").count();
        assert!(painted > 0);
    }
}
