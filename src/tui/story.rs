//! Story mode: narrative text on the left, the animated scene on the right.

use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, MouseEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::config::StoryConfig;
use crate::data::Dataset;
use crate::export::export_frame_png;
use crate::narrative::{story_sections, NarrativeController, NarrativeStep, ScrollObserver, StorySection};

use super::{draw_scene, restore_terminal, setup_terminal, wrap};

/// Width of the text column, borders included.
const TEXT_PANE_WIDTH: u16 = 42;
/// Rows scrolled per mouse wheel notch.
const WHEEL_ROWS: f64 = 3.0;

pub struct StoryApp {
    controller: NarrativeController,
    sections: Vec<StorySection>,
    observer: ScrollObserver,
    /// Scroll position in text rows
    offset: f64,
    /// Visible text rows
    viewport: f64,
    message: Option<String>,
}

impl StoryApp {
    pub fn new(config: &StoryConfig, data: Rc<Dataset>, viewport: f64) -> Self {
        let mut controller = NarrativeController::new(config);
        controller.start(data);
        let sections = story_sections();
        let mut app = Self {
            controller,
            observer: Self::layout_sections(&sections, viewport),
            sections,
            offset: 0.0,
            viewport,
            message: None,
        };
        // Prime the observer; the opening step is already on screen.
        app.observer.observe(0.0, viewport);
        app
    }

    /// Each section is a full screen tall. Shorter sections let the one
    /// being left stay half visible and fire again.
    fn section_height(viewport: f64) -> f64 {
        viewport.round().max(8.0)
    }

    fn layout_sections(sections: &[StorySection], viewport: f64) -> ScrollObserver {
        let steps: Vec<NarrativeStep> = sections.iter().map(|s| s.step).collect();
        ScrollObserver::uniform(&steps, Self::section_height(viewport))
    }

    pub fn controller(&self) -> &NarrativeController {
        &self.controller
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn max_offset(&self) -> f64 {
        (self.observer.content_height() - self.viewport).max(0.0)
    }

    /// Scroll and hand any steps that came into view to the controller.
    pub fn scroll_to(&mut self, offset: f64) {
        let offset = offset.clamp(0.0, self.max_offset());
        if offset == self.offset {
            return;
        }
        self.offset = offset;
        for step in self.observer.observe(self.offset, self.viewport) {
            self.controller.transition_to(step);
        }
    }

    pub fn scroll_by(&mut self, rows: f64) {
        self.scroll_to(self.offset + rows);
    }

    /// Relayout the text after a terminal resize, keeping the current step.
    pub fn resize(&mut self, viewport: f64) {
        if viewport == self.viewport {
            return;
        }
        let step = self.controller.current_step();
        self.viewport = viewport;
        self.observer = Self::layout_sections(&self.sections, viewport);
        self.offset = self.observer.section_top(step).unwrap_or(0.0).min(self.max_offset());
        self.observer.observe(self.offset, self.viewport);
    }

    pub fn tick(&mut self, now_ms: f64) {
        self.controller.advance(now_ms);
    }

    /// Write the current frame next to the working directory.
    pub fn export_frame(&mut self) {
        let step = self.controller.current_step().index();
        let path = PathBuf::from(format!("war_story_step_{}.png", step));
        let (w, h) = self.controller.canvas_size();
        match export_frame_png(self.controller.scene(), (w, h), &path, w as u32, h as u32) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "exported frame");
                self.message = Some(format!("Exported: {}", path.display()));
            }
            Err(e) => self.message = Some(format!("Export failed: {}", e)),
        }
    }

    fn text_lines(&self, width: usize) -> Vec<Line<'static>> {
        let height = Self::section_height(self.viewport) as usize;
        let current = self.controller.current_step();
        let mut lines = Vec::new();
        for section in &self.sections {
            let mut block: Vec<Line<'static>> = Vec::new();
            let title_style = if section.step == current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            };
            block.push(Line::styled(section.title.to_string(), title_style));
            block.push(Line::default());
            for row in wrap(section.body, width) {
                block.push(Line::styled(row, Style::default().fg(Color::Gray)));
            }
            let pad_top = height.saturating_sub(block.len()) / 2;
            let section_start = lines.len();
            lines.extend(std::iter::repeat(Line::default()).take(pad_top));
            lines.extend(block);
            while lines.len() < section_start + height {
                lines.push(Line::default());
            }
            lines.truncate(section_start + height);
        }
        lines
    }

    fn render(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(frame.area());
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(TEXT_PANE_WIDTH), Constraint::Min(1)])
            .split(rows[0]);

        let text_block = Block::default().borders(Borders::RIGHT).border_style(Style::default().fg(Color::DarkGray));
        let text_area = text_block.inner(panes[0]);
        frame.render_widget(text_block, panes[0]);
        let text = Paragraph::new(self.text_lines(text_area.width.saturating_sub(2) as usize))
            .scroll((self.offset as u16, 0));
        frame.render_widget(text, text_area.inner(Margin { horizontal: 1, vertical: 0 }));

        draw_scene(self.controller.scene(), self.controller.canvas_size(), panes[1], frame.buffer_mut());

        let step = self.controller.current_step();
        let msg = self.message.as_ref().map(|m| format!(" | {}", m)).unwrap_or_default();
        let status = format!(
            " Step {}/{}: {} | Up/Down/Wheel: Scroll  E: Export  Q: Quit{}",
            step.index(),
            NarrativeStep::all().len() - 1,
            step.name(),
            msg,
        );
        frame.render_widget(
            Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
            rows[1],
        );
    }
}

/// Run the story until the reader quits.
pub fn run_story(config: &StoryConfig, data: Rc<Dataset>) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;
    let viewport = terminal.size()?.height.saturating_sub(1) as f64;
    let mut app = StoryApp::new(config, data, viewport);
    let started = Instant::now();
    let frame_time = Duration::from_millis(config.frame_millis.max(1));

    let result = (|| -> Result<(), Box<dyn Error>> {
        loop {
            app.tick(started.elapsed().as_secs_f64() * 1000.0);
            terminal.draw(|f| app.render(f))?;

            if event::poll(frame_time)? {
                match event::read()? {
                    Event::Key(key) => {
                        app.message = None;
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => break,
                            KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1.0),
                            KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1.0),
                            KeyCode::PageUp => app.scroll_by(-app.viewport),
                            KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_by(app.viewport),
                            KeyCode::Home => app.scroll_to(0.0),
                            KeyCode::End => app.scroll_to(f64::MAX),
                            KeyCode::Char('e') | KeyCode::Char('E') => app.export_frame(),
                            _ => {}
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => app.scroll_by(-WHEEL_ROWS),
                        MouseEventKind::ScrollDown => app.scroll_by(WHEEL_ROWS),
                        _ => {}
                    },
                    Event::Resize(_, height) => app.resize(height.saturating_sub(1) as f64),
                    _ => {}
                }
            }
        }
        Ok(())
    })();

    restore_terminal(&mut terminal)?;
    result
}
