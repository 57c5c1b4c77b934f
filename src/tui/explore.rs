//! Explore mode: every chart on one screen, linked through the filter.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::config::StoryConfig;
use crate::data::queries::data_stats;
use crate::data::{ConflictType, Dataset};
use crate::filters::{FilterBroadcast, Selection};
use crate::views::{AreaView, BarView, ChartView, MapView, SankeyView, TimelinePeriod, TimelineView, ViewHandle};

use super::{restore_terminal, setup_terminal};

/// Years the slider end moves per key press.
const SLIDER_STEP: i32 = 25;

pub struct ExploreApp {
    broadcast: FilterBroadcast,
    timeline: Rc<RefCell<TimelineView>>,
    map: Rc<RefCell<MapView>>,
    area: Rc<RefCell<AreaView>>,
    sankey: Rc<RefCell<SankeyView>>,
    bar: Rc<RefCell<BarView>>,
    types: Vec<ConflictType>,
    regions: Vec<String>,
    type_index: Option<usize>,
    region_index: Option<usize>,
    slider: (i32, i32),
    log_scale: bool,
    period: TimelinePeriod,
}

/// Step through `None, Some(0), .., Some(len - 1)` and back to `None`.
fn cycle(index: Option<usize>, len: usize) -> Option<usize> {
    match index {
        None if len > 0 => Some(0),
        Some(i) if i + 1 < len => Some(i + 1),
        _ => None,
    }
}

impl ExploreApp {
    pub fn new(dataset: Rc<Dataset>, config: &StoryConfig, map: MapView) -> Self {
        let stats = data_stats(dataset.records());
        let timeline = Rc::new(RefCell::new(TimelineView::new()));
        let map = Rc::new(RefCell::new(map));
        let area = Rc::new(RefCell::new(AreaView::new(&dataset)));
        let sankey = Rc::new(RefCell::new(SankeyView::new()));
        let bar = Rc::new(RefCell::new(BarView::new(config.bar_chart_top_n)));

        let mut broadcast = FilterBroadcast::new(dataset);
        broadcast.register(ViewHandle::listener(&timeline));
        broadcast.register(ViewHandle::listener(&map));
        broadcast.register(ViewHandle::listener(&area));
        broadcast.register(ViewHandle::listener(&sankey));
        broadcast.register(ViewHandle::listener(&bar));

        let slider = (config.slider_start, config.slider_end);
        broadcast.set_time_range_filter(slider.0, slider.1);

        Self {
            broadcast,
            timeline,
            map,
            area,
            sankey,
            bar,
            types: stats.conflict_types,
            regions: stats.regions,
            type_index: None,
            region_index: None,
            slider,
            log_scale: false,
            period: TimelinePeriod::All,
        }
    }

    pub fn broadcast(&self) -> &FilterBroadcast {
        &self.broadcast
    }

    pub fn bar(&self) -> &Rc<RefCell<BarView>> {
        &self.bar
    }

    pub fn timeline(&self) -> &Rc<RefCell<TimelineView>> {
        &self.timeline
    }

    /// Apply one key. Returns false when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('t') => {
                self.type_index = cycle(self.type_index, self.types.len());
                let filter = match self.type_index {
                    Some(i) => Selection::Only(self.types[i].clone()),
                    None => Selection::All,
                };
                self.broadcast.set_type_filter(filter);
            }
            KeyCode::Char('g') => {
                self.region_index = cycle(self.region_index, self.regions.len());
                let filter = match self.region_index {
                    Some(i) => Selection::Only(self.regions[i].clone()),
                    None => Selection::All,
                };
                self.broadcast.set_region_filter(filter);
            }
            KeyCode::Char('[') | KeyCode::Char(']') => {
                let (start, end) = self.broadcast.state().time_range;
                let delta = if code == KeyCode::Char('[') { -SLIDER_STEP } else { SLIDER_STEP };
                let end = (end + delta).clamp(start, self.slider.1);
                self.broadcast.set_time_range_filter(start, end);
            }
            KeyCode::Char('x') => {
                self.type_index = None;
                self.region_index = None;
                self.broadcast.reset();
                self.broadcast.set_time_range_filter(self.slider.0, self.slider.1);
            }
            KeyCode::Char('l') => {
                self.log_scale = !self.log_scale;
                self.timeline.borrow_mut().toggle_scale(self.log_scale);
            }
            KeyCode::Char('z') => {
                self.period = self.period.next();
                self.timeline.borrow_mut().zoom_to_period(self.period);
            }
            KeyCode::Up => self.bar.borrow_mut().move_cursor(-1),
            KeyCode::Down => self.bar.borrow_mut().move_cursor(1),
            KeyCode::Enter => {
                let name = self.bar.borrow().selected_name().map(str::to_string);
                if let Some(name) = name {
                    self.broadcast.set_conflict_filter(&name);
                }
            }
            _ => {}
        }
        true
    }

    fn render(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(38),
                Constraint::Percentage(30),
                Constraint::Min(6),
                Constraint::Length(1),
            ])
            .split(frame.area());
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[0]);
        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let buf = frame.buffer_mut();
        self.timeline.borrow().render(top[0], buf);
        self.map.borrow().render(top[1], buf);
        self.area.borrow().render(middle[0], buf);
        self.sankey.borrow().render(middle[1], buf);
        self.bar.borrow().render(rows[2], buf);

        let status = format!(
            " {} matching | {} | T:Type G:Region [/]:Year L:Log Z:Zoom Enter:Select X:Reset Q:Quit",
            self.broadcast.filtered().len(),
            self.broadcast.state().describe(),
        );
        frame.render_widget(
            Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
            rows[3],
        );
    }
}

/// Run the explorer until the user quits.
pub fn run_explore(config: &StoryConfig, dataset: Rc<Dataset>) -> Result<(), Box<dyn Error>> {
    // Fetch the map before taking over the screen.
    let map = MapView::load(config.world_geometry_url.as_deref());
    let mut app = ExploreApp::new(dataset, config, map);

    let mut terminal = setup_terminal()?;
    let result = (|| -> Result<(), Box<dyn Error>> {
        loop {
            terminal.draw(|f| app.render(f))?;
            if event::poll(Duration::from_millis(config.frame_millis.max(1)))? {
                if let Event::Key(key) = event::read()? {
                    if !app.handle_key(key.code) {
                        break;
                    }
                }
            }
        }
        Ok(())
    })();

    restore_terminal(&mut terminal)?;
    result
}
