//! Chart views for explore mode.
//!
//! Each view keeps a small view model rebuilt on every filter change and
//! paints it into a ratatui buffer. Views differ in what they can do, so
//! log scaling and period zoom are optional capabilities with a default
//! "not supported" answer.

pub mod area;
pub mod bar;
pub mod map;
pub mod sankey;
pub mod timeline;

use std::cell::RefCell;
use std::rc::Rc;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders};

use crate::data::ConflictRecord;
use crate::filters::{FilterListener, FilterState, ListenerHandle};
use crate::narrative::Rgb;

pub use area::AreaView;
pub use bar::BarView;
pub use map::MapView;
pub use sankey::SankeyView;
pub use timeline::{TimelinePeriod, TimelineView};

/// Background the charts are blended against.
const BACKGROUND: Rgb = Rgb::new(0x10, 0x14, 0x18);

pub trait ChartView {
    fn name(&self) -> &'static str;

    /// Rebuild the view model from the filtered subset.
    fn update(&mut self, data: &[ConflictRecord], state: &FilterState);

    fn render(&self, area: Rect, buf: &mut Buffer);

    /// Switch between linear and log value axes. Returns false when the
    /// view has no value axis.
    fn toggle_scale(&mut self, _log: bool) -> bool {
        false
    }

    /// Restrict the view to a historical period. Returns false when the
    /// view has no time axis to zoom.
    fn zoom_to_period(&mut self, _period: TimelinePeriod) -> bool {
        false
    }
}

/// Registers a shared view with the filter broadcast.
pub struct ViewHandle<V: ChartView>(pub Rc<RefCell<V>>);

impl<V: ChartView + 'static> ViewHandle<V> {
    pub fn listener(view: &Rc<RefCell<V>>) -> ListenerHandle {
        Rc::new(RefCell::new(ViewHandle(Rc::clone(view))))
    }
}

impl<V: ChartView> FilterListener for ViewHandle<V> {
    fn on_filter_changed(&mut self, data: &[ConflictRecord], state: &FilterState) {
        self.0.borrow_mut().update(data, state);
    }
}

/// Terminal color for an RGB triple at the given opacity.
pub(crate) fn shade(rgb: (u8, u8, u8), opacity: f64) -> Color {
    let c = Rgb::from(rgb).over(BACKGROUND, opacity);
    Color::Rgb(c.r, c.g, c.b)
}

/// Bordered block with the view's name, shared by every chart.
pub(crate) fn frame(area: Rect, buf: &mut Buffer, title: &str) -> Rect {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    block.render(area, buf);
    inner
}
