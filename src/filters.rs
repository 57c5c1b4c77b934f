//! Cross-view filter state and change broadcast.
//!
//! `FilterBroadcast` is the single source of truth for which subset of the
//! dataset the charts are showing. The setters are the only way to mutate
//! the state; each one recomputes the filtered subset and synchronously
//! notifies every registered listener, in registration order.

use std::cell::RefCell;
use std::rc::Rc;

use crate::data::{ConflictRecord, ConflictType, Dataset};

/// Default slider window.
pub const DEFAULT_TIME_RANGE: (i32, i32) = (700, 2025);

/// Opacity of elements that are not the selected conflict.
const DIMMED_OPACITY: f64 = 0.3;

/// Either every value or one specific value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(v) => v == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

pub type TypeFilter = Selection<ConflictType>;
pub type RegionFilter = Selection<String>;

/// Current view constraints. Combined conjunctively.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    pub selected_conflict: Option<String>,
    pub selected_type: TypeFilter,
    pub selected_region: RegionFilter,
    /// Inclusive year window, start <= end
    pub time_range: (i32, i32),
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_conflict: None,
            selected_type: Selection::All,
            selected_region: Selection::All,
            time_range: DEFAULT_TIME_RANGE,
        }
    }
}

impl FilterState {
    /// Whether a record passes every active predicate.
    ///
    /// The time predicate is an overlap test: a conflict that merely touches
    /// the window is included.
    pub fn matches(&self, record: &ConflictRecord) -> bool {
        let (start, end) = self.time_range;
        self.selected_type.admits(&record.conflict_type)
            && self.selected_region.admits(&record.geographic_region)
            && record.overlaps(start, end)
            && self.selected_conflict.as_ref().map_or(true, |name| *name == record.name)
    }

    /// One-line summary for status bars and logs.
    pub fn describe(&self) -> String {
        let type_str = match &self.selected_type {
            Selection::All => "all types".to_string(),
            Selection::Only(t) => t.name().to_string(),
        };
        let region_str = match &self.selected_region {
            Selection::All => "all regions".to_string(),
            Selection::Only(r) => r.clone(),
        };
        let conflict_str = self
            .selected_conflict
            .as_ref()
            .map(|c| format!(" | {}", c))
            .unwrap_or_default();
        format!(
            "{} | {} | {}-{}{}",
            type_str, region_str, self.time_range.0, self.time_range.1, conflict_str
        )
    }
}

/// Records of `data` matching `state`, in dataset order.
pub fn apply_filters(data: &[ConflictRecord], state: &FilterState) -> Vec<ConflictRecord> {
    data.iter().filter(|r| state.matches(r)).cloned().collect()
}

/// Opacity an element should take for cross-view highlighting.
pub fn highlight_opacity(selected: Option<&str>, name: &str) -> f64 {
    match selected {
        Some(s) if s != name => DIMMED_OPACITY,
        _ => 1.0,
    }
}

/// Something that redraws when the filter changes.
pub trait FilterListener {
    fn on_filter_changed(&mut self, data: &[ConflictRecord], state: &FilterState);
}

/// Closures can listen too.
impl<F> FilterListener for F
where
    F: FnMut(&[ConflictRecord], &FilterState),
{
    fn on_filter_changed(&mut self, data: &[ConflictRecord], state: &FilterState) {
        self(data, state)
    }
}

/// Shared handle to a registered listener.
pub type ListenerHandle = Rc<RefCell<dyn FilterListener>>;

/// Application view-state: the dataset, the filter and its subscribers.
pub struct FilterBroadcast {
    dataset: Rc<Dataset>,
    state: FilterState,
    filtered: Vec<ConflictRecord>,
    listeners: Vec<ListenerHandle>,
}

impl FilterBroadcast {
    pub fn new(dataset: Rc<Dataset>) -> Self {
        let filtered = dataset.records().to_vec();
        Self {
            dataset,
            state: FilterState::default(),
            filtered,
            listeners: Vec::new(),
        }
    }

    /// Add a listener. Listeners live as long as the broadcast.
    pub fn register(&mut self, listener: ListenerHandle) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn dataset(&self) -> &Rc<Dataset> {
        &self.dataset
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// The subset computed by the last notification.
    pub fn filtered(&self) -> &[ConflictRecord] {
        &self.filtered
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.state.selected_type = filter;
        self.state.selected_conflict = None;
        self.notify();
    }

    pub fn set_region_filter(&mut self, filter: RegionFilter) {
        self.state.selected_region = filter;
        self.state.selected_conflict = None;
        self.notify();
    }

    /// Set the year window. Reversed bounds are swapped.
    pub fn set_time_range_filter(&mut self, start: i32, end: i32) {
        self.state.time_range = (start.min(end), start.max(end));
        self.state.selected_conflict = None;
        self.notify();
    }

    /// Select a conflict, or clear the selection if it is already selected.
    pub fn set_conflict_filter(&mut self, name: &str) {
        if self.state.selected_conflict.as_deref() == Some(name) {
            self.state.selected_conflict = None;
        } else {
            self.state.selected_conflict = Some(name.to_string());
        }
        self.notify();
    }

    pub fn reset(&mut self) {
        self.state = FilterState::default();
        self.notify();
    }

    /// Recompute the subset and push it to every listener. Unconditional.
    fn notify(&mut self) {
        self.filtered = apply_filters(self.dataset.records(), &self.state);
        tracing::debug!(
            state = %self.state.describe(),
            matching = self.filtered.len(),
            listeners = self.listeners.len(),
            "filter changed"
        );
        for listener in &self.listeners {
            listener.borrow_mut().on_filter_changed(&self.filtered, &self.state);
        }
    }
}
