//! Query helpers over the loaded dataset.
//!
//! Aggregate statistics, filtering, ranking and the data transforms behind
//! the Sankey diagram and the cumulative area chart. Everything here is a
//! pure function over a record slice.

use std::collections::HashMap;

use crate::filters::{RegionFilter, TypeFilter};

use super::{ConflictRecord, ConflictType};

/// Name of the right-hand Sankey node receiving military deaths.
pub const MILITARY_NODE: &str = "Military Deaths";
/// Name of the right-hand Sankey node receiving civilian deaths.
pub const CIVILIAN_NODE: &str = "Civilian Deaths";

/// Summary statistics of a record set.
#[derive(Clone, Debug, PartialEq)]
pub struct DataStats {
    pub total_conflicts: usize,
    pub total_deaths: u64,
    pub total_military_deaths: u64,
    pub total_civilian_deaths: u64,
    /// Earliest start year and latest end year
    pub date_range: Option<(i32, i32)>,
    /// Distinct conflict types, in first-seen order
    pub conflict_types: Vec<ConflictType>,
    /// Distinct regions, in first-seen order
    pub regions: Vec<String>,
}

pub fn data_stats(data: &[ConflictRecord]) -> DataStats {
    let mut conflict_types: Vec<ConflictType> = Vec::new();
    let mut regions: Vec<String> = Vec::new();
    for record in data {
        if !conflict_types.contains(&record.conflict_type) {
            conflict_types.push(record.conflict_type.clone());
        }
        if !regions.contains(&record.geographic_region) {
            regions.push(record.geographic_region.clone());
        }
    }

    let min_start = data.iter().map(|r| r.start_year).min();
    let max_end = data.iter().map(|r| r.end_year).max();

    DataStats {
        total_conflicts: data.len(),
        total_deaths: data.iter().map(|r| r.total_deaths).sum(),
        total_military_deaths: data.iter().map(|r| r.military_deaths).sum(),
        total_civilian_deaths: data.iter().map(|r| r.civilian_deaths).sum(),
        date_range: min_start.zip(max_end),
        conflict_types,
        regions,
    }
}

pub fn by_type<'a>(data: &'a [ConflictRecord], filter: &TypeFilter) -> Vec<&'a ConflictRecord> {
    data.iter().filter(|r| filter.admits(&r.conflict_type)).collect()
}

pub fn by_region<'a>(data: &'a [ConflictRecord], filter: &RegionFilter) -> Vec<&'a ConflictRecord> {
    data.iter().filter(|r| filter.admits(&r.geographic_region)).collect()
}

/// Records overlapping `[start, end]`.
pub fn by_time_period(data: &[ConflictRecord], start: i32, end: i32) -> Vec<&ConflictRecord> {
    data.iter().filter(|r| r.overlaps(start, end)).collect()
}

/// The `n` deadliest records, descending. Ties keep dataset order.
pub fn deadliest(data: &[ConflictRecord], n: usize) -> Vec<&ConflictRecord> {
    let mut ranked: Vec<&ConflictRecord> = data.iter().collect();
    ranked.sort_by(|a, b| b.total_deaths.cmp(&a.total_deaths));
    ranked.truncate(n);
    ranked
}

/// Which side of the Sankey diagram a node sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SankeyNodeKind {
    Conflict,
    Casualty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SankeyNode {
    pub name: String,
    pub kind: SankeyNodeKind,
}

/// Flow from a conflict-type node to a casualty node (indices into `nodes`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyData {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

impl SankeyData {
    /// Total value leaving a node.
    pub fn outflow(&self, node: usize) -> u64 {
        self.links.iter().filter(|l| l.source == node).map(|l| l.value).sum()
    }

    /// Total value entering a node.
    pub fn inflow(&self, node: usize) -> u64 {
        self.links.iter().filter(|l| l.target == node).map(|l| l.value).sum()
    }

    /// Value shown on a node: outflow for sources, inflow for sinks.
    pub fn node_value(&self, node: usize) -> u64 {
        match self.nodes[node].kind {
            SankeyNodeKind::Conflict => self.outflow(node),
            SankeyNodeKind::Casualty => self.inflow(node),
        }
    }
}

/// Group by conflict type into left nodes feeding the two casualty nodes.
/// Zero-valued links are never emitted.
pub fn sankey_data(data: &[ConflictRecord]) -> SankeyData {
    let mut groups: Vec<(ConflictType, u64, u64)> = Vec::new();
    for record in data {
        match groups.iter_mut().find(|(t, _, _)| *t == record.conflict_type) {
            Some(group) => {
                group.1 += record.military_deaths;
                group.2 += record.civilian_deaths;
            }
            None => groups.push((
                record.conflict_type.clone(),
                record.military_deaths,
                record.civilian_deaths,
            )),
        }
    }

    let mut nodes: Vec<SankeyNode> = groups
        .iter()
        .map(|(t, _, _)| SankeyNode { name: t.name().to_string(), kind: SankeyNodeKind::Conflict })
        .collect();
    let military = nodes.len();
    let civilian = military + 1;
    nodes.push(SankeyNode { name: MILITARY_NODE.to_string(), kind: SankeyNodeKind::Casualty });
    nodes.push(SankeyNode { name: CIVILIAN_NODE.to_string(), kind: SankeyNodeKind::Casualty });

    let mut links = Vec::new();
    for (source, (_, military_deaths, civilian_deaths)) in groups.iter().enumerate() {
        if *military_deaths > 0 {
            links.push(SankeyLink { source, target: military, value: *military_deaths });
        }
        if *civilian_deaths > 0 {
            links.push(SankeyLink { source, target: civilian, value: *civilian_deaths });
        }
    }

    SankeyData { nodes, links }
}

/// One year of the cumulative death series.
#[derive(Clone, Debug, PartialEq)]
pub struct CumulativePoint {
    pub year: i32,
    /// Running total per type; the canonical types always come first
    pub by_type: Vec<(ConflictType, f64)>,
    pub total: f64,
}

impl CumulativePoint {
    pub fn value(&self, conflict_type: &ConflictType) -> f64 {
        self.by_type
            .iter()
            .find(|(t, _)| t == conflict_type)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

/// Cumulative deaths per type for every year between the earliest start and
/// the latest end.
///
/// Each conflict contributes `total_deaths / duration_years` to every year it
/// was active, so a long war spreads its toll over its whole span.
pub fn cumulative_series(data: &[ConflictRecord]) -> Vec<CumulativePoint> {
    let Some((first, last)) = data_stats(data).date_range else {
        return Vec::new();
    };

    let mut types: Vec<ConflictType> = ConflictType::canonical().to_vec();
    for record in data {
        if !types.contains(&record.conflict_type) {
            types.push(record.conflict_type.clone());
        }
    }
    let slot: HashMap<&ConflictType, usize> = types.iter().enumerate().map(|(i, t)| (t, i)).collect();

    let mut running = vec![0.0f64; types.len()];
    let mut series = Vec::with_capacity((last - first + 1).max(0) as usize);

    for year in first..=last {
        for record in data.iter().filter(|r| r.active_in(year)) {
            let annual = record.total_deaths as f64 / record.duration_years() as f64;
            running[slot[&record.conflict_type]] += annual;
        }
        series.push(CumulativePoint {
            year,
            by_type: types.iter().cloned().zip(running.iter().copied()).collect(),
            total: running.iter().sum(),
        });
    }

    series
}

/// The series up to and including `end_year`.
pub fn cumulative_until(series: &[CumulativePoint], end_year: i32) -> &[CumulativePoint] {
    let cut = series.partition_point(|p| p.year <= end_year);
    &series[..cut]
}
