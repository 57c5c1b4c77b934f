use std::rc::Rc;

use proptest::prelude::*;

use war_story::data::queries::{cumulative_series, deadliest, sankey_data};
use war_story::data::{ConflictRecord, ConflictType, Dataset};
use war_story::filters::{apply_filters, FilterBroadcast, FilterState, Selection};

const TYPES: [&str; 4] = ["Interstate", "Civil War", "Colonial", "Revolution"];
const REGIONS: [&str; 4] = ["Europe", "Asia", "Africa", "Americas"];

fn record() -> impl Strategy<Value = ConflictRecord> {
    (0usize..4, 0usize..4, 700i32..2025, 0i32..40, 0u64..5_000_000, 0u64..5_000_000)
        .prop_map(|(t, r, start, len, military, civilian)| {
            ConflictRecord::new(
                format!("{}-{}-{}", TYPES[t], start, len),
                start,
                start + len,
                military + civilian,
                military,
                civilian,
                ConflictType::from(TYPES[t]),
                REGIONS[r],
            )
        })
}

fn records() -> impl Strategy<Value = Vec<ConflictRecord>> {
    prop::collection::vec(record(), 0..25)
}

fn state() -> impl Strategy<Value = FilterState> {
    (
        prop::option::of(0usize..4),
        prop::option::of(0usize..4),
        700i32..2025,
        700i32..2025,
    )
        .prop_map(|(t, r, a, b)| FilterState {
            selected_conflict: None,
            selected_type: t.map_or(Selection::All, |t| Selection::Only(ConflictType::from(TYPES[t]))),
            selected_region: r.map_or(Selection::All, |r| Selection::Only(REGIONS[r].to_string())),
            time_range: (a.min(b), a.max(b)),
        })
}

proptest! {
    #[test]
    fn filtered_is_subset_satisfying_every_predicate(
        data in records(),
        mut state in state(),
        pick in prop::option::of(any::<prop::sample::Index>()),
    ) {
        if !data.is_empty() {
            state.selected_conflict = pick.map(|i| data[i.index(data.len())].name.clone());
        }
        let filtered = apply_filters(&data, &state);
        prop_assert!(filtered.len() <= data.len());
        for r in &filtered {
            prop_assert!(data.contains(r));
            prop_assert!(state.selected_type.admits(&r.conflict_type));
            prop_assert!(state.selected_region.admits(&r.geographic_region));
            prop_assert!(r.start_year <= state.time_range.1 && r.end_year >= state.time_range.0);
            if let Some(name) = &state.selected_conflict {
                prop_assert_eq!(&r.name, name);
            }
        }
        let expected = data
            .iter()
            .filter(|r| {
                state.selected_type.admits(&r.conflict_type)
                    && state.selected_region.admits(&r.geographic_region)
                    && r.overlaps(state.time_range.0, state.time_range.1)
                    && state.selected_conflict.as_ref().map_or(true, |name| *name == r.name)
            })
            .count();
        prop_assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn conflict_toggle_restores_selection(data in records(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!data.is_empty());
        let name = data[pick.index(data.len())].name.clone();
        let mut broadcast = FilterBroadcast::new(Rc::new(Dataset::from_records(data)));
        broadcast.set_conflict_filter(&name);
        prop_assert_eq!(broadcast.state().selected_conflict.as_deref(), Some(name.as_str()));
        broadcast.set_conflict_filter(&name);
        prop_assert_eq!(broadcast.state().selected_conflict.clone(), None);
    }

    #[test]
    fn deadliest_is_sorted_and_sized(data in records(), n in 0usize..30) {
        let top = deadliest(&data, n);
        prop_assert_eq!(top.len(), n.min(data.len()));
        prop_assert!(top.windows(2).all(|w| w[0].total_deaths >= w[1].total_deaths));
        let again = deadliest(&data, n);
        prop_assert_eq!(top, again);
    }

    #[test]
    fn cumulative_never_decreases(data in records()) {
        let series = cumulative_series(&data);
        for pair in series.windows(2) {
            prop_assert!(pair[1].total >= pair[0].total - 1e-6);
            for (conflict_type, value) in &pair[1].by_type {
                prop_assert!(*value >= pair[0].value(conflict_type) - 1e-6);
            }
        }
    }

    #[test]
    fn sankey_conserves_deaths_per_type(data in records()) {
        let sankey = sankey_data(&data);
        for (i, node) in sankey.nodes.iter().enumerate() {
            let expected: u64 = data
                .iter()
                .filter(|r| r.conflict_type.name() == node.name)
                .map(|r| r.military_deaths + r.civilian_deaths)
                .sum();
            if sankey.links.iter().any(|l| l.target == i) {
                continue;
            }
            prop_assert_eq!(sankey.outflow(i), expected);
        }
        prop_assert!(sankey.links.iter().all(|l| l.value > 0));
    }
}
