use std::cell::RefCell;
use std::rc::Rc;

use war_story::config::StoryConfig;
use war_story::data::queries::{data_stats, sankey_data, SankeyNodeKind};
use war_story::data::{ConflictRecord, ConflictType, Dataset};
use war_story::export::export_frame_png;
use war_story::filters::{FilterBroadcast, FilterState};
use war_story::narrative::{MarkClass, NarrativeController, NarrativeStep, ScrollObserver};
use war_story::views::{BarView, ChartView, SankeyView, ViewHandle};

fn two_wars() -> Rc<Dataset> {
    Rc::new(Dataset::from_records(vec![
        ConflictRecord::new("A", 1900, 1918, 1000, 600, 400, ConflictType::Interstate, "Europe"),
        ConflictRecord::new("B", 1939, 1945, 5000, 1000, 4000, ConflictType::Interstate, "Europe"),
    ]))
}

#[test]
fn filter_stats_and_sankey_on_two_wars() {
    let data = two_wars();
    let mut broadcast = FilterBroadcast::new(Rc::clone(&data));

    let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    broadcast.register(Rc::new(RefCell::new(move |data: &[ConflictRecord], _: &FilterState| {
        log.borrow_mut().push(data.len());
    })));

    broadcast.set_time_range_filter(1910, 1940);
    let names: Vec<&str> = broadcast.filtered().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(*seen.borrow(), vec![2]);

    assert_eq!(data_stats(data.records()).total_deaths, 6000);

    let sankey = sankey_data(data.records());
    let nodes: Vec<(&str, SankeyNodeKind)> = sankey.nodes.iter().map(|n| (n.name.as_str(), n.kind)).collect();
    assert_eq!(
        nodes,
        vec![
            ("Interstate", SankeyNodeKind::Conflict),
            ("Military Deaths", SankeyNodeKind::Casualty),
            ("Civilian Deaths", SankeyNodeKind::Casualty),
        ]
    );
    let links: Vec<(usize, usize, u64)> = sankey.links.iter().map(|l| (l.source, l.target, l.value)).collect();
    assert_eq!(links, vec![(0, 1, 1600), (0, 2, 4400)]);
}

#[test]
fn overlap_window_inside_a_war_keeps_it() {
    let mut broadcast = FilterBroadcast::new(two_wars());
    broadcast.set_time_range_filter(1940, 1942);
    assert_eq!(broadcast.filtered().len(), 1);
    assert_eq!(broadcast.filtered()[0].name, "B");
}

#[test]
fn views_follow_the_broadcast_in_registration_order() {
    let mut broadcast = FilterBroadcast::new(two_wars());
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let bar = Rc::new(RefCell::new(BarView::new(15)));
    let sankey = Rc::new(RefCell::new(SankeyView::new()));
    let first = Rc::clone(&order);
    broadcast.register(Rc::new(RefCell::new(move |_: &[ConflictRecord], _: &FilterState| {
        first.borrow_mut().push("first")
    })));
    broadcast.register(ViewHandle::listener(&bar));
    broadcast.register(ViewHandle::listener(&sankey));
    let last = Rc::clone(&order);
    broadcast.register(Rc::new(RefCell::new(move |_: &[ConflictRecord], _: &FilterState| {
        last.borrow_mut().push("last")
    })));

    broadcast.set_conflict_filter("B");
    assert_eq!(*order.borrow(), vec!["first", "last"]);
    assert_eq!(bar.borrow().rows().len(), 1);
    assert_eq!(sankey.borrow().data().links.len(), 2);
    assert_eq!(bar.borrow().name(), "Deadliest conflicts");
}

#[test]
fn scrolling_through_the_whole_story() {
    let config = StoryConfig { layout_iterations: 50, ..StoryConfig::default() };
    let mut controller = NarrativeController::new(&config);
    controller.start(two_wars());

    let mut observer = ScrollObserver::uniform(NarrativeStep::all(), 30.0);
    observer.observe(0.0, 30.0);

    let mut now = 0.0;
    for step in NarrativeStep::all().iter().skip(1) {
        let top = observer.section_top(*step).unwrap();
        for requested in observer.observe(top, 30.0) {
            controller.transition_to(requested);
        }
        assert_eq!(controller.current_step(), *step);
        now += 4000.0;
        controller.advance(now);
    }

    // Both midpoints fall in 1800-1970; each war bursts into the minimum 10.
    let scene = controller.scene();
    let particles = scene.count(MarkClass::MilitaryParticle) + scene.count(MarkClass::CivilianParticle);
    assert_eq!(particles, 20);
    assert_eq!(scene.count(MarkClass::WarCircle), 0);
    assert_eq!(scene.count(MarkClass::Divider), 1);

    // Repeating the final step changes nothing.
    let runs = controller.handler_runs();
    assert!(!controller.transition_to(NarrativeStep::Conclude));
    assert_eq!(controller.handler_runs(), runs);
}

#[test]
fn headless_frame_export() {
    let mut controller = NarrativeController::new(&StoryConfig::default());
    controller.start(two_wars());
    controller.advance(2000.0);

    let path = std::env::temp_dir().join(format!("war_story_frame_{}.png", std::process::id()));
    export_frame_png(controller.scene(), controller.canvas_size(), &path, 300, 200).unwrap();
    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (300, 200));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn bundled_dataset_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/wars_data.json");
    let dataset = Dataset::load(&war_story::data::DataSource::File(path)).unwrap();
    let stats = data_stats(dataset.records());
    assert!(stats.total_conflicts > 20);
    assert_eq!(stats.total_deaths, stats.total_military_deaths + stats.total_civilian_deaths);
    assert_eq!(stats.date_range.map(|(first, _)| first), Some(755));
}
