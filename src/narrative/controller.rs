//! Narrative state machine and step choreography.
//!
//! `transition_to` maps a requested step onto a one-shot handler. Handlers
//! never block: they set tweens on the scene and schedule deferred work,
//! and `advance` plays both forward against the caller's clock.

use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::StoryConfig;
use crate::data::Dataset;
use crate::scales::{LinearScale, SqrtScale};

use super::layout::{relax_layout, LayoutNode, LayoutParams};
use super::particles::{self, Burst, Particle, ParticleKind};
use super::pulse::{PulseTask, PULSE_HALF_PERIOD, PULSE_HIGH, PULSE_LOW};
use super::scene::{Easing, Mark, MarkClass, Rgb, Scene, Shape, Target, Timing};
use super::timers::{Deferred, Timers};
use super::NarrativeStep;

/// Inset of the timeline from the canvas edges.
const MARGIN: f64 = 100.0;
/// Full historical span of the timeline.
const TIMELINE_DOMAIN: (f64, f64) = (700.0, 2025.0);
/// Radius of one particle, the same as the "one life" circle.
const PARTICLE_RADIUS: f64 = 4.0;
/// Where conflicts outside the zoom window are parked.
const OFFSCREEN_X: f64 = -100.0;

const PERSON_COLOR: Rgb = Rgb::new(0x2c, 0x3e, 0x50);
const SINGLE_CIRCLE_COLOR: Rgb = Rgb::new(0xe7, 0x4c, 0x3c);
const MILITARY_COLOR: Rgb = Rgb::new(0x27, 0xae, 0x60);
const CIVILIAN_COLOR: Rgb = Rgb::new(0xf3, 0x9c, 0x12);
const GUIDE_COLOR: Rgb = Rgb::new(0x55, 0x55, 0x55);

/// One color per conflict, cycling.
const WAR_PALETTE: [Rgb; 26] = [
    Rgb::new(0xe7, 0x4c, 0x3c), Rgb::new(0x34, 0x98, 0xdb), Rgb::new(0x2e, 0xcc, 0x71),
    Rgb::new(0xf3, 0x9c, 0x12), Rgb::new(0x9b, 0x59, 0xb6), Rgb::new(0x1a, 0xbc, 0x9c),
    Rgb::new(0xe6, 0x7e, 0x22), Rgb::new(0x34, 0x49, 0x5e), Rgb::new(0x16, 0xa0, 0x85),
    Rgb::new(0xc0, 0x39, 0x2b), Rgb::new(0x27, 0xae, 0x60), Rgb::new(0x29, 0x80, 0xb9),
    Rgb::new(0x8e, 0x44, 0xad), Rgb::new(0xf1, 0xc4, 0x0f), Rgb::new(0xd3, 0x54, 0x00),
    Rgb::new(0x95, 0xa5, 0xa6), Rgb::new(0xc0, 0x39, 0x2b), Rgb::new(0x16, 0xa0, 0x85),
    Rgb::new(0xf3, 0x9c, 0x12), Rgb::new(0x9b, 0x59, 0xb6), Rgb::new(0xe7, 0x4c, 0x3c),
    Rgb::new(0x34, 0x98, 0xdb), Rgb::new(0x2e, 0xcc, 0x71), Rgb::new(0xf3, 0x9c, 0x12),
    Rgb::new(0x9b, 0x59, 0xb6), Rgb::new(0x1a, 0xbc, 0x9c),
];

fn war_color(index: usize) -> Rgb {
    WAR_PALETTE[index % WAR_PALETTE.len()]
}

/// Drives the story scene from step requests.
pub struct NarrativeController {
    config: StoryConfig,
    width: f64,
    height: f64,
    data: Option<Rc<Dataset>>,
    current: NarrativeStep,
    scene: Scene,
    timers: Timers,
    /// Bumped every time a step handler runs
    epoch: u64,
    rng: ChaCha8Rng,
    pulse: PulseTask,
    pending_particles: Vec<Particle>,
    handler_runs: usize,
}

impl NarrativeController {
    pub fn new(config: &StoryConfig) -> Self {
        Self {
            config: config.clone(),
            width: config.canvas_width,
            height: config.canvas_height,
            data: None,
            current: NarrativeStep::Person,
            scene: Scene::new(),
            timers: Timers::new(),
            epoch: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            pulse: PulseTask::new(),
            pending_particles: Vec::new(),
            handler_runs: 0,
        }
    }

    /// Attach the loaded dataset and draw the opening figure.
    pub fn start(&mut self, data: Rc<Dataset>) {
        self.data = Some(data);
        self.transition_to(NarrativeStep::Person);
    }

    pub fn current_step(&self) -> NarrativeStep {
        self.current
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Number of step handlers run so far.
    pub fn handler_runs(&self) -> usize {
        self.handler_runs
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_active()
    }

    pub fn pending_actions(&self) -> usize {
        self.timers.len()
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Later steps lay out against the new size.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Request a step. Re-requesting the current step is a no-op except at
    /// the very first step; any other step, forward or backward, runs its
    /// handler from scratch. Returns whether a handler ran.
    pub fn transition_to(&mut self, step: NarrativeStep) -> bool {
        if step == self.current && step != NarrativeStep::Person {
            tracing::trace!(step = step.index(), "step already active");
            return false;
        }

        tracing::debug!(from = self.current.index(), to = step.index(), "narrative transition");
        self.current = step;
        self.epoch += 1;
        self.timers.cancel_before(self.epoch);
        self.pending_particles.clear();
        if step != NarrativeStep::Emphasize {
            self.pulse.stop();
        }
        self.handler_runs += 1;

        match step {
            NarrativeStep::Person | NarrativeStep::PersonHold => self.show_person(),
            NarrativeStep::Circle => self.person_to_circle(),
            NarrativeStep::Many => self.show_many_circles(),
            NarrativeStep::Timeline => self.form_timeline(),
            NarrativeStep::Zoom => self.zoom_to_modern_era(),
            NarrativeStep::Break => self.break_apart(),
            NarrativeStep::Split => self.split_particles(),
            NarrativeStep::DriftBegin => self.begin_drift(),
            NarrativeStep::DriftEnd => self.complete_drift(),
            NarrativeStep::Emphasize => self.emphasize_civilians(),
            NarrativeStep::Conclude => self.show_conclusion(),
        }
        true
    }

    /// Move the clock to `now` (milliseconds), firing deferred work in
    /// due order and evaluating every tween.
    pub fn advance(&mut self, now: f64) {
        while let Some((due, action)) = self.timers.pop_due(now) {
            self.scene.advance(due);
            self.run_deferred(action);
        }
        self.scene.advance(now);
    }

    fn run_deferred(&mut self, action: Deferred) {
        match action {
            Deferred::SpawnSingleCircle => {
                let (cx, cy) = self.center();
                let id = self.scene.add(
                    Mark::new(MarkClass::SingleCircle, Shape::Circle, cx, cy, SINGLE_CIRCLE_COLOR)
                        .radius(0.0)
                        .opacity(0.9),
                );
                self.scene.animate(id, Timing::new(1500.0), &[Target::Radius(PARTICLE_RADIUS)]);
            }
            Deferred::DrawTimelineAxis => {
                self.scene.remove_class(MarkClass::TimelineAxis);
                let axis = self.axis_mark(TIMELINE_DOMAIN);
                self.scene.add(axis);
            }
            Deferred::SpawnParticles => self.spawn_particles(),
            Deferred::PulseTick { generation } => self.pulse_tick(generation),
        }
    }

    fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    fn time_scale(&self, domain: (f64, f64)) -> LinearScale {
        LinearScale::new(domain, (MARGIN, self.width - MARGIN))
    }

    fn modern_domain(&self) -> (f64, f64) {
        (self.config.modern_start as f64, self.config.modern_end as f64)
    }

    fn in_modern_window(&self, midpoint: f64) -> bool {
        let (start, end) = self.modern_domain();
        midpoint >= start && midpoint <= end
    }

    fn max_deaths(data: &Dataset) -> f64 {
        data.iter().map(|r| r.total_deaths).max().unwrap_or(0) as f64
    }

    fn axis_mark(&self, domain: (f64, f64)) -> Mark {
        Mark::new(
            MarkClass::TimelineAxis,
            Shape::Axis { scale: self.time_scale(domain), ticks: 10 },
            0.0,
            self.height / 2.0 + 150.0,
            GUIDE_COLOR,
        )
    }

    fn particle_ids(&self) -> Vec<u64> {
        self.scene
            .marks()
            .iter()
            .filter(|m| m.class.is_particle())
            .map(|m| m.id)
            .collect()
    }

    fn fade_out_particles(&mut self, duration: f64) {
        for class in [MarkClass::DeathParticle, MarkClass::MilitaryParticle, MarkClass::CivilianParticle, MarkClass::Divider] {
            self.scene.fade_out_class(class, duration);
        }
    }

    /// Recreate the conflict circles on the full timeline when scrolling
    /// back after they were broken apart.
    fn ensure_war_circles(&mut self) {
        let Some(data) = self.data.clone() else { return };
        if self.scene.count(MarkClass::WarCircle) > 0 {
            return;
        }
        let x_scale = self.time_scale(TIMELINE_DOMAIN);
        let r_scale = SqrtScale::new((0.0, Self::max_deaths(&data)), (5.0, 60.0));
        let y = self.height / 2.0;
        for (i, record) in data.iter().enumerate() {
            let mark = Mark::new(MarkClass::WarCircle, Shape::Circle, x_scale.map(record.midpoint_year()), y, war_color(i))
                .radius(0.0)
                .opacity(0.75)
                .conflict(i);
            let id = self.scene.add(mark);
            self.scene.animate(id, Timing::new(800.0), &[Target::Radius(r_scale.map(record.total_deaths as f64))]);
        }
    }

    // Steps 0 and 1
    fn show_person(&mut self) {
        self.scene.clear();
        let (cx, cy) = self.center();

        let parts = [
            (Mark::new(MarkClass::PersonFigure, Shape::Circle, cx, cy - 60.0, PERSON_COLOR).radius(25.0), 0.0),
            (Mark::new(MarkClass::PersonFigure, Shape::Rect { width: 40.0, height: 70.0 }, cx - 20.0, cy - 30.0, PERSON_COLOR), 200.0),
            (Mark::new(MarkClass::PersonFigure, Shape::Line { dx: -30.0, dy: 30.0, stroke: 8.0 }, cx - 20.0, cy - 20.0, PERSON_COLOR), 400.0),
            (Mark::new(MarkClass::PersonFigure, Shape::Line { dx: 30.0, dy: 30.0, stroke: 8.0 }, cx + 20.0, cy - 20.0, PERSON_COLOR), 400.0),
            (Mark::new(MarkClass::PersonFigure, Shape::Line { dx: -15.0, dy: 50.0, stroke: 8.0 }, cx - 10.0, cy + 40.0, PERSON_COLOR), 600.0),
            (Mark::new(MarkClass::PersonFigure, Shape::Line { dx: 15.0, dy: 50.0, stroke: 8.0 }, cx + 10.0, cy + 40.0, PERSON_COLOR), 600.0),
        ];
        for (mark, delay) in parts {
            let id = self.scene.add(mark.opacity(0.0));
            self.scene.animate(id, Timing::new(1000.0).delay(delay), &[Target::Opacity(1.0)]);
        }
    }

    // Step 2
    fn person_to_circle(&mut self) {
        let ids: Vec<u64> = self.scene.marks().iter().map(|m| m.id).collect();
        for id in ids {
            self.scene.animate(id, Timing::new(1000.0), &[Target::Opacity(0.0)]);
            self.scene.remove_after(id, 1000.0);
        }
        self.timers.schedule(self.scene.now() + 1000.0, self.epoch, Deferred::SpawnSingleCircle);
    }

    // Step 3
    fn show_many_circles(&mut self) {
        let Some(data) = self.data.clone() else {
            tracing::warn!("data not loaded, cannot show conflicts");
            return;
        };
        self.scene.clear();

        let (cx, cy) = self.center();
        let r_scale = SqrtScale::new((0.0, Self::max_deaths(&data)), (5.0, 80.0));

        let starts: Vec<(f64, f64)> = (0..data.len())
            .map(|_| {
                (
                    cx + (self.rng.gen::<f64>() - 0.5) * 400.0,
                    cy + (self.rng.gen::<f64>() - 0.5) * 300.0,
                )
            })
            .collect();

        let mut nodes: Vec<LayoutNode> = data
            .iter()
            .zip(&starts)
            .map(|(record, &(x, y))| LayoutNode::new(x, y, r_scale.map(record.total_deaths as f64)))
            .collect();
        let params = LayoutParams { iterations: self.config.layout_iterations, ..LayoutParams::default() };
        relax_layout(&mut nodes, (cx, cy), (self.width, self.height), &params);

        for (i, (record, node)) in data.iter().zip(&nodes).enumerate() {
            let (x, y) = starts[i];
            let id = self.scene.add(
                Mark::new(MarkClass::WarCircle, Shape::Circle, x, y, war_color(i))
                    .radius(0.0)
                    .opacity(0.0)
                    .conflict(i),
            );
            self.scene.animate(
                id,
                Timing::new(800.0).delay(i as f64 * 50.0),
                &[Target::Radius(r_scale.map(record.total_deaths as f64)), Target::Opacity(0.75)],
            );
            self.scene.animate(
                id,
                Timing::new(3000.0).ease(Easing::CubicOut),
                &[Target::X(node.x), Target::Y(node.y)],
            );
        }
        tracing::debug!(circles = data.len(), "conflict circles placed");
    }

    // Step 4
    fn form_timeline(&mut self) {
        let Some(data) = self.data.clone() else {
            tracing::warn!("data not loaded, cannot form timeline");
            return;
        };
        self.fade_out_particles(500.0);
        self.scene.fade_out_class(MarkClass::TimelineAxis, 500.0);
        self.ensure_war_circles();

        let x_scale = self.time_scale(TIMELINE_DOMAIN);
        let r_scale = SqrtScale::new((0.0, Self::max_deaths(&data)), (5.0, 60.0));
        let y = self.height / 2.0;
        let timing = Timing::new(2000.0).ease(Easing::CubicInOut);

        for id in self.scene.ids_of(MarkClass::WarCircle) {
            let Some(index) = self.scene.get(id).and_then(|m| m.conflict) else { continue };
            let record = &data.records()[index];
            self.scene.animate(
                id,
                timing,
                &[
                    Target::X(x_scale.map(record.midpoint_year())),
                    Target::Y(y),
                    Target::Radius(r_scale.map(record.total_deaths as f64)),
                    Target::Opacity(0.75),
                ],
            );
        }
        self.timers.schedule(self.scene.now() + 2000.0, self.epoch, Deferred::DrawTimelineAxis);
    }

    // Step 5
    fn zoom_to_modern_era(&mut self) {
        let Some(data) = self.data.clone() else { return };
        self.fade_out_particles(500.0);
        self.ensure_war_circles();

        let domain = self.modern_domain();
        let x_scale = self.time_scale(domain);
        let r_scale = SqrtScale::new((0.0, Self::max_deaths(&data)), (8.0, 70.0));
        let y = self.height / 2.0;
        let timing = Timing::new(2000.0).ease(Easing::CubicInOut);

        for id in self.scene.ids_of(MarkClass::WarCircle) {
            let Some(index) = self.scene.get(id).and_then(|m| m.conflict) else { continue };
            let record = &data.records()[index];
            let midpoint = record.midpoint_year();
            let targets = if self.in_modern_window(midpoint) {
                [
                    Target::X(x_scale.map(midpoint)),
                    Target::Y(y),
                    Target::Radius(r_scale.map(record.total_deaths as f64)),
                    Target::Opacity(0.7),
                ]
            } else {
                // Parked rather than removed so scrolling back can bring it in.
                [Target::X(OFFSCREEN_X), Target::Y(y), Target::Radius(0.0), Target::Opacity(0.0)]
            };
            self.scene.animate(id, timing, &targets);
        }

        self.retarget_axis(domain, 2000.0);
    }

    /// Point the axis at `domain`, drawing it if it is missing.
    fn retarget_axis(&mut self, domain: (f64, f64), fade_in: f64) {
        let scale = self.time_scale(domain);
        let axes = self.scene.ids_of(MarkClass::TimelineAxis);
        if axes.is_empty() {
            let axis = self.axis_mark(domain).opacity(0.0);
            let id = self.scene.add(axis);
            self.scene.animate(id, Timing::new(fade_in), &[Target::Opacity(1.0)]);
            return;
        }
        for id in axes {
            if let Some(mark) = self.scene.get_mut(id) {
                mark.shape = Shape::Axis { scale, ticks: 10 };
            }
            self.scene.keep(id);
            self.scene.animate(id, Timing::new(fade_in.min(500.0)), &[Target::Opacity(1.0)]);
        }
    }

    // Step 6
    fn break_apart(&mut self) {
        let Some(data) = self.data.clone() else { return };

        self.scene.fade_out_class(MarkClass::WarCircle, 500.0);
        for class in [MarkClass::DeathParticle, MarkClass::MilitaryParticle, MarkClass::CivilianParticle] {
            self.scene.remove_class(class);
        }
        self.scene.fade_out_class(MarkClass::Divider, 500.0);
        let domain = self.modern_domain();
        self.retarget_axis(domain, 500.0);

        let x_scale = self.time_scale(domain);
        let y = self.height / 2.0;
        let bursts: Vec<Burst> = data
            .iter()
            .enumerate()
            .filter(|(_, r)| self.in_modern_window(r.midpoint_year()))
            .map(|(i, r)| Burst {
                conflict: i,
                center: (x_scale.map(r.midpoint_year()), y),
                total_deaths: r.total_deaths,
                count: self.config.particle_count(r.total_deaths),
            })
            .collect();

        self.pending_particles = particles::scatter_particles(&bursts, &mut self.rng);
        tracing::debug!(conflicts = bursts.len(), particles = self.pending_particles.len(), "breaking conflicts apart");
        self.timers.schedule(self.scene.now() + 500.0, self.epoch, Deferred::SpawnParticles);
    }

    fn spawn_particles(&mut self) {
        let pending = std::mem::take(&mut self.pending_particles);
        for (position, particle) in pending.iter().enumerate() {
            let (x, y) = particle.start;
            let id = self.scene.add(
                Mark::new(MarkClass::DeathParticle, Shape::Circle, x, y, war_color(particle.conflict))
                    .radius(0.0)
                    .opacity(0.0)
                    .conflict(particle.conflict),
            );
            self.scene.animate(
                id,
                Timing::new(2000.0)
                    .delay(particles::stagger_delay(position))
                    .ease(Easing::CubicOut),
                &[
                    Target::Radius(PARTICLE_RADIUS),
                    Target::X(particle.target.0),
                    Target::Y(particle.target.1),
                    Target::Opacity(0.8),
                ],
            );
        }
    }

    // Step 7
    fn split_particles(&mut self) {
        let Some(data) = self.data.clone() else { return };
        let mut military = 0usize;
        let ids = self.particle_ids();
        for id in &ids {
            let Some(index) = self.scene.get(*id).and_then(|m| m.conflict) else { continue };
            let kind = particles::classify(data.records()[index].military_pct, &mut self.rng);
            let (class, color) = match kind {
                ParticleKind::Military => {
                    military += 1;
                    (MarkClass::MilitaryParticle, MILITARY_COLOR)
                }
                ParticleKind::Civilian => (MarkClass::CivilianParticle, CIVILIAN_COLOR),
            };
            if let Some(mark) = self.scene.get_mut(*id) {
                mark.class = class;
            }
            self.scene.animate(*id, Timing::new(1000.0), &[Target::Color(color), Target::Opacity(0.75)]);
        }
        tracing::debug!(military, civilian = ids.len() - military, "particles split");
    }

    /// Send every particle of `class` to a random spot in a cluster at `x`.
    fn drift(&mut self, class: MarkClass, x: f64) {
        let ids = self.scene.ids_of(class);
        let center = (x, self.height / 2.0);
        let timing = Timing::new(2000.0).ease(Easing::CubicInOut);
        for id in &ids {
            let (px, py) = particles::cluster_position(center, ids.len(), &mut self.rng);
            self.scene.animate(*id, timing, &[Target::X(px), Target::Y(py)]);
        }
    }

    // Step 8
    fn begin_drift(&mut self) {
        self.scene.fade_out_class(MarkClass::TimelineAxis, 1000.0);

        self.scene.remove_class(MarkClass::Divider);
        let divider = Mark::new(
            MarkClass::Divider,
            Shape::Line { dx: 0.0, dy: self.height - 200.0, stroke: 2.0 },
            self.width / 2.0,
            100.0,
            GUIDE_COLOR,
        )
        .opacity(0.0);
        let id = self.scene.add(divider);
        self.scene.animate(id, Timing::new(1000.0), &[Target::Opacity(0.5)]);

        self.drift(MarkClass::MilitaryParticle, self.width * 0.75);
    }

    // Step 9
    fn complete_drift(&mut self) {
        self.drift(MarkClass::CivilianParticle, self.width * 0.25);
    }

    // Step 10
    fn emphasize_civilians(&mut self) {
        let generation = self.pulse.start();
        self.timers.schedule(self.scene.now(), self.epoch, Deferred::PulseTick { generation });
        self.scene.animate_class(MarkClass::MilitaryParticle, Timing::new(1000.0), &[Target::Opacity(0.3)]);
    }

    fn pulse_tick(&mut self, generation: u64) {
        if !self.pulse.is_current(generation) {
            return;
        }
        let half = Timing::new(PULSE_HALF_PERIOD);
        for id in self.scene.ids_of(MarkClass::CivilianParticle) {
            self.scene.animate(id, half, &[Target::Opacity(PULSE_HIGH)]);
            self.scene.animate_then(id, half, &[Target::Opacity(PULSE_LOW)]);
        }
        self.timers.schedule(
            self.scene.now() + 2.0 * PULSE_HALF_PERIOD,
            self.epoch,
            Deferred::PulseTick { generation },
        );
    }

    // Step 11
    fn show_conclusion(&mut self) {
        self.pulse.stop();
        self.scene.interrupt_class(MarkClass::CivilianParticle);
        self.scene.animate_class(MarkClass::CivilianParticle, Timing::new(1000.0), &[Target::Opacity(0.8)]);
        self.scene.animate_class(MarkClass::MilitaryParticle, Timing::new(1000.0), &[Target::Opacity(0.4)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ConflictRecord, ConflictType};

    fn dataset() -> Rc<Dataset> {
        Rc::new(Dataset::from_records(vec![
            ConflictRecord::new("Thirty Years War", 1618, 1648, 8_000_000, 2_000_000, 6_000_000, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("Napoleonic Wars", 1803, 1815, 5_000_000, 3_000_000, 2_000_000, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("Taiping Rebellion", 1850, 1864, 20_000_000, 5_000_000, 15_000_000, ConflictType::CivilWar, "Asia"),
            ConflictRecord::new("World War I", 1914, 1918, 20_000_000, 10_000_000, 10_000_000, ConflictType::Interstate, "Europe"),
            ConflictRecord::new("World War II", 1939, 1945, 70_000_000, 25_000_000, 45_000_000, ConflictType::Interstate, "Global"),
            ConflictRecord::new("Syrian Civil War", 2011, 2024, 600_000, 300_000, 300_000, ConflictType::CivilWar, "Middle East"),
        ]))
    }

    fn controller() -> NarrativeController {
        let config = StoryConfig { layout_iterations: 60, ..StoryConfig::default() };
        let mut c = NarrativeController::new(&config);
        c.start(dataset());
        c
    }

    /// Walk forward through every step up to `last`, letting each settle.
    fn play_until(c: &mut NarrativeController, last: NarrativeStep) -> f64 {
        let mut now = 0.0;
        for step in NarrativeStep::all().iter().filter(|s| **s <= last) {
            c.transition_to(*step);
            now += 5000.0;
            c.advance(now);
        }
        now
    }

    #[test]
    fn test_start_draws_person() {
        let c = controller();
        assert_eq!(c.current_step(), NarrativeStep::Person);
        assert_eq!(c.scene().count(MarkClass::PersonFigure), 6);
        assert_eq!(c.handler_runs(), 1);
    }

    #[test]
    fn test_same_step_is_noop_except_first() {
        let mut c = controller();
        assert!(c.transition_to(NarrativeStep::Person));
        assert_eq!(c.handler_runs(), 2);
        assert!(c.transition_to(NarrativeStep::Many));
        assert!(!c.transition_to(NarrativeStep::Many));
        assert_eq!(c.handler_runs(), 3);
    }

    #[test]
    fn test_single_circle_appears_after_fade() {
        let mut c = controller();
        c.advance(1000.0);
        c.transition_to(NarrativeStep::Circle);
        c.advance(1500.0);
        assert_eq!(c.scene().count(MarkClass::SingleCircle), 0);
        c.advance(2000.0);
        assert_eq!(c.scene().count(MarkClass::PersonFigure), 0);
        assert_eq!(c.scene().count(MarkClass::SingleCircle), 1);
        c.advance(4000.0);
        let circle = &c.scene().marks()[0];
        assert_eq!(circle.radius, PARTICLE_RADIUS);
    }

    #[test]
    fn test_leaving_early_cancels_deferred_circle() {
        let mut c = controller();
        c.transition_to(NarrativeStep::Circle);
        c.transition_to(NarrativeStep::Many);
        c.advance(5000.0);
        assert_eq!(c.scene().count(MarkClass::SingleCircle), 0);
        assert_eq!(c.scene().count(MarkClass::WarCircle), 6);
    }

    #[test]
    fn test_many_circles_settle_inside_canvas() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::Many);
        for mark in c.scene().marks() {
            assert!(mark.radius >= 5.0 && mark.radius <= 80.0);
            assert!(mark.x >= 0.0 && mark.x <= 1200.0);
            assert!((mark.opacity - 0.75).abs() < 1e-9);
        }
    }

    #[test]
    fn test_timeline_positions_and_axis() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::Timeline);
        let scale = LinearScale::new(TIMELINE_DOMAIN, (MARGIN, 1200.0 - MARGIN));
        let ww2 = c.scene().marks().iter().find(|m| m.conflict == Some(4)).unwrap();
        assert!((ww2.x - scale.map(1942.0)).abs() < 1e-6);
        assert_eq!(ww2.y, 400.0);
        assert_eq!(c.scene().count(MarkClass::TimelineAxis), 1);
    }

    #[test]
    fn test_zoom_parks_out_of_window_conflicts() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::Zoom);
        let marks = c.scene().marks();
        let thirty_years = marks.iter().find(|m| m.conflict == Some(0)).unwrap();
        assert_eq!(thirty_years.x, OFFSCREEN_X);
        assert_eq!(thirty_years.radius, 0.0);
        assert_eq!(thirty_years.opacity, 0.0);
        assert_eq!(c.scene().count(MarkClass::WarCircle), 6);
        let ww1 = marks.iter().find(|m| m.conflict == Some(3)).unwrap();
        assert!(ww1.opacity > 0.0);
    }

    #[test]
    fn test_scroll_back_restores_parked_conflicts() {
        let mut c = controller();
        let now = play_until(&mut c, NarrativeStep::Zoom);
        c.transition_to(NarrativeStep::Timeline);
        c.advance(now + 5000.0);
        let thirty_years = c.scene().marks().iter().find(|m| m.conflict == Some(0)).unwrap();
        assert!(thirty_years.x > 0.0);
        assert!(thirty_years.opacity > 0.0);
    }

    #[test]
    fn test_break_apart_particle_counts() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::Break);
        // Napoleonic 25, Taiping 100, WWI 100, WWII 150; the rest are outside 1800-1970.
        assert_eq!(c.scene().count(MarkClass::DeathParticle), 375);
        assert_eq!(c.scene().count(MarkClass::WarCircle), 0);
        assert!(c.scene().marks().iter().filter(|m| m.class.is_particle()).all(|m| m.radius == PARTICLE_RADIUS));
    }

    #[test]
    fn test_split_classifies_every_particle() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::Split);
        let military = c.scene().count(MarkClass::MilitaryParticle);
        let civilian = c.scene().count(MarkClass::CivilianParticle);
        assert_eq!(c.scene().count(MarkClass::DeathParticle), 0);
        assert_eq!(military + civilian, 375);
        assert!(civilian > military);
        for mark in c.scene().marks().iter().filter(|m| m.class == MarkClass::MilitaryParticle) {
            assert_eq!(mark.color, MILITARY_COLOR);
        }
    }

    #[test]
    fn test_drift_separates_groups() {
        let mut c = controller();
        play_until(&mut c, NarrativeStep::DriftEnd);
        for mark in c.scene().marks() {
            match mark.class {
                MarkClass::MilitaryParticle => assert!(mark.x > 600.0),
                MarkClass::CivilianParticle => assert!(mark.x < 600.0),
                _ => {}
            }
        }
        assert_eq!(c.scene().count(MarkClass::Divider), 1);
        assert_eq!(c.scene().count(MarkClass::TimelineAxis), 0);
    }

    #[test]
    fn test_pulse_runs_until_conclusion() {
        let mut c = controller();
        let mut now = play_until(&mut c, NarrativeStep::DriftEnd);
        c.transition_to(NarrativeStep::Emphasize);
        assert!(c.is_pulsing());
        for _ in 0..5 {
            now += 2000.0;
            c.advance(now);
        }
        assert!(c.pending_actions() > 0);

        c.transition_to(NarrativeStep::Conclude);
        assert!(!c.is_pulsing());
        assert_eq!(c.pending_actions(), 0);
        c.advance(now + 3000.0);
        for mark in c.scene().marks() {
            match mark.class {
                MarkClass::CivilianParticle => assert!((mark.opacity - 0.8).abs() < 1e-9),
                MarkClass::MilitaryParticle => assert!((mark.opacity - 0.4).abs() < 1e-9),
                _ => {}
            }
        }
        assert!(c.scene().is_settled());
    }

    #[test]
    fn test_pulse_stops_when_scrolling_back() {
        let mut c = controller();
        let now = play_until(&mut c, NarrativeStep::Emphasize);
        assert!(c.is_pulsing());
        c.transition_to(NarrativeStep::DriftEnd);
        assert!(!c.is_pulsing());
        c.advance(now + 10_000.0);
        assert_eq!(c.pending_actions(), 0);
    }

    #[test]
    fn test_steps_without_data_do_nothing() {
        let mut c = NarrativeController::new(&StoryConfig::default());
        assert!(c.transition_to(NarrativeStep::Many));
        c.advance(5000.0);
        assert!(c.scene().marks().is_empty());
        assert!(!c.has_data());
    }
}
