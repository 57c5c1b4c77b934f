//! Animated scene graph for the narrative canvas.
//!
//! A scene is a flat list of marks whose numeric attributes and color can be
//! tweened over time. Starting a transition on an attribute replaces any
//! tween already running or scheduled on it (last write wins), beginning
//! from whatever value the attribute has when the new tween starts.
//! Chained tweens (`animate_then`) run after the current ones instead.

use crate::scales::LinearScale;

pub type MarkId = u64;

/// RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Blend toward `background` by `1 - opacity`.
    pub fn over(self, background: Rgb, opacity: f64) -> Rgb {
        background.lerp(self, opacity.clamp(0.0, 1.0))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb::new(r, g, b)
    }
}

/// Role of a mark in the story; steps select marks by class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkClass {
    PersonFigure,
    SingleCircle,
    WarCircle,
    TimelineAxis,
    DeathParticle,
    MilitaryParticle,
    CivilianParticle,
    Divider,
}

impl MarkClass {
    pub fn is_particle(&self) -> bool {
        matches!(
            self,
            MarkClass::DeathParticle | MarkClass::MilitaryParticle | MarkClass::CivilianParticle
        )
    }
}

/// Geometry of a mark, relative to its `(x, y)` anchor.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Circle of the mark's radius centred on the anchor
    Circle,
    /// Rectangle with its top-left corner at the anchor
    Rect { width: f64, height: f64 },
    /// Segment from the anchor to anchor + (dx, dy)
    Line { dx: f64, dy: f64, stroke: f64 },
    /// Horizontal year axis at the anchor's y
    Axis { scale: LinearScale, ticks: usize },
}

/// A tweenable attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attr {
    X,
    Y,
    Radius,
    Opacity,
    Color,
}

/// A destination value for one attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    X(f64),
    Y(f64),
    Radius(f64),
    Opacity(f64),
    Color(Rgb),
}

impl Target {
    fn attr(&self) -> Attr {
        match self {
            Target::X(_) => Attr::X,
            Target::Y(_) => Attr::Y,
            Target::Radius(_) => Attr::Radius,
            Target::Opacity(_) => Attr::Opacity,
            Target::Color(_) => Attr::Color,
        }
    }
}

/// Easing curves used by the story.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    CubicInOut,
    CubicOut,
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::CubicOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
        }
    }
}

/// Timing of a transition, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
}

impl Timing {
    pub fn new(duration: f64) -> Self {
        Self { duration, delay: 0.0, easing: Easing::CubicInOut }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Tween {
    target: Target,
    /// Value at the moment the tween starts; resolved lazily
    from: Option<Target>,
    start: f64,
    duration: f64,
    easing: Easing,
}

impl Tween {
    fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// One drawn element.
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    pub id: MarkId,
    pub class: MarkClass,
    pub shape: Shape,
    /// Dataset index of the conflict this mark stands for
    pub conflict: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub opacity: f64,
    pub color: Rgb,
    tweens: Vec<Tween>,
    remove_at: Option<f64>,
}

impl Mark {
    pub fn new(class: MarkClass, shape: Shape, x: f64, y: f64, color: Rgb) -> Self {
        Self {
            id: 0,
            class,
            shape,
            conflict: None,
            x,
            y,
            radius: 0.0,
            opacity: 1.0,
            color,
            tweens: Vec::new(),
            remove_at: None,
        }
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn conflict(mut self, index: usize) -> Self {
        self.conflict = Some(index);
        self
    }

    /// Whether any tween is still pending or running.
    pub fn is_animating(&self) -> bool {
        !self.tweens.is_empty()
    }

    fn current(&self, attr: Attr) -> Target {
        match attr {
            Attr::X => Target::X(self.x),
            Attr::Y => Target::Y(self.y),
            Attr::Radius => Target::Radius(self.radius),
            Attr::Opacity => Target::Opacity(self.opacity),
            Attr::Color => Target::Color(self.color),
        }
    }

    fn set(&mut self, value: Target) {
        match value {
            Target::X(v) => self.x = v,
            Target::Y(v) => self.y = v,
            Target::Radius(v) => self.radius = v,
            Target::Opacity(v) => self.opacity = v,
            Target::Color(c) => self.color = c,
        }
    }

    fn advance(&mut self, now: f64) {
        let mut i = 0;
        while i < self.tweens.len() {
            if self.tweens[i].start > now {
                i += 1;
                continue;
            }
            let attr = self.tweens[i].target.attr();
            // Only the earliest tween of an attribute runs; chained ones wait.
            if self.tweens[..i].iter().any(|t| t.target.attr() == attr) {
                i += 1;
                continue;
            }
            let resolved = self.tweens[i].from;
            let from = match resolved {
                Some(from) => from,
                None => {
                    let from = self.current(attr);
                    self.tweens[i].from = Some(from);
                    from
                }
            };
            let tween = &self.tweens[i];
            let t = if tween.duration <= 0.0 {
                1.0
            } else {
                (now - tween.start) / tween.duration
            };
            let k = tween.easing.apply(t);
            let value = match (from, tween.target) {
                _ if t >= 1.0 => tween.target,
                (Target::Color(a), Target::Color(b)) => Target::Color(a.lerp(b, k)),
                (from, to) => {
                    let (a, b) = (scalar(from), scalar(to));
                    with_scalar(to, a + (b - a) * k)
                }
            };
            self.set(value);
            if t >= 1.0 {
                self.tweens.remove(i);
                // A chained tween on the same attribute may start at once.
                i = 0;
            } else {
                i += 1;
            }
        }
    }
}

fn scalar(target: Target) -> f64 {
    match target {
        Target::X(v) | Target::Y(v) | Target::Radius(v) | Target::Opacity(v) => v,
        Target::Color(_) => 0.0,
    }
}

fn with_scalar(target: Target, v: f64) -> Target {
    match target {
        Target::X(_) => Target::X(v),
        Target::Y(_) => Target::Y(v),
        Target::Radius(_) => Target::Radius(v),
        Target::Opacity(_) => Target::Opacity(v),
        Target::Color(c) => Target::Color(c),
    }
}

/// All marks on the narrative canvas plus the scene clock.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    marks: Vec<Mark>,
    next_id: MarkId,
    now: f64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene clock in milliseconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn add(&mut self, mut mark: Mark) -> MarkId {
        mark.id = self.next_id;
        self.next_id += 1;
        let id = mark.id;
        self.marks.push(mark);
        id
    }

    /// Remove every mark immediately.
    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.index(id).map(|i| &self.marks[i])
    }

    pub fn get_mut(&mut self, id: MarkId) -> Option<&mut Mark> {
        self.index(id).map(move |i| &mut self.marks[i])
    }

    fn index(&self, id: MarkId) -> Option<usize> {
        self.marks.binary_search_by_key(&id, |m| m.id).ok()
    }

    /// Ids of the marks of a class, in creation order.
    pub fn ids_of(&self, class: MarkClass) -> Vec<MarkId> {
        self.marks.iter().filter(|m| m.class == class).map(|m| m.id).collect()
    }

    pub fn count(&self, class: MarkClass) -> usize {
        self.marks.iter().filter(|m| m.class == class).count()
    }

    /// Start a transition, replacing in-flight tweens of the same attributes.
    pub fn animate(&mut self, id: MarkId, timing: Timing, targets: &[Target]) {
        let start = self.now + timing.delay;
        if let Some(mark) = self.get_mut(id) {
            for target in targets {
                let attr = target.attr();
                mark.tweens.retain(|t| t.target.attr() != attr);
                mark.tweens.push(Tween {
                    target: *target,
                    from: None,
                    start,
                    duration: timing.duration,
                    easing: timing.easing,
                });
            }
        }
    }

    /// Queue a transition after the last tween of each attribute ends.
    pub fn animate_then(&mut self, id: MarkId, timing: Timing, targets: &[Target]) {
        let now = self.now;
        if let Some(mark) = self.get_mut(id) {
            for target in targets {
                let attr = target.attr();
                let after = mark
                    .tweens
                    .iter()
                    .filter(|t| t.target.attr() == attr)
                    .map(Tween::end)
                    .fold(now, f64::max);
                mark.tweens.push(Tween {
                    target: *target,
                    from: None,
                    start: after + timing.delay,
                    duration: timing.duration,
                    easing: timing.easing,
                });
            }
        }
    }

    /// Animate every mark of a class the same way.
    pub fn animate_class(&mut self, class: MarkClass, timing: Timing, targets: &[Target]) {
        for id in self.ids_of(class) {
            self.animate(id, timing, targets);
        }
    }

    /// Drop a mark once `delay` ms have passed.
    pub fn remove_after(&mut self, id: MarkId, delay: f64) {
        let at = self.now + delay;
        if let Some(mark) = self.get_mut(id) {
            mark.remove_at = Some(at);
        }
    }

    /// Cancel a pending removal.
    pub fn keep(&mut self, id: MarkId) {
        if let Some(mark) = self.get_mut(id) {
            mark.remove_at = None;
        }
    }

    /// Fade a whole class out and drop it.
    pub fn fade_out_class(&mut self, class: MarkClass, duration: f64) {
        for id in self.ids_of(class) {
            self.animate(id, Timing::new(duration), &[Target::Opacity(0.0)]);
            self.remove_after(id, duration);
        }
    }

    /// Remove a class immediately.
    pub fn remove_class(&mut self, class: MarkClass) {
        self.marks.retain(|m| m.class != class);
    }

    /// Cancel every pending and running tween on a class.
    pub fn interrupt_class(&mut self, class: MarkClass) {
        for mark in self.marks.iter_mut().filter(|m| m.class == class) {
            mark.tweens.clear();
        }
    }

    /// Whether anything is still moving or waiting for removal.
    pub fn is_settled(&self) -> bool {
        self.marks.iter().all(|m| !m.is_animating() && m.remove_at.is_none())
    }

    /// Move the clock forward and evaluate every tween.
    pub fn advance(&mut self, now: f64) {
        if now < self.now {
            return;
        }
        self.now = now;
        for mark in &mut self.marks {
            mark.advance(now);
        }
        self.marks.retain(|m| m.remove_at.map_or(true, |at| at > now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> Mark {
        Mark::new(MarkClass::WarCircle, Shape::Circle, 0.0, 0.0, Rgb::new(0, 0, 0))
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut scene = Scene::new();
        let id = scene.add(circle());
        scene.animate(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::X(100.0)]);
        scene.advance(500.0);
        assert!((scene.get(id).unwrap().x - 50.0).abs() < 1e-9);
        scene.advance(1000.0);
        assert_eq!(scene.get(id).unwrap().x, 100.0);
        assert!(scene.is_settled());
    }

    #[test]
    fn test_delay_holds_value() {
        let mut scene = Scene::new();
        let id = scene.add(circle());
        scene.animate(id, Timing::new(100.0).delay(200.0), &[Target::Radius(4.0)]);
        scene.advance(150.0);
        assert_eq!(scene.get(id).unwrap().radius, 0.0);
        scene.advance(300.0);
        assert_eq!(scene.get(id).unwrap().radius, 4.0);
    }

    #[test]
    fn test_last_write_wins_from_current_value() {
        let mut scene = Scene::new();
        let id = scene.add(circle());
        scene.animate(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::X(100.0)]);
        scene.advance(500.0);
        scene.animate(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::X(0.0)]);
        scene.advance(1000.0);
        // Halfway back from 50, not from 100.
        assert!((scene.get(id).unwrap().x - 25.0).abs() < 1e-9);
        scene.advance(1500.0);
        assert_eq!(scene.get(id).unwrap().x, 0.0);
    }

    #[test]
    fn test_chained_tweens_run_in_sequence() {
        let mut scene = Scene::new();
        let id = scene.add(circle().opacity(0.7));
        scene.animate(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::Opacity(1.0)]);
        scene.animate_then(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::Opacity(0.7)]);
        scene.advance(1000.0);
        assert_eq!(scene.get(id).unwrap().opacity, 1.0);
        scene.advance(1500.0);
        assert!((scene.get(id).unwrap().opacity - 0.85).abs() < 1e-9);
        scene.advance(2000.0);
        assert!((scene.get(id).unwrap().opacity - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_interrupt_freezes_value() {
        let mut scene = Scene::new();
        let id = scene.add(circle());
        scene.animate(id, Timing::new(1000.0).ease(Easing::Linear), &[Target::Opacity(0.0)]);
        scene.advance(500.0);
        scene.interrupt_class(MarkClass::WarCircle);
        scene.advance(1000.0);
        assert!((scene.get(id).unwrap().opacity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fade_out_removes() {
        let mut scene = Scene::new();
        scene.add(circle());
        scene.add(circle());
        scene.fade_out_class(MarkClass::WarCircle, 500.0);
        scene.advance(499.0);
        assert_eq!(scene.count(MarkClass::WarCircle), 2);
        scene.advance(500.0);
        assert_eq!(scene.count(MarkClass::WarCircle), 0);
    }

    #[test]
    fn test_color_lerp_and_blend() {
        assert_eq!(Rgb::new(0, 0, 0).lerp(Rgb::new(200, 100, 0), 0.5), Rgb::new(100, 50, 0));
        let green = Rgb::new(0x27, 0xae, 0x60);
        assert_eq!(green.over(Rgb::new(0, 0, 0), 1.0), green);
        assert_eq!(green.over(Rgb::new(0, 0, 0), 0.0), Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::CubicInOut, Easing::CubicOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::CubicInOut.apply(0.5), 0.5);
    }
}
