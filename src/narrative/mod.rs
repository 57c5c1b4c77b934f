//! Scroll-driven narrative.
//!
//! The story moves through twelve steps: a single person, one circle,
//! every conflict as a circle, a timeline, a zoom onto 1800-1970, the
//! circles breaking into death particles, the military/civilian split,
//! the two groups drifting apart, the civilian emphasis and the conclusion.
//! A scroll observer turns the reader's position into step requests and
//! the controller plays the matching choreography on the scene.

pub mod controller;
pub mod layout;
pub mod particles;
pub mod pulse;
pub mod scene;
pub mod scroll;
pub mod timers;

pub use controller::NarrativeController;
pub use scene::{Mark, MarkClass, Rgb, Scene, Shape};
pub use scroll::{story_sections, ScrollObserver, StorySection};

/// A stage of the story.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NarrativeStep {
    Person = 0,
    PersonHold = 1,
    Circle = 2,
    Many = 3,
    Timeline = 4,
    Zoom = 5,
    Break = 6,
    Split = 7,
    DriftBegin = 8,
    DriftEnd = 9,
    Emphasize = 10,
    Conclude = 11,
}

impl NarrativeStep {
    pub fn all() -> &'static [NarrativeStep] {
        &[
            NarrativeStep::Person,
            NarrativeStep::PersonHold,
            NarrativeStep::Circle,
            NarrativeStep::Many,
            NarrativeStep::Timeline,
            NarrativeStep::Zoom,
            NarrativeStep::Break,
            NarrativeStep::Split,
            NarrativeStep::DriftBegin,
            NarrativeStep::DriftEnd,
            NarrativeStep::Emphasize,
            NarrativeStep::Conclude,
        ]
    }

    pub fn from_index(index: usize) -> Option<NarrativeStep> {
        Self::all().get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            NarrativeStep::Person | NarrativeStep::PersonHold => "One person",
            NarrativeStep::Circle => "One life",
            NarrativeStep::Many => "Every conflict",
            NarrativeStep::Timeline => "Timeline",
            NarrativeStep::Zoom => "Modern era",
            NarrativeStep::Break => "Breaking apart",
            NarrativeStep::Split => "Military and civilian",
            NarrativeStep::DriftBegin => "Soldiers",
            NarrativeStep::DriftEnd => "Civilians",
            NarrativeStep::Emphasize => "Emphasis",
            NarrativeStep::Conclude => "Conclusion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_indices_round_trip() {
        for (i, step) in NarrativeStep::all().iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(NarrativeStep::from_index(i), Some(*step));
        }
        assert_eq!(NarrativeStep::from_index(12), None);
    }
}
