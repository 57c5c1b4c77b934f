//! Story sections and the scroll observer.
//!
//! Sections are stacked vertically. Whenever the scroll offset changes, the
//! observer measures how much of each section is inside the viewport and
//! reports a section's step when its visible share crosses one of the
//! observation thresholds while at least half of it is visible.

use super::NarrativeStep;

/// Visible shares at which a section is re-examined.
const THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
/// Share of a section that must be visible to trigger its step.
const TRIGGER_RATIO: f64 = 0.5;

/// One block of narrative text tied to a step.
#[derive(Clone, Debug, PartialEq)]
pub struct StorySection {
    pub step: NarrativeStep,
    pub title: &'static str,
    pub body: &'static str,
}

/// The text of the story, one section per step.
pub fn story_sections() -> Vec<StorySection> {
    let text: [(NarrativeStep, &str, &str); 12] = [
        (NarrativeStep::Person, "One person",
            "Every number in this story began as a single life."),
        (NarrativeStep::PersonHold, "A life",
            "Someone with a name, a family and a place they called home."),
        (NarrativeStep::Circle, "One dot",
            "From here on, one small dot stands for one life lost to war."),
        (NarrativeStep::Many, "Every conflict",
            "Each circle is a conflict. Its area grows with the number of people who died in it."),
        (NarrativeStep::Timeline, "Thirteen centuries",
            "Placed on a timeline, the conflicts stretch from the early middle ages to today."),
        (NarrativeStep::Zoom, "The modern era",
            "Between 1800 and 1970, industrial warfare made the circles larger than ever before."),
        (NarrativeStep::Break, "Breaking apart",
            "Each conflict breaks into the people it killed. Every particle is a share of its toll."),
        (NarrativeStep::Split, "Soldiers and civilians",
            "Green particles were soldiers. Amber particles were civilians."),
        (NarrativeStep::DriftBegin, "The soldiers",
            "The soldiers gather on the right."),
        (NarrativeStep::DriftEnd, "The civilians",
            "The civilians gather on the left."),
        (NarrativeStep::Emphasize, "Who pays",
            "In many of these wars, more civilians died than soldiers."),
        (NarrativeStep::Conclude, "Remember",
            "Behind every dot was a person. Press Q to leave the story or run `war_story explore` to dig into the data."),
    ];
    text.iter()
        .map(|&(step, title, body)| StorySection { step, title, body })
        .collect()
}

/// Reports steps as sections scroll into view.
#[derive(Clone, Debug)]
pub struct ScrollObserver {
    /// (top, height, step) of each section, in scroll units
    sections: Vec<(f64, f64, NarrativeStep)>,
    /// Threshold bucket each section was in at the last observation
    buckets: Vec<Option<usize>>,
}

impl ScrollObserver {
    /// Stack sections of the given heights from offset 0.
    pub fn new(steps_and_heights: &[(NarrativeStep, f64)]) -> Self {
        let mut top = 0.0;
        let mut sections = Vec::with_capacity(steps_and_heights.len());
        for &(step, height) in steps_and_heights {
            sections.push((top, height, step));
            top += height;
        }
        Self { buckets: vec![None; sections.len()], sections }
    }

    /// Sections of equal height.
    pub fn uniform(steps: &[NarrativeStep], height: f64) -> Self {
        let pairs: Vec<(NarrativeStep, f64)> = steps.iter().map(|s| (*s, height)).collect();
        Self::new(&pairs)
    }

    /// Total scrollable height.
    pub fn content_height(&self) -> f64 {
        self.sections.last().map_or(0.0, |(top, height, _)| top + height)
    }

    /// Top offset of the section for `step`.
    pub fn section_top(&self, step: NarrativeStep) -> Option<f64> {
        self.sections.iter().find(|(_, _, s)| *s == step).map(|(top, _, _)| *top)
    }

    /// Share of each section inside `[offset, offset + viewport)`.
    pub fn visibility(&self, offset: f64, viewport: f64) -> Vec<f64> {
        self.sections
            .iter()
            .map(|&(top, height, _)| {
                if height <= 0.0 {
                    return 0.0;
                }
                let visible = (top + height).min(offset + viewport) - top.max(offset);
                (visible.max(0.0) / height).min(1.0)
            })
            .collect()
    }

    /// Observe a new scroll position; returns the steps to transition to,
    /// in section order.
    pub fn observe(&mut self, offset: f64, viewport: f64) -> Vec<NarrativeStep> {
        let ratios = self.visibility(offset, viewport);
        let mut triggered = Vec::new();
        for (i, ratio) in ratios.into_iter().enumerate() {
            let bucket = THRESHOLDS.iter().filter(|t| ratio >= **t && ratio > 0.0).count();
            if self.buckets[i] != Some(bucket) {
                self.buckets[i] = Some(bucket);
                if ratio >= TRIGGER_RATIO {
                    triggered.push(self.sections[i].2);
                }
            }
        }
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observer() -> ScrollObserver {
        ScrollObserver::uniform(NarrativeStep::all(), 40.0)
    }

    #[test]
    fn test_sections_cover_every_step() {
        let sections = story_sections();
        assert_eq!(sections.len(), 12);
        for (i, section) in sections.iter().enumerate() {
            assert_eq!(section.step.index(), i);
        }
    }

    #[test]
    fn test_initial_observation_reports_visible_section() {
        let mut obs = observer();
        assert_eq!(obs.observe(0.0, 40.0), vec![NarrativeStep::Person]);
    }

    #[test]
    fn test_half_visible_triggers() {
        let mut obs = observer();
        obs.observe(0.0, 40.0);
        // Section 0 drops to 75% and is reported again; section 1 at 25% is not.
        assert_eq!(obs.observe(10.0, 40.0), vec![NarrativeStep::Person]);
        // Section 1 crosses 50%.
        assert_eq!(obs.observe(20.0, 40.0), vec![NarrativeStep::Person, NarrativeStep::PersonHold]);
    }

    #[test]
    fn test_small_scroll_without_crossing_is_silent() {
        let mut obs = observer();
        obs.observe(85.0, 40.0);
        assert!(obs.observe(86.0, 40.0).is_empty());
    }

    #[test]
    fn test_scrolling_back_reports_earlier_step() {
        let mut obs = observer();
        obs.observe(200.0, 40.0);
        let steps = obs.observe(0.0, 40.0);
        assert!(steps.contains(&NarrativeStep::Person));
        assert_eq!(obs.section_top(NarrativeStep::Zoom), Some(200.0));
        assert_eq!(obs.content_height(), 480.0);
    }
}
