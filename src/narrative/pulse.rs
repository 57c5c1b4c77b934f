//! Cancellable repeating pulse.
//!
//! The emphasis step makes civilian particles breathe until the story moves
//! on. Each start hands out a new generation; a scheduled tick only fires if
//! its generation is still current and the task is active, so stopping the
//! pulse cancels the next iteration without chasing pending callbacks.

/// Opacity at the top of a pulse.
pub const PULSE_HIGH: f64 = 1.0;
/// Opacity at the bottom of a pulse.
pub const PULSE_LOW: f64 = 0.7;
/// Duration of each half of a pulse, in milliseconds.
pub const PULSE_HALF_PERIOD: f64 = 1000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseTask {
    active: bool,
    generation: u64,
}

impl PulseTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new pulse cycle; returns its generation.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.active = true;
        self.generation
    }

    /// Cancel the running cycle, if any.
    pub fn stop(&mut self) {
        if self.active {
            self.generation += 1;
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a tick scheduled for `generation` should still fire.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active && generation == self.generation
    }
}
