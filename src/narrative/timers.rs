//! Deferred story actions.
//!
//! Some steps draw part of their scene only after a delay (the single circle
//! appears once the person has faded, the axis once the circles have lined
//! up). Each action is tagged with the step epoch that scheduled it, and a
//! new step drops everything scheduled by earlier ones.

/// Work to run later on the narrative scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deferred {
    SpawnSingleCircle,
    DrawTimelineAxis,
    SpawnParticles,
    PulseTick { generation: u64 },
}

#[derive(Clone, Debug, PartialEq)]
struct Scheduled {
    due: f64,
    epoch: u64,
    seq: u64,
    action: Deferred,
}

/// Pending actions ordered by due time, then by scheduling order.
#[derive(Clone, Debug, Default)]
pub struct Timers {
    pending: Vec<Scheduled>,
    seq: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, epoch: u64, action: Deferred) {
        self.seq += 1;
        let entry = Scheduled { due, epoch, seq: self.seq, action };
        let at = self
            .pending
            .partition_point(|s| (s.due, s.seq) <= (entry.due, entry.seq));
        self.pending.insert(at, entry);
    }

    /// Drop actions scheduled before `epoch`.
    pub fn cancel_before(&mut self, epoch: u64) {
        self.pending.retain(|s| s.epoch >= epoch);
    }

    /// Next action due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, Deferred)> {
        if self.pending.first().map_or(false, |s| s.due <= now) {
            let entry = self.pending.remove(0);
            Some((entry.due, entry.action))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
