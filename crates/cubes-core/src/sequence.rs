use crate::arrangement::ObjectId;

/// Cooperative lineup playback: steps become due at fixed intervals and are
/// polled from the frame tick, so pointer input stays live between chords.
#[derive(Clone, Debug)]
pub struct SequencePlayer {
    steps: Vec<ObjectId>,
    next: usize,
    next_at_ms: f64,
    interval_ms: f64,
}

impl SequencePlayer {
    /// The first step is due immediately at `start_ms`.
    pub fn new(steps: Vec<ObjectId>, start_ms: f64, interval_ms: f64) -> Self {
        Self {
            steps,
            next: 0,
            next_at_ms: start_ms,
            interval_ms: interval_ms.max(1.0),
        }
    }

    /// Next step whose time has come, with its lineup index. Call in a loop.
    pub fn due(&mut self, now_ms: f64) -> Option<(usize, ObjectId)> {
        if self.is_finished() || now_ms < self.next_at_ms {
            return None;
        }
        let index = self.next;
        self.next += 1;
        self.next_at_ms += self.interval_ms;
        Some((index, self.steps[index]))
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
