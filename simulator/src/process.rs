use std::collections::VecDeque;

/// Weight of the most recent observation in the exponential average.
const ALPHA: f32 = 0.5;

/// The kind of work a burst performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstKind {
    Cpu,
    Io,
}

impl BurstKind {
    pub fn label(self) -> &'static str {
        match self {
            BurstKind::Cpu => "CPU",
            BurstKind::Io => "I/O",
        }
    }
}

/// A contiguous span of work of a single kind.
///
/// Progress never exceeds the duration; the burst is complete once they
/// are equal.
#[derive(Clone, Debug)]
pub struct Burst {
    kind: BurstKind,
    duration: u32,
    progress: u32,
}

impl Burst {
    /// Creates a burst of `duration` units of `kind` work.
    ///
    /// * `kind` - whether this is CPU or I/O work
    /// * `duration` - length in ticks, must be nonzero
    pub fn new(kind: BurstKind, duration: u32) -> Burst {
        assert!(duration > 0, "a burst must have a nonzero duration");

        Burst {
            kind,
            duration,
            progress: 0,
        }
    }

    /// Advances the burst by one unit of work.
    ///
    /// Returns true when this step completed the burst.
    fn step(&mut self) -> bool {
        self.progress += 1;
        self.progress == self.duration
    }

    pub fn kind(&self) -> BurstKind {
        self.kind
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress == self.duration
    }
}

/// Outcome of advancing a process by one tick of CPU work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The head burst has work left.
    InProgress,
    /// The head burst finished this tick; more bursts remain.
    BurstComplete { duration: u32 },
    /// The last burst finished; the process has no work left.
    Finished,
}

/// A process is an ordered queue of work for the CPU to drain, plus the
/// exponential-average predictor of its CPU burst lengths.
///
/// Bursts are consumed front to back; the process is finished once the
/// queue is empty.
#[derive(Debug)]
pub struct Process {
    work: VecDeque<Burst>,
    predicted_burst: f32,
    previous_predicted: f32,
    /// Progress value of the head burst already folded into the average.
    /// Cleared whenever the head burst changes.
    observed_progress: Option<u32>,
}

impl Process {
    /// Creates a process from an ordered burst sequence.
    ///
    /// * `bursts` - the work queue, consumed front to back
    /// * `initial_prediction` - seed value for the burst predictor
    pub fn new(bursts: impl IntoIterator<Item = Burst>, initial_prediction: f32) -> Process {
        Process {
            work: bursts.into_iter().collect(),
            predicted_burst: initial_prediction,
            previous_predicted: initial_prediction,
            observed_progress: None,
        }
    }

    /// Advances the head burst by one unit of work.
    ///
    /// A completed burst feeds the predictor and is popped from the queue.
    pub fn step(&mut self) -> StepResult {
        let Some(burst) = self.work.front_mut() else {
            return StepResult::Finished;
        };

        if !burst.step() {
            return StepResult::InProgress;
        }

        let duration = burst.duration();
        self.update_prediction();
        self.pop_head();

        if self.work.is_empty() {
            StepResult::Finished
        } else {
            StepResult::BurstComplete { duration }
        }
    }

    /// The current head burst, or None once the process is finished.
    pub fn head(&self) -> Option<&Burst> {
        self.work.front()
    }

    /// Discards the head burst without executing it.
    ///
    /// The I/O worker consumes I/O bursts this way once their duration
    /// has elapsed.
    pub fn pop_head(&mut self) {
        self.work.pop_front();
        self.observed_progress = None;
    }

    pub fn is_finished(&self) -> bool {
        self.work.is_empty()
    }

    /// Folds the head burst's progress into the exponential average:
    /// `tau_next = ALPHA * t + (1 - ALPHA) * tau`.
    ///
    /// No-op when the head is absent, not started, not CPU work, or when
    /// its current progress has already been observed, so repeated calls
    /// within a tick leave the estimate unchanged.
    pub fn update_prediction(&mut self) {
        let Some(burst) = self.work.front() else {
            return;
        };

        if burst.kind() != BurstKind::Cpu || burst.progress() == 0 {
            return;
        }

        if self.observed_progress == Some(burst.progress()) {
            return;
        }

        self.observed_progress = Some(burst.progress());
        self.previous_predicted = self.predicted_burst;
        self.predicted_burst =
            ALPHA * burst.progress() as f32 + (1.0 - ALPHA) * self.previous_predicted;
    }

    /// The predicted length of the next CPU burst.
    pub fn predicted_burst_length(&self) -> f32 {
        self.predicted_burst
    }

    /// The estimate before the most recent observation.
    pub fn previous_predicted_length(&self) -> f32 {
        self.previous_predicted
    }

    /// Predicted work left in the current CPU burst, refreshed against the
    /// head's progress first so that mid-burst preemption reads a live
    /// estimate. Zero when the head is absent or not CPU work.
    pub fn remaining_predicted(&mut self) -> f32 {
        let progress = match self.work.front() {
            Some(burst) if burst.kind() == BurstKind::Cpu => burst.progress(),
            _ => return 0.0,
        };

        self.update_prediction();
        (self.predicted_burst - progress as f32).max(0.0)
    }
}
