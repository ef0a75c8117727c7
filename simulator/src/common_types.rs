use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Process identifier.
///
/// Assigned by the CPU driver on first admission as the smallest
/// nonnegative integer not held by any live process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u32);

impl Pid {
    /// Creates a new Pid
    ///
    /// * `id` - the identifier as a raw integer
    pub fn new(id: u32) -> Pid {
        Pid(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a process.
///
/// `Created -> Ready -> Running <-> {Ready, Blocked}`; any state may
/// transition to `Terminated`. Only the I/O worker moves a process from
/// `Blocked` back to `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessState {
    Created = 0,
    Ready,
    Running,
    Blocked,
    Terminated,
}

impl ProcessState {
    pub fn label(self) -> &'static str {
        match self {
            ProcessState::Created => "CREATED",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Atomically readable [`ProcessState`] cell.
///
/// This is the synchronization point between the CPU thread and the I/O
/// worker: the worker stores `Ready`/`Terminated` from its own thread and
/// the CPU observes the change at the top of its next tick.
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: ProcessState) -> AtomicState {
        AtomicState(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ProcessState {
        match self.0.load(Ordering::SeqCst) {
            0 => ProcessState::Created,
            1 => ProcessState::Ready,
            2 => ProcessState::Running,
            3 => ProcessState::Blocked,
            4 => ProcessState::Terminated,
            other => unreachable!("corrupt process state tag {other}"),
        }
    }

    pub fn store(&self, state: ProcessState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}
