use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common_types::{AtomicState, Pid, ProcessState};
use crate::process::Process;

/// Shared handle to a process control block.
///
/// The harness owns the blocks for the duration of a run; the scheduler,
/// the CPU driver and the I/O worker all hold clones of this handle.
pub type PcbRef = Arc<Pcb>;

/// Bookkeeping record for a simulated process.
///
/// The state cell is the only field written from more than one thread
/// concurrently; the priority pair, the aging timer and the program
/// counter are only mutated by the CPU thread, and the owned process sits
/// behind its own mutex.
#[derive(Debug)]
pub struct Pcb {
    state: AtomicState,
    id: AtomicU32,

    base_priority: u32,
    priority: AtomicU32,
    /// Ticks since this process last executed, for priority aging
    inactive_priority_timer: AtomicU64,

    /// How many units of CPU work have been executed
    program_counter: AtomicU64,
    process: Mutex<Process>,
}

impl Pcb {
    /// Creates a control block around `process`, in the `Created` state.
    ///
    /// * `process` - the burst queue this block controls
    /// * `base_priority` - original priority; zero for policies that
    ///   ignore priorities
    pub fn new(process: Process, base_priority: u32) -> PcbRef {
        Arc::new(Pcb {
            state: AtomicState::new(ProcessState::Created),
            id: AtomicU32::new(0),
            base_priority,
            priority: AtomicU32::new(base_priority),
            inactive_priority_timer: AtomicU64::new(0),
            program_counter: AtomicU64::new(0),
            process: Mutex::new(process),
        })
    }

    pub fn pid(&self) -> Pid {
        Pid::new(self.id.load(Ordering::SeqCst))
    }

    pub(crate) fn assign_pid(&self, pid: Pid) {
        self.id.store(pid.get(), Ordering::SeqCst);
    }

    pub fn state(&self) -> ProcessState {
        self.state.load()
    }

    pub fn set_state(&self, state: ProcessState) {
        self.state.store(state);
    }

    pub fn base_priority(&self) -> u32 {
        self.base_priority
    }

    pub fn priority(&self) -> u32 {
        self.priority.load(Ordering::SeqCst)
    }

    /// Raises the current priority by one, returning the new value.
    ///
    /// The caller checks for headroom first; aging never wraps.
    pub(crate) fn bump_priority(&self) -> u32 {
        self.priority.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Lowers the current priority by one, returning the new value.
    ///
    /// The caller ensures the priority sits above its base; decay never
    /// crosses it.
    pub(crate) fn decay_priority(&self) -> u32 {
        self.priority.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Advances the aging timer by one tick, returning the new value.
    pub(crate) fn tick_inactive_timer(&self) -> u64 {
        self.inactive_priority_timer.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn reset_inactive_timer(&self) {
        self.inactive_priority_timer.store(0, Ordering::SeqCst);
    }

    pub fn program_counter(&self) -> u64 {
        self.program_counter.load(Ordering::SeqCst)
    }

    pub(crate) fn count_instruction(&self) {
        self.program_counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Locks and returns the owned process.
    pub fn process(&self) -> MutexGuard<'_, Process> {
        self.process.lock().unwrap()
    }
}
