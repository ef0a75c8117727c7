//! Asynchronous I/O completion.
//!
//! A single long-lived worker thread owns the set of I/O-blocked
//! processes. Blocked PCBs arrive through [`InterruptController::notify_blocked`]
//! into a staging list, get stamped with an absolute wake time, and wait
//! in a min-heap until their burst duration has elapsed. Completed
//! processes re-enter the system through the CPU driver's admission and
//! termination entry points; the worker holds a handle to the driver and
//! the PCBs themselves carry no back-references.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::info;

use crate::common_types::ProcessState;
use crate::cpu::CpuCore;
use crate::process_control_block::PcbRef;

/// A process waiting out its I/O burst, keyed by absolute wake time.
struct IoEvent {
    when: Instant,
    pcb: PcbRef,
}

impl PartialEq for IoEvent {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when
    }
}

impl Eq for IoEvent {}

impl PartialOrd for IoEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IoEvent {
    // Reversed so the binary heap pops the earliest wake time first
    fn cmp(&self, other: &Self) -> Ordering {
        other.when.cmp(&self.when)
    }
}

struct IrqState {
    /// Newly blocked processes not yet stamped with a wake time
    staged: Vec<PcbRef>,
    /// Processes waiting out their burst duration
    pending: BinaryHeap<IoEvent>,
    stop: bool,
}

impl IrqState {
    fn holds(&self, pcb: &PcbRef) -> bool {
        self.staged.iter().any(|p| Arc::ptr_eq(p, pcb))
            || self.pending.iter().any(|e| Arc::ptr_eq(&e.pcb, pcb))
    }
}

struct IrqShared {
    state: Mutex<IrqState>,
    wakeup: Condvar,
}

/// Owner of the I/O worker thread.
pub struct InterruptController {
    shared: Arc<IrqShared>,
    worker: Option<JoinHandle<()>>,
}

impl InterruptController {
    /// Spawns the worker thread.
    ///
    /// * `cpu` - handle to the driver's admission and termination entry
    ///   points, used when an I/O burst completes
    pub(crate) fn start(cpu: Arc<CpuCore>) -> InterruptController {
        let shared = Arc::new(IrqShared {
            state: Mutex::new(IrqState {
                staged: Vec::new(),
                pending: BinaryHeap::new(),
                stop: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("io-worker".into())
            .spawn(move || io_worker(worker_shared, cpu))
            .expect("failed to spawn the I/O worker thread");

        InterruptController {
            shared,
            worker: Some(worker),
        }
    }

    /// Hands a blocked process to the worker.
    ///
    /// The caller sets the state to `Blocked` before calling. Notifying
    /// the controller about a process that is already pending is a fatal
    /// misuse.
    pub fn notify_blocked(&self, pcb: PcbRef) {
        let mut state = self.shared.state.lock().unwrap();

        assert!(
            !state.holds(&pcb),
            "PID[{}] blocked twice while still pending",
            pcb.pid()
        );

        state.staged.push(pcb);
        self.shared.wakeup.notify_one();
    }
}

impl Drop for InterruptController {
    fn drop(&mut self) {
        // A panicking notifier poisons the mutex; teardown still has to
        // reach the worker through it.
        let mut state = match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.stop = true;
        drop(state);

        self.shared.wakeup.notify_one();

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn io_worker(shared: Arc<IrqShared>, cpu: Arc<CpuCore>) {
    let mut state = shared.state.lock().unwrap();

    while !state.stop {
        // Stamp newly staged processes with their absolute wake time
        let now = Instant::now();
        while let Some(pcb) = state.staged.pop() {
            let duration = {
                let process = pcb.process();
                let burst = process
                    .head()
                    .expect("a blocked process must have an I/O burst at its head");
                u64::from(burst.duration())
            };

            state.pending.push(IoEvent {
                when: now + Duration::from_millis(duration),
                pcb,
            });
        }

        if state.pending.is_empty() {
            // Nothing in flight; sleep until a new block or a stop arrives
            state = shared
                .wakeup
                .wait_while(state, |s| !s.stop && s.staged.is_empty())
                .unwrap();
            continue;
        }

        let next_wake = state.pending.peek().unwrap().when;
        let timeout = next_wake.saturating_duration_since(Instant::now());
        state = shared
            .wakeup
            .wait_timeout_while(state, timeout, |s| !s.stop && s.staged.is_empty())
            .unwrap()
            .0;

        if state.stop {
            break;
        }

        // Drain everything whose time has come
        let now = Instant::now();
        while state.pending.peek().is_some_and(|e| e.when <= now) {
            let event = state.pending.pop().unwrap();
            let pcb = event.pcb;

            // Consume the I/O burst
            let has_work = {
                let mut process = pcb.process();
                process.pop_head();
                !process.is_finished()
            };

            if has_work {
                info!(target: "sim::io", "PID[{}] unblocked from I/O burst", pcb.pid());
                pcb.set_state(ProcessState::Ready);
                cpu.add_process(Arc::clone(&pcb));
            } else {
                info!(target: "sim::io", "PID[{}] exits from I/O burst", pcb.pid());
                pcb.set_state(ProcessState::Terminated);
                cpu.terminate_process(&pcb);
            }
        }
    }
}
