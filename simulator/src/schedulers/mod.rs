//! Scheduling policies.
//!
//! A single [`Scheduler`] owns the full process list and the ready list
//! behind one mutex; the five policies share that state and differ only
//! in how [`Scheduler::pop_next`] orders the ready list and whether
//! [`Scheduler::on_ready`] asks for the running process to be preempted.
//!
//! Preemption is reported back to the caller as an [`Admission`] request
//! instead of being executed under the scheduler lock, so the CPU driver
//! performs the context switch only after the queues are released.

mod fcfs;
mod priority;
mod round_robin;
mod sjf;
mod srtf;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::common_types::ProcessState;
use crate::process_control_block::PcbRef;

/// The five scheduling policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingAlgorithm {
    /// First come, first served
    Fcfs,
    /// Shortest job first; runs every picked job to completion
    Sjf,
    /// Shortest remaining time first; preempts for shorter newcomers
    Srtf,
    /// FCFS with a time quantum enforced by the CPU driver
    RoundRobin,
    /// Numerically largest current priority wins
    Priority,
}

impl SchedulingAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            SchedulingAlgorithm::Fcfs => "FCFS - First Come First Served",
            SchedulingAlgorithm::Sjf => "SJF - Shortest Job First",
            SchedulingAlgorithm::Srtf => "SRTF - Shortest Remaining Time First",
            SchedulingAlgorithm::RoundRobin => "Round Robin",
            SchedulingAlgorithm::Priority => "Priority",
        }
    }

    /// Whether the policy may take the CPU away from a running process.
    pub fn is_preemptive(self) -> bool {
        match self {
            SchedulingAlgorithm::Fcfs | SchedulingAlgorithm::Sjf => false,
            SchedulingAlgorithm::Srtf
            | SchedulingAlgorithm::RoundRobin
            | SchedulingAlgorithm::Priority => true,
        }
    }
}

/// What the caller must do after offering a ready process.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// The process joined the ready list; nothing further to do.
    Queued,
    /// The newcomer outranks the running process. The caller must context
    /// switch to it and requeue whatever was displaced; the newcomer was
    /// not added to the ready list.
    Preempt,
}

struct Queues {
    /// Every non-terminated process that ever entered the system
    all: Vec<PcbRef>,
    /// The subset currently ready to run
    ready: VecDeque<PcbRef>,
}

/// Policy-tagged scheduler state.
pub struct Scheduler {
    algorithm: SchedulingAlgorithm,
    queues: Mutex<Queues>,
}

impl Scheduler {
    pub fn new(algorithm: SchedulingAlgorithm) -> Scheduler {
        Scheduler {
            algorithm,
            queues: Mutex::new(Queues {
                all: Vec::new(),
                ready: VecDeque::new(),
            }),
        }
    }

    pub fn algorithm(&self) -> SchedulingAlgorithm {
        self.algorithm
    }

    /// Registers a process that just entered the system.
    ///
    /// * `pcb` - the admitted process; if it is already ready it also
    ///   joins the ready list
    pub fn on_new(&self, pcb: &PcbRef) {
        let mut queues = self.queues.lock().unwrap();
        queues.all.push(Arc::clone(pcb));

        if pcb.state() == ProcessState::Ready {
            queues.ready.push_back(Arc::clone(pcb));
        }
    }

    /// Offers a process that became ready to run.
    ///
    /// * `pcb` - the ready process
    /// * `running` - snapshot of the process occupying the CPU, if any
    ///
    /// Preemptive policies may answer [`Admission::Preempt`] instead of
    /// queueing the newcomer; the caller then performs the switch.
    pub fn on_ready(&self, pcb: &PcbRef, running: Option<&PcbRef>) -> Admission {
        let mut queues = self.queues.lock().unwrap();

        let preempt = match self.algorithm {
            SchedulingAlgorithm::Fcfs
            | SchedulingAlgorithm::Sjf
            | SchedulingAlgorithm::RoundRobin => false,
            SchedulingAlgorithm::Srtf => srtf::should_preempt(pcb, running),
            SchedulingAlgorithm::Priority => priority::should_preempt(pcb, running),
        };

        if preempt {
            Admission::Preempt
        } else {
            queues.ready.push_back(Arc::clone(pcb));
            Admission::Queued
        }
    }

    /// Re-admits a displaced process to the ready list.
    ///
    /// Used for the victim of a preemption or quantum rotation; unlike
    /// [`Scheduler::on_ready`] this never triggers another preemption.
    pub fn requeue(&self, pcb: PcbRef) {
        let mut queues = self.queues.lock().unwrap();
        queues.ready.push_back(pcb);
    }

    /// Drops a process from both lists. Idempotent.
    ///
    /// Returns true if the process was still registered.
    pub fn on_terminate(&self, pcb: &PcbRef) -> bool {
        let mut queues = self.queues.lock().unwrap();

        let before = queues.all.len();
        queues.all.retain(|p| !Arc::ptr_eq(p, pcb));
        queues.ready.retain(|p| !Arc::ptr_eq(p, pcb));

        queues.all.len() != before
    }

    /// Applies the policy ordering and removes the best ready candidate.
    pub fn pop_next(&self) -> Option<PcbRef> {
        let mut queues = self.queues.lock().unwrap();

        if queues.ready.is_empty() {
            return None;
        }

        match self.algorithm {
            SchedulingAlgorithm::Fcfs | SchedulingAlgorithm::RoundRobin => {
                fcfs::pop_next(&mut queues.ready)
            }
            SchedulingAlgorithm::Sjf => sjf::pop_next(&mut queues.ready),
            SchedulingAlgorithm::Srtf => srtf::pop_next(&mut queues.ready),
            SchedulingAlgorithm::Priority => priority::pop_next(&mut queues.ready),
        }
    }

    /// Snapshot of every registered process.
    pub fn process_list(&self) -> Vec<PcbRef> {
        self.queues.lock().unwrap().all.clone()
    }

    /// Snapshot of the ready list.
    pub fn ready_list(&self) -> Vec<PcbRef> {
        self.queues.lock().unwrap().ready.iter().cloned().collect()
    }

    pub fn is_process_list_empty(&self) -> bool {
        self.queues.lock().unwrap().all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::ProcessState;
    use crate::process::{Burst, BurstKind, Process};
    use crate::process_control_block::Pcb;

    fn ready_block(burst: u32, prediction: f32) -> PcbRef {
        let pcb = Pcb::new(
            Process::new([Burst::new(BurstKind::Cpu, burst)], prediction),
            0,
        );
        pcb.set_state(ProcessState::Ready);
        pcb
    }

    #[test]
    fn on_new_only_readies_ready_processes() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Fcfs);

        let created = Pcb::new(Process::new([Burst::new(BurstKind::Cpu, 1)], 1.0), 0);
        let ready = ready_block(1, 1.0);

        scheduler.on_new(&created);
        scheduler.on_new(&ready);

        assert_eq!(scheduler.process_list().len(), 2);
        assert_eq!(scheduler.ready_list().len(), 1);
        assert!(Arc::ptr_eq(&scheduler.ready_list()[0], &ready));
    }

    #[test]
    fn on_terminate_is_idempotent() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Fcfs);
        let pcb = ready_block(1, 1.0);

        scheduler.on_new(&pcb);

        assert!(scheduler.on_terminate(&pcb));
        assert!(!scheduler.on_terminate(&pcb));
        assert!(scheduler.is_process_list_empty());
        assert!(scheduler.ready_list().is_empty());
    }

    #[test]
    fn requeue_skips_the_preemption_check() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Priority);

        let running = ready_block(1, 1.0);
        let urgent = Pcb::new(Process::new([Burst::new(BurstKind::Cpu, 1)], 1.0), 9);
        urgent.set_state(ProcessState::Ready);

        // Offering the urgent process asks for a preemption, requeueing
        // it does not.
        assert_eq!(scheduler.on_ready(&urgent, Some(&running)), Admission::Preempt);
        scheduler.requeue(Arc::clone(&urgent));

        assert_eq!(scheduler.ready_list().len(), 1);
    }
}
