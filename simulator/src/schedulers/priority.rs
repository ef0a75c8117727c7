//! Priority ordering.
//!
//! The ready process with the numerically largest current priority runs
//! next, and a newcomer that outranks the running process takes the CPU
//! immediately. Aging and decay of the priorities themselves are driven
//! by the CPU tick loop.

use std::collections::VecDeque;

use log::info;

use crate::process_control_block::PcbRef;

/// Whether `pcb` outranks the running process.
pub(super) fn should_preempt(pcb: &PcbRef, running: Option<&PcbRef>) -> bool {
    let Some(running) = running else {
        return false;
    };

    if pcb.priority() > running.priority() {
        info!(
            target: "sim::sched",
            "[PRIO] PID[{}] (prio {}) preempts PID[{}] (prio {})",
            pcb.pid(),
            pcb.priority(),
            running.pid(),
            running.priority(),
        );
        true
    } else {
        false
    }
}

pub(super) fn pop_next(ready: &mut VecDeque<PcbRef>) -> Option<PcbRef> {
    ready
        .make_contiguous()
        .sort_by(|a, b| b.priority().cmp(&a.priority()));

    ready.pop_front()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::ProcessState;
    use crate::process::{Burst, BurstKind, Process};
    use crate::process_control_block::Pcb;
    use crate::schedulers::{Admission, Scheduler, SchedulingAlgorithm};
    use std::sync::Arc;

    fn ready_block(priority: u32) -> PcbRef {
        let pcb = Pcb::new(
            Process::new([Burst::new(BurstKind::Cpu, 5)], 10.0),
            priority,
        );
        pcb.set_state(ProcessState::Ready);
        pcb
    }

    #[test]
    fn pops_the_most_urgent_first() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Priority);
        let low = ready_block(1);
        let high = ready_block(8);
        let mid = ready_block(4);

        for pcb in [&low, &high, &mid] {
            scheduler.on_new(pcb);
        }

        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &high));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &mid));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &low));
    }

    #[test]
    fn higher_priority_newcomer_preempts() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Priority);
        let running = ready_block(2);
        let urgent = ready_block(7);

        running.set_state(ProcessState::Running);

        assert_eq!(
            scheduler.on_ready(&urgent, Some(&running)),
            Admission::Preempt
        );
    }

    #[test]
    fn equal_priority_newcomer_queues() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Priority);
        let running = ready_block(3);
        let peer = ready_block(3);

        running.set_state(ProcessState::Running);

        assert_eq!(scheduler.on_ready(&peer, Some(&running)), Admission::Queued);
        assert_eq!(scheduler.ready_list().len(), 1);
    }
}
