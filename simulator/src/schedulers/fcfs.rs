//! First-come-first-served ordering.
//!
//! The ready list is a plain FIFO queue; arrival order is selection
//! order and nothing ever preempts. Round Robin shares this ordering,
//! with the quantum enforced by the CPU driver.

use std::collections::VecDeque;

use crate::process_control_block::PcbRef;

pub(super) fn pop_next(ready: &mut VecDeque<PcbRef>) -> Option<PcbRef> {
    ready.pop_front()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::ProcessState;
    use crate::process::{Burst, BurstKind, Process};
    use crate::process_control_block::Pcb;
    use crate::schedulers::{Scheduler, SchedulingAlgorithm};
    use std::sync::Arc;

    fn ready_block() -> PcbRef {
        let pcb = Pcb::new(Process::new([Burst::new(BurstKind::Cpu, 3)], 10.0), 0);
        pcb.set_state(ProcessState::Ready);
        pcb
    }

    #[test]
    fn pops_in_arrival_order() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Fcfs);
        let first = ready_block();
        let second = ready_block();

        scheduler.on_new(&first);
        scheduler.on_new(&second);

        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &first));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &second));
        assert!(scheduler.pop_next().is_none());
    }

    #[test]
    fn never_asks_for_preemption() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Fcfs);
        let running = ready_block();
        let newcomer = ready_block();

        let admission = scheduler.on_ready(&newcomer, Some(&running));
        assert_eq!(admission, crate::schedulers::Admission::Queued);
    }
}
