//! Shortest-job-first ordering.
//!
//! Non-preemptive: the ready process with the smallest predicted burst
//! length runs next and keeps the CPU until it blocks or finishes. Ties
//! keep their arrival order (the sort is stable).

use std::collections::VecDeque;

use crate::process_control_block::PcbRef;

pub(super) fn pop_next(ready: &mut VecDeque<PcbRef>) -> Option<PcbRef> {
    ready
        .make_contiguous()
        .sort_by(|a, b| {
            a.process()
                .predicted_burst_length()
                .total_cmp(&b.process().predicted_burst_length())
        });

    let next = ready.pop_front();
    debug_assert_sorted(ready);
    next
}

/// Debug-build check that the remaining ready list is non-decreasing in
/// predicted burst length.
fn debug_assert_sorted(ready: &VecDeque<PcbRef>) {
    if cfg!(debug_assertions) {
        let lengths: Vec<f32> = ready
            .iter()
            .map(|p| p.process().predicted_burst_length())
            .collect();
        debug_assert!(
            lengths.windows(2).all(|w| w[0] <= w[1]),
            "ready list out of order after pop: {lengths:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::ProcessState;
    use crate::process::{Burst, BurstKind, Process};
    use crate::process_control_block::Pcb;
    use crate::schedulers::{Scheduler, SchedulingAlgorithm};
    use std::sync::Arc;

    fn predicted_block(prediction: f32) -> PcbRef {
        let pcb = Pcb::new(
            Process::new([Burst::new(BurstKind::Cpu, 5)], prediction),
            0,
        );
        pcb.set_state(ProcessState::Ready);
        pcb
    }

    #[test]
    fn pops_the_shortest_prediction_first() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Sjf);
        let long = predicted_block(900.0);
        let short = predicted_block(50.0);
        let medium = predicted_block(300.0);

        for pcb in [&long, &short, &medium] {
            scheduler.on_new(pcb);
        }

        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &short));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &medium));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &long));
    }

    #[test]
    fn equal_predictions_keep_arrival_order() {
        let scheduler = Scheduler::new(SchedulingAlgorithm::Sjf);
        let first = predicted_block(100.0);
        let second = predicted_block(100.0);
        let third = predicted_block(100.0);

        for pcb in [&first, &second, &third] {
            scheduler.on_new(pcb);
        }

        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &first));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &second));
        assert!(Arc::ptr_eq(&scheduler.pop_next().unwrap(), &third));
    }
}
