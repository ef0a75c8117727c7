//! Shortest-remaining-time-first ordering.
//!
//! Preemptive variant of SJF: the ready list is ordered by the live
//! remaining-prediction estimate, and a newcomer with less predicted
//! work left than the running process takes the CPU from it.

use std::collections::VecDeque;

use log::info;

use crate::process_control_block::PcbRef;

/// Whether `pcb` should displace the running process.
///
/// True when the running process' remaining predicted burst strictly
/// exceeds the newcomer's at the moment of the call.
pub(super) fn should_preempt(pcb: &PcbRef, running: Option<&PcbRef>) -> bool {
    let Some(running) = running else {
        return false;
    };

    let running_left = running.process().remaining_predicted();
    let newcomer_left = pcb.process().remaining_predicted();

    if running_left > newcomer_left {
        info!(
            target: "sim::sched",
            "[SRTF] PID[{}] ({running_left:.1}) preempted by PID[{}] ({newcomer_left:.1})",
            running.pid(),
            pcb.pid(),
        );
        true
    } else {
        false
    }
}

pub(super) fn pop_next(ready: &mut VecDeque<PcbRef>) -> Option<PcbRef> {
    ready.make_contiguous().sort_by(|a, b| {
        a.process()
            .remaining_predicted()
            .total_cmp(&b.process().remaining_predicted())
    });

    let next = ready.pop_front();
    debug_assert_sorted(ready);
    next
}

/// Debug-build check that the remaining ready list is non-decreasing in
/// remaining predicted burst length.
fn debug_assert_sorted(ready: &VecDeque<PcbRef>) {
    if cfg!(debug_assertions) {
        let lengths: Vec<f32> = ready
            .iter()
            .map(|p| p.process().remaining_predicted())
            .collect();
        debug_assert!(
            lengths.windows(2).all(|w| w[0] <= w[1]),
            "ready list out of order after pop: {lengths:?}"
        );
    }
}
