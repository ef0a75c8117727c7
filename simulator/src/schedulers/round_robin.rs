//! Round Robin ordering.
//!
//! The ready list behaves exactly like FCFS; what makes the policy
//! rotate is the time quantum, which the CPU driver tracks against its
//! tick clock. On expiry the driver pops the next process and requeues
//! the displaced one at the back, giving every ready process a slice in
//! turn.
