use crate::common_types::Pid;

/// One process that ran to completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub pid: Pid,
    /// Units of CPU work executed over the process lifetime
    pub instructions: u64,
}

/// Summary of a finished simulation run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Ticks the engine spent before draining
    pub ticks: u64,
    /// Completed processes, in termination order
    pub completions: Vec<Completion>,
}

impl RunReport {
    /// Pids in the order the processes terminated.
    pub fn completion_order(&self) -> Vec<Pid> {
        self.completions.iter().map(|c| c.pid).collect()
    }
}
