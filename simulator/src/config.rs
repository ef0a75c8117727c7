/// Tunable parameters of a simulation run.
///
/// Durations are measured in simulated milliseconds; one tick of the CPU
/// engine corresponds to one millisecond of work. The record is filled in
/// by the harness before the run starts and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Latency charged when admitting a newly created process
    pub process_creation_cost: u64,
    /// Cost of a context switch, charged as a sleep on the CPU thread
    pub dispatch_latency: u64,
    /// Inclusive lower bound on the number of bursts per process
    pub process_burst_minimum: u32,
    /// Inclusive upper bound on the number of bursts per process
    pub process_burst_maximum: u32,
    /// Seed value of the burst predictor for every new process
    pub initial_burst_prediction: u32,
    /// Ticks a process may hold the CPU under Round Robin before rotation
    pub round_robin_time_quantum: u64,
}

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            process_creation_cost: 5,
            dispatch_latency: 1000,
            process_burst_minimum: 5,
            process_burst_maximum: 25,
            initial_burst_prediction: 1000,
            round_robin_time_quantum: 2500,
        }
    }
}

impl SimConfig {
    /// Configuration with every simulated latency zeroed out.
    ///
    /// Used by tests that assert on tick arithmetic, where the wall-clock
    /// sleeps would only slow things down.
    pub fn instant() -> SimConfig {
        SimConfig {
            process_creation_cost: 0,
            dispatch_latency: 0,
            ..SimConfig::default()
        }
    }
}
