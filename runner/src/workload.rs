//! Synthetic workload generation.
//!
//! Builds processes whose burst mix follows the classic textbook shape:
//! mostly CPU work with occasional I/O waits. The generator runs on a
//! seedable ChaCha stream so a workload can be reproduced exactly by
//! rerunning with the same seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use simulator::{Burst, BurstKind, Pcb, PcbRef, Process, SchedulingAlgorithm, SimConfig};

/// Probability that a generated burst is CPU work rather than I/O.
const CPU_BURST_PROBABILITY: f64 = 0.7;
/// CPU burst duration bounds, in ticks.
const CPU_BURST_RANGE: (u32, u32) = (100, 2500);
/// I/O burst duration bounds, in milliseconds.
const IO_BURST_RANGE: (u32, u32) = (1000, 7500);
/// Initial priority bounds under the Priority policy.
const PRIORITY_RANGE: (u32, u32) = (0, 10);

/// A workload stream, optionally pinned to a seed.
pub fn rng(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    }
}

/// Generates one synthetic process.
///
/// The burst count is uniform within the configured bounds; each burst
/// is independently CPU or I/O work with a uniform duration. Under the
/// Priority policy the process also draws a random base priority.
pub fn generate(
    config: &SimConfig,
    algorithm: SchedulingAlgorithm,
    rng: &mut ChaCha20Rng,
) -> PcbRef {
    let burst_count = rng.gen_range(config.process_burst_minimum..=config.process_burst_maximum);

    let bursts: Vec<Burst> = (0..burst_count)
        .map(|_| {
            if rng.gen_bool(CPU_BURST_PROBABILITY) {
                Burst::new(BurstKind::Cpu, rng.gen_range(CPU_BURST_RANGE.0..=CPU_BURST_RANGE.1))
            } else {
                Burst::new(BurstKind::Io, rng.gen_range(IO_BURST_RANGE.0..=IO_BURST_RANGE.1))
            }
        })
        .collect();

    let priority = if algorithm == SchedulingAlgorithm::Priority {
        rng.gen_range(PRIORITY_RANGE.0..=PRIORITY_RANGE.1)
    } else {
        0
    };

    Pcb::new(
        Process::new(bursts, config.initial_burst_prediction as f32),
        priority,
    )
}
