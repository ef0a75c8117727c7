//! Interactive harness for the scheduling simulator.
//!
//! Asks for an algorithm and the simulation parameters, generates a
//! synthetic workload, owns the process control blocks for the duration
//! of the run and hands them to the engine.

mod logger;
mod workload;

use std::io::{self, BufRead, Write};

use simulator::{Cpu, PcbRef, SchedulingAlgorithm, SimConfig};

const ALGORITHMS: [SchedulingAlgorithm; 5] = [
    SchedulingAlgorithm::Fcfs,
    SchedulingAlgorithm::Sjf,
    SchedulingAlgorithm::Srtf,
    SchedulingAlgorithm::RoundRobin,
    SchedulingAlgorithm::Priority,
];

/// One pros line and one cons line per algorithm, in menu order.
const ALGORITHM_NOTES: [(&str, &str); 5] = [
    (
        "Simple to implement; minimal scheduler overhead",
        "Can suffer convoy effect; poor average waiting time",
    ),
    (
        "Minimizes average waiting time for known bursts",
        "Requires prior knowledge of burst lengths; risk of starvation",
    ),
    (
        "Preemptive variant of SJF; reacts to shorter arrivals",
        "High context-switching overhead; starvation of long jobs",
    ),
    (
        "Time-sharing fairness; no starvation if quantum chosen well",
        "Quantum too small -> high overhead; too large -> degenerates to FCFS",
    ),
    (
        "Controls task importance directly; flexible policy",
        "Low-priority starvation; priority inversion without extra handling",
    ),
];

/// Reads one number from stdin, keeping `default` on a blank line and
/// re-prompting while the input fails to parse.
fn read_number(default: i64) -> i64 {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.lock().read_line(&mut input).unwrap_or(0) == 0 {
            return default;
        }

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return default;
        }

        if let Ok(value) = trimmed.parse::<i64>() {
            return value;
        }
    }
}

fn prompt(text: &str, default: i64) -> i64 {
    print!("{text} [default - {default}] - ");
    io::stdout().flush().unwrap();
    read_number(default)
}

fn choose_algorithm() -> SchedulingAlgorithm {
    for (index, algorithm) in ALGORITHMS.iter().enumerate() {
        println!("[{index}] - {}", algorithm.name());
    }

    print!("Pick an algorithm to use: ");
    io::stdout().flush().unwrap();

    let choice = read_number(0);
    println!();

    // An index outside the menu maps to no scheduler at all
    let algorithm = usize::try_from(choice)
        .ok()
        .and_then(|index| ALGORITHMS.get(index));
    match algorithm {
        Some(algorithm) => *algorithm,
        None => panic!("unknown scheduling algorithm [{choice}]"),
    }
}

fn describe(algorithm: SchedulingAlgorithm) {
    let name = algorithm.name();
    println!("{name}");
    println!("{}", "-".repeat(name.len()));

    let index = ALGORITHMS.iter().position(|&a| a == algorithm).unwrap();
    let (pros, cons) = ALGORITHM_NOTES[index];
    println!("Pros - {pros}");
    println!("Cons - {cons}");
    println!(
        "Is preemption enabled for this algorithm? [{}]",
        if algorithm.is_preemptive() { "YES" } else { "NO" }
    );
    println!();
}

/// Walks the user through the simulation parameters.
fn configure(algorithm: SchedulingAlgorithm) -> (SimConfig, usize) {
    let mut config = SimConfig::default();

    println!("[SETTINGS]");
    println!("The following options are measured in ticks (ms):");

    config.process_creation_cost = prompt(
        "1. What is the cost of creating a new process?",
        config.process_creation_cost as i64,
    ) as u64;
    config.dispatch_latency = prompt(
        "2. What is the cost of a context switch?",
        config.dispatch_latency as i64,
    ) as u64;

    println!();
    println!("The following options are measured in quantity:");

    config.process_burst_minimum = prompt(
        "3. What is the minimum burst count of a process?",
        config.process_burst_minimum as i64,
    ) as u32;
    config.process_burst_maximum = prompt(
        "4. What is the maximum burst count of a process?",
        config.process_burst_maximum as i64,
    ) as u32;

    let process_count = prompt("5. How many processes do you want in this simulation?", 5) as usize;

    if algorithm == SchedulingAlgorithm::RoundRobin {
        config.round_robin_time_quantum = prompt(
            "6. How long should the time quantum be?",
            config.round_robin_time_quantum as i64,
        ) as u64;
    }

    println!("[/SETTINGS]");
    println!();

    (config, process_count)
}

fn main() {
    logger::init();

    println!("A basic CPU scheduling simulator");
    println!("--------------------------------");
    println!();

    // An optional seed on the command line reproduces a prior workload
    let seed = std::env::args().nth(1).and_then(|arg| arg.parse().ok());
    let mut rng = workload::rng(seed);

    let algorithm = choose_algorithm();
    describe(algorithm);

    let (config, process_count) = configure(algorithm);

    let mut cpu = Cpu::new(algorithm, config.clone());

    // The harness owns the blocks for the whole run; the engine and the
    // scheduler only hold references
    let mut pcbs: Vec<PcbRef> = Vec::with_capacity(process_count);
    for _ in 0..process_count {
        let pcb = workload::generate(&config, algorithm, &mut rng);
        cpu.add_process(pcb.clone());
        pcbs.push(pcb);
    }

    cpu.run();

    let report = cpu.report();
    println!();
    println!("[RESULTS]");
    println!("Engine drained after {} ticks", report.ticks);
    for (position, completion) in report.completions.iter().enumerate() {
        println!(
            "{position}. PID[{}] executed {} units of work",
            completion.pid, completion.instructions
        );
    }
}
