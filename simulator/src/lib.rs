//! A tick-driven CPU scheduling simulator.
//!
//! This library provides the engine of the simulation: synthetic
//! processes made of CPU and I/O bursts, the five classic scheduling
//! policies, an asynchronous I/O worker, and the CPU driver that ties
//! them together under a single tick clock.
//!
//! The harness owns the process control blocks, builds a [`Cpu`] for
//! the chosen [`SchedulingAlgorithm`], admits the processes and calls
//! [`Cpu::run`]; everything else happens inside.

mod config;
pub use config::SimConfig;

mod common_types;
pub use common_types::{AtomicState, Pid, ProcessState};

mod process;
pub use process::{Burst, BurstKind, Process, StepResult};

mod process_control_block;
pub use process_control_block::{Pcb, PcbRef};

mod schedulers;
pub use schedulers::{Admission, Scheduler, SchedulingAlgorithm};

mod interrupt_controller;
pub use interrupt_controller::InterruptController;

mod cpu;
pub use cpu::Cpu;

mod collector;
pub use collector::{Completion, RunReport};
