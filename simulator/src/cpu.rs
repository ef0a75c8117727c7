//! The CPU driver.
//!
//! [`Cpu`] owns the tick clock and runs the engine on the calling
//! thread; [`CpuCore`] is the shared half holding the active-process
//! slot, the scheduler and the admission/termination entry points, so
//! the I/O worker can re-admit processes without any back-pointer
//! through the PCBs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::collector::{Completion, RunReport};
use crate::common_types::{Pid, ProcessState};
use crate::config::SimConfig;
use crate::interrupt_controller::InterruptController;
use crate::process::{BurstKind, StepResult};
use crate::process_control_block::PcbRef;
use crate::schedulers::{Admission, Scheduler, SchedulingAlgorithm};

/// Ticks of inactivity before a waiting process gets a priority bump.
const AGING_THRESHOLD: u64 = 5000;
/// The running process sheds one aged priority point this often.
const DECAY_PERIOD: u64 = 1500;

/// State guarded by the CPU mutex.
struct Slot {
    /// The process currently holding the CPU
    running: Option<PcbRef>,
    /// Ticks the active process has held the CPU, for Round Robin
    quantum_timer: u64,
    /// When the CPU last went idle; cleared by the next context switch
    idle_since: Option<Instant>,
}

/// Shared core of the CPU driver.
///
/// Holds everything both the tick loop and the I/O worker touch: the
/// active slot, the scheduler, the run flag and the completion log.
pub(crate) struct CpuCore {
    scheduler: Scheduler,
    config: SimConfig,
    slot: Mutex<Slot>,
    active: AtomicBool,
    completions: Mutex<Vec<Completion>>,
}

impl CpuCore {
    /// Admission entry point.
    ///
    /// A `Created` process pays the creation cost, receives the lowest
    /// free identifier and enters the system; a `Ready` process goes to
    /// the scheduler, which may ask for the running process to be
    /// preempted. Anything else is a fatal misuse.
    pub(crate) fn add_process(&self, pcb: PcbRef) {
        match pcb.state() {
            ProcessState::Created => {
                thread::sleep(Duration::from_millis(self.config.process_creation_cost));

                let pid = self.allocate_pid();
                pcb.assign_pid(pid);
                pcb.set_state(ProcessState::Ready);

                info!(target: "sim::cpu", "PID[{pid}] admitted");
                self.scheduler.on_new(&pcb);
            }
            ProcessState::Ready => {
                let running = self.slot.lock().unwrap().running.clone();

                match self.scheduler.on_ready(&pcb, running.as_ref()) {
                    Admission::Queued => {}
                    Admission::Preempt => {
                        if let Some(displaced) = self.context_switch(pcb) {
                            self.scheduler.requeue(displaced);
                        }
                    }
                }
            }
            other => panic!(
                "tried to admit PID[{}] which is neither created nor ready ({})",
                pcb.pid(),
                other.label()
            ),
        }
    }

    /// Termination entry point.
    ///
    /// Drops the process from the scheduler, stops the engine once the
    /// full process list drains, and vacates the active slot if the
    /// departing process holds it.
    pub(crate) fn terminate_process(&self, pcb: &PcbRef) {
        let mut slot = self.slot.lock().unwrap();

        let removed = self.scheduler.on_terminate(pcb);
        if self.scheduler.is_process_list_empty() {
            info!(target: "sim::cpu", "no processes remain, exiting");
            self.active.store(false, Ordering::SeqCst);
        }

        pcb.set_state(ProcessState::Terminated);
        info!(target: "sim::exit", "PID[{}] terminated", pcb.pid());

        if removed {
            self.completions.lock().unwrap().push(Completion {
                pid: pcb.pid(),
                instructions: pcb.program_counter(),
            });
        }

        if let Some(active) = &slot.running {
            if Arc::ptr_eq(active, pcb) {
                slot.running = None;
            }
        }
    }

    /// Installs `next` on the CPU.
    ///
    /// The displaced process, if any, is demoted to `Ready`, has its
    /// burst prediction refreshed, and is returned to the caller for
    /// requeueing. The dispatch latency is charged while the CPU mutex
    /// is held, so admissions and terminations wait out the switch.
    pub(crate) fn context_switch(&self, next: PcbRef) -> Option<PcbRef> {
        let displaced;
        let idled;
        {
            let mut slot = self.slot.lock().unwrap();

            displaced = slot.running.take();
            if let Some(old) = &displaced {
                old.set_state(ProcessState::Ready);

                let mut process = old.process();
                if let Some(burst) = process.head() {
                    if !burst.is_complete() {
                        info!(
                            target: "sim::work",
                            "PID[{}] spent [{} ticks] in work",
                            old.pid(),
                            burst.progress()
                        );
                    }

                    // Burst still in progress, keep the estimate fresh
                    process.update_prediction();
                }
            }

            // Pretend to save registers, flush the TLB, and so on
            thread::sleep(Duration::from_millis(self.config.dispatch_latency));

            next.set_state(ProcessState::Running);
            if self.scheduler.algorithm() == SchedulingAlgorithm::Priority {
                next.reset_inactive_timer();
            }

            slot.running = Some(Arc::clone(&next));
            slot.quantum_timer = 0;
            idled = slot.idle_since.take();
        }

        match idled {
            Some(since) => info!(
                target: "sim::ctx",
                "[d/l {}ms] CPU idled for [{}ms], PID[{}] is active",
                self.config.dispatch_latency,
                since.elapsed().as_millis(),
                next.pid()
            ),
            None => info!(
                target: "sim::ctx",
                "[d/l {}ms] PID[{}] is active",
                self.config.dispatch_latency,
                next.pid()
            ),
        }

        displaced
    }

    /// The lowest nonnegative identifier not held by a live process.
    fn allocate_pid(&self) -> Pid {
        let processes = self.scheduler.process_list();
        let count = processes.len();

        let mut used = vec![false; count + 1];
        for pcb in &processes {
            let id = pcb.pid().get() as usize;
            if id <= count {
                used[id] = true;
            }
        }

        for (id, taken) in used.iter().enumerate() {
            if !taken {
                return Pid::new(id as u32);
            }
        }

        Pid::new(count as u32)
    }
}

/// The tick engine.
///
/// Owns the shared core, the I/O worker and the tick clock. Runs on the
/// thread that calls [`Cpu::run`].
pub struct Cpu {
    core: Arc<CpuCore>,
    irq: InterruptController,
    tick: u64,
}

impl Cpu {
    pub fn new(algorithm: SchedulingAlgorithm, config: SimConfig) -> Cpu {
        let core = Arc::new(CpuCore {
            scheduler: Scheduler::new(algorithm),
            config,
            slot: Mutex::new(Slot {
                running: None,
                quantum_timer: 0,
                idle_since: None,
            }),
            active: AtomicBool::new(true),
            completions: Mutex::new(Vec::new()),
        });

        let irq = InterruptController::start(Arc::clone(&core));

        Cpu {
            core,
            irq,
            tick: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.core.scheduler
    }

    pub fn config(&self) -> &SimConfig {
        &self.core.config
    }

    /// Admits a process; see [`CpuCore::add_process`].
    pub fn add_process(&self, pcb: PcbRef) {
        self.core.add_process(pcb);
    }

    /// Terminates a process; see [`CpuCore::terminate_process`].
    pub fn terminate_process(&self, pcb: &PcbRef) {
        self.core.terminate_process(pcb);
    }

    /// Runs the tick loop until every admitted process has terminated.
    pub fn run(&mut self) {
        let process_count = self.core.scheduler.process_list().len();
        if process_count == 0 {
            info!(target: "sim::cpu", "no processes admitted, nothing to run");
            return;
        }

        self.tick = 0;
        {
            let mut slot = self.core.slot.lock().unwrap();
            slot.running = None;
            slot.quantum_timer = 0;
            slot.idle_since = None;
        }
        self.core.active.store(true, Ordering::SeqCst);

        info!(target: "sim::cpu", "engine started with [{process_count}] processes");

        while self.core.active.load(Ordering::SeqCst) {
            self.step();
        }

        info!(
            target: "sim::cpu",
            "CPU finished execution after [{}] ticks with [{}] processes",
            self.tick,
            process_count
        );
    }

    /// Summary of the run so far.
    pub fn report(&self) -> RunReport {
        RunReport {
            ticks: self.tick,
            completions: self.core.completions.lock().unwrap().clone(),
        }
    }

    /// One tick of the engine.
    fn step(&mut self) {
        // An external state change (I/O block observed late, outside
        // termination) steals the slot; drop the process from the CPU.
        {
            let mut slot = self.core.slot.lock().unwrap();
            if let Some(active) = &slot.running {
                let state = active.state();
                if state != ProcessState::Running {
                    info!(
                        target: "sim::cpu",
                        "PID[{}] state changed to [{}] externally, dropping from CPU",
                        active.pid(),
                        state.label()
                    );
                    slot.running = None;
                }
            }
        }

        self.tick += 1;

        let algorithm = self.core.scheduler.algorithm();
        if algorithm == SchedulingAlgorithm::Priority {
            self.handle_priority_aging();
        }

        let active = self.core.slot.lock().unwrap().running.clone();
        let Some(pcb) = active else {
            // Nothing on the CPU; let the scheduler decide
            if let Some(next) = self.core.scheduler.pop_next() {
                if let Some(displaced) = self.core.context_switch(next) {
                    self.core.scheduler.requeue(displaced);
                }
            } else {
                let mut slot = self.core.slot.lock().unwrap();
                if slot.idle_since.is_none() {
                    slot.idle_since = Some(Instant::now());
                }
            }
            return;
        };

        let head = {
            let process = pcb.process();
            process.head().map(|b| (b.kind(), b.duration()))
        };

        let Some((kind, duration)) = head else {
            // No work left at all
            info!(target: "sim::cpu", "PID[{}] done", pcb.pid());
            self.core.terminate_process(&pcb);
            return;
        };

        if kind == BurstKind::Io {
            // Block immediately; the I/O worker resumes it later
            info!(
                target: "sim::io",
                "PID[{}] blocked on I/O for [{duration}ms]",
                pcb.pid()
            );
            pcb.set_state(ProcessState::Blocked);
            self.irq.notify_blocked(Arc::clone(&pcb));
            self.core.slot.lock().unwrap().running = None;
            return;
        }

        // A CPU burst: advance one unit of work
        let outcome = pcb.process().step();
        pcb.count_instruction();

        match outcome {
            StepResult::Finished => {
                self.core.terminate_process(&pcb);
                return;
            }
            StepResult::BurstComplete { duration } => self.log_burst_complete(&pcb, duration),
            StepResult::InProgress => {}
        }

        if algorithm == SchedulingAlgorithm::Priority && self.tick % DECAY_PERIOD == 0 {
            self.decay_active_priority(&pcb);
        }

        if algorithm == SchedulingAlgorithm::RoundRobin {
            self.enforce_quantum();
        }
    }

    fn log_burst_complete(&self, pcb: &PcbRef, duration: u32) {
        let algorithm = self.core.scheduler.algorithm();

        // The estimate is only contextually relevant under SJF / SRTF
        if matches!(
            algorithm,
            SchedulingAlgorithm::Sjf | SchedulingAlgorithm::Srtf
        ) {
            let remaining = pcb.process().remaining_predicted();
            info!(
                target: "sim::work",
                "PID[{}] spent [{duration} ticks] in work ~[{remaining:.1}ms]",
                pcb.pid()
            );
        } else {
            info!(
                target: "sim::work",
                "PID[{}] spent [{duration} ticks] in work",
                pcb.pid()
            );
        }
    }

    /// Ages every waiting process and preempts the running one if a
    /// starved process now outranks it.
    fn handle_priority_aging(&self) {
        let active = self.core.slot.lock().unwrap().running.clone();
        let ready = self.core.scheduler.ready_list();

        let mut highest: Option<PcbRef> = None;
        for pcb in ready {
            // Skip the currently active process
            if let Some(active) = &active {
                if Arc::ptr_eq(&pcb, active) {
                    continue;
                }
            }

            if pcb.tick_inactive_timer() > AGING_THRESHOLD {
                if pcb.priority() < u32::MAX {
                    let bumped = pcb.bump_priority();
                    info!(
                        target: "sim::sched",
                        "[PRIO] PID[{}] bumped to [{bumped}]",
                        pcb.pid()
                    );
                }

                pcb.reset_inactive_timer();
            }

            let replace = match &highest {
                Some(best) => pcb.priority() > best.priority(),
                None => true,
            };
            if replace {
                highest = Some(pcb);
            }
        }

        if let (Some(best), Some(active)) = (&highest, &active) {
            if best.priority() > active.priority() {
                info!(
                    target: "sim::sched",
                    "[PRIO] PID[{}] (prio {}) preempts PID[{}] (prio {}) after aging",
                    best.pid(),
                    best.priority(),
                    active.pid(),
                    active.priority()
                );
                self.switch_to_next_ready();
            }
        }
    }

    /// Decays the running process one step toward its base priority,
    /// then checks whether a ready process now outranks it.
    fn decay_active_priority(&self, pcb: &PcbRef) {
        if pcb.priority() <= pcb.base_priority() {
            return;
        }

        let decayed = pcb.decay_priority();
        info!(
            target: "sim::sched",
            "[PRIO] PID[{}] decayed to [{decayed}]",
            pcb.pid()
        );

        let best = self
            .core
            .scheduler
            .ready_list()
            .into_iter()
            .filter(|p| !Arc::ptr_eq(p, pcb))
            .max_by_key(|p| p.priority());

        if let Some(best) = best {
            if best.priority() > pcb.priority() {
                info!(
                    target: "sim::sched",
                    "[PRIO] PID[{}] (prio {}) preempts PID[{}] (prio {}) after decay",
                    best.pid(),
                    best.priority(),
                    pcb.pid(),
                    pcb.priority()
                );
                self.switch_to_next_ready();
            }
        }
    }

    /// Rotates the Round Robin quantum, switching to the next ready
    /// process when the slice expires.
    fn enforce_quantum(&self) {
        let expired = {
            let mut slot = self.core.slot.lock().unwrap();
            slot.quantum_timer += 1;
            slot.quantum_timer >= self.core.config.round_robin_time_quantum
        };

        if !expired {
            return;
        }

        if self.core.scheduler.ready_list().is_empty() {
            // No one to rotate to; the slice simply restarts
            self.core.slot.lock().unwrap().quantum_timer = 0;
            return;
        }

        info!(target: "sim::sched", "[RR] timeslice ended");
        self.switch_to_next_ready();
    }

    /// Pops the scheduler's best candidate, switches to it and requeues
    /// whatever was displaced.
    fn switch_to_next_ready(&self) {
        if let Some(next) = self.core.scheduler.pop_next() {
            if let Some(displaced) = self.core.context_switch(next) {
                self.core.scheduler.requeue(displaced);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Burst, Process};
    use crate::process_control_block::Pcb;

    fn instant(algorithm: SchedulingAlgorithm) -> Cpu {
        Cpu::new(algorithm, SimConfig::instant())
    }

    fn cpu_bound(durations: &[u32], prediction: f32, priority: u32) -> PcbRef {
        Pcb::new(
            Process::new(
                durations.iter().map(|&d| Burst::new(BurstKind::Cpu, d)),
                prediction,
            ),
            priority,
        )
    }

    fn active_process(cpu: &Cpu) -> Option<PcbRef> {
        cpu.core.slot.lock().unwrap().running.clone()
    }

    fn is_running(cpu: &Cpu) -> bool {
        cpu.core.active.load(Ordering::SeqCst)
    }

    fn instruction_counts(cpu: &Cpu) -> Vec<u64> {
        cpu.report()
            .completions
            .iter()
            .map(|c| c.instructions)
            .collect()
    }

    #[test]
    fn fcfs_completes_in_arrival_order() {
        let mut cpu = instant(SchedulingAlgorithm::Fcfs);

        for burst in [3, 2, 1] {
            cpu.add_process(cpu_bound(&[burst], 1000.0, 0));
        }
        cpu.run();

        let report = cpu.report();
        assert_eq!(
            report.completion_order(),
            vec![Pid::new(0), Pid::new(1), Pid::new(2)]
        );
        assert_eq!(instruction_counts(&cpu), vec![3, 2, 1]);
        // One switch tick per process plus six ticks of work
        assert_eq!(report.ticks, 9);
    }

    #[test]
    fn sjf_without_observations_degenerates_to_arrival_order() {
        let mut cpu = instant(SchedulingAlgorithm::Sjf);

        // Identical seed predictions, so nothing distinguishes the jobs
        for burst in [3, 2, 1] {
            cpu.add_process(cpu_bound(&[burst], 1000.0, 0));
        }
        cpu.run();

        assert_eq!(
            cpu.report().completion_order(),
            vec![Pid::new(0), Pid::new(1), Pid::new(2)]
        );
        assert_eq!(cpu.report().ticks, 9);
    }

    #[test]
    fn srtf_hands_the_cpu_to_a_shorter_newcomer() {
        let mut cpu = instant(SchedulingAlgorithm::Srtf);

        let long = cpu_bound(&[10], 20.0, 0);
        let short = cpu_bound(&[2], 2.0, 0);

        cpu.add_process(Arc::clone(&long));
        for _ in 0..3 {
            cpu.step();
        }
        assert_eq!(long.program_counter(), 2);

        // Arrives ready mid-run, the way an unblocked process would
        short.set_state(ProcessState::Ready);
        cpu.add_process(Arc::clone(&short));
        assert!(Arc::ptr_eq(&active_process(&cpu).unwrap(), &short));
        assert_eq!(long.state(), ProcessState::Ready);

        while is_running(&cpu) && cpu.tick < 100 {
            cpu.step();
        }

        assert_eq!(short.state(), ProcessState::Terminated);
        assert_eq!(long.state(), ProcessState::Terminated);
        assert_eq!(short.program_counter(), 2);
        assert_eq!(long.program_counter(), 10);
    }

    #[test]
    fn round_robin_rotates_on_quantum_expiry() {
        let config = SimConfig {
            round_robin_time_quantum: 2,
            ..SimConfig::instant()
        };
        let mut cpu = Cpu::new(SchedulingAlgorithm::RoundRobin, config);

        cpu.add_process(cpu_bound(&[5], 1000.0, 0));
        cpu.add_process(cpu_bound(&[5], 1000.0, 0));
        cpu.run();

        let report = cpu.report();
        assert_eq!(report.completion_order(), vec![Pid::new(0), Pid::new(1)]);
        assert_eq!(instruction_counts(&cpu), vec![5, 5]);
        // Ten ticks of work plus one tick per switch-in or rotation
        assert_eq!(report.ticks, 12);
    }

    #[test]
    fn round_robin_alone_just_restarts_its_slice() {
        let config = SimConfig {
            round_robin_time_quantum: 2,
            ..SimConfig::instant()
        };
        let mut cpu = Cpu::new(SchedulingAlgorithm::RoundRobin, config);

        cpu.add_process(cpu_bound(&[5], 1000.0, 0));
        cpu.run();

        assert_eq!(cpu.report().ticks, 6);
        assert_eq!(instruction_counts(&cpu), vec![5]);
    }

    #[test]
    fn priority_newcomer_preempts_on_admission() {
        let mut cpu = instant(SchedulingAlgorithm::Priority);

        let meek = cpu_bound(&[10], 1000.0, 1);
        let urgent = cpu_bound(&[3], 1000.0, 5);

        cpu.add_process(Arc::clone(&meek));
        for _ in 0..3 {
            cpu.step();
        }

        urgent.set_state(ProcessState::Ready);
        cpu.add_process(Arc::clone(&urgent));
        assert!(Arc::ptr_eq(&active_process(&cpu).unwrap(), &urgent));

        while is_running(&cpu) && cpu.tick < 100 {
            cpu.step();
        }

        assert_eq!(urgent.program_counter(), 3);
        assert_eq!(meek.program_counter(), 10);
    }

    #[test]
    fn priority_aging_lifts_a_starved_process() {
        let mut cpu = instant(SchedulingAlgorithm::Priority);

        let hog = cpu_bound(&[40_000], 1000.0, 5);
        let starved = cpu_bound(&[10], 1000.0, 1);

        cpu.add_process(Arc::clone(&hog));
        cpu.add_process(Arc::clone(&starved));

        while starved.state() != ProcessState::Terminated && cpu.tick < 30_000 {
            cpu.step();
        }

        // Five bumps take it from 1 past the hog's 5, then it runs
        assert_eq!(starved.state(), ProcessState::Terminated);
        assert_eq!(starved.priority(), 6);
        assert_eq!(starved.program_counter(), 10);
        assert_eq!(hog.priority(), 5);
        assert!(is_running(&cpu));
    }

    #[test]
    fn priority_decay_steps_back_toward_base() {
        let mut cpu = instant(SchedulingAlgorithm::Priority);

        let first = cpu_bound(&[8000], 1000.0, 3);
        let second = cpu_bound(&[9000], 1000.0, 3);

        cpu.add_process(Arc::clone(&first));
        cpu.add_process(Arc::clone(&second));

        // The second process ages to 4, preempts, then decays back
        for _ in 0..6100 {
            cpu.step();
        }

        assert!(Arc::ptr_eq(&active_process(&cpu).unwrap(), &second));
        assert_eq!(second.priority(), 3);
        assert_eq!(first.priority(), 3);
    }

    #[test]
    fn lowest_free_pid_is_reused() {
        let cpu = instant(SchedulingAlgorithm::Fcfs);

        let a = cpu_bound(&[5], 1000.0, 0);
        let b = cpu_bound(&[5], 1000.0, 0);
        let c = cpu_bound(&[5], 1000.0, 0);

        for pcb in [&a, &b, &c] {
            cpu.add_process(Arc::clone(pcb));
        }
        assert_eq!(
            (a.pid(), b.pid(), c.pid()),
            (Pid::new(0), Pid::new(1), Pid::new(2))
        );

        cpu.terminate_process(&b);

        let d = cpu_bound(&[5], 1000.0, 0);
        cpu.add_process(Arc::clone(&d));
        assert_eq!(d.pid(), Pid::new(1));
    }

    #[test]
    #[should_panic(expected = "neither created nor ready")]
    fn admitting_a_running_process_is_fatal() {
        let cpu = instant(SchedulingAlgorithm::Fcfs);

        let pcb = cpu_bound(&[5], 1000.0, 0);
        pcb.set_state(ProcessState::Running);
        cpu.add_process(pcb);
    }

    #[test]
    #[should_panic(expected = "blocked twice")]
    fn double_blocking_a_process_is_fatal() {
        let cpu = instant(SchedulingAlgorithm::Fcfs);

        let pcb = Pcb::new(
            Process::new([Burst::new(BurstKind::Io, 5000)], 1000.0),
            0,
        );
        pcb.set_state(ProcessState::Blocked);

        cpu.irq.notify_blocked(Arc::clone(&pcb));
        cpu.irq.notify_blocked(pcb);
    }
}
