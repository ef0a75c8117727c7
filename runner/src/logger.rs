//! Colorized console sink for the engine's event stream.
//!
//! Every engine event arrives through the `log` facade with a stable
//! `sim::*` target; this logger maps the target to a column-aligned
//! category tag and an ANSI color, and serializes output behind a mutex
//! so lines from the CPU thread and the I/O worker never interleave.

use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

struct Category {
    tag: &'static str,
    color: u8,
}

fn categorize(target: &str) -> Category {
    match target {
        "sim::exit" => Category { tag: "[EXIT]      ", color: 31 },
        "sim::sched" => Category { tag: "[SCHEDULER] ", color: 32 },
        "sim::ctx" => Category { tag: "[CTX SWITCH]", color: 33 },
        "sim::work" => Category { tag: "[CPU WORK]  ", color: 34 },
        "sim::io" => Category { tag: "[I/O]       ", color: 35 },
        _ => Category { tag: "[INFO]      ", color: 37 },
    }
}

struct ConsoleLogger {
    console: Mutex<()>,
}

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let Category { tag, color } = categorize(record.target());

        let _guard = self.console.lock().unwrap();
        println!("\x1b[{color}m{tag} | {}\x1b[0m", record.args());
    }

    fn flush(&self) {}
}

/// Installs the console logger as the global sink.
pub fn init() {
    log::set_boxed_logger(Box::new(ConsoleLogger {
        console: Mutex::new(()),
    }))
    .expect("a logger was already installed");
    log::set_max_level(LevelFilter::Info);
}
