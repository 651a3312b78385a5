//! # BuildRun UI Utilities Module (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! User-facing progress output, separate from diagnostic logging. `tracing`
//! goes to stderr and is filtered by `RUST_LOG`/`-v`; the `Console` writes
//! the build log echo, the liveness countdown and the connection hints to
//! stdout, gated by the same `-v` count:
//!
//! - `0`: silent (errors still reach stderr)
//! - `1`: stage summaries, build log lines, countdown
//! - `2+`: also build/run arguments and push progress
//!
use std::fmt::Display;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    #[cfg(test)]
    Buffer(Arc<Mutex<String>>),
}

/// Verbosity-gated writer for stdout progress messages.
#[derive(Debug, Clone)]
pub struct Console {
    verbosity: u8,
    sink: Sink,
}

impl Console {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            sink: Sink::Stdout,
        }
    }

    /// A console whose output is collected in memory instead of stdout.
    #[cfg(test)]
    pub fn capture(verbosity: u8) -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        let console = Self {
            verbosity,
            sink: Sink::Buffer(Arc::clone(&buffer)),
        };
        (console, buffer)
    }

    /// Whether messages at `level` are printed.
    pub fn shows(&self, level: u8) -> bool {
        self.verbosity >= level
    }

    /// A line shown from `-v` on.
    pub fn say(&self, msg: impl Display) {
        if self.shows(1) {
            self.write(&format!("{}\n", msg));
        }
    }

    /// A line shown from `-vv` on.
    pub fn detail(&self, msg: impl Display) {
        if self.shows(2) {
            self.write(&format!("{}\n", msg));
        }
    }

    /// Rewrites the current line in place (countdowns).
    pub fn overwrite(&self, msg: impl Display) {
        if self.shows(1) {
            self.write(&format!("\r\t{}    ", msg));
        }
    }

    /// Rewrites the current line in place and ends it.
    pub fn finish_line(&self, msg: impl Display) {
        if self.shows(1) {
            self.write(&format!("\r\t{}    \n", msg));
        }
    }

    fn write(&self, text: &str) {
        match &self.sink {
            Sink::Stdout => {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            #[cfg(test)]
            Sink::Buffer(buffer) => buffer.lock().unwrap().push_str(text),
        }
    }
}
