//! Run log sink
//!
//! The batch writes a line-oriented, timestamped, leveled log
//! (`certificates_generation.log` in production). The sink is an explicitly
//! passed handle rather than process-global state so tests can capture and
//! inspect log output in isolation.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

enum Target {
    Writer(Box<dyn Write + Send>),
    Memory(Vec<String>),
}

/// Cheaply cloneable handle to a shared log target.
#[derive(Clone)]
pub struct RunLog {
    target: Arc<Mutex<Target>>,
}

impl RunLog {
    /// Open a log file in append mode.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self {
            target: Arc::new(Mutex::new(Target::Writer(Box::new(file)))),
        })
    }

    /// In-memory sink that keeps lines for later inspection.
    pub fn memory() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Memory(Vec::new()))),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Info, msg.as_ref());
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Warning, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Error, msg.as_ref());
    }

    fn write(&self, level: LogLevel, msg: &str) {
        let line = format!(
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level.as_str(),
            msg
        );
        let mut target = match self.target.lock() {
            Ok(guard) => guard,
            // A poisoned log is still a log.
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *target {
            Target::Writer(w) => {
                // Logging failures must not take the batch down.
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
            Target::Memory(lines) => lines.push(line),
        }
    }

    /// Captured lines of a `memory()` sink. Empty for file-backed sinks.
    pub fn lines(&self) -> Vec<String> {
        let target = match self.target.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &*target {
            Target::Memory(lines) => lines.clone(),
            Target::Writer(_) => Vec::new(),
        }
    }
}
