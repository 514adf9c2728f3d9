/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Structured, append-only logging for install runs, with
    runner annotations when executed inside a CI job.

  Security / Safety Notes:
    Log lines carry versions, URLs and paths only. Annotation
    payloads are escaped before they reach the runner.

  Dependencies:
    std::fs::File, std::sync::Mutex, sha2 for integrity hashing.

  Operational Scope:
    Shared by the entry point and the installer to emit RFC-3339
    UTC stamped entries and a session digest.

  Revision History:
    2024-11-04 COD  Established logging module.
    2025-11-02 COD  Added runner annotation output.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::action::workflow_command;
use crate::error::{Result, SetupError};

/// Structured log level.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn annotation(self) -> Option<&'static str> {
        match self {
            LogLevel::Info => None,
            LogLevel::Warn => Some("warning"),
            LogLevel::Error => Some("error"),
            LogLevel::Debug => Some("debug"),
        }
    }
}

/// Shared logger writing to stderr, an optional file, and runner annotations.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    verbose: bool,
    annotate: bool,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool, annotate: bool) -> Result<Self> {
        let file = if let Some(ref file_path) = path {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    SetupError::Config(format!(
                        "Failed to create log directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .map_err(|err| {
                    SetupError::Config(format!(
                        "Failed to open log file {}: {err}",
                        file_path.display()
                    ))
                })?;
            Some(Mutex::new(BufWriter::new(file)))
        } else {
            None
        };

        Ok(Self {
            file,
            path,
            verbose,
            annotate,
        })
    }

    /// Logger with no file and no annotations; used by tests.
    #[cfg(test)]
    pub fn quiet() -> Self {
        Self {
            file: None,
            path: None,
            verbose: false,
            annotate: false,
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let payload = format_entry(level, code, message.as_ref());

        match (self.annotate, level.annotation()) {
            // The runner hides ::debug:: lines unless step debugging is on.
            (true, Some(command)) => {
                let body = format!("[{code}] {}", message.as_ref());
                println!("{}", workflow_command(command, &body));
            }
            _ => {
                if self.verbose || level == LogLevel::Error || level == LogLevel::Warn {
                    eprintln!("{payload}");
                }
            }
        }

        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                if writeln!(guard, "{payload}").is_err() || guard.flush().is_err() {
                    let warning = "Failed to write log file";
                    eprintln!("{}", format_entry(LogLevel::Warn, "LOGGER", warning));
                }
            }
        }
    }

    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                guard.flush()?;
            }
        }
        let data = std::fs::read(path).map_err(|err| {
            SetupError::Config(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);
        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let mut file = File::create(&hash_path).map_err(|err| {
            SetupError::Config(format!(
                "Failed to create hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        writeln!(
            file,
            "{:x}  {}",
            digest,
            path.file_name().unwrap_or_default().to_string_lossy()
        )
        .map_err(|err| {
            SetupError::Config(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        Ok(())
    }
}

fn format_entry(level: LogLevel, code: &str, message: &str) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("{timestamp} [{}] [{code}] {message}", level.as_str())
}
