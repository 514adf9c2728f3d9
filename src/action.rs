/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::action
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Speak the CI runner's file and workflow-command protocol:
    read step inputs, export PATH entries and step outputs,
    and format annotations.

  Security / Safety Notes:
    Appends to runner-provided files only. Values written to
    workflow commands are escaped so they cannot inject
    further commands.

  Dependencies:
    chrono for heredoc delimiters.

  Operational Scope:
    Used by the entry point for input and output, and by the
    logger for annotations.

  Revision History:
    2025-11-02 COD  Authored runner protocol helpers.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only writes to runner files
    - Escaped command payloads
============================================================*/

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Result, SetupError};

pub const GITHUB_PATH_ENV: &str = "GITHUB_PATH";
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Environment key a runner uses for the step input `name`.
pub fn input_env_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_ascii_uppercase())
}

/// Read a step input through `lookup`. Empty values count as absent.
pub fn read_input<F>(name: &str, required: bool, lookup: F) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(&input_env_key(name))
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty());
    if value.is_none() && required {
        return Err(SetupError::MissingInput {
            name: name.to_string(),
        });
    }
    Ok(value)
}

/// Whether the process runs inside GitHub Actions.
pub fn in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").map(|v| v == "true").unwrap_or(false)
}

/// Whether the runner asked for step debug logging.
pub fn runner_debug() -> bool {
    std::env::var("RUNNER_DEBUG").map(|v| v == "1").unwrap_or(false)
}

/// Format a workflow command such as `::error::message`.
pub fn workflow_command(command: &str, message: &str) -> String {
    format!("::{command}::{}", escape_data(message))
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Handles to the runner's PATH and output files.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    path_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Runner {
    pub fn new(path_file: Option<PathBuf>, output_file: Option<PathBuf>) -> Self {
        Self {
            path_file,
            output_file,
        }
    }

    pub fn from_env() -> Self {
        let file = |key: &str| {
            std::env::var_os(key)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        Self::new(file(GITHUB_PATH_ENV), file(GITHUB_OUTPUT_ENV))
    }

    /// Make `dir` visible to later steps and to this process.
    pub fn add_path(&self, dir: &Path) -> Result<()> {
        match &self.path_file {
            Some(file) => append_line(file, &dir.to_string_lossy())?,
            None => println!("{}", workflow_command("add-path", &dir.to_string_lossy())),
        }
        prepend_process_path(dir)
    }

    /// Publish a step output. Without an output file this is a no-op.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let Some(file) = &self.output_file else {
            return Ok(());
        };
        let delimiter = format!(
            "ghadelimiter_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        append_line(file, &format!("{name}<<{delimiter}\n{value}\n{delimiter}"))
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            SetupError::Config(format!("Failed to open runner file {}: {err}", path.display()))
        })?;
    writeln!(file, "{line}").map_err(|err| {
        SetupError::Config(format!("Failed to write runner file {}: {err}", path.display()))
    })
}

fn prepend_process_path(dir: &Path) -> Result<()> {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&current));
    }
    let joined: OsString = std::env::join_paths(entries)
        .map_err(|err| SetupError::Config(format!("Cannot extend PATH: {err}")))?;
    std::env::set_var("PATH", joined);
    Ok(())
}
