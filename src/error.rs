/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise setup-cue error types so every failed install
    reports one named kind and one stable exit code.

  Security / Safety Notes:
    Messages carry versions, URLs and local paths only; no
    tokens or request headers are ever formatted into them.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Returned by every resolver, fetcher and cache function and
    consumed once by the binary entry point.

  Revision History:
    2024-11-04 COD  Established shared error definitions.
    2025-11-02 COD  Reworked taxonomy around the install pipeline.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for setup-cue operations.
pub type Result<T> = std::result::Result<T, SetupError>;

/// Every way an install attempt can end early.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Input required and not supplied: {name}")]
    MissingInput { name: String },
    #[error("Invalid version `{version}`: {reason}")]
    InvalidVersion { version: String, reason: String },
    #[error("Unsupported Platform: {os}")]
    UnsupportedPlatform { os: String },
    #[error("Unsupported Architecture: {arch}")]
    UnsupportedArchitecture { arch: String },
    #[error("Unsupported Archive Type: {name}")]
    UnsupportedArchiveType { name: String },
    #[error("Download: {0}")]
    Download(String),
    #[error("Extraction: {0}")]
    Extraction(String),
    #[error("Cache: {0}")]
    Cache(String),
    #[error("Configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SetupError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SetupError::MissingInput { .. } => ExitCode::from(10),
            SetupError::InvalidVersion { .. } => ExitCode::from(11),
            SetupError::UnsupportedPlatform { .. } => ExitCode::from(20),
            SetupError::UnsupportedArchitecture { .. } => ExitCode::from(21),
            SetupError::UnsupportedArchiveType { .. } => ExitCode::from(22),
            SetupError::Download(_) => ExitCode::from(30),
            SetupError::Extraction(_) => ExitCode::from(31),
            SetupError::Cache(_) => ExitCode::from(40),
            SetupError::Config(_) => ExitCode::from(50),
            SetupError::Io(_) => ExitCode::from(41),
        }
    }

    /// Short name of the error kind, used as the log code on failure.
    pub fn kind(&self) -> &'static str {
        match self {
            SetupError::MissingInput { .. } => "MISSING_INPUT",
            SetupError::InvalidVersion { .. } => "INVALID_VERSION",
            SetupError::UnsupportedPlatform { .. } => "UNSUPPORTED_PLATFORM",
            SetupError::UnsupportedArchitecture { .. } => "UNSUPPORTED_ARCH",
            SetupError::UnsupportedArchiveType { .. } => "UNSUPPORTED_ARCHIVE",
            SetupError::Download(_) => "DOWNLOAD",
            SetupError::Extraction(_) => "EXTRACT",
            SetupError::Cache(_) => "CACHE",
            SetupError::Config(_) => "CONFIG",
            SetupError::Io(_) => "IO",
        }
    }
}
