/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::platform
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Describe the host operating system and CPU architecture
    that a cue release must be resolved for.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    None beyond std.

  Operational Scope:
    Detected once by the entry point and passed explicitly to
    the resolver and the tool cache.

  Revision History:
    2025-11-02 COD  Introduced explicit host platform types.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - No ambient global state inside resolution logic
============================================================*/

use std::fmt;

/// Host operating system as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl HostOs {
    /// Interpret an OS name. Accepts Rust (`macos`) and Node (`win32`) spellings.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "linux" => HostOs::Linux,
            "darwin" | "macos" => HostOs::Darwin,
            "windows" | "win32" => HostOs::Windows,
            other => HostOs::Other(other.to_string()),
        }
    }

    /// The OS this binary was compiled for.
    pub fn current() -> Self {
        Self::parse(std::env::consts::OS)
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Linux => f.write_str("linux"),
            HostOs::Darwin => f.write_str("darwin"),
            HostOs::Windows => f.write_str("windows"),
            HostOs::Other(name) => f.write_str(name),
        }
    }
}

/// Host CPU architecture as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostArch {
    /// 64-bit x86, the only architecture cue releases are resolved for.
    X64,
    Other(String),
}

impl HostArch {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => HostArch::X64,
            other => HostArch::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Self::parse(std::env::consts::ARCH)
    }

    /// Key used for cache directories, in the runner tool-cache spelling.
    pub fn cache_key(&self) -> &str {
        match self {
            HostArch::X64 => "x64",
            HostArch::Other(name) => name,
        }
    }
}

impl fmt::Display for HostArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

/// The (os, arch) pair a release is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Detect the running host, letting explicit overrides win.
    pub fn detect(os_override: Option<&str>, arch_override: Option<&str>) -> Self {
        let os = os_override.map(HostOs::parse).unwrap_or_else(HostOs::current);
        let arch = arch_override
            .map(HostArch::parse)
            .unwrap_or_else(HostArch::current);
        Self::new(os, arch)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
