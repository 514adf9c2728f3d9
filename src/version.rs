/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::version
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Parse the requested cue version and decide which release
    naming scheme applies to it.

  Security / Safety Notes:
    Pure computation; no I/O performed in this module.

  Dependencies:
    semver for version parsing and precedence.

  Operational Scope:
    Feeds the resolver and keys the tool cache.

  Revision History:
    2025-11-02 COD  Consolidated the naming threshold check.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One comparison, many consumers
    - Structured parsing with clear failure modes
============================================================*/

use std::fmt;

use semver::{BuildMetadata, Prerelease, Version};

use crate::error::{Result, SetupError};

/// A parsed, normalised cue version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    raw: String,
    parsed: Version,
}

impl ToolVersion {
    /// Parse a version string, tolerating one leading `v`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let candidate = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = Version::parse(candidate).map_err(|err| SetupError::InvalidVersion {
            version: input.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            raw: candidate.to_string(),
            parsed,
        })
    }

    /// Version text without a `v` prefix, as used in URLs and cache keys.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &Version {
        &self.parsed
    }

    /// Naming scheme of the release artifacts for this version.
    pub fn naming_scheme(&self) -> NamingScheme {
        NamingScheme::for_version(&self.parsed)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Artifact naming convention in force for a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `cue_0.2.2_Linux_x86_64.tar.gz`
    Legacy,
    /// `cue_v0.7.0_linux_amd64.tar.gz`
    Current,
}

impl NamingScheme {
    /// Build metadata does not take part in the comparison.
    pub fn for_version(version: &Version) -> Self {
        let mut release = version.clone();
        release.build = BuildMetadata::EMPTY;
        if release <= legacy_threshold() {
            NamingScheme::Legacy
        } else {
            NamingScheme::Current
        }
    }

    /// Token placed before the version inside the artifact file name.
    pub fn file_prefix(self) -> &'static str {
        match self {
            NamingScheme::Legacy => "",
            NamingScheme::Current => "v",
        }
    }
}

/// Last release published with capitalised platform names and `x86_64`.
fn legacy_threshold() -> Version {
    Version {
        major: 0,
        minor: 3,
        patch: 0,
        pre: Prerelease::new("beta.5").unwrap_or(Prerelease::EMPTY),
        build: BuildMetadata::EMPTY,
    }
}
