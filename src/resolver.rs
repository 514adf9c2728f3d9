/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::resolver
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Map a cue version and host platform to the platform token,
    architecture token, archive format and download URL of the
    matching upstream release artifact.

  Security / Safety Notes:
    Pure computation. URLs always point at the configured base
    (GitHub releases by default); nothing is fetched here.

  Dependencies:
    None beyond crate types.

  Operational Scope:
    First step of every install; failures here happen before
    any network or filesystem access.

  Revision History:
    2025-11-02 COD  Authored version-aware release resolver.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling, no process exits
    - Single naming decision shared by every token
============================================================*/

use std::fmt;

use crate::error::{Result, SetupError};
use crate::platform::{HostArch, HostOs, HostPlatform};
use crate::version::{NamingScheme, ToolVersion};

/// Default location of cue release artifacts.
pub const RELEASE_BASE_URL: &str = "https://github.com/cuelang/cue/releases/download";

/// Archive formats cue releases are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }

    /// Recognise an archive by file name suffix.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveKind::TarGz)
        } else {
            Err(SetupError::UnsupportedArchiveType {
                name: name.to_string(),
            })
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Platform token used in artifact names.
pub fn resolve_platform_id(scheme: NamingScheme, os: &HostOs) -> Result<&'static str> {
    let token = match (scheme, os) {
        (NamingScheme::Legacy, HostOs::Linux) => "Linux",
        (NamingScheme::Legacy, HostOs::Darwin) => "Darwin",
        (NamingScheme::Legacy, HostOs::Windows) => "Windows",
        (NamingScheme::Current, HostOs::Linux) => "linux",
        (NamingScheme::Current, HostOs::Darwin) => "darwin",
        (NamingScheme::Current, HostOs::Windows) => "windows",
        (_, HostOs::Other(name)) => {
            return Err(SetupError::UnsupportedPlatform { os: name.clone() })
        }
    };
    Ok(token)
}

/// Architecture token used in artifact names.
pub fn resolve_arch_id(scheme: NamingScheme, arch: &HostArch) -> Result<&'static str> {
    match (scheme, arch) {
        (NamingScheme::Legacy, HostArch::X64) => Ok("x86_64"),
        (NamingScheme::Current, HostArch::X64) => Ok("amd64"),
        (_, HostArch::Other(name)) => Err(SetupError::UnsupportedArchitecture {
            arch: name.clone(),
        }),
    }
}

/// Archive format published for a host OS. Does not depend on version.
pub fn resolve_archive_extension(os: &HostOs) -> Result<ArchiveKind> {
    match os {
        HostOs::Windows => Ok(ArchiveKind::Zip),
        HostOs::Linux | HostOs::Darwin => Ok(ArchiveKind::TarGz),
        HostOs::Other(name) => Err(SetupError::UnsupportedPlatform { os: name.clone() }),
    }
}

/// Download URL of the release artifact below `base_url`.
///
/// Platform is checked before architecture, so a supported platform with an
/// unsupported CPU reports `UnsupportedArchitecture`.
pub fn build_url(version: &ToolVersion, host: &HostPlatform, base_url: &str) -> Result<String> {
    let scheme = version.naming_scheme();
    let platform = resolve_platform_id(scheme, &host.os)?;
    let arch = resolve_arch_id(scheme, &host.arch)?;
    let ext = resolve_archive_extension(&host.os)?.extension();

    // The release tag carries a `v` under both schemes.
    Ok(format!(
        "{base}/v{version}/cue_{prefix}{version}_{platform}_{arch}.{ext}",
        base = base_url.trim_end_matches('/'),
        prefix = scheme.file_prefix(),
    ))
}

/// A fully resolved release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub file_name: String,
    pub url: String,
    pub kind: ArchiveKind,
}

impl ReleaseAsset {
    /// Resolve the artifact for `version` on `host` below `base_url`.
    pub fn resolve(version: &ToolVersion, host: &HostPlatform, base_url: &str) -> Result<Self> {
        let url = build_url(version, host, base_url)?;
        let kind = resolve_archive_extension(&host.os)?;
        let file_name = url.rsplit('/').next().unwrap_or_default().to_string();
        Ok(Self {
            file_name,
            url,
            kind,
        })
    }
}
