/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::tool_cache
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Persistent tool cache keyed by tool name, version and
    architecture, laid out the way CI runners lay out their
    hosted tool cache.

  Security / Safety Notes:
    Writes only beneath the configured cache root. Entries are
    published by writing a completion marker last, so a crash
    mid-copy leaves an entry that lookups ignore.

  Dependencies:
    serde_json for receipts, chrono for timestamps.

  Operational Scope:
    Consulted before every download and written once per miss.

  Revision History:
    2025-11-02 COD  Authored tool cache.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Marker-last publication
    - Idempotent writes for identical inputs
============================================================*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SetupError};
use crate::version::ToolVersion;

/// Metadata stored in an entry's completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheReceipt {
    pub tool: String,
    pub version: String,
    pub arch: String,
    pub source: Option<String>,
    pub installed_at: String,
}

/// Cache rooted at a directory such as `$RUNNER_TOOL_CACHE`.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, name: &str, version: &ToolVersion, arch: &str) -> PathBuf {
        self.root.join(name).join(version.as_str()).join(arch)
    }

    fn marker_path(&self, name: &str, version: &ToolVersion, arch: &str) -> PathBuf {
        self.root
            .join(name)
            .join(version.as_str())
            .join(format!("{arch}.complete"))
    }

    /// Cached directory for the key, or `None` when absent or incomplete.
    pub fn find(&self, name: &str, version: &ToolVersion, arch: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(name, version, arch);
        if dir.is_dir() && self.marker_path(name, version, arch).is_file() {
            Some(dir)
        } else {
            None
        }
    }

    /// Receipt of a completed entry, if one can be read.
    pub fn receipt(&self, name: &str, version: &ToolVersion, arch: &str) -> Option<CacheReceipt> {
        let text = fs::read_to_string(self.marker_path(name, version, arch)).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Copy `source` into the cache under the key and return the cached path.
    pub fn cache_dir(
        &self,
        source: &Path,
        name: &str,
        version: &ToolVersion,
        arch: &str,
        origin: Option<&str>,
    ) -> Result<PathBuf> {
        if !source.is_dir() {
            return Err(SetupError::Cache(format!(
                "Source {} is not a directory",
                source.display()
            )));
        }

        let dest = self.entry_dir(name, version, arch);
        let marker = self.marker_path(name, version, arch);

        remove_if_exists(&marker, false)
            .and_then(|_| remove_if_exists(&dest, true))
            .and_then(|_| fs::create_dir_all(&dest))
            .and_then(|_| copy_dir_recursive(source, &dest))
            .map_err(|err| {
                SetupError::Cache(format!(
                    "Failed to populate {} from {}: {err}",
                    dest.display(),
                    source.display()
                ))
            })?;

        let receipt = CacheReceipt {
            tool: name.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            source: origin.map(str::to_string),
            installed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let body = serde_json::to_string_pretty(&receipt)
            .map_err(|err| SetupError::Cache(format!("Failed to encode receipt: {err}")))?;
        fs::write(&marker, body).map_err(|err| {
            SetupError::Cache(format!("Failed to write marker {}: {err}", marker.display()))
        })?;

        Ok(dest)
    }

    /// Completed versions of `name` for `arch`, oldest first.
    pub fn find_all_versions(&self, name: &str, arch: &str) -> Result<Vec<ToolVersion>> {
        let tool_dir = self.root.join(name);
        let entries = match fs::read_dir(&tool_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(SetupError::Cache(format!(
                    "Failed to list {}: {err}",
                    tool_dir.display()
                )))
            }
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(raw) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(version) = ToolVersion::parse(&raw) else {
                continue;
            };
            if self.find(name, &version, arch).is_some() {
                versions.push(version);
            }
        }
        versions.sort_by(|a, b| a.semver().cmp(b.semver()));
        Ok(versions)
    }
}

fn remove_if_exists(path: &Path, dir: bool) -> io::Result<()> {
    let result = if dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            // fs::copy carries permission bits, keeping the binary executable.
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_file() {
        fs::copy(src, dst)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> ToolVersion {
        ToolVersion::parse(raw).unwrap()
    }

    fn staged_tool(dir: &Path) -> PathBuf {
        let source = dir.join("staged");
        fs::create_dir_all(source.join("doc")).unwrap();
        fs::write(source.join("cue"), b"#!/bin/sh\necho cue\n").unwrap();
        fs::write(source.join("doc").join("README.md"), b"readme").unwrap();
        source
    }

    #[test]
    fn lookup_misses_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path().join("cache"));
        assert_eq!(cache.find("cue", &v("0.7.0"), "x64"), None);
    }

    #[test]
    fn commit_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path().join("cache"));
        let source = staged_tool(dir.path());

        let cached = cache
            .cache_dir(&source, "cue", &v("0.7.0"), "x64", Some("https://example/cue.tar.gz"))
            .unwrap();

        assert_eq!(cached, dir.path().join("cache").join("cue").join("0.7.0").join("x64"));
        assert_eq!(fs::read(cached.join("doc").join("README.md")).unwrap(), b"readme");
        assert_eq!(cache.find("cue", &v("0.7.0"), "x64"), Some(cached.clone()));
        assert_eq!(cache.find("cue", &v("v0.7.0"), "x64"), Some(cached));
        assert_eq!(cache.find("cue", &v("0.7.0"), "arm64"), None);

        let receipt = cache.receipt("cue", &v("0.7.0"), "x64").unwrap();
        assert_eq!(receipt.tool, "cue");
        assert_eq!(receipt.version, "0.7.0");
        assert_eq!(receipt.source.as_deref(), Some("https://example/cue.tar.gz"));
    }

    #[test]
    fn commit_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path().join("cache"));
        let source = staged_tool(dir.path());

        let first = cache.cache_dir(&source, "cue", &v("0.7.0"), "x64", None).unwrap();
        let second = cache.cache_dir(&source, "cue", &v("0.7.0"), "x64", None).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(second.join("cue")).unwrap(), b"#!/bin/sh\necho cue\n");
    }

    #[test]
    fn entry_without_marker_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path());
        fs::create_dir_all(dir.path().join("cue").join("0.7.0").join("x64")).unwrap();
        assert_eq!(cache.find("cue", &v("0.7.0"), "x64"), None);
    }

    #[test]
    fn missing_source_is_a_cache_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path());
        let err = cache
            .cache_dir(&dir.path().join("absent"), "cue", &v("0.7.0"), "x64", None)
            .unwrap_err();
        assert!(matches!(err, SetupError::Cache(_)));
    }

    #[test]
    fn lists_completed_versions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ToolCache::new(dir.path().join("cache"));
        let source = staged_tool(dir.path());
        for raw in ["0.7.0", "0.3.0-beta.5", "0.10.0"] {
            cache.cache_dir(&source, "cue", &v(raw), "x64", None).unwrap();
        }
        fs::create_dir_all(dir.path().join("cache").join("cue").join("0.9.0").join("x64")).unwrap();

        let listed: Vec<String> = cache
            .find_all_versions("cue", "x64")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(listed, ["0.3.0-beta.5", "0.7.0", "0.10.0"]);
        assert!(cache.find_all_versions("gofmt", "x64").unwrap().is_empty());
    }
}
