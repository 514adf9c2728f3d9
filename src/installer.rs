/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::installer
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Drive one install: resolve the release, consult the tool
    cache, and on a miss fetch, extract and cache the archive.

  Security / Safety Notes:
    All scratch files live in a private temp workspace that is
    removed when the attempt ends, whether it succeeded or not.

  Dependencies:
    tempfile for the scratch workspace, tokio for blocking
    hand-off of extraction and cache copies.

  Operational Scope:
    Called exactly once per process by the entry point.

  Revision History:
    2025-11-02 COD  Authored install orchestrator.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Linear state progression with logged transitions
    - Terminal failure state; no retries
    - Cleanup on every exit path
============================================================*/

use std::path::{Path, PathBuf};

use crate::download::ArchiveFetcher;
use crate::error::{Result, SetupError};
use crate::extract::{extract_archive, extract_archive_by_name};
use crate::logger::Logger;
use crate::platform::HostPlatform;
use crate::resolver::{ReleaseAsset, RELEASE_BASE_URL};
use crate::tool_cache::ToolCache;
use crate::version::ToolVersion;

/// Cache key under which cue is stored.
pub const TOOL_NAME: &str = "cue";

/// Stages an install passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Start,
    Resolving,
    CacheCheck,
    CacheHit,
    CacheMiss,
    Fetching,
    Extracting,
    Caching,
    Done,
    Failed,
}

impl InstallState {
    fn code(self) -> &'static str {
        match self {
            InstallState::Start => "START",
            InstallState::Resolving => "RESOLVE",
            InstallState::CacheCheck => "CACHE",
            InstallState::CacheHit => "CACHE_HIT",
            InstallState::CacheMiss => "CACHE_MISS",
            InstallState::Fetching => "FETCH",
            InstallState::Extracting => "EXTRACT",
            InstallState::Caching => "COMMIT",
            InstallState::Done => "DONE",
            InstallState::Failed => "FAILED",
        }
    }
}

/// Outcome of the resolve and cache-check stages.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub version: ToolVersion,
    pub asset: ReleaseAsset,
    pub cached: Option<PathBuf>,
}

/// A usable cue installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub version: ToolVersion,
    pub path: PathBuf,
    pub cache_hit: bool,
    /// Release URL, or the local archive the cache was seeded from.
    pub source: String,
}

/// Where the archive for a cache miss comes from.
#[derive(Debug, Clone, Copy)]
enum Source<'s> {
    Release,
    Local(&'s Path),
}

pub struct Installer<'a, F> {
    fetcher: F,
    cache: ToolCache,
    host: HostPlatform,
    base_url: String,
    temp_root: PathBuf,
    keep_temp: bool,
    logger: &'a Logger,
}

impl<'a, F: ArchiveFetcher> Installer<'a, F> {
    pub fn new(fetcher: F, cache: ToolCache, host: HostPlatform, logger: &'a Logger) -> Self {
        Self {
            fetcher,
            cache,
            host,
            base_url: RELEASE_BASE_URL.to_string(),
            temp_root: std::env::temp_dir(),
            keep_temp: false,
            logger,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    pub fn keep_temp(mut self, keep: bool) -> Self {
        self.keep_temp = keep;
        self
    }

    fn enter<S: AsRef<str>>(&self, state: InstallState, detail: S) {
        self.logger.debug(state.code(), detail);
    }

    /// Resolve the release and look it up in the cache. Performs no downloads.
    pub fn plan(&self, version: &ToolVersion) -> Result<InstallPlan> {
        self.enter(
            InstallState::Resolving,
            format!("cue {version} for {} ({:?} naming)", self.host, version.naming_scheme()),
        );
        let asset = ReleaseAsset::resolve(version, &self.host, &self.base_url)?;

        self.enter(
            InstallState::CacheCheck,
            format!("looking up {}", self.cache.root().display()),
        );
        let cached = self.cache.find(TOOL_NAME, version, self.host.arch.cache_key());

        Ok(InstallPlan {
            version: version.clone(),
            asset,
            cached,
        })
    }

    /// Ensure `version` is installed and return its directory.
    pub async fn install(&self, version: &ToolVersion) -> Result<Installation> {
        self.attempt(version, Source::Release).await
    }

    /// Seed the cache for `version` from an archive already on disk.
    ///
    /// The archive format is taken from the file name. Nothing is downloaded.
    pub async fn install_from_archive(
        &self,
        version: &ToolVersion,
        archive: &Path,
    ) -> Result<Installation> {
        self.attempt(version, Source::Local(archive)).await
    }

    async fn attempt(&self, version: &ToolVersion, source: Source<'_>) -> Result<Installation> {
        self.enter(InstallState::Start, format!("requested cue {version}"));
        let outcome = self.run(version, source).await;
        match &outcome {
            Ok(installation) => self.enter(
                InstallState::Done,
                format!("cue {} at {}", installation.version, installation.path.display()),
            ),
            Err(err) => self.enter(InstallState::Failed, format!("{}: {err}", err.kind())),
        }
        outcome
    }

    async fn run(&self, version: &ToolVersion, source: Source<'_>) -> Result<Installation> {
        let mut plan = self.plan(version)?;

        if let Some(path) = plan.cached.take() {
            self.enter(InstallState::CacheHit, path.display().to_string());
            return Ok(Installation {
                version: plan.version,
                path,
                cache_hit: true,
                source: plan.asset.url,
            });
        }
        self.enter(InstallState::CacheMiss, format!("cue {version} not cached"));

        std::fs::create_dir_all(&self.temp_root)?;
        let workspace = tempfile::Builder::new()
            .prefix("setup-cue-")
            .tempdir_in(&self.temp_root)?;

        let origin = match source {
            Source::Release => plan.asset.url.clone(),
            Source::Local(archive) => archive.display().to_string(),
        };
        let outcome = self.populate(&plan, source, &origin, workspace.path()).await;

        if self.keep_temp {
            let kept = workspace.keep();
            self.logger
                .warn("KEEP_TEMP", format!("Leaving workspace {}", kept.display()));
        }

        outcome.map(|path| Installation {
            version: plan.version,
            path,
            cache_hit: false,
            source: origin,
        })
    }

    async fn populate(
        &self,
        plan: &InstallPlan,
        source: Source<'_>,
        origin: &str,
        workspace: &Path,
    ) -> Result<PathBuf> {
        let extract_dir = workspace.join("extracted");
        let extraction = match source {
            Source::Release => {
                let asset = &plan.asset;
                self.enter(InstallState::Fetching, asset.url.as_str());
                let archive = self.fetcher.download(&asset.url, workspace).await?;
                self.logger
                    .info("FETCH", format!("Downloaded {}", asset.file_name));

                self.enter(InstallState::Extracting, archive.display().to_string());
                let kind = asset.kind;
                tokio::task::spawn_blocking(move || extract_archive(kind, &archive, &extract_dir))
                    .await
            }
            Source::Local(archive) => {
                self.enter(InstallState::Extracting, archive.display().to_string());
                let archive = archive.to_path_buf();
                tokio::task::spawn_blocking(move || {
                    extract_archive_by_name(&archive, &extract_dir)
                })
                .await
            }
        };
        let extracted = extraction
            .map_err(|err| SetupError::Extraction(format!("Extraction task failed: {err}")))??;

        self.enter(InstallState::Caching, extracted.display().to_string());
        let cache = self.cache.clone();
        let version = plan.version.clone();
        let arch = self.host.arch.cache_key().to_string();
        let origin = origin.to_string();
        let cached = tokio::task::spawn_blocking(move || {
            cache.cache_dir(&extracted, TOOL_NAME, &version, &arch, Some(&origin))
        })
        .await
        .map_err(|err| SetupError::Cache(format!("Cache task failed: {err}")))??;

        self.logger
            .info("CACHE", format!("Cached at {}", cached.display()));
        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::extract::fixtures::{write_tar_gz, write_zip};
    use crate::platform::{HostArch, HostOs};
    use crate::resolver::ArchiveKind;

    const FILES: &[(&str, &[u8])] = &[("cue", b"cue-binary"), ("LICENSE", b"Apache")];

    enum Payload {
        Archive(ArchiveKind),
        /// An archive saved without any suffix in its file name.
        Unnamed(ArchiveKind),
        Garbage,
        NotFound,
    }

    struct FakeFetcher {
        payload: Payload,
        calls: AtomicUsize,
        urls: std::sync::Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(payload: Payload) -> Self {
            Self {
                payload,
                calls: AtomicUsize::new(0),
                urls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn write_archive(kind: ArchiveKind, target: &Path) {
        match kind {
            ArchiveKind::TarGz => write_tar_gz(target, FILES),
            ArchiveKind::Zip => write_zip(target, FILES),
        }
    }

    impl ArchiveFetcher for &FakeFetcher {
        async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            let mut target = dest_dir.join(url.rsplit('/').next().unwrap());
            match self.payload {
                Payload::Archive(kind) => write_archive(kind, &target),
                Payload::Unnamed(kind) => {
                    target = dest_dir.join("download");
                    write_archive(kind, &target);
                }
                Payload::Garbage => std::fs::write(&target, b"not an archive").unwrap(),
                Payload::NotFound => {
                    return Err(SetupError::Download(format!("GET {url} returned status 404")))
                }
            }
            Ok(target)
        }
    }

    fn linux_x64() -> HostPlatform {
        HostPlatform::new(HostOs::Linux, HostArch::X64)
    }

    fn v(raw: &str) -> ToolVersion {
        ToolVersion::parse(raw).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
    }

    fn installer<'a>(
        fetcher: &'a FakeFetcher,
        host: HostPlatform,
        dir: &Path,
        logger: &'a Logger,
    ) -> Installer<'a, &'a FakeFetcher> {
        Installer::new(fetcher, ToolCache::new(dir.join("cache")), host, logger)
            .with_temp_root(dir.join("tmp"))
    }

    #[tokio::test]
    async fn second_install_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);

        let first = installer.install(&v("0.7.0")).await.unwrap();
        let second = installer.install(&v("0.7.0")).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.path, second.path);
        assert_eq!(std::fs::read(first.path.join("cue")).unwrap(), b"cue-binary");
        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            ["https://github.com/cuelang/cue/releases/download/\
              v0.7.0/cue_v0.7.0_linux_amd64.tar.gz"]
        );
    }

    #[tokio::test]
    async fn legacy_versions_fetch_legacy_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger)
            .with_base_url("http://mirror.local");

        let installed = installer.install(&v("0.3.0-beta.5")).await.unwrap();

        assert_eq!(
            installed.source,
            "http://mirror.local/v0.3.0-beta.5/cue_0.3.0-beta.5_Linux_x86_64.tar.gz"
        );
        assert!(installed.path.ends_with("cue/0.3.0-beta.5/x64"));
    }

    #[tokio::test]
    async fn windows_installs_from_zip() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::Zip));
        let host = HostPlatform::new(HostOs::Windows, HostArch::X64);
        let installer = installer(&fetcher, host, dir.path(), &logger);

        let installed = installer.install(&v("0.7.0")).await.unwrap();

        assert!(installed.source.ends_with("cue_v0.7.0_windows_amd64.zip"));
        assert_eq!(std::fs::read(installed.path.join("LICENSE")).unwrap(), b"Apache");
    }

    #[tokio::test]
    async fn downloaded_file_name_does_not_pick_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();

        let fetcher = FakeFetcher::new(Payload::Unnamed(ArchiveKind::TarGz));
        let installed = installer(&fetcher, linux_x64(), dir.path(), &logger)
            .install(&v("0.7.0"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(installed.path.join("cue")).unwrap(), b"cue-binary");

        let fetcher = FakeFetcher::new(Payload::Unnamed(ArchiveKind::Zip));
        let windows = HostPlatform::new(HostOs::Windows, HostArch::X64);
        let installed = installer(&fetcher, windows, &dir.path().join("win"), &logger)
            .install(&v("0.7.0"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(installed.path.join("LICENSE")).unwrap(), b"Apache");
    }

    #[tokio::test]
    async fn unsupported_platform_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let host = HostPlatform::new(HostOs::Other("freebsd".into()), HostArch::X64);
        let installer = installer(&fetcher, host, dir.path(), &logger);

        let err = installer.install(&v("0.7.0")).await.unwrap_err();

        assert!(matches!(err, SetupError::UnsupportedPlatform { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_arch_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let host = HostPlatform::new(HostOs::Linux, HostArch::Other("ia32".into()));
        let installer = installer(&fetcher, host, dir.path(), &logger);

        let err = installer.install(&v("0.2.2")).await.unwrap_err();

        assert!(matches!(err, SetupError::UnsupportedArchitecture { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn failed_extraction_cleans_workspace_and_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Garbage);
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);

        let err = installer.install(&v("0.7.0")).await.unwrap_err();

        assert!(matches!(err, SetupError::Extraction(_)));
        assert_eq!(entries(&dir.path().join("tmp")), 0);
        let cache = ToolCache::new(dir.path().join("cache"));
        assert_eq!(cache.find(TOOL_NAME, &v("0.7.0"), "x64"), None);
    }

    #[tokio::test]
    async fn failed_download_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::NotFound);
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);

        let err = installer.install(&v("9.9.9")).await.unwrap_err();

        assert!(matches!(err, SetupError::Download(_)));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(entries(&dir.path().join("tmp")), 0);
    }

    #[tokio::test]
    async fn keep_temp_leaves_workspace_behind() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger).keep_temp(true);

        installer.install(&v("0.7.0")).await.unwrap();

        assert_eq!(entries(&dir.path().join("tmp")), 1);
    }

    #[tokio::test]
    async fn plan_reports_cache_state_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::Archive(ArchiveKind::TarGz));
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);

        let before = installer.plan(&v("0.7.0")).unwrap();
        assert!(before.cached.is_none());
        assert_eq!(before.asset.file_name, "cue_v0.7.0_linux_amd64.tar.gz");

        let installed = installer.install(&v("0.7.0")).await.unwrap();
        let after = installer.plan(&v("0.7.0")).unwrap();
        assert_eq!(after.cached, Some(installed.path));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn local_archive_seeds_the_cache_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::NotFound);
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);
        let archive = dir.path().join("cue_v0.7.0_linux_amd64.tar.gz");
        write_tar_gz(&archive, FILES);

        let seeded = installer.install_from_archive(&v("0.7.0"), &archive).await.unwrap();
        let again = installer.install(&v("0.7.0")).await.unwrap();

        assert!(!seeded.cache_hit);
        assert_eq!(seeded.source, archive.display().to_string());
        assert!(again.cache_hit);
        assert_eq!(std::fs::read(again.path.join("cue")).unwrap(), b"cue-binary");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn local_archive_with_unknown_suffix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::quiet();
        let fetcher = FakeFetcher::new(Payload::NotFound);
        let installer = installer(&fetcher, linux_x64(), dir.path(), &logger);
        let archive = dir.path().join("cue_v0.7.0_linux_amd64.tar.xz");
        std::fs::write(&archive, b"xz").unwrap();

        let err = installer
            .install_from_archive(&v("0.7.0"), &archive)
            .await
            .unwrap_err();

        assert!(matches!(err, SetupError::UnsupportedArchiveType { .. }));
        assert_eq!(entries(&dir.path().join("tmp")), 0);
        assert_eq!(fetcher.calls(), 0);
    }
}
