//! End-to-end mirror construction.
//!
//! A [`MirrorBuilder`] drives one run: extend the user's selection (bootstrap
//! set, `Base` category, include-all), expand dependencies, turn the
//! resolved packages into a fetch plan, synthesise the metadata files a
//! stock installer expects, download everything with size/checksum
//! verification and bounded retry, and hand the populated
//! [`GarbageCollector`] back for the confirmation step.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use url::Url;

use cygmir_schema::hash::HashAlg;
use cygmir_schema::{Arch, Epoch, FetchEntry, FetchStats, HexDigest, pretty_size};

use crate::catalog::{Catalog, CatalogData, FileKind};
use crate::error::CoreError;
use crate::garbage::GarbageCollector;
use crate::reporter::{Reporter, Severity, Verbosity};
use crate::resolver;
use crate::selection::PackageSelection;
use crate::transport::Transport;
use crate::verify;

/// Default mirror hosting the package archives.
pub const DEFAULT_MIRROR_URL: &str =
    "https://www.mirrorservice.org/sites/sourceware.org/pub/cygwin/";

/// Default installer location. `${arch}` expands to the target architecture
/// and `${_arch}` to the architecture with a leading dash.
pub const DEFAULT_INSTALLER_URL: &str = "https://www.cygwin.com/setup${_arch}.exe";

/// Minimal bootstrap selection used when the caller names no packages:
/// a shell, core utilities and archive tools.
pub const BOOTSTRAP_PACKAGES: [&str; 10] = [
    "base-cygwin",
    "base-files",
    "bash",
    "bzip2",
    "coreutils",
    "dash",
    "gzip",
    "tar",
    "unzip",
    "zip",
];

// The downstream installer requires these exact filenames; they are not
// configurable.
const SETUP_INI: &str = "setup.ini";
const SETUP_BZ2: &str = "setup.bz2";

/// Digest manifests written alongside the regenerated catalogue.
const SUM_ALGS: [HashAlg; 3] = [HashAlg::Md5, HashAlg::Sha256, HashAlg::Sha512];

/// Retry behaviour for the download phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of rounds over the failing entries (including the first).
    pub rounds: u32,
    /// Pause between rounds.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rounds: 3,
            delay: Duration::from_secs(10),
        }
    }
}

/// Options controlling one mirror run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Mirror every non-internal, non-obsolete package.
    pub all_packages: bool,
    /// Dry run: log the plan, perform no I/O.
    pub dummy_download: bool,
    /// Union in every package of the `Base` category (default on), so the
    /// result is minimally bootable regardless of what was asked for.
    pub include_base: bool,
    /// Emit an `autorun.inf` pointing at the installer.
    pub make_autorun: bool,
    /// Additionally fetch the `source` variant of each package.
    pub include_sources: bool,
    /// Retry behaviour for failing downloads.
    pub retry: RetryPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            all_packages: false,
            dummy_download: false,
            include_base: true,
            make_autorun: false,
            include_sources: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of one mirror run.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The resolved package list, sorted.
    pub packages: Vec<String>,
    /// The fetch plan the run worked from.
    pub plan: Vec<FetchEntry>,
    /// Download statistics.
    pub stats: FetchStats,
    /// The populated collector for the cleanup confirmation step; `None`
    /// after a dry run, which indexes nothing and must purge nothing.
    pub garbage: Option<GarbageCollector>,
}

enum DownloadOutcome {
    Downloaded,
    AlreadyPresent,
    Failed(String),
}

/// Constructs a partial local mirror of a remote package repository.
pub struct MirrorBuilder {
    target_dir: PathBuf,
    mirror_url: Url,
    installer_url: String,
    ini_url: Option<Url>,
    arch: Arch,
    epochs: Vec<Epoch>,
    options: BuildOptions,
    catalog: Catalog,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn Reporter>,
    cancelled: Arc<AtomicBool>,
}

impl std::fmt::Debug for MirrorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorBuilder")
            .field("target_dir", &self.target_dir)
            .field("mirror_url", &self.mirror_url.as_str())
            .field("arch", &self.arch)
            .field("epochs", &self.epochs)
            .finish_non_exhaustive()
    }
}

impl MirrorBuilder {
    /// Create a builder with default mirror, installer, architecture and
    /// options, targeting the current directory.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in default mirror URL always parses.
    pub fn new(transport: Arc<dyn Transport>, reporter: Arc<dyn Reporter>) -> Self {
        let mirror_url = Url::parse(DEFAULT_MIRROR_URL).unwrap_or_else(|_| {
            unreachable!("default mirror URL is valid");
        });
        Self {
            target_dir: PathBuf::from("."),
            mirror_url,
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            ini_url: None,
            arch: Arch::default(),
            epochs: vec![Epoch::Curr],
            options: BuildOptions::default(),
            catalog: Catalog::new(Arc::clone(&transport), Arc::clone(&reporter)),
            transport,
            reporter,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the root directory beneath which packages will be assembled.
    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = dir.into();
        self
    }

    /// Set the mirror site hosting the package archives. A trailing slash
    /// is added when missing so relative joins behave.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Config`] when the URL does not parse.
    pub fn with_mirror(mut self, url: &str) -> Result<Self, CoreError> {
        let mut text = url.to_string();
        if !text.ends_with('/') {
            text.push('/');
        }
        self.mirror_url = Url::parse(&text)
            .map_err(|err| CoreError::Config(format!("invalid mirror URL '{url}': {err}")))?;
        Ok(self)
    }

    /// Set the installer URL template (`${arch}`/`${_arch}` substituted).
    pub fn with_installer_url(mut self, url: impl Into<String>) -> Self {
        self.installer_url = url.into();
        self
    }

    /// Override the catalogue URL instead of deriving it from the mirror.
    pub fn with_setup_ini_url(mut self, url: Url) -> Self {
        self.ini_url = Some(url);
        self
    }

    /// Set the target architecture.
    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    /// Set the epoch priority list consulted during resolution and fetch.
    pub fn with_epochs(mut self, epochs: Vec<Epoch>) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// The target directory.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// The target architecture.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// The mirror URL, normalised with a trailing slash.
    pub fn mirror_url(&self) -> &Url {
        &self.mirror_url
    }

    /// The catalogue URL: an explicit override when one was set, otherwise
    /// `<mirror>/<arch>/setup.xz`.
    ///
    /// # Errors
    ///
    /// Fails when the derived URL cannot be constructed.
    pub fn setup_ini_url(&self) -> Result<Url, CoreError> {
        match &self.ini_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self
                .mirror_url
                .join(&format!("{}/setup.xz", self.arch.as_str()))?),
        }
    }

    /// The installer URL with architecture placeholders substituted.
    pub fn installer_url(&self) -> String {
        self.installer_url
            .replace("${_arch}", &format!("-{}", self.arch.as_str()))
            .replace("${arch}", self.arch.as_str())
    }

    /// A handle that aborts the download phase when set. The flag is
    /// checked before each file; files already downloaded are kept and not
    /// counted as failures.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Request cancellation of an in-flight run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Access the underlying catalogue (for template generation and
    /// category listings).
    ///
    /// # Errors
    ///
    /// Fails when the catalogue cannot be fetched or parsed.
    pub async fn catalog_data(&self) -> Result<Arc<CatalogData>, CoreError> {
        self.catalog.set_source(self.setup_ini_url()?).await;
        self.catalog.data().await
    }

    /// Run one complete mirror pass over the given selection. `None` means
    /// "use the bootstrap set".
    ///
    /// # Errors
    ///
    /// Fails on configuration, catalogue, or resolution errors, on an
    /// absolute archive path in the fetch plan, and on failure to write the
    /// metadata files. Per-file download failures do *not* fail the run;
    /// they are retried and finally reported through
    /// [`FetchStats::failures`].
    pub async fn run(&self, selection: Option<&PackageSelection>) -> Result<BuildOutcome, CoreError> {
        if self.epochs.is_empty() {
            return Err(CoreError::Config("empty epoch list".to_string()));
        }
        self.cancelled.store(false, Ordering::SeqCst);

        let data = self.catalog_data().await?;

        let user = selection.map(|sel| sel.extract(&[("arch", self.arch.as_str())]));
        let selected = self.extend_selection(&data, user);
        let packages = resolver::expand(&data, selected, &self.epochs, self.reporter.as_ref())?;
        let plan = self.build_fetch_list(&data, &packages)?;

        let mut stats = FetchStats::for_plan(&plan);
        self.reporter.info(&format!(
            "Download size: {} from {}",
            pretty_size(stats.total_size()),
            self.mirror_url
        ));

        let arch_dir = self.target_dir.join(self.arch.as_str());
        let noarch_dir = self.target_dir.join("noarch");
        let mut garbage = GarbageCollector::new(Arc::clone(&self.reporter));
        garbage.index_current_files(&[&arch_dir, &noarch_dir], 1);

        if self.options.dummy_download {
            for entry in &plan {
                self.reporter.info(&format!(
                    "  {} ({})",
                    entry.basename(),
                    pretty_size(entry.size)
                ));
            }
            return Ok(BuildOutcome {
                packages,
                plan,
                stats,
                garbage: None,
            });
        }

        self.do_download(&data, &packages, &plan, &mut garbage, &mut stats)
            .await?;

        Ok(BuildOutcome {
            packages,
            plan,
            stats,
            garbage: Some(garbage),
        })
    }

    /// Write a template package listing for the current catalogue.
    ///
    /// # Errors
    ///
    /// Fails when the catalogue is unavailable or the file cannot be
    /// written.
    pub async fn write_template(
        &self,
        out_path: &Path,
        selection: Option<&PackageSelection>,
        terse: bool,
    ) -> Result<(), CoreError> {
        let data = self.catalog_data().await?;
        let source = self.setup_ini_url()?;
        let mut out = std::fs::File::create(out_path)?;
        crate::template::make_template(&data, source.as_str(), selection, terse, &mut out)?;
        Ok(())
    }

    /// Amend the user's selection with the bootstrap set, the whole
    /// catalogue, or the `Base` category, per the options.
    fn extend_selection(
        &self,
        data: &CatalogData,
        user: Option<Vec<String>>,
    ) -> Vec<String> {
        let mut selected: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

        if data.is_empty() {
            return Vec::new();
        }

        if self.options.all_packages {
            for (name, record) in data.iter() {
                if name.starts_with('_') {
                    continue;
                }
                let cats = record.get("category").unwrap_or_default();
                if cats.split_whitespace().any(|c| c == "_obsolete") {
                    continue;
                }
                selected.insert(name.to_string());
            }
        } else {
            match user {
                Some(names) => selected.extend(names),
                None => selected.extend(BOOTSTRAP_PACKAGES.iter().map(ToString::to_string)),
            }
        }

        if self.options.include_base {
            for (name, record) in data.iter() {
                let cats = record.get("category").unwrap_or_default();
                if cats.split_whitespace().any(|c| c == "Base") {
                    selected.insert(name.to_string());
                }
            }
        }

        selected.into_iter().collect()
    }

    /// Convert the resolved package list into `(path, size, hash)` fetch
    /// entries, one per requested variant and epoch.
    fn build_fetch_list(
        &self,
        data: &CatalogData,
        packages: &[String],
    ) -> Result<Vec<FetchEntry>, CoreError> {
        let mut plan = Vec::new();

        for name in packages {
            let Some(record) = data.get(name) else {
                continue;
            };
            let has_deps = record.has_dependencies();

            let mut kinds: Vec<FileKind> = record.default_file_kind().into_iter().collect();
            if self.options.include_sources && !kinds.contains(&FileKind::Source) {
                kinds.push(FileKind::Source);
            }

            for kind in &kinds {
                for epoch in &self.epochs {
                    let Some(value) = record.get_in(kind.as_str(), std::slice::from_ref(epoch))
                    else {
                        // Dependency-bearing entries with no payload are
                        // assumed to be pure "meta" grouping packages.
                        let verbosity = if has_deps {
                            Verbosity::High
                        } else {
                            Verbosity::Medium
                        };
                        self.reporter.message(
                            &format!(
                                "Cannot find package filename for {name} in variant '{}:{epoch}'",
                                kind.as_str()
                            ),
                            Severity::Warning,
                            verbosity,
                        );
                        continue;
                    };

                    match parse_fetch_entry(value) {
                        Ok(Some(entry)) => plan.push(entry),
                        Ok(None) => {
                            self.reporter.warning(&format!(
                                "Cannot find package filename for {name} in variant '{}:{epoch}'",
                                kind.as_str()
                            ));
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        Ok(plan)
    }

    async fn do_download(
        &self,
        data: &CatalogData,
        packages: &[String],
        plan: &[FetchEntry],
        garbage: &mut GarbageCollector,
        stats: &mut FetchStats,
    ) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(self.target_dir.join(self.arch.as_str())).await?;

        tracing::debug!(files = plan.len(), "starting download phase");
        self.build_setup_files(data, packages, garbage).await?;

        // Reject absolute paths and rescue every target before any
        // transfer, so a parallel purge can never race a fresh download.
        let mut pending: Vec<(FetchEntry, PathBuf)> = Vec::with_capacity(plan.len());
        for entry in plan {
            if is_absolute_ref(&entry.path) {
                return Err(CoreError::AbsolutePath {
                    path: entry.path.clone(),
                });
            }
            let target = self.target_dir.join(&entry.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            garbage.rescue_file(&target);
            pending.push((entry.clone(), target));
        }

        let mut rounds_left = self.options.retry.rounds;
        'rounds: while !pending.is_empty() && rounds_left > 0 {
            rounds_left -= 1;
            let mut retry_next = Vec::new();

            for (entry, target) in pending {
                if self.cancelled.load(Ordering::SeqCst) {
                    self.reporter.info("** Downloading cancelled **");
                    break 'rounds;
                }

                self.reporter.start_operation(
                    &format!("  {} ({})", entry.basename(), pretty_size(entry.size)),
                    Verbosity::Medium,
                );

                match self.download_single(&entry, &target).await {
                    DownloadOutcome::Downloaded => {
                        self.reporter.end_operation("done", Severity::Normal);
                        stats.add_new(entry.size);
                    }
                    DownloadOutcome::AlreadyPresent => {
                        self.reporter
                            .end_operation("already present", Severity::Normal);
                        stats.add_already(entry.size);
                    }
                    DownloadOutcome::Failed(reason) => {
                        self.reporter
                            .end_operation(&format!(" FAILED ({reason})"), Severity::Warning);
                        if tokio::fs::metadata(&target).await.is_ok() {
                            let _ = tokio::fs::remove_file(&target).await;
                        }
                        if rounds_left > 0 {
                            retry_next.push((entry, target));
                        } else {
                            stats.add_fail(entry.size);
                        }
                    }
                }
            }

            if rounds_left > 0 && !retry_next.is_empty() {
                self.reporter.info(&format!(
                    "\n** Retrying {} download(s) **",
                    retry_next.len()
                ));
                tokio::time::sleep(self.options.retry.delay).await;
            }
            pending = retry_next;
        }

        if stats.is_clean() {
            self.reporter.info(&format!(
                "{} package(s) mirrored, {} new",
                stats.total(),
                stats.new_count()
            ));
        } else {
            self.reporter.warning(&format!(
                "{}/{} package(s) failed to download",
                stats.failures(),
                stats.total()
            ));
        }

        Ok(())
    }

    /// Attempt to download and validate a single archive.
    async fn download_single(&self, entry: &FetchEntry, target: &Path) -> DownloadOutcome {
        let already = tokio::fs::metadata(target)
            .await
            .map(|meta| meta.is_file() && meta.len() == entry.size)
            .unwrap_or(false);

        let freshly_downloaded = if already {
            false
        } else {
            let url = match self.mirror_url.join(&entry.path) {
                Ok(url) => url,
                Err(err) => return DownloadOutcome::Failed(err.to_string()),
            };
            match self.transport.download(&url, target).await {
                Err(err) => return DownloadOutcome::Failed(err.to_string()),
                Ok(_) => {
                    let size = tokio::fs::metadata(target)
                        .await
                        .map(|meta| meta.len())
                        .unwrap_or(0);
                    if size != entry.size {
                        return DownloadOutcome::Failed(format!(
                            "mismatched size: {} vs {}",
                            pretty_size(size),
                            pretty_size(entry.size)
                        ));
                    }
                    true
                }
            }
        };

        // Both paths must pass checksum verification.
        let path = target.to_path_buf();
        let digest = entry.digest.clone();
        let verified = tokio::task::spawn_blocking(move || verify::verify_file(&path, &digest))
            .await
            .unwrap_or(false);
        if !verified {
            return DownloadOutcome::Failed("mismatched checksum".to_string());
        }

        if freshly_downloaded {
            DownloadOutcome::Downloaded
        } else {
            DownloadOutcome::AlreadyPresent
        }
    }

    /// Create the top-level configuration files of the local mirror: the
    /// trimmed catalogue under its fixed names, the installer executable,
    /// the optional autorun descriptor, and per-algorithm digest manifests.
    async fn build_setup_files(
        &self,
        data: &CatalogData,
        packages: &[String],
        garbage: &mut GarbageCollector,
    ) -> Result<(), CoreError> {
        let arch_dir = self.target_dir.join(self.arch.as_str());
        tokio::fs::create_dir_all(&arch_dir).await?;

        // Internal "_" packages go last: some installers apply them as a
        // final configuration pass.
        let mut normal: Vec<&String> = packages.iter().filter(|p| !p.starts_with('_')).collect();
        let mut special: Vec<&String> = packages.iter().filter(|p| p.starts_with('_')).collect();
        normal.sort_unstable();
        special.sort_unstable();
        normal.extend(special);

        let ini_url = self.setup_ini_url()?;
        let now = chrono::Local::now();
        let header = &data.header;

        let mut ini_text = String::new();
        ini_text.push_str(&format!(
            "# This file was automatically generated by \"cygmir\" (version {}),\n",
            env!("CARGO_PKG_VERSION")
        ));
        ini_text.push_str(&format!("# {},\n", now.format("%a %b %e %H:%M:%S %Y")));
        ini_text.push_str(&format!("# based on {ini_url}\n"));
        ini_text.push_str("# Manual edits may be overwritten\n");
        ini_text.push_str(&format!(
            "release: {}\n",
            header.release().unwrap_or_default()
        ));
        ini_text.push_str(&format!("arch: {}\n", header.arch().unwrap_or_default()));
        ini_text.push_str(&format!("setup-timestamp: {}\n", now.timestamp()));
        ini_text.push_str(&format!(
            "setup-version: {}\n",
            header.setup_version().unwrap_or_default()
        ));
        for name in &normal {
            if let Some(record) = data.get(name.as_str()) {
                ini_text.push('\n');
                ini_text.push_str(record.stanza());
                ini_text.push('\n');
            }
        }

        let ini_path = arch_dir.join(SETUP_INI);
        tokio::fs::write(&ini_path, ini_text.as_bytes()).await?;
        garbage.rescue_file(&ini_path);

        let bz2_bytes = bz2_compress(ini_text.as_bytes())?;
        let bz2_path = arch_dir.join(SETUP_BZ2);
        tokio::fs::write(&bz2_path, &bz2_bytes).await?;
        garbage.rescue_file(&bz2_path);

        self.fetch_installer().await?;

        // Per-algorithm manifests over the generated catalogue files.
        let manifest_inputs: [(&str, &[u8]); 2] = [
            (SETUP_INI, ini_text.as_bytes()),
            (SETUP_BZ2, bz2_bytes.as_slice()),
        ];
        for alg in SUM_ALGS {
            let mut sum_text = String::new();
            for (name, bytes) in manifest_inputs {
                sum_text.push_str(&format!("{}  {name}\n", verify::hash_bytes(bytes, alg)));
            }
            let sum_path = arch_dir.join(format!("{alg}.sum"));
            tokio::fs::write(&sum_path, sum_text).await?;
            garbage.rescue_file(&sum_path);
        }

        Ok(())
    }

    /// Fetch a copy of the installer executable to the target's top level,
    /// optionally leaving an autorun descriptor next to it.
    async fn fetch_installer(&self) -> Result<(), CoreError> {
        let exe_url_text = self.installer_url();
        let exe_url = Url::parse(&exe_url_text)
            .map_err(|err| CoreError::Config(format!("invalid installer URL: {err}")))?;
        let exe_base = url_basename(&exe_url);
        let exe_path = self.target_dir.join(&exe_base);

        self.reporter.start_operation(
            &format!("Retrieving {exe_url} to {}", exe_path.display()),
            Verbosity::Medium,
        );
        match self.transport.download(&exe_url, &exe_path).await {
            Ok(_) => self.reporter.end_operation("done", Severity::Normal),
            Err(source) => {
                self.reporter.flush_operation();
                return Err(CoreError::InstallerFetch {
                    url: exe_url_text,
                    source,
                });
            }
        }

        if self.options.make_autorun {
            let autorun = format!("[autorun]\r\nopen={exe_base} --local-install\r\n");
            tokio::fs::write(self.target_dir.join("autorun.inf"), autorun.as_bytes()).await?;
        }

        Ok(())
    }
}

/// Parse an `install:`/`source:` field value into a fetch entry.
///
/// Returns `Ok(None)` for values with too few fields or an unparseable size
/// (reported as a skip by the caller). A hash of unrecognised length is a
/// configuration error and fatal, per the hash-verifier contract.
fn parse_fetch_entry(value: &str) -> Result<Option<FetchEntry>, CoreError> {
    let mut fields = value.split_whitespace();
    let (Some(path), Some(size), Some(hash)) = (fields.next(), fields.next(), fields.next())
    else {
        return Ok(None);
    };
    let Ok(size) = size.parse::<u64>() else {
        return Ok(None);
    };
    let digest = HexDigest::new(hash).map_err(|err| match err {
        cygmir_schema::DigestError::UnknownLength(inner) => CoreError::UnknownHashLength(inner),
        other => CoreError::Config(other.to_string()),
    })?;
    Ok(Some(FetchEntry {
        path: path.to_string(),
        size,
        digest,
    }))
}

/// Whether an archive reference would escape the target directory.
fn is_absolute_ref(path: &str) -> bool {
    Path::new(path).is_absolute() || path.starts_with('/') || path.starts_with('\\')
}

/// Final path component of a URL, with any query/fragment already excluded
/// by the URL parser.
fn url_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("setup.exe")
        .to_string()
}

fn bz2_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use std::io::Write;
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_entries() {
        let entry = parse_fetch_entry(
            "x86_64/release/bash/bash-5.2.tar.xz 1449922 d41d8cd98f00b204e9800998ecf8427e",
        )
        .unwrap()
        .unwrap();
        assert_eq!(entry.path, "x86_64/release/bash/bash-5.2.tar.xz");
        assert_eq!(entry.size, 1449922);
        assert_eq!(entry.digest.alg(), HashAlg::Md5);
    }

    #[test]
    fn short_or_malformed_values_are_skips() {
        assert!(parse_fetch_entry("just-a-path").unwrap().is_none());
        assert!(parse_fetch_entry("path notasize abcd").unwrap().is_none());
    }

    #[test]
    fn bad_hash_length_is_fatal() {
        let err = parse_fetch_entry("path 10 abcdef").unwrap_err();
        assert!(matches!(err, CoreError::UnknownHashLength(_)));
    }

    #[test]
    fn absolute_paths_are_detected() {
        assert!(is_absolute_ref("/etc/passwd"));
        assert!(is_absolute_ref("\\windows\\system32"));
        assert!(!is_absolute_ref("x86_64/release/a/a.tar.xz"));
    }

    #[test]
    fn installer_url_substitutes_arch() {
        let builder = MirrorBuilder::new(
            Arc::new(crate::transport::HttpTransport::new()),
            Arc::new(crate::reporter::NullReporter),
        );
        assert_eq!(
            builder.installer_url(),
            "https://www.cygwin.com/setup-x86_64.exe"
        );

        let plain = builder.with_installer_url("https://host/tools/${arch}/setup.exe");
        assert_eq!(
            plain.installer_url(),
            "https://host/tools/x86_64/setup.exe"
        );
    }

    #[test]
    fn setup_ini_url_derives_from_mirror_and_arch() {
        let builder = MirrorBuilder::new(
            Arc::new(crate::transport::HttpTransport::new()),
            Arc::new(crate::reporter::NullReporter),
        )
        .with_mirror("https://mirror.example/pub/cygwin")
        .unwrap();
        assert_eq!(
            builder.setup_ini_url().unwrap().as_str(),
            "https://mirror.example/pub/cygwin/x86_64/setup.xz"
        );
    }

    #[test]
    fn url_basename_handles_plain_and_nested_paths() {
        let url = Url::parse("https://host/dir/setup-x86_64.exe").unwrap();
        assert_eq!(url_basename(&url), "setup-x86_64.exe");
        let bare = Url::parse("https://host/").unwrap();
        assert_eq!(url_basename(&bare), "setup.exe");
    }
}
