//! The master package catalogue.
//!
//! [`Catalog`] owns the remote `setup.ini` source location and a lazily
//! populated, mutex-guarded cache of its parsed contents. Changing the
//! source invalidates the cache; the next access re-fetches and re-parses.
//! Concurrent accessors observe either the fully populated cache or trigger
//! exactly one parse — the lock is held across the fetch and parse.

mod parser;
pub mod record;

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::error::CoreError;
use crate::reporter::{Reporter, Verbosity};
use crate::transport::Transport;

pub use record::{FieldKey, FileKind, PackageRecord};

/// Upper bound on the decoded catalogue size held in memory.
pub const MAX_CATALOG_LEN: u64 = 1 << 26;

/// Header metadata from the top of a catalogue.
#[derive(Debug, Clone, Default)]
pub struct CatalogHeader {
    pub(crate) entries: BTreeMap<String, String>,
}

impl CatalogHeader {
    /// Look up an arbitrary header key (`release`, `arch`, `setup-*`).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The release name, e.g. `cygwin`.
    pub fn release(&self) -> Option<&str> {
        self.get("release")
    }

    /// The catalogue's target architecture.
    pub fn arch(&self) -> Option<&str> {
        self.get("arch")
    }

    /// The catalogue format version.
    pub fn setup_version(&self) -> Option<&str> {
        self.get("setup-version")
    }

    /// The catalogue generation timestamp, as recorded upstream.
    pub fn setup_timestamp(&self) -> Option<&str> {
        self.get("setup-timestamp")
    }
}

/// A fully parsed catalogue: header plus one record per package name.
#[derive(Debug, Default)]
pub struct CatalogData {
    /// Header metadata (release, arch, format version, timestamp).
    pub header: CatalogHeader,
    packages: BTreeMap<String, PackageRecord>,
}

impl CatalogData {
    pub(crate) fn from_parts(
        header: CatalogHeader,
        packages: BTreeMap<String, PackageRecord>,
    ) -> Self {
        Self { header, packages }
    }

    /// Look up one package by name.
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    /// Whether the catalogue lists the given package.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Number of packages in the catalogue.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over `(name, record)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageRecord)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Group package names by category, with a synthetic `All` group
    /// containing every name. Group members are sorted.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, record) in &self.packages {
            let cats = record.get("category").unwrap_or_default();
            for cat in cats.split_whitespace() {
                groups
                    .entry(cat.to_string())
                    .or_default()
                    .push(name.clone());
            }
            groups
                .entry("All".to_string())
                .or_default()
                .push(name.clone());
        }
        for members in groups.values_mut() {
            members.sort_unstable();
        }
        groups
    }
}

#[derive(Default)]
struct CatalogState {
    source: Option<Url>,
    cache: Option<Arc<CatalogData>>,
}

/// Database of available packages built from a remote `setup.ini` file.
pub struct Catalog {
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn Reporter>,
    state: Mutex<CatalogState>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    /// Create an empty catalogue with no source configured.
    pub fn new(transport: Arc<dyn Transport>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            transport,
            reporter,
            state: Mutex::new(CatalogState::default()),
        }
    }

    /// Set or change the catalogue source URL. Changing the URL invalidates
    /// the cache; setting the same URL again keeps it.
    pub async fn set_source(&self, url: Url) {
        let mut state = self.state.lock().await;
        if state.source.as_ref() != Some(&url) {
            state.cache = None;
        }
        state.source = Some(url);
    }

    /// The currently configured source URL, if any.
    pub async fn source(&self) -> Option<Url> {
        self.state.lock().await.source.clone()
    }

    /// Whether a parsed catalogue is currently cached.
    pub async fn has_cached_data(&self) -> bool {
        self.state.lock().await.cache.is_some()
    }

    /// Get the parsed catalogue, fetching and parsing on first access.
    ///
    /// # Errors
    ///
    /// Fails when no source is configured, when the source cannot be
    /// fetched or decompressed, when it exceeds [`MAX_CATALOG_LEN`], or on
    /// the first malformed line. The parser never partially recovers; a
    /// failed parse leaves the cache empty.
    pub async fn data(&self) -> Result<Arc<CatalogData>, CoreError> {
        let mut state = self.state.lock().await;
        if let Some(cache) = state.cache.as_ref() {
            return Ok(Arc::clone(cache));
        }

        let url = state
            .source
            .clone()
            .ok_or_else(|| CoreError::Config("no catalogue source configured".to_string()))?;

        self.reporter.start_operation(
            &format!("Scanning mirror index at {url}"),
            Verbosity::Medium,
        );
        let result = self.ingest(&url).await;
        match result {
            Ok(data) => {
                self.reporter
                    .end_operation("done", crate::reporter::Severity::Normal);
                let data = Arc::new(data);
                state.cache = Some(Arc::clone(&data));
                Ok(data)
            }
            Err(err) => {
                self.reporter.flush_operation();
                Err(err)
            }
        }
    }

    async fn ingest(&self, url: &Url) -> Result<CatalogData, CoreError> {
        let raw = self
            .transport
            .fetch(url)
            .await
            .map_err(|source| CoreError::CatalogFetch {
                url: url.to_string(),
                source,
            })?;

        let decoded = decompress_for(url, raw)?;
        if decoded.len() as u64 > MAX_CATALOG_LEN {
            return Err(CoreError::CatalogTooLarge {
                url: url.to_string(),
                limit: MAX_CATALOG_LEN,
            });
        }

        // Long-lived hand-maintained catalogues occasionally carry stray
        // encoding artifacts; tolerate them instead of rejecting the file.
        let text = String::from_utf8_lossy(&decoded);
        tracing::debug!(url = %url, bytes = decoded.len(), "parsing catalogue");

        let (header, packages) = parse_text(&text)?;
        Ok(CatalogData::from_parts(header, packages))
    }
}

pub(crate) fn parse_text(
    text: &str,
) -> Result<(CatalogHeader, BTreeMap<String, PackageRecord>), CoreError> {
    parser::Parser::new().parse(text)
}

/// Decompress the fetched bytes according to the URL's file extension.
/// Unknown extensions pass through unchanged.
fn decompress_for(url: &Url, raw: Vec<u8>) -> Result<Vec<u8>, CoreError> {
    let suffix = url.path().rsplit('.').next().unwrap_or_default();
    let mut decoded = Vec::new();
    match suffix {
        "bz2" => {
            bzip2::read::BzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
        }
        "xz" => {
            xz2::read::XzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
        }
        _ => return Ok(raw),
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use crate::transport::HttpTransport;
    use std::io::Write;

    const MINI: &str = "release: cygwin\narch: x86_64\nsetup-version: 2.922\n\n\
        @ bash\ncategory: Base Shells\ninstall: rel/bash.tar 10 d41d8cd98f00b204e9800998ecf8427e\n\n\
        @ make\ncategory: Devel\nrequires: bash\ninstall: rel/make.tar 20 d41d8cd98f00b204e9800998ecf8427e\n";

    fn write_fixture(dir: &std::path::Path, name: &str, bytes: &[u8]) -> Url {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        Url::from_file_path(&path).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(HttpTransport::new()), Arc::new(NullReporter))
    }

    #[tokio::test]
    async fn parses_plain_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_fixture(dir.path(), "setup.ini", MINI.as_bytes());

        let catalog = catalog();
        catalog.set_source(url).await;
        let data = catalog.data().await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.header.release(), Some("cygwin"));
        assert!(data.contains("bash"));
    }

    #[tokio::test]
    async fn decompresses_bz2_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut compressed = Vec::new();
        {
            let mut enc =
                bzip2::write::BzEncoder::new(&mut compressed, bzip2::Compression::best());
            enc.write_all(MINI.as_bytes()).unwrap();
            enc.finish().unwrap();
        }
        let url = write_fixture(dir.path(), "setup.bz2", &compressed);

        let catalog = catalog();
        catalog.set_source(url).await;
        let data = catalog.data().await.unwrap();
        assert_eq!(data.len(), 2);
    }

    #[tokio::test]
    async fn cache_survives_same_source_and_resets_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let url_a = write_fixture(dir.path(), "a.ini", MINI.as_bytes());
        let url_b = write_fixture(dir.path(), "b.ini", "release: other\n".as_bytes());

        let catalog = catalog();
        catalog.set_source(url_a.clone()).await;
        let first = catalog.data().await.unwrap();
        assert!(catalog.has_cached_data().await);

        catalog.set_source(url_a).await;
        assert!(catalog.has_cached_data().await);
        let second = catalog.data().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        catalog.set_source(url_b).await;
        assert!(!catalog.has_cached_data().await);
        let third = catalog.data().await.unwrap();
        assert_eq!(third.header.release(), Some("other"));
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_config_error() {
        let catalog = catalog();
        assert!(matches!(
            catalog.data().await,
            Err(CoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_source_is_catalog_fetch_error() {
        let catalog = catalog();
        catalog
            .set_source(Url::parse("file:///nonexistent/setup.ini").unwrap())
            .await;
        assert!(matches!(
            catalog.data().await,
            Err(CoreError::CatalogFetch { .. })
        ));
    }

    #[tokio::test]
    async fn categories_include_synthetic_all() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_fixture(dir.path(), "setup.ini", MINI.as_bytes());
        let catalog = catalog();
        catalog.set_source(url).await;
        let data = catalog.data().await.unwrap();

        let cats = data.categories();
        assert_eq!(cats["All"], vec!["bash", "make"]);
        assert_eq!(cats["Base"], vec!["bash"]);
        assert_eq!(cats["Shells"], vec!["bash"]);
        assert_eq!(cats["Devel"], vec!["make"]);
    }
}
