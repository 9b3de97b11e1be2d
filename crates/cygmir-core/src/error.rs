//! Error taxonomy for the mirror engine.
//!
//! Fatal classes only: configuration mistakes, catalogue fetch/parse
//! failures, resolution failures, and the defensive absolute-path check.
//! Per-file download failures are not errors at this level; they stay inside
//! the builder's bounded retry loop and surface through
//! [`FetchStats`](cygmir_schema::FetchStats).

use cygmir_schema::hash::UnknownHashLength;

use crate::transport::TransportError;

/// A fatal error raised by the mirror engine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An invalid option value or other caller-side configuration mistake.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An expected hash string whose length matches no known digest
    /// algorithm. Always a configuration error, never a silent mismatch.
    #[error(transparent)]
    UnknownHashLength(#[from] UnknownHashLength),

    /// The catalogue source could not be fetched.
    #[error("failed to open {url} - {source}")]
    CatalogFetch {
        /// The catalogue URL that was being fetched.
        url: String,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The catalogue exceeded the in-memory size cap.
    #[error("catalogue at {url} exceeds the {limit}-byte size cap")]
    CatalogTooLarge {
        /// The catalogue URL that was being fetched.
        url: String,
        /// The configured cap in bytes.
        limit: u64,
    },

    /// A catalogue line matched none of the recognised forms. The parser
    /// never recovers mid-parse; the whole operation fails.
    #[error("unrecognized content on line {line}")]
    CatalogSyntax {
        /// One-based line number of the offending line.
        line: usize,
    },

    /// A user package-list file contained an unparseable line.
    #[error("package-list parse failure at {origin}:{line}")]
    ListingSyntax {
        /// File name (or `<stream>`) the listing came from.
        origin: String,
        /// One-based line number of the offending line.
        line: usize,
    },

    /// A user selection named packages that do not exist in the catalogue.
    /// `names` holds at most a handful of offenders, truncated with `...`.
    #[error("invalid package names {{ {names} }}[{count}]")]
    UnknownPackages {
        /// Comma-separated (possibly truncated) offending names.
        names: String,
        /// Total number of unrecognised names.
        count: usize,
    },

    /// A fetch-list entry carried an absolute archive path. Treated as a
    /// tampered or malformed catalogue: it could escape the target
    /// directory, so it is fatal rather than a retryable download failure.
    #[error("{path} is an absolute path")]
    AbsolutePath {
        /// The offending archive path.
        path: String,
    },

    /// The installer executable could not be retrieved.
    #[error("failed to retrieve {url}\n - {source}")]
    InstallerFetch {
        /// The installer URL.
        url: String,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A URL could not be constructed from its parts.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Filesystem failure outside the download retry loop (e.g. while
    /// writing the regenerated catalogue).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
