//! Shared data types for cygmir.
//!
//! Everything here is plain data with no I/O: target architectures, catalogue
//! epochs, digest algorithms, and the entries of a mirror fetch plan. The
//! `cygmir-core` engine and the CLI both depend on this crate.

pub mod arch;
pub mod epoch;
pub mod fetch;
pub mod hash;

// Re-exports
pub use arch::Arch;
pub use epoch::Epoch;
pub use fetch::{FetchEntry, FetchStats, pretty_size};
pub use hash::{DigestError, HashAlg, HexDigest, UnknownHashLength};
