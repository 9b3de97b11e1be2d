//! Core engine for cygmir: builds partial offline mirrors of Cygwin-style
//! package repositories.
//!
//! The pipeline is: parse the remote catalogue ([`catalog`]), expand the
//! dependency closure of a user selection ([`selection`], [`resolver`]),
//! download and verify the required archives ([`builder`], [`verify`]), and
//! garbage-collect artifacts left over from previous runs ([`garbage`]).
//! Network access goes through the injectable [`transport::Transport`] seam;
//! progress goes through the [`reporter::Reporter`] seam, so the CLI and any
//! other front end share the same engine.

pub mod builder;
pub mod catalog;
pub mod error;
pub mod garbage;
pub mod mirrors;
pub mod resolver;
pub mod selection;
pub mod template;
pub mod transport;
pub mod verify;

pub mod reporter;

pub use error::CoreError;
pub use reporter::{ConsoleReporter, NullReporter, Reporter, Severity, Verbosity};
pub use transport::{HttpTransport, Transport, TransportError};

/// User Agent string for outgoing HTTP requests
pub const USER_AGENT: &str = concat!("cygmir/", env!("CARGO_PKG_VERSION"));
