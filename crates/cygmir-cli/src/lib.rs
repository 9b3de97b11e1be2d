//! cygmir - partial mirror builder
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for the `cygmir-core` mirror engine. The CLI is
//! deliberately thin: it parses arguments, wires up the console reporter
//! and the stdin confirmation prompt, and hands everything to the engine.

pub mod cmd;
pub mod confirm;

pub use cygmir_core::USER_AGENT;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cygmir_core::builder::{DEFAULT_INSTALLER_URL, DEFAULT_MIRROR_URL};
use cygmir_core::garbage::PurgePolicy;
use cygmir_schema::Arch;

#[derive(Debug, Parser)]
#[command(name = "cygmir")]
#[command(author, version, about = "Build partial offline mirrors of Cygwin-style repositories")]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build or update a partial mirror
    Build {
        /// Files containing lists of package names (one per line);
        /// none means the minimal bootstrap set
        package_files: Vec<PathBuf>,

        /// Where to build the local mirror
        #[arg(short = 'd', long, default_value = ".")]
        directory: PathBuf,

        /// URL of the archive or mirror site
        #[arg(short = 'm', long, default_value = DEFAULT_MIRROR_URL)]
        mirror: String,

        /// Target system architecture
        #[arg(short = 'A', long, default_value = "x86_64")]
        arch: Arch,

        /// Comma-separated list of epochs, e.g. "curr,prev"
        #[arg(short = 'e', long, default_value = "curr")]
        epochs: String,

        /// URL of the installer executable (${arch} placeholders allowed)
        #[arg(short = 'x', long, default_value = DEFAULT_INSTALLER_URL)]
        exeurl: String,

        /// URL of the package database, overriding the mirror-derived one
        #[arg(short = 'i', long)]
        iniurl: Option<String>,

        /// Include all available packages
        #[arg(short = 'a', long)]
        all: bool,

        /// Do not actually download packages
        #[arg(short = 'z', long)]
        dry_run: bool,

        /// Do not automatically include all base packages
        #[arg(short = 'B', long)]
        nobase: bool,

        /// Create an autorun.inf file in the build directory
        #[arg(short = 'r', long)]
        with_autorun: bool,

        /// Include source code for each package
        #[arg(short = 's', long)]
        with_sources: bool,

        /// Remove old versions of packages
        #[arg(short = 'o', long, default_value = "no")]
        remove_outdated: PurgePolicy,
    },

    /// Generate a template package listing
    Template {
        /// Where to write the generated listing
        #[arg(short = 'g', long)]
        output: PathBuf,

        /// Existing listing files whose selections should be pre-selected
        package_files: Vec<PathBuf>,

        /// Omit unselected packages from the listing
        #[arg(long)]
        terse: bool,

        /// URL of the archive or mirror site
        #[arg(short = 'm', long, default_value = DEFAULT_MIRROR_URL)]
        mirror: String,

        /// Target system architecture
        #[arg(short = 'A', long, default_value = "x86_64")]
        arch: Arch,

        /// URL of the package database, overriding the mirror-derived one
        #[arg(short = 'i', long)]
        iniurl: Option<String>,
    },

    /// List the official mirror sites
    Mirrors,
}
