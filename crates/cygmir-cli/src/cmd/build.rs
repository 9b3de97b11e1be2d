//! The `build` subcommand: run one end-to-end mirror pass.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use cygmir_core::builder::{BuildOptions, MirrorBuilder};
use cygmir_core::garbage::{GarbageConfirmer, PurgePolicy};
use cygmir_core::selection::PackageSelection;
use cygmir_core::transport::HttpTransport;
use cygmir_schema::{Arch, Epoch, pretty_size};

use crate::confirm::StdinConfirm;

/// Everything the `build` subcommand needs, bundled so the dispatcher stays
/// readable.
#[derive(Debug)]
pub struct BuildArgs {
    pub package_files: Vec<PathBuf>,
    pub directory: PathBuf,
    pub mirror: String,
    pub arch: Arch,
    pub epochs: String,
    pub exeurl: String,
    pub iniurl: Option<String>,
    pub all: bool,
    pub dry_run: bool,
    pub nobase: bool,
    pub with_autorun: bool,
    pub with_sources: bool,
    pub remove_outdated: PurgePolicy,
    pub quiet: bool,
}

/// Run a mirror build and, when permitted, the cleanup pass.
pub async fn build(args: BuildArgs) -> Result<()> {
    let reporter = super::make_reporter(args.quiet);
    let transport = Arc::new(HttpTransport::new());

    let epochs: Vec<Epoch> = args
        .epochs
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse().unwrap_or(Epoch::Curr))
        .collect();

    let mut builder = MirrorBuilder::new(transport, Arc::clone(&reporter))
        .with_target_dir(&args.directory)
        .with_mirror(&args.mirror)?
        .with_installer_url(args.exeurl.as_str())
        .with_arch(args.arch)
        .with_epochs(epochs)
        .with_options(BuildOptions {
            all_packages: args.all,
            dummy_download: args.dry_run,
            include_base: !args.nobase,
            make_autorun: args.with_autorun,
            include_sources: args.with_sources,
            ..BuildOptions::default()
        });

    if let Some(iniurl) = &args.iniurl {
        let url = Url::parse(iniurl).with_context(|| format!("invalid --iniurl '{iniurl}'"))?;
        builder = builder.with_setup_ini_url(url);
    }

    let selection = if args.package_files.is_empty() {
        None
    } else {
        Some(
            PackageSelection::from_files(&args.package_files)
                .context("failed to read package lists")?,
        )
    };

    let outcome = builder
        .run(selection.as_ref())
        .await
        .context("Fatal error during mirroring")?;

    if !args.quiet {
        println!(
            "{} package(s), {} fetched, {} already present, {} failed ({} planned)",
            outcome.packages.len(),
            outcome.stats.new_count(),
            outcome.stats.already(),
            outcome.stats.failures(),
            pretty_size(outcome.stats.total_size()),
        );
    }

    if let Some(mut garbage) = outcome.garbage {
        let prompt = StdinConfirm;
        GarbageConfirmer::new(args.remove_outdated, &prompt)
            .run(&mut garbage, reporter.as_ref());
    }

    if outcome.stats.failures() > 0 {
        anyhow::bail!(
            "{}/{} package(s) failed to download",
            outcome.stats.failures(),
            outcome.stats.total()
        );
    }

    Ok(())
}
