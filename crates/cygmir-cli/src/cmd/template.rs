//! The `template` subcommand: emit a commented package listing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use cygmir_core::builder::MirrorBuilder;
use cygmir_core::selection::PackageSelection;
use cygmir_core::transport::HttpTransport;
use cygmir_schema::Arch;

/// Generate a template listing, pre-selecting any packages named in the
/// supplied listing files.
pub async fn template(
    output: &Path,
    package_files: &[PathBuf],
    terse: bool,
    mirror: &str,
    arch: Arch,
    iniurl: Option<String>,
    quiet: bool,
) -> Result<()> {
    let reporter = super::make_reporter(quiet);
    let transport = Arc::new(HttpTransport::new());

    let mut builder = MirrorBuilder::new(transport, reporter)
        .with_mirror(mirror)?
        .with_arch(arch);
    if let Some(iniurl) = &iniurl {
        let url = Url::parse(iniurl).with_context(|| format!("invalid --iniurl '{iniurl}'"))?;
        builder = builder.with_setup_ini_url(url);
    }

    let selection = if package_files.is_empty() {
        None
    } else {
        Some(
            PackageSelection::from_files(package_files)
                .context("failed to read package lists")?,
        )
    };

    builder
        .write_template(output, selection.as_ref(), terse)
        .await
        .context("failed to generate template listing")?;

    if !quiet {
        println!("Wrote template listing to {}", output.display());
    }
    Ok(())
}
