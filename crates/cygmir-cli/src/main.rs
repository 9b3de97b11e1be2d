//! cygmir - partial mirror builder CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cygmir_cli::cmd;
use cygmir_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Build {
            package_files,
            directory,
            mirror,
            arch,
            epochs,
            exeurl,
            iniurl,
            all,
            dry_run,
            nobase,
            with_autorun,
            with_sources,
            remove_outdated,
        } => {
            cmd::build::build(cmd::build::BuildArgs {
                package_files,
                directory,
                mirror,
                arch,
                epochs,
                exeurl,
                iniurl,
                all,
                dry_run,
                nobase,
                with_autorun,
                with_sources,
                remove_outdated,
                quiet,
            })
            .await
        }
        Commands::Template {
            output,
            package_files,
            terse,
            mirror,
            arch,
            iniurl,
        } => {
            cmd::template::template(&output, &package_files, terse, &mirror, arch, iniurl, quiet)
                .await
        }
        Commands::Mirrors => cmd::mirrors::mirrors(quiet).await,
    }
}
