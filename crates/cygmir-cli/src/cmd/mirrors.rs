//! The `mirrors` subcommand: print the official mirror directory.

use std::sync::Arc;

use anyhow::Result;

use cygmir_core::mirrors::read_mirror_list;
use cygmir_core::transport::{HttpTransport, Transport};

/// Fetch (or fall back to) the mirror list and print it grouped by region
/// and country.
pub async fn mirrors(quiet: bool) -> Result<()> {
    let reporter = super::make_reporter(quiet);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());

    let map = read_mirror_list(&transport, reporter.as_ref()).await;
    for (region, countries) in &map {
        println!("{region}:");
        for (country, sites) in countries {
            println!("  {country}:");
            for site in sites {
                println!("    {:<32} {}", site.ident, site.url);
            }
        }
    }
    Ok(())
}
