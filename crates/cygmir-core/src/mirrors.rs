//! Directory of official mirror sites.
//!
//! The upstream project publishes a semicolon-separated list of mirrors
//! (`url;ident;region;country[;noshow]`). Fetching it can fail — it lives on
//! a single host — so a small built-in list stands in when it does; picking
//! a mirror should never be a hard prerequisite for building one.

use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use crate::reporter::Reporter;
use crate::transport::Transport;

/// Where the live mirror list is published.
pub const MIRROR_LIST_URL: &str = "https://www.cygwin.com/mirrors.lst";

/// A single mirror site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSite {
    /// Short host identifier, e.g. `mirrorservice.org`.
    pub ident: String,
    /// Base URL of the mirror.
    pub url: String,
}

/// Mirror sites grouped by region, then country.
pub type MirrorMap = BTreeMap<String, BTreeMap<String, Vec<MirrorSite>>>;

/// Static fall-back in case the live listing of mirrors cannot be
/// downloaded.
const FALLBACK_MIRRORS: &str = "\
http://ucmirror.canterbury.ac.nz/cygwin/;ucmirror.canterbury.ac.nz;Australasia;New Zealand
https://mirror.csclub.uwaterloo.ca/cygwin/;mirror.csclub.uwaterloo.ca;North America;Canada
https://ftp.fsn.hu/pub/cygwin/;ftp.fsn.hu;Europe;Hungary
https://ftp.iij.ad.jp/pub/cygwin/;ftp.iij.ad.jp;Asia;Japan
https://mirrors.dotsrc.org/cygwin/;mirrors.dotsrc.org;Europe;Denmark
https://www.mirrorservice.org/sites/sourceware.org/pub/cygwin/;www.mirrorservice.org;Europe;UK
";

/// Fetch and parse the official mirror list, falling back to the built-in
/// list (with a warning) when the fetch fails.
pub async fn read_mirror_list(
    transport: &Arc<dyn Transport>,
    reporter: &dyn Reporter,
) -> MirrorMap {
    let text = match Url::parse(MIRROR_LIST_URL) {
        Ok(url) => match transport.fetch(&url).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!(%err, "mirror list fetch failed, using fallback");
                reporter.warning(&format!(
                    "Failed to read list of mirrors from {MIRROR_LIST_URL}"
                ));
                FALLBACK_MIRRORS.to_string()
            }
        },
        Err(_) => FALLBACK_MIRRORS.to_string(),
    };

    parse_mirror_list(&text)
}

/// Parse a `url;ident;region;country[;noshow]` listing into a grouped map.
/// Malformed and `noshow` lines are skipped.
pub fn parse_mirror_list(text: &str) -> MirrorMap {
    let mut map = MirrorMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 4 || (fields.len() > 4 && fields[4] == "noshow") {
            continue;
        }
        let (url, ident, region, country) = (fields[0], fields[1], fields[2], fields[3]);
        map.entry(region.to_string())
            .or_default()
            .entry(country.to_string())
            .or_default()
            .push(MirrorSite {
                ident: ident.to_string(),
                url: url.to_string(),
            });
    }

    map
}
