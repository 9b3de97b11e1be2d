//! Dependency-graph expansion and contraction over a parsed catalogue.
//!
//! `expand` computes the transitive dependency closure of a selection;
//! `contract` is its approximate left-inverse, reducing an expanded list to
//! a smaller set of "primary" packages that re-expands to the same closure.

use std::collections::BTreeSet;

use cygmir_schema::Epoch;

use crate::catalog::CatalogData;
use crate::error::CoreError;
use crate::reporter::Reporter;

/// Vote threshold above which a package is kept as a primary selection by
/// [`contract`], even though it would be re-installed as a dependency.
pub const DEFAULT_MIN_VOTES: usize = 6;

/// Maximum number of unrecognised names spelled out in an error message.
const MAX_BAD_NAMES: usize = 6;

/// Expand a selection to include all transitive dependencies.
///
/// Performs a worklist traversal with an explicit pending stack and a
/// visited set; the result is sorted, so worklist order never leaks into
/// the output. For each accepted package, the dependency lists of every
/// epoch in `epochs` are followed. A dependency edge pointing at a name
/// absent from the catalogue is reported as a warning and skipped, since
/// upstream catalogues occasionally carry stale cross-references.
///
/// # Errors
///
/// Fails with [`CoreError::UnknownPackages`] when any *selected* name is
/// absent from the catalogue, naming up to a handful of offenders.
pub fn expand<I, S>(
    data: &CatalogData,
    selected: I,
    epochs: &[Epoch],
    reporter: &dyn Reporter,
) -> Result<Vec<String>, CoreError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    expand_inner(data, selected, epochs, false, reporter)
}

/// [`expand`], but unrecognised selected names are kept in the result
/// instead of failing the call. Used when the input is already known-valid,
/// e.g. when re-expanding a contraction over a catalogue with cycles.
pub fn expand_lenient<I, S>(
    data: &CatalogData,
    selected: I,
    epochs: &[Epoch],
    reporter: &dyn Reporter,
) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match expand_inner(data, selected, epochs, true, reporter) {
        Ok(packages) => packages,
        // Unreachable: the lenient path never constructs an error.
        Err(_) => Vec::new(),
    }
}

fn expand_inner<I, S>(
    data: &CatalogData,
    selected: I,
    epochs: &[Epoch],
    ignore_unresolved: bool,
    reporter: &dyn Reporter,
) -> Result<Vec<String>, CoreError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut pending: Vec<String> = selected.into_iter().map(Into::into).collect();
    let mut accepted: BTreeSet<String> = BTreeSet::new();
    let mut unknown: Vec<String> = Vec::new();
    let mut dangling: BTreeSet<(String, String)> = BTreeSet::new();

    while let Some(name) = pending.pop() {
        if !accepted.insert(name.clone()) {
            continue;
        }

        let Some(record) = data.get(&name) else {
            unknown.push(name);
            continue;
        };

        for epoch in epochs {
            for dep in record.dependencies(std::slice::from_ref(epoch)) {
                if !data.contains(&dep) {
                    dangling.insert((name.clone(), dep));
                    continue;
                }
                if !accepted.contains(&dep) {
                    pending.push(dep);
                }
            }
        }
    }

    if !unknown.is_empty() && !ignore_unresolved {
        unknown.sort_unstable();
        let shown = truncated_names(&unknown);
        reporter.error(&format!(
            "The following {} package names were not recognized:\n\t{}",
            unknown.len(),
            shown.join("\n\t")
        ));
        return Err(CoreError::UnknownPackages {
            names: shown.join(", "),
            count: unknown.len(),
        });
    }

    if !dangling.is_empty() {
        let links: Vec<String> = dangling
            .iter()
            .map(|(pkg, dep)| format!("{pkg}->{dep}"))
            .collect();
        tracing::warn!(count = links.len(), "catalogue contains dangling dependencies");
        reporter.warning(&format!(
            "Master package list contains unresolvable dependencies: {}",
            links.join(", ")
        ));
    }

    Ok(accepted.into_iter().collect())
}

fn truncated_names(names: &[String]) -> Vec<String> {
    if names.len() <= MAX_BAD_NAMES {
        names.to_vec()
    } else {
        let mut shown: Vec<String> = names[..MAX_BAD_NAMES - 1].to_vec();
        shown.push("...".to_string());
        shown
    }
}

/// Reduce a fully expanded package list to an approximately minimal set of
/// primaries that re-expands to the same closure.
///
/// Counts, for every package in the list, how many list members cite it as
/// a dependency ("votes"). Zero-vote packages (never depended upon) are
/// primaries; so are packages with at least `min_votes` votes, which are
/// widely shared and worth naming explicitly. Because dependency graphs
/// contain cycles, the primaries alone may not cover the input; any package
/// not reached by re-expanding them is force-included. This is a best-effort
/// size reduction, not a minimum vertex cover: the only guarantee is that
/// re-expanding the result reproduces the input closure.
pub fn contract(
    data: &CatalogData,
    packages: &[String],
    min_votes: usize,
    reporter: &dyn Reporter,
) -> Vec<String> {
    let mut votes: std::collections::BTreeMap<&str, usize> =
        packages.iter().map(|p| (p.as_str(), 0)).collect();

    for name in packages {
        if let Some(record) = data.get(name) {
            for dep in record.dependencies(&[Epoch::Curr]) {
                if let Some(count) = votes.get_mut(dep.as_str()) {
                    *count += 1;
                }
            }
        }
    }

    let primaries: Vec<String> = votes
        .iter()
        .filter(|(_, count)| **count == 0 || **count >= min_votes)
        .map(|(name, _)| (*name).to_string())
        .collect();

    // Cycle patch-back: anything the primaries fail to cover is kept.
    let coverage: BTreeSet<String> =
        expand_lenient(data, primaries.clone(), &[Epoch::Curr], reporter)
            .into_iter()
            .collect();

    let mut result: BTreeSet<String> = primaries.into_iter().collect();
    result.extend(
        packages
            .iter()
            .filter(|p| !coverage.contains(*p))
            .cloned(),
    );
    result.into_iter().collect()
}
