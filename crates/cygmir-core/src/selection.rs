//! User-supplied package selections.
//!
//! A selection maps package names to architectural constraints parsed from
//! plain-text listing files: one name per line, an optional
//! `[key=value,...]` constraint annotation, and `#` comments. Merging two
//! selections of the same name unions constraint values per key; a key
//! absent from one side degrades to the wildcard, because an unconstrained
//! mention means "any".

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Constraint value meaning "any".
pub const WILDCARD: &str = "*";

/// One line of a package listing: either a (possibly annotated) package
/// name, a commented-out ("deselected") package name, or a comment/blank.
pub(crate) static RE_LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
          ^(?P<pkgname>[A-Za-z0-9]\S*)
                \s* (?P<constraints>\[[^\#]*\])?
                \s* (?P<annot>\#.*)? $
        | ^\#(?P<deselected>[A-Za-z0-9]\S*)
                (?P<misc>\[[^\#]*\])?
                \s* (?P<desannot>\#.*) $
        | ^(?P<comment>\s* (\#.*)?) $
        ",
    )
    .unwrap()
});

static RE_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\S+?)=(\S*?)\]").unwrap());

type ConstraintMap = BTreeMap<String, BTreeSet<String>>;

/// A set of user-selected package names with architectural constraints.
#[derive(Debug, Clone, Default)]
pub struct PackageSelection {
    pkgs: BTreeMap<String, ConstraintMap>,
}

impl PackageSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from a set of listing files.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::ListingSyntax`] on the first unparseable
    /// line, naming the file and line number, or with an I/O error if a
    /// file cannot be read.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CoreError> {
        let mut selection = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)?;
            selection.ingest(&text, &path.display().to_string())?;
        }
        Ok(selection)
    }

    /// Parse a listing text, merging its entries into this selection.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::ListingSyntax`] on the first unparseable
    /// line; `origin` names the source in the error.
    pub fn ingest(&mut self, text: &str, origin: &str) -> Result<(), CoreError> {
        for (index, line) in text.lines().enumerate() {
            let caps =
                RE_LISTING_LINE
                    .captures(line)
                    .ok_or_else(|| CoreError::ListingSyntax {
                        origin: origin.to_string(),
                        line: index + 1,
                    })?;

            if let Some(name) = caps.name("pkgname") {
                let constraints =
                    parse_constraints(caps.name("constraints").map(|m| m.as_str()));
                self.merge_entry(name.as_str(), constraints);
            }
            // Deselected names and comments contribute nothing here; the
            // listing refresher reuses the same grammar and does care.
        }
        Ok(())
    }

    /// Add a single unconstrained package name.
    pub fn insert(&mut self, name: &str) {
        self.merge_entry(name, ConstraintMap::new());
    }

    /// Add every name from an iterator, unconstrained.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert(name.as_ref());
        }
    }

    /// Merge another selection into this one, entry by entry.
    pub fn merge(&mut self, other: &PackageSelection) {
        for (name, constraints) in &other.pkgs {
            self.merge_entry(name, constraints.clone());
        }
    }

    /// Number of distinct package names selected.
    pub fn len(&self) -> usize {
        self.pkgs.len()
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.pkgs.is_empty()
    }

    /// Whether the given package name is selected.
    pub fn contains(&self, name: &str) -> bool {
        self.pkgs.contains_key(name)
    }

    /// Sorted names of all selected packages whose constraints are all
    /// satisfied (or wildcarded) by the supplied `key = value` pairs.
    ///
    /// A constraint key absent from `given` does not exclude a package; it
    /// simply is not checked, mirroring the wildcard rule.
    pub fn extract(&self, given: &[(&str, &str)]) -> Vec<String> {
        self.pkgs
            .iter()
            .filter(|(_, constraints)| {
                constraints.iter().all(|(key, possible)| {
                    if possible.contains(WILDCARD) {
                        return true;
                    }
                    match given.iter().find(|(k, _)| *k == key.as_str()) {
                        Some((_, actual)) => possible.contains(*actual),
                        None => true,
                    }
                })
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn merge_entry(&mut self, name: &str, constraints: ConstraintMap) {
        match self.pkgs.get_mut(name) {
            None => {
                self.pkgs.insert(name.to_string(), constraints);
            }
            Some(existing) => {
                let new_keys: BTreeSet<&String> = constraints.keys().collect();
                // Keys present on both sides: union the value sets.
                // Keys present only on the old side: degrade to wildcard
                // (the new unconstrained mention means "any").
                let old_only: Vec<String> = existing
                    .keys()
                    .filter(|k| !new_keys.contains(*k))
                    .cloned()
                    .collect();
                for (key, values) in constraints {
                    existing.entry(key).or_default().extend(values);
                }
                for key in old_only {
                    if let Some(set) = existing.get_mut(&key) {
                        set.clear();
                        set.insert(WILDCARD.to_string());
                    }
                }
            }
        }
    }
}

fn parse_constraints(expr: Option<&str>) -> ConstraintMap {
    let mut map = ConstraintMap::new();
    if let Some(expr) = expr {
        for caps in RE_CONSTRAINT.captures_iter(expr) {
            let values: BTreeSet<String> =
                caps[2].split(',').map(String::from).collect();
            map.insert(caps[1].to_string(), values);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_lines() {
        let mut sel = PackageSelection::new();
        sel.ingest(
            "# header comment\n\
             bash\n\
             \n\
             make [arch=x86_64]   # build tool\n\
             #vim[arch=x86]  # deselected\n",
            "<test>",
        )
        .unwrap();

        assert_eq!(sel.len(), 2);
        assert!(sel.contains("bash"));
        assert!(sel.contains("make"));
        assert!(!sel.contains("vim"));
    }

    #[test]
    fn bad_line_reports_origin_and_number() {
        let mut sel = PackageSelection::new();
        let err = sel.ingest("bash\n[broken\n", "pkgs.txt").unwrap_err();
        match err {
            CoreError::ListingSyntax { origin, line } => {
                assert_eq!(origin, "pkgs.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn extract_honours_constraints_and_wildcards() {
        let mut sel = PackageSelection::new();
        sel.ingest(
            "alpha [arch=x86_64]\nbeta [arch=x86]\ngamma\ndelta [arch=*]\n",
            "<test>",
        )
        .unwrap();

        assert_eq!(
            sel.extract(&[("arch", "x86_64")]),
            vec!["alpha", "delta", "gamma"]
        );
        assert_eq!(sel.extract(&[("arch", "x86")]), vec!["beta", "delta", "gamma"]);
        // No constraint supplied: nothing is excluded.
        assert_eq!(
            sel.extract(&[]),
            vec!["alpha", "beta", "delta", "gamma"]
        );
    }

    #[test]
    fn merging_unions_values_and_wildcards_missing_keys() {
        let mut sel = PackageSelection::new();
        sel.ingest("tool [arch=x86]\n", "<a>").unwrap();
        sel.ingest("tool [arch=x86_64]\n", "<b>").unwrap();
        // Union of both values: satisfied by either architecture.
        assert_eq!(sel.extract(&[("arch", "x86")]), vec!["tool"]);
        assert_eq!(sel.extract(&[("arch", "x86_64")]), vec!["tool"]);

        // A later unconstrained mention wildcards the existing key.
        let mut sel = PackageSelection::new();
        sel.ingest("tool [arch=x86]\n", "<a>").unwrap();
        sel.insert("tool");
        assert_eq!(sel.extract(&[("arch", "x86_64")]), vec!["tool"]);
    }

    #[test]
    fn multi_valued_constraints_split_on_commas() {
        let mut sel = PackageSelection::new();
        sel.ingest("tool [arch=x86,x86_64]\n", "<test>").unwrap();
        assert_eq!(sel.extract(&[("arch", "x86")]), vec!["tool"]);
        assert_eq!(sel.extract(&[("arch", "x86_64")]), vec!["tool"]);
        assert!(sel.extract(&[("arch", "arm")]).is_empty());
    }
}
