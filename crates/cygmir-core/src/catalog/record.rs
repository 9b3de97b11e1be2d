//! Per-package metadata records.
//!
//! A record stores every `field: value` line seen for one package, keyed by
//! the composite of field name, optional `key"`-style qualifier, and the
//! epoch that was active when the field was set. The raw stanza text is kept
//! verbatim alongside the parsed fields so the trimmed catalogue can be
//! re-serialised byte-for-byte.

use std::collections::{HashMap, HashSet};

use cygmir_schema::Epoch;

/// Composite lookup key for one recorded field value.
///
/// Explicit `(field, qualifier, epoch)` keys keep the key space enumerable;
/// no string concatenation is involved, so `install` under `[prev]` can
/// never collide with a hypothetical `install_prev` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Field name as it appears before the colon.
    pub name: String,
    /// Annotation extracted from a `key"..."` value prefix, if any.
    pub qualifier: Option<String>,
    /// Epoch active when the field was set; `None` for epoch-less records.
    pub epoch: Option<Epoch>,
}

/// Which payload variant of a package a fetch refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// The binary archive (`install:` field).
    Install,
    /// The source archive (`source:` field).
    Source,
}

impl FileKind {
    /// The catalogue field name for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Source => "source",
        }
    }

    /// Variants in preference order: a binary archive wins over sources.
    pub const PREFERENCE: [Self; 2] = [Self::Install, Self::Source];
}

/// Parsed metadata for a single package, plus its verbatim stanza text.
#[derive(Debug, Clone, Default)]
pub struct PackageRecord {
    fields: HashMap<FieldKey, String>,
    epochs: HashSet<Option<Epoch>>,
    stanza: String,
}

impl PackageRecord {
    /// Record `field = value` for the given qualifier and epoch.
    pub(crate) fn set(
        &mut self,
        name: &str,
        qualifier: Option<String>,
        epoch: Option<Epoch>,
        value: String,
    ) {
        self.epochs.insert(epoch.clone());
        self.fields.insert(
            FieldKey {
                name: name.to_string(),
                qualifier,
                epoch,
            },
            value,
        );
    }

    pub(crate) fn set_stanza(&mut self, text: String) {
        self.stanza = text;
    }

    /// The verbatim catalogue stanza this record was parsed from, with
    /// trailing whitespace-only lines trimmed.
    pub fn stanza(&self) -> &str {
        &self.stanza
    }

    fn lookup(&self, name: &str, epoch: Option<&Epoch>) -> Option<&str> {
        let key = FieldKey {
            name: name.to_string(),
            qualifier: None,
            epoch: epoch.cloned(),
        };
        self.fields.get(&key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Look up a field under the default fallback chain: the epoch-less
    /// record first, then the current epoch.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lookup(name, None)
            .or_else(|| self.lookup(name, Some(&Epoch::Curr)))
    }

    /// Look up a field for a preferred list of epochs, falling back to the
    /// epoch-less record when no listed epoch has a non-empty value.
    pub fn get_in(&self, name: &str, epochs: &[Epoch]) -> Option<&str> {
        if epochs.is_empty() {
            return self.get(name);
        }
        epochs
            .iter()
            .find_map(|epoch| self.lookup(name, Some(epoch)))
            .or_else(|| self.lookup(name, None))
    }

    /// Whether the package has a non-empty install or source archive in any
    /// recorded epoch.
    pub fn has_file_content(&self) -> bool {
        FileKind::PREFERENCE.iter().any(|kind| {
            self.epochs
                .iter()
                .any(|epoch| self.lookup(kind.as_str(), epoch.as_ref()).is_some())
        })
    }

    /// The default payload variant fetched when this package is selected:
    /// the binary archive when present, otherwise the source archive.
    pub fn default_file_kind(&self) -> Option<FileKind> {
        FileKind::PREFERENCE
            .into_iter()
            .find(|kind| self.get(kind.as_str()).is_some())
    }

    /// Whether this package names any dependencies in either recognised
    /// dependency field.
    pub fn has_dependencies(&self) -> bool {
        self.get("depends2").is_some() || self.get("requires").is_some()
    }

    /// Names of packages this one depends on, for the given epoch
    /// preference list (empty = default chain).
    ///
    /// Merges the comma-separated `depends2` field with the legacy
    /// whitespace-separated `requires` field into one sorted, de-duplicated
    /// list.
    pub fn dependencies(&self, epochs: &[Epoch]) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        if let Some(value) = self.get_in("depends2", epochs) {
            deps.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }
        if let Some(value) = self.get_in("requires", epochs) {
            deps.extend(value.split_whitespace().map(String::from));
        }
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}
