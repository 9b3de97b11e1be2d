//! Line-oriented parser for `setup.ini`-style package catalogues.
//!
//! The grammar is recognised line-by-line, in priority order: header
//! `key: value` lines, `#` comments, `@ name` package markers, `[epoch]`
//! markers, `field: value` lines, and blank lines. Anything else is a fatal
//! syntax error carrying the offending line number. Field values may be
//! bare tokens, single-line quoted strings, quoted strings with a leading
//! `key"` annotation, or multi-line quoted strings terminated by a line
//! ending in a bare `"`.
//!
//! The format is described at <https://sourceware.org/cygwin-apps/setup.ini.html>.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use cygmir_schema::Epoch;

use super::record::PackageRecord;
use super::CatalogHeader;
use crate::error::CoreError;

static RE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(release|arch|setup-\S+):\s+(\S+)\s*$").unwrap()
});
static RE_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\s+(\S+)\s*$").unwrap());
static RE_EPOCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-z]+)\]\s*$").unwrap());
static RE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][-a-zA-Z0-9]+):\s+(.*)$").unwrap());

/// Accumulator for a multi-line quoted field value.
struct QuotedField {
    name: String,
    qualifier: Option<String>,
    epoch: Option<Epoch>,
    lines: Vec<String>,
}

/// A package stanza currently being assembled.
struct OpenPackage {
    name: String,
    record: PackageRecord,
    epoch: Option<Epoch>,
    raw: Vec<String>,
    quoted: Option<QuotedField>,
}

impl OpenPackage {
    fn new(name: String) -> Self {
        Self {
            name,
            record: PackageRecord::default(),
            // Fields before any `[epoch]` marker belong to the current epoch.
            epoch: Some(Epoch::Curr),
            raw: Vec::new(),
            quoted: None,
        }
    }
}

/// Streaming parser state for one catalogue.
pub(super) struct Parser {
    header: CatalogHeader,
    packages: BTreeMap<String, PackageRecord>,
    current: Option<OpenPackage>,
}

impl Parser {
    pub(super) fn new() -> Self {
        Self {
            header: CatalogHeader::default(),
            packages: BTreeMap::new(),
            current: None,
        }
    }

    /// Parse a complete decoded catalogue text.
    pub(super) fn parse(
        mut self,
        text: &str,
    ) -> Result<(CatalogHeader, BTreeMap<String, PackageRecord>), CoreError> {
        for (index, line) in text.lines().enumerate() {
            let lineno = index + 1;
            let continuing = self
                .current
                .as_ref()
                .is_some_and(|pkg| pkg.quoted.is_some());
            if continuing {
                self.ingest_quoted_line(line);
            } else {
                self.ingest_ordinary_line(line, lineno)?;
            }

            // Every line of an open stanza is captured verbatim, including
            // the `@` marker line and quoted continuations.
            if let Some(pkg) = self.current.as_mut() {
                pkg.raw.push(line.to_string());
            }
        }
        self.finalize_package();
        Ok((self.header, self.packages))
    }

    fn ingest_quoted_line(&mut self, line: &str) {
        let Some(pkg) = self.current.as_mut() else {
            return;
        };

        let trimmed = line.trim_end();
        if let Some(body) = trimmed.strip_suffix('"') {
            if let Some(mut quoted) = pkg.quoted.take() {
                quoted.lines.push(body.to_string());
                pkg.record.set(
                    &quoted.name,
                    quoted.qualifier,
                    quoted.epoch,
                    quoted.lines.join("\n"),
                );
            }
        } else if let Some(quoted) = pkg.quoted.as_mut() {
            quoted.lines.push(trimmed.to_string());
        }
    }

    fn ingest_ordinary_line(&mut self, line: &str, lineno: usize) -> Result<(), CoreError> {
        if let Some(caps) = RE_HEADER.captures(line) {
            self.header
                .entries
                .insert(caps[1].to_string(), caps[2].to_string());
        } else if line.starts_with('#') {
            // Comment; stanza capture still records it below.
        } else if let Some(caps) = RE_PACKAGE.captures(line) {
            self.finalize_package();
            self.current = Some(OpenPackage::new(caps[1].to_string()));
        } else if let Some(caps) = RE_EPOCH.captures(line) {
            if let Some(pkg) = self.current.as_mut() {
                let epoch: Epoch = caps[1].parse().unwrap_or(Epoch::Curr);
                pkg.epoch = Some(epoch);
            }
        } else if let Some(caps) = RE_FIELD.captures(line) {
            let name = caps[1].to_string();
            let value = caps.get(2).map_or("", |m| m.as_str()).to_string();
            self.ingest_field(&name, value);
        } else if !line.trim().is_empty() {
            return Err(CoreError::CatalogSyntax { line: lineno });
        }
        Ok(())
    }

    fn ingest_field(&mut self, name: &str, value: String) {
        let Some(pkg) = self.current.as_mut() else {
            // Stray field lines before the first package marker carry no
            // meaning and are dropped, as upstream tools do.
            return;
        };
        let epoch = pkg.epoch.clone();

        match value.find('"') {
            None => {
                // Bare token(s) on a single line.
                pkg.record.set(name, None, epoch, value);
            }
            Some(pos) => {
                let qualifier = if pos > 0 {
                    Some(value[..pos].trim().to_string())
                } else {
                    None
                };
                let body = &value[pos + 1..];
                if let Some(inner) = body.strip_suffix('"').filter(|_| !body.is_empty()) {
                    // Quoted string opens and closes on this line.
                    pkg.record.set(name, qualifier, epoch, inner.to_string());
                } else {
                    // Quoted string continues on subsequent lines.
                    pkg.quoted = Some(QuotedField {
                        name: name.to_string(),
                        qualifier,
                        epoch,
                        lines: vec![body.to_string()],
                    });
                }
            }
        }
    }

    fn finalize_package(&mut self) {
        let Some(pkg) = self.current.take() else {
            return;
        };
        let OpenPackage {
            name, mut record, raw, ..
        } = pkg;
        record.set_stanza(raw.join("\n").trim_end().to_string());
        self.packages.insert(name, record);
    }
}
