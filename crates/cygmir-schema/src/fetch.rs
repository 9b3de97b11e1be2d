//! Fetch plans and download statistics.

use serde::{Deserialize, Serialize};

use crate::hash::HexDigest;

/// One entry of a mirror fetch plan: an archive to retrieve and verify.
///
/// The path is always relative to the mirror root; the builder rejects
/// absolute paths before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchEntry {
    /// Archive path relative to the mirror root, e.g. `x86_64/release/a/a.tar.xz`.
    pub path: String,
    /// Expected size in bytes.
    pub size: u64,
    /// Expected digest of the archive contents.
    pub digest: HexDigest,
}

impl FetchEntry {
    /// Final component of the archive path, for progress display.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Running counters for one download phase.
///
/// Tracks package counts and byte totals for newly fetched, already-present
/// and permanently failed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    total_count: usize,
    new_count: usize,
    already_count: usize,
    fail_count: usize,
    total_size: u64,
    new_size: u64,
    already_size: u64,
    fail_size: u64,
}

impl FetchStats {
    /// Initialise counters from a fetch plan: the totals are fixed up front,
    /// the per-outcome counters accumulate as downloads complete.
    pub fn for_plan(plan: &[FetchEntry]) -> Self {
        Self {
            total_count: plan.len(),
            total_size: plan.iter().map(|e| e.size).sum(),
            ..Self::default()
        }
    }

    /// Record a freshly downloaded entry.
    pub fn add_new(&mut self, size: u64) {
        self.new_count += 1;
        self.new_size += size;
    }

    /// Record an entry that was already present with the correct contents.
    pub fn add_already(&mut self, size: u64) {
        self.already_count += 1;
        self.already_size += size;
    }

    /// Record an entry that failed all retry rounds.
    pub fn add_fail(&mut self, size: u64) {
        self.fail_count += 1;
        self.fail_size += size;
    }

    /// Number of planned entries.
    pub fn total(&self) -> usize {
        self.total_count
    }

    /// Number of freshly downloaded entries.
    pub fn new_count(&self) -> usize {
        self.new_count
    }

    /// Number of entries accepted without a transfer.
    pub fn already(&self) -> usize {
        self.already_count
    }

    /// Number of permanent failures.
    pub fn failures(&self) -> usize {
        self.fail_count
    }

    /// Total planned bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// True when no entry failed all its retries.
    pub fn is_clean(&self) -> bool {
        self.fail_count == 0
    }
}

/// Pretty-print a byte count with autoscaled units (`1.5MB`, `732B`, ...).
pub fn pretty_size(size: u64) -> String {
    const DIVISORS: [(u64, &str); 4] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "kB"), (1, "B")];

    for (div, unit) in DIVISORS {
        let scaled = size as f64 / div as f64;
        if scaled > 0.8 {
            // Three significant digits, trailing zeros trimmed.
            let text = if scaled >= 100.0 {
                format!("{scaled:.0}")
            } else if scaled >= 10.0 {
                format!("{scaled:.1}")
            } else {
                format!("{scaled:.2}")
            };
            let text = text.trim_end_matches('0').trim_end_matches('.');
            return format!("{text}{unit}");
        }
    }

    format!("{size}B")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, size: u64) -> FetchEntry {
        FetchEntry {
            path: path.to_string(),
            size,
            digest: HexDigest::new("d41d8cd98f00b204e9800998ecf8427e").unwrap(),
        }
    }

    #[test]
    fn stats_accumulate() {
        let plan = vec![entry("a/b.tar", 100), entry("a/c.tar", 50)];
        let mut stats = FetchStats::for_plan(&plan);
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.total_size(), 150);

        stats.add_new(100);
        stats.add_already(50);
        assert_eq!(stats.new_count(), 1);
        assert_eq!(stats.already(), 1);
        assert!(stats.is_clean());

        stats.add_fail(10);
        assert!(!stats.is_clean());
        assert_eq!(stats.failures(), 1);
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(entry("x86_64/release/a/a.tar.xz", 1).basename(), "a.tar.xz");
        assert_eq!(entry("flat.tar", 1).basename(), "flat.tar");
    }

    #[test]
    fn pretty_size_autoscales() {
        assert_eq!(pretty_size(0), "0B");
        assert_eq!(pretty_size(512), "512B");
        assert_eq!(pretty_size(2048), "2kB");
        assert_eq!(pretty_size(3 << 20), "3MB");
        assert_eq!(pretty_size(5 << 30), "5GB");
    }
}
