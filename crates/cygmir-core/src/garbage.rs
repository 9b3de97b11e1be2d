//! Garbage collection of stale mirror artifacts.
//!
//! An incremental mirror run leaves behind archives of superseded package
//! versions. The collector indexes everything under the target's
//! architecture roots before the run, the builder "rescues" every path it
//! touches, and whatever remains indexed afterwards is a purge candidate.
//!
//! Because a mistyped target directory could point the purge at a home
//! directory or a live installation, indexing also evaluates a
//! suspiciousness heuristic; a suspicious index is never purged without an
//! explicit confirmation, regardless of policy.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::reporter::Reporter;

/// Directory names strongly associated with a live OS or user tree rather
/// than a mirror output.
const SUSPICIOUS_DIRNAMES: [&str; 7] = [
    "bin",
    "etc",
    "sbin",
    "home",
    "My Documents",
    "WINNT",
    "system32",
];

/// File names strongly associated with a live OS or shell profile.
const SUSPICIOUS_FILENAMES: [&str; 6] = [
    "initrd.img",
    "vmlinuz",
    ".bashrc",
    ".bash_profile",
    ".login",
    ".tcshrc",
];

/// Maximum plausible number of loose top-level files in a mirror root.
const TOP_FILE_LIMIT: usize = 10;

/// Indexes prior mirror contents so stale files can be purged.
pub struct GarbageCollector {
    reporter: Arc<dyn Reporter>,
    roots: Vec<PathBuf>,
    files: BTreeSet<PathBuf>,
    directories: BTreeSet<PathBuf>,
    suspicious: bool,
}

impl std::fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarbageCollector")
            .field("roots", &self.roots)
            .field("files", &self.files.len())
            .field("directories", &self.directories.len())
            .field("suspicious", &self.suspicious)
            .finish()
    }
}

impl GarbageCollector {
    /// Create an empty collector. Until
    /// [`index_current_files`](Self::index_current_files) runs, the
    /// collector is conservatively suspicious and has nothing to purge.
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            roots: Vec::new(),
            files: BTreeSet::new(),
            directories: BTreeSet::new(),
            suspicious: true,
        }
    }

    /// Walk `roots` and record every file and directory at or below
    /// `min_depth` (relative to each root) as a purge candidate.
    ///
    /// Children are visited before parents so purging can delete bottom-up
    /// without a second walk. While walking, the suspiciousness heuristic is
    /// evaluated over *all* nodes, including those above `min_depth`.
    pub fn index_current_files<P: AsRef<Path>>(&mut self, roots: &[P], min_depth: usize) {
        self.roots = roots.iter().map(|r| normalize(r.as_ref())).collect();
        self.files.clear();
        self.directories.clear();
        self.suspicious = false;

        for root in self.roots.clone() {
            if root.is_dir() {
                self.suspicious |= check_top_suspiciousness(&root);
            }

            for entry in WalkDir::new(&root)
                .contents_first(true)
                .into_iter()
                .filter_map(Result::ok)
            {
                if entry.depth() == 0 {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if entry.file_type().is_dir() {
                    if SUSPICIOUS_DIRNAMES.contains(&name.as_ref()) {
                        self.suspicious = true;
                    }
                } else if SUSPICIOUS_FILENAMES.contains(&name.as_ref()) {
                    self.suspicious = true;
                }
                if entry.path_is_symlink() {
                    self.suspicious = true;
                }

                if entry.depth() < min_depth {
                    continue;
                }
                let path = normalize(entry.path());
                if entry.file_type().is_dir() {
                    self.directories.insert(path);
                } else {
                    self.files.insert(path);
                }
            }
        }
    }

    /// Signal that `path` must not be deleted. The file is removed from the
    /// candidate set, along with every ancestor directory up to (but not
    /// including) the indexed root: a directory containing anything rescued
    /// is never deleted even when its other children are stale.
    pub fn rescue_file(&mut self, path: &Path) {
        let path = normalize(path);
        self.files.remove(&path);
        for ancestor in path.ancestors().skip(1) {
            self.directories.remove(ancestor);
        }
    }

    /// Number of candidate files.
    pub fn num_files(&self) -> usize {
        self.files.len()
    }

    /// Candidate files, sorted.
    pub fn file_list(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Candidate directories, sorted.
    pub fn directory_list(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    /// Whether anything at all is a purge candidate.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Whether the indexed tree did not look like a prior mirror output.
    pub fn is_suspicious(&self) -> bool {
        self.suspicious
    }

    /// Human-readable candidate list, abbreviating entries beneath the
    /// common root of the indexed directories as `[.]/...`.
    pub fn neat_list(&self) -> Vec<String> {
        let Some(prefix) = common_root(&self.roots) else {
            return Vec::new();
        };

        let mut entries: Vec<String> = self
            .files
            .iter()
            .chain(self.directories.iter())
            .map(|path| match path.strip_prefix(&prefix) {
                Ok(rel) => Path::new("[.]").join(rel).display().to_string(),
                Err(_) => path.display().to_string(),
            })
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Delete every remaining candidate file, then every remaining candidate
    /// directory in reverse lexicographic order (an approximation of
    /// deepest-first that avoids a second walk). Individual failures are
    /// reported and skipped; the purge always runs to completion.
    pub fn purge_files(&mut self) {
        tracing::debug!(
            files = self.files.len(),
            directories = self.directories.len(),
            "purging outdated entries"
        );
        for file in &self.files {
            if let Err(err) = std::fs::remove_file(file) {
                self.reporter.warning(&format!(
                    "Failed to remove outdated file {} - {err}",
                    file.display()
                ));
            }
        }
        for dir in self.directories.iter().rev() {
            if let Err(err) = std::fs::remove_dir(dir) {
                self.reporter.warning(&format!(
                    "Failed to remove outdated directory {} - {err}",
                    dir.display()
                ));
            }
        }
        self.files.clear();
        self.directories.clear();
    }
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the filesystem, so paths that do not exist yet can be compared
/// against indexed candidates.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// A root whose top level holds many loose files, or more subdirectories
/// than `release*` trees, probably is not a mirror output at all.
fn check_top_suspiciousness(root: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(root) else {
        return true;
    };

    let mut top_files = 0usize;
    let mut subdirs = 0usize;
    let mut release_dirs = 0usize;
    for entry in entries.filter_map(Result::ok) {
        if entry.path().is_dir() {
            subdirs += 1;
            if entry.file_name().to_string_lossy().starts_with("release") {
                release_dirs += 1;
            }
        } else {
            top_files += 1;
        }
    }

    top_files > TOP_FILE_LIMIT || subdirs > release_dirs
}

fn common_root(roots: &[PathBuf]) -> Option<PathBuf> {
    let first = roots.first()?;
    let mut prefix: Vec<Component<'_>> = first.components().collect();
    for root in &roots[1..] {
        let components: Vec<Component<'_>> = root.components().collect();
        let shared = prefix
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.iter().collect())
    }
}

/// Whether stale files may be purged after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurgePolicy {
    /// Never purge.
    #[default]
    No,
    /// Purge without asking, unless the index looks suspicious (in which
    /// case fall back to asking).
    Yes,
    /// Always ask first.
    Ask,
}

impl std::str::FromStr for PurgePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no" | "never" => Ok(Self::No),
            "yes" | "always" => Ok(Self::Yes),
            "ask" => Ok(Self::Ask),
            other => Err(format!("Invalid remove-outdated policy: {other}")),
        }
    }
}

/// The prompt seam for [`GarbageConfirmer`].
///
/// A console front end blocks on stdin; a GUI can park the call on a
/// channel and answer from an event handler. Either way the engine only
/// sees a yes/no answer, which is what keeps the confirmation flow out of
/// the mirror builder.
pub trait Confirm: Send + Sync {
    /// Present the candidate list and return whether to proceed.
    fn confirm(&self, candidates: &[String]) -> bool;
}

/// Applies a [`PurgePolicy`] to a populated [`GarbageCollector`].
pub struct GarbageConfirmer<'a> {
    policy: PurgePolicy,
    prompt: &'a dyn Confirm,
}

impl std::fmt::Debug for GarbageConfirmer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarbageConfirmer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a> GarbageConfirmer<'a> {
    /// Create a confirmer for the given policy and prompt implementation.
    pub fn new(policy: PurgePolicy, prompt: &'a dyn Confirm) -> Self {
        Self { policy, prompt }
    }

    /// Decide whether the purge may proceed, prompting when the policy (or
    /// the suspiciousness fallback) requires it.
    pub fn should_purge(&self, garbage: &GarbageCollector) -> bool {
        if garbage.is_empty() {
            return false;
        }
        match self.policy {
            PurgePolicy::No => false,
            PurgePolicy::Yes if !garbage.is_suspicious() => true,
            PurgePolicy::Yes | PurgePolicy::Ask => {
                let candidates = garbage.neat_list();
                !candidates.is_empty() && self.prompt.confirm(&candidates)
            }
        }
    }

    /// Act on the policy: purge when permitted, otherwise leave the target
    /// untouched.
    pub fn run(&self, garbage: &mut GarbageCollector, reporter: &dyn Reporter) {
        if self.should_purge(garbage) {
            reporter.info(&format!("Deleting {} files", garbage.num_files()));
            garbage.purge_files();
        }
    }
}
