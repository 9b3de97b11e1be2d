//! End-to-end mirror construction against local fixture files.
//!
//! These tests stand up a complete fake upstream (catalogue, package
//! archives, installer) on the local filesystem and drive `MirrorBuilder`
//! over `file:` URLs, so nothing here touches the network.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use cygmir_core::CoreError;
use cygmir_core::builder::{BuildOptions, MirrorBuilder, RetryPolicy};
use cygmir_core::garbage::{Confirm, GarbageConfirmer, PurgePolicy};
use cygmir_core::reporter::NullReporter;
use cygmir_core::selection::PackageSelection;
use cygmir_core::transport::{HttpTransport, Transport, TransportError};
use cygmir_schema::hash::HashAlg;

struct Fixture {
    _upstream: tempfile::TempDir,
    target: tempfile::TempDir,
    builder: MirrorBuilder,
    upstream_root: PathBuf,
}

struct AlwaysConfirm(bool);
impl Confirm for AlwaysConfirm {
    fn confirm(&self, _: &[String]) -> bool {
        self.0
    }
}

fn md5_hex(data: &[u8]) -> String {
    cygmir_core::verify::hash_bytes(data, HashAlg::Md5)
}

/// Lay out a fake upstream repository with three packages (`make` depends
/// on `bash` and `coreutils`) plus an installer executable, and return a
/// builder pointed at it.
fn fixture() -> Fixture {
    let upstream = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let root = upstream.path().to_path_buf();

    let packages: [(&str, &[u8], &[&str]); 3] = [
        ("bash", b"bash archive contents", &[]),
        ("coreutils", b"coreutils archive!", &[]),
        ("make", b"make archive data", &["bash", "coreutils"]),
    ];

    let mut ini = String::from("release: cygwin\narch: x86_64\nsetup-version: 2.922\n");
    for (name, contents, deps) in packages {
        let rel = format!("x86_64/release/{name}/{name}-1.0.tar.xz");
        let file = root.join(&rel);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, contents).unwrap();

        ini.push_str(&format!("\n@ {name}\nsdesc: \"{name} package\"\ncategory: Misc\n"));
        if !deps.is_empty() {
            ini.push_str(&format!("depends2: {}\n", deps.join(", ")));
        }
        ini.push_str(&format!(
            "install: {rel} {} {}\n",
            contents.len(),
            md5_hex(contents)
        ));
    }
    std::fs::write(root.join("setup.ini"), &ini).unwrap();
    std::fs::write(root.join("setup-x86_64.exe"), b"MZ fake installer").unwrap();

    let mirror = format!("{}/", Url::from_file_path(&root).unwrap());
    let installer = format!("{}setup${{_arch}}.exe", mirror);
    let ini_url = Url::from_file_path(root.join("setup.ini")).unwrap();

    let builder = MirrorBuilder::new(Arc::new(HttpTransport::new()), Arc::new(NullReporter))
        .with_mirror(&mirror)
        .unwrap()
        .with_installer_url(installer)
        .with_setup_ini_url(ini_url)
        .with_target_dir(target.path())
        .with_options(BuildOptions {
            include_base: false,
            retry: RetryPolicy {
                rounds: 2,
                delay: Duration::from_millis(10),
            },
            ..BuildOptions::default()
        });

    Fixture {
        _upstream: upstream,
        target,
        builder,
        upstream_root: root,
    }
}

fn selection_of(names: &[&str]) -> PackageSelection {
    let mut sel = PackageSelection::new();
    sel.extend(names.iter().copied());
    sel
}

#[tokio::test]
async fn mirrors_dependency_closure() {
    let fx = fixture();
    let outcome = fx.builder.run(Some(&selection_of(&["make"]))).await.unwrap();

    assert_eq!(outcome.packages, vec!["bash", "coreutils", "make"]);
    assert_eq!(outcome.stats.total(), 3);
    assert_eq!(outcome.stats.new_count(), 3);
    assert!(outcome.stats.is_clean());

    for name in ["bash", "coreutils", "make"] {
        let archive = fx
            .target
            .path()
            .join(format!("x86_64/release/{name}/{name}-1.0.tar.xz"));
        assert!(archive.is_file(), "{name} archive missing");
    }
    assert!(fx.target.path().join("setup-x86_64.exe").is_file());
}

#[tokio::test]
async fn regenerates_catalogue_metadata() {
    let fx = fixture();
    fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();

    let arch_dir = fx.target.path().join("x86_64");
    let ini = std::fs::read_to_string(arch_dir.join("setup.ini")).unwrap();
    assert!(ini.contains("release: cygwin"));
    assert!(ini.contains("setup-version: 2.922"));
    assert!(ini.contains("@ bash"));
    assert!(!ini.contains("@ make"));

    // The compressed twin decodes to the same content.
    let bz2 = std::fs::read(arch_dir.join("setup.bz2")).unwrap();
    let mut decoded = Vec::new();
    use std::io::Read;
    bzip2::read::BzDecoder::new(bz2.as_slice())
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&decoded), ini);

    // Digest manifests cover both catalogue files.
    for alg in ["md5", "sha256", "sha512"] {
        let sums = std::fs::read_to_string(arch_dir.join(format!("{alg}.sum"))).unwrap();
        assert!(sums.contains("setup.ini"));
        assert!(sums.contains("setup.bz2"));
    }
}

#[tokio::test]
async fn present_files_are_not_refetched() {
    let fx = fixture();
    fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();

    let second = fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();
    assert_eq!(second.stats.new_count(), 0);
    assert_eq!(second.stats.already(), 1);
    assert!(second.stats.is_clean());
}

#[tokio::test]
async fn corrupt_upstream_file_fails_after_retries() {
    let fx = fixture();
    // Same size as declared, different contents: size check passes, the
    // checksum does not, and the entry fails every round.
    let upstream_bash = fx
        .upstream_root
        .join("x86_64/release/bash/bash-1.0.tar.xz");
    std::fs::write(&upstream_bash, b"bash archive CORRUPT!").unwrap();

    let outcome = fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();
    assert_eq!(outcome.stats.failures(), 1);
    assert!(!outcome.stats.is_clean());
    // The corrupt download was deleted rather than left in the mirror.
    assert!(
        !fx.target
            .path()
            .join("x86_64/release/bash/bash-1.0.tar.xz")
            .exists()
    );
}

#[tokio::test]
async fn truncated_local_file_is_replaced() {
    let fx = fixture();
    let local = fx
        .target
        .path()
        .join("x86_64/release/bash/bash-1.0.tar.xz");
    std::fs::create_dir_all(local.parent().unwrap()).unwrap();
    std::fs::write(&local, b"short").unwrap();

    let outcome = fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();
    assert_eq!(outcome.stats.new_count(), 1);
    assert_eq!(outcome.stats.already(), 0);
    assert_eq!(
        std::fs::read(&local).unwrap(),
        b"bash archive contents".to_vec()
    );
}

#[tokio::test]
async fn unknown_selection_name_fails_resolution() {
    let fx = fixture();
    let err = fx
        .builder
        .run(Some(&selection_of(&["missing-pkg"])))
        .await
        .unwrap_err();
    match err {
        CoreError::UnknownPackages { names, .. } => assert!(names.contains("missing-pkg")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn dry_run_downloads_nothing() {
    let fx = fixture();
    let builder = fixture_with_options(&fx, BuildOptions {
        include_base: false,
        dummy_download: true,
        ..BuildOptions::default()
    });
    let outcome = builder.run(Some(&selection_of(&["make"]))).await.unwrap();

    assert_eq!(outcome.packages.len(), 3);
    assert!(outcome.garbage.is_none());
    assert!(!fx.target.path().join("x86_64").exists());
}

/// Rebuild the fixture's builder with different options (the fixture's
/// transport and URLs are cheap to reconstruct).
fn fixture_with_options(fx: &Fixture, options: BuildOptions) -> MirrorBuilder {
    let mirror = format!("{}/", Url::from_file_path(&fx.upstream_root).unwrap());
    let installer = format!("{}setup${{_arch}}.exe", mirror);
    let ini_url = Url::from_file_path(fx.upstream_root.join("setup.ini")).unwrap();
    MirrorBuilder::new(Arc::new(HttpTransport::new()), Arc::new(NullReporter))
        .with_mirror(&mirror)
        .unwrap()
        .with_installer_url(installer)
        .with_setup_ini_url(ini_url)
        .with_target_dir(fx.target.path())
        .with_options(options)
}

#[tokio::test]
async fn stale_archives_are_purged_after_confirmation() {
    let fx = fixture();

    // A previous pass left a superseded archive behind.
    let stale = fx
        .target
        .path()
        .join("x86_64/release/bash/bash-0.9.tar.xz");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"obsolete").unwrap();

    let outcome = fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();
    let mut garbage = outcome.garbage.unwrap();

    let fresh = fx
        .target
        .path()
        .join("x86_64/release/bash/bash-1.0.tar.xz");
    assert!(fresh.is_file());

    GarbageConfirmer::new(PurgePolicy::Ask, &AlwaysConfirm(true))
        .run(&mut garbage, &NullReporter);

    assert!(!stale.exists(), "stale archive should be purged");
    assert!(fresh.is_file(), "fresh archive must survive the purge");
    assert!(
        fx.target.path().join("x86_64/setup.ini").is_file(),
        "regenerated metadata must survive the purge"
    );
}

#[tokio::test]
async fn declined_confirmation_preserves_everything() {
    let fx = fixture();
    let stale = fx
        .target
        .path()
        .join("x86_64/release/bash/bash-0.9.tar.xz");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"obsolete").unwrap();

    let outcome = fx.builder.run(Some(&selection_of(&["bash"]))).await.unwrap();
    let mut garbage = outcome.garbage.unwrap();

    GarbageConfirmer::new(PurgePolicy::Ask, &AlwaysConfirm(false))
        .run(&mut garbage, &NullReporter);
    assert!(stale.exists());

    GarbageConfirmer::new(PurgePolicy::No, &AlwaysConfirm(true))
        .run(&mut garbage, &NullReporter);
    assert!(stale.exists());
}

#[tokio::test]
async fn bootstrap_set_is_used_without_a_selection() {
    let fx = fixture();
    // The fixture catalogue lacks most bootstrap packages, so resolution
    // must fail naming one of them -- proving the substitution happened.
    let err = fx.builder.run(None).await.unwrap_err();
    match err {
        CoreError::UnknownPackages { names, .. } => assert!(names.contains("base-files")),
        other => panic!("unexpected error {other:?}"),
    }
}

/// Transport that trips the builder's cancellation flag after a set number
/// of archive downloads, simulating a user hitting cancel mid-run.
struct CancelAfter {
    inner: HttpTransport,
    cancel: std::sync::OnceLock<Arc<AtomicBool>>,
    archives: AtomicUsize,
    limit: usize,
}

#[async_trait]
impl Transport for CancelAfter {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.inner.fetch(url).await
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<u64, TransportError> {
        let result = self.inner.download(url, dest).await;
        if url.path().contains("/release/") {
            let done = self.archives.fetch_add(1, Ordering::SeqCst) + 1;
            if done >= self.limit {
                if let Some(flag) = self.cancel.get() {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        }
        result
    }
}

#[tokio::test]
async fn cancellation_stops_remaining_downloads() {
    let fx = fixture();
    let transport = Arc::new(CancelAfter {
        inner: HttpTransport::new(),
        cancel: std::sync::OnceLock::new(),
        archives: AtomicUsize::new(0),
        limit: 1,
    });

    let mirror = format!("{}/", Url::from_file_path(&fx.upstream_root).unwrap());
    let installer = format!("{}setup${{_arch}}.exe", mirror);
    let ini_url = Url::from_file_path(fx.upstream_root.join("setup.ini")).unwrap();
    let builder = MirrorBuilder::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(NullReporter),
    )
    .with_mirror(&mirror)
    .unwrap()
    .with_installer_url(installer)
    .with_setup_ini_url(ini_url)
    .with_target_dir(fx.target.path())
    .with_options(BuildOptions {
        include_base: false,
        ..BuildOptions::default()
    });

    transport
        .cancel
        .set(builder.cancel_flag())
        .unwrap_or_else(|_| unreachable!("flag set once"));

    let outcome = builder.run(Some(&selection_of(&["make"]))).await.unwrap();

    // One archive landed before the cancel; the rest were skipped without
    // being counted as failures.
    assert_eq!(outcome.stats.failures(), 0);
    assert!(outcome.stats.new_count() + outcome.stats.already() < outcome.stats.total());
}
