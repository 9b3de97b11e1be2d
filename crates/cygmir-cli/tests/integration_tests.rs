//! CLI-level tests driving the compiled `cygmir` binary against local
//! fixtures. No network access: catalogue, archives and installer are all
//! served through `file:` URLs.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// A fake upstream repository plus an empty mirror target.
struct TestContext {
    upstream: TempDir,
    target: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let upstream = TempDir::new().expect("failed to create upstream dir");
        let target = TempDir::new().expect("failed to create target dir");

        let root = upstream.path();
        let archive: &[u8] = b"fixture archive bytes";
        let rel = "x86_64/release/bash/bash-5.2.tar.xz";
        let file = root.join(rel);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, archive).unwrap();
        std::fs::write(root.join("setup-x86_64.exe"), b"MZ fake installer").unwrap();

        let md5 = cygmir_core::verify::hash_bytes(archive, cygmir_schema::HashAlg::Md5);
        let ini = format!(
            "release: cygwin\narch: x86_64\nsetup-version: 2.922\n\n\
             @ bash\nsdesc: \"The shell\"\ncategory: Base Shells\n\
             install: {rel} {} {md5}\n",
            archive.len()
        );
        std::fs::write(root.join("setup.ini"), ini).unwrap();

        Self { upstream, target }
    }

    fn file_url(&self, rel: &str) -> String {
        url::Url::from_file_path(self.upstream.path().join(rel))
            .unwrap()
            .to_string()
    }

    fn mirror_url(&self) -> String {
        format!(
            "{}/",
            url::Url::from_file_path(self.upstream.path()).unwrap()
        )
    }

    fn cygmir_cmd(&self) -> Command {
        Command::new(env!("CARGO_BIN_EXE_cygmir"))
    }

    fn target_path(&self) -> &Path {
        self.target.path()
    }
}

#[test]
fn help_lists_subcommands() {
    let ctx = TestContext::new();
    let output = ctx
        .cygmir_cmd()
        .arg("--help")
        .output()
        .expect("failed to run cygmir");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("template"));
}

#[test]
fn version_flag_works() {
    let ctx = TestContext::new();
    let output = ctx
        .cygmir_cmd()
        .arg("--version")
        .output()
        .expect("failed to run cygmir");
    assert!(output.status.success());
}

#[test]
fn builds_a_mirror_from_fixtures() {
    let ctx = TestContext::new();
    let list = ctx.target_path().join("pkgs.txt");
    std::fs::write(&list, "bash\n").unwrap();

    let output = ctx
        .cygmir_cmd()
        .args(["build", "-B"])
        .args(["-d".as_ref(), ctx.target_path().as_os_str()])
        .args(["-m", ctx.mirror_url().as_str()])
        .args(["-i", ctx.file_url("setup.ini").as_str()])
        .args(["-x", format!("{}setup${{_arch}}.exe", ctx.mirror_url()).as_str()])
        .arg(&list)
        .output()
        .expect("failed to run cygmir build");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "build failed: {stderr}");

    assert!(
        ctx.target_path()
            .join("x86_64/release/bash/bash-5.2.tar.xz")
            .is_file()
    );
    assert!(ctx.target_path().join("x86_64/setup.ini").is_file());
    assert!(ctx.target_path().join("x86_64/setup.bz2").is_file());
    assert!(ctx.target_path().join("setup-x86_64.exe").is_file());
}

#[test]
fn dry_run_touches_nothing() {
    let ctx = TestContext::new();
    let list = ctx.target_path().join("pkgs.txt");
    std::fs::write(&list, "bash   # just the shell\n").unwrap();

    let output = ctx
        .cygmir_cmd()
        .args(["build", "-B", "-z"])
        .args(["-d".as_ref(), ctx.target_path().as_os_str()])
        .args(["-m", ctx.mirror_url().as_str()])
        .args(["-i", ctx.file_url("setup.ini").as_str()])
        .arg(&list)
        .output()
        .expect("failed to run cygmir build -z");

    assert!(output.status.success());
    assert!(!ctx.target_path().join("x86_64").exists());
}

#[test]
fn template_generates_listing() {
    let ctx = TestContext::new();
    let out_file: PathBuf = ctx.target_path().join("listing.txt");
    let output = ctx
        .cygmir_cmd()
        .arg("template")
        .args(["-g".as_ref(), out_file.as_os_str()])
        .args(["-m", ctx.mirror_url().as_str()])
        .args(["-i", ctx.file_url("setup.ini").as_str()])
        .output()
        .expect("failed to run cygmir template");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "template failed: {stderr}");

    let listing = std::fs::read_to_string(&out_file).unwrap();
    assert!(listing.contains("#bash"));
    assert!(listing.contains("The shell"));
}

#[test]
fn unknown_package_file_line_fails_cleanly() {
    let ctx = TestContext::new();
    let list = ctx.target_path().join("pkgs.txt");
    std::fs::write(&list, "bash\n[not a package line\n").unwrap();

    let output = ctx
        .cygmir_cmd()
        .args(["build", "-B"])
        .args(["-d".as_ref(), ctx.target_path().as_os_str()])
        .args(["-m", ctx.mirror_url().as_str()])
        .args(["-i", ctx.file_url("setup.ini").as_str()])
        .arg(&list)
        .output()
        .expect("failed to run cygmir build");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("package-list parse failure"));
}
