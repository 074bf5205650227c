//! Test data factories for patch-uploader types

#![allow(dead_code)]

use patch_uploader::{Config, PipelineRequest};
use std::path::Path;

/// Prefix review URLs use in tests
pub const REVIEW_PREFIX: &str = "https://review.example/";

/// A small unified diff against `README`
pub const VALID_PATCH: &str = "--- a/README\n+++ b/README\n@@ -1 +1,2 @@\n hello\n+world\n";

/// Config that keeps workspaces under `root`
pub fn test_config(root: &Path) -> Config {
    Config {
        review_url_prefix: REVIEW_PREFIX.to_string(),
        workspace_root: Some(root.to_path_buf()),
        ..Config::default()
    }
}

/// A complete request for `mediawiki/core` without a provenance note
pub fn make_request() -> PipelineRequest {
    PipelineRequest {
        submitter: "Alice".to_string(),
        project: "mediawiki/core".to_string(),
        committer_name: "Alice Example".to_string(),
        committer_email: "alice@example.org".to_string(),
        message: "Fix typo in README".to_string(),
        patch: VALID_PATCH.as_bytes().to_vec(),
        provenance_note: None,
    }
}

/// Same as [`make_request`] with a provenance note
pub fn make_request_with_note(note: &str) -> PipelineRequest {
    PipelineRequest {
        provenance_note: Some(note.to_string()),
        ..make_request()
    }
}

/// Push output as Gerrit prints it for `urls`
pub fn push_output(urls: &[&str]) -> String {
    let mut out = String::from("remote: Processing changes: new: 1, done\nremote:\nremote: New Changes:\n");
    for url in urls {
        out.push_str(&format!("remote:   {url} Fix typo in README\n"));
    }
    out.push_str("remote:\nTo ssh://gerrit/mediawiki/core\n * [new branch]      HEAD -> refs/for/master\n");
    out
}

/// Number of entries directly under `dir`
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

/// Whether `program --version` runs
pub fn have(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Run git in `dir` with a throwaway identity and return stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(["-c", "user.name=Seed", "-c", "user.email=seed@example.org"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Create bare repository `root/<name>` whose `master` holds `README`
pub fn seed_bare_project(root: &Path, name: &str) -> std::path::PathBuf {
    let seed = root.join(format!("{name}-seed"));
    std::fs::create_dir(&seed).unwrap();
    git(&seed, &["init", "-q", "-b", "master"]);
    std::fs::write(seed.join("README"), "hello\n").unwrap();
    git(&seed, &["add", "README"]);
    git(&seed, &["commit", "-q", "-m", "Initial commit"]);
    git(root, &["clone", "-q", "--bare", &format!("{name}-seed"), name]);
    root.join(name)
}
