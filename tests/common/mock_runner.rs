//! Scripted command runner for pipeline tests
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use patch_uploader::runner::{CommandOutput, CommandRunner, CommandSpec};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Hash `rev-list` answers with unless told otherwise
pub const FAKE_SHA: &str = "0123456789abcdef0123456789abcdef01234567";

/// One command the pipeline ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Directory the command ran in
    pub dir: PathBuf,
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Bytes fed on stdin
    pub stdin: Option<Vec<u8>>,
    /// Whether `dir` existed when the command ran
    pub dir_existed: bool,
}

impl RecordedCall {
    /// Stdin as text
    pub fn stdin_text(&self) -> String {
        self.stdin
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

/// Runner that answers from a script instead of spawning processes
///
/// Unscripted commands succeed with empty output, except branch and commit
/// lookups which answer like a healthy repository would.
///
/// Features:
/// - Responses keyed by argv prefix (last scripted match wins)
/// - Call tracking for verification
/// - Failure injection per command, including panics
pub struct MockRunner {
    responses: Mutex<Vec<(Vec<String>, CommandOutput)>>,
    panics: Mutex<Vec<Vec<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Mock where every step succeeds on branch `master`
    pub fn new() -> Self {
        let mock = Self {
            responses: Mutex::new(Vec::new()),
            panics: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        };
        mock.respond(&["git", "rev-parse"], 0, "master\n");
        mock.respond(&["git", "rev-list"], 0, &format!("{FAKE_SHA}\n"));
        mock
    }

    // === Scripting ===

    /// Answer commands starting with `prefix`
    pub fn respond(&self, prefix: &[&str], exit_code: i32, output: &str) {
        self.responses.lock().unwrap().push((
            prefix.iter().map(ToString::to_string).collect(),
            CommandOutput::new(exit_code, output),
        ));
    }

    /// Make commands starting with `prefix` exit 1 with `output`
    pub fn fail_on(&self, prefix: &[&str], output: &str) {
        self.respond(prefix, 1, output);
    }

    /// Panic inside `run` for commands starting with `prefix`
    pub fn panic_on(&self, prefix: &[&str]) {
        self.panics
            .lock()
            .unwrap()
            .push(prefix.iter().map(ToString::to_string).collect());
    }

    // === Call verification ===

    /// Every call so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls starting with `prefix`
    pub fn calls_to(&self, prefix: &[&str]) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| starts_with(&c.argv, prefix))
            .collect()
    }

    /// Assert some call started with `prefix`
    pub fn assert_called(&self, prefix: &[&str]) {
        let calls = self.calls();
        assert!(
            calls.iter().any(|c| starts_with(&c.argv, prefix)),
            "Expected a call to {prefix:?} but got: {:?}",
            calls.iter().map(|c| &c.argv).collect::<Vec<_>>()
        );
    }

    /// Assert no call started with `prefix`
    pub fn assert_not_called(&self, prefix: &[&str]) {
        assert!(
            self.calls_to(prefix).is_empty(),
            "Expected no call to {prefix:?}"
        );
    }

    /// Distinct directories commands ran in
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for call in self.calls() {
            if !dirs.contains(&call.dir) {
                dirs.push(call.dir);
            }
        }
        dirs
    }
}

fn starts_with(argv: &[String], prefix: &[impl AsRef<str>]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p.as_ref())
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, dir: &Path, command: &CommandSpec) -> CommandOutput {
        let argv = command.argv();
        self.calls.lock().unwrap().push(RecordedCall {
            dir: dir.to_path_buf(),
            argv: argv.clone(),
            stdin: command.stdin.as_ref().map(|s| s.bytes.clone()),
            dir_existed: dir.is_dir(),
        });

        let panics = self.panics.lock().unwrap().clone();
        if panics.iter().any(|prefix| starts_with(&argv, &prefix[..])) {
            panic!("injected panic running {argv:?}");
        }

        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .rev()
            .find(|(prefix, _)| starts_with(&argv, &prefix[..]))
            .map_or_else(|| CommandOutput::new(0, ""), |(_, out)| out.clone())
    }
}
