//! External command execution
//!
//! Every process the pipeline launches goes through [`CommandRunner`], so
//! tests can script the whole git/patch/ssh surface without touching a
//! real repository.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Bytes fed to a command's stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdinPayload {
    /// Payload
    pub bytes: Vec<u8>,
    /// Name shown in the transcript instead of the content (`< name`)
    pub source: Option<String>,
}

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Optional stdin
    pub stdin: Option<StdinPayload>,
}

impl CommandSpec {
    /// Command with no arguments and no stdin
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `bytes` on stdin and show them verbatim in the transcript
    #[must_use]
    pub fn stdin_inline(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinPayload {
            bytes: bytes.into(),
            source: None,
        });
        self
    }

    /// Feed `bytes` on stdin, shown in the transcript as `< source`
    #[must_use]
    pub fn stdin_named(mut self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinPayload {
            bytes: bytes.into(),
            source: Some(source.into()),
        });
        self
    }

    /// Program followed by arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Raw result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` if there was none
    pub exit_code: i32,
    /// Combined stdout and stderr, lines in arrival order
    pub output: String,
}

impl CommandOutput {
    /// Output for a command that exited with `exit_code`
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }
}

/// Runs external commands
///
/// Implementations never fail outright: a command that cannot be started is
/// reported as exit code `-1` with the error text as output, which the
/// pipeline treats like any other failed step.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `dir` as working directory and wait for it
    async fn run(&self, dir: &Path, command: &CommandSpec) -> CommandOutput;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    env: BTreeMap<String, String>,
}

impl ProcessRunner {
    /// Runner that adds `env` to every child's environment
    pub const fn new(env: BTreeMap<String, String>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, dir: &Path, command: &CommandSpec) -> CommandOutput {
        debug!(program = %command.program, args = ?command.args, dir = %dir.display(), "spawning");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(dir)
            .envs(&self.env)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::new(-1, format!("failed to run {}: {e}\n", command.program));
            }
        };

        // stdin is written from its own task so a chatty child can't
        // deadlock against a full stdout pipe
        let writer = match (child.stdin.take(), &command.stdin) {
            (Some(mut pipe), Some(payload)) => {
                let bytes = payload.bytes.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(&bytes).await {
                        debug!("stdin closed early: {e}");
                    }
                }))
            }
            _ => None,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut combined = Vec::new();
        while let Some(chunk) = rx.recv().await {
            combined.extend_from_slice(&chunk);
        }

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        let mut output = String::from_utf8_lossy(&combined).into_owned();
        let exit_code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                output.push_str(&format!("failed to wait for {}: {e}\n", command.program));
                -1
            }
        };

        debug!(program = %command.program, exit_code, "finished");
        CommandOutput { exit_code, output }
    }
}

/// Send each line read from `stream` (newline included) to `tx`
async fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(stream);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_starts_with_program() {
        let spec = CommandSpec::new("git").args(["rev-parse", "--abbrev-ref", "HEAD"]);
        assert_eq!(spec.argv(), vec!["git", "rev-parse", "--abbrev-ref", "HEAD"]);
        assert!(spec.stdin.is_none());
    }

    #[test]
    fn test_stdin_variants() {
        let named = CommandSpec::new("patch").stdin_named("patch", b"diff".to_vec());
        assert_eq!(named.stdin.unwrap().source.as_deref(), Some("patch"));

        let inline = CommandSpec::new("git").stdin_inline("message\n");
        let payload = inline.stdin.unwrap();
        assert!(payload.source.is_none());
        assert_eq!(payload.bytes, b"message\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_combines_streams() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let out = ProcessRunner::default().run(dir.path(), &spec).await;
        assert_eq!(out.exit_code, 3);
        assert!(out.output.contains("out\n"));
        assert!(out.output.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_feeds_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("cat").stdin_inline("hello\nworld\n");
        let out = ProcessRunner::default().run(dir.path(), &spec).await;
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.output, "hello\nworld\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_exit_minus_one() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("definitely-not-a-real-program-7f3a");
        let out = ProcessRunner::default().run(dir.path(), &spec).await;
        assert_eq!(out.exit_code, -1);
        assert!(out.output.contains("failed to run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_passes_env() {
        let dir = tempfile::tempdir().unwrap();
        let env = BTreeMap::from([("PATCH_UPLOADER_TEST_VAR".to_string(), "42".to_string())]);
        let spec = CommandSpec::new("sh").args(["-c", "echo $PATCH_UPLOADER_TEST_VAR"]);
        let out = ProcessRunner::new(env).run(dir.path(), &spec).await;
        assert_eq!(out.output.trim(), "42");
    }
}
