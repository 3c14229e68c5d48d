use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::trace;

/// Error from a failed command.
#[derive(Debug, thiserror::Error)]
#[error("command failed: {command}\n{detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

/// How a command should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Prefix with `sudo`.
    Sudo,
    /// Run as the current user.
    User,
}

/// Format a human-readable display string for a direct command invocation.
pub(crate) fn format_command_display(program: &str, args: &[&str], privilege: Privilege) -> String {
    let mut parts = Vec::with_capacity(args.len() + 2);
    if matches!(privilege, Privilege::Sudo) {
        parts.push("sudo");
    }
    parts.push(program);
    parts.extend_from_slice(args);
    parts.join(" ")
}

fn command(program: &str, args: &[&str], privilege: Privilege) -> Command {
    match privilege {
        Privilege::Sudo => {
            let mut cmd = Command::new("sudo");
            cmd.arg(program).args(args);
            cmd
        }
        Privilege::User => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
    }
}

/// Execute a command.
///
/// Invokes the program binary directly with the given arguments.
/// Returns trimmed stdout on success.
pub async fn exec(
    program: &str,
    args: &[&str],
    privilege: Privilege,
) -> Result<String, CommandError> {
    let cmd_display = format_command_display(program, args, privilege);
    trace!(command = %cmd_display, "exec");

    let output = command(program, args, privilege)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| CommandError {
            command: cmd_display.clone(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CommandError {
            command: cmd_display,
            detail: stderr,
        })
    }
}

/// Execute a command with stdout and stderr both sent to `path`.
///
/// Both streams share one file handle so their interleaving is preserved,
/// like a shell `> file 2>&1`. With `append` the file is extended instead of
/// truncated.
pub async fn exec_to_file(
    program: &str,
    args: &[&str],
    privilege: Privilege,
    path: &Path,
    append: bool,
) -> Result<(), CommandError> {
    let cmd_display = format_command_display(program, args, privilege);
    trace!(command = %cmd_display, path = %path.display(), "exec_to_file");

    let io_error = |e: std::io::Error| CommandError {
        command: cmd_display.clone(),
        detail: format!("{}: {e}", path.display()),
    };

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(io_error)?;
    let stderr = file.try_clone().map_err(io_error)?;

    let status = command(program, args, privilege)
        .stdin(Stdio::null())
        .stdout(Stdio::from(file))
        .stderr(Stdio::from(stderr))
        .status()
        .await
        .map_err(|e| CommandError {
            command: cmd_display.clone(),
            detail: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandError {
            command: cmd_display,
            detail: format!("exited with {status}"),
        })
    }
}

/// Run `program source_args | program sink_args` and return the sink's trimmed stdout.
pub async fn pipe(
    program: &str,
    source_args: &[&str],
    sink_args: &[&str],
    privilege: Privilege,
) -> Result<String, CommandError> {
    let cmd_display = format!(
        "{} | {}",
        format_command_display(program, source_args, privilege),
        format_command_display(program, sink_args, privilege)
    );
    trace!(command = %cmd_display, "pipe");

    let fail = |detail: String| CommandError {
        command: cmd_display.clone(),
        detail,
    };

    let mut source = command(program, source_args, privilege)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(format!("spawn source: {e}")))?;
    let source_stdout = source
        .stdout
        .take()
        .ok_or_else(|| fail("source stdout not captured".to_string()))?;
    let sink_stdin: Stdio = source_stdout
        .try_into()
        .map_err(|e: std::io::Error| fail(format!("connect pipe: {e}")))?;

    let sink_output = command(program, sink_args, privilege)
        .stdin(sink_stdin)
        .output()
        .await
        .map_err(|e| fail(format!("spawn sink: {e}")))?;
    let source_output = source
        .wait_with_output()
        .await
        .map_err(|e| fail(format!("wait source: {e}")))?;

    if !source_output.status.success() {
        let stderr = String::from_utf8_lossy(&source_output.stderr);
        return Err(fail(stderr.trim().to_string()));
    }
    if !sink_output.status.success() {
        let stderr = String::from_utf8_lossy(&sink_output.stderr);
        return Err(fail(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&sink_output.stdout)
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_command_display_user() {
        let display = format_command_display(
            "docker",
            &["network", "rm", "ci-sx"],
            Privilege::User,
        );
        assert_eq!(display, "docker network rm ci-sx");
    }

    #[test]
    fn format_command_display_sudo() {
        let display = format_command_display("podman", &["rm", "-f", "x"], Privilege::Sudo);
        assert_eq!(display, "sudo podman rm -f x");
    }

    #[tokio::test]
    async fn exec_returns_trimmed_stdout() {
        let output = exec("echo", &["hello"], Privilege::User).await.unwrap();
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn exec_returns_error_on_failure() {
        let err = exec("false", &[], Privilege::User).await.unwrap_err();
        assert!(
            err.command.contains("false"),
            "command was: {}",
            err.command
        );
    }

    #[tokio::test]
    async fn exec_error_contains_stderr() {
        let err = exec("bash", &["-c", "echo oops >&2; exit 1"], Privilege::User)
            .await
            .unwrap_err();
        assert!(err.detail.contains("oops"), "detail was: {}", err.detail);
    }

    #[tokio::test]
    async fn exec_to_file_merges_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        exec_to_file(
            "bash",
            &["-c", "echo one; echo two >&2; echo three"],
            Privilege::User,
            &path,
            false,
        )
        .await
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn exec_to_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "before\n").unwrap();
        exec_to_file("echo", &["after"], Privilege::User, &path, true)
            .await
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "before\nafter\n");
    }

    #[tokio::test]
    async fn exec_to_file_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let err = exec_to_file("false", &[], Privilege::User, &path, false)
            .await
            .unwrap_err();
        assert!(err.detail.contains("exited"), "detail was: {}", err.detail);
    }

    #[tokio::test]
    async fn pipe_connects_source_to_sink() {
        let out = pipe(
            "bash",
            &["-c", "printf 'a\\nb\\nc\\n'"],
            &["-c", "wc -l"],
            Privilege::User,
        )
        .await
        .unwrap();
        assert_eq!(out, "3");
    }

    #[tokio::test]
    async fn pipe_fails_when_source_fails() {
        let err = pipe(
            "bash",
            &["-c", "echo broken >&2; exit 3"],
            &["-c", "cat"],
            Privilege::User,
        )
        .await
        .unwrap_err();
        assert!(err.detail.contains("broken"), "detail was: {}", err.detail);
    }
}
