//! A bounded, single-shot subprocess runner shared by the probe,
//! transcode, and frame-extraction adapters. Every media capability in
//! this crate shells out to a well-known CLI (ffprobe/ffmpeg-shaped)
//! and needs the same thing: spawn, capture combined output, enforce a
//! hard wall-clock timeout, and never leak the child on timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use vd_domain::error::{Error, Result};

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs `program args...` to completion, killing it if it outruns
/// `timeout_sec`. A non-zero exit status is an error; the caller
/// supplies the message prefix so failures read naturally per stage
/// ("probe", "proxy encode", ...).
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout_sec: f64,
    what: &str,
) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| Error::Internal(format!("{what}: failed to spawn {program}: {e}")))?;

    let timeout = Duration::from_secs_f64(timeout_sec.max(0.1));
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => return Err(Error::Internal(format!("{what}: {program} failed: {e}"))),
        Err(_) => return Err(Error::Timeout(format!("{what} exceeded {timeout_sec}s"))),
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(Error::Internal(format!(
            "{what}: {program} exited with {}: {}",
            output.status, stderr
        )));
    }

    Ok(CommandOutput {
        stdout: output.stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let out = run_command("echo", &["hello"], 5.0, "test").await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = run_command("sh", &["-c", "exit 3"], 5.0, "test").await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn timeout_is_reported_distinctly() {
        let err = run_command("sleep", &["5"], 0.1, "test").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_an_adapter_error() {
        let err = run_command("definitely-not-a-real-binary", &[], 5.0, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
