//! Runs install commands with their stdio attached to a sink.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::sink::StdioSink;

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn forward_lines<S: AsyncRead + Unpin>(
    stream: S,
    sink: &dyn StdioSink,
    kind: Stream,
) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        match kind {
            Stream::Stdout => sink.stdout(&line),
            Stream::Stderr => sink.stderr(&line),
        }
    }
    Ok(())
}

/// Run `argv` in `cwd` and forward every output line to `sink`.
///
/// Fails if the program cannot be spawned or exits unsuccessfully.
#[tracing::instrument(skip(envs, sink))]
pub async fn run_attached(
    argv: &[String],
    cwd: &Path,
    envs: &[(String, String)],
    sink: &dyn StdioSink,
) -> Result<()> {
    let (program, args) = argv.split_first().context("Install command is empty")?;
    debug!("Spawning {} {:?} in {}", program, args, cwd.display());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false)
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;

    let stdout = child.stdout.take().context("Child stdout was not captured")?;
    let stderr = child.stderr.take().context("Child stderr was not captured")?;

    let (out, err) = tokio::join!(
        forward_lines(stdout, sink, Stream::Stdout),
        forward_lines(stderr, sink, Stream::Stderr),
    );
    out?;
    err?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("Failed to wait for {}", program))?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sink::testing::CollectingSink;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn test_forwards_both_streams() {
        let dir = tempdir().unwrap();
        let sink = CollectingSink::default();

        run_attached(&sh("echo out; echo err 1>&2"), dir.path(), &[], &sink)
            .await
            .unwrap();

        assert_eq!(*sink.stdout.lock().unwrap(), vec!["out".to_string()]);
        assert_eq!(*sink.stderr.lock().unwrap(), vec!["err".to_string()]);
    }

    #[tokio::test]
    async fn test_runs_in_cwd_with_env() {
        let dir = tempdir().unwrap();
        let sink = CollectingSink::default();
        let envs = vec![("LSI_VERSION".to_string(), "2.0".to_string())];

        run_attached(&sh("echo $LSI_VERSION > version.txt"), dir.path(), &envs, &sink)
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("version.txt")).unwrap();
        assert_eq!(written.trim(), "2.0");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let dir = tempdir().unwrap();
        let sink = CollectingSink::default();

        let err = run_attached(&sh("exit 3"), dir.path(), &[], &sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sh exited with"));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let dir = tempdir().unwrap();
        let sink = CollectingSink::default();
        assert!(run_attached(&[], dir.path(), &[], &sink).await.is_err());
    }
}
