//! Child-process execution for cli variables and tasks.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// A user-supplied command failed.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; `output` is stdout followed by stderr.
    #[error("command `{command}` failed ({status}):\n{output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },
}

/// Run `command` through `sh -c` in `cwd` and return its stdout.
pub async fn run_command(
    command: &str,
    cwd: &Path,
    envs: &[(&str, &str)],
) -> Result<String, CommandError> {
    tracing::debug!("running `{}` in {}", command, cwd.display());
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{stdout}{stderr}").trim_end().to_string();
        let status = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        return Err(CommandError::Failed {
            command: command.to_string(),
            status,
            output: combined,
        });
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_stdout() {
        let out = run_command("echo hello", Path::new("."), &[]).await.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn passes_environment() {
        let out = run_command("printf %s \"$GREETING\"", Path::new("."), &[("GREETING", "hi")])
            .await
            .unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn failure_carries_combined_output() {
        let err = run_command("echo out; echo err >&2; exit 3", Path::new("."), &[])
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { status, output, .. } => {
                assert_eq!(status, "exit code 3");
                assert_eq!(output, "out\nerr");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn runs_in_given_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = run_command("pwd", dir.path(), &[]).await.unwrap();
        let got = std::path::PathBuf::from(out.trim()).canonicalize().unwrap();
        assert_eq!(got, dir.path().canonicalize().unwrap());
    }
}
