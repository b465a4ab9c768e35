//! Process-backed tool runner

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::{preview, Invocation, ToolOutput, ToolRunner};
use crate::error::ToolError;

const READ_CHUNK: usize = 8192;

/// Runs tools as child processes with a deadline and bounded output capture
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

enum Capture {
    Overflow,
    Io(std::io::Error),
}

impl From<std::io::Error> for Capture {
    fn from(err: std::io::Error) -> Self {
        Capture::Io(err)
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program.clone();
        let started = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers the tool starts die with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        tracing::debug!(program = %program, pid = ?child.id(), "Spawned tool");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = invocation.max_output_bytes;

        let outcome = tokio::time::timeout(invocation.timeout, async {
            let (stdout, stderr) =
                tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
            let status = child.wait().await?;
            Ok::<_, Capture>((status, stdout, stderr))
        })
        .await;

        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                let output = ToolOutput { stdout, stderr };
                let stderr_text = output.stderr_lossy();
                tracing::debug!(
                    program = %program,
                    status = %status,
                    elapsed = ?started.elapsed(),
                    stdout = preview(&output.stdout_lossy(), 2000),
                    stderr = preview(&stderr_text, 2000),
                    "Tool finished"
                );
                if status.success() {
                    Ok(output)
                } else {
                    Err(ToolError::Exited {
                        program,
                        status: status.to_string(),
                        stderr: stderr_text,
                    })
                }
            }
            Ok(Err(Capture::Overflow)) => {
                terminate(&mut child, &program).await;
                Err(ToolError::OutputTooLarge { program, limit })
            }
            Ok(Err(Capture::Io(source))) => {
                terminate(&mut child, &program).await;
                Err(ToolError::Io { program, source })
            }
            Err(_elapsed) => {
                terminate(&mut child, &program).await;
                Err(ToolError::Timeout {
                    program,
                    limit: invocation.timeout,
                })
            }
        }
    }
}

/// Read a pipe to EOF, failing once more than `limit` bytes arrive
async fn read_capped<R>(reader: Option<R>, limit: usize) -> Result<Vec<u8>, Capture>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(Capture::Overflow);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Kill the child's process group and reap the child
async fn terminate(child: &mut Child, program: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::debug!(program, pid, "Killing process group failed: {}", e);
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!(program, "Kill failed (process may have exited): {}", e);
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(program, "Failed to reap killed process: {}", e);
    }
}
