use std::process::Stdio;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};

use super::{ChildCommand, ChildExitOutcome, ChildRunner, LaunchError};

/// Upper bound on the stderr text kept per invocation. The stream is always
/// drained to the end; only the trailing bytes are retained.
pub const MAX_STDERR_BYTES: usize = 64 * 1024;

/// Spawns real OS processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ChildRunner for ProcessRunner {
    async fn run(&self, command: &ChildCommand) -> ChildExitOutcome {
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Aborting the supervision task drops this future; the child must die with it.
            .kill_on_drop(true);
        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ChildExitOutcome::launch_failed(LaunchError::from_io(command.program(), &e))
            }
        };
        tracing::debug!(program = %command.program().display(), pid = ?child.id(), "child started");

        let stderr = child.stderr.take();
        let drain = async move {
            match stderr {
                Some(stream) => drain_tail(stream, MAX_STDERR_BYTES).await,
                None => Vec::new(),
            }
        };
        let (status, captured) = tokio::join!(child.wait(), drain);
        let mut stderr = String::from_utf8_lossy(&captured).into_owned();

        match status {
            Ok(status) => ChildExitOutcome::exited(status.code(), stderr),
            Err(e) => {
                stderr.push_str(&format!("\nfailed to wait for child: {e}"));
                ChildExitOutcome::exited(None, stderr)
            }
        }
    }
}

/// Reads `reader` to the end, keeping at most the last `limit` bytes.
///
/// When the front was cut, the result starts at a UTF-8 character boundary.
async fn drain_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8 * 1024];
    let mut truncated = false;
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > limit {
                    let excess = kept.len() - limit;
                    kept.drain(..excess);
                    truncated = true;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading child stderr");
                break;
            }
        }
    }
    if truncated {
        let continuation = kept.iter().take_while(|&&b| is_continuation(b)).count();
        kept.drain(..continuation);
    }
    kept
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}
