//! Child process launch and process-group signaling
//!
//! Every bot runs as the leader of its own session, so stopping a bot can
//! signal the entire group including any descendants it spawned. Output
//! streams append straight onto the bot's log file; the supervisor never
//! sits between the child and its log.

use harbor_foundation::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Launch `interpreter script` detached into its own process group.
///
/// Fire-and-forget: this returns as soon as the pid is known. A detached
/// task reaps the child when it eventually exits; nobody waits for any
/// readiness state. The log handle is duplicated for stdout and stderr,
/// both in append mode.
pub async fn spawn_script(
    interpreter: &str,
    script: &Path,
    log: &std::fs::File,
) -> Result<u32> {
    let stdout = log
        .try_clone()
        .map_err(|e| Error::Spawn(format!("Failed to clone log handle: {}", e)))?;
    let stderr = log
        .try_clone()
        .map_err(|e| Error::Spawn(format!("Failed to clone log handle: {}", e)))?;

    let mut cmd = Command::new(interpreter);
    cmd.arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            // New session: the child becomes its own process-group leader,
            // so kill(-pid) later reaches the whole tree.
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Spawn(format!("Failed to spawn {}: {}", script.display(), e)))?;

    let pid = child
        .id()
        .ok_or_else(|| Error::Spawn(format!("{} exited before pid capture", script.display())))?;

    debug!("Spawned {} as pid {}", script.display(), pid);

    // Reap the child when it exits so it never lingers as a zombie while
    // the supervisor is alive. The child is not killed on drop; it
    // outlives the supervisor by design.
    tokio::spawn(async move {
        let _ = child.wait().await;
    });

    Ok(pid)
}

/// Send SIGTERM to the process group rooted at `pid`.
///
/// The caller decides what a delivery failure means; `stop` swallows it
/// because an already-gone group is indistinguishable from a stopped one.
#[cfg(unix)]
pub fn signal_group(pid: u32) -> Result<()> {
    let rc = unsafe { libc::kill(-(pid as i32), libc::SIGTERM) };
    if rc == -1 {
        return Err(Error::Signal(format!(
            "SIGTERM to group {}: {}",
            pid,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn signal_group(pid: u32) -> Result<()> {
    Err(Error::Signal(format!(
        "process groups are not supported on this platform (pid {})",
        pid
    )))
}
