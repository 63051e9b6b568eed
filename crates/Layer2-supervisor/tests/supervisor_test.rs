//! End-to-end supervision scenarios with real child processes.
//!
//! These drive actual `sh` children, so they are unix-only. The configured
//! extension/interpreter is swapped to `.sh`/`sh`; nothing here needs a
//! Python toolchain.
#![cfg(unix)]

use harbor_foundation::{Error, HarborConfig};
use harbor_supervisor::{ProcessTable, Supervisor, SystemProbe};
use std::time::Duration;

const POLL: Duration = Duration::from_millis(25);
const POLL_ROUNDS: usize = 200;

fn test_config() -> HarborConfig {
    HarborConfig::new()
        .with_interpreter("sh")
        .with_script_extension(".sh")
        .with_install_command(vec!["true".to_string()])
}

async fn open(dir: &tempfile::TempDir) -> Supervisor {
    Supervisor::open(dir.path(), test_config()).await.unwrap()
}

#[tokio::test]
async fn lifecycle_start_status_stop() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    sup.upload("worker.sh", b"sleep 30\n").await.unwrap();

    let pid = sup.start("worker.sh").await.unwrap();
    assert!(pid > 0);

    let status = sup.status("worker.sh").await.unwrap();
    assert!(status.running);
    assert_eq!(status.pid, Some(pid));

    sup.stop("worker.sh").await.unwrap();

    let status = sup.status("worker.sh").await.unwrap();
    assert!(!status.running);
    assert!(status.pid.is_none());

    // reconciliation after stop finds nothing left to prune
    assert!(sup.reconcile().await.unwrap().is_empty());
}

#[tokio::test]
async fn registry_survives_supervisor_restart() {
    let dir = tempfile::tempdir().unwrap();

    let pid = {
        let sup = open(&dir).await;
        sup.upload("worker.sh", b"sleep 30\n").await.unwrap();
        sup.start("worker.sh").await.unwrap()
    };

    // A fresh supervisor over the same data dir must rediscover the bot
    // with its prior pid - the file is the only carrier.
    let sup = open(&dir).await;
    let status = sup.status("worker.sh").await.unwrap();
    assert!(status.running);
    assert_eq!(status.pid, Some(pid));

    sup.stop("worker.sh").await.unwrap();
}

#[tokio::test]
async fn self_exited_bot_is_pruned_by_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    sup.upload("oneshot.sh", b"echo done\n").await.unwrap();
    sup.start("oneshot.sh").await.unwrap();

    // The child exits on its own; once the OS forgets the pid the entry
    // must reconcile away and the bot reads as stopped.
    let mut stopped = false;
    for _ in 0..POLL_ROUNDS {
        sup.reconcile().await.unwrap();
        if !sup.status("oneshot.sh").await.unwrap().running {
            stopped = true;
            break;
        }
        tokio::time::sleep(POLL).await;
    }
    assert!(stopped, "oneshot.sh never left the process table");

    let listing = sup.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert!(!listing[0].running);
}

#[tokio::test]
async fn ghost_registry_entry_is_pruned_at_open() {
    let dir = tempfile::tempdir().unwrap();

    std::fs::create_dir_all(dir.path().join("bots")).unwrap();
    std::fs::write(dir.path().join("bots/ghost.sh"), "sleep 30\n").unwrap();
    // Legacy bare-pid shape pointing at a pid that cannot exist
    std::fs::write(dir.path().join("pids.json"), r#"{"ghost.sh": 999999999}"#).unwrap();

    let sup = open(&dir).await;

    let listing = sup.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "ghost.sh");
    assert!(!listing[0].running);

    // The prune was persisted at open
    let text = std::fs::read_to_string(dir.path().join("pids.json")).unwrap();
    assert!(!text.contains("ghost.sh"));
}

#[tokio::test]
async fn corrupt_registry_recovers_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pids.json"), "{definitely not json").unwrap();

    let sup = open(&dir).await;
    assert!(sup.list().await.unwrap().is_empty());

    // and the supervisor is fully usable afterwards
    sup.upload("worker.sh", b"sleep 30\n").await.unwrap();
    let pid = sup.start("worker.sh").await.unwrap();
    assert!(pid > 0);
    sup.stop("worker.sh").await.unwrap();
}

#[tokio::test]
async fn tail_returns_at_most_n_lines() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    sup.upload("chatty.sh", b"echo line1\necho line2\necho line3\n")
        .await
        .unwrap();

    // No log before the first start
    let err = sup.tail_log("chatty.sh", 20).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    sup.start("chatty.sh").await.unwrap();

    let mut flushed = false;
    for _ in 0..POLL_ROUNDS {
        if matches!(sup.tail_log("chatty.sh", 100).await, Ok(lines) if lines.len() >= 3) {
            flushed = true;
            break;
        }
        tokio::time::sleep(POLL).await;
    }
    assert!(flushed, "chatty.sh never flushed three lines");

    let tail = sup.tail_log("chatty.sh", 2).await.unwrap();
    assert_eq!(tail, vec!["line2", "line3"]);

    let all = sup.tail_log("chatty.sh", 100).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn delete_makes_bot_absent() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    sup.upload("worker.sh", b"sleep 30\n").await.unwrap();
    sup.start("worker.sh").await.unwrap();
    sup.delete("worker.sh").await.unwrap();

    assert!(matches!(
        sup.start("worker.sh").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        sup.status("worker.sh").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(sup.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn stop_terminates_the_whole_group() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    // sh waits on a sleep child; both live in the bot's process group
    sup.upload("nested.sh", b"sleep 30\nsleep 30\n").await.unwrap();
    let pid = sup.start("nested.sh").await.unwrap();

    sup.stop("nested.sh").await.unwrap();

    // The group leader must leave the process table, not linger because
    // only a descendant was signaled.
    let probe = SystemProbe::new();
    let mut gone = false;
    for _ in 0..POLL_ROUNDS {
        if !probe.alive(pid) {
            gone = true;
            break;
        }
        tokio::time::sleep(POLL).await;
    }
    assert!(gone, "group leader survived the group signal");
}

#[tokio::test]
async fn second_start_spawns_second_instance() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    sup.upload("twice.sh", b"sleep 3\n").await.unwrap();
    let first = sup.start("twice.sh").await.unwrap();
    let second = sup.start("twice.sh").await.unwrap();

    // Reference policy: no refusal, the registry now tracks the second
    assert_ne!(first, second);
    let status = sup.status("twice.sh").await.unwrap();
    assert_eq!(status.pid, Some(second));

    sup.stop("twice.sh").await.unwrap();
    // first instance exits on its own after the short sleep
}

#[tokio::test]
async fn missing_module_scan_and_remediation() {
    let dir = tempfile::tempdir().unwrap();
    let sup = open(&dir).await;

    let script = b"echo \"ModuleNotFoundError: No module named 'requests'\" >&2\nexit 1\n";
    sup.upload("broken.sh", &script[..]).await.unwrap();
    let first = sup.start("broken.sh").await.unwrap();

    let mut module = None;
    for _ in 0..POLL_ROUNDS {
        module = sup.scan_for_missing_module("broken.sh").await.unwrap();
        if module.is_some() {
            break;
        }
        tokio::time::sleep(POLL).await;
    }
    assert_eq!(module.as_deref(), Some("requests"));

    // Installer is `true` in the test config; remediation restarts the bot
    let fresh = sup.remediate("broken.sh", "requests").await.unwrap();
    assert_ne!(fresh, first);

    // The attempt is visible in the bot's own log
    let lines = sup.tail_log("broken.sh", 50).await.unwrap();
    assert!(lines
        .iter()
        .any(|line| line.contains("installing missing module 'requests'")));

    sup.stop("broken.sh").await.unwrap();
}
