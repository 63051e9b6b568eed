//! Supervisor - bot lifecycle orchestration
//!
//! The facade a presentation layer (chat bot, CLI, web UI) calls. Owns the
//! process registry behind one async mutex, consults the process table for
//! every status rendering, and wires the spawner, log sink and recovery
//! scan together.

use crate::logsink::LogSink;
use crate::probe::{ProcessTable, SystemProbe};
use crate::reconcile::{self, record_is_live};
use crate::recovery;
use crate::registry::{ProcessRecord, ProcessRegistry};
use crate::spawner;
use crate::unit::{BotState, BotUnit};
use harbor_foundation::{Error, HarborConfig, JsonStore, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Bot status for external queries
#[derive(Debug, Clone)]
pub struct BotStatus {
    pub name: String,
    pub state: BotState,
    pub running: bool,

    /// Present only while presumed running
    pub pid: Option<u32>,

    /// CPU usage of the live process, when measurable
    pub cpu_percent: Option<f32>,

    /// Memory usage of the live process as a share of total memory
    pub mem_percent: Option<f32>,
}

/// One row of a bot listing
#[derive(Debug, Clone)]
pub struct BotSummary {
    pub name: String,
    pub running: bool,
}

/// Bot lifecycle supervisor
#[derive(Clone)]
pub struct Supervisor {
    config: Arc<HarborConfig>,
    bots_dir: PathBuf,
    registry: Arc<Mutex<ProcessRegistry>>,
    table: Arc<dyn ProcessTable>,
    logs: LogSink,
}

impl Supervisor {
    /// Open a supervisor over a data directory with the real process table.
    ///
    /// Loads the registry and reconciles it eagerly: pids recorded by a
    /// previous incarnation whose processes are gone (or were recycled by
    /// the OS) must not be reported as running.
    pub async fn open(data_dir: impl Into<PathBuf>, config: HarborConfig) -> Result<Self> {
        Self::open_with_table(data_dir, config, Arc::new(SystemProbe::new())).await
    }

    /// Open with a custom process table (tests inject a fake one)
    pub async fn open_with_table(
        data_dir: impl Into<PathBuf>,
        config: HarborConfig,
        table: Arc<dyn ProcessTable>,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        let bots_dir = data_dir.join(&config.bots_dir);
        let logs = LogSink::new(data_dir.join(&config.logs_dir));

        std::fs::create_dir_all(&bots_dir)
            .map_err(|e| Error::Storage(format!("Failed to create bots dir: {}", e)))?;
        std::fs::create_dir_all(logs.dir())
            .map_err(|e| Error::Storage(format!("Failed to create logs dir: {}", e)))?;

        let store = JsonStore::new(&data_dir);
        let mut registry = ProcessRegistry::load(store, config.pid_file.as_str());
        reconcile::reconcile(&mut registry, table.as_ref())?;

        Ok(Self {
            config: Arc::new(config),
            bots_dir,
            registry: Arc::new(Mutex::new(registry)),
            table,
            logs,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &HarborConfig {
        &self.config
    }

    // ========================================================================
    // Core operations
    // ========================================================================

    /// Store a script under `name`.
    ///
    /// The name must carry the configured script extension and is used as
    /// a single path component; anything else is an InvalidName. Uploading
    /// over an existing script replaces it without touching a process
    /// already running from the old content.
    pub async fn upload(&self, name: &str, script: &[u8]) -> Result<BotUnit> {
        self.validate_name(name)?;
        let path = self.script_path(name);
        std::fs::write(&path, script)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
        info!("Uploaded {} ({} bytes)", name, script.len());

        let registry = self.registry.lock().await;
        let pid = registry
            .get(name)
            .filter(|record| record_is_live(self.table.as_ref(), record))
            .map(|record| record.pid);
        Ok(BotUnit {
            name: name.to_string(),
            script_path: path,
            log_path: self.logs.log_path(name),
            pid,
        })
    }

    /// Launch the bot's script as a new child process and register its pid.
    ///
    /// Calling start on an already-running bot spawns a second concurrent
    /// instance - current reference behavior, not an invariant. Callers
    /// wanting single-instance semantics must check status first.
    pub async fn start(&self, name: &str) -> Result<u32> {
        self.guard_component(name)?;
        let script = self.script_path(name);
        if !script.is_file() {
            return Err(Error::not_found(format!("no script for {}", name)));
        }

        let log = self.logs.append_target(name)?;
        let pid = spawner::spawn_script(&self.config.interpreter, &script, &log).await?;

        // Identity token: the OS start time of the fresh pid. A child that
        // already exited leaves no token; liveness then degrades to the
        // existence check.
        let started_at = self.table.start_time(pid);
        if started_at.is_none() {
            debug!("No start time for fresh pid {} ({})", pid, name);
        }

        let mut registry = self.registry.lock().await;
        registry.set(name, ProcessRecord::new(pid).with_started_at(started_at))?;
        info!("Started {} as pid {}", name, pid);
        Ok(pid)
    }

    /// Signal the bot's process group and forget its registry entry.
    ///
    /// Best-effort: a failed signal means the group is already gone and is
    /// logged, never surfaced. The entry is removed either way. Does not
    /// wait for the process to actually exit - an immediately following
    /// status may still see it until the OS finishes tearing it down.
    pub async fn stop(&self, name: &str) -> Result<()> {
        self.guard_component(name)?;
        let mut registry = self.registry.lock().await;
        if let Some(record) = registry.get(name) {
            if let Err(e) = spawner::signal_group(record.pid) {
                debug!("Stop {}: treating as already stopped ({})", name, e);
            }
            registry.remove(name)?;
            info!("Stopped {} (pid {})", name, record.pid);
        }
        Ok(())
    }

    /// Stop the bot and remove its script file.
    ///
    /// The log file is kept. Fails with NotFound if the script does not
    /// exist.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.guard_component(name)?;
        let script = self.script_path(name);
        if !script.is_file() {
            return Err(Error::not_found(format!("no script for {}", name)));
        }
        self.stop(name).await?;
        std::fs::remove_file(&script)
            .map_err(|e| Error::Storage(format!("Failed to remove {}: {}", script.display(), e)))?;
        info!("Deleted {}", name);
        Ok(())
    }

    /// Current status of one bot.
    ///
    /// Fails with NotFound once the script is gone. The liveness verdict
    /// is computed against the process table on every call; the registry
    /// itself is not mutated here (use `reconcile` to prune).
    pub async fn status(&self, name: &str) -> Result<BotStatus> {
        self.guard_component(name)?;
        if !self.script_path(name).is_file() {
            return Err(Error::not_found(format!("no script for {}", name)));
        }

        let registry = self.registry.lock().await;
        let live = registry
            .get(name)
            .filter(|record| record_is_live(self.table.as_ref(), record));
        drop(registry);

        match live {
            Some(record) => {
                let metrics = self.table.metrics(record.pid);
                Ok(BotStatus {
                    name: name.to_string(),
                    state: BotState::Running,
                    running: true,
                    pid: Some(record.pid),
                    cpu_percent: metrics.map(|m| m.cpu_percent),
                    mem_percent: metrics.map(|m| m.mem_percent),
                })
            }
            None => Ok(BotStatus {
                name: name.to_string(),
                state: BotState::Stopped,
                running: false,
                pid: None,
                cpu_percent: None,
                mem_percent: None,
            }),
        }
    }

    /// All uploaded bots with their liveness, sorted by name
    pub async fn list(&self) -> Result<Vec<BotSummary>> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.bots_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();

        let registry = self.registry.lock().await;
        Ok(names
            .into_iter()
            .map(|name| {
                let running = registry
                    .get(&name)
                    .map(|record| record_is_live(self.table.as_ref(), &record))
                    .unwrap_or(false);
                BotSummary { name, running }
            })
            .collect())
    }

    /// Last `lines` lines of the bot's log
    pub async fn tail_log(&self, name: &str, lines: usize) -> Result<Vec<String>> {
        self.guard_component(name)?;
        self.logs.tail(name, lines)
    }

    /// Prune registry entries whose process is gone. Returns pruned names.
    pub async fn reconcile(&self) -> Result<Vec<String>> {
        let mut registry = self.registry.lock().await;
        reconcile::reconcile(&mut registry, self.table.as_ref())
    }

    // ========================================================================
    // Failure recovery
    // ========================================================================

    /// Scan the bot's log for an unresolved import.
    ///
    /// A bot without a log yet has nothing to diagnose: Ok(None).
    pub async fn scan_for_missing_module(&self, name: &str) -> Result<Option<String>> {
        self.guard_component(name)?;
        if !self.logs.exists(name) {
            return Ok(None);
        }
        let text = self.logs.read_all(name)?;
        Ok(recovery::scan_missing_module(&text))
    }

    /// Install `module` with the configured command, then restart the bot.
    ///
    /// Single-shot best-effort: an install failure is recorded in the
    /// bot's log and in the supervisor log, and the restart still happens.
    /// Returns the fresh pid.
    pub async fn remediate(&self, name: &str, module: &str) -> Result<u32> {
        self.guard_component(name)?;
        validate_module_name(module)?;

        let mut parts = self.config.install_command.iter();
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("installCommand is empty".to_string()))?;

        self.logs
            .append_event(name, &format!("installing missing module '{}'", module))?;
        info!("Installing missing module '{}' for {}", module, name);

        let output = tokio::process::Command::new(program)
            .args(parts)
            .arg(module)
            .output()
            .await
            .map_err(|e| Error::Spawn(format!("Failed to run installer: {}", e)))?;

        if output.status.success() {
            self.logs
                .append_event(name, &format!("installed '{}', restarting", module))?;
        } else {
            warn!(
                "Installer for '{}' exited with {}; restarting {} anyway",
                module, output.status, name
            );
            self.logs.append_event(
                name,
                &format!("install of '{}' failed ({}), restarting anyway", module, output.status),
            )?;
        }

        self.start(name).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn script_path(&self, name: &str) -> PathBuf {
        self.bots_dir.join(name)
    }

    /// Full upload validation: extension contract plus path-component guard
    fn validate_name(&self, name: &str) -> Result<()> {
        self.guard_component(name)?;
        let ext = &self.config.script_extension;
        if !name.ends_with(ext.as_str()) || name.len() <= ext.len() {
            return Err(Error::invalid_name(
                name,
                format!("expected a {} script", ext),
            ));
        }
        Ok(())
    }

    /// Names are single path components; anything that could traverse out
    /// of the bots/logs directories is rejected.
    fn guard_component(&self, name: &str) -> Result<()> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(Error::invalid_name(name, "not a plain file name"));
        }
        Ok(())
    }
}

/// Module names reach the installer argv; keep them to identifier shape so
/// a crafted name cannot smuggle installer options.
fn validate_module_name(module: &str) -> Result<()> {
    let well_formed = !module.is_empty()
        && module
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(Error::invalid_name(module, "not a module name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn supervisor(dir: &tempfile::TempDir) -> Supervisor {
        let config = HarborConfig::new()
            .with_interpreter("sh")
            .with_script_extension(".sh");
        Supervisor::open(dir.path(), config).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        let err = sup.upload("worker.txt", b"echo hi").await.unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_upload_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        for name in ["../evil.sh", "a/b.sh", "..", ".sh"] {
            let err = sup.upload(name, b"echo hi").await.unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "accepted {}", name);
        }
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;

        let unit = sup.upload("worker.sh", b"sleep 30\n").await.unwrap();
        assert_eq!(unit.name, "worker.sh");
        assert!(unit.pid.is_none());
        assert!(unit.script_path.is_file());

        let listing = sup.list().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "worker.sh");
        assert!(!listing[0].running);
    }

    #[tokio::test]
    async fn test_start_without_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        let err = sup.start("missing.sh").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_without_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        let err = sup.status("missing.sh").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_unknown_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        sup.stop("never-started.sh").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_without_log_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        sup.upload("quiet.sh", b"sleep 30\n").await.unwrap();
        assert_eq!(sup.scan_for_missing_module("quiet.sh").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remediate_rejects_option_shaped_module() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(&dir).await;
        sup.upload("worker.sh", b"sleep 30\n").await.unwrap();
        let err = sup.remediate("worker.sh", "--target=/etc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }
}
