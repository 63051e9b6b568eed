//! # harbor-supervisor
//!
//! Process supervision core for BotHarbor.
//! Tracks uploaded scripts as independent child processes, persists their
//! pids across supervisor restarts, and reconciles persisted state against
//! the live OS process table.
//!
//! ## Features
//!
//! - Durable name -> pid registry (atomic saves, crash safe)
//! - Eager and on-demand liveness reconciliation with pid-reuse detection
//! - Process-group launch/termination (setsid + group SIGTERM)
//! - Per-bot append-only log capture with tail access
//! - Best-effort missing-dependency remediation (install + restart)

pub mod logsink;
pub mod probe;
pub mod reconcile;
pub mod recovery;
pub mod registry;
pub mod spawner;
pub mod supervisor;
pub mod unit;

// Supervision core
pub use supervisor::{BotStatus, BotSummary, Supervisor};
pub use unit::{BotState, BotUnit};

// Registry
pub use registry::{ProcessRecord, ProcessRegistry};

// Process table
pub use probe::{ProcessMetrics, ProcessTable, SystemProbe};

// Reconciliation
pub use reconcile::{reconcile, record_is_live};

// Logs
pub use logsink::LogSink;

// Recovery
pub use recovery::scan_missing_module;
