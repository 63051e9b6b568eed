//! Liveness reconciliation against the OS process table
//!
//! Registry entries describe processes that were alive at some point in
//! the past, possibly before a supervisor restart or a machine reboot.
//! Reconciliation prunes the entries whose process no longer exists, so
//! that a reused pid from an unrelated process is not reported as a
//! running bot.

use crate::probe::ProcessTable;
use crate::registry::{ProcessRecord, ProcessRegistry};
use harbor_foundation::Result;
use tracing::info;

/// Whether a registry record still refers to a live process.
///
/// The pid must exist, and when a launch-time start token was captured it
/// must still match the table's start time. A legacy record without a
/// token degrades to the existence check, which can be fooled by pid
/// reuse - that is the reference behavior and is tolerated.
pub fn record_is_live(table: &dyn ProcessTable, record: &ProcessRecord) -> bool {
    if !table.alive(record.pid) {
        return false;
    }
    match record.started_at {
        Some(token) => table.start_time(record.pid) == Some(token),
        None => true,
    }
}

/// Drop every registry entry whose process is gone.
///
/// Idempotent: a second pass with an unchanged process table prunes
/// nothing. Returns the pruned names.
pub fn reconcile(registry: &mut ProcessRegistry, table: &dyn ProcessTable) -> Result<Vec<String>> {
    let pruned = registry.retain(|_, record| record_is_live(table, record))?;
    if !pruned.is_empty() {
        info!("Reconciliation pruned {} stale entries: {:?}", pruned.len(), pruned);
    }
    Ok(pruned)
}
