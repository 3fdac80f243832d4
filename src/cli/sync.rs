//! taskvault sync command implementation
//!
//! Holds the vault lock like the other writers, so a `sync` cannot replace
//! the dashboard with counts taken in the middle of a running cycle.

use crate::cli::VaultContext;
use crate::cycle::sync_dashboard;
use crate::error::Result;
use crate::lock::VaultLock;
use crate::output::{emit, OutputOptions};

pub fn run(context: VaultContext, output: OutputOptions) -> Result<()> {
    let _lock = VaultLock::acquire(context.vault.root())?;
    let report = sync_dashboard(&context.store, &context.dashboard)?;
    emit(output, "sync", &report)
}
