//! Reconciliation: making the replica an exact copy of the source
//!
//! This module provides:
//! - **plan**: the pure per-directory decision over two snapshots
//! - **engine**: the recursive walk that applies those decisions
//! - **result**: per-pass counts and failures

mod engine;
mod plan;
mod result;

pub use engine::{Reconcile, ReconcileOptions, ReconciliationEngine};
pub use plan::{Action, plan_level};
pub use result::{Failure, FailureKind, ReconciliationResult};
