//! Progress events for instance operations
//!
//! The executor reports each step of an operation through an optional
//! callback. The CLI turns these into spinner updates; library users can
//! ignore them.

use std::time::Duration;

use crate::types::{OperationKind, ResourceId, TargetState};

/// Progress events emitted while an operation runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The dry run passed
    Validated {
        resource: ResourceId,
        kind: OperationKind,
    },
    /// The real call was accepted
    Submitted {
        resource: ResourceId,
        kind: OperationKind,
        attempts: u32,
    },
    /// One poll of the resource state
    Polling {
        resource: ResourceId,
        expected: TargetState,
        observed: String,
        poll: u32,
        max_polls: u32,
        elapsed: Duration,
    },
    /// The target state was observed
    Reached {
        resource: ResourceId,
        state: TargetState,
        polls: u32,
    },
    /// The operation failed
    Failed { resource: ResourceId, error: String },
}

/// Callback type for progress updates
///
/// CLI can use this to update spinners/progress bars.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
