//! Error taxonomy for the scheduler.
//!
//! Build-time failures ([`BuildError`]) abort scene/timeline construction
//! entirely and retain no partial state. Evaluate-time failures
//! ([`EvalError`]) abort only the current frame; gate and resource state
//! stay untouched so the operation can be retried on a later frame.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::scene::NodeId;

/// Fatal error while building timelines, scenes, or the gate tree.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Growing interval or tree storage failed.
    #[error("allocation failed while growing {what}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// A declared range, config value, or scene wiring is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failure reported by a node's `prefetch`/`release` hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResourceError(pub String);

/// Error surfaced by per-frame evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A resource lifecycle hook failed; the frame is aborted and the
    /// affected node keeps its previous resource state.
    #[error("{op} failed for node {node:?}: {source}")]
    Resource {
        node: NodeId,
        op: &'static str,
        #[source]
        source: ResourceError,
    },
}

/// Reserve room for `additional` more elements, mapping the failure into
/// [`BuildError::Allocation`].
pub(crate) fn try_grow<T>(
    vec: &mut Vec<T>,
    additional: usize,
    what: &'static str,
) -> Result<(), BuildError> {
    vec.try_reserve(additional)
        .map_err(|source| BuildError::Allocation { what, source })
}
