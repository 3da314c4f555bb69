//! Error types for graph construction, recomputation and container refresh.

use thiserror::Error;

/// Errors that can occur while building the variable graph or assembling
/// container values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    /// A parent edge would make a variable its own transitive parent.
    ///
    /// Raised at construction/rewiring time, before any mutation is applied.
    /// The graph is rejected, never partially built.
    #[error("dependency cycle through variable '{variable}'")]
    GraphCycle {
        /// Name of the variable the cycle runs through
        variable: String,
    },

    /// Recomputing a deterministic variable's value failed.
    ///
    /// Recoverable: the variable's previously cached value is retained
    /// unmodified, and a failed container refresh leaves the prior snapshot
    /// intact.
    #[error("recomputing variable '{variable}' failed: {reason}")]
    Computation {
        /// Name of the variable whose eval function failed
        variable: String,
        /// Reason reported by the eval function
        reason: String,
    },

    /// A container was constructed over a malformed member collection,
    /// such as duplicate mapping keys or an array whose shape does not
    /// match its data length.
    #[error("malformed container members: {0}")]
    ContainerShape(String),

    /// A position recorded at container construction no longer exists in
    /// the backing collection.
    ///
    /// Indicates the backing collection was mutated in place after
    /// construction, which violates the container usage contract.
    #[error("recorded position {position} no longer exists in the backing collection")]
    IndexOutOfRange {
        /// The missing index or key, rendered as text
        position: String,
    },

    /// Assignment to a variable whose value cannot be set: an observed
    /// stochastic variable, or any deterministic variable.
    #[error("value of variable '{variable}' cannot be assigned: {reason}")]
    ImmutableValue {
        /// Name of the variable
        variable: String,
        /// Why assignment is rejected
        reason: String,
    },

    /// Internal error.
    ///
    /// Indicates an unexpected condition such as a dangling variable id.
    /// This should be used only for programmer errors, not user errors.
    #[error("internal error: {0}")]
    Internal(String),
}
