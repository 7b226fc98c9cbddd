//! Error types for memoization.

/// Errors returned by [`MemoCell`](crate::MemoCell) and
/// [`AttributeCache`](crate::AttributeCache).
///
/// None of these errors is cached: a failed key stays absent from the
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The filler returned a batch that does not contain the requested key.
    /// This is a contract violation of the filler and is never retried.
    #[error("inconsistent computation: batch computed for {key} does not contain it")]
    InconsistentComputation {
        /// Debug rendering of the requested key.
        key: String,
    },

    /// A fallible filler could not compute the batch.
    #[error("computation of {key} failed: {reason}")]
    ComputationFailed {
        /// Debug rendering of the requested key.
        key: String,
        /// Why the filler failed.
        reason: String,
    },

    /// No cell is registered for the attribute family.
    #[error("unknown attribute family '{0}'")]
    UnknownFamily(String),

    /// The attribute is not a member of the family.
    #[error("'{name}' is not an attribute of family '{family}'")]
    UnknownAttribute {
        /// The family that was queried.
        family: String,
        /// The unknown attribute name.
        name: String,
    },
}
