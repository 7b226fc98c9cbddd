//! In-memory memoization for derived declaration facts.
//!
//! [`MemoCell`] is a "compute once, read many" map that never blocks readers:
//! it publishes immutable snapshots through an atomic compare-and-swap and
//! tolerates redundant concurrent computation. [`AttributeCache`] groups one
//! cell per [`AttributeFamily`] so that asking for one flag of a family
//! (e.g. `private`) computes the whole family at once.
//!
//! Nothing here is bounded or persisted: a cache lives exactly as long as the
//! declaration or session that owns it.

#![warn(missing_docs)]

pub mod attribute;
pub mod error;
pub mod memo;

pub use attribute::{exclusive_batch, AttributeCache, AttributeFamily, MODALITY, VISIBILITY};
pub use error::CacheError;
pub use memo::MemoCell;
