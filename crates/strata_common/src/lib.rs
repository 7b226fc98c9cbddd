//! Shared foundational types used across the Strata analysis core.
//!
//! This crate provides interned identifiers, content hashing, source spans,
//! and dense ID-indexed arenas.

#![warn(missing_docs)]

pub mod arena;
pub mod hash;
pub mod ident;
pub mod span;

pub use arena::{Arena, ArenaId};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use span::{FileId, Span};
