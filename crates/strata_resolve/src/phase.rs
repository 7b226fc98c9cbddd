//! The phase lattice every declaration moves through.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// A semantic resolution phase. Phases are totally ordered and a declaration
/// only ever moves forward through them, one step at a time.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Phase {
    /// Nothing beyond the raw declaration is known.
    Raw = 0,
    /// The imports of the declaration's file are resolved.
    Imports = 1,
    /// Supertype references are bound.
    Supertypes = 2,
    /// Visibility and modality are decided.
    Status = 3,
    /// Declared and implicit types are known.
    Types = 4,
    /// Contracts are recorded.
    Contracts = 5,
    /// The body is resolved. Terminal.
    Body = 6,
}

impl Phase {
    /// Every phase in lattice order.
    pub const ALL: [Phase; 7] = [
        Phase::Raw,
        Phase::Imports,
        Phase::Supertypes,
        Phase::Status,
        Phase::Types,
        Phase::Contracts,
        Phase::Body,
    ];

    /// Returns the phase after this one, or `None` for [`Phase::Body`].
    pub fn next(self) -> Option<Phase> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// Returns the lowercase name of the phase.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Raw => "raw",
            Phase::Imports => "imports",
            Phase::Supertypes => "supertypes",
            Phase::Status => "status",
            Phase::Types => "types",
            Phase::Contracts => "contracts",
            Phase::Body => "body",
        }
    }

    fn from_u8(raw: u8) -> Phase {
        Self::ALL.get(raw as usize).copied().unwrap_or(Phase::Body)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A phase stored in an atomic so it can be read without the declaration's
/// lock. Stores use release ordering and loads use acquire ordering, so state
/// written before a phase is published is visible to anyone who observes it.
#[derive(Debug, Default)]
pub(crate) struct AtomicPhase(AtomicU8);

impl AtomicPhase {
    pub(crate) fn load(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}
