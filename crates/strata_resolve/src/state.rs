//! Per-declaration resolution state.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use strata_common::{Ident, Span};

use crate::attributes::DeclarationAttributes;
use crate::decl::{DeclarationId, Modality, TypeName, Visibility};
use crate::phase::{AtomicPhase, Phase};

/// What an import resolved to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ImportTarget {
    /// A module visible from the session's module.
    Module(Ident),
    /// A package the platform imports by default.
    DefaultPackage,
    /// Nothing visible has this name.
    Unresolved,
}

/// One import of a file after resolution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ResolvedImport {
    /// The imported name.
    pub path: Ident,
    /// Where the import is written; dummy for implicit default imports.
    pub span: Span,
    /// The resolution result.
    pub target: ImportTarget,
}

/// A bound supertype reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SupertypeRef {
    /// A class or type alias of the same session.
    Local(DeclarationId),
    /// A declaration exported by a visible module.
    External {
        /// The exporting module.
        module: Ident,
        /// The exported name.
        name: Ident,
    },
    /// Nothing visible has this name.
    Unresolved(TypeName),
}

/// A resolved type position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ResolvedType {
    /// A type written explicitly.
    Named(Ident),
    /// No type was written; it is inferred from the body.
    Implicit,
}

/// Everything the phase resolvers have computed for one declaration.
///
/// Each field is written by exactly one phase. A field is meaningful only
/// once the declaration has reached that phase. If any resolver of a phase
/// fails, the state is rolled back to what it was before the phase started,
/// so a retry never sees a half-applied phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedState {
    /// [`Phase::Imports`]: imports of the declaration's file, including the
    /// platform's default imports.
    pub imports: Arc<Vec<ResolvedImport>>,
    /// [`Phase::Supertypes`]: bound supertypes of a class.
    pub supertypes: Vec<SupertypeRef>,
    /// [`Phase::Status`]: effective visibility.
    pub visibility: Option<Visibility>,
    /// [`Phase::Status`]: effective modality.
    pub modality: Option<Modality>,
    /// [`Phase::Types`]: parameter types followed by the result type.
    pub types: Vec<ResolvedType>,
    /// [`Phase::Contracts`]: the declaration carries a contract.
    pub has_contract: bool,
    /// [`Phase::Body`]: the body is resolved.
    pub body_resolved: bool,
}

/// The failure recorded when a phase resolver fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseFailure {
    /// The phase that failed.
    pub phase: Phase,
    /// The resolver's message.
    pub message: String,
}

/// Mutable bookkeeping of one declaration. Only the session touches it.
#[derive(Default)]
pub(crate) struct DeclarationSlot {
    pub(crate) phase: AtomicPhase,
    lock: Mutex<()>,
    failure: Mutex<Option<PhaseFailure>>,
    state: RwLock<ResolvedState>,
    pub(crate) attributes: OnceLock<DeclarationAttributes>,
}

impl DeclarationSlot {
    /// Acquires the declaration's advancement lock. A resolver that panicked
    /// never published its phase, so a poisoned lock is safe to reuse.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn failure(&self) -> Option<PhaseFailure> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_failure(&self, failure: Option<PhaseFailure>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = failure;
    }

    pub(crate) fn snapshot(&self) -> ResolvedState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn restore(&self, state: ResolvedState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut ResolvedState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slot_is_raw_and_clean() {
        let slot = DeclarationSlot::default();
        assert_eq!(slot.phase.load(), Phase::Raw);
        assert_eq!(slot.failure(), None);
        assert_eq!(slot.snapshot(), ResolvedState::default());
    }

    #[test]
    fn update_is_visible_in_snapshot() {
        let slot = DeclarationSlot::default();
        slot.update(|state| state.has_contract = true);
        assert!(slot.snapshot().has_contract);
    }

    #[test]
    fn restore_replaces_partial_writes() {
        let slot = DeclarationSlot::default();
        let before = slot.snapshot();
        slot.update(|state| state.body_resolved = true);
        slot.restore(before);
        assert_eq!(slot.snapshot(), ResolvedState::default());
    }

    #[test]
    fn failure_can_be_cleared() {
        let slot = DeclarationSlot::default();
        slot.set_failure(Some(PhaseFailure {
            phase: Phase::Types,
            message: "boom".into(),
        }));
        assert_eq!(slot.failure().map(|f| f.phase), Some(Phase::Types));
        slot.set_failure(None);
        assert_eq!(slot.failure(), None);
    }
}
