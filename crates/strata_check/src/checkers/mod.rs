//! Built-in checker implementations.
//!
//! This module re-exports the individual checkers and provides
//! `register_builtin_checkers` to add them to a `CheckerEngine`.

mod e101;
mod e102;
mod w201;
mod w202;

pub use e101::UnresolvedSupertype;
pub use e102::AbstractMemberInFinalClass;
pub use w201::PrivateAbstractMember;
pub use w202::UnresolvedImport;

use crate::CheckerEngine;

/// Registers the four built-in checkers with the engine.
pub fn register_builtin_checkers(engine: &mut CheckerEngine) {
    engine.register(Box::new(UnresolvedSupertype));
    engine.register(Box::new(AbstractMemberInFinalClass));
    engine.register(Box::new(PrivateAbstractMember));
    engine.register(Box::new(UnresolvedImport));
}
