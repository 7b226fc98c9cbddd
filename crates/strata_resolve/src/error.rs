//! Error types for declaration resolution.

use crate::phase::Phase;

/// Errors raised by a [`ResolutionSession`](crate::ResolutionSession) and its
/// builder.
///
/// Errors about one declaration never change the state of another one.
/// Errors about the session itself (missing services, invalidated project)
/// abort the whole operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A service was registered twice under the same type.
    #[error("service {0} is already registered")]
    DuplicateRegistration(&'static str),

    /// A service was requested that is neither registered nor lazily
    /// constructible.
    #[error("service {0} is not registered")]
    ServiceNotFound(&'static str),

    /// A phase resolver failed. The declaration stays at its last good phase.
    #[error("resolving {declaration} to {phase} failed: {message}")]
    PhaseResolutionFailure {
        /// Name of the declaration being resolved.
        declaration: String,
        /// The phase that could not be completed.
        phase: Phase,
        /// The resolver's explanation.
        message: String,
    },

    /// The declaration is already being resolved further up the current
    /// thread's stack.
    #[error("cyclic resolution of {declaration} while advancing it to {phase}")]
    CyclicResolution {
        /// Name of the declaration that was re-entered.
        declaration: String,
        /// The phase requested by the re-entrant call.
        phase: Phase,
    },

    /// No declaration with this index exists in the session.
    #[error("unknown declaration #{0}")]
    UnknownDeclaration(u32),

    /// No source file with this id belongs to the session.
    #[error("unknown source file #{0}")]
    UnknownFile(u32),

    /// The project snapshot backing the session was invalidated.
    #[error("session for module '{0}' belongs to an invalidated project snapshot")]
    SessionInvalidated(String),
}
