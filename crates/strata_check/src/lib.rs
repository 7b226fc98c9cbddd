//! Diagnostic collection over resolved declarations.
//!
//! [`DiagnosticCollector`] walks the semantic element tree of a file,
//! resolves each element to its final phase, and runs every enabled
//! [`DeclarationChecker`] on it. The tree shares nodes (a generated accessor
//! refers back to its property), so the walk deduplicates elements and a
//! [`TraversalGuard`] verifies afterwards that every element was diagnosed
//! exactly once.
//!
//! # Built-in checks
//!
//! - **E101** `unresolved-supertype`
//! - **E102** `abstract-member-in-final-class`
//! - **W201** `private-abstract-member`
//! - **W202** `unresolved-import`
//!
//! Internal problems of the pass itself are reported as **I900** (traversal
//! invariant violated) and **I901** (an element could not be resolved).

#![warn(missing_docs)]

mod checkers;
mod collector;
mod element;
mod engine;
mod guard;

pub use checkers::{
    register_builtin_checkers, AbstractMemberInFinalClass, PrivateAbstractMember,
    UnresolvedImport, UnresolvedSupertype,
};
pub use collector::{DiagnosticCollector, RESOLUTION_FAILURE, TRAVERSAL_VIOLATION};
pub use element::{ElementId, SemanticElement};
pub use engine::CheckerEngine;
pub use guard::{TraversalGuard, TraversalInvariantViolation};

use strata_common::Span;
use strata_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use strata_resolve::{Declaration, ResolutionSession, ResolvedState, SourceFile};

/// What a checker sees for one declaration. The declaration has been
/// resolved to its final phase.
pub struct CheckContext<'a> {
    /// The session owning the declaration.
    pub session: &'a ResolutionSession,
    /// The declaration under check.
    pub declaration: &'a Declaration,
    /// Everything resolved for it.
    pub state: &'a ResolvedState,
}

/// A single check run on every declaration, and optionally once per file.
///
/// Each checker has a unique diagnostic code, a kebab-case name used by the
/// `[checks]` configuration, a description, and a default severity.
pub trait DeclarationChecker: Send + Sync {
    /// Returns the diagnostic code for this check (e.g., E101).
    fn code(&self) -> DiagnosticCode;

    /// Returns the short kebab-case name of this check.
    fn name(&self) -> &str;

    /// Returns a human-readable description of what this check finds.
    fn description(&self) -> &str;

    /// Returns the default severity for diagnostics emitted by this check.
    fn default_severity(&self) -> Severity;

    /// Creates a diagnostic with this check's code and default severity.
    /// The engine promotes it to an error afterwards if the check is denied.
    fn diagnostic(&self, message: impl Into<String>, span: Span) -> Diagnostic
    where
        Self: Sized,
    {
        Diagnostic::new(self.default_severity(), self.code(), message, span)
    }

    /// Checks one declaration.
    fn check_declaration(&self, _cx: &CheckContext<'_>, _sink: &DiagnosticSink) {}

    /// Checks file-level facts such as imports.
    fn check_file(
        &self,
        _session: &ResolutionSession,
        _file: &SourceFile,
        _sink: &DiagnosticSink,
    ) {
    }
}
