//! Per-file diagnostic passes with an exactly-once guarantee.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use strata_common::{FileId, Span};
use strata_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use strata_resolve::{Phase, ResolutionSession, ResolveError};

use crate::element::{ElementId, SemanticElement};
use crate::engine::CheckerEngine;
use crate::guard::{TraversalGuard, TraversalInvariantViolation};
use crate::CheckContext;

/// I900: a diagnostic pass did not visit every element exactly once.
pub const TRAVERSAL_VIOLATION: DiagnosticCode = DiagnosticCode::new(Category::Internal, 900);

/// I901: an element could not be resolved far enough to be checked.
pub const RESOLUTION_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Internal, 901);

/// Walks files, resolves their elements and runs the checker engine on each
/// element exactly once.
pub struct DiagnosticCollector {
    engine: CheckerEngine,
}

impl DiagnosticCollector {
    /// Creates a collector running `engine`.
    pub fn new(engine: CheckerEngine) -> Self {
        Self { engine }
    }

    /// Creates a collector with the built-in checkers and default settings.
    pub fn with_defaults() -> Self {
        Self::new(CheckerEngine::with_defaults())
    }

    /// Returns the checker engine.
    pub fn engine(&self) -> &CheckerEngine {
        &self.engine
    }

    /// Diagnoses every element of `file`.
    ///
    /// Elements are reached through containment and through shared
    /// references; each one is diagnosed the first time it is reached. A
    /// fresh [`TraversalGuard`] counts the visits and is returned so callers
    /// can inspect it. If the analysis configuration asks for it, the guard
    /// is verified and a violation is reported as an I900 diagnostic.
    pub fn collect_file(
        &self,
        session: &ResolutionSession,
        file: FileId,
        sink: &DiagnosticSink,
    ) -> Result<TraversalGuard, ResolveError> {
        let source = session.source_file(file)?;
        let mut guard = TraversalGuard::new();
        guard.expect_all(
            session
                .declarations_in(file)
                .map(|d| ElementId::Declaration(d.id)),
        );

        let mut seen: FxHashSet<ElementId> = FxHashSet::default();
        let mut stack: Vec<ElementId> = source
            .declarations
            .iter()
            .rev()
            .map(|id| ElementId::Declaration(*id))
            .collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let element = SemanticElement::new(session, id)?;
            guard.before_visit(id);
            self.check_element(session, &element, sink);
            stack.extend(
                element
                    .reachable()
                    .into_iter()
                    .rev()
                    .filter(|next| !seen.contains(next)),
            );
        }

        self.engine.check_file(session, source, sink);
        if session.config().verify_traversal {
            if let Err(violation) = guard.verify() {
                report_violation(&violation, file, &source.path, sink);
            }
        }
        tracing::debug!(
            path = %source.path,
            elements = seen.len(),
            "collected file diagnostics"
        );
        Ok(guard)
    }

    /// Diagnoses every file of the session, one guard per file, on the rayon
    /// pool when the analysis configuration allows it.
    pub fn collect_module(
        &self,
        session: &ResolutionSession,
        sink: &DiagnosticSink,
    ) -> Result<(), ResolveError> {
        let files: Vec<FileId> = session.source_units().iter().map(|f| f.file).collect();
        let collect = |file: FileId| self.collect_file(session, file, sink).map(drop);
        if session.config().parallel {
            files.into_par_iter().try_for_each(collect)
        } else {
            files.into_iter().try_for_each(collect)
        }
    }

    fn check_element(
        &self,
        session: &ResolutionSession,
        element: &SemanticElement<'_>,
        sink: &DiagnosticSink,
    ) {
        let declaration = element.declaration();
        let resolved = session
            .resolve_to(declaration.id, Phase::Body)
            .and_then(|()| session.resolved(declaration.id));
        match resolved {
            Ok(state) => {
                let cx = CheckContext {
                    session,
                    declaration,
                    state: &state,
                };
                self.engine.check_declaration(&cx, sink);
            }
            Err(err) => sink.emit(
                Diagnostic::error(
                    RESOLUTION_FAILURE,
                    format!("'{}' could not be checked", session.name_of(declaration)),
                    declaration.span,
                )
                .with_note(err.to_string()),
            ),
        }
    }
}

/// Reports a traversal invariant violation as an internal error instead of
/// aborting the analysis.
pub(crate) fn report_violation(
    violation: &TraversalInvariantViolation,
    file: FileId,
    path: &str,
    sink: &DiagnosticSink,
) {
    tracing::error!(
        path,
        missed = violation.missed.len(),
        duplicated = violation.duplicated.len(),
        "diagnostic traversal invariant violated"
    );
    sink.emit(
        Diagnostic::error(
            TRAVERSAL_VIOLATION,
            format!("internal error while checking {path}: {violation}"),
            Span::new(file, 0, 0),
        )
        .with_note(violation.details()),
    );
}
