//! Checker engine that manages registration, configuration, and execution.
//!
//! The `CheckerEngine` accepts a `CheckConfig` to control which checks are
//! denied or allowed, then runs each enabled checker on the declarations and
//! files handed to it by the collector.

use rustc_hash::FxHashSet;
use strata_config::CheckConfig;
use strata_diagnostics::{DiagnosticSink, Severity};
use strata_resolve::{ResolutionSession, SourceFile};

use crate::checkers::register_builtin_checkers;
use crate::{CheckContext, DeclarationChecker};

/// Runs the registered checkers with configured severities.
///
/// Checks named in `deny` are promoted to errors and checks named in `allow`
/// are not run at all.
pub struct CheckerEngine {
    checkers: Vec<Box<dyn DeclarationChecker>>,
    denied: FxHashSet<String>,
    allowed: FxHashSet<String>,
}

impl CheckerEngine {
    /// Creates an engine with every built-in checker registered.
    pub fn new(config: &CheckConfig) -> Self {
        let mut engine = Self {
            checkers: Vec::new(),
            denied: config.deny.iter().cloned().collect(),
            allowed: config.allow.iter().cloned().collect(),
        };
        register_builtin_checkers(&mut engine);
        engine
    }

    /// Creates an engine with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(&CheckConfig::default())
    }

    /// Registers a checker.
    pub fn register(&mut self, checker: Box<dyn DeclarationChecker>) {
        tracing::debug!(
            check = checker.name(),
            code = %checker.code(),
            description = checker.description(),
            "registered checker"
        );
        self.checkers.push(checker);
    }

    /// Returns the number of registered checkers.
    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }

    /// Returns the names of all registered checkers.
    pub fn checker_names(&self) -> Vec<&str> {
        self.checkers.iter().map(|c| c.name()).collect()
    }

    /// Runs every enabled checker on one resolved declaration.
    pub fn check_declaration(&self, cx: &CheckContext<'_>, sink: &DiagnosticSink) {
        self.run(sink, |checker, temp| checker.check_declaration(cx, temp));
    }

    /// Runs every enabled checker's file-level check.
    pub fn check_file(
        &self,
        session: &ResolutionSession,
        file: &SourceFile,
        sink: &DiagnosticSink,
    ) {
        self.run(sink, |checker, temp| checker.check_file(session, file, temp));
    }

    fn run(
        &self,
        sink: &DiagnosticSink,
        check: impl Fn(&dyn DeclarationChecker, &DiagnosticSink),
    ) {
        for checker in &self.checkers {
            let name = checker.name();
            if self.allowed.contains(name) {
                continue;
            }

            // Capture into a temporary sink so denied checks can be promoted.
            let temp = DiagnosticSink::new();
            check(checker.as_ref(), &temp);

            let denied = self.denied.contains(name);
            for mut diag in temp.take_all() {
                if denied {
                    diag.severity = Severity::Error;
                }
                sink.emit(diag);
            }
        }
    }
}
