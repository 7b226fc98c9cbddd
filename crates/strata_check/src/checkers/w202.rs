//! W202: Unresolved import.

use strata_diagnostics::{Category, DiagnosticCode, DiagnosticSink, Severity};
use strata_resolve::{ImportTarget, ResolutionSession, SourceFile};

use crate::DeclarationChecker;

/// Detects imports that name neither a visible module nor a default package
/// of the module's platform. Runs once per file.
pub struct UnresolvedImport;

impl DeclarationChecker for UnresolvedImport {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Warning, 202)
    }

    fn name(&self) -> &str {
        "unresolved-import"
    }

    fn description(&self) -> &str {
        "import does not name a visible module"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_file(&self, session: &ResolutionSession, file: &SourceFile, sink: &DiagnosticSink) {
        let Ok(imports) = session.file_imports(file.file) else {
            return;
        };
        for import in imports.iter().filter(|i| i.target == ImportTarget::Unresolved) {
            let path = session.interner().resolve(import.path);
            sink.emit(
                self.diagnostic(format!("unresolved import '{path}'"), import.span)
                    .with_note(format!("in {}", file.path)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{at, file, run, session};
    use strata_resolve::SourceUnit;

    #[test]
    fn reports_once_per_import_not_per_declaration() {
        let session = session(|i| {
            SourceUnit::new(file(), "a.st")
                .import(i.get_or_intern("app"), at(0))
                .import(i.get_or_intern("jvm.lang"), at(5))
                .import(i.get_or_intern("missing.pkg"), at(10))
                .declaration(strata_resolve::RawDeclaration::function(
                    i.get_or_intern("main"),
                    at(20),
                ))
        });
        let diags = run(&UnresolvedImport, &session).take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].primary_span, at(10));
        assert!(diags[0].message.contains("missing.pkg"));
    }
}
