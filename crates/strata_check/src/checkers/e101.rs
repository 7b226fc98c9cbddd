//! E101: Unresolved supertype, a class names a supertype that is not visible.

use strata_diagnostics::{Category, DiagnosticCode, DiagnosticSink, Severity};
use strata_resolve::SupertypeRef;

use crate::{CheckContext, DeclarationChecker};

/// Detects supertype references that bound to nothing in this module or any
/// visible module.
pub struct UnresolvedSupertype;

impl DeclarationChecker for UnresolvedSupertype {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Error, 101)
    }

    fn name(&self) -> &str {
        "unresolved-supertype"
    }

    fn description(&self) -> &str {
        "supertype does not name a visible class"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check_declaration(&self, cx: &CheckContext<'_>, sink: &DiagnosticSink) {
        for supertype in &cx.state.supertypes {
            let SupertypeRef::Unresolved(written) = supertype else {
                continue;
            };
            let name = cx.session.interner().resolve(written.name);
            sink.emit(
                self.diagnostic(format!("unresolved supertype '{name}'"), written.span)
                    .with_note(format!(
                        "declared as a supertype of '{}'",
                        cx.session.name_of(cx.declaration)
                    )),
            );
        }
    }
}
