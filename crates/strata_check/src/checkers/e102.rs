//! E102: Abstract member in final class.

use strata_diagnostics::{Category, DiagnosticCode, DiagnosticSink, Severity};
use strata_resolve::{ClassKind, Modality};

use crate::{CheckContext, DeclarationChecker};

/// Detects abstract members of classes that are final, which can never be
/// implemented.
///
/// Interfaces are exempt and generated accessors are skipped because their
/// property is reported instead.
pub struct AbstractMemberInFinalClass;

impl DeclarationChecker for AbstractMemberInFinalClass {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Error, 102)
    }

    fn name(&self) -> &str {
        "abstract-member-in-final-class"
    }

    fn description(&self) -> &str {
        "abstract member declared in a final class"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check_declaration(&self, cx: &CheckContext<'_>, sink: &DiagnosticSink) {
        if cx.declaration.is_accessor() || cx.state.modality != Some(Modality::Abstract) {
            return;
        }
        let Some(class) = cx.session.enclosing_class(cx.declaration.id) else {
            return;
        };
        if class.class_kind() == Some(ClassKind::Interface) {
            return;
        }
        let final_class = cx
            .session
            .attributes(class.id)
            .ok()
            .and_then(|attributes| attributes.modality().ok())
            == Some(Modality::Final);
        if final_class {
            let message = format!(
                "abstract member '{}' in final class '{}'",
                cx.session.name_of(cx.declaration),
                cx.session.name_of(class)
            );
            sink.emit(
                self.diagnostic(message, cx.declaration.span).with_note(
                    "mark the class abstract or open, or give the member an implementation",
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{at, file, run, session};
    use strata_resolve::{Modifier, RawDeclaration, SourceUnit};

    #[test]
    fn abstract_member_of_final_class() {
        let session = session(|i| {
            SourceUnit::new(file(), "a.st")
                .declaration(
                    RawDeclaration::class(i.get_or_intern("Sealed"), ClassKind::Class, at(0))
                        .member(
                            RawDeclaration::function(i.get_or_intern("run"), at(5))
                                .modifier(Modifier::Abstract),
                        ),
                )
                .declaration(
                    RawDeclaration::class(i.get_or_intern("Base"), ClassKind::Class, at(10))
                        .modifier(Modifier::Abstract)
                        .member(
                            RawDeclaration::function(i.get_or_intern("go"), at(15))
                                .modifier(Modifier::Abstract),
                        ),
                )
                .declaration(
                    RawDeclaration::class(i.get_or_intern("Api"), ClassKind::Interface, at(20))
                        .member(RawDeclaration::function(i.get_or_intern("call"), at(25))),
                )
        });
        let diags = run(&AbstractMemberInFinalClass, &session).take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].primary_span, at(5));
        assert!(diags[0].message.contains("'run'"));
    }
}
