//! W201: Private abstract member, it can never be overridden.

use strata_diagnostics::{Category, DiagnosticCode, DiagnosticSink, Severity};

use crate::{CheckContext, DeclarationChecker};

/// Detects members that are both private and abstract. Reads the
/// declaration's cached attributes.
pub struct PrivateAbstractMember;

impl DeclarationChecker for PrivateAbstractMember {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Warning, 201)
    }

    fn name(&self) -> &str {
        "private-abstract-member"
    }

    fn description(&self) -> &str {
        "member is private and abstract"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_declaration(&self, cx: &CheckContext<'_>, sink: &DiagnosticSink) {
        if cx.declaration.is_accessor() || cx.declaration.is_class() {
            return;
        }
        let Ok(attributes) = cx.session.attributes(cx.declaration.id) else {
            return;
        };
        let private = attributes.is_private().unwrap_or(false);
        let is_abstract = attributes.is_abstract().unwrap_or(false);
        if private && is_abstract {
            let message = format!(
                "'{}' is private and abstract and can never be implemented",
                cx.session.name_of(cx.declaration)
            );
            sink.emit(self.diagnostic(message, cx.declaration.span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{at, file, run, session};
    use strata_resolve::{AccessorKind, ClassKind, Modifier, RawDeclaration, SourceUnit};

    #[test]
    fn private_interface_member_is_implicitly_abstract() {
        let session = session(|i| {
            SourceUnit::new(file(), "a.st").declaration(
                RawDeclaration::class(i.get_or_intern("Api"), ClassKind::Interface, at(0))
                    .member(
                        RawDeclaration::function(i.get_or_intern("hidden"), at(5))
                            .modifier(Modifier::Private),
                    )
                    .member(RawDeclaration::function(i.get_or_intern("shown"), at(10)))
                    .member(
                        RawDeclaration::property(i.get_or_intern("secret"), None, at(15))
                            .modifier(Modifier::Private)
                            .accessor(AccessorKind::Getter),
                    ),
            )
        });
        let diags = run(&PrivateAbstractMember, &session).take_all();
        let spans: Vec<_> = diags.iter().map(|d| d.primary_span).collect();
        assert_eq!(spans, vec![at(5), at(15)]);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
        assert!(diags.iter().all(|d| d.code.to_string() == "W201"));
    }
}
