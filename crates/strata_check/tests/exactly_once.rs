//! Diagnostics over trees with shared nodes fire exactly once per element.

use std::sync::Arc;

use strata_check::{
    CheckerEngine, DiagnosticCollector, ElementId, SemanticElement, TraversalGuard,
};
use strata_common::{FileId, Interner, Span};
use strata_config::{load_config_from_str, ProjectConfig};
use strata_diagnostics::{DiagnosticSink, Severity};
use strata_graph::{ModuleNode, ProjectModel};
use strata_resolve::{
    AccessorKind, ClassKind, Modifier, RawDeclaration, ResolutionSession, SourceUnit, TypeName,
};

const PROJECT: &str = r#"
[project]
name = "widgets"

[modules.app]
platform = "js"

[analysis]
parallel = true

[checks]
deny = ["private-abstract-member"]
allow = ["unresolved-import"]
"#;

fn span(file: u32, start: u32) -> Span {
    Span::new(FileId::from_raw(file), start, start + 1)
}

fn build(config: &ProjectConfig) -> Arc<ResolutionSession> {
    let project = ProjectModel::from_config(config, Arc::new(Interner::new())).unwrap();
    let module = ModuleNode::new(project.handle("app").unwrap());
    let i = Arc::clone(project.interner());

    // class C { x: Int (get, set) }
    let c = SourceUnit::new(FileId::from_raw(0), "c.st").declaration(
        RawDeclaration::class(i.get_or_intern("C"), ClassKind::Class, span(0, 0)).member(
            RawDeclaration::property(
                i.get_or_intern("x"),
                Some(TypeName::new(i.get_or_intern("Int"), span(0, 8))),
                span(0, 5),
            )
            .accessor(AccessorKind::Getter)
            .accessor(AccessorKind::Setter),
        ),
    );
    // interface Api : Missing { private fun hidden() }, plus an import nobody provides.
    let api = SourceUnit::new(FileId::from_raw(1), "api.st")
        .import(i.get_or_intern("nowhere"), span(1, 0))
        .declaration(
            RawDeclaration::class(i.get_or_intern("Api"), ClassKind::Interface, span(1, 10))
                .supertype(TypeName::new(i.get_or_intern("Missing"), span(1, 20)))
                .member(
                    RawDeclaration::function(i.get_or_intern("hidden"), span(1, 30))
                        .modifier(Modifier::Private),
                ),
        );

    ResolutionSession::builder(module, config.analysis.clone())
        .add_source_unit(c)
        .add_source_unit(api)
        .build()
        .unwrap()
}

#[test]
fn property_with_accessor_alias_is_visited_once() {
    let config = load_config_from_str(PROJECT).unwrap();
    let session = build(&config);
    let collector = DiagnosticCollector::new(CheckerEngine::new(&config.checks));
    let sink = DiagnosticSink::new();

    let guard = collector
        .collect_file(&session, FileId::from_raw(0), &sink)
        .unwrap();

    guard.assert_all_visited_exactly_once();
    let x = ElementId::Declaration(session.lookup_str("x")[0]);
    assert_eq!(guard.visit_count(x), 1);
    assert!(sink.take_all().is_empty());
}

#[test]
fn naive_walk_over_shared_nodes_is_caught() {
    let config = load_config_from_str(PROJECT).unwrap();
    let session = build(&config);
    let c = session.lookup_str("C")[0];
    let mut guard = TraversalGuard::new();
    guard.expect_all(
        session
            .declarations_in(FileId::from_raw(0))
            .map(|d| ElementId::Declaration(d.id)),
    );

    // Follows every reachable edge without remembering what it has seen, but
    // stops at depth 3 so the accessor -> property back edge terminates.
    fn walk(session: &ResolutionSession, id: ElementId, depth: u32, guard: &mut TraversalGuard) {
        guard.before_visit(id);
        if depth == 3 {
            return;
        }
        let element = SemanticElement::new(session, id).unwrap();
        for next in element.reachable() {
            walk(session, next, depth + 1, guard);
        }
    }
    walk(&session, ElementId::Declaration(c), 0, &mut guard);

    let violation = guard.verify().unwrap_err();
    assert!(violation.missed.is_empty());
    let x = ElementId::Declaration(session.lookup_str("x")[0]);
    assert!(violation.duplicated.iter().any(|(e, n)| *e == x && *n > 1));
}

#[test]
fn module_pass_respects_check_configuration() {
    let config = load_config_from_str(PROJECT).unwrap();
    let session = build(&config);
    let collector = DiagnosticCollector::new(CheckerEngine::new(&config.checks));
    let sink = DiagnosticSink::new();

    collector.collect_module(&session, &sink).unwrap();

    let diags = sink.take_sorted();
    let codes: Vec<String> = diags.iter().map(|d| d.code.to_string()).collect();
    // W202 is allowed away; W201 is denied and therefore an error.
    assert_eq!(codes, vec!["E101", "W201"]);
    assert!(diags.iter().all(|d| d.severity == Severity::Error));
}

#[test]
fn repeated_passes_use_fresh_guards() {
    let config = load_config_from_str(PROJECT).unwrap();
    let session = build(&config);
    let collector = DiagnosticCollector::with_defaults();
    for _ in 0..3 {
        let sink = DiagnosticSink::new();
        let guard = collector
            .collect_file(&session, FileId::from_raw(1), &sink)
            .unwrap();
        guard.assert_all_visited_exactly_once();
        assert_eq!(sink.error_count(), 1);
    }
}
