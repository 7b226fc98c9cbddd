//! End-to-end behaviour of the phase engine under concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use strata_common::{FileId, Interner, Span};
use strata_config::{load_config_from_str, AnalysisConfig};
use strata_graph::{ModuleNode, ProjectModel};
use strata_resolve::{
    ClassKind, DeclarationId, Phase, PhaseResolver, RawDeclaration, ResolutionSession,
    ResolveContext, ResolveError, SessionProvider, SourceUnit, TypeName,
};

const PROJECT: &str = r#"
[project]
name = "shapes"

[modules.common]
platform = "common"

[modules.jvm]
platform = "jvm"
depends_on = ["common"]
"#;

fn jvm_module() -> ModuleNode {
    let config = load_config_from_str(PROJECT).unwrap();
    let project = ProjectModel::from_config(&config, Arc::new(Interner::new())).unwrap();
    ModuleNode::new(project.handle("jvm").unwrap())
}

fn shapes(module: &ModuleNode) -> SourceUnit {
    let i = module.handle().project().interner();
    let ty = |name: &str| TypeName::new(i.get_or_intern(name), Span::DUMMY);
    SourceUnit::new(FileId::from_raw(1), "shapes.st")
        .declaration(RawDeclaration::class(
            i.get_or_intern("Shape"),
            ClassKind::Interface,
            Span::DUMMY,
        ))
        .declaration(
            RawDeclaration::class(i.get_or_intern("Circle"), ClassKind::Class, Span::DUMMY)
                .supertype(ty("Shape"))
                .member(RawDeclaration::property(
                    i.get_or_intern("radius"),
                    Some(ty("Double")),
                    Span::DUMMY,
                )),
        )
}

/// Counts how often its phase runs and checks that the phase is not yet
/// published while it runs.
struct Counting {
    phase: Phase,
    calls: Arc<AtomicUsize>,
}

impl PhaseResolver for Counting {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let current = cx.session().phase_of(cx.declaration().id)?;
        assert!(current < self.phase, "phase {} already published", self.phase);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counted_session(module: &ModuleNode) -> (Arc<ResolutionSession>, Vec<Arc<AtomicUsize>>) {
    let mut builder = ResolutionSession::builder(module.clone(), AnalysisConfig::default())
        .add_source_unit(shapes(module));
    let mut counters = Vec::new();
    for phase in &Phase::ALL[1..] {
        let calls = Arc::new(AtomicUsize::new(0));
        builder = builder.with_extension(Arc::new(Counting {
            phase: *phase,
            calls: Arc::clone(&calls),
        }));
        counters.push(calls);
    }
    (builder.build().unwrap(), counters)
}

fn circle(session: &ResolutionSession) -> DeclarationId {
    session.lookup_str("Circle")[0]
}

#[test]
fn phases_never_move_backwards() {
    let module = jvm_module();
    let (session, counters) = counted_session(&module);
    let d = circle(&session);
    let mut observed = vec![session.phase_of(d).unwrap()];
    for target in [Phase::Types, Phase::Imports, Phase::Status, Phase::Body, Phase::Raw] {
        session.resolve_to(d, target).unwrap();
        observed.push(session.phase_of(d).unwrap());
    }
    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{observed:?}");
    assert_eq!(observed.last(), Some(&Phase::Body));
    assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
}

#[test]
fn concurrent_resolution_runs_each_phase_once() {
    let module = jvm_module();
    let (session, counters) = counted_session(&module);
    let d = circle(&session);
    let barrier = Barrier::new(2);

    let results: Vec<Result<(), ResolveError>> = std::thread::scope(|scope| {
        let a = scope.spawn(|| {
            barrier.wait();
            session.resolve_to(d, Phase::Types)
        });
        let b = scope.spawn(|| {
            barrier.wait();
            session.resolve_to(d, Phase::Types)
        });
        vec![a.join().unwrap(), b.join().unwrap()]
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(session.phase_of(d).unwrap(), Phase::Types);
    let runs: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    // Imports, Supertypes, Status and Types ran once; later phases never ran.
    assert_eq!(runs, vec![1, 1, 1, 1, 0, 0]);
    let state = session.resolved(d).unwrap();
    assert_eq!(state.supertypes.len(), 1);
    assert!(state.visibility.is_some());
}

#[test]
fn many_threads_many_targets() {
    let module = jvm_module();
    let (session, counters) = counted_session(&module);
    std::thread::scope(|scope| {
        for i in 0..16 {
            let session = &session;
            scope.spawn(move || {
                let target = Phase::ALL[1 + i % 6];
                for d in session.declarations().map(|d| d.id).collect::<Vec<_>>() {
                    session.resolve_to(d, target).unwrap();
                    assert!(session.phase_of(d).unwrap() >= target);
                }
            });
        }
    });
    let declarations = session.len();
    assert!(counters
        .iter()
        .all(|c| c.load(Ordering::SeqCst) == declarations));
}

#[test]
fn provider_shares_sessions_between_callers() {
    let module = jvm_module();
    let provider = SessionProvider::new(Arc::clone(module.handle().project()));
    let config = AnalysisConfig::default();
    let unit = shapes(&module);
    let first = provider
        .get_or_create(&module, &config, |b| Ok(b.add_source_unit(unit)))
        .unwrap();
    let second = provider
        .get_or_create(&module, &config, |_| panic!("session already exists"))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.resolve_all(Phase::Body).is_empty());
}
