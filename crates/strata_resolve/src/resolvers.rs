//! Phase resolvers: the pluggable steps that move a declaration forward.
//!
//! Each phase has at most one primary resolver and any number of extensions.
//! The built-in set is deliberately shallow: it binds names, decides status
//! flags and records declared types, which is what the phase engine and the
//! checkers need. Real inference plugs in through
//! [`SessionBuilder::with_resolver`](crate::SessionBuilder::with_resolver).

use std::sync::Arc;

use rustc_hash::FxHashSet;
use strata_common::{Ident, Span};
use strata_graph::ModuleNode;

use crate::decl::{ClassKind, Declaration, DeclarationKind, Import, Modality, Modifier, Visibility};
use crate::error::ResolveError;
use crate::phase::Phase;
use crate::services::ExternalSymbols;
use crate::session::ResolutionSession;
use crate::state::{
    DeclarationSlot, ImportTarget, ResolvedImport, ResolvedState, ResolvedType, SupertypeRef,
};

/// What a resolver sees while it runs: the session, the declaration, and
/// write access to the declaration's [`ResolvedState`].
///
/// The resolver runs under the declaration's lock, so nothing else writes the
/// state concurrently.
pub struct ResolveContext<'a> {
    session: &'a ResolutionSession,
    declaration: &'a Declaration,
    slot: &'a DeclarationSlot,
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(
        session: &'a ResolutionSession,
        declaration: &'a Declaration,
        slot: &'a DeclarationSlot,
    ) -> Self {
        Self {
            session,
            declaration,
            slot,
        }
    }

    /// The session resolving the declaration.
    pub fn session(&self) -> &'a ResolutionSession {
        self.session
    }

    /// The declaration being resolved.
    pub fn declaration(&self) -> &'a Declaration {
        self.declaration
    }

    /// Returns a copy of the state computed so far.
    pub fn state(&self) -> ResolvedState {
        self.slot.snapshot()
    }

    /// Writes to the declaration's state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ResolvedState) -> R) -> R {
        self.slot.update(f)
    }
}

/// A step that computes one phase of a declaration.
///
/// A resolver must only write the fields of [`ResolvedState`] that belong to
/// its phase. It may resolve other declarations through the session, but
/// asking for the declaration it is currently resolving fails with
/// [`ResolveError::CyclicResolution`].
pub trait PhaseResolver: Send + Sync {
    /// The phase this resolver completes.
    fn phase(&self) -> Phase;

    /// A short name for logs.
    fn name(&self) -> &str;

    /// Computes the phase for `cx.declaration()`.
    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError>;
}

/// Returns the primary resolvers for every phase after [`Phase::Raw`].
pub fn builtin_resolvers() -> Vec<Arc<dyn PhaseResolver>> {
    vec![
        Arc::new(ImportResolver),
        Arc::new(SupertypeResolver),
        Arc::new(StatusResolver),
        Arc::new(TypeResolver),
        Arc::new(ContractResolver),
        Arc::new(BodyResolver),
    ]
}

/// Modules whose declarations are visible from `module`: the module itself,
/// the modules it refines, and the regular and friend dependencies of all of
/// them.
pub fn visible_modules(module: &ModuleNode) -> Vec<ModuleNode> {
    let mut seen: FxHashSet<ModuleNode> = FxHashSet::default();
    let mut visible = Vec::new();
    let refined = module.depends_on_closure();
    let edges = refined
        .iter()
        .flat_map(|m| m.dependencies().iter().chain(m.friend_dependencies()));
    for candidate in refined.iter().rev().chain(edges) {
        if seen.insert(candidate.clone()) {
            visible.push(candidate.clone());
        }
    }
    visible
}

/// Resolves the explicit imports of one file followed by the platform's
/// default imports.
pub fn resolve_imports(module: &ModuleNode, imports: &[Import]) -> Vec<ResolvedImport> {
    let interner = module.handle().project().interner();
    let defaults = module.analyzer_services().default_imports;
    let visible: FxHashSet<Ident> = visible_modules(module).iter().map(ModuleNode::name).collect();

    let mut resolved: Vec<ResolvedImport> = imports
        .iter()
        .map(|import| {
            let target = if visible.contains(&import.path) {
                ImportTarget::Module(import.path)
            } else if defaults.iter().any(|d| *d == interner.resolve(import.path)) {
                ImportTarget::DefaultPackage
            } else {
                ImportTarget::Unresolved
            };
            ResolvedImport {
                path: import.path,
                span: import.span,
                target,
            }
        })
        .collect();
    resolved.extend(defaults.iter().map(|package| ResolvedImport {
        path: interner.get_or_intern(package),
        span: Span::DUMMY,
        target: ImportTarget::DefaultPackage,
    }));
    resolved
}

/// [`Phase::Imports`]: attaches the resolved imports of the declaration's
/// file.
pub struct ImportResolver;

impl PhaseResolver for ImportResolver {
    fn phase(&self) -> Phase {
        Phase::Imports
    }

    fn name(&self) -> &str {
        "imports"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let imports = cx.session().file_imports(cx.declaration().file)?;
        cx.update(|state| state.imports = imports);
        Ok(())
    }
}

/// [`Phase::Supertypes`]: binds each supertype name of a class.
pub struct SupertypeResolver;

impl PhaseResolver for SupertypeResolver {
    fn phase(&self) -> Phase {
        Phase::Supertypes
    }

    fn name(&self) -> &str {
        "supertypes"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let DeclarationKind::Class { supertypes, .. } = &cx.declaration().kind else {
            return Ok(());
        };
        let session = cx.session();
        let external = session.get::<ExternalSymbols>()?;
        let modules = visible_modules(session.module());

        let bound = supertypes
            .iter()
            .map(|written| {
                let local = session.lookup(written.name).iter().copied().find(|id| {
                    session.declaration(*id).is_ok_and(|d| {
                        matches!(
                            d.kind,
                            DeclarationKind::Class { .. } | DeclarationKind::TypeAlias { .. }
                        )
                    })
                });
                if let Some(id) = local {
                    return SupertypeRef::Local(id);
                }
                modules
                    .iter()
                    .skip(1)
                    .find(|m| external.exports(m.name(), written.name))
                    .map_or(SupertypeRef::Unresolved(*written), |m| {
                        SupertypeRef::External {
                            module: m.name(),
                            name: written.name,
                        }
                    })
            })
            .collect();
        cx.update(|state| state.supertypes = bound);
        Ok(())
    }
}

/// [`Phase::Status`]: decides visibility and modality.
///
/// Visibility defaults to public. Modality defaults to final, except that
/// interfaces and their members default to abstract.
pub struct StatusResolver;

impl PhaseResolver for StatusResolver {
    fn phase(&self) -> Phase {
        Phase::Status
    }

    fn name(&self) -> &str {
        "status"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let declaration = cx.declaration();
        let visibility = declaration
            .modifiers
            .visibility()
            .unwrap_or(Visibility::Public);
        let in_interface = cx
            .session()
            .enclosing_class(declaration.id)
            .and_then(Declaration::class_kind)
            == Some(ClassKind::Interface);
        let modality = declaration.modifiers.modality().unwrap_or(
            if in_interface || declaration.class_kind() == Some(ClassKind::Interface) {
                Modality::Abstract
            } else {
                Modality::Final
            },
        );
        cx.update(|state| {
            state.visibility = Some(visibility);
            state.modality = Some(modality);
        });
        Ok(())
    }
}

/// [`Phase::Types`]: records declared types; missing ones become
/// [`ResolvedType::Implicit`].
pub struct TypeResolver;

impl PhaseResolver for TypeResolver {
    fn phase(&self) -> Phase {
        Phase::Types
    }

    fn name(&self) -> &str {
        "types"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let of = |written: Option<&crate::decl::TypeName>| {
            written.map_or(ResolvedType::Implicit, |t| ResolvedType::Named(t.name))
        };
        let types = match &cx.declaration().kind {
            DeclarationKind::Function {
                params,
                return_type,
            } => params
                .iter()
                .map(|p| of(p.type_ref.as_ref()))
                .chain(std::iter::once(of(return_type.as_ref())))
                .collect(),
            DeclarationKind::Property { type_ref, .. } => vec![of(type_ref.as_ref())],
            DeclarationKind::Accessor { property, .. } => {
                match &cx.session().declaration(*property)?.kind {
                    DeclarationKind::Property { type_ref, .. } => vec![of(type_ref.as_ref())],
                    _ => vec![ResolvedType::Implicit],
                }
            }
            DeclarationKind::TypeAlias { target } => vec![ResolvedType::Named(target.name)],
            DeclarationKind::Class { .. } => Vec::new(),
        };
        cx.update(|state| state.types = types);
        Ok(())
    }
}

/// [`Phase::Contracts`]: marks functions written with the `contract`
/// modifier.
pub struct ContractResolver;

impl PhaseResolver for ContractResolver {
    fn phase(&self) -> Phase {
        Phase::Contracts
    }

    fn name(&self) -> &str {
        "contracts"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        let declaration = cx.declaration();
        let has_contract = matches!(declaration.kind, DeclarationKind::Function { .. })
            && declaration.modifiers.contains(Modifier::Contract);
        cx.update(|state| state.has_contract = has_contract);
        Ok(())
    }
}

/// [`Phase::Body`]: marks the body resolved.
pub struct BodyResolver;

impl PhaseResolver for BodyResolver {
    fn phase(&self) -> Phase {
        Phase::Body
    }

    fn name(&self) -> &str {
        "body"
    }

    fn resolve(&self, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        cx.update(|state| state.body_resolved = true);
        Ok(())
    }
}
