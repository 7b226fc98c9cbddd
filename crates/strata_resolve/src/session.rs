//! Resolution sessions and the phase engine.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_cache::MemoCell;
use strata_common::{Arena, FileId, Ident, Interner};
use strata_config::AnalysisConfig;
use strata_graph::ModuleNode;

use crate::attributes::DeclarationAttributes;
use crate::decl::{
    Declaration, DeclarationId, DeclarationKind, Import, RawDeclaration, RawDeclarationKind,
    SourceUnit,
};
use crate::error::ResolveError;
use crate::phase::Phase;
use crate::resolvers::{builtin_resolvers, resolve_imports, PhaseResolver, ResolveContext};
use crate::services::{ExternalSymbols, ServiceRegistry};
use crate::state::{DeclarationSlot, PhaseFailure, ResolvedImport, ResolvedState};

/// A source unit after its declarations entered a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// File identity.
    pub file: FileId,
    /// Path of the file, for messages.
    pub path: String,
    /// Explicit imports.
    pub imports: Vec<Import>,
    /// Top-level declarations.
    pub declarations: Vec<DeclarationId>,
}

/// Resolvers indexed by the phase they complete.
#[derive(Default)]
struct PhaseTable {
    primary: [Option<Arc<dyn PhaseResolver>>; Phase::ALL.len()],
    extensions: Vec<Arc<dyn PhaseResolver>>,
}

impl PhaseTable {
    fn run(&self, phase: Phase, cx: &ResolveContext<'_>) -> Result<(), ResolveError> {
        if let Some(resolver) = &self.primary[phase as usize] {
            resolver.resolve(cx)?;
        }
        for extension in self.extensions.iter().filter(|e| e.phase() == phase) {
            extension.resolve(cx)?;
        }
        Ok(())
    }
}

/// Configures a [`ResolutionSession`].
///
/// Services and resolvers can only be added here; a built session is
/// read-only apart from its caches.
pub struct SessionBuilder {
    module: ModuleNode,
    config: AnalysisConfig,
    services: ServiceRegistry,
    resolvers: PhaseTable,
    units: Vec<SourceUnit>,
}

impl SessionBuilder {
    /// Starts configuring a session for `module` with the built-in
    /// resolvers installed.
    pub fn new(module: ModuleNode, config: AnalysisConfig) -> Self {
        let mut builder = Self {
            module,
            config,
            services: ServiceRegistry::new(),
            resolvers: PhaseTable::default(),
            units: Vec::new(),
        };
        for resolver in builtin_resolvers() {
            builder = builder.with_resolver(resolver);
        }
        builder
    }

    /// Binds a service instance. Fails if a service of the same type is
    /// already bound.
    pub fn register<T>(mut self, instance: T) -> Result<Self, ResolveError>
    where
        T: std::any::Any + Send + Sync,
    {
        self.services.register(instance)?;
        Ok(self)
    }

    /// Binds a service constructed on first request.
    pub fn register_lazy<T, F>(mut self, factory: F) -> Result<Self, ResolveError>
    where
        T: std::any::Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.services.register_lazy(factory)?;
        Ok(self)
    }

    /// Installs `resolver` as the primary resolver of its phase, replacing
    /// any previous one. Resolvers for [`Phase::Raw`] are never run.
    pub fn with_resolver(mut self, resolver: Arc<dyn PhaseResolver>) -> Self {
        let slot = resolver.phase() as usize;
        self.resolvers.primary[slot] = Some(resolver);
        self
    }

    /// Adds a resolver that runs after the primary resolver of its phase.
    pub fn with_extension(mut self, resolver: Arc<dyn PhaseResolver>) -> Self {
        self.resolvers.extensions.push(resolver);
        self
    }

    /// Removes the primary resolver of `phase`; the phase then completes
    /// without doing anything unless an extension handles it.
    pub fn without_resolver(mut self, phase: Phase) -> Self {
        self.resolvers.primary[phase as usize] = None;
        self
    }

    /// Adds a source file.
    pub fn add_source_unit(mut self, unit: SourceUnit) -> Self {
        self.units.push(unit);
        self
    }

    /// Allocates every declaration and builds the session.
    pub fn build(mut self) -> Result<Arc<ResolutionSession>, ResolveError> {
        if !self.module.handle().is_valid() {
            return Err(ResolveError::SessionInvalidated(
                self.module.name_str().to_string(),
            ));
        }
        if !self.services.contains::<ExternalSymbols>() {
            self.services.register_lazy(ExternalSymbols::default)?;
        }

        let mut lowering = Lowering::default();
        let mut files = Vec::with_capacity(self.units.len());
        let mut file_imports: FxHashMap<FileId, Vec<Import>> = FxHashMap::default();
        for unit in self.units {
            let declarations = unit
                .declarations
                .iter()
                .map(|raw| lowering.lower(raw, unit.file, None))
                .collect();
            file_imports.insert(unit.file, unit.imports.clone());
            files.push(SourceFile {
                file: unit.file,
                path: unit.path,
                imports: unit.imports,
                declarations,
            });
        }

        let module = self.module.clone();
        let imports_cell = MemoCell::new(FxHashMap::default(), move |file: &FileId| {
            let imports = file_imports.get(file)?;
            let mut batch = FxHashMap::default();
            batch.insert(*file, Arc::new(resolve_imports(&module, imports)));
            Some(batch)
        });

        let slots = (0..lowering.declarations.len())
            .map(|_| DeclarationSlot::default())
            .collect();
        tracing::debug!(
            module = self.module.name_str(),
            files = files.len(),
            declarations = lowering.declarations.len(),
            "built resolution session"
        );
        Ok(Arc::new_cyclic(|this| ResolutionSession {
            this: this.clone(),
            module: self.module,
            config: self.config,
            services: self.services,
            resolvers: self.resolvers,
            declarations: lowering.declarations,
            slots,
            files,
            by_name: lowering.by_name,
            file_imports: imports_cell,
        }))
    }
}

#[derive(Default)]
struct Lowering {
    declarations: Arena<DeclarationId, Declaration>,
    by_name: FxHashMap<Ident, Vec<DeclarationId>>,
}

impl Lowering {
    fn lower(
        &mut self,
        raw: &RawDeclaration,
        file: FileId,
        parent: Option<DeclarationId>,
    ) -> DeclarationId {
        let kind = match &raw.kind {
            RawDeclarationKind::Class {
                class_kind,
                supertypes,
                ..
            } => DeclarationKind::Class {
                class_kind: *class_kind,
                supertypes: supertypes.clone(),
                members: Vec::new(),
            },
            RawDeclarationKind::Function {
                params,
                return_type,
            } => DeclarationKind::Function {
                params: params.clone(),
                return_type: *return_type,
            },
            RawDeclarationKind::Property { type_ref, .. } => DeclarationKind::Property {
                type_ref: *type_ref,
                accessors: Vec::new(),
            },
            RawDeclarationKind::TypeAlias { target } => {
                DeclarationKind::TypeAlias { target: *target }
            }
        };
        let id = self.alloc(raw.name, raw.span, file, raw.modifiers, parent, kind);
        self.by_name.entry(raw.name).or_default().push(id);

        let children: Vec<DeclarationId> = match &raw.kind {
            RawDeclarationKind::Class { members, .. } => members
                .iter()
                .map(|member| self.lower(member, file, Some(id)))
                .collect(),
            RawDeclarationKind::Property { accessors, .. } => accessors
                .iter()
                .map(|accessor_kind| {
                    let kind = DeclarationKind::Accessor {
                        property: id,
                        accessor_kind: *accessor_kind,
                    };
                    self.alloc(raw.name, raw.span, file, raw.modifiers, Some(id), kind)
                })
                .collect(),
            _ => Vec::new(),
        };
        if let Some(declaration) = self.declarations.get_mut(id) {
            match &mut declaration.kind {
                DeclarationKind::Class { members, .. } => *members = children,
                DeclarationKind::Property { accessors, .. } => *accessors = children,
                _ => {}
            }
        }
        id
    }

    fn alloc(
        &mut self,
        name: Ident,
        span: strata_common::Span,
        file: FileId,
        modifiers: crate::decl::Modifiers,
        parent: Option<DeclarationId>,
        kind: DeclarationKind,
    ) -> DeclarationId {
        let id = self.declarations.next_id();
        self.declarations.alloc(Declaration {
            id,
            name,
            span,
            file,
            modifiers,
            parent,
            kind,
        })
    }
}

thread_local! {
    /// Declarations whose phase is being advanced on this thread, keyed by
    /// session address.
    static IN_PROGRESS: RefCell<FxHashSet<(usize, DeclarationId)>> =
        RefCell::new(FxHashSet::default());
}

struct ReentryGuard {
    key: (usize, DeclarationId),
}

impl ReentryGuard {
    fn enter(key: (usize, DeclarationId)) -> Option<Self> {
        let fresh = IN_PROGRESS.with(|active| active.borrow_mut().insert(key));
        fresh.then_some(ReentryGuard { key })
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|active| {
            active.borrow_mut().remove(&self.key);
        });
    }
}

/// The declarations of one module and the machinery that resolves them.
///
/// A session is shared through `Arc` and is safe to use from many threads.
/// Every declaration advances through [`Phase`]s independently and only on
/// demand: [`resolve_to`](Self::resolve_to) does the minimum work needed to
/// reach the requested phase.
///
/// Sessions are never updated in place. When the project snapshot changes,
/// the owner drops the session together with all of its caches.
pub struct ResolutionSession {
    this: Weak<ResolutionSession>,
    module: ModuleNode,
    config: AnalysisConfig,
    services: ServiceRegistry,
    resolvers: PhaseTable,
    declarations: Arena<DeclarationId, Declaration>,
    slots: Vec<DeclarationSlot>,
    files: Vec<SourceFile>,
    by_name: FxHashMap<Ident, Vec<DeclarationId>>,
    file_imports: MemoCell<FileId, Arc<Vec<ResolvedImport>>>,
}

impl ResolutionSession {
    /// Starts configuring a session.
    pub fn builder(module: ModuleNode, config: AnalysisConfig) -> SessionBuilder {
        SessionBuilder::new(module, config)
    }

    /// Advances `id` until it has reached `target`.
    ///
    /// Returns immediately if the declaration is already there. Otherwise
    /// the declaration's lock is taken and each missing phase is resolved in
    /// order; a phase is published only after its resolvers succeed, so a
    /// caller that observes a phase also observes everything written for it.
    ///
    /// A resolver failure is recorded on the declaration and returned as
    /// [`ResolveError::PhaseResolutionFailure`]. With
    /// `retry_failed_phases` disabled, later calls return the recorded
    /// failure without running the resolver again.
    ///
    /// Re-entering a declaration that this thread is already advancing fails
    /// with [`ResolveError::CyclicResolution`]. Two threads that wait on each
    /// other's declarations through resolvers still deadlock; the built-in
    /// resolvers never wait on another declaration.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn resolve_to(&self, id: DeclarationId, target: Phase) -> Result<(), ResolveError> {
        let (declaration, slot) = self.entry(id)?;
        if slot.phase.load() >= target {
            return Ok(());
        }
        self.ensure_valid()?;

        let Some(_reentry) = ReentryGuard::enter((self.key(), id)) else {
            return Err(ResolveError::CyclicResolution {
                declaration: self.name_of(declaration).to_string(),
                phase: target,
            });
        };
        let _lock = slot.lock();
        loop {
            let Some(next) = slot.phase.load().next().filter(|next| *next <= target) else {
                return Ok(());
            };
            if !self.config.retry_failed_phases {
                if let Some(failure) = slot.failure().filter(|f| f.phase == next) {
                    return Err(self.failure_error(declaration, failure));
                }
            }

            let before = slot.snapshot();
            let cx = ResolveContext::new(self, declaration, slot);
            match self.resolvers.run(next, &cx) {
                Ok(()) => {
                    slot.set_failure(None);
                    slot.phase.store(next);
                    tracing::trace!(
                        declaration = self.name_of(declaration),
                        phase = %next,
                        "phase published"
                    );
                }
                Err(err) => {
                    let failure = PhaseFailure {
                        phase: next,
                        message: err.to_string(),
                    };
                    tracing::warn!(
                        declaration = self.name_of(declaration),
                        phase = %next,
                        error = %failure.message,
                        "phase resolver failed"
                    );
                    slot.restore(before);
                    slot.set_failure(Some(failure.clone()));
                    return Err(self.failure_error(declaration, failure));
                }
            }
        }
    }

    /// Advances every declaration to `target` and returns the failures,
    /// ordered by declaration. Uses the rayon pool when the analysis
    /// configuration allows it.
    pub fn resolve_all(&self, target: Phase) -> Vec<(DeclarationId, ResolveError)> {
        let resolve = |id: DeclarationId| self.resolve_to(id, target).err().map(|e| (id, e));
        let ids: Vec<DeclarationId> = self.declarations.ids().collect();
        let mut failures: Vec<(DeclarationId, ResolveError)> = if self.config.parallel {
            ids.into_par_iter().filter_map(resolve).collect()
        } else {
            ids.into_iter().filter_map(resolve).collect()
        };
        failures.sort_by_key(|(id, _)| *id);
        failures
    }

    /// Returns the service of type `T`.
    pub fn get<T: std::any::Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        self.services.get::<T>()
    }

    /// Returns the module this session analyses.
    pub fn module(&self) -> &ModuleNode {
        &self.module
    }

    /// Returns the analysis configuration the session was built with.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the project's interner.
    pub fn interner(&self) -> &Arc<Interner> {
        self.module.handle().project().interner()
    }

    /// Returns `false` once the project snapshot was invalidated.
    pub fn is_valid(&self) -> bool {
        self.module.handle().is_valid()
    }

    /// Returns a declaration.
    pub fn declaration(&self, id: DeclarationId) -> Result<&Declaration, ResolveError> {
        self.declarations
            .get(id)
            .ok_or(ResolveError::UnknownDeclaration(id.as_raw()))
    }

    /// Iterates over every declaration in allocation order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().map(|(_, d)| d)
    }

    /// Returns the number of declarations, generated accessors included.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` if the session has no declarations.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Returns the phase `id` has reached.
    pub fn phase_of(&self, id: DeclarationId) -> Result<Phase, ResolveError> {
        Ok(self.entry(id)?.1.phase.load())
    }

    /// Returns the failure recorded for `id`, if its last attempt failed.
    pub fn failure_of(&self, id: DeclarationId) -> Result<Option<PhaseFailure>, ResolveError> {
        Ok(self.entry(id)?.1.failure())
    }

    /// Returns a snapshot of everything resolved for `id` so far.
    pub fn resolved(&self, id: DeclarationId) -> Result<ResolvedState, ResolveError> {
        Ok(self.entry(id)?.1.snapshot())
    }

    /// Returns the declarations called `name`, excluding generated accessors.
    pub fn lookup(&self, name: Ident) -> &[DeclarationId] {
        self.by_name.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Like [`lookup`](Self::lookup), by string.
    pub fn lookup_str(&self, name: &str) -> &[DeclarationId] {
        self.interner()
            .get(name)
            .map(|ident| self.lookup(ident))
            .unwrap_or(&[])
    }

    /// Returns the source files in the order they were added.
    pub fn source_units(&self) -> &[SourceFile] {
        &self.files
    }

    /// Returns one source file.
    pub fn source_file(&self, file: FileId) -> Result<&SourceFile, ResolveError> {
        self.files
            .iter()
            .find(|f| f.file == file)
            .ok_or(ResolveError::UnknownFile(file.as_raw()))
    }

    /// Iterates over every declaration written in `file`.
    pub fn declarations_in(&self, file: FileId) -> impl Iterator<Item = &Declaration> {
        self.declarations().filter(move |d| d.file == file)
    }

    /// Returns the resolved imports of `file`, computing them once.
    pub fn file_imports(&self, file: FileId) -> Result<Arc<Vec<ResolvedImport>>, ResolveError> {
        self.source_file(file)?;
        self.file_imports
            .get(&file)
            .map_err(|err| ResolveError::PhaseResolutionFailure {
                declaration: format!("imports of file #{}", file.as_raw()),
                phase: Phase::Imports,
                message: err.to_string(),
            })
    }

    /// Returns the visibility and modality attributes of `id`, creating its
    /// attribute cache on first use.
    pub fn attributes(&self, id: DeclarationId) -> Result<&DeclarationAttributes, ResolveError> {
        let (declaration, slot) = self.entry(id)?;
        Ok(slot
            .attributes
            .get_or_init(|| DeclarationAttributes::new(self.this.clone(), declaration)))
    }

    /// Returns the class that contains `id`, looking through properties for
    /// generated accessors.
    pub fn enclosing_class(&self, id: DeclarationId) -> Option<&Declaration> {
        let mut current = self.declarations.get(id)?.parent;
        while let Some(parent) = current {
            let declaration = self.declarations.get(parent)?;
            if declaration.is_class() {
                return Some(declaration);
            }
            current = declaration.parent;
        }
        None
    }

    /// Returns the name of a declaration as a string.
    pub fn name_of(&self, declaration: &Declaration) -> &str {
        self.interner().resolve(declaration.name)
    }

    fn entry(&self, id: DeclarationId) -> Result<(&Declaration, &DeclarationSlot), ResolveError> {
        let declaration = self.declaration(id)?;
        let slot = self
            .slots
            .get(id.as_raw() as usize)
            .ok_or(ResolveError::UnknownDeclaration(id.as_raw()))?;
        Ok((declaration, slot))
    }

    fn ensure_valid(&self) -> Result<(), ResolveError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ResolveError::SessionInvalidated(
                self.module.name_str().to_string(),
            ))
        }
    }

    fn failure_error(&self, declaration: &Declaration, failure: PhaseFailure) -> ResolveError {
        ResolveError::PhaseResolutionFailure {
            declaration: self.name_of(declaration).to_string(),
            phase: failure.phase,
            message: failure.message,
        }
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("module", &self.module)
            .field("files", &self.files.len())
            .field("declarations", &self.declarations.len())
            .field("services", &self.services.len())
            .finish()
    }
}
