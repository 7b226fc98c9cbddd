//! The validated module description of one project snapshot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use strata_common::{define_id, Arena, Ident, Interner};
use strata_config::{Platform, ProjectConfig};

use crate::error::GraphError;

define_id!(
    /// Opaque, copyable ID for a module within one [`ProjectModel`].
    ModuleId
);

/// The three kinds of module dependency edges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EdgeKind {
    /// A regular compile dependency.
    Regular,
    /// A refines edge from a platform module to the common module it
    /// provides actual declarations for.
    DependsOn,
    /// A dependency granting access to the target's internal declarations.
    Friend,
}

impl EdgeKind {
    /// All edge kinds, in declaration order.
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Regular, EdgeKind::DependsOn, EdgeKind::Friend];
}

/// The raw description of one module: its name, platform and edges.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Interned module name.
    pub name: Ident,
    /// Target platform.
    pub platform: Platform,
    /// Regular dependencies.
    pub dependencies: Vec<ModuleId>,
    /// Refines (dependsOn) edges.
    pub depends_on: Vec<ModuleId>,
    /// Friend edges.
    pub friends: Vec<ModuleId>,
}

impl ModuleDescriptor {
    /// Returns the raw edge list of the given kind.
    pub fn edges(&self, kind: EdgeKind) -> &[ModuleId] {
        match kind {
            EdgeKind::Regular => &self.dependencies,
            EdgeKind::DependsOn => &self.depends_on,
            EdgeKind::Friend => &self.friends,
        }
    }
}

/// A module declaration by name, consumed by [`ProjectModelBuilder`].
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    name: String,
    platform: Platform,
    dependencies: Vec<String>,
    depends_on: Vec<String>,
    friends: Vec<String>,
}

impl ModuleSpec {
    /// Starts a module with no edges.
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
            dependencies: Vec::new(),
            depends_on: Vec::new(),
            friends: Vec::new(),
        }
    }

    /// Adds a regular dependency.
    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Adds a dependsOn edge.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Adds a friend edge.
    pub fn friend(mut self, name: impl Into<String>) -> Self {
        self.friends.push(name.into());
        self
    }
}

/// Collects [`ModuleSpec`]s and validates them into a [`ProjectModel`].
pub struct ProjectModelBuilder {
    interner: Arc<Interner>,
    specs: Vec<ModuleSpec>,
}

impl ProjectModelBuilder {
    /// Adds a module to the project.
    pub fn add_module(&mut self, spec: ModuleSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    /// Resolves edge names and rejects duplicate modules, unknown edge
    /// targets and cycles.
    pub fn build(self) -> Result<Arc<ProjectModel>, GraphError> {
        let interner = self.interner;
        let mut modules: Arena<ModuleId, ModuleDescriptor> = Arena::new();
        let mut by_name: FxHashMap<Ident, ModuleId> = FxHashMap::default();

        for spec in &self.specs {
            let name = interner.get_or_intern(&spec.name);
            if by_name.insert(name, modules.next_id()).is_some() {
                return Err(GraphError::DuplicateModule(spec.name.clone()));
            }
            modules.alloc(ModuleDescriptor {
                name,
                platform: spec.platform,
                dependencies: Vec::new(),
                depends_on: Vec::new(),
                friends: Vec::new(),
            });
        }

        let resolve = |module: &str, targets: &[String]| -> Result<Vec<ModuleId>, GraphError> {
            targets
                .iter()
                .map(|target| {
                    interner
                        .get(target)
                        .and_then(|ident| by_name.get(&ident).copied())
                        .ok_or_else(|| GraphError::UnknownModule {
                            module: module.to_string(),
                            dependency: target.clone(),
                        })
                })
                .collect()
        };

        for (index, spec) in self.specs.iter().enumerate() {
            let dependencies = resolve(&spec.name, &spec.dependencies)?;
            let depends_on = resolve(&spec.name, &spec.depends_on)?;
            let friends = resolve(&spec.name, &spec.friends)?;
            if let Some(descriptor) = modules.get_mut(ModuleId::from_raw(index as u32)) {
                descriptor.dependencies = dependencies;
                descriptor.depends_on = depends_on;
                descriptor.friends = friends;
            }
        }

        check_acyclic(&modules, &interner)?;
        tracing::debug!(modules = modules.len(), "built project model");

        Ok(Arc::new(ProjectModel {
            interner,
            modules,
            by_name,
            valid: AtomicBool::new(true),
        }))
    }
}

/// Rejects self edges and any strongly connected component with more than
/// one module, over the union of all edge kinds.
fn check_acyclic(
    modules: &Arena<ModuleId, ModuleDescriptor>,
    interner: &Interner,
) -> Result<(), GraphError> {
    let mut graph: DiGraph<ModuleId, EdgeKind> = DiGraph::with_capacity(modules.len(), 0);
    let nodes: Vec<NodeIndex> = modules.ids().map(|id| graph.add_node(id)).collect();

    for (id, descriptor) in modules.iter() {
        for kind in EdgeKind::ALL {
            for &target in descriptor.edges(kind) {
                if target == id {
                    return Err(GraphError::CyclicModuleGraph {
                        cycle: vec![interner.resolve(descriptor.name).to_string()],
                    });
                }
                graph.add_edge(
                    nodes[id.as_raw() as usize],
                    nodes[target.as_raw() as usize],
                    kind,
                );
            }
        }
    }

    if let Some(component) = tarjan_scc(&graph).into_iter().find(|c| c.len() > 1) {
        let mut cycle: Vec<String> = component
            .into_iter()
            .map(|node| interner.resolve(modules[graph[node]].name).to_string())
            .collect();
        cycle.sort();
        return Err(GraphError::CyclicModuleGraph { cycle });
    }
    Ok(())
}

/// The immutable module description of one project snapshot.
///
/// Invalidated as a whole when the project changes; sessions built on it are
/// expected to be discarded by their owner.
pub struct ProjectModel {
    interner: Arc<Interner>,
    modules: Arena<ModuleId, ModuleDescriptor>,
    by_name: FxHashMap<Ident, ModuleId>,
    valid: AtomicBool,
}

impl ProjectModel {
    /// Starts building a project whose names are interned in `interner`.
    pub fn builder(interner: Arc<Interner>) -> ProjectModelBuilder {
        ProjectModelBuilder {
            interner,
            specs: Vec::new(),
        }
    }

    /// Builds the project model described by the `[modules]` table of a
    /// project configuration.
    pub fn from_config(
        config: &ProjectConfig,
        interner: Arc<Interner>,
    ) -> Result<Arc<ProjectModel>, GraphError> {
        let mut builder = Self::builder(interner);
        for (name, module) in &config.modules {
            let mut spec = ModuleSpec::new(name.clone(), module.platform);
            spec.dependencies = module.dependencies.clone();
            spec.depends_on = module.depends_on.clone();
            spec.friends = module.friends.clone();
            builder.add_module(spec);
        }
        builder.build()
    }

    /// Returns the interner shared by every session of this project.
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    /// Returns the descriptor of a module.
    pub fn descriptor(&self, id: ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(id)
    }

    /// Returns the number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if the project has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns a handle to the module called `name`.
    pub fn handle(self: &Arc<Self>, name: &str) -> Option<ModuleHandle> {
        let ident = self.interner.get(name)?;
        let id = *self.by_name.get(&ident)?;
        Some(ModuleHandle::new(Arc::clone(self), id))
    }

    /// Returns handles to every module, in declaration order.
    pub fn handles(self: &Arc<Self>) -> Vec<ModuleHandle> {
        self.modules
            .ids()
            .map(|id| ModuleHandle::new(Arc::clone(self), id))
            .collect()
    }

    /// Returns the modules that no other module refines through a dependsOn
    /// edge. The remaining modules are analysed as part of the modules that
    /// refine them.
    pub fn analysis_roots(self: &Arc<Self>) -> Vec<ModuleHandle> {
        let refined: Vec<ModuleId> = self
            .modules
            .as_slice()
            .iter()
            .flat_map(|d| d.depends_on.iter().copied())
            .collect();
        self.modules
            .ids()
            .filter(|id| !refined.contains(id))
            .map(|id| ModuleHandle::new(Arc::clone(self), id))
            .collect()
    }

    /// Marks this snapshot as stale. Handles keep working but report
    /// [`is_valid`](ModuleHandle::is_valid) as `false`.
    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::AcqRel) {
            tracing::debug!(modules = self.modules.len(), "project model invalidated");
        }
    }

    /// Returns `false` once [`invalidate`](Self::invalidate) has been called.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ProjectModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectModel")
            .field("modules", &self.modules.len())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Identity of a module within a project snapshot.
///
/// Two handles are equal when they point at the same module of the same
/// [`ProjectModel`] instance, regardless of how they were obtained.
#[derive(Clone)]
pub struct ModuleHandle {
    project: Arc<ProjectModel>,
    id: ModuleId,
}

impl ModuleHandle {
    pub(crate) fn new(project: Arc<ProjectModel>, id: ModuleId) -> Self {
        Self { project, id }
    }

    /// Returns the module's ID within its project.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Returns the project this module belongs to.
    pub fn project(&self) -> &Arc<ProjectModel> {
        &self.project
    }

    /// Returns the raw description of the module.
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.project.modules[self.id]
    }

    /// Returns the interned module name.
    pub fn name(&self) -> Ident {
        self.descriptor().name
    }

    /// Returns the module name as a string.
    pub fn name_str(&self) -> &str {
        self.project.interner.resolve(self.descriptor().name)
    }

    /// Returns the module's platform.
    pub fn platform(&self) -> Platform {
        self.descriptor().platform
    }

    /// Returns handles for the raw edges of the given kind.
    pub fn raw_edges(&self, kind: EdgeKind) -> Vec<ModuleHandle> {
        self.descriptor()
            .edges(kind)
            .iter()
            .map(|&id| ModuleHandle::new(Arc::clone(&self.project), id))
            .collect()
    }

    /// Returns `false` once the owning project snapshot has been invalidated.
    pub fn is_valid(&self) -> bool {
        self.project.is_valid()
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.project, &other.project) && self.id == other.id
    }
}

impl Eq for ModuleHandle {}

impl Hash for ModuleHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.project) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleHandle({})", self.name_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interner() -> Arc<Interner> {
        Arc::new(Interner::new())
    }

    #[test]
    fn build_resolves_edges() {
        let mut builder = ProjectModel::builder(interner());
        builder
            .add_module(ModuleSpec::new("app", Platform::Jvm).dependency("lib"))
            .add_module(ModuleSpec::new("lib", Platform::Jvm));
        let project = builder.build().unwrap();
        let app = project.handle("app").unwrap();
        let edges = app.raw_edges(EdgeKind::Regular);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].name_str(), "lib");
        assert!(app.raw_edges(EdgeKind::Friend).is_empty());
    }

    #[test]
    fn duplicate_module_rejected() {
        let mut builder = ProjectModel::builder(interner());
        builder
            .add_module(ModuleSpec::new("app", Platform::Jvm))
            .add_module(ModuleSpec::new("app", Platform::Js));
        assert_eq!(
            builder.build().unwrap_err(),
            GraphError::DuplicateModule("app".into())
        );
    }

    #[test]
    fn unknown_edge_target_rejected() {
        let mut builder = ProjectModel::builder(interner());
        builder.add_module(ModuleSpec::new("app", Platform::Jvm).friend("ghost"));
        assert!(matches!(
            builder.build().unwrap_err(),
            GraphError::UnknownModule { ref dependency, .. } if dependency == "ghost"
        ));
    }

    #[test]
    fn cycle_rejected_with_names() {
        let mut builder = ProjectModel::builder(interner());
        builder
            .add_module(ModuleSpec::new("a", Platform::Jvm).dependency("b"))
            .add_module(ModuleSpec::new("b", Platform::Jvm).depends_on("c"))
            .add_module(ModuleSpec::new("c", Platform::Common).friend("a"))
            .add_module(ModuleSpec::new("d", Platform::Jvm).dependency("a"));
        assert_eq!(
            builder.build().unwrap_err(),
            GraphError::CyclicModuleGraph {
                cycle: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn self_edge_rejected() {
        let mut builder = ProjectModel::builder(interner());
        builder.add_module(ModuleSpec::new("a", Platform::Jvm).dependency("a"));
        assert!(matches!(
            builder.build().unwrap_err(),
            GraphError::CyclicModuleGraph { .. }
        ));
    }

    #[test]
    fn handles_equal_by_identity_not_by_instance() {
        let mut builder = ProjectModel::builder(interner());
        builder.add_module(ModuleSpec::new("app", Platform::Jvm));
        let project = builder.build().unwrap();
        assert_eq!(project.handle("app").unwrap(), project.handle("app").unwrap());

        // Same name in a different snapshot is a different module.
        let mut other = ProjectModel::builder(Arc::clone(project.interner()));
        other.add_module(ModuleSpec::new("app", Platform::Jvm));
        let other = other.build().unwrap();
        assert_ne!(project.handle("app").unwrap(), other.handle("app").unwrap());
    }

    #[test]
    fn analysis_roots_skip_refined_modules() {
        let mut builder = ProjectModel::builder(interner());
        builder
            .add_module(ModuleSpec::new("common", Platform::Common))
            .add_module(ModuleSpec::new("jvm", Platform::Jvm).depends_on("common"))
            .add_module(ModuleSpec::new("js", Platform::Js).depends_on("common"));
        let project = builder.build().unwrap();
        let roots: Vec<String> = project
            .analysis_roots()
            .iter()
            .map(|h| h.name_str().to_string())
            .collect();
        assert_eq!(roots, vec!["jvm", "js"]);
    }

    #[test]
    fn invalidate_marks_handles_stale() {
        let mut builder = ProjectModel::builder(interner());
        builder.add_module(ModuleSpec::new("app", Platform::Jvm));
        let project = builder.build().unwrap();
        let handle = project.handle("app").unwrap();
        assert!(handle.is_valid());
        project.invalidate();
        assert!(!handle.is_valid());
    }

    #[test]
    fn from_config_builds_model() {
        let config = strata_config::load_config_from_str(
            r#"
[project]
name = "p"

[modules.common]

[modules.jvm]
platform = "jvm"
depends_on = ["common"]
"#,
        )
        .unwrap();
        let project = ProjectModel::from_config(&config, interner()).unwrap();
        assert_eq!(project.len(), 2);
        let jvm = project.handle("jvm").unwrap();
        assert_eq!(jvm.platform(), Platform::Jvm);
        assert_eq!(jvm.raw_edges(EdgeKind::DependsOn)[0].name_str(), "common");
    }
}
