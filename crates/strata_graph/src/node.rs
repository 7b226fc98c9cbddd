//! Lazily expanded module graph nodes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use strata_common::Ident;
use strata_config::Platform;

use crate::project::{EdgeKind, ModuleHandle};
use crate::services::{analyzer_services, AnalyzerServices};

/// A node of the module dependency graph.
///
/// Cloning is cheap. Equality and hashing depend only on the wrapped
/// [`ModuleHandle`], so a node obtained through an edge set is equal to a node
/// freshly constructed for the same handle.
///
/// Each edge set is computed on first access and published with
/// "compute, then publish if absent": concurrent first readers may each
/// compute the list, one of them is kept and the others are dropped. The
/// computation is pure, so every candidate is equal.
#[derive(Clone)]
pub struct ModuleNode {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    handle: ModuleHandle,
    dependencies: OnceLock<Vec<ModuleNode>>,
    depends_on: OnceLock<Vec<ModuleNode>>,
    friends: OnceLock<Vec<ModuleNode>>,
}

impl ModuleNode {
    /// Wraps a module handle. No edges are computed yet.
    pub fn new(handle: ModuleHandle) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                handle,
                dependencies: OnceLock::new(),
                depends_on: OnceLock::new(),
                friends: OnceLock::new(),
            }),
        }
    }

    /// Returns the wrapped module handle.
    pub fn handle(&self) -> &ModuleHandle {
        &self.inner.handle
    }

    /// Returns the interned module name.
    pub fn name(&self) -> Ident {
        self.inner.handle.name()
    }

    /// Returns the module name as a string.
    pub fn name_str(&self) -> &str {
        self.inner.handle.name_str()
    }

    /// Returns the module's platform.
    pub fn platform(&self) -> Platform {
        self.inner.handle.platform()
    }

    /// Returns the analyzer services of the module's platform.
    pub fn analyzer_services(&self) -> &'static AnalyzerServices {
        analyzer_services(self.platform())
    }

    /// Regular compile dependencies.
    pub fn dependencies(&self) -> &[ModuleNode] {
        self.edges(EdgeKind::Regular)
    }

    /// Modules this module refines.
    pub fn depends_on_dependencies(&self) -> &[ModuleNode] {
        self.edges(EdgeKind::DependsOn)
    }

    /// Modules whose internal declarations this module may access.
    pub fn friend_dependencies(&self) -> &[ModuleNode] {
        self.edges(EdgeKind::Friend)
    }

    /// Returns the edge set of the given kind, computing it on first access.
    pub fn edges(&self, kind: EdgeKind) -> &[ModuleNode] {
        let cell = match kind {
            EdgeKind::Regular => &self.inner.dependencies,
            EdgeKind::DependsOn => &self.inner.depends_on,
            EdgeKind::Friend => &self.inner.friends,
        };
        if let Some(nodes) = cell.get() {
            return nodes;
        }
        let computed: Vec<ModuleNode> = self
            .inner
            .handle
            .raw_edges(kind)
            .into_iter()
            .map(ModuleNode::new)
            .collect();
        tracing::trace!(
            module = self.name_str(),
            ?kind,
            count = computed.len(),
            "computed module edges"
        );
        // A racing reader may have published first; `computed` is then dropped.
        cell.get_or_init(move || computed)
    }

    /// This module and every module it refines, dependency-first.
    /// See [`depends_on_closure`](crate::order::depends_on_closure).
    pub fn depends_on_closure(&self) -> Vec<ModuleNode> {
        crate::order::depends_on_closure(self)
    }

    /// Returns `true` if `other` is reachable through a friend edge, which
    /// grants access to its internal declarations.
    pub fn is_friend_of(&self, other: &ModuleNode) -> bool {
        self.friend_dependencies().contains(other)
    }
}

impl PartialEq for ModuleNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for ModuleNode {}

impl Hash for ModuleNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.handle.hash(state);
    }
}

impl fmt::Debug for ModuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleNode({})", self.name_str())
    }
}
