//! Ordering of modules along dependsOn edges.

use rustc_hash::FxHashSet;

use crate::node::ModuleNode;

/// Returns `module` together with every module it transitively refines,
/// ordered so that each module appears after all modules it refines. The
/// given module is always last.
///
/// Analysing a platform module analyses its common modules first, in this
/// order. The project model is acyclic, so the walk terminates.
pub fn depends_on_closure(module: &ModuleNode) -> Vec<ModuleNode> {
    let mut ordered = Vec::new();
    let mut visited: FxHashSet<ModuleNode> = FxHashSet::default();
    visit(module, &mut visited, &mut ordered);
    ordered
}

fn visit(module: &ModuleNode, visited: &mut FxHashSet<ModuleNode>, ordered: &mut Vec<ModuleNode>) {
    if !visited.insert(module.clone()) {
        return;
    }
    for refined in module.depends_on_dependencies() {
        visit(refined, visited, ordered);
    }
    ordered.push(module.clone());
}
