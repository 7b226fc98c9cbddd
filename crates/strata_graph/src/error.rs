//! Errors raised while building the module graph.

/// Errors describing a malformed module description.
///
/// These abort construction of the whole [`ProjectModel`](crate::ProjectModel);
/// no session is created for a project with a malformed graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An edge names a module that does not exist.
    #[error("module '{module}' depends on unknown module '{dependency}'")]
    UnknownModule {
        /// The module declaring the edge.
        module: String,
        /// The missing target of the edge.
        dependency: String,
    },

    /// Two modules were declared with the same name.
    #[error("module '{0}' is declared more than once")]
    DuplicateModule(String),

    /// The combined dependency edges form a cycle.
    #[error("cyclic module graph: {}", cycle.join(" -> "))]
    CyclicModuleGraph {
        /// Names of the modules on the cycle, sorted.
        cycle: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_display_lists_modules() {
        let err = GraphError::CyclicModuleGraph {
            cycle: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "cyclic module graph: a -> b");
    }

    #[test]
    fn unknown_module_display() {
        let err = GraphError::UnknownModule {
            module: "app".into(),
            dependency: "ghost".into(),
        };
        assert!(err.to_string().contains("ghost"));
    }
}
