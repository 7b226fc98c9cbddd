//! One session per module and analysis configuration.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use strata_common::ContentHash;
use strata_config::AnalysisConfig;
use strata_graph::{ModuleNode, ProjectModel};

use crate::error::ResolveError;
use crate::session::{ResolutionSession, SessionBuilder};

/// Hands out resolution sessions for the modules of one project snapshot.
///
/// At most one session exists per module and analysis configuration
/// fingerprint. [`invalidate`](Self::invalidate) drops every session at once;
/// there is no finer-grained invalidation.
pub struct SessionProvider {
    project: Arc<ProjectModel>,
    sessions: Mutex<FxHashMap<(ModuleNode, ContentHash), Arc<ResolutionSession>>>,
}

impl SessionProvider {
    /// Creates a provider for `project`.
    pub fn new(project: Arc<ProjectModel>) -> Self {
        Self {
            project,
            sessions: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns the project the sessions analyse.
    pub fn project(&self) -> &Arc<ProjectModel> {
        &self.project
    }

    /// Returns the session for `module` under `config`, building it with
    /// `configure` if it does not exist yet.
    ///
    /// `configure` runs while the provider is locked and must not call back
    /// into the provider.
    pub fn get_or_create<F>(
        &self,
        module: &ModuleNode,
        config: &AnalysisConfig,
        configure: F,
    ) -> Result<Arc<ResolutionSession>, ResolveError>
    where
        F: FnOnce(SessionBuilder) -> Result<SessionBuilder, ResolveError>,
    {
        if !self.project.is_valid() {
            return Err(ResolveError::SessionInvalidated(
                module.name_str().to_string(),
            ));
        }
        let key = (module.clone(), config.fingerprint());
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(&key) {
            return Ok(Arc::clone(session));
        }
        let session = configure(SessionBuilder::new(module.clone(), config.clone()))?.build()?;
        tracing::debug!(
            module = module.name_str(),
            fingerprint = %key.1,
            "created resolution session"
        );
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    /// Returns the existing session for `module` under `config`.
    pub fn get(
        &self,
        module: &ModuleNode,
        config: &AnalysisConfig,
    ) -> Option<Arc<ResolutionSession>> {
        let key = (module.clone(), config.fingerprint());
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no session exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the project snapshot stale and drops every session with all of
    /// its caches. Sessions still held elsewhere refuse further resolution.
    pub fn invalidate(&self) {
        let dropped = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            let count = sessions.len();
            sessions.clear();
            count
        };
        self.project.invalidate();
        tracing::debug!(sessions = dropped, "invalidated project snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use strata_common::Interner;
    use strata_graph::{ModuleSpec, Platform};

    fn provider() -> (SessionProvider, ModuleNode) {
        let mut builder = ProjectModel::builder(Arc::new(Interner::new()));
        builder.add_module(ModuleSpec::new("app", Platform::Native));
        let project = builder.build().unwrap();
        let module = ModuleNode::new(project.handle("app").unwrap());
        (SessionProvider::new(project), module)
    }

    #[test]
    fn one_session_per_module_and_config() {
        let (provider, module) = provider();
        let config = AnalysisConfig::default();
        let a = provider.get_or_create(&module, &config, Ok).unwrap();
        let b = provider.get_or_create(&module, &config, Ok).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = AnalysisConfig {
            parallel: false,
            ..AnalysisConfig::default()
        };
        let c = provider.get_or_create(&module, &other, Ok).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn equal_nodes_share_a_session() {
        let (provider, module) = provider();
        let config = AnalysisConfig::default();
        let fresh = ModuleNode::new(module.handle().clone());
        let a = provider.get_or_create(&module, &config, Ok).unwrap();
        let b = provider.get_or_create(&fresh, &config, Ok).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_requests_build_once() {
        let (provider, module) = provider();
        let config = AnalysisConfig::default();
        let barrier = Barrier::new(8);
        let sessions: Vec<Arc<ResolutionSession>> = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..8 {
                handles.push(scope.spawn(|| {
                    barrier.wait();
                    provider.get_or_create(&module, &config, Ok).unwrap()
                }));
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn failed_configuration_is_not_cached() {
        let (provider, module) = provider();
        let config = AnalysisConfig::default();
        let err = provider
            .get_or_create(&module, &config, |_| {
                Err(ResolveError::ServiceNotFound("Index"))
            })
            .unwrap_err();
        assert_eq!(err, ResolveError::ServiceNotFound("Index"));
        assert!(provider.get(&module, &config).is_none());
    }

    #[test]
    fn invalidate_drops_sessions() {
        let (provider, module) = provider();
        let config = AnalysisConfig::default();
        let session = provider.get_or_create(&module, &config, Ok).unwrap();
        provider.invalidate();
        assert!(provider.is_empty());
        assert!(!session.is_valid());
        assert!(matches!(
            provider.get_or_create(&module, &config, Ok),
            Err(ResolveError::SessionInvalidated(_))
        ));
    }
}
