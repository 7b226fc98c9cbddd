//! Typed service registry of a resolution session.

use std::any::{type_name, Any, TypeId};
use std::sync::{Arc, OnceLock};

use rustc_hash::{FxHashMap, FxHashSet};
use strata_common::Ident;

use crate::error::ResolveError;

type AnyService = Arc<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn() -> AnyService + Send + Sync>;

enum ServiceEntry {
    Ready(AnyService),
    Lazy {
        factory: Factory,
        instance: OnceLock<AnyService>,
    },
}

/// Services keyed by their Rust type.
///
/// Registration happens once, while a session is configured. After that the
/// registry is read-only, except that lazily registered services are built on
/// first request.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: FxHashMap<TypeId, ServiceEntry>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `instance` as the service of type `T`.
    pub fn register<T: Any + Send + Sync>(&mut self, instance: T) -> Result<(), ResolveError> {
        self.insert::<T>(ServiceEntry::Ready(Arc::new(instance)))
    }

    /// Binds a factory that builds the service of type `T` on first request.
    pub fn register_lazy<T, F>(&mut self, factory: F) -> Result<(), ResolveError>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceEntry::Lazy {
            factory: Box::new(move || Arc::new(factory()) as AnyService),
            instance: OnceLock::new(),
        })
    }

    fn insert<T: Any>(&mut self, entry: ServiceEntry) -> Result<(), ResolveError> {
        let key = TypeId::of::<T>();
        if self.entries.contains_key(&key) {
            return Err(ResolveError::DuplicateRegistration(type_name::<T>()));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Returns `true` if a service of type `T` is bound.
    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Returns the service of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        let service = match self.entries.get(&TypeId::of::<T>()) {
            Some(ServiceEntry::Ready(instance)) => Arc::clone(instance),
            Some(ServiceEntry::Lazy { factory, instance }) => {
                Arc::clone(instance.get_or_init(|| factory()))
            }
            None => return Err(ResolveError::ServiceNotFound(type_name::<T>())),
        };
        service
            .downcast::<T>()
            .map_err(|_| ResolveError::ServiceNotFound(type_name::<T>()))
    }

    /// Returns the number of bound services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no service is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names exported by modules that are not analysed in this session.
///
/// The supertype resolver consults it to bind references into dependency
/// modules. Sessions register an empty index lazily unless the caller binds
/// one.
#[derive(Debug, Default, Clone)]
pub struct ExternalSymbols {
    exports: FxHashMap<Ident, FxHashSet<Ident>>,
}

impl ExternalSymbols {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `module` exports `name`.
    pub fn export(mut self, module: Ident, name: Ident) -> Self {
        self.exports.entry(module).or_default().insert(name);
        self
    }

    /// Returns `true` if `module` exports `name`.
    pub fn exports(&self, module: Ident, name: Ident) -> bool {
        self.exports
            .get(&module)
            .is_some_and(|names| names.contains(&name))
    }
}
