//! Layered service resolution.
//!
//! A [`Container`] maps a requested type to an instance. Containers can be
//! stacked: a child created with [`Container::scoped`] shadows or adds
//! bindings on top of a shared parent without mutating it. The pipeline
//! builder uses this to expose build-specific services (such as the resource
//! collection being assembled) while still falling back to the
//! application-wide container.
//!
//! # Example
//!
//! ```rust
//! use translucent_core::di::Container;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut app = Container::new();
//! app.register(Arc::new(Database { url: "postgres://localhost/db".to_string() }));
//!
//! let mut scope = Container::scoped(Arc::new(app));
//! scope.register(Arc::new(42_u32));
//!
//! let db: Arc<Database> = scope.resolve().unwrap();
//! assert_eq!(db.url, "postgres://localhost/db");
//! assert_eq!(*scope.resolve::<u32>().unwrap(), 42);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Container) -> Service + Send + Sync>;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionError {
    /// The type name that could not be resolved.
    pub type_name: &'static str,
    /// The reason for the failure.
    pub reason: String,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to inject {}: {}", self.type_name, self.reason)
    }
}

impl std::error::Error for InjectionError {}

impl InjectionError {
    /// Creates a new injection error for a missing service.
    pub fn not_registered<T>() -> Self {
        Self::missing(std::any::type_name::<T>())
    }

    /// Creates a missing-service error from a type name alone.
    ///
    /// Used where only the erased [`TypeId`] and its name are known.
    pub fn missing(type_name: &'static str) -> Self {
        Self {
            type_name,
            reason: "service not registered in any resolver layer".to_string(),
        }
    }

    /// Creates a new injection error with a custom reason.
    pub fn custom<T>(reason: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone)]
enum Registration {
    Singleton(Service),
    Factory(Factory),
}

/// A layered dependency injection container.
///
/// Registrations are keyed by type. Singletons are shared `Arc`s handed out on
/// every resolution; factories run on every resolution and are the way to
/// provide per-call values. Lookups that miss the local layer are delegated to
/// the parent, if any.
///
/// # Thread Safety
///
/// The container is `Send + Sync` and is shared behind an `Arc` once a
/// pipeline is built. Registration requires `&mut self` and happens before
/// that point.
#[derive(Default, Clone)]
pub struct Container {
    services: HashMap<TypeId, Registration>,
    parent: Option<Arc<Container>>,
}

impl Container {
    /// Creates a new empty root container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            parent: None,
        }
    }

    /// Creates an empty layer on top of `parent`.
    ///
    /// Bindings added to the new layer shadow the parent's. The parent is
    /// never modified.
    #[must_use]
    pub fn scoped(parent: Arc<Container>) -> Self {
        Self {
            services: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Re-parents this layer, keeping its own registrations.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<Container>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Registers a shared service in this layer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use translucent_core::di::Container;
    /// use std::sync::Arc;
    ///
    /// struct MyService;
    ///
    /// let mut container = Container::new();
    /// container.register(Arc::new(MyService));
    /// assert!(container.contains::<MyService>());
    /// ```
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services
            .insert(TypeId::of::<T>(), Registration::Singleton(service));
    }

    /// Registers a factory that produces a fresh `T` on every resolution.
    ///
    /// The factory receives the container the lookup started from, so it
    /// sees bindings shadowed by child layers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use translucent_core::di::Container;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// static NEXT: AtomicU32 = AtomicU32::new(0);
    ///
    /// let mut container = Container::new();
    /// container.register_factory(|_| NEXT.fetch_add(1, Ordering::SeqCst));
    ///
    /// let first = container.resolve::<u32>().unwrap();
    /// let second = container.resolve::<u32>().unwrap();
    /// assert_ne!(*first, *second);
    /// ```
    pub fn register_factory<T, F>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |origin| Arc::new(factory(origin)) as Service);
        self.services
            .insert(TypeId::of::<T>(), Registration::Factory(factory));
    }

    /// Resolves a service, searching this layer and then its ancestors.
    ///
    /// Returns `None` if no layer can satisfy the type.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve_any(TypeId::of::<T>())
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Resolves a service or returns an error.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the service is not registered in any layer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use translucent_core::di::Container;
    /// use std::sync::Arc;
    ///
    /// struct MyService;
    ///
    /// let container = Container::new();
    /// let result: Result<Arc<MyService>, _> = container.resolve_required();
    /// assert!(result.is_err());
    /// ```
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve().ok_or_else(InjectionError::not_registered::<T>)
    }

    /// Resolves a type-erased service by [`TypeId`].
    #[must_use]
    pub fn resolve_any(&self, type_id: TypeId) -> Option<Service> {
        self.lookup(type_id, self)
    }

    fn lookup(&self, type_id: TypeId, origin: &Container) -> Option<Service> {
        match self.services.get(&type_id) {
            Some(Registration::Singleton(service)) => Some(Arc::clone(service)),
            Some(Registration::Factory(factory)) => Some(factory(origin)),
            None => self
                .parent
                .as_deref()
                .and_then(|parent| parent.lookup(type_id, origin)),
        }
    }

    /// Checks if a service is resolvable from this layer or an ancestor.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    /// Checks resolvability by [`TypeId`].
    #[must_use]
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.services.contains_key(&type_id)
            || self
                .parent
                .as_deref()
                .is_some_and(|parent| parent.contains_type(type_id))
    }

    /// Returns the number of services registered in this layer only.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if this layer has no registrations of its own.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns the number of layers, counting this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.parent.as_deref().map_or(0, Container::depth)
    }

    /// Returns the parent layer, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Container>> {
        self.parent.as_ref()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .field("depth", &self.depth())
            .finish()
    }
}

/// A resolved dependency.
///
/// Middleware declare `Inject<T>` in their constructor and invoke-time
/// dependency lists; the pipeline fills them from explicit arguments or the
/// container.
#[derive(Clone)]
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    /// Creates a new `Inject` wrapper.
    pub fn new(inner: Arc<T>) -> Self {
        Self(inner)
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Converts into the inner `Arc`.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Extracts the service from a container.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the service is not registered.
    pub fn from_container(container: &Container) -> Result<Self, InjectionError> {
        container.resolve_required::<T>().map(Inject)
    }
}
