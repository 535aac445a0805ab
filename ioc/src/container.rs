//! The thread-safe, scoped `Container` and its associated methods.

use crate::core::{factory_failure, slot_id, ConstructionGuard, Lifecycle};
use crate::error::{BoxError, ResolveError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

// Every instance is stored as a boxed `Arc<T>`, which lets `T` be unsized
// (trait objects) while the registry stays fully type-erased.
type Instance = Box<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&Container) -> Result<Instance, BoxError> + Send + Sync>;

fn erase<T: ?Sized + Any + Send + Sync>(service: Arc<T>) -> Instance {
  Box::new(service)
}

enum Provider {
  Singleton {
    cell: OnceCell<Instance>,
    factory: Factory,
  },
  Transient {
    factory: Factory,
  },
}

struct Registration {
  /// `TypeId` of the stored `Arc<T>`.
  instance_type: TypeId,
  service_type: &'static str,
  provider: Provider,
}

impl Registration {
  fn new<T: ?Sized + Any>(lifecycle: Lifecycle, factory: Factory) -> Self {
    let provider = match lifecycle {
      Lifecycle::Singleton => Provider::Singleton {
        cell: OnceCell::new(),
        factory,
      },
      Lifecycle::Transient => Provider::Transient { factory },
    };
    Self {
      instance_type: TypeId::of::<Arc<T>>(),
      service_type: type_name::<T>(),
      provider,
    }
  }

  fn lifecycle(&self) -> Lifecycle {
    match self.provider {
      Provider::Singleton { .. } => Lifecycle::Singleton,
      Provider::Transient { .. } => Lifecycle::Transient,
    }
  }
}

struct Slot {
  /// Position of the name in registration order. Kept when the name is re-registered.
  order: u64,
  registration: Arc<Registration>,
}

struct Inner {
  providers: DashMap<String, Slot>,
  next_order: AtomicU64,
  parent: Option<Container>,
  depth: usize,
}

impl Drop for Inner {
  // Releases the ancestor chain iteratively, so dropping a deep chain of
  // scopes does not recurse once per level.
  fn drop(&mut self) {
    let mut next = self.parent.take();
    while let Some(container) = next {
      next = Arc::into_inner(container.inner).and_then(|mut inner| inner.parent.take());
    }
  }
}

/// A scoped Inversion of Control (IoC) container.
///
/// A `Container` owns a registry of named service factories and the singleton
/// instances they produced. It is a cheap, clonable handle: clones share the
/// same registry.
///
/// Containers form a tree. [`create_child`](Container::create_child) derives a
/// scope that sees every registration of its ancestors and may shadow any of
/// them by registering the same name, without affecting the ancestors or its
/// siblings.
///
/// Lookups never hold a registry lock while a factory runs, so factories can
/// register and resolve freely, including on the container they belong to.
///
/// A cached singleton that keeps a `Container` clone of its own scope (or of a
/// descendant) forms a reference cycle, and that scope is never dropped. Such
/// services should hold a [`WeakContainer`] from [`downgrade`](Container::downgrade).
#[derive(Clone)]
pub struct Container {
  inner: Arc<Inner>,
}

impl Default for Container {
  fn default() -> Self {
    Self::with_parent(None)
  }
}

impl Container {
  /// Creates a new, empty root `Container`.
  pub fn new() -> Self {
    Self::default()
  }

  // --- PRIVATE HELPERS ---

  fn with_parent(parent: Option<Container>) -> Self {
    let depth = parent.as_ref().map_or(0, |p| p.depth() + 1);
    Self {
      inner: Arc::new(Inner {
        providers: DashMap::new(),
        next_order: AtomicU64::new(0),
        parent,
        depth,
      }),
    }
  }

  fn insert(&self, name: &str, registration: Registration) {
    let lifecycle = registration.lifecycle();
    let service_type = registration.service_type;
    let registration = Arc::new(registration);

    // The replaced registration (and its cached instance) is dropped only after
    // the shard lock is released, since a service's `Drop` may use the container.
    let previous = match self.inner.providers.entry(name.to_owned()) {
      Entry::Occupied(mut slot) => Some(std::mem::replace(
        &mut slot.get_mut().registration,
        registration,
      )),
      Entry::Vacant(slot) => {
        slot.insert(Slot {
          order: self.inner.next_order.fetch_add(1, Ordering::Relaxed),
          registration,
        });
        None
      }
    };

    tracing::debug!(
      service = name,
      %lifecycle,
      service_type,
      depth = self.inner.depth,
      replaced = previous.is_some(),
      "registered service"
    );
    drop(previous);
  }

  fn lookup(&self, name: &str) -> Option<Arc<Registration>> {
    self
      .inner
      .providers
      .get(name)
      .map(|slot| Arc::clone(&slot.registration))
  }

  fn realize<T: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
    registration: &Arc<Registration>,
  ) -> Result<Arc<T>, ResolveError> {
    let mismatch = || ResolveError::TypeMismatch {
      name: name.to_owned(),
      expected: type_name::<T>(),
      actual: registration.service_type,
    };
    if registration.instance_type != TypeId::of::<Arc<T>>() {
      return Err(mismatch());
    }

    match &registration.provider {
      Provider::Singleton { cell, factory } => {
        let instance = match cell.get() {
          Some(instance) => instance,
          None => {
            let _guard = ConstructionGuard::enter(slot_id(Arc::as_ptr(registration)), name)?;
            cell
              .get_or_try_init(|| {
                tracing::debug!(service = name, depth = self.inner.depth, "realizing singleton");
                factory(self)
              })
              .map_err(factory_failure)?
          }
        };
        instance
          .downcast_ref::<Arc<T>>()
          .cloned()
          .ok_or_else(mismatch)
      }
      Provider::Transient { factory } => {
        let _guard = ConstructionGuard::enter(slot_id(Arc::as_ptr(registration)), name)?;
        let instance = factory(self).map_err(factory_failure)?;
        instance
          .downcast::<Arc<T>>()
          .map(|boxed| *boxed)
          .map_err(|_| mismatch())
      }
    }
  }

  // --- PUBLIC API ---

  // --- Registration ---

  /// Registers `factory` under `name` in this container's own registry.
  ///
  /// The factory runs lazily and receives the container that owns the
  /// registration, so it can resolve its own dependencies from the same scope.
  /// Registering a name that already exists replaces the previous registration
  /// and discards any instance it had cached.
  ///
  /// A singleton built by `factory` must not store `c.clone()`; keep
  /// `c.downgrade()` instead, or the scope will never be released.
  pub fn register<T: Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> T + Send + Sync + 'static,
    lifecycle: Lifecycle,
  ) {
    let factory: Factory = Box::new(move |c: &Container| -> Result<Instance, BoxError> {
      Ok(erase(Arc::new(factory(c))))
    });
    self.insert(name, Registration::new::<T>(lifecycle, factory));
  }

  /// Registers a factory that may fail.
  ///
  /// An error returned by the factory surfaces from [`resolve`](Container::resolve)
  /// as [`ResolveError::Factory`], unless it is itself a `ResolveError`, in which
  /// case it is returned unchanged. A failed singleton stays unrealized.
  pub fn try_register<T, E>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> Result<T, E> + Send + Sync + 'static,
    lifecycle: Lifecycle,
  ) where
    T: Any + Send + Sync,
    E: Into<BoxError>,
  {
    let factory: Factory = Box::new(move |c: &Container| -> Result<Instance, BoxError> {
      factory(c)
        .map(|service| erase(Arc::new(service)))
        .map_err(Into::into)
    });
    self.insert(name, Registration::new::<T>(lifecycle, factory));
  }

  /// Registers a factory producing a trait object, resolvable as `resolve::<dyn Trait>`.
  pub fn register_trait<I: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> Arc<I> + Send + Sync + 'static,
    lifecycle: Lifecycle,
  ) {
    let factory: Factory = Box::new(move |c: &Container| -> Result<Instance, BoxError> {
      Ok(erase(factory(c)))
    });
    self.insert(name, Registration::new::<I>(lifecycle, factory));
  }

  pub fn add_singleton<T: Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> T + Send + Sync + 'static,
  ) {
    self.register(name, factory, Lifecycle::Singleton);
  }

  pub fn add_transient<T: Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> T + Send + Sync + 'static,
  ) {
    self.register(name, factory, Lifecycle::Transient);
  }

  pub fn add_singleton_trait<I: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> Arc<I> + Send + Sync + 'static,
  ) {
    self.register_trait(name, factory, Lifecycle::Singleton);
  }

  pub fn add_transient_trait<I: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
    factory: impl Fn(&Container) -> Arc<I> + Send + Sync + 'static,
  ) {
    self.register_trait(name, factory, Lifecycle::Transient);
  }

  /// Registers an already constructed value as a realized singleton.
  pub fn add_instance<T: Any + Send + Sync>(&self, name: &str, instance: T) {
    let factory: Factory = Box::new(|_: &Container| -> Result<Instance, BoxError> {
      panic!("pre-initialized singleton factory should not be called")
    });
    let registration = Registration {
      instance_type: TypeId::of::<Arc<T>>(),
      service_type: type_name::<T>(),
      provider: Provider::Singleton {
        cell: OnceCell::with_value(erase(Arc::new(instance))),
        factory,
      },
    };
    self.insert(name, registration);
  }

  // --- Resolution ---

  /// Resolves the service registered under `name`.
  ///
  /// The name is looked up in this container first, then in each ancestor in
  /// turn. The first registration found wins; a singleton is realized and
  /// cached by the container that owns it.
  pub fn resolve<T: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
  ) -> Result<Arc<T>, ResolveError> {
    let mut scope = self;
    loop {
      if let Some(registration) = scope.lookup(name) {
        tracing::trace!(service = name, depth = scope.inner.depth, "resolving from owning scope");
        return scope.realize(name, &registration);
      }
      match scope.parent() {
        Some(parent) => {
          tracing::trace!(service = name, depth = scope.inner.depth, "delegating to parent");
          scope = parent;
        }
        None => {
          return Err(ResolveError::NotFound {
            name: name.to_owned(),
          })
        }
      }
    }
  }

  /// Resolves a service, returning `None` on any failure.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
    self.resolve(name).ok()
  }

  // --- Introspection ---

  /// Returns `true` if `name` is registered here or in any ancestor.
  pub fn has(&self, name: &str) -> bool {
    self
      .ancestors()
      .any(|scope| scope.inner.providers.contains_key(name))
  }

  /// This container followed by each of its ancestors, nearest first.
  pub fn ancestors(&self) -> impl Iterator<Item = &Container> {
    std::iter::successors(Some(self), |scope| scope.parent())
  }

  /// Names registered in this container's own registry, in registration order.
  pub fn service_names(&self) -> Vec<String> {
    let mut names: Vec<(u64, String)> = self
      .inner
      .providers
      .iter()
      .map(|slot| (slot.value().order, slot.key().clone()))
      .collect();
    names.sort_unstable_by_key(|(order, _)| *order);
    names.into_iter().map(|(_, name)| name).collect()
  }

  pub fn len(&self) -> usize {
    self.inner.providers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.providers.is_empty()
  }

  pub fn parent(&self) -> Option<&Container> {
    self.inner.parent.as_ref()
  }

  /// Number of ancestors; `0` for a root container.
  pub fn depth(&self) -> usize {
    self.inner.depth
  }

  /// Returns `true` if both handles refer to the same container.
  pub fn ptr_eq(this: &Container, other: &Container) -> bool {
    Arc::ptr_eq(&this.inner, &other.inner)
  }

  /// Creates a non-owning handle to this container.
  pub fn downgrade(&self) -> WeakContainer {
    WeakContainer {
      inner: Arc::downgrade(&self.inner),
    }
  }

  // --- Scope management ---

  /// Removes every registration and cached instance owned by this container.
  ///
  /// Ancestors and children are untouched.
  pub fn clear(&self) {
    let names: Vec<String> = self
      .inner
      .providers
      .iter()
      .map(|slot| slot.key().clone())
      .collect();
    let removed: Vec<(String, Slot)> = names
      .iter()
      .filter_map(|name| self.inner.providers.remove(name))
      .collect();
    tracing::debug!(depth = self.inner.depth, removed = removed.len(), "cleared container");
    drop(removed);
  }

  /// Creates a child scope whose parent is this container.
  pub fn create_child(&self) -> Container {
    let child = Self::with_parent(Some(self.clone()));
    tracing::debug!(depth = child.depth(), "created child container");
    child
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("depth", &self.inner.depth)
      .field("services", &self.service_names())
      .finish()
  }
}

/// A non-owning handle to a [`Container`], obtained from [`Container::downgrade`].
///
/// Services that need to reach back into their scope after construction hold
/// one of these, so the scope can still be dropped.
#[derive(Clone, Default)]
pub struct WeakContainer {
  inner: Weak<Inner>,
}

impl WeakContainer {
  /// Returns the container if it is still alive.
  pub fn upgrade(&self) -> Option<Container> {
    self.inner.upgrade().map(|inner| Container { inner })
  }
}

impl fmt::Debug for WeakContainer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeakContainer")
      .field("alive", &(self.inner.strong_count() > 0))
      .finish()
  }
}
