// ioc/src/local_container.rs

//! A single-threaded, non-thread-safe scoped container.

use crate::core::{factory_failure, slot_id, ConstructionGuard, Lifecycle};
use crate::error::{BoxError, ResolveError};
use once_cell::unsync::OnceCell;
use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type LocalInstance = Box<dyn Any>;
type LocalFactory = Box<dyn Fn(&LocalContainer) -> Result<LocalInstance, BoxError>>;

fn erase<T: ?Sized + Any>(service: Rc<T>) -> LocalInstance {
  Box::new(service)
}

// A local, non-thread-safe version of the provider.
// It uses `Rc` and `unsync::OnceCell`.
enum LocalProvider {
  Singleton {
    cell: OnceCell<LocalInstance>,
    factory: LocalFactory,
  },
  Transient {
    factory: LocalFactory,
  },
}

struct LocalRegistration {
  instance_type: TypeId,
  service_type: &'static str,
  provider: LocalProvider,
}

impl LocalRegistration {
  fn new<T: ?Sized + Any>(lifecycle: Lifecycle, factory: LocalFactory) -> Self {
    let provider = match lifecycle {
      Lifecycle::Singleton => LocalProvider::Singleton {
        cell: OnceCell::new(),
        factory,
      },
      Lifecycle::Transient => LocalProvider::Transient { factory },
    };
    Self {
      instance_type: TypeId::of::<Rc<T>>(),
      service_type: type_name::<T>(),
      provider,
    }
  }
}

struct LocalSlot {
  order: u64,
  registration: Rc<LocalRegistration>,
}

struct LocalInner {
  providers: RefCell<HashMap<String, LocalSlot>>,
  next_order: Cell<u64>,
  parent: Option<LocalContainer>,
  depth: usize,
}

impl Drop for LocalInner {
  // Same iterative release of the ancestor chain as the thread-safe container.
  fn drop(&mut self) {
    let mut next = self.parent.take();
    while let Some(container) = next {
      next = Rc::into_inner(container.inner).and_then(|mut inner| inner.parent.take());
    }
  }
}

/// A single-threaded, non-thread-safe scoped container.
///
/// Same semantics as [`Container`](crate::Container), but services are handed
/// out as `Rc<T>` and need not be `Send` or `Sync`. Registration takes `&self`
/// so factories, which receive the owning `LocalContainer`, can register too.
///
/// A cached singleton holding a clone of its own scope keeps that scope alive
/// forever; such services should capture what they need at construction time.
#[derive(Clone)]
pub struct LocalContainer {
  inner: Rc<LocalInner>,
}

impl Default for LocalContainer {
  fn default() -> Self {
    Self::with_parent(None)
  }
}

impl LocalContainer {
  /// Creates a new, empty root `LocalContainer`.
  pub fn new() -> Self {
    Self::default()
  }

  // --- PRIVATE HELPERS ---

  fn with_parent(parent: Option<LocalContainer>) -> Self {
    let depth = parent.as_ref().map_or(0, |p| p.depth() + 1);
    Self {
      inner: Rc::new(LocalInner {
        providers: RefCell::new(HashMap::new()),
        next_order: Cell::new(0),
        parent,
        depth,
      }),
    }
  }

  fn insert(&self, name: &str, registration: LocalRegistration) {
    let registration = Rc::new(registration);
    let previous = {
      let mut providers = self.inner.providers.borrow_mut();
      match providers.get_mut(name) {
        Some(slot) => Some(std::mem::replace(&mut slot.registration, registration)),
        None => {
          let order = self.inner.next_order.get();
          self.inner.next_order.set(order + 1);
          providers.insert(name.to_owned(), LocalSlot { order, registration });
          None
        }
      }
    };
    tracing::debug!(
      service = name,
      depth = self.inner.depth,
      replaced = previous.is_some(),
      "registered local service"
    );
    // Dropped outside the borrow: a service's `Drop` may use the container.
    drop(previous);
  }

  fn lookup(&self, name: &str) -> Option<Rc<LocalRegistration>> {
    self
      .inner
      .providers
      .borrow()
      .get(name)
      .map(|slot| Rc::clone(&slot.registration))
  }

  fn realize<T: ?Sized + Any>(
    &self,
    name: &str,
    registration: &Rc<LocalRegistration>,
  ) -> Result<Rc<T>, ResolveError> {
    let mismatch = || ResolveError::TypeMismatch {
      name: name.to_owned(),
      expected: type_name::<T>(),
      actual: registration.service_type,
    };
    if registration.instance_type != TypeId::of::<Rc<T>>() {
      return Err(mismatch());
    }

    match &registration.provider {
      LocalProvider::Singleton { cell, factory } => {
        let instance = match cell.get() {
          Some(instance) => instance,
          None => {
            let _guard = ConstructionGuard::enter(slot_id(Rc::as_ptr(registration)), name)?;
            cell
              .get_or_try_init(|| factory(self))
              .map_err(factory_failure)?
          }
        };
        instance.downcast_ref::<Rc<T>>().cloned().ok_or_else(mismatch)
      }
      LocalProvider::Transient { factory } => {
        let _guard = ConstructionGuard::enter(slot_id(Rc::as_ptr(registration)), name)?;
        factory(self)
          .map_err(factory_failure)?
          .downcast::<Rc<T>>()
          .map(|rc_in_a_box| *rc_in_a_box)
          .map_err(|_| mismatch())
      }
    }
  }

  // --- PUBLIC API ---

  // --- Registration ---

  pub fn register<T: Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> T + 'static,
    lifecycle: Lifecycle,
  ) {
    let factory: LocalFactory =
      Box::new(move |c: &LocalContainer| -> Result<LocalInstance, BoxError> {
        Ok(erase(Rc::new(factory(c))))
      });
    self.insert(name, LocalRegistration::new::<T>(lifecycle, factory));
  }

  pub fn try_register<T, E>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> Result<T, E> + 'static,
    lifecycle: Lifecycle,
  ) where
    T: Any,
    E: Into<BoxError>,
  {
    let factory: LocalFactory =
      Box::new(move |c: &LocalContainer| -> Result<LocalInstance, BoxError> {
        factory(c)
          .map(|service| erase(Rc::new(service)))
          .map_err(Into::into)
      });
    self.insert(name, LocalRegistration::new::<T>(lifecycle, factory));
  }

  pub fn register_trait<I: ?Sized + Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> Rc<I> + 'static,
    lifecycle: Lifecycle,
  ) {
    let factory: LocalFactory =
      Box::new(move |c: &LocalContainer| -> Result<LocalInstance, BoxError> {
        Ok(erase(factory(c)))
      });
    self.insert(name, LocalRegistration::new::<I>(lifecycle, factory));
  }

  pub fn add_singleton<T: Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> T + 'static,
  ) {
    self.register(name, factory, Lifecycle::Singleton);
  }

  pub fn add_transient<T: Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> T + 'static,
  ) {
    self.register(name, factory, Lifecycle::Transient);
  }

  pub fn add_singleton_trait<I: ?Sized + Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> Rc<I> + 'static,
  ) {
    self.register_trait(name, factory, Lifecycle::Singleton);
  }

  pub fn add_transient_trait<I: ?Sized + Any>(
    &self,
    name: &str,
    factory: impl Fn(&LocalContainer) -> Rc<I> + 'static,
  ) {
    self.register_trait(name, factory, Lifecycle::Transient);
  }

  pub fn add_instance<T: Any>(&self, name: &str, instance: T) {
    let factory: LocalFactory =
      Box::new(|_: &LocalContainer| -> Result<LocalInstance, BoxError> {
        panic!("pre-initialized singleton factory should not be called")
      });
    let registration = LocalRegistration {
      instance_type: TypeId::of::<Rc<T>>(),
      service_type: type_name::<T>(),
      provider: LocalProvider::Singleton {
        cell: OnceCell::with_value(erase(Rc::new(instance))),
        factory,
      },
    };
    self.insert(name, registration);
  }

  // --- Resolution ---

  /// Resolves the service registered under `name` here or in the nearest ancestor.
  pub fn resolve<T: ?Sized + Any>(&self, name: &str) -> Result<Rc<T>, ResolveError> {
    let mut scope = self;
    loop {
      if let Some(registration) = scope.lookup(name) {
        return scope.realize(name, &registration);
      }
      match scope.parent() {
        Some(parent) => scope = parent,
        None => {
          return Err(ResolveError::NotFound {
            name: name.to_owned(),
          })
        }
      }
    }
  }

  /// Returns `None` on any failure.
  pub fn get<T: ?Sized + Any>(&self, name: &str) -> Option<Rc<T>> {
    self.resolve(name).ok()
  }

  // --- Introspection ---

  pub fn has(&self, name: &str) -> bool {
    self
      .ancestors()
      .any(|scope| scope.inner.providers.borrow().contains_key(name))
  }

  pub fn ancestors(&self) -> impl Iterator<Item = &LocalContainer> {
    std::iter::successors(Some(self), |scope| scope.parent())
  }

  pub fn service_names(&self) -> Vec<String> {
    let providers = self.inner.providers.borrow();
    let mut names: Vec<(u64, &String)> = providers
      .iter()
      .map(|(name, slot)| (slot.order, name))
      .collect();
    names.sort_unstable_by_key(|(order, _)| *order);
    names.into_iter().map(|(_, name)| name.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.inner.providers.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.providers.borrow().is_empty()
  }

  pub fn parent(&self) -> Option<&LocalContainer> {
    self.inner.parent.as_ref()
  }

  pub fn depth(&self) -> usize {
    self.inner.depth
  }

  pub fn ptr_eq(this: &LocalContainer, other: &LocalContainer) -> bool {
    Rc::ptr_eq(&this.inner, &other.inner)
  }

  // --- Scope management ---

  pub fn clear(&self) {
    let removed = std::mem::take(&mut *self.inner.providers.borrow_mut());
    tracing::debug!(depth = self.inner.depth, removed = removed.len(), "cleared local container");
    drop(removed);
  }

  pub fn create_child(&self) -> LocalContainer {
    let child = Self::with_parent(Some(self.clone()));
    tracing::debug!(depth = child.depth(), "created local child container");
    child
  }
}

impl fmt::Debug for LocalContainer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LocalContainer")
      .field("depth", &self.inner.depth)
      .field("services", &self.service_names())
      .finish()
  }
}
