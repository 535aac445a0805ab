//! Core, non-public data structures shared by both container flavours.

use crate::error::{BoxError, ResolveError};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

thread_local! {
  // Registrations whose factory is currently running on this thread, keyed by
  // the address of the registration. Re-entering one of them is a cycle.
  static UNDER_CONSTRUCTION: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// How often a registration's factory is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
  /// Constructed on first resolution, then cached by the owning container.
  #[default]
  Singleton,
  /// Constructed anew on every resolution. Never cached.
  Transient,
}

impl fmt::Display for Lifecycle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifecycle::Singleton => write!(f, "singleton"),
      Lifecycle::Transient => write!(f, "transient"),
    }
  }
}

/// An RAII guard marking a registration as "under construction".
///
/// Creating the guard fails with [`ResolveError::CyclicDependency`] when the
/// same registration is already being built further up this thread's stack.
/// Dropping it (also during unwinding) unmarks the registration.
pub(crate) struct ConstructionGuard {
  slot: usize,
}

impl ConstructionGuard {
  pub(crate) fn enter(slot: usize, name: &str) -> Result<Self, ResolveError> {
    let fresh = UNDER_CONSTRUCTION.with(|set| set.borrow_mut().insert(slot));
    if !fresh {
      tracing::warn!(service = name, "circular dependency detected");
      return Err(ResolveError::CyclicDependency {
        name: name.to_owned(),
      });
    }
    Ok(Self { slot })
  }
}

impl Drop for ConstructionGuard {
  fn drop(&mut self) {
    UNDER_CONSTRUCTION.with(|set| {
      set.borrow_mut().remove(&self.slot);
    });
  }
}

/// Stable identity of a registration, used as the cycle-detection key.
#[inline]
pub(crate) fn slot_id<T: ?Sized>(ptr: *const T) -> usize {
  ptr as *const () as usize
}

/// Turns an error returned by a fallible factory into a `ResolveError`.
///
/// A `ResolveError` raised while the factory resolved its own dependencies is
/// handed back as-is so callers see the original failure.
pub(crate) fn factory_failure(err: BoxError) -> ResolveError {
  match err.downcast::<ResolveError>() {
    Ok(inner) => *inner,
    Err(other) => ResolveError::Factory(other),
  }
}
