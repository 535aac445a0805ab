//! Public macros for ergonomic service resolution.

/// Resolves a service from the global root container.
///
/// Panics if the service cannot be resolved. For a non-panicking version use
/// [`maybe_resolve!`] or `global().resolve(...)` directly.
///
/// # Examples
///
/// ```
/// use matchup_ioc::{global, resolve};
///
/// global().add_singleton("macro.greeting", |_| String::from("hello"));
///
/// let message = resolve!(String, "macro.greeting");
/// assert_eq!(*message, "hello");
/// ```
///
/// ```
/// use matchup_ioc::{global, resolve};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// global().add_singleton_trait::<dyn Greeter>("macro.greeter", |_| Arc::new(EnglishGreeter));
///
/// let greeter = resolve!(trait Greeter, "macro.greeter");
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
  // Arm for resolving a trait object: resolve!(trait MyTrait, "name")
  (trait $trait_ident:ident, $name:expr) => {
    $crate::resolve_from!($crate::global(), trait $trait_ident, $name)
  };

  // Arm for resolving a concrete type: resolve!(MyService, "name")
  ($type:ty, $name:expr) => {
    $crate::resolve_from!($crate::global(), $type, $name)
  };
}

/// Resolves a service from the global root container, yielding an `Option`.
#[macro_export]
macro_rules! maybe_resolve {
  (trait $trait_ident:ident, $name:expr) => {
    $crate::maybe_resolve_from!($crate::global(), trait $trait_ident, $name)
  };

  ($type:ty, $name:expr) => {
    $crate::maybe_resolve_from!($crate::global(), $type, $name)
  };
}

/// Resolves a service from an explicit container, panicking on failure.
///
/// Works with any container exposing `resolve::<T>(&str)`, so both
/// `Container` and `LocalContainer` are accepted.
#[macro_export]
macro_rules! resolve_from {
  ($container:expr, trait $trait_ident:ident, $name:expr) => {{
    let name: &str = &$name;
    match $container.resolve::<dyn $trait_ident>(name) {
      Ok(service) => service,
      Err(err) => panic!(
        "Failed to resolve required trait service '{}' ({}): {}",
        name,
        std::any::type_name::<dyn $trait_ident>(),
        err
      ),
    }
  }};

  ($container:expr, $type:ty, $name:expr) => {{
    let name: &str = &$name;
    match $container.resolve::<$type>(name) {
      Ok(service) => service,
      Err(err) => panic!(
        "Failed to resolve required service '{}' ({}): {}",
        name,
        std::any::type_name::<$type>(),
        err
      ),
    }
  }};
}

/// Resolves a service from an explicit container, yielding an `Option`.
#[macro_export]
macro_rules! maybe_resolve_from {
  ($container:expr, trait $trait_ident:ident, $name:expr) => {
    $container.resolve::<dyn $trait_ident>(&$name).ok()
  };

  ($container:expr, $type:ty, $name:expr) => {
    $container.resolve::<$type>(&$name).ok()
  };
}
