//! The process-wide root container and its access function.

use crate::container::Container;
use once_cell::sync::Lazy;

// The one and only global root. Created on first access in a thread-safe manner.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(|| {
  tracing::debug!("created global root container");
  Container::new()
});

/// Provides a reference to the global root container.
///
/// Meant for the application bootstrap, which registers the concrete services
/// once at startup. Code further down should receive a [`Container`] (or a
/// child of it) explicitly rather than reaching for the global.
///
/// # Examples
///
/// ```
/// use matchup_ioc::global;
///
/// fn register_services() {
///   global().add_instance("quiz.title", String::from("Type Matchup Quiz"));
/// }
/// # register_services();
/// # assert!(global().has("quiz.title"));
/// ```
pub fn global() -> &'static Container {
  &GLOBAL_CONTAINER
}
