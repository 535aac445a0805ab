//! # Matchup IoC
//!
//! A scoped, thread-safe Inversion of Control (IoC) container backing the
//! type-matchup quiz application.
//!
//! The application bootstrap registers its use cases, repositories and
//! configuration once at startup; the presentation layer resolves them by name.
//! Services are constructed lazily, the first time they are resolved.
//!
//! ## Core Concepts
//!
//! - **Container**: a registry of named service factories. Cheap to clone.
//! - **Lifecycle**: a [`Lifecycle::Singleton`] is built once and cached by the
//!   container that owns the registration; a [`Lifecycle::Transient`] is built
//!   on every resolution.
//! - **Scopes**: [`Container::create_child`] derives a container that inherits
//!   every registration of its ancestors and may shadow any of them locally.
//! - **Errors**: [`Container::resolve`] returns a [`ResolveError`]; the
//!   `resolve!` family of macros panics instead.
//! - **Global Root**: [`global()`] is the process-wide root the bootstrap owns.
//!
//! ## Quick Start
//!
//! ```
//! use matchup_ioc::Container;
//! use std::sync::Arc;
//!
//! trait TypeChart: Send + Sync {
//!   fn multiplier(&self, attack: &str, defend: &str) -> f32;
//! }
//!
//! struct StaticChart;
//!
//! impl TypeChart for StaticChart {
//!   fn multiplier(&self, attack: &str, defend: &str) -> f32 {
//!     match (attack, defend) {
//!       ("water", "fire") => 2.0,
//!       ("fire", "water") => 0.5,
//!       _ => 1.0,
//!     }
//!   }
//! }
//!
//! struct AnswerQuestion {
//!   chart: Arc<dyn TypeChart>,
//! }
//!
//! let root = Container::new();
//! root.add_singleton_trait::<dyn TypeChart>("typeChart", |_| Arc::new(StaticChart));
//! // Factories receive the container that owns them and resolve their dependencies from it.
//! root.add_transient("answerQuestion", |c| AnswerQuestion {
//!   chart: c.resolve::<dyn TypeChart>("typeChart").expect("chart is registered"),
//! });
//!
//! let use_case = root.resolve::<AnswerQuestion>("answerQuestion").unwrap();
//! assert_eq!(use_case.chart.multiplier("water", "fire"), 2.0);
//!
//! // A child scope sees the root's services and may override them locally.
//! let practice = root.create_child();
//! practice.add_instance("difficulty", "easy");
//! assert!(practice.has("typeChart"));
//! assert!(!root.has("difficulty"));
//! ```

mod container;
mod core;
mod error;
mod global;
#[cfg(feature = "local")]
mod local_container;
mod macros;

pub use crate::core::Lifecycle;
pub use container::{Container, WeakContainer};
pub use error::{BoxError, ResolveError};
pub use global::global;
#[cfg(feature = "local")]
pub use local_container::LocalContainer;
