use thiserror::Error;

/// The error type fallible factories may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned when a service cannot be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// Neither the container nor any of its ancestors registered the name.
  #[error("service '{name}' is not registered")]
  NotFound { name: String },

  /// A factory tried to resolve a registration that is still being built.
  #[error("circular dependency detected while resolving service '{name}'")]
  CyclicDependency { name: String },

  /// The name is registered, but for a different service type.
  #[error("service '{name}' is registered as `{actual}`, requested as `{expected}`")]
  TypeMismatch {
    name: String,
    expected: &'static str,
    actual: &'static str,
  },

  /// A fallible factory reported an error.
  #[error(transparent)]
  Factory(BoxError),
}

impl ResolveError {
  /// The service name the error refers to, if any.
  pub fn service_name(&self) -> Option<&str> {
    match self {
      ResolveError::NotFound { name }
      | ResolveError::CyclicDependency { name }
      | ResolveError::TypeMismatch { name, .. } => Some(name),
      ResolveError::Factory(_) => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ResolveError::NotFound { .. })
  }
}
