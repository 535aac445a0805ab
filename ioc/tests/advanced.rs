use matchup_ioc::{global, resolve, Container, Lifecycle, ResolveError};
use std::fmt;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

// --- Advanced Test Fixtures ---

struct AppConfig {
  api_base: String,
}

// A repository that depends on AppConfig.
struct TypeRepository {
  url: String,
}

// A use case that depends on the repository.
struct LoadQuestions {
  repository: Arc<TypeRepository>,
}

impl LoadQuestions {
  fn describe(&self) -> String {
    format!("questions from {}", self.repository.url)
  }
}

#[derive(Debug)]
struct OfflineError;

impl fmt::Display for OfflineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "type data source is offline")
  }
}

impl std::error::Error for OfflineError {}

// --- Advanced Tests ---

#[test]
fn test_multi_level_dependency_chaining() {
  // Arrange
  let container = Container::new();
  container.add_instance(
    "config",
    AppConfig {
      api_base: "https://example.test/api".to_string(),
    },
  );
  container.add_singleton("typeRepository", |c| {
    let config = c.resolve::<AppConfig>("config").unwrap();
    TypeRepository {
      url: format!("{}/types", config.api_base),
    }
  });
  container.add_transient("loadQuestions", |c| LoadQuestions {
    repository: c.resolve("typeRepository").unwrap(),
  });

  // Act
  let use_case = container.resolve::<LoadQuestions>("loadQuestions").unwrap();

  // Assert
  assert_eq!(use_case.describe(), "questions from https://example.test/api/types");
  let again = container.resolve::<LoadQuestions>("loadQuestions").unwrap();
  assert!(Arc::ptr_eq(&use_case.repository, &again.repository));
}

#[test]
fn test_singleton_factory_is_called_only_once_under_concurrency() {
  static FACTORY_EXECUTION_COUNT: AtomicUsize = AtomicUsize::new(0);

  struct ConcurrentService;

  let container = Container::new();
  container.add_singleton("concurrent", |_| {
    // This block should only ever be entered once across all threads.
    FACTORY_EXECUTION_COUNT.fetch_add(1, Ordering::SeqCst);
    thread::sleep(std::time::Duration::from_millis(50));
    ConcurrentService
  });

  let resolved: Vec<Arc<ConcurrentService>> = thread::scope(|s| {
    let handles: Vec<_> = (0..20)
      .map(|_| s.spawn(|| container.resolve::<ConcurrentService>("concurrent").unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert_eq!(FACTORY_EXECUTION_COUNT.load(Ordering::SeqCst), 1);
  assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_concurrent_resolution_through_child_realizes_in_parent_once() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let root = Container::new();
  root.add_singleton("shared", move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    thread::sleep(std::time::Duration::from_millis(20));
    String::from("shared")
  });
  let children: Vec<Container> = (0..8).map(|_| root.create_child()).collect();

  thread::scope(|s| {
    for child in &children {
      s.spawn(move || {
        assert_eq!(*child.resolve::<String>("shared").unwrap(), "shared");
      });
    }
  });

  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_circular_dependency_is_an_error() {
  struct ServiceA {
    _b: Arc<ServiceB>,
  }
  struct ServiceB {
    _a: Arc<ServiceA>,
  }

  // Arrange: A -> B -> A, with fallible factories so the error can propagate.
  let container = Container::new();
  container.try_register(
    "a",
    |c| Ok::<_, ResolveError>(ServiceA { _b: c.resolve("b")? }),
    Lifecycle::Singleton,
  );
  container.try_register(
    "b",
    |c| Ok::<_, ResolveError>(ServiceB { _a: c.resolve("a")? }),
    Lifecycle::Singleton,
  );

  // Act
  let err = container.resolve::<ServiceA>("a").err().unwrap();

  // Assert: the nested error comes back unwrapped and names the re-entered service.
  assert!(matches!(&err, ResolveError::CyclicDependency { name } if name == "a"));

  // Nothing was cached, and the guard was released.
  let err = container.resolve::<ServiceB>("b").err().unwrap();
  assert!(matches!(&err, ResolveError::CyclicDependency { name } if name == "b"));
}

#[test]
fn test_self_referencing_transient_is_an_error() {
  let container = Container::new();
  container.try_register(
    "loop",
    |c| c.resolve::<u8>("loop").map(|v| *v),
    Lifecycle::Transient,
  );

  let err = container.resolve::<u8>("loop").unwrap_err();

  assert!(matches!(err, ResolveError::CyclicDependency { .. }));
}

#[test]
#[should_panic(expected = "circular dependency detected")]
fn test_circular_dependency_panics_through_infallible_factories() {
  struct ServiceA;
  let container = Container::new();
  container.add_singleton("a", |c| {
    c.resolve::<ServiceA>("a").unwrap_or_else(|err| panic!("{err}"));
    ServiceA
  });

  let _ = container.resolve::<ServiceA>("a");
}

#[test]
fn test_panicking_singleton_is_retried() {
  struct Flaky;
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let container = Container::new();
  container.add_singleton("flaky", move |_| {
    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
      panic!("first construction fails");
    }
    Flaky
  });

  let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
    container.resolve::<Flaky>("flaky")
  }));
  assert!(first.is_err());

  // The failed attempt left nothing cached and no construction marker behind.
  let r1 = container.resolve::<Flaky>("flaky").unwrap();
  let r2 = container.resolve::<Flaky>("flaky").unwrap();
  assert!(Arc::ptr_eq(&r1, &r2));
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_overwriting_registration_discards_cached_instance() {
  let container = Container::new();
  container.add_singleton("overwrite", |_| "first value".to_string());
  let first = container.resolve::<String>("overwrite").unwrap();
  assert_eq!(*first, "first value");

  container.add_singleton("overwrite", |_| "second value".to_string());
  let second = container.resolve::<String>("overwrite").unwrap();

  assert_eq!(*second, "second value");
  assert!(!Arc::ptr_eq(&first, &second));
  // Handles resolved earlier stay valid.
  assert_eq!(*first, "first value");
}

#[test]
fn test_overwriting_may_change_lifecycle() {
  let container = Container::new();
  container.add_singleton("counter", |_| 1_u32);
  container.add_transient("counter", |_| 2_u32);

  let r1 = container.resolve::<u32>("counter").unwrap();
  let r2 = container.resolve::<u32>("counter").unwrap();

  assert_eq!(*r1, 2);
  assert!(!Arc::ptr_eq(&r1, &r2));
}

#[test]
fn test_factory_error_propagates_and_singleton_stays_unrealized() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&attempts);
  let container = Container::new();
  container.try_register(
    "typeData",
    move |_| {
      if counter.fetch_add(1, Ordering::SeqCst) == 0 {
        Err(OfflineError)
      } else {
        Ok(String::from("fire,water,grass"))
      }
    },
    Lifecycle::Singleton,
  );

  let err = container.resolve::<String>("typeData").unwrap_err();
  match &err {
    ResolveError::Factory(source) => assert!(source.downcast_ref::<OfflineError>().is_some()),
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(err.to_string(), "type data source is offline");

  // The next resolution runs the factory again and caches the result.
  let data = container.resolve::<String>("typeData").unwrap();
  let again = container.resolve::<String>("typeData").unwrap();
  assert_eq!(*data, "fire,water,grass");
  assert!(Arc::ptr_eq(&data, &again));
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_dependency_surfaces_as_not_found_for_the_dependency() {
  let container = Container::new();
  container.try_register(
    "loadQuestions",
    |c| {
      Ok::<_, ResolveError>(LoadQuestions {
        repository: c.resolve("typeRepository")?,
      })
    },
    Lifecycle::Transient,
  );

  let err = container.resolve::<LoadQuestions>("loadQuestions").err().unwrap();

  assert!(matches!(&err, ResolveError::NotFound { name } if name == "typeRepository"));
}

#[test]
fn test_factory_may_register_on_its_own_container() {
  let container = Container::new();
  container.add_singleton("bootstrap", |c| {
    c.add_instance("registeredLater", 5_u16);
    c.service_names().len()
  });

  let seen = container.resolve::<usize>("bootstrap").unwrap();

  // The factory saw its own registration plus the one it just added.
  assert_eq!(*seen, 2);
  assert_eq!(*container.resolve::<u16>("registeredLater").unwrap(), 5);
}

#[test]
fn test_drop_behavior_of_singletons() {
  static DROP_COUNTER: AtomicUsize = AtomicUsize::new(0);

  struct ConnectionPool;
  impl Drop for ConnectionPool {
    fn drop(&mut self) {
      DROP_COUNTER.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container.add_singleton("pool", |_| ConnectionPool);

  let pool = container.resolve::<ConnectionPool>("pool").unwrap();
  assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 0);

  // The container still holds a strong reference.
  drop(pool);
  assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 0);

  drop(container);
  assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clear_drops_cached_singletons() {
  static DROP_COUNTER: AtomicUsize = AtomicUsize::new(0);

  struct Session;
  impl Drop for Session {
    fn drop(&mut self) {
      DROP_COUNTER.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container.add_singleton("session", |_| Session);
  drop(container.resolve::<Session>("session").unwrap());

  container.clear();

  assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 1);
}

#[test]
fn test_global_root_is_shared() {
  global().add_instance("advanced.quizTitle", String::from("Type Matchup"));

  let from_thread = thread::spawn(|| resolve!(String, "advanced.quizTitle"))
    .join()
    .unwrap();

  assert_eq!(*from_thread, "Type Matchup");
  assert!(Arc::ptr_eq(&from_thread, &resolve!(String, "advanced.quizTitle")));
}
