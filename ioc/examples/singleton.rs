use matchup_ioc::Container;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A round tracker that gets a unique ID upon creation.
struct RoundTracker {
  id: usize,
}

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let container = Container::new();

  // --- Singleton Registration ---
  // This factory will only be called ONCE.
  container.add_singleton("session_tracker", |_| {
    println!("Creating SINGLETON RoundTracker...");
    RoundTracker {
      id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
    }
  });

  // --- Transient Registration ---
  // This factory will be called EVERY time the service is resolved.
  container.add_transient("round_tracker", |_| {
    println!("Creating TRANSIENT RoundTracker...");
    RoundTracker {
      id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
    }
  });

  println!("--- Resolving Singletons ---");
  let s1 = container.resolve::<RoundTracker>("session_tracker").unwrap();
  let s2 = container.resolve::<RoundTracker>("session_tracker").unwrap();
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.id, s2.id);
  assert_eq!(s1.id, 0);
  assert!(Arc::ptr_eq(&s1, &s2), "Singleton instances should be identical");

  println!("--- Resolving Transients ---");
  let t1 = container.resolve::<RoundTracker>("round_tracker").unwrap();
  let t2 = container.resolve::<RoundTracker>("round_tracker").unwrap();
  println!("Transient 1 ID: {}, Transient 2 ID: {}", t1.id, t2.id);
  assert_eq!(t1.id, 1);
  assert_eq!(t2.id, 2);
  assert!(!Arc::ptr_eq(&t1, &t2), "Transient instances should be different");
}
