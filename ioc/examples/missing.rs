use matchup_ioc::{global, resolve, ResolveError};
use std::panic;

struct UnregisteredService;

fn main() {
  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service that was never registered...");

  let result = panic::catch_unwind(|| {
    // This line will panic!
    let _service = resolve!(UnregisteredService, "leaderboard");
  });

  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the fallible `resolve()` method ---
  println!("\nNow, attempting to resolve using `resolve()`...");

  match global().resolve::<UnregisteredService>("leaderboard") {
    Ok(_) => panic!("Should not have found the service!"),
    Err(ResolveError::NotFound { name }) => println!("Correctly reported `{name}` as missing."),
    Err(other) => panic!("Unexpected error: {other}"),
  }
}
