use matchup_ioc::{global, resolve};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait TypeChart: Send + Sync {
  fn multiplier(&self, attack: &str, defend: &str) -> f32;
}

// 2. Define a concrete implementation
struct BasicChart;
impl TypeChart for BasicChart {
  fn multiplier(&self, attack: &str, defend: &str) -> f32 {
    match (attack, defend) {
      ("water", "fire") | ("fire", "grass") | ("grass", "water") => 2.0,
      ("fire", "water") | ("grass", "fire") | ("water", "grass") => 0.5,
      _ => 1.0,
    }
  }
}

// 3. Define a use case that depends on the abstraction
struct ExplainMatchup {
  chart: Arc<dyn TypeChart>,
}

impl ExplainMatchup {
  fn execute(&self, attack: &str, defend: &str) -> String {
    match self.chart.multiplier(attack, defend) {
      m if m > 1.0 => format!("{attack} is super effective against {defend}"),
      m if m < 1.0 => format!("{attack} is not very effective against {defend}"),
      _ => format!("{attack} deals normal damage to {defend}"),
    }
  }
}

fn main() {
  // --- Registration (the bootstrap) ---

  // Register the concrete chart as the implementation for `dyn TypeChart`.
  global().add_singleton_trait::<dyn TypeChart>("typeChart", |_| Arc::new(BasicChart));

  // The use case resolves its own dependency from the container it belongs to.
  global().add_singleton("explainMatchup", |c| ExplainMatchup {
    chart: c.resolve::<dyn TypeChart>("typeChart").expect("type chart is registered"),
  });

  // --- Resolution and Usage (the presentation layer) ---
  let explain = resolve!(ExplainMatchup, "explainMatchup");
  println!("{}", explain.execute("water", "fire"));
  println!("{}", explain.execute("fire", "water"));

  let chart = resolve!(trait TypeChart, "typeChart");
  assert_eq!(chart.multiplier("grass", "water"), 2.0);
}
