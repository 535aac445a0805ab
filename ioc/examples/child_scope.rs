use matchup_ioc::Container;

#[derive(Debug)]
struct QuizSettings {
  questions_per_round: u32,
  mode: &'static str,
}

// A screen only needs a container; it neither knows nor cares where the
// settings were registered.
fn describe_round(scope: &Container) -> String {
  let settings = scope
    .resolve::<QuizSettings>("quizSettings")
    .expect("settings are registered by the bootstrap");
  format!("{} questions ({})", settings.questions_per_round, settings.mode)
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let root = Container::new();
  root.add_singleton("quizSettings", |_| QuizSettings {
    questions_per_round: 10,
    mode: "ranked",
  });

  // --- A child scope inherits everything ---
  let ranked = root.create_child();
  println!("ranked:   {}", describe_round(&ranked));

  // --- A child scope may shadow a service without touching the root ---
  let practice = root.create_child();
  practice.add_instance(
    "quizSettings",
    QuizSettings {
      questions_per_round: 3,
      mode: "practice",
    },
  );
  println!("practice: {}", describe_round(&practice));
  println!("root:     {}", describe_round(&root));

  assert_eq!(describe_round(&root), "10 questions (ranked)");
  assert_eq!(practice.service_names(), vec!["quizSettings"]);
  assert!(root.service_names().iter().all(|name| name == "quizSettings"));
}
