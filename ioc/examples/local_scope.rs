use matchup_ioc::LocalContainer;
use std::cell::RefCell;
use std::rc::Rc;

// Score keeping is single-threaded UI state, so it does not need to be `Send`.
#[derive(Default)]
struct Scoreboard {
  answers: RefCell<Vec<bool>>,
}

impl Scoreboard {
  fn record(&self, correct: bool) {
    self.answers.borrow_mut().push(correct);
  }

  fn score(&self) -> usize {
    self.answers.borrow().iter().filter(|correct| **correct).count()
  }
}

fn main() {
  let app = LocalContainer::new();
  app.add_singleton("scoreboard", |_| Scoreboard::default());

  let quiz_screen = app.create_child();
  let board: Rc<Scoreboard> = quiz_screen.resolve("scoreboard").unwrap();
  board.record(true);
  board.record(false);
  board.record(true);

  // The scoreboard lives in the app scope, so another screen sees the same one.
  let results_screen = app.create_child();
  let same_board: Rc<Scoreboard> = results_screen.resolve("scoreboard").unwrap();
  println!("score: {}", same_board.score());
  assert!(Rc::ptr_eq(&board, &same_board));
  assert_eq!(same_board.score(), 2);
}
