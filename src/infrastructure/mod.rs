pub mod attempt_timer;

pub use attempt_timer::AttemptTimer;
