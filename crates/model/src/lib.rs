#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod prompt;
pub mod question;
pub mod quiz;
pub mod subscriber;

pub use question::{PollKind, Question, Verdict};
pub use quiz::Quiz;
pub use subscriber::Subscriber;
