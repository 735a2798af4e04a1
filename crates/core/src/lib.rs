#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod session;
pub mod time;

pub use error::{ErrorKind, QuizSessionError};
pub use session::{AnswerOutcome, QuizSession, QuizSummary, SessionEvent, SessionProgress};
pub use time::Clock;
