//! Question model and bank
//!
//! Topics are grouped by IELTS part; each topic carries an ordered question
//! list with per-question preparation and speaking durations. The bank backs
//! both practice rooms (one topic) and full tests (one random topic per
//! part).

mod bank;
mod types;

pub use bank::QuestionBank;
pub use types::{Mode, Part, Question, Topic};
