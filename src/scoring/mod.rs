//! Scoring API client
//!
//! The finalized recording plus the question texts in scope go to the
//! remote scorer as one multipart POST; the response is the feedback object
//! the room forwards to the results contract.

mod client;
mod feedback;

pub use client::{ScoringClient, ScoringError};
pub use feedback::{CriterionFeedback, Feedback, FeedbackDetails};
