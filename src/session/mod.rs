//! Speaking room sessions
//!
//! The room flow lives in two layers:
//! - `state` is the pure machine: room states, the single tagged countdown,
//!   and the transition table. It never touches a device and is testable
//!   without any harness.
//! - `session` owns a machine plus the recorder, cue player, scorer, and
//!   history store, and executes the actions the machine emits.

mod config;
mod session;
mod state;

pub use config::SessionConfig;
pub use session::{RoomSnapshot, ScoringStatus, SessionDeps, SpeakingSession};
pub use state::{Countdown, CountdownKind, RoomAction, RoomEvent, RoomMachine, RoomState};
