//! Triage dialogue engine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! session performs extraction (the only I/O), then hands the extracted
//! entities to [`transition`], which decides the next state, the reply, and
//! the effects to run.

mod effect;
pub mod event;
pub mod report;
pub mod risk;
mod session;
pub mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use report::{generate_sbar, strip_completion_marker, ReportError, Sbar};
pub use risk::RiskLevel;
pub use session::{ChatMessage, ChatRole, SessionSnapshot, TriageSession, TurnResponse, START_SESSION};
pub use state::{SessionContext, TriageState};
