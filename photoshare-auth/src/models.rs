use event_photos::EventContext;
use serde::{Deserialize, Serialize};

/// Authenticated user as seen by the upload pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    /// Opaque bearer credential
    pub token: String,
    pub issued_context: Option<EventContext>,
}

/// Whether a collaborator can be called at all on this platform / right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

/// State of the identity readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting; `attempt` is the number of attempts already made
    Polling { attempt: u32 },
    Ready,
    Exhausted,
}
