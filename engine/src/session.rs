use serde::Serialize;
use std::fmt;

/// Lifecycle of the one session an engine instance can hold.
///
/// `Uninitialized -> Initialized -> Joining -> Active -> Leaving -> Released`.
/// A failed join falls back to `Initialized`; `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Joining,
    Active,
    Leaving,
    Released,
}

impl SessionState {
    /// Polling has an effect only while a join is in flight or established.
    pub fn is_pollable(&self) -> bool {
        matches!(self, SessionState::Joining | SessionState::Active)
    }

    /// Media selection can change only before a join starts.
    pub fn accepts_media_config(&self) -> bool {
        matches!(self, SessionState::Uninitialized | SessionState::Initialized)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::Joining => "joining",
            SessionState::Active => "active",
            SessionState::Leaving => "leaving",
            SessionState::Released => "released",
        };
        write!(f, "{name}")
    }
}
