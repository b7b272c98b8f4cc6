//! Session state machine.
//!
//! At most one long-running operation (recognition or export) runs at a
//! time. Every user or system event is checked against the current state
//! before it is allowed to touch the form.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    /// Camera stream open, waiting for capture or close.
    Scanning,
    /// Frame captured, OCR in flight.
    Recognizing,
    /// Export in flight.
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartScan,
    CloseScanner,
    Capture,
    RecognitionFinished,
    StartSave,
    SaveFinished,
    Edit,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot {event:?} while {state:?}")]
pub struct TransitionError {
    pub state: SessionState,
    pub event: SessionEvent,
}

impl SessionState {
    pub fn next(self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Idle, E::StartScan) => Ok(S::Scanning),
            (S::Scanning, E::CloseScanner) => Ok(S::Idle),
            (S::Scanning, E::Capture) => Ok(S::Recognizing),
            (S::Recognizing, E::RecognitionFinished) => Ok(S::Idle),
            (S::Idle, E::StartSave) => Ok(S::Saving),
            (S::Saving, E::SaveFinished) => Ok(S::Idle),
            // The form stays editable behind an open scanner.
            (S::Idle | S::Scanning, E::Edit | E::Clear) => Ok(self),
            (state, event) => Err(TransitionError { state, event }),
        }
    }

    pub fn allows(self, event: SessionEvent) -> bool {
        self.next(event).is_ok()
    }

    /// True while an operation that suspends is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Recognizing | SessionState::Saving)
    }
}

/// Enabled/disabled state of each control, derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub scan: bool,
    pub capture: bool,
    pub close_scanner: bool,
    pub save: bool,
    pub clear: bool,
    pub edit: bool,
}
