use thiserror::Error;

use crate::host::RepresentationKind;

/// External reference that was not supplied at configuration time. The feature
/// depending on it degrades to a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingReference {
    #[error("no representation configured for {}", .0.as_str())]
    Representation(RepresentationKind),
    #[error("npc goal point not configured")]
    NpcGoal,
    #[error("pursuit target not available")]
    Target,
    #[error("dialogue has no lines")]
    DialogueLines,
}

/// Local, non-fatal failures reported by the state machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("{action} not allowed while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("stale {0} callback ignored")]
    StaleCallback(&'static str),
}

impl InteractionError {
    pub fn invalid(action: &'static str, state: &'static str) -> Self {
        InteractionError::InvalidTransition { action, state }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: &'static str, value: f32 },
    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidScalar { field: &'static str, value: f32 },
    #[error("{field} must be within [0, 1] (got {value})")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("light flicker min_intensity {min} exceeds max_intensity {max}")]
    InvertedFlickerRange { min: f32, max: f32 },
}
