use crate::flows::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// Multiple-choice question asked after an ad to prove it was watched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// Steps of the watch-an-ad-for-a-ticket modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AdWatchState {
    Instructions,
    Watching { elapsed: u32, required: u32 },
    Verification { question: VerificationQuestion },
    Success { proof: String },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdWatchEvent {
    /// User starts the ad; `required` seconds must elapse
    Start { required: u32 },
    /// Playback progress
    Tick(u32),
    /// Ad finished and the verifier issued a question
    QuestionIssued(VerificationQuestion),
    /// Verifier accepted the answer and minted a proof token
    Verified(String),
    /// Verifier rejected the answer
    Rejected(String),
    /// Ad failed to load, user closed the modal...
    Abort(String),
    Retry,
}

impl AdWatchState {
    pub fn name(&self) -> &'static str {
        match self {
            AdWatchState::Instructions => "instructions",
            AdWatchState::Watching { .. } => "watching",
            AdWatchState::Verification { .. } => "verification",
            AdWatchState::Success { .. } => "success",
            AdWatchState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AdWatchState::Success { .. } | AdWatchState::Error { .. })
    }

    /// Seconds left on the ad, if one is playing
    pub fn seconds_left(&self) -> Option<u32> {
        match self {
            AdWatchState::Watching { elapsed, required } => Some(required.saturating_sub(*elapsed)),
            _ => None,
        }
    }

    pub fn proof(&self) -> Option<&str> {
        match self {
            AdWatchState::Success { proof } => Some(proof),
            _ => None,
        }
    }

    /// Apply `event`, returning the next step
    pub fn transition(self, event: AdWatchEvent) -> FlowResult<AdWatchState> {
        use AdWatchEvent as E;
        use AdWatchState as S;

        match (self, event) {
            (S::Instructions, E::Start { required }) => Ok(S::Watching { elapsed: 0, required }),

            (S::Watching { elapsed, required }, E::Tick(secs)) => Ok(S::Watching {
                elapsed: elapsed.saturating_add(secs).min(required),
                required,
            }),

            (S::Watching { elapsed, required }, E::QuestionIssued(question)) => {
                if elapsed < required {
                    return Err(FlowError::AdNotFinished {
                        watched: elapsed,
                        required,
                    });
                }
                Ok(S::Verification { question })
            }

            (S::Verification { .. }, E::Verified(proof)) => Ok(S::Success { proof }),
            (S::Verification { .. }, E::Rejected(message)) => Ok(S::Error { message }),

            (S::Error { .. }, E::Retry) => Ok(S::Instructions),

            (state, E::Abort(message)) if !state.is_terminal() => Ok(S::Error { message }),

            (state @ S::Success { .. }, event) => Err(FlowError::Finished(format!(
                "{:?} after {}",
                event,
                state.name()
            ))),

            (state, event) => Err(FlowError::InvalidTransition {
                state: state.name().to_string(),
                event: format!("{:?}", event),
            }),
        }
    }
}

impl Default for AdWatchState {
    fn default() -> Self {
        AdWatchState::Instructions
    }
}
