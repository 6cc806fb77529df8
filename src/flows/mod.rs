//! Step machines behind the entry modals.
//!
//! Each flow is a plain enum plus a `transition` function so the steps can
//! be driven and tested without any rendering layer.

pub mod ad_watch;
pub mod payment;

pub use ad_watch::{AdWatchEvent, AdWatchState, VerificationQuestion};
pub use payment::{PaymentEvent, PaymentState};

use thiserror::Error;

/// Error types for flow transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },

    #[error("Ad not finished: watched {watched}s of {required}s")]
    AdNotFinished { watched: u32, required: u32 },

    #[error("Flow already finished: {0}")]
    Finished(String),
}

/// Result type for flow operations
pub type FlowResult<T> = Result<T, FlowError>;
