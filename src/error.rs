//! Error kinds surfaced by the booking core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure of a single user action. None of these are fatal to the process;
/// the state machine stays where it was (or, for an expired quote, goes back
/// to detail entry).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    #[error("unknown truck category: {0}")]
    InvalidCategory(String),

    #[error("quote expired at {expired_at}")]
    QuoteExpired { expired_at: DateTime<Utc> },

    #[error("category suggestion service unavailable: {0}")]
    SuggestionServiceUnavailable(String),

    #[error("missing load details: {}", .0.join(", "))]
    IncompleteLoadDetails(Vec<&'static str>),

    #[error("invalid trip parameters: {0}")]
    InvalidTrip(String),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: String,
        action: &'static str,
    },

    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("role already selected")]
    RoleAlreadySet,

    #[error("no user logged in")]
    NotLoggedIn,

    #[error("account {0} is suspended")]
    AccountSuspended(String),

    #[error("not permitted: {0}")]
    NotPermitted(&'static str),
}

pub type Result<T> = std::result::Result<T, BookingError>;
