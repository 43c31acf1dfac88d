//! Centralized error types for the nestwalk workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single "list direct subgroups" call failed.
///
/// `Clone` + `Serialize` because a failure is recorded on the node it
/// truncated and travels back to the resource caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingError {
    #[error("group not found: {group}")]
    NotFound { group: String },

    #[error("unauthorized to list subgroups of {group}")]
    Unauthorized { group: String },

    #[error("rate limited while listing {group}")]
    RateLimited { group: String },

    #[error("GitLab API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("failed to decode listing: {message}")]
    Decode { message: String },
}

impl ListingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Top-level error enum. Variants map to subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NestwalkError {
    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NestwalkResult<T> = Result<T, NestwalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_error_serializes_with_kind_tag() {
        let err = ListingError::Api {
            status: 500,
            message: "boom".into(),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["kind"], "api");
        assert_eq!(v["status"], 500);
    }

    #[test]
    fn listing_error_lifts_into_top_level() {
        let err: NestwalkError = ListingError::NotFound { group: "42".into() }.into();
        assert_eq!(err.to_string(), "Listing error: group not found: 42");
    }
}
