//! Payment errors.

use std::time::Duration;

use sqlx::Error;
use thiserror::Error;

/// Failure talking to a payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed")]
    Http(#[from] reqwest::Error),

    #[error("gateway responded with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),

    #[error("gateway call timed out after {0:?}")]
    Timeout(Duration),
}

/// A provider callback that cannot be trusted or understood.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback signature is missing or invalid")]
    InvalidSignature,

    #[error("callback is missing {0}")]
    MissingField(&'static str),

    #[error("callback body is not valid json")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PaymentsServiceError {
    #[error("enrollment not found")]
    NotFound,

    #[error("payment gateway {0} is not configured")]
    UnknownGateway(String),

    #[error("rejected {gateway} callback")]
    InvalidCallback {
        gateway: String,
        #[source]
        source: CallbackError,
    },

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for PaymentsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        Self::Sql(error)
    }
}
