//! Payment Handlers

pub(crate) mod callback;
mod errors;
pub(crate) mod return_link;
pub(crate) mod verify;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};

/// Payment Outcome Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PaymentOutcomeResponse {
    /// Whether the enrollment is paid
    pub success: bool,
}
