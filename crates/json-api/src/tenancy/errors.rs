//! Tenant resolution responses.

use jiff::Timestamp;
use salvo::{http::StatusCode, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::error;

use lectern_app::domain::tenants::resolver::TenantResolutionError;

/// Body of a refused tenant request.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TenantErrorBody {
    pub success: bool,
    pub message: String,
    pub error_code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
}

impl TenantErrorBody {
    fn new(message: &str, error_code: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            error_code: error_code.to_string(),
            expired_at: None,
            support_email: None,
        }
    }
}

pub(crate) fn render_resolution_error(res: &mut Response, error: TenantResolutionError) {
    let (status, body) = match error {
        TenantResolutionError::NotFound => (
            StatusCode::NOT_FOUND,
            TenantErrorBody::new(
                "Academy not found. Please check your URL.",
                "TENANT_NOT_FOUND",
            ),
        ),
        TenantResolutionError::Inactive { support_email, .. } => (
            StatusCode::FORBIDDEN,
            TenantErrorBody {
                support_email: Some(support_email),
                ..TenantErrorBody::new(
                    "This academy is currently inactive. Please contact support.",
                    "TENANT_INACTIVE",
                )
            },
        ),
        TenantResolutionError::SubscriptionExpired {
            expired_at,
            support_email,
            ..
        } => (
            StatusCode::PAYMENT_REQUIRED,
            TenantErrorBody {
                expired_at: Some(expired_at),
                support_email: Some(support_email),
                ..TenantErrorBody::new(
                    "Subscription has expired. Please renew to continue.",
                    "SUBSCRIPTION_EXPIRED",
                )
            },
        ),
        TenantResolutionError::Lookup(source) => {
            error!("failed to resolve tenant: {source}");

            res.render(StatusError::internal_server_error());

            return;
        }
    };

    res.status_code(status);
    res.render(Json(body));
}
