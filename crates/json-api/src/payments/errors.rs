//! Errors

use salvo::http::StatusError;
use tracing::error;

use lectern_app::domain::payments::PaymentsServiceError;

pub(crate) fn into_status_error(error: PaymentsServiceError) -> StatusError {
    match error {
        PaymentsServiceError::NotFound => StatusError::not_found().brief("Enrollment not found"),
        PaymentsServiceError::UnknownGateway(gateway) => {
            StatusError::not_found().brief(format!("Payment gateway {gateway} is not configured"))
        }
        PaymentsServiceError::InvalidCallback { source, .. } => {
            StatusError::bad_request().brief(format!("Rejected callback: {source}"))
        }
        PaymentsServiceError::Sql(source) => {
            error!("payment storage failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
