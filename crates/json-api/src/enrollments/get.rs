//! Get Enrollment Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use lectern_app::domain::enrollments::records::EnrollmentUuid;

use crate::{
    enrollments::{EnrollmentResponse, errors::into_status_error},
    extensions::*,
    state::State,
};

/// Get Enrollment Handler
///
/// Returns one of the caller's enrollments, for clients polling payment status.
#[endpoint(tags("enrollments"), summary = "Get Enrollment")]
pub(crate) async fn handler(
    enrollment: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<EnrollmentResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;
    let user = depot.user_uuid_or_401()?;

    let enrollment = state
        .app
        .enrollments
        .get_enrollment(tenant, EnrollmentUuid::from_uuid(enrollment.into_inner()))
        .await
        .map_err(into_status_error)?;

    if enrollment.user_uuid != user {
        return Err(StatusError::not_found().brief("Enrollment not found"));
    }

    Ok(Json(enrollment.into()))
}
