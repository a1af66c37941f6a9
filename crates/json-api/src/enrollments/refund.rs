//! Refund Enrollment Handler

use std::sync::Arc;

use salvo::{
    oapi::{
        ToSchema,
        extract::{JsonBody, PathParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lectern_app::domain::enrollments::{data::RefundRequest, records::EnrollmentUuid};

use crate::{
    enrollments::{EnrollmentResponse, errors::into_status_error},
    extensions::*,
    state::State,
};

/// Refund Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RefundEnrollmentRequest {
    /// Why the enrollment is refunded
    #[serde(default)]
    pub reason: Option<String>,
}

/// Refund Enrollment Handler
///
/// Marks a completed enrollment refunded. The caller must be the course instructor.
#[endpoint(
    tags("enrollments"),
    summary = "Refund Enrollment",
    responses(
        (status_code = StatusCode::OK, description = "Enrollment refunded"),
        (status_code = StatusCode::FORBIDDEN, description = "Caller is not the course instructor"),
        (status_code = StatusCode::NOT_FOUND, description = "Enrollment not found"),
        (status_code = StatusCode::CONFLICT, description = "Enrollment cannot be refunded"),
    ),
)]
pub(crate) async fn handler(
    enrollment: PathParam<Uuid>,
    json: JsonBody<RefundEnrollmentRequest>,
    depot: &mut Depot,
) -> Result<Json<EnrollmentResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;
    let user = depot.user_uuid_or_401()?;

    let request = RefundRequest {
        enrollment: EnrollmentUuid::from_uuid(enrollment.into_inner()),
        requested_by: user,
        reason: json.into_inner().reason,
    };

    let enrollment = state
        .app
        .enrollments
        .refund(tenant, request)
        .await
        .map_err(into_status_error)?;

    Ok(Json(enrollment.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use lectern_app::domain::{
        courses::records::CourseUuid,
        enrollments::{EnrollmentsServiceError, records::PaymentStatus},
    };

    use crate::test_helpers::{
        Mocks, TEST_TENANT_UUID, TEST_USER_UUID, enrollment_record, tenant_service,
    };

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        tenant_service(
            mocks,
            Router::with_path("enrollments/{enrollment}/refund").post(handler),
        )
    }

    #[tokio::test]
    async fn test_refund_returns_refunded_enrollment() -> TestResult {
        let uuid = EnrollmentUuid::new();
        let mut mocks = Mocks::default();

        mocks
            .enrollments
            .expect_refund()
            .once()
            .withf(move |tenant, request| {
                *tenant == TEST_TENANT_UUID
                    && request.enrollment == uuid
                    && request.requested_by == TEST_USER_UUID
                    && request.reason.as_deref() == Some("duplicate purchase")
            })
            .return_once(move |_, _| {
                Ok(enrollment_record(uuid, CourseUuid::new(), PaymentStatus::Refunded))
            });

        let mut res = TestClient::post(format!("http://example.com/enrollments/{uuid}/refund"))
            .json(&json!({ "reason": "duplicate purchase" }))
            .send(&make_service(mocks))
            .await;

        let body: EnrollmentResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.payment_status, "refunded");

        Ok(())
    }

    #[tokio::test]
    async fn test_refund_by_non_instructor_returns_403() -> TestResult {
        let uuid = EnrollmentUuid::new();
        let mut mocks = Mocks::default();

        mocks
            .enrollments
            .expect_refund()
            .once()
            .return_once(|_, _| Err(EnrollmentsServiceError::Forbidden));

        let res = TestClient::post(format!("http://example.com/enrollments/{uuid}/refund"))
            .json(&json!({}))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

        Ok(())
    }

    #[tokio::test]
    async fn test_refund_of_pending_enrollment_returns_409() -> TestResult {
        let uuid = EnrollmentUuid::new();
        let mut mocks = Mocks::default();

        mocks
            .enrollments
            .expect_refund()
            .once()
            .return_once(|_, _| {
                Err(EnrollmentsServiceError::InvalidTransition {
                    from: PaymentStatus::Pending,
                    to: PaymentStatus::Refunded,
                })
            });

        let res = TestClient::post(format!("http://example.com/enrollments/{uuid}/refund"))
            .json(&json!({}))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }
}
