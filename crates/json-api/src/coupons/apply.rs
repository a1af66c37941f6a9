//! Apply Coupon Handler

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

use lectern_app::domain::{coupons::evaluator::CouponQuote, courses::records::CourseUuid};

use crate::{coupons::errors::into_status_error, extensions::*, state::State};

/// Apply Coupon Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ApplyCouponRequest {
    /// Coupon code to price the course with
    pub code: String,
}

/// Coupon Quote Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CouponQuoteResponse {
    /// Normalised coupon code
    pub code: String,

    /// Course price in minor units
    pub original_price: u64,

    /// Discount in minor units
    pub discount_amount: u64,

    /// Price after the discount in minor units
    pub final_price: u64,
}

impl From<CouponQuote> for CouponQuoteResponse {
    fn from(quote: CouponQuote) -> Self {
        Self {
            code: quote.code,
            original_price: quote.original_price,
            discount_amount: quote.discount_amount,
            final_price: quote.final_price,
        }
    }
}

/// Apply Coupon Handler
///
/// Prices a course with a coupon without redeeming it.
#[endpoint(
    tags("coupons"),
    summary = "Preview Coupon",
    responses(
        (status_code = StatusCode::OK, description = "Coupon applies"),
        (status_code = StatusCode::NOT_FOUND, description = "Course not found"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Coupon does not apply"),
    ),
)]
pub(crate) async fn handler(
    course: PathParam<Uuid>,
    json: JsonBody<ApplyCouponRequest>,
    depot: &mut Depot,
) -> Result<Json<CouponQuoteResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_404()?;

    let quote = state
        .app
        .coupons
        .preview(
            tenant,
            CourseUuid::from_uuid(course.into_inner()),
            &json.into_inner().code,
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(quote.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use lectern_app::domain::coupons::CouponsServiceError;

    use crate::test_helpers::{Mocks, TEST_TENANT_UUID, tenant_service};

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        tenant_service(
            mocks,
            Router::with_path("courses/{course}/coupons/apply").post(handler),
        )
    }

    #[tokio::test]
    async fn test_apply_returns_quote() -> TestResult {
        let course = CourseUuid::new();
        let mut mocks = Mocks::default();

        mocks
            .coupons
            .expect_preview()
            .once()
            .withf(move |tenant, c, code| {
                *tenant == TEST_TENANT_UUID && *c == course && code == "SAVE20"
            })
            .return_once(|_, _, _| {
                Ok(CouponQuote {
                    code: "SAVE20".to_string(),
                    original_price: 10_000,
                    discount_amount: 2_000,
                    final_price: 8_000,
                })
            });

        let mut res = TestClient::post(format!("http://example.com/courses/{course}/coupons/apply"))
            .json(&json!({ "code": "SAVE20" }))
            .send(&make_service(mocks))
            .await;

        let body: CouponQuoteResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.discount_amount, 2_000);
        assert_eq!(body.final_price, 8_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_coupon_returns_422() -> TestResult {
        let course = CourseUuid::new();
        let mut mocks = Mocks::default();

        mocks
            .coupons
            .expect_preview()
            .once()
            .return_once(|_, _, _| Err(CouponsServiceError::InvalidCoupon));

        let res = TestClient::post(format!("http://example.com/courses/{course}/coupons/apply"))
            .json(&json!({ "code": "NOPE" }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }
}
