//! App Router

use salvo::Router;

use crate::{coupons, enrollments, identity, payments, tenancy};

pub fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("payments/{gateway}/return").get(payments::return_link::handler))
        .push(
            Router::new()
                .hoop(tenancy::middleware::handler)
                .push(
                    Router::with_path("payments/{gateway}/callback")
                        .post(payments::callback::handler),
                )
                .push(
                    Router::with_path("courses/{course}/coupons/apply")
                        .post(coupons::apply::handler),
                )
                .push(
                    Router::new()
                        .hoop(identity::handler)
                        .push(
                            Router::with_path("courses/{course}/enroll")
                                .post(enrollments::enroll::handler),
                        )
                        .push(
                            Router::with_path("enrollments/{enrollment}")
                                .get(enrollments::get::handler)
                                .push(
                                    Router::with_path("refund").post(enrollments::refund::handler),
                                ),
                        )
                        .push(Router::with_path("verify-payment").post(payments::verify::handler)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use salvo::{
        affix_state::inject,
        prelude::*,
        test::{ResponseExt, TestClient},
    };
    use serde_json::json;
    use testresult::TestResult;
    use uuid::Uuid;

    use lectern_app::domain::{
        courses::records::CourseUuid,
        enrollments::records::{EnrollmentUuid, PaymentStatus},
    };

    use crate::{
        identity::USER_ID_HEADER,
        payments::PaymentOutcomeResponse,
        test_helpers::{Mocks, TEST_USER_UUID, enrollment_record, tenant_record},
    };

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        Service::new(
            Router::new()
                .hoop(inject(mocks.into_state()))
                .push(app_router()),
        )
    }

    fn resolves_acme(mocks: &mut Mocks) {
        mocks
            .tenants
            .expect_find_by_domain()
            .returning(|_| Ok(None));

        mocks
            .tenants
            .expect_find_by_slug()
            .returning(|_| Ok(Some(tenant_record("acme"))));
    }

    #[tokio::test]
    async fn return_route_skips_tenant_resolution() -> TestResult {
        let mut mocks = Mocks::default();

        mocks.tenants.expect_find_by_domain().never();
        mocks.tenants.expect_find_by_slug().never();

        let res = TestClient::get("http://unknown.example.com/payments/paymob/return?success=true")
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn enrollment_routes_require_user() -> TestResult {
        let mut mocks = Mocks::default();

        resolves_acme(&mut mocks);

        let res = TestClient::post("http://acme.lectern.example/verify-payment")
            .json(&json!({ "reference": "REF-1", "enrollment_uuid": Uuid::now_v7() }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn verification_runs_for_resolved_tenant_and_user() -> TestResult {
        let enrollment = EnrollmentUuid::new();
        let mut mocks = Mocks::default();

        resolves_acme(&mut mocks);

        mocks
            .enrollments
            .expect_get_enrollment()
            .once()
            .return_once(move |_, _| {
                Ok(enrollment_record(enrollment, CourseUuid::new(), PaymentStatus::Pending))
            });

        mocks
            .payments
            .expect_verify_payment()
            .once()
            .return_once(|_, _, _| Ok(true));

        let mut res = TestClient::post("http://acme.lectern.example/verify-payment")
            .add_header(USER_ID_HEADER, TEST_USER_UUID.to_string(), true)
            .json(&json!({ "reference": "REF-1", "enrollment_uuid": enrollment }))
            .send(&make_service(mocks))
            .await;

        let body: PaymentOutcomeResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(body.success, "payment should verify");

        Ok(())
    }

    #[tokio::test]
    async fn callbacks_require_a_tenant() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .tenants
            .expect_find_by_domain()
            .returning(|_| Ok(None));
        mocks.tenants.expect_find_by_slug().returning(|_| Ok(None));

        let res = TestClient::post("http://nobody.lectern.example/payments/fawry/callback")
            .raw_json("{}")
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
