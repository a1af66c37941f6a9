//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use lectern_app::{
    context::AppContext,
    domain::{
        coupons::MockCouponsService,
        courses::records::CourseUuid,
        enrollments::{
            MockEnrollmentsService,
            records::{EnrollmentMetadata, EnrollmentRecord, EnrollmentUuid, PaymentStatus},
        },
        events::BroadcastEventPublisher,
        payments::MockPaymentsService,
        tenants::{
            MockTenantsService,
            records::{TenantRecord, TenantUuid},
            resolver::{DEFAULT_CACHE_TTL, TenantResolver},
        },
        users::UserUuid,
    },
};

use crate::{extensions::*, state::State};

pub(crate) const TEST_TENANT_UUID: TenantUuid = TenantUuid::from_uuid(Uuid::nil());
pub(crate) const TEST_USER_UUID: UserUuid = UserUuid::from_uuid(Uuid::from_u128(1));
pub(crate) const TEST_APP_SCHEME: &str = "lmsapp";
pub(crate) const TEST_CENTRAL_DOMAIN: &str = "lectern.test";

/// Service mocks backing a test [`AppContext`]. Unset expectations fail the test.
#[derive(Default)]
pub(crate) struct Mocks {
    pub(crate) tenants: MockTenantsService,
    pub(crate) coupons: MockCouponsService,
    pub(crate) enrollments: MockEnrollmentsService,
    pub(crate) payments: MockPaymentsService,
}

impl Mocks {
    pub(crate) fn into_state(self) -> Arc<State> {
        let tenants = Arc::new(self.tenants);

        let app = AppContext {
            resolver: Arc::new(TenantResolver::new(
                tenants.clone(),
                vec![TEST_CENTRAL_DOMAIN.to_string()],
                DEFAULT_CACHE_TTL,
            )),
            tenants,
            coupons: Arc::new(self.coupons),
            enrollments: Arc::new(self.enrollments),
            payments: Arc::new(self.payments),
            events: BroadcastEventPublisher::default(),
        };

        State::shared(app, "x-tenant-id".to_string(), TEST_APP_SCHEME.to_string())
    }
}

pub(crate) fn tenant_record(slug: &str) -> TenantRecord {
    TenantRecord {
        uuid: TEST_TENANT_UUID,
        slug: slug.to_string(),
        name: format!("{slug} academy"),
        email: format!("support@{slug}.test"),
        is_active: true,
        subscription_ends_at: None,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn enrollment_record(
    uuid: EnrollmentUuid,
    course: CourseUuid,
    status: PaymentStatus,
) -> EnrollmentRecord {
    EnrollmentRecord {
        uuid,
        user_uuid: TEST_USER_UUID,
        course_uuid: course,
        price: 10_000,
        paid_amount: 10_000,
        payment_method: "fawry".to_string(),
        payment_status: status,
        transaction_id: Some("REF-1".to_string()),
        enrolled_at: None,
        completed_at: None,
        metadata: EnrollmentMetadata::default(),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

#[salvo::handler]
pub(crate) async fn inject_tenant(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_tenant(tenant_record("acme"));
    ctrl.call_next(req, depot, res).await;
}

#[salvo::handler]
pub(crate) async fn inject_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_user_uuid(TEST_USER_UUID);
    ctrl.call_next(req, depot, res).await;
}

/// A service whose requests already carry the test tenant and user.
pub(crate) fn tenant_service(mocks: Mocks, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(mocks.into_state()))
            .hoop(inject_tenant)
            .hoop(inject_user)
            .push(route),
    )
}
