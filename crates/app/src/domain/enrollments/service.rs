//! Enrollment orchestration.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::{error, info, warn};

use crate::{
    database::Db,
    domain::{
        coupons::{CouponCache, evaluator, repository::PgCouponsRepository},
        courses::repository::PgCoursesRepository,
        enrollments::{
            data::{EnrollmentRequest, EnrollmentResult, NewEnrollment, RefundRequest},
            errors::EnrollmentsServiceError,
            records::{
                EnrollmentMetadata, EnrollmentRecord, EnrollmentUuid, FREE_PAYMENT_METHOD,
                PaymentStatus,
            },
            repository::PgEnrollmentsRepository,
        },
        events::{DomainEvent, EventPublisher},
        payments::{
            PaymentGateways,
            errors::GatewayError,
            gateway::{PaymentGateway, SessionRequest},
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Clone)]
pub struct PgEnrollmentsService {
    db: Db,
    coupon_cache: Arc<CouponCache>,
    gateways: Arc<PaymentGateways>,
    events: Arc<dyn EventPublisher>,
    enrollments_repository: PgEnrollmentsRepository,
    courses_repository: PgCoursesRepository,
    coupons_repository: PgCouponsRepository,
}

impl std::fmt::Debug for PgEnrollmentsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgEnrollmentsService")
            .field("gateways", &self.gateways)
            .finish_non_exhaustive()
    }
}

impl PgEnrollmentsService {
    #[must_use]
    pub fn new(
        db: Db,
        coupon_cache: Arc<CouponCache>,
        gateways: Arc<PaymentGateways>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            db,
            coupon_cache,
            gateways,
            events,
            enrollments_repository: PgEnrollmentsRepository::new(),
            courses_repository: PgCoursesRepository::new(),
            coupons_repository: PgCouponsRepository::new(),
        }
    }

    /// Validate and persist the enrollment, redeeming any coupon in the same
    /// transaction. Nothing is written when a check fails.
    async fn create_enrollment(
        &self,
        tenant: TenantUuid,
        request: &EnrollmentRequest,
        gateway: &str,
        now: Timestamp,
    ) -> Result<(EnrollmentRecord, String), EnrollmentsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        if self
            .enrollments_repository
            .exists(&mut tx, request.user, request.course)
            .await?
        {
            return Err(EnrollmentsServiceError::AlreadyEnrolled);
        }

        let course = self
            .courses_repository
            .find_course(&mut tx, request.course)
            .await?
            .ok_or(EnrollmentsServiceError::CourseNotFound)?;

        if !course.is_available() {
            return Err(EnrollmentsServiceError::CourseUnavailable);
        }

        if course.instructor_uuid == request.user {
            return Err(EnrollmentsServiceError::SelfEnrollmentForbidden);
        }

        let coupon = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => {
                let coupon = self
                    .coupon_cache
                    .fetch(&self.coupons_repository, &mut tx, tenant, code, now)
                    .await?
                    .filter(|coupon| evaluator::applies_to(coupon, &course, course.price, now))
                    .ok_or(EnrollmentsServiceError::InvalidCoupon)?;

                Some(coupon)
            }
            None => None,
        };

        let discount = coupon
            .as_ref()
            .map_or(0, |coupon| evaluator::discount(coupon, course.price));
        let paid_amount = course.price.saturating_sub(discount);
        let is_free = paid_amount == 0;

        let enrollment = self
            .enrollments_repository
            .create_enrollment(
                &mut tx,
                NewEnrollment {
                    uuid: EnrollmentUuid::new(),
                    user_uuid: request.user,
                    course_uuid: course.uuid,
                    price: course.price,
                    paid_amount,
                    payment_method: if is_free {
                        FREE_PAYMENT_METHOD.to_string()
                    } else {
                        gateway.to_string()
                    },
                    payment_status: if is_free {
                        PaymentStatus::Completed
                    } else {
                        PaymentStatus::Pending
                    },
                    metadata: EnrollmentMetadata {
                        original_price: Some(course.price),
                        discount_amount: Some(discount),
                        coupon_code: coupon.as_ref().map(|coupon| coupon.code.clone()),
                        gateway: (!is_free).then(|| gateway.to_string()),
                        tenant: Some(tenant),
                        ..EnrollmentMetadata::default()
                    },
                },
                now,
            )
            .await?;

        if let Some(coupon) = &coupon {
            let redeemed = self
                .coupons_repository
                .increment_usage(&mut tx, coupon.uuid)
                .await?;

            // Stale snapshot: the coupon ran out (or was disabled) since it was cached.
            self.coupon_cache.invalidate(tenant, &coupon.code).await;

            if !redeemed {
                tx.rollback().await?;

                return Err(EnrollmentsServiceError::InvalidCoupon);
            }
        }

        tx.commit().await?;

        Ok((enrollment, course.title))
    }

    async fn record_session_failure(
        &self,
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        gateway: &str,
        source: &GatewayError,
    ) -> Result<(), EnrollmentsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        self.enrollments_repository
            .mark_payment_failed(
                &mut tx,
                enrollment,
                &EnrollmentMetadata {
                    failure_reason: Some(source.to_string()),
                    ..EnrollmentMetadata::default()
                },
            )
            .await?;

        tx.commit().await?;

        self.events.publish(DomainEvent::PaymentFailed {
            tenant,
            enrollment,
            gateway: gateway.to_string(),
            reason: source.to_string(),
        });

        Ok(())
    }
}

#[async_trait]
impl EnrollmentsService for PgEnrollmentsService {
    async fn enroll(
        &self,
        tenant: TenantUuid,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResult, EnrollmentsServiceError> {
        let now = Timestamp::now();
        let gateway = self.gateways.default_gateway();
        let gateway_name = gateway.name();

        let (enrollment, course_title) = self
            .create_enrollment(tenant, &request, gateway_name, now)
            .await?;

        if enrollment.payment_status == PaymentStatus::Completed {
            info!(%tenant, enrollment = %enrollment.uuid, "free enrollment completed");

            self.events.publish(DomainEvent::FreeEnrollmentCompleted {
                tenant,
                enrollment: enrollment.uuid,
                user: enrollment.user_uuid,
                course: enrollment.course_uuid,
            });

            return Ok(EnrollmentResult {
                enrollment,
                payment_url: None,
                reference: None,
                gateway: None,
            });
        }

        self.events.publish(DomainEvent::EnrollmentInitiated {
            tenant,
            enrollment: enrollment.uuid,
            user: enrollment.user_uuid,
            course: enrollment.course_uuid,
            amount: enrollment.paid_amount,
        });

        let session_request = SessionRequest {
            enrollment: enrollment.uuid,
            user: enrollment.user_uuid,
            description: course_title,
            amount: enrollment.paid_amount,
            customer: request.customer,
        };

        // No transaction is open across the provider call.
        let session = match self
            .gateways
            .bounded(gateway.create_session(&session_request))
            .await
        {
            Ok(session) => session,
            Err(source) => {
                error!(
                    %tenant,
                    enrollment = %enrollment.uuid,
                    gateway = gateway_name,
                    "failed to create payment session: {source}"
                );

                if let Err(mark_error) = self
                    .record_session_failure(tenant, enrollment.uuid, gateway_name, &source)
                    .await
                {
                    error!(
                        enrollment = %enrollment.uuid,
                        "failed to mark enrollment failed: {mark_error}"
                    );
                }

                return Err(EnrollmentsServiceError::PaymentSession {
                    enrollment: enrollment.uuid,
                    gateway: gateway_name.to_string(),
                    source,
                });
            }
        };

        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let updated = self
            .enrollments_repository
            .record_payment_session(
                &mut tx,
                enrollment.uuid,
                &session.reference,
                &EnrollmentMetadata {
                    payment_url: Some(session.redirect_url.clone()),
                    payment_reference: Some(session.reference.clone()),
                    payment_created_at: Some(Timestamp::now()),
                    ..EnrollmentMetadata::default()
                },
            )
            .await?;

        tx.commit().await?;

        let enrollment = updated.unwrap_or_else(|| {
            warn!(
                enrollment = %enrollment.uuid,
                "enrollment left pending before its payment session was recorded"
            );

            enrollment
        });

        self.events.publish(DomainEvent::PaymentInitiated {
            tenant,
            enrollment: enrollment.uuid,
            gateway: gateway_name.to_string(),
            reference: session.reference.clone(),
        });

        Ok(EnrollmentResult {
            enrollment,
            payment_url: Some(session.redirect_url),
            reference: Some(session.reference),
            gateway: Some(gateway_name.to_string()),
        })
    }

    async fn get_enrollment(
        &self,
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
    ) -> Result<EnrollmentRecord, EnrollmentsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let enrollment = self
            .enrollments_repository
            .find_enrollment(&mut tx, enrollment)
            .await?
            .ok_or(EnrollmentsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(enrollment)
    }

    async fn refund(
        &self,
        tenant: TenantUuid,
        request: RefundRequest,
    ) -> Result<EnrollmentRecord, EnrollmentsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let enrollment = self
            .enrollments_repository
            .find_enrollment(&mut tx, request.enrollment)
            .await?
            .ok_or(EnrollmentsServiceError::NotFound)?;

        let course = self
            .courses_repository
            .find_course(&mut tx, enrollment.course_uuid)
            .await?
            .ok_or(EnrollmentsServiceError::CourseNotFound)?;

        if course.instructor_uuid != request.requested_by {
            return Err(EnrollmentsServiceError::Forbidden);
        }

        let invalid_transition = EnrollmentsServiceError::InvalidTransition {
            from: enrollment.payment_status,
            to: PaymentStatus::Refunded,
        };

        if !enrollment
            .payment_status
            .can_transition_to(PaymentStatus::Refunded)
        {
            return Err(invalid_transition);
        }

        let refunded = self
            .enrollments_repository
            .refund_enrollment(
                &mut tx,
                enrollment.uuid,
                &EnrollmentMetadata {
                    refunded_at: Some(Timestamp::now()),
                    refund_reason: request.reason.clone(),
                    ..EnrollmentMetadata::default()
                },
            )
            .await?
            .ok_or(invalid_transition)?;

        tx.commit().await?;

        info!(%tenant, enrollment = %refunded.uuid, "enrollment refunded");

        self.events.publish(DomainEvent::EnrollmentRefunded {
            tenant,
            enrollment: refunded.uuid,
            reason: request.reason,
        });

        Ok(refunded)
    }
}

#[automock]
#[async_trait]
pub trait EnrollmentsService: Send + Sync {
    /// Enroll a user in a course, opening a payment session when payment is due.
    async fn enroll(
        &self,
        tenant: TenantUuid,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResult, EnrollmentsServiceError>;

    /// Retrieve a single enrollment.
    async fn get_enrollment(
        &self,
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
    ) -> Result<EnrollmentRecord, EnrollmentsServiceError>;

    /// Mark a completed enrollment refunded. Money moves with the provider out of band.
    async fn refund(
        &self,
        tenant: TenantUuid,
        request: RefundRequest,
    ) -> Result<EnrollmentRecord, EnrollmentsServiceError>;
}
