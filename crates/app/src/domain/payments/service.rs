//! Payment verification.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        courses::repository::PgCoursesRepository,
        enrollments::{
            records::{EnrollmentMetadata, EnrollmentRecord, EnrollmentUuid, PaymentStatus},
            repository::PgEnrollmentsRepository,
        },
        events::{DomainEvent, EventPublisher},
        payments::{
            PaymentGateways,
            errors::PaymentsServiceError,
            gateway::{CallbackRequest, PaymentGateway},
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Clone)]
pub struct PgPaymentsService {
    db: Db,
    gateways: Arc<PaymentGateways>,
    events: Arc<dyn EventPublisher>,
    enrollments_repository: PgEnrollmentsRepository,
    courses_repository: PgCoursesRepository,
}

impl std::fmt::Debug for PgPaymentsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPaymentsService")
            .field("gateways", &self.gateways)
            .finish_non_exhaustive()
    }
}

impl PgPaymentsService {
    #[must_use]
    pub fn new(db: Db, gateways: Arc<PaymentGateways>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            db,
            gateways,
            events,
            enrollments_repository: PgEnrollmentsRepository::new(),
            courses_repository: PgCoursesRepository::new(),
        }
    }

    async fn load(
        &self,
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
    ) -> Result<EnrollmentRecord, PaymentsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let record = self
            .enrollments_repository
            .find_enrollment(&mut tx, enrollment)
            .await?
            .ok_or(PaymentsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(record)
    }

    /// Move a provider-confirmed enrollment to completed. Only the caller whose
    /// update lands counts the student and announces the payment.
    async fn complete(
        &self,
        tenant: TenantUuid,
        enrollment: &EnrollmentRecord,
        reference: &str,
    ) -> Result<bool, PaymentsServiceError> {
        let now = Timestamp::now();
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let completed = self
            .enrollments_repository
            .complete_payment(
                &mut tx,
                enrollment.uuid,
                reference,
                now,
                &EnrollmentMetadata {
                    verified_at: Some(now),
                    ..EnrollmentMetadata::default()
                },
            )
            .await?;

        let Some(completed) = completed else {
            tx.rollback().await?;

            let current = self.load(tenant, enrollment.uuid).await?;

            return Ok(current.payment_status == PaymentStatus::Completed);
        };

        self.courses_repository
            .increment_students_count(&mut tx, completed.course_uuid)
            .await?;

        tx.commit().await?;

        info!(
            %tenant,
            enrollment = %completed.uuid,
            gateway = %completed.payment_method,
            "payment completed"
        );

        self.events.publish(DomainEvent::PaymentCompleted {
            tenant,
            enrollment: completed.uuid,
            user: completed.user_uuid,
            course: completed.course_uuid,
            gateway: completed.payment_method.clone(),
            reference: reference.to_string(),
            amount: completed.paid_amount,
        });

        Ok(true)
    }
}

#[async_trait]
impl PaymentsService for PgPaymentsService {
    async fn verify_payment(
        &self,
        tenant: TenantUuid,
        reference: &str,
        enrollment: EnrollmentUuid,
    ) -> Result<bool, PaymentsServiceError> {
        // Unlocked read: concurrent duplicates may both reach the provider. The
        // conditional write in `complete` still lets only one of them settle.
        let record = self.load(tenant, enrollment).await?;

        match record.payment_status {
            PaymentStatus::Completed => return Ok(true),
            PaymentStatus::Failed | PaymentStatus::Refunded => return Ok(false),
            PaymentStatus::Pending => {}
        }

        if record.transaction_id.as_deref() != Some(reference) {
            warn!(
                %tenant,
                enrollment = %record.uuid,
                "payment reference does not match enrollment"
            );

            return Ok(false);
        }

        let gateway = self
            .gateways
            .get(&record.payment_method)
            .ok_or_else(|| PaymentsServiceError::UnknownGateway(record.payment_method.clone()))?;

        let verified = match self.gateways.bounded(gateway.verify(reference)).await {
            Ok(verified) => verified,
            Err(error) => {
                warn!(
                    %tenant,
                    enrollment = %record.uuid,
                    gateway = gateway.name(),
                    "payment verification failed: {error}"
                );

                false
            }
        };

        if !verified {
            return Ok(false);
        }

        self.complete(tenant, &record, reference).await
    }

    async fn handle_callback(
        &self,
        tenant: TenantUuid,
        gateway: &str,
        callback: CallbackRequest,
    ) -> Result<bool, PaymentsServiceError> {
        let provider = self
            .gateways
            .get(gateway)
            .ok_or_else(|| PaymentsServiceError::UnknownGateway(gateway.to_string()))?;

        let payload = provider.parse_callback(&callback).map_err(|source| {
            warn!(target: "security", %tenant, gateway, "rejected payment callback: {source}");

            PaymentsServiceError::InvalidCallback {
                gateway: gateway.to_string(),
                source,
            }
        })?;

        self.verify_payment(tenant, &payload.reference, payload.enrollment)
            .await
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Confirm a payment with its provider and complete the enrollment.
    ///
    /// Returns whether the enrollment is paid. Repeated calls are safe: once an
    /// enrollment is completed the provider is not asked again.
    async fn verify_payment(
        &self,
        tenant: TenantUuid,
        reference: &str,
        enrollment: EnrollmentUuid,
    ) -> Result<bool, PaymentsServiceError>;

    /// Authenticate a provider callback, then verify the payment it announces.
    async fn handle_callback(
        &self,
        tenant: TenantUuid,
        gateway: &str,
        callback: CallbackRequest,
    ) -> Result<bool, PaymentsServiceError>;
}
