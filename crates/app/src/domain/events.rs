//! Domain events.
//!
//! Side effects of enrollment and payment state changes (notifications, analytics,
//! cache busting) are consumed from here rather than hooked into persistence.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::domain::{
    courses::records::CourseUuid, enrollments::records::EnrollmentUuid,
    tenants::records::TenantUuid, users::UserUuid,
};

/// Default buffer for the broadcast publisher.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A paid enrollment was created and awaits payment.
    EnrollmentInitiated {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        user: UserUuid,
        course: CourseUuid,
        amount: u64,
    },

    /// An enrollment that costs nothing completed immediately.
    FreeEnrollmentCompleted {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        user: UserUuid,
        course: CourseUuid,
    },

    PaymentInitiated {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        gateway: String,
        reference: String,
    },

    PaymentFailed {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        gateway: String,
        reason: String,
    },

    PaymentCompleted {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        user: UserUuid,
        course: CourseUuid,
        gateway: String,
        reference: String,
        amount: u64,
    },

    EnrollmentRefunded {
        tenant: TenantUuid,
        enrollment: EnrollmentUuid,
        reason: Option<String>,
    },
}

impl DomainEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnrollmentInitiated { .. } => "enrollment_initiated",
            Self::FreeEnrollmentCompleted { .. } => "free_enrollment_completed",
            Self::PaymentInitiated { .. } => "payment_initiated",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::PaymentCompleted { .. } => "payment_completed",
            Self::EnrollmentRefunded { .. } => "enrollment_refunded",
        }
    }

    #[must_use]
    pub fn tenant(&self) -> TenantUuid {
        match self {
            Self::EnrollmentInitiated { tenant, .. }
            | Self::FreeEnrollmentCompleted { tenant, .. }
            | Self::PaymentInitiated { tenant, .. }
            | Self::PaymentFailed { tenant, .. }
            | Self::PaymentCompleted { tenant, .. }
            | Self::EnrollmentRefunded { tenant, .. } => *tenant,
        }
    }

    #[must_use]
    pub fn enrollment(&self) -> EnrollmentUuid {
        match self {
            Self::EnrollmentInitiated { enrollment, .. }
            | Self::FreeEnrollmentCompleted { enrollment, .. }
            | Self::PaymentInitiated { enrollment, .. }
            | Self::PaymentFailed { enrollment, .. }
            | Self::PaymentCompleted { enrollment, .. }
            | Self::EnrollmentRefunded { enrollment, .. } => *enrollment,
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[mockall::automock]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Delivery is fire-and-forget.
    fn publish(&self, event: DomainEvent);
}

/// Publishes events to in-process subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl BroadcastEventPublisher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: DomainEvent) {
        info!(
            event = event.name(),
            tenant = %event.tenant(),
            enrollment = %event.enrollment(),
            "domain event"
        );

        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() -> TestResult {
        let publisher = BroadcastEventPublisher::default();
        let mut receiver = publisher.subscribe();

        let event = DomainEvent::EnrollmentRefunded {
            tenant: TenantUuid::new(),
            enrollment: EnrollmentUuid::new(),
            reason: None,
        };

        publisher.publish(event.clone());

        assert_eq!(receiver.recv().await?, event);

        Ok(())
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        BroadcastEventPublisher::new(4).publish(DomainEvent::PaymentFailed {
            tenant: TenantUuid::new(),
            enrollment: EnrollmentUuid::new(),
            gateway: "fawry".to_string(),
            reason: "timeout".to_string(),
        });
    }

    #[test]
    fn events_serialize_with_tag() -> TestResult {
        let event = DomainEvent::FreeEnrollmentCompleted {
            tenant: TenantUuid::new(),
            enrollment: EnrollmentUuid::new(),
            user: UserUuid::new(),
            course: CourseUuid::new(),
        };

        let json = serde_json::to_value(&event)?;

        assert_eq!(json["event"], "free_enrollment_completed");

        Ok(())
    }
}
