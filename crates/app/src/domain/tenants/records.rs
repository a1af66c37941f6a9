//! Tenant Records

use jiff::{SignedDuration, Timestamp};

use crate::uuids::TypedUuid;

/// Tenant UUID
pub type TenantUuid = TypedUuid<TenantRecord>;

/// Warn tenants this long before their subscription lapses.
pub const SUBSCRIPTION_WARNING_WINDOW: SignedDuration = SignedDuration::from_hours(7 * 24);

/// Tenant Record
#[derive(Debug, Clone, PartialEq)]
pub struct TenantRecord {
    /// Unique tenant identifier, and the partition key of its isolated data.
    pub uuid: TenantUuid,

    /// Tenant id used for subdomain and header resolution.
    pub slug: String,

    /// Human-readable tenant name.
    pub name: String,

    /// Contact address.
    pub email: String,

    pub is_active: bool,

    pub subscription_ends_at: Option<Timestamp>,

    /// Tenant creation timestamp.
    pub created_at: Timestamp,

    /// Last update timestamp.
    pub updated_at: Timestamp,
}

impl TenantRecord {
    /// Whether the subscription has lapsed at `now`. Tenants without an end date never expire.
    #[must_use]
    pub fn subscription_expired(&self, now: Timestamp) -> bool {
        self.subscription_ends_at.is_some_and(|ends_at| ends_at < now)
    }

    /// The subscription end, when it falls within the warning window after `now`.
    #[must_use]
    pub fn subscription_expiring(&self, now: Timestamp) -> Option<Timestamp> {
        let ends_at = self.subscription_ends_at?;

        (ends_at >= now && ends_at.duration_since(now) <= SUBSCRIPTION_WARNING_WINDOW)
            .then_some(ends_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(subscription_ends_at: Option<Timestamp>) -> TenantRecord {
        TenantRecord {
            uuid: TenantUuid::new(),
            slug: "acme".to_string(),
            name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            is_active: true,
            subscription_ends_at,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn open_ended_subscription_never_expires() {
        let tenant = tenant(None);

        assert!(!tenant.subscription_expired(Timestamp::MAX));
        assert_eq!(tenant.subscription_expiring(Timestamp::UNIX_EPOCH), None);
    }

    #[test]
    fn subscription_expires_strictly_after_end() {
        let ends_at = Timestamp::UNIX_EPOCH + SignedDuration::from_hours(24);
        let tenant = tenant(Some(ends_at));

        assert!(!tenant.subscription_expired(ends_at));
        assert!(tenant.subscription_expired(ends_at + SignedDuration::from_secs(1)));
    }

    #[test]
    fn warning_window_is_seven_days() {
        let now = Timestamp::UNIX_EPOCH;

        let soon = tenant(Some(now + SignedDuration::from_hours(6 * 24)));
        let later = tenant(Some(now + SignedDuration::from_hours(8 * 24)));

        assert_eq!(soon.subscription_expiring(now), soon.subscription_ends_at);
        assert_eq!(later.subscription_expiring(now), None);
    }
}
