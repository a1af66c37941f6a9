//! Locally generated payment references.
//!
//! References look like `ENRL_{enrollment}_{unix_seconds}_{13 hex chars}` so the
//! enrollment can be recovered from a provider callback that only echoes the
//! reference back.

use jiff::Timestamp;
use rand::Rng;

use crate::domain::enrollments::records::EnrollmentUuid;

const PREFIX: &str = "ENRL_";

/// Generate a fresh reference for `enrollment`.
#[must_use]
pub fn generate_reference(enrollment: EnrollmentUuid, now: Timestamp) -> String {
    let suffix: u64 = rand::thread_rng().r#gen::<u64>() & 0x000F_FFFF_FFFF_FFFF;

    format!("{PREFIX}{enrollment}_{}_{suffix:013x}", now.as_second())
}

/// Recover the enrollment a reference was generated for.
#[must_use]
pub fn enrollment_from_reference(reference: &str) -> Option<EnrollmentUuid> {
    let rest = reference.strip_prefix(PREFIX)?;
    let (uuid, _) = rest.split_once('_')?;

    uuid.parse::<uuid::Uuid>()
        .ok()
        .map(EnrollmentUuid::from_uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_has_expected_shape() {
        let enrollment = EnrollmentUuid::new();
        let now = Timestamp::from_second(1_700_000_000).unwrap_or(Timestamp::UNIX_EPOCH);

        let reference = generate_reference(enrollment, now);
        let parts: Vec<&str> = reference.split('_').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts.first(), Some(&"ENRL"));
        assert_eq!(parts.get(1), Some(&enrollment.to_string().as_str()));
        assert_eq!(parts.get(2), Some(&"1700000000"));
        assert_eq!(parts.get(3).map(|hex| hex.len()), Some(13));
    }

    #[test]
    fn references_are_unique() {
        let enrollment = EnrollmentUuid::new();
        let now = Timestamp::now();

        assert_ne!(
            generate_reference(enrollment, now),
            generate_reference(enrollment, now)
        );
    }

    #[test]
    fn enrollment_round_trips_through_reference() {
        let enrollment = EnrollmentUuid::new();

        let reference = generate_reference(enrollment, Timestamp::now());

        assert_eq!(enrollment_from_reference(&reference), Some(enrollment));
    }

    #[test]
    fn foreign_references_yield_nothing() {
        assert_eq!(enrollment_from_reference("12345"), None);
        assert_eq!(enrollment_from_reference("ENRL_not-a-uuid_1_abc"), None);
    }
}
