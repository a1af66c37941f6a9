//! Course Records

use serde::Serialize;

use crate::{domain::users::UserUuid, uuids::TypedUuid};

/// Course UUID
pub type CourseUuid = TypedUuid<CourseRecord>;

/// Course Record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRecord {
    pub uuid: CourseUuid,
    pub instructor_uuid: UserUuid,
    pub title: String,

    /// Listed price in minor units.
    pub price: u64,

    pub is_published: bool,
    pub is_approved: bool,
    pub students_count: u64,
}

impl CourseRecord {
    /// Whether students may enroll.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.is_published && self.is_approved
    }
}
