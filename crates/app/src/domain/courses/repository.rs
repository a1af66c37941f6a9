//! Courses Repository

use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    amounts::try_get_amount,
    courses::records::{CourseRecord, CourseUuid},
    users::UserUuid,
};

const GET_COURSE_SQL: &str = include_str!("sql/get_course.sql");
const INCREMENT_STUDENTS_COUNT_SQL: &str = include_str!("sql/increment_students_count.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCoursesRepository;

impl PgCoursesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_course(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        course: CourseUuid,
    ) -> Result<Option<CourseRecord>, sqlx::Error> {
        query_as::<Postgres, CourseRecord>(GET_COURSE_SQL)
            .bind(course.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn increment_students_count(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        course: CourseUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(INCREMENT_STUDENTS_COUNT_SQL)
            .bind(course.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CourseRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CourseUuid::from_uuid(row.try_get("uuid")?),
            instructor_uuid: UserUuid::from_uuid(row.try_get("instructor_uuid")?),
            title: row.try_get("title")?,
            price: try_get_amount(row, "price")?,
            is_published: row.try_get("is_published")?,
            is_approved: row.try_get("is_approved")?,
            students_count: try_get_amount(row, "students_count")?,
        })
    }
}
