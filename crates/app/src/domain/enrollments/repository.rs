//! Enrollments Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{
    FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar, types::Json,
};

use crate::domain::{
    amounts::{try_get_amount, try_into_db_amount},
    courses::records::CourseUuid,
    enrollments::{
        data::NewEnrollment,
        records::{EnrollmentMetadata, EnrollmentRecord, EnrollmentUuid, PaymentStatus},
    },
    users::UserUuid,
};

const ENROLLMENT_EXISTS_SQL: &str = include_str!("sql/enrollment_exists.sql");
const CREATE_ENROLLMENT_SQL: &str = include_str!("sql/create_enrollment.sql");
const GET_ENROLLMENT_SQL: &str = include_str!("sql/get_enrollment.sql");
const RECORD_PAYMENT_SESSION_SQL: &str = include_str!("sql/record_payment_session.sql");
const MARK_PAYMENT_FAILED_SQL: &str = include_str!("sql/mark_payment_failed.sql");
const COMPLETE_PAYMENT_SQL: &str = include_str!("sql/complete_payment.sql");
const REFUND_ENROLLMENT_SQL: &str = include_str!("sql/refund_enrollment.sql");

/// Enrollment persistence.
///
/// Status-changing writes are conditional on the expected source status and return
/// `None` when another writer got there first.
#[derive(Debug, Clone, Default)]
pub(crate) struct PgEnrollmentsRepository;

impl PgEnrollmentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        course: CourseUuid,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(ENROLLMENT_EXISTS_SQL)
            .bind(user.into_uuid())
            .bind(course.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_enrollment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: NewEnrollment,
        now: Timestamp,
    ) -> Result<EnrollmentRecord, sqlx::Error> {
        let completed_at =
            (enrollment.payment_status == PaymentStatus::Completed).then(|| SqlxTimestamp::from(now));

        query_as::<Postgres, EnrollmentRecord>(CREATE_ENROLLMENT_SQL)
            .bind(enrollment.uuid.into_uuid())
            .bind(enrollment.user_uuid.into_uuid())
            .bind(enrollment.course_uuid.into_uuid())
            .bind(try_into_db_amount(enrollment.price, "price")?)
            .bind(try_into_db_amount(enrollment.paid_amount, "paid_amount")?)
            .bind(enrollment.payment_method)
            .bind(enrollment.payment_status.as_str())
            .bind(completed_at)
            .bind(Json(enrollment.metadata))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_enrollment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: EnrollmentUuid,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        query_as::<Postgres, EnrollmentRecord>(GET_ENROLLMENT_SQL)
            .bind(enrollment.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn record_payment_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: EnrollmentUuid,
        reference: &str,
        metadata: &EnrollmentMetadata,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        query_as::<Postgres, EnrollmentRecord>(RECORD_PAYMENT_SESSION_SQL)
            .bind(enrollment.into_uuid())
            .bind(reference)
            .bind(Json(metadata))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn mark_payment_failed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: EnrollmentUuid,
        metadata: &EnrollmentMetadata,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        query_as::<Postgres, EnrollmentRecord>(MARK_PAYMENT_FAILED_SQL)
            .bind(enrollment.into_uuid())
            .bind(Json(metadata))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn complete_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: EnrollmentUuid,
        reference: &str,
        now: Timestamp,
        metadata: &EnrollmentMetadata,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        query_as::<Postgres, EnrollmentRecord>(COMPLETE_PAYMENT_SQL)
            .bind(enrollment.into_uuid())
            .bind(reference)
            .bind(SqlxTimestamp::from(now))
            .bind(Json(metadata))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn refund_enrollment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        enrollment: EnrollmentUuid,
        metadata: &EnrollmentMetadata,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        query_as::<Postgres, EnrollmentRecord>(REFUND_ENROLLMENT_SQL)
            .bind(enrollment.into_uuid())
            .bind(Json(metadata))
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for EnrollmentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("payment_status")?;

        Ok(Self {
            uuid: EnrollmentUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            course_uuid: CourseUuid::from_uuid(row.try_get("course_uuid")?),
            price: try_get_amount(row, "price")?,
            paid_amount: try_get_amount(row, "paid_amount")?,
            payment_method: row.try_get("payment_method")?,
            payment_status: status
                .parse::<PaymentStatus>()
                .map_err(|e| sqlx::Error::ColumnDecode {
                    index: "payment_status".to_string(),
                    source: Box::new(e),
                })?,
            transaction_id: row.try_get("transaction_id")?,
            enrolled_at: row
                .try_get::<Option<SqlxTimestamp>, _>("enrolled_at")?
                .map(SqlxTimestamp::to_jiff),
            completed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("completed_at")?
                .map(SqlxTimestamp::to_jiff),
            metadata: row
                .try_get::<Json<EnrollmentMetadata>, _>("metadata")?
                .0,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
