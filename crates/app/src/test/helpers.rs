//! Test Helpers

use jiff::Timestamp;

use crate::{
    domain::{
        amounts::try_into_db_amount,
        coupons::records::{CouponKind, CouponRecord, CouponUuid},
        courses::records::{CourseRecord, CourseUuid},
        tenants::records::TenantUuid,
        users::UserUuid,
    },
    test::TestContext,
};

#[derive(Debug, Clone)]
pub(crate) struct NewTestCourse {
    pub instructor: UserUuid,
    pub title: String,
    pub price: u64,
    pub is_published: bool,
    pub is_approved: bool,
}

impl NewTestCourse {
    /// A published, approved course.
    pub(crate) fn new(instructor: UserUuid, price: u64) -> Self {
        Self {
            instructor,
            title: "Intro to Arabic Calligraphy".to_string(),
            price,
            is_published: true,
            is_approved: true,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewTestCoupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: u64,
    pub min_amount: Option<u64>,
    pub max_uses: Option<u64>,
    pub is_active: bool,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub course_uuid: Option<CourseUuid>,
    pub instructor_uuid: UserUuid,
}

impl NewTestCoupon {
    pub(crate) fn percentage(code: &str, percent: u64, instructor: UserUuid) -> Self {
        Self {
            code: code.to_string(),
            kind: CouponKind::Percentage,
            value: percent,
            min_amount: None,
            max_uses: None,
            is_active: true,
            starts_at: None,
            expires_at: None,
            course_uuid: None,
            instructor_uuid: instructor,
        }
    }

    pub(crate) fn fixed(code: &str, amount: u64, instructor: UserUuid) -> Self {
        Self {
            kind: CouponKind::Fixed,
            value: amount,
            ..Self::percentage(code, 0, instructor)
        }
    }
}

pub(crate) async fn create_course(
    ctx: &TestContext,
    tenant: TenantUuid,
    instructor: UserUuid,
    price: u64,
) -> Result<CourseRecord, sqlx::Error> {
    create_course_with(ctx, tenant, NewTestCourse::new(instructor, price)).await
}

pub(crate) async fn create_course_with(
    ctx: &TestContext,
    tenant: TenantUuid,
    course: NewTestCourse,
) -> Result<CourseRecord, sqlx::Error> {
    let mut tx = ctx.app.begin_tenant_transaction(tenant).await?;

    let record = sqlx::query_as::<_, CourseRecord>(
        "INSERT INTO courses (uuid, instructor_uuid, title, price, is_published, is_approved) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING uuid, instructor_uuid, title, price, is_published, is_approved, students_count",
    )
    .bind(CourseUuid::new().into_uuid())
    .bind(course.instructor.into_uuid())
    .bind(course.title)
    .bind(try_into_db_amount(course.price, "price")?)
    .bind(course.is_published)
    .bind(course.is_approved)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(record)
}

pub(crate) async fn create_coupon(
    ctx: &TestContext,
    tenant: TenantUuid,
    coupon: NewTestCoupon,
) -> Result<CouponRecord, sqlx::Error> {
    let mut tx = ctx.app.begin_tenant_transaction(tenant).await?;

    let record = sqlx::query_as::<_, CouponRecord>(
        "INSERT INTO coupons (uuid, code, kind, value, min_amount, max_uses, is_active, \
           starts_at, expires_at, course_uuid, instructor_uuid) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING uuid, code, kind, value, min_amount, max_uses, uses_count, is_active, \
           starts_at, expires_at, course_uuid, instructor_uuid, created_at, updated_at",
    )
    .bind(CouponUuid::new().into_uuid())
    .bind(coupon.code)
    .bind(coupon.kind.as_str())
    .bind(try_into_db_amount(coupon.value, "value")?)
    .bind(coupon.min_amount.map(|v| try_into_db_amount(v, "min_amount")).transpose()?)
    .bind(coupon.max_uses.map(|v| try_into_db_amount(v, "max_uses")).transpose()?)
    .bind(coupon.is_active)
    .bind(coupon.starts_at.map(jiff_sqlx::Timestamp::from))
    .bind(coupon.expires_at.map(jiff_sqlx::Timestamp::from))
    .bind(coupon.course_uuid.map(CourseUuid::into_uuid))
    .bind(coupon.instructor_uuid.into_uuid())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(record)
}
