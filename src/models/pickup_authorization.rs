use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::authorization_window::{AuthorizationWindow, DaysOfWeek};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PickupAuthorization {
    pub id: Uuid,
    pub authorizing_parent_id: Uuid,
    pub authorized_parent_id: Uuid,
    pub student_id: Uuid, // legacy single-student column, first of student_ids
    pub student_ids: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allowed_days_of_week: Option<Vec<i32>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAuthorizationData {
    pub authorizing_parent_id: Uuid,
    pub authorized_parent_id: Uuid,
    pub student_ids: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `None` stores the column default (every day).
    pub allowed_days_of_week: Option<Vec<i32>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAuthorizationData {
    pub authorized_parent_id: Option<Uuid>,
    pub student_ids: Option<Vec<Uuid>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub allowed_days_of_week: Option<Vec<i32>>,
    pub is_active: Option<bool>,
}

impl UpdateAuthorizationData {
    pub fn is_empty(&self) -> bool {
        self.authorized_parent_id.is_none()
            && self.student_ids.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.allowed_days_of_week.is_none()
            && self.is_active.is_none()
    }
}

impl PickupAuthorization {
    pub fn window(&self) -> AuthorizationWindow {
        AuthorizationWindow {
            start_date: self.start_date,
            end_date: self.end_date,
            allowed_days: DaysOfWeek::from_stored(self.allowed_days_of_week.as_deref()),
            is_active: self.is_active,
        }
    }

    pub fn covers_student(&self, student_id: Uuid) -> bool {
        self.student_id == student_id || self.student_ids.contains(&student_id)
    }

    /// Creates a grant owned by `authorizing_parent_id`
    pub async fn create(pool: &PgPool, data: CreateAuthorizationData) -> Result<Self, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO pickup_authorizations (
                authorizing_parent_id, authorized_parent_id, student_id, student_ids,
                start_date, end_date, allowed_days_of_week, is_active
            )
            VALUES (
                $1, $2, ($3::UUID[])[1], $3,
                $4, $5, COALESCE($6::INT[], '{0,1,2,3,4,5,6}'::INT[]), $7
            )
            RETURNING *
            "#,
        )
        .bind(data.authorizing_parent_id)
        .bind(data.authorized_parent_id)
        .bind(&data.student_ids)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(&data.allowed_days_of_week)
        .bind(data.is_active)
        .fetch_one(pool)
        .await?;

        Ok(authorization)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pickup_authorizations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(authorization)
    }

    /// Active, unexpired grants of a grantor whose weekday set includes `today`
    pub async fn list_current_by_grantor(
        pool: &PgPool,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let authorizations = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pickup_authorizations
            WHERE authorizing_parent_id = $1
              AND is_active = TRUE
              AND end_date >= $2
              AND (
                  allowed_days_of_week IS NULL
                  OR EXTRACT(DOW FROM $2::DATE)::INT = ANY(allowed_days_of_week)
              )
            ORDER BY start_date ASC, created_at ASC
            "#,
        )
        .bind(grantor_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

        Ok(authorizations)
    }

    pub async fn list_by_grantor(pool: &PgPool, grantor_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let authorizations = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pickup_authorizations
            WHERE authorizing_parent_id = $1
            ORDER BY start_date ASC, created_at ASC
            "#,
        )
        .bind(grantor_id)
        .fetch_all(pool)
        .await?;

        Ok(authorizations)
    }

    pub async fn list_by_grantee(pool: &PgPool, grantee_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let authorizations = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pickup_authorizations
            WHERE authorized_parent_id = $1
            ORDER BY start_date ASC, created_at ASC
            "#,
        )
        .bind(grantee_id)
        .fetch_all(pool)
        .await?;

        Ok(authorizations)
    }

    /// Applies a partial update. Returns `None` when no row with this id is
    /// owned by `grantor_id`, in which case nothing was written.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        grantor_id: Uuid,
        data: UpdateAuthorizationData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            UPDATE pickup_authorizations
            SET
                authorized_parent_id = COALESCE($3, authorized_parent_id),
                student_id = COALESCE(($4::UUID[])[1], student_id),
                student_ids = COALESCE($4::UUID[], student_ids),
                start_date = COALESCE($5, start_date),
                end_date = COALESCE($6, end_date),
                allowed_days_of_week = COALESCE($7::INT[], allowed_days_of_week),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1 AND authorizing_parent_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(grantor_id)
        .bind(data.authorized_parent_id)
        .bind(data.student_ids)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.allowed_days_of_week)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await?;

        Ok(authorization)
    }

    /// Hard delete. Returns whether a row owned by `grantor_id` was removed.
    pub async fn delete_owned(pool: &PgPool, id: Uuid, grantor_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM pickup_authorizations
            WHERE id = $1 AND authorizing_parent_id = $2
            "#,
        )
        .bind(id)
        .bind(grantor_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Runs the server-side gating function
    pub async fn check_with_days(
        pool: &PgPool,
        student_id: Uuid,
        grantee_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT check_pickup_authorization_with_days($1, $2, $3)
            "#,
        )
        .bind(student_id)
        .bind(grantee_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(allowed)
    }
}
