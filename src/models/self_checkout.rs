use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::authorization_window::{AuthorizationWindow, DaysOfWeek};

/// Lets a student leave without a pickup event inside a date window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SelfCheckoutAuthorization {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub student_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSelfCheckoutData {
    pub parent_id: Uuid,
    pub student_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SelfCheckoutAuthorization {
    /// Self-checkout has no weekday restriction.
    pub fn window(&self) -> AuthorizationWindow {
        AuthorizationWindow {
            start_date: self.start_date,
            end_date: self.end_date,
            allowed_days: DaysOfWeek::all(),
            is_active: self.is_active,
        }
    }

    pub async fn create(pool: &PgPool, data: CreateSelfCheckoutData) -> Result<Self, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO self_checkout_authorizations (parent_id, student_id, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.parent_id)
        .bind(data.student_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(pool)
        .await?;

        Ok(authorization)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM self_checkout_authorizations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(authorization)
    }

    pub async fn list_by_parent(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let authorizations = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM self_checkout_authorizations
            WHERE parent_id = $1
            ORDER BY start_date ASC, created_at ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;

        Ok(authorizations)
    }

    pub async fn set_active_owned(
        pool: &PgPool,
        id: Uuid,
        parent_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let authorization = sqlx::query_as::<_, Self>(
            r#"
            UPDATE self_checkout_authorizations
            SET is_active = $3, updated_at = NOW()
            WHERE id = $1 AND parent_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(parent_id)
        .bind(is_active)
        .fetch_optional(pool)
        .await?;

        Ok(authorization)
    }

    pub async fn delete_owned(pool: &PgPool, id: Uuid, parent_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM self_checkout_authorizations
            WHERE id = $1 AND parent_id = $2
            "#,
        )
        .bind(id)
        .bind(parent_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any active window for the student covers `date`
    pub async fn is_allowed_on(
        pool: &PgPool,
        student_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM self_checkout_authorizations
                WHERE student_id = $1
                  AND is_active = TRUE
                  AND $2 BETWEEN start_date AND end_date
            )
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(allowed)
    }
}
