use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Parent {
    pub id: Uuid,
    pub auth_user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: String, // "parent", "staff" or "admin"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parent {
    /// Finds a parent by internal ID, ignoring soft-deleted rows
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let parent = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM parents WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(parent)
    }

    /// Finds the parent linked to an identity-provider user
    pub async fn find_by_auth_user_id(
        pool: &PgPool,
        auth_user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let parent = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM parents WHERE auth_user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(auth_user_id)
        .fetch_optional(pool)
        .await?;

        Ok(parent)
    }
}
