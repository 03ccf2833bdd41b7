use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::self_checkout::{CreateSelfCheckoutData, SelfCheckoutAuthorization};
use crate::services::authorization_store::SelfCheckoutStore;
use crate::services::authorization_window::{parse_date, validate_date_order, AuthorizationStatus};
use crate::services::directory::Directory;
use crate::services::pickup_authorizations::{parse_id, StudentSummary};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSelfCheckoutInput {
    pub student_id: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfCheckoutDetails {
    #[serde(flatten)]
    pub authorization: SelfCheckoutAuthorization,
    pub status: AuthorizationStatus,
    pub student: Option<StudentSummary>,
}

pub struct SelfCheckoutService<S, D> {
    store: S,
    directory: D,
}

impl<S, D> SelfCheckoutService<S, D>
where
    S: SelfCheckoutStore,
    D: Directory,
{
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    pub async fn create(
        &self,
        parent_id: Uuid,
        input: CreateSelfCheckoutInput,
    ) -> Result<SelfCheckoutAuthorization> {
        let student_id = parse_id(&input.student_id, "student_id")?;
        let start_date = parse_date(&input.start_date)?;
        let end_date = parse_date(&input.end_date)?;
        validate_date_order(start_date, end_date)?;

        if self.directory.find_parent(parent_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Parent {} not found", parent_id)));
        }
        if self.directory.find_student(student_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Student {} not found",
                student_id
            )));
        }

        let authorization = self
            .store
            .insert_self_checkout(CreateSelfCheckoutData {
                parent_id,
                student_id,
                start_date,
                end_date,
            })
            .await?;

        tracing::info!(
            self_checkout_id = %authorization.id,
            parent_id = %parent_id,
            student_id = %student_id,
            "Self-checkout authorization created"
        );

        Ok(authorization)
    }

    pub async fn list_for_parent(
        &self,
        parent_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<SelfCheckoutDetails>> {
        let rows = self.store.list_self_checkouts_by_parent(parent_id).await?;

        let mut details = Vec::with_capacity(rows.len());
        for authorization in rows {
            let student = self
                .directory
                .find_student(authorization.student_id)
                .await?
                .map(StudentSummary::from);
            details.push(SelfCheckoutDetails {
                status: authorization.window().status_on(today),
                authorization,
                student,
            });
        }

        Ok(details)
    }

    pub async fn set_active(
        &self,
        parent_id: Uuid,
        id: &str,
        is_active: bool,
    ) -> Result<SelfCheckoutAuthorization> {
        let id = self.require_owned(parent_id, id).await?;

        let updated = self
            .store
            .set_self_checkout_active(id, parent_id, is_active)
            .await?
            .ok_or_else(|| missing(id))?;

        tracing::info!(self_checkout_id = %id, is_active, "Self-checkout authorization toggled");

        Ok(updated)
    }

    pub async fn delete(&self, parent_id: Uuid, id: &str) -> Result<()> {
        let id = self.require_owned(parent_id, id).await?;

        if !self.store.delete_self_checkout(id, parent_id).await? {
            return Err(missing(id));
        }

        tracing::info!(self_checkout_id = %id, "Self-checkout authorization deleted");

        Ok(())
    }

    pub async fn is_allowed(&self, student_id: &str, date: NaiveDate) -> Result<bool> {
        let student_id = parse_id(student_id, "student_id")?;
        self.store.is_self_checkout_allowed(student_id, date).await
    }

    async fn require_owned(&self, parent_id: Uuid, id: &str) -> Result<Uuid> {
        let id = parse_id(id, "self-checkout id")?;
        let existing = self
            .store
            .find_self_checkout(id)
            .await?
            .ok_or_else(|| missing(id))?;

        if existing.parent_id != parent_id {
            tracing::warn!(self_checkout_id = %id, caller_id = %parent_id, "Mutation attempted by non-owner");
            return Err(AppError::Permission(
                "Only the parent who created this self-checkout can change it".to_string(),
            ));
        }

        Ok(id)
    }
}

fn missing(id: Uuid) -> AppError {
    AppError::NotFound(format!("Self-checkout authorization {} not found", id))
}
