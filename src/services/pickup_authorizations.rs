use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::pickup_authorization::{
    CreateAuthorizationData, PickupAuthorization, UpdateAuthorizationData,
};
use crate::models::{Parent, Student};
use crate::services::authorization_store::AuthorizationStore;
use crate::services::authorization_window::{
    parse_date, validate_date_order, AuthorizationStatus, DaysOfWeek,
};
use crate::services::directory::Directory;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthorizationInput {
    pub authorized_parent_id: String,
    /// Legacy single-student field, merged into `student_ids`
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    /// Absent means every day; an explicit empty list means no day.
    #[serde(default)]
    pub allowed_days_of_week: Option<Vec<i32>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAuthorizationInput {
    pub authorized_parent_id: Option<String>,
    /// Legacy single-student field, merged into `student_ids`
    pub student_id: Option<String>,
    pub student_ids: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub allowed_days_of_week: Option<Vec<i32>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Parent> for ParentSummary {
    fn from(parent: Parent) -> Self {
        Self {
            id: parent.id,
            name: parent.name,
            email: parent.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub class_id: Option<Uuid>,
}

impl From<Student> for StudentSummary {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            class_id: student.class_id,
        }
    }
}

/// A grant joined with display fields and its status for the request day.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationDetails {
    #[serde(flatten)]
    pub authorization: PickupAuthorization,
    pub status: AuthorizationStatus,
    pub authorizing_parent: Option<ParentSummary>,
    pub authorized_parent: Option<ParentSummary>,
    pub students: Vec<StudentSummary>,
}

/// Parses an identifier supplied by a caller.
pub fn parse_id(value: &str, field: &str) -> Result<Uuid> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Uuid::parse_str(trimmed)
        .map_err(|_| AppError::Validation(format!("{} is not a valid identifier", field)))
}

/// Parses student ids, dropping duplicates while keeping order.
fn parse_student_ids<'a, I>(values: I) -> Result<Vec<Uuid>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids: Vec<Uuid> = Vec::new();
    for value in values {
        let id = parse_id(value, "student_id")?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(AppError::Validation(
            "At least one student is required".to_string(),
        ));
    }
    Ok(ids)
}

fn normalize_days(days: Option<&Vec<i32>>) -> Result<Option<Vec<i32>>> {
    days.map(|days| DaysOfWeek::from_numbers(days).map(DaysOfWeek::to_numbers))
        .transpose()
}

fn reject_self_grant(grantor_id: Uuid, grantee_id: Uuid) -> Result<()> {
    if grantor_id == grantee_id {
        return Err(AppError::Validation(
            "You cannot authorize yourself".to_string(),
        ));
    }
    Ok(())
}

/// Only the authorizing parent may mutate a grant.
pub struct AuthorizationService<S, D> {
    store: S,
    directory: D,
}

impl<S, D> AuthorizationService<S, D>
where
    S: AuthorizationStore,
    D: Directory,
{
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    /// Creates a grant owned by `grantor_id`
    pub async fn create(
        &self,
        grantor_id: Uuid,
        input: CreateAuthorizationInput,
    ) -> Result<PickupAuthorization> {
        let grantee_id = parse_id(&input.authorized_parent_id, "authorized_parent_id")?;
        let student_ids = parse_student_ids(input.student_id.iter().chain(&input.student_ids))?;
        let start_date = parse_date(&input.start_date)?;
        let end_date = parse_date(&input.end_date)?;
        validate_date_order(start_date, end_date)?;
        let allowed_days_of_week = normalize_days(input.allowed_days_of_week.as_ref())?;
        reject_self_grant(grantor_id, grantee_id)?;

        self.require_parent(grantor_id).await?;
        self.require_parent(grantee_id).await?;
        for student_id in &student_ids {
            self.require_student(*student_id).await?;
        }

        let authorization = self
            .store
            .insert(CreateAuthorizationData {
                authorizing_parent_id: grantor_id,
                authorized_parent_id: grantee_id,
                student_ids,
                start_date,
                end_date,
                allowed_days_of_week,
                is_active: input.is_active.unwrap_or(true),
            })
            .await?;

        tracing::info!(
            authorization_id = %authorization.id,
            grantor_id = %grantor_id,
            grantee_id = %grantee_id,
            "Pickup authorization created"
        );

        Ok(authorization)
    }

    /// Active, unexpired grants owned by the grantor that allow today's
    /// weekday. Scheduled grants that match the weekday are included.
    pub async fn list_for_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<AuthorizationDetails>> {
        let rows = self.store.list_current_by_grantor(grantor_id, today).await?;
        self.with_details(rows, today).await
    }

    /// Every grant owned by the grantor, whatever its status.
    pub async fn list_all_for_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<AuthorizationDetails>> {
        let rows = self.store.list_by_grantor(grantor_id).await?;
        self.with_details(rows, today).await
    }

    /// Every grant naming the grantee, unfiltered by date or weekday.
    pub async fn list_for_grantee(
        &self,
        grantee_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<AuthorizationDetails>> {
        let rows = self.store.list_by_grantee(grantee_id).await?;
        self.with_details(rows, today).await
    }

    /// A single grant visible to the caller as grantor or grantee.
    pub async fn get(
        &self,
        caller_id: Uuid,
        id: &str,
        today: NaiveDate,
    ) -> Result<AuthorizationDetails> {
        let id = parse_id(id, "authorization id")?;
        let authorization = self.require_authorization(id).await?;

        if authorization.authorizing_parent_id != caller_id
            && authorization.authorized_parent_id != caller_id
        {
            return Err(AppError::Permission(
                "You do not have access to this authorization".to_string(),
            ));
        }

        self.details(authorization, today).await
    }

    pub async fn update(
        &self,
        grantor_id: Uuid,
        id: &str,
        input: UpdateAuthorizationInput,
    ) -> Result<PickupAuthorization> {
        let id = parse_id(id, "authorization id")?;
        let existing = self.require_authorization(id).await?;
        Self::require_owner(&existing, grantor_id)?;

        let student_ids = match (&input.student_id, &input.student_ids) {
            (None, None) => None,
            (single, many) => Some(parse_student_ids(
                single.iter().chain(many.iter().flatten()),
            )?),
        };
        let patch = UpdateAuthorizationData {
            authorized_parent_id: input
                .authorized_parent_id
                .as_deref()
                .map(|v| parse_id(v, "authorized_parent_id"))
                .transpose()?,
            student_ids,
            start_date: input.start_date.as_deref().map(parse_date).transpose()?,
            end_date: input.end_date.as_deref().map(parse_date).transpose()?,
            allowed_days_of_week: normalize_days(input.allowed_days_of_week.as_ref())?,
            is_active: input.is_active,
        };

        validate_date_order(
            patch.start_date.unwrap_or(existing.start_date),
            patch.end_date.unwrap_or(existing.end_date),
        )?;
        if let Some(grantee_id) = patch.authorized_parent_id {
            reject_self_grant(grantor_id, grantee_id)?;
            self.require_parent(grantee_id).await?;
        }
        if let Some(student_ids) = &patch.student_ids {
            for student_id in student_ids {
                self.require_student(*student_id).await?;
            }
        }

        if patch.is_empty() {
            return Ok(existing);
        }

        match self.store.update_owned(id, grantor_id, patch).await? {
            Some(updated) => {
                tracing::info!(
                    authorization_id = %id,
                    grantor_id = %grantor_id,
                    "Pickup authorization updated"
                );
                Ok(updated)
            }
            // The row changed hands or disappeared between read and write.
            None => match self.store.find_by_id(id).await? {
                Some(_) => Err(Self::not_owner()),
                None => Err(Self::missing(id)),
            },
        }
    }

    pub async fn delete(&self, grantor_id: Uuid, id: &str) -> Result<()> {
        let id = parse_id(id, "authorization id")?;
        let existing = self.require_authorization(id).await?;
        Self::require_owner(&existing, grantor_id)?;

        if !self.store.delete_owned(id, grantor_id).await? {
            return Err(Self::missing(id));
        }

        tracing::info!(
            authorization_id = %id,
            grantor_id = %grantor_id,
            "Pickup authorization deleted"
        );

        Ok(())
    }

    /// Gate used when a pickup is attempted.
    pub async fn check_authorization(
        &self,
        student_id: &str,
        grantee_id: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        let student_id = parse_id(student_id, "student_id")?;
        let grantee_id = parse_id(grantee_id, "parent_id")?;

        let allowed = self
            .store
            .check_with_days(student_id, grantee_id, date)
            .await?;

        tracing::debug!(
            student_id = %student_id,
            grantee_id = %grantee_id,
            %date,
            allowed,
            "Pickup authorization checked"
        );

        Ok(allowed)
    }

    async fn require_authorization(&self, id: Uuid) -> Result<PickupAuthorization> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::missing(id))
    }

    fn require_owner(authorization: &PickupAuthorization, grantor_id: Uuid) -> Result<()> {
        if authorization.authorizing_parent_id != grantor_id {
            tracing::warn!(
                authorization_id = %authorization.id,
                caller_id = %grantor_id,
                "Mutation attempted by non-owner"
            );
            return Err(Self::not_owner());
        }
        Ok(())
    }

    fn not_owner() -> AppError {
        AppError::Permission(
            "Only the parent who created this authorization can change it".to_string(),
        )
    }

    fn missing(id: Uuid) -> AppError {
        AppError::NotFound(format!("Authorization {} not found", id))
    }

    async fn require_parent(&self, id: Uuid) -> Result<Parent> {
        self.directory
            .find_parent(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Parent {} not found", id)))
    }

    async fn require_student(&self, id: Uuid) -> Result<Student> {
        self.directory
            .find_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))
    }

    async fn details(
        &self,
        authorization: PickupAuthorization,
        today: NaiveDate,
    ) -> Result<AuthorizationDetails> {
        let authorizing_parent = self
            .directory
            .find_parent(authorization.authorizing_parent_id)
            .await?
            .map(ParentSummary::from);
        let authorized_parent = self
            .directory
            .find_parent(authorization.authorized_parent_id)
            .await?
            .map(ParentSummary::from);

        let mut students = Vec::with_capacity(authorization.student_ids.len());
        for student_id in &authorization.student_ids {
            if let Some(student) = self.directory.find_student(*student_id).await? {
                students.push(StudentSummary::from(student));
            }
        }

        Ok(AuthorizationDetails {
            status: authorization.window().status_on(today),
            authorization,
            authorizing_parent,
            authorized_parent,
            students,
        })
    }

    async fn with_details(
        &self,
        rows: Vec<PickupAuthorization>,
        today: NaiveDate,
    ) -> Result<Vec<AuthorizationDetails>> {
        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            details.push(self.details(row, today).await?);
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_blank_and_garbage() {
        assert!(matches!(
            parse_id("  ", "student_id"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_id("not-a-uuid", "student_id"),
            Err(AppError::Validation(_))
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {} ", id), "student_id").unwrap(), id);
    }

    #[test]
    fn student_ids_are_deduplicated_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = vec![a.to_string(), b.to_string(), a.to_string()];
        assert_eq!(parse_student_ids(&raw).unwrap(), vec![a, b]);
        assert!(parse_student_ids(&Vec::<String>::new()).is_err());
    }

    #[test]
    fn days_are_normalized() {
        assert_eq!(
            normalize_days(Some(&vec![5, 1, 1, 3])).unwrap(),
            Some(vec![1, 3, 5])
        );
        assert_eq!(normalize_days(Some(&vec![])).unwrap(), Some(vec![]));
        assert_eq!(normalize_days(None).unwrap(), None);
        assert!(normalize_days(Some(&vec![8])).is_err());
    }
}
