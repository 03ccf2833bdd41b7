use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::pickup_authorization::{
    CreateAuthorizationData, PickupAuthorization, UpdateAuthorizationData,
};
use crate::models::self_checkout::{CreateSelfCheckoutData, SelfCheckoutAuthorization};
use crate::models::{Parent, Student};
use crate::services::authorization_store::{AuthorizationStore, SelfCheckoutStore};
use crate::services::authorization_window::{is_expired, DaysOfWeek};
use crate::services::directory::Directory;

/// In-process store with the same filters and ordering as the SQL
#[derive(Default)]
pub struct MemoryStore {
    parents: RwLock<HashMap<Uuid, Parent>>,
    students: RwLock<HashMap<Uuid, Student>>,
    authorizations: RwLock<HashMap<Uuid, PickupAuthorization>>,
    self_checkouts: RwLock<HashMap<Uuid, SelfCheckoutAuthorization>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_parent(&self, parent: Parent) {
        self.parents.write().await.insert(parent.id, parent);
    }

    pub async fn put_student(&self, student: Student) {
        self.students.write().await.insert(student.id, student);
    }

    /// Marks a parent soft-deleted, like the directory's own delete path
    pub async fn soft_delete_parent(&self, id: Uuid) {
        if let Some(parent) = self.parents.write().await.get_mut(&id) {
            parent.deleted_at = Some(Utc::now());
        }
    }

    pub async fn authorization_count(&self) -> usize {
        self.authorizations.read().await.len()
    }
}

fn sorted<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (NaiveDate, chrono::DateTime<Utc>),
{
    rows.sort_by_key(|row| key(row));
    rows
}

fn authorization_order(auth: &PickupAuthorization) -> (NaiveDate, chrono::DateTime<Utc>) {
    (auth.start_date, auth.created_at)
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_parent(&self, id: Uuid) -> Result<Option<Parent>> {
        Ok(self
            .parents
            .read()
            .await
            .get(&id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }

    async fn find_student(&self, id: Uuid) -> Result<Option<Student>> {
        Ok(self
            .students
            .read()
            .await
            .get(&id)
            .filter(|s| s.deleted_at.is_none())
            .cloned())
    }

    async fn find_parent_by_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Parent>> {
        Ok(self
            .parents
            .read()
            .await
            .values()
            .find(|p| p.auth_user_id == Some(auth_user_id) && p.deleted_at.is_none())
            .cloned())
    }
}

#[async_trait]
impl AuthorizationStore for MemoryStore {
    async fn insert(&self, data: CreateAuthorizationData) -> Result<PickupAuthorization> {
        let now = Utc::now();
        let authorization = PickupAuthorization {
            id: Uuid::new_v4(),
            authorizing_parent_id: data.authorizing_parent_id,
            authorized_parent_id: data.authorized_parent_id,
            student_id: data.student_ids.first().copied().unwrap_or_default(),
            student_ids: data.student_ids,
            start_date: data.start_date,
            end_date: data.end_date,
            allowed_days_of_week: Some(
                data.allowed_days_of_week
                    .unwrap_or_else(|| DaysOfWeek::all().to_numbers()),
            ),
            is_active: data.is_active,
            created_at: now,
            updated_at: now,
        };

        self.authorizations
            .write()
            .await
            .insert(authorization.id, authorization.clone());

        Ok(authorization)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PickupAuthorization>> {
        Ok(self.authorizations.read().await.get(&id).cloned())
    }

    async fn list_current_by_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<PickupAuthorization>> {
        let rows = self
            .authorizations
            .read()
            .await
            .values()
            .filter(|a| {
                a.authorizing_parent_id == grantor_id
                    && a.is_active
                    && !is_expired(a.end_date, today)
                    && a.window().allowed_days.contains(today)
            })
            .cloned()
            .collect();

        Ok(sorted(rows, authorization_order))
    }

    async fn list_by_grantor(&self, grantor_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        let rows = self
            .authorizations
            .read()
            .await
            .values()
            .filter(|a| a.authorizing_parent_id == grantor_id)
            .cloned()
            .collect();

        Ok(sorted(rows, authorization_order))
    }

    async fn list_by_grantee(&self, grantee_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        let rows = self
            .authorizations
            .read()
            .await
            .values()
            .filter(|a| a.authorized_parent_id == grantee_id)
            .cloned()
            .collect();

        Ok(sorted(rows, authorization_order))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        grantor_id: Uuid,
        data: UpdateAuthorizationData,
    ) -> Result<Option<PickupAuthorization>> {
        let mut authorizations = self.authorizations.write().await;
        let Some(row) = authorizations
            .get_mut(&id)
            .filter(|a| a.authorizing_parent_id == grantor_id)
        else {
            return Ok(None);
        };

        if let Some(grantee) = data.authorized_parent_id {
            row.authorized_parent_id = grantee;
        }
        if let Some(student_ids) = data.student_ids {
            if let Some(first) = student_ids.first() {
                row.student_id = *first;
            }
            row.student_ids = student_ids;
        }
        if let Some(start_date) = data.start_date {
            row.start_date = start_date;
        }
        if let Some(end_date) = data.end_date {
            row.end_date = end_date;
        }
        if let Some(days) = data.allowed_days_of_week {
            row.allowed_days_of_week = Some(days);
        }
        if let Some(is_active) = data.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Utc::now();

        Ok(Some(row.clone()))
    }

    async fn delete_owned(&self, id: Uuid, grantor_id: Uuid) -> Result<bool> {
        let mut authorizations = self.authorizations.write().await;
        let owned = authorizations
            .get(&id)
            .is_some_and(|a| a.authorizing_parent_id == grantor_id);
        if owned {
            authorizations.remove(&id);
        }
        Ok(owned)
    }

    async fn check_with_days(
        &self,
        student_id: Uuid,
        grantee_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        Ok(self.authorizations.read().await.values().any(|a| {
            a.authorized_parent_id == grantee_id
                && a.covers_student(student_id)
                && a.window().is_exercisable_on(date)
        }))
    }
}

#[async_trait]
impl SelfCheckoutStore for MemoryStore {
    async fn insert_self_checkout(
        &self,
        data: CreateSelfCheckoutData,
    ) -> Result<SelfCheckoutAuthorization> {
        let now = Utc::now();
        let authorization = SelfCheckoutAuthorization {
            id: Uuid::new_v4(),
            parent_id: data.parent_id,
            student_id: data.student_id,
            start_date: data.start_date,
            end_date: data.end_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.self_checkouts
            .write()
            .await
            .insert(authorization.id, authorization.clone());

        Ok(authorization)
    }

    async fn find_self_checkout(&self, id: Uuid) -> Result<Option<SelfCheckoutAuthorization>> {
        Ok(self.self_checkouts.read().await.get(&id).cloned())
    }

    async fn list_self_checkouts_by_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<SelfCheckoutAuthorization>> {
        let rows = self
            .self_checkouts
            .read()
            .await
            .values()
            .filter(|a| a.parent_id == parent_id)
            .cloned()
            .collect();

        Ok(sorted(rows, |a: &SelfCheckoutAuthorization| {
            (a.start_date, a.created_at)
        }))
    }

    async fn set_self_checkout_active(
        &self,
        id: Uuid,
        parent_id: Uuid,
        is_active: bool,
    ) -> Result<Option<SelfCheckoutAuthorization>> {
        let mut rows = self.self_checkouts.write().await;
        Ok(rows
            .get_mut(&id)
            .filter(|a| a.parent_id == parent_id)
            .map(|row| {
                row.is_active = is_active;
                row.updated_at = Utc::now();
                row.clone()
            }))
    }

    async fn delete_self_checkout(&self, id: Uuid, parent_id: Uuid) -> Result<bool> {
        let mut rows = self.self_checkouts.write().await;
        let owned = rows.get(&id).is_some_and(|a| a.parent_id == parent_id);
        if owned {
            rows.remove(&id);
        }
        Ok(owned)
    }

    async fn is_self_checkout_allowed(&self, student_id: Uuid, date: NaiveDate) -> Result<bool> {
        Ok(self
            .self_checkouts
            .read()
            .await
            .values()
            .any(|a| a.student_id == student_id && a.window().is_exercisable_on(date)))
    }
}
