use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::pickup_authorization::{
    CreateAuthorizationData, PickupAuthorization, UpdateAuthorizationData,
};
use crate::models::self_checkout::{CreateSelfCheckoutData, SelfCheckoutAuthorization};

#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn insert(&self, data: CreateAuthorizationData) -> Result<PickupAuthorization>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PickupAuthorization>>;

    /// Active, unexpired grants of `grantor_id` whose weekday set contains `today`
    async fn list_current_by_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<PickupAuthorization>>;

    async fn list_by_grantor(&self, grantor_id: Uuid) -> Result<Vec<PickupAuthorization>>;

    async fn list_by_grantee(&self, grantee_id: Uuid) -> Result<Vec<PickupAuthorization>>;

    /// `None` when no row with `id` is owned by `grantor_id`
    async fn update_owned(
        &self,
        id: Uuid,
        grantor_id: Uuid,
        data: UpdateAuthorizationData,
    ) -> Result<Option<PickupAuthorization>>;

    /// Returns true if a row was removed
    async fn delete_owned(&self, id: Uuid, grantor_id: Uuid) -> Result<bool>;

    /// Whether any active grant lets `grantee_id` collect `student_id` on `date`
    async fn check_with_days(
        &self,
        student_id: Uuid,
        grantee_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool>;
}

#[async_trait]
pub trait SelfCheckoutStore: Send + Sync {
    async fn insert_self_checkout(
        &self,
        data: CreateSelfCheckoutData,
    ) -> Result<SelfCheckoutAuthorization>;

    async fn find_self_checkout(&self, id: Uuid) -> Result<Option<SelfCheckoutAuthorization>>;

    async fn list_self_checkouts_by_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<SelfCheckoutAuthorization>>;

    async fn set_self_checkout_active(
        &self,
        id: Uuid,
        parent_id: Uuid,
        is_active: bool,
    ) -> Result<Option<SelfCheckoutAuthorization>>;

    async fn delete_self_checkout(&self, id: Uuid, parent_id: Uuid) -> Result<bool>;

    async fn is_self_checkout_allowed(&self, student_id: Uuid, date: NaiveDate) -> Result<bool>;
}

#[async_trait]
impl<T: AuthorizationStore + ?Sized> AuthorizationStore for Arc<T> {
    async fn insert(&self, data: CreateAuthorizationData) -> Result<PickupAuthorization> {
        (**self).insert(data).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PickupAuthorization>> {
        (**self).find_by_id(id).await
    }

    async fn list_current_by_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<PickupAuthorization>> {
        (**self).list_current_by_grantor(grantor_id, today).await
    }

    async fn list_by_grantor(&self, grantor_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        (**self).list_by_grantor(grantor_id).await
    }

    async fn list_by_grantee(&self, grantee_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        (**self).list_by_grantee(grantee_id).await
    }

    async fn update_owned(
        &self,
        id: Uuid,
        grantor_id: Uuid,
        data: UpdateAuthorizationData,
    ) -> Result<Option<PickupAuthorization>> {
        (**self).update_owned(id, grantor_id, data).await
    }

    async fn delete_owned(&self, id: Uuid, grantor_id: Uuid) -> Result<bool> {
        (**self).delete_owned(id, grantor_id).await
    }

    async fn check_with_days(
        &self,
        student_id: Uuid,
        grantee_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        (**self).check_with_days(student_id, grantee_id, date).await
    }
}

#[async_trait]
impl<T: SelfCheckoutStore + ?Sized> SelfCheckoutStore for Arc<T> {
    async fn insert_self_checkout(
        &self,
        data: CreateSelfCheckoutData,
    ) -> Result<SelfCheckoutAuthorization> {
        (**self).insert_self_checkout(data).await
    }

    async fn find_self_checkout(&self, id: Uuid) -> Result<Option<SelfCheckoutAuthorization>> {
        (**self).find_self_checkout(id).await
    }

    async fn list_self_checkouts_by_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<SelfCheckoutAuthorization>> {
        (**self).list_self_checkouts_by_parent(parent_id).await
    }

    async fn set_self_checkout_active(
        &self,
        id: Uuid,
        parent_id: Uuid,
        is_active: bool,
    ) -> Result<Option<SelfCheckoutAuthorization>> {
        (**self).set_self_checkout_active(id, parent_id, is_active).await
    }

    async fn delete_self_checkout(&self, id: Uuid, parent_id: Uuid) -> Result<bool> {
        (**self).delete_self_checkout(id, parent_id).await
    }

    async fn is_self_checkout_allowed(&self, student_id: Uuid, date: NaiveDate) -> Result<bool> {
        (**self).is_self_checkout_allowed(student_id, date).await
    }
}

/// Postgres-backed store; the SQL lives on the model types.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationStore for PgStore {
    async fn insert(&self, data: CreateAuthorizationData) -> Result<PickupAuthorization> {
        Ok(PickupAuthorization::create(&self.pool, data).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PickupAuthorization>> {
        Ok(PickupAuthorization::find_by_id(&self.pool, id).await?)
    }

    async fn list_current_by_grantor(
        &self,
        grantor_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<PickupAuthorization>> {
        Ok(PickupAuthorization::list_current_by_grantor(&self.pool, grantor_id, today).await?)
    }

    async fn list_by_grantor(&self, grantor_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        Ok(PickupAuthorization::list_by_grantor(&self.pool, grantor_id).await?)
    }

    async fn list_by_grantee(&self, grantee_id: Uuid) -> Result<Vec<PickupAuthorization>> {
        Ok(PickupAuthorization::list_by_grantee(&self.pool, grantee_id).await?)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        grantor_id: Uuid,
        data: UpdateAuthorizationData,
    ) -> Result<Option<PickupAuthorization>> {
        Ok(PickupAuthorization::update_owned(&self.pool, id, grantor_id, data).await?)
    }

    async fn delete_owned(&self, id: Uuid, grantor_id: Uuid) -> Result<bool> {
        Ok(PickupAuthorization::delete_owned(&self.pool, id, grantor_id).await?)
    }

    async fn check_with_days(
        &self,
        student_id: Uuid,
        grantee_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        Ok(PickupAuthorization::check_with_days(&self.pool, student_id, grantee_id, date).await?)
    }
}

#[async_trait]
impl SelfCheckoutStore for PgStore {
    async fn insert_self_checkout(
        &self,
        data: CreateSelfCheckoutData,
    ) -> Result<SelfCheckoutAuthorization> {
        Ok(SelfCheckoutAuthorization::create(&self.pool, data).await?)
    }

    async fn find_self_checkout(&self, id: Uuid) -> Result<Option<SelfCheckoutAuthorization>> {
        Ok(SelfCheckoutAuthorization::find_by_id(&self.pool, id).await?)
    }

    async fn list_self_checkouts_by_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<SelfCheckoutAuthorization>> {
        Ok(SelfCheckoutAuthorization::list_by_parent(&self.pool, parent_id).await?)
    }

    async fn set_self_checkout_active(
        &self,
        id: Uuid,
        parent_id: Uuid,
        is_active: bool,
    ) -> Result<Option<SelfCheckoutAuthorization>> {
        Ok(SelfCheckoutAuthorization::set_active_owned(&self.pool, id, parent_id, is_active).await?)
    }

    async fn delete_self_checkout(&self, id: Uuid, parent_id: Uuid) -> Result<bool> {
        Ok(SelfCheckoutAuthorization::delete_owned(&self.pool, id, parent_id).await?)
    }

    async fn is_self_checkout_allowed(&self, student_id: Uuid, date: NaiveDate) -> Result<bool> {
        Ok(SelfCheckoutAuthorization::is_allowed_on(&self.pool, student_id, date).await?)
    }
}
