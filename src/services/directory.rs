use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Parent, Student};
use crate::services::lookup_cache::LookupCache;

/// Read-only view of the parent and student tables.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_parent(&self, id: Uuid) -> Result<Option<Parent>>;

    async fn find_student(&self, id: Uuid) -> Result<Option<Student>>;

    /// Resolves the identity-provider user behind a session
    async fn find_parent_by_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Parent>>;
}

#[async_trait]
impl<T: Directory + ?Sized> Directory for Arc<T> {
    async fn find_parent(&self, id: Uuid) -> Result<Option<Parent>> {
        (**self).find_parent(id).await
    }

    async fn find_student(&self, id: Uuid) -> Result<Option<Student>> {
        (**self).find_student(id).await
    }

    async fn find_parent_by_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Parent>> {
        (**self).find_parent_by_auth_user(auth_user_id).await
    }
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_parent(&self, id: Uuid) -> Result<Option<Parent>> {
        Ok(Parent::find_by_id(&self.pool, id).await?)
    }

    async fn find_student(&self, id: Uuid) -> Result<Option<Student>> {
        Ok(Student::find_by_id(&self.pool, id).await?)
    }

    async fn find_parent_by_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Parent>> {
        Ok(Parent::find_by_auth_user_id(&self.pool, auth_user_id).await?)
    }
}

/// Wraps a directory with TTL caches for the by-id lookups.
pub struct CachedDirectory<D> {
    inner: D,
    parents: LookupCache<Uuid, Parent>,
    students: LookupCache<Uuid, Student>,
}

impl<D: Directory> CachedDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            parents: LookupCache::new(ttl),
            students: LookupCache::new(ttl),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn invalidate_parent(&self, id: Uuid) {
        self.parents.invalidate(&id);
    }

    /// Returns `(parents, students)` entries dropped.
    pub fn purge_expired(&self) -> (usize, usize) {
        (self.parents.purge_expired(), self.students.purge_expired())
    }

    pub fn cached_entries(&self) -> usize {
        self.parents.len() + self.students.len()
    }
}

#[async_trait]
impl<D: Directory> Directory for CachedDirectory<D> {
    async fn find_parent(&self, id: Uuid) -> Result<Option<Parent>> {
        self.parents
            .get_or_fetch(id, || self.inner.find_parent(id))
            .await
    }

    async fn find_student(&self, id: Uuid) -> Result<Option<Student>> {
        self.students
            .get_or_fetch(id, || self.inner.find_student(id))
            .await
    }

    async fn find_parent_by_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Parent>> {
        // Login path: always read through, then warm the by-id cache.
        let parent = self.inner.find_parent_by_auth_user(auth_user_id).await?;
        if let Some(parent) = &parent {
            self.parents.insert(parent.id, parent.clone());
        }
        Ok(parent)
    }
}
