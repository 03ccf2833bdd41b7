use chrono::{NaiveDate, Utc};
use pickup::db;
use pickup::models::{Parent, Student};
use pickup::services::memory_store::MemoryStore;
use pickup::services::pickup_authorizations::{AuthorizationService, CreateAuthorizationInput};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Postgres-backed tests only run when `DATABASE_URL` points at a database.
#[allow(dead_code)]
pub fn database_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

/// Skip test with message if no database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        if !crate::common::database_available() {
            eprintln!("Skipping: DATABASE_URL not set");
            return;
        }
    };
}

/// Connects and applies the embedded migrations.
#[allow(dead_code)]
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL set");
    let pool = db::create_pool(&url).await.expect("connect to test database");
    db::run_migrations(&pool).await.expect("run migrations");
    pool
}

#[allow(dead_code)]
pub async fn insert_parent(pool: &PgPool, name: &str) -> Parent {
    sqlx::query_as::<_, Parent>(
        r#"
        INSERT INTO parents (auth_user_id, name, email)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(format!("{}-{}@example.org", name.to_lowercase(), Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("insert parent")
}

#[allow(dead_code)]
pub async fn insert_student(pool: &PgPool, name: &str) -> Student {
    sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (name, class_id)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await
    .expect("insert student")
}

pub type MemoryAuthorizations = AuthorizationService<Arc<MemoryStore>, Arc<MemoryStore>>;

/// Three parents and two students seeded into a fresh in-memory store.
#[allow(dead_code)]
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub service: MemoryAuthorizations,
    pub grantor: Parent,
    pub grantee: Parent,
    pub outsider: Parent,
    pub student: Student,
    pub sibling: Student,
}

#[allow(dead_code)]
pub fn parent(name: &str) -> Parent {
    let now = Utc::now();
    Parent {
        id: Uuid::new_v4(),
        auth_user_id: Some(Uuid::new_v4()),
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        role: "parent".to_string(),
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[allow(dead_code)]
pub fn student(name: &str) -> Student {
    let now = Utc::now();
    Student {
        id: Uuid::new_v4(),
        name: name.to_string(),
        class_id: Some(Uuid::new_v4()),
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[allow(dead_code)]
pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
}

#[allow(dead_code)]
pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());

    let grantor = parent("Alice");
    let grantee = parent("Bob");
    let outsider = parent("Mallory");
    let charlie = student("Charlie");
    let dana = student("Dana");

    for p in [&grantor, &grantee, &outsider] {
        store.put_parent(p.clone()).await;
    }
    store.put_student(charlie.clone()).await;
    store.put_student(dana.clone()).await;

    Fixture {
        service: AuthorizationService::new(store.clone(), store.clone()),
        store,
        grantor,
        grantee,
        outsider,
        student: charlie,
        sibling: dana,
    }
}

/// January 2024, weekdays only, for one student.
#[allow(dead_code)]
pub fn weekday_grant(grantee: &Parent, student: &Student) -> CreateAuthorizationInput {
    CreateAuthorizationInput {
        authorized_parent_id: grantee.id.to_string(),
        student_id: None,
        student_ids: vec![student.id.to_string()],
        start_date: "2024-01-01".to_string(),
        end_date: "2024-01-31".to_string(),
        allowed_days_of_week: Some(vec![1, 2, 3, 4, 5]),
        is_active: None,
    }
}
