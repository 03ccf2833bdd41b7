use axum::extract::FromRef;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::Config;
use crate::services::authorization_store::PgStore;
use crate::services::directory::{CachedDirectory, PgDirectory};
use crate::services::identity::AccessTokenVerifier;
use crate::services::pickup_authorizations::AuthorizationService;
use crate::services::self_checkout::SelfCheckoutService;

/// Session keys used in the application
pub const SESSION_KEY_PARENT_ID: &str = "parent_id";
pub const SESSION_KEY_SESSION_STARTED_AT: &str = "session_started_at";

/// Creates a session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    secure: bool,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    // Create the session store backed by PostgreSQL
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

pub type SharedDirectory = Arc<CachedDirectory<PgDirectory>>;
pub type PickupAuthorizations = AuthorizationService<PgStore, SharedDirectory>;
pub type SelfCheckouts = SelfCheckoutService<PgStore, SharedDirectory>;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub directory: SharedDirectory,
    pub authorizations: Arc<PickupAuthorizations>,
    pub self_checkouts: Arc<SelfCheckouts>,
    pub token_verifier: Arc<AccessTokenVerifier>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let directory: SharedDirectory = Arc::new(CachedDirectory::new(
            PgDirectory::new(pool.clone()),
            config.lookup_cache_ttl(),
        ));
        let store = PgStore::new(pool.clone());

        let token_verifier = AccessTokenVerifier::new(
            config.auth_jwt_secret.expose_secret().as_bytes(),
            &config.auth_jwt_audience,
        );

        Self {
            authorizations: Arc::new(AuthorizationService::new(
                store.clone(),
                directory.clone(),
            )),
            self_checkouts: Arc::new(SelfCheckoutService::new(store, directory.clone())),
            token_verifier: Arc::new(token_verifier),
            directory,
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
