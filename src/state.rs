use std::sync::Arc;

use crate::auth::{DynCredentialStore, NavigationGuard, SessionManager, SqliteCredentialStore};
use crate::cache::{ItemCache, ReactionCache, TagCache, UserCache};
use crate::config::Config;
use crate::db;
use crate::error::Failure;
use crate::gateway::{DynGateway, HttpGateway};

/// Everything a front end needs, wired to one gateway and one credential
/// store.
#[derive(Clone)]
pub struct ClientContext {
    pub gateway: DynGateway,
    pub store: DynCredentialStore,
    pub session: Arc<SessionManager>,
    pub items: Arc<ItemCache>,
    pub tags: Arc<TagCache>,
    pub users: Arc<UserCache>,
    pub reactions: Arc<ReactionCache>,
    pub guard: Arc<NavigationGuard>,
}

impl ClientContext {
    pub fn new(gateway: DynGateway, store: DynCredentialStore) -> Self {
        let session = Arc::new(SessionManager::new(gateway.clone(), store.clone()));
        let items = Arc::new(ItemCache::new(gateway.clone(), session.clone()));
        let users = Arc::new(UserCache::new(gateway.clone(), session.clone()));
        let guard = Arc::new(NavigationGuard::new(
            session.clone(),
            items.clone(),
            users.clone(),
        ));

        Self {
            tags: Arc::new(TagCache::new(gateway.clone())),
            reactions: Arc::new(ReactionCache::new(gateway.clone(), session.clone())),
            gateway,
            store,
            session,
            items,
            users,
            guard,
        }
    }

    /// Build the HTTP client and the on-disk credential store described by
    /// `config`, then restore the stored session.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let gateway = HttpGateway::new(&config.api)?;
        tracing::info!("API: {}", gateway.base_url());

        let path = config.credentials_path();
        let pool = db::create_pool(&path)?;
        db::run_migrations(&pool)?;
        tracing::debug!("Credential store: {}", path.display());

        let context = Self::new(
            Arc::new(gateway),
            Arc::new(SqliteCredentialStore::new(pool)),
        );
        context.session.rehydrate().await;
        Ok(context)
    }

    /// Sign out and drop cached data that belonged to the session.
    pub async fn logout(&self) -> Result<(), Failure> {
        let result = self.session.logout().await;
        self.items.forget_mine();
        result
    }
}
