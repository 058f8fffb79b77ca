// Persisted credential store - the only durable state the client keeps
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::cache::lock;
use crate::db::DbPool;
use crate::error::ClientResult;
use crate::models::UserSummary;

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";

/// A session as it is written to disk: the bearer token and the user it
/// belongs to. One is never stored without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredentials {
    pub token: String,
    pub user: UserSummary,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no complete session is stored. A stored user record
    /// that does not parse is an error.
    async fn load(&self) -> ClientResult<Option<StoredCredentials>>;

    /// Write token and user together.
    async fn save(&self, credentials: &StoredCredentials) -> ClientResult<()>;

    /// Remove token and user together. Clearing an empty store is fine.
    async fn clear(&self) -> ClientResult<()>;
}

pub type DynCredentialStore = Arc<dyn CredentialStore>;

/// Assemble stored values into credentials, refusing half-written state.
fn assemble(token: Option<String>, user_json: Option<String>) -> ClientResult<Option<StoredCredentials>> {
    match (token, user_json) {
        (Some(token), Some(user_json)) => {
            let user: UserSummary = serde_json::from_str(&user_json)?;
            Ok(Some(StoredCredentials { token, user }))
        }
        (None, None) => Ok(None),
        (token, _) => {
            tracing::warn!(
                has_token = token.is_some(),
                "Ignoring partially stored credentials"
            );
            Ok(None)
        }
    }
}

/// SQLite implementation backed by the `credentials` table.
pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read(&self, key: &str) -> ClientResult<Option<String>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT value FROM credentials WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn load(&self) -> ClientResult<Option<StoredCredentials>> {
        let token = self.read(TOKEN_KEY)?;
        let user_json = self.read(USER_KEY)?;
        assemble(token, user_json)
    }

    async fn save(&self, credentials: &StoredCredentials) -> ClientResult<()> {
        let user_json = serde_json::to_string(&credentials.user)?;
        let mut conn = self.pool.get()?;

        let tx = conn.transaction()?;
        for (key, value) in [(TOKEN_KEY, credentials.token.as_str()), (USER_KEY, user_json.as_str())] {
            tx.execute(
                "INSERT INTO credentials (key, value, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![key, value],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        let mut conn = self.pool.get()?;

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM credentials WHERE key IN (?1, ?2)",
            params![TOKEN_KEY, USER_KEY],
        )?;
        tx.commit()?;

        Ok(())
    }
}

/// Process-local store. Holds the raw strings, like browser storage would,
/// so tests can plant values the client never wrote itself.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<(Option<String>, Option<String>)>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(token: Option<&str>, user_json: Option<&str>) -> Self {
        Self {
            values: Mutex::new((token.map(str::to_string), user_json.map(str::to_string))),
        }
    }

    pub fn raw(&self) -> (Option<String>, Option<String>) {
        lock(&self.values).clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> ClientResult<Option<StoredCredentials>> {
        let (token, user_json) = self.raw();
        assemble(token, user_json)
    }

    async fn save(&self, credentials: &StoredCredentials) -> ClientResult<()> {
        let user_json = serde_json::to_string(&credentials.user)?;
        *lock(&self.values) = (Some(credentials.token.clone()), Some(user_json));
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *lock(&self.values) = (None, None);
        Ok(())
    }
}
