use std::sync::Mutex;
use tokio::sync::OnceCell;

use super::credentials::{DynCredentialStore, StoredCredentials};
use crate::cache::{lock, RequestTracker};
use crate::error::{ClientResult, Failure};
use crate::gateway::DynGateway;
use crate::models::{AuthResponse, EntityId, LoginRequest, SignupRequest, UserSummary};

/// Token and user of a signed-in session. Kept together so one can never be
/// present without the other.
#[derive(Debug, Clone, PartialEq)]
struct Identity {
    token: String,
    user: UserSummary,
}

/// Snapshot of the authentication state, as read by views and the guard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    identity: Option<Identity>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }

    pub fn user(&self) -> Option<&UserSummary> {
        self.identity.as_ref().map(|i| &i.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().map(|u| u.is_admin).unwrap_or(false)
    }
}

/// Owns "who is logged in".
///
/// The only writer of the in-memory session, the persisted credentials and
/// the gateway's authorization header.
pub struct SessionManager {
    gateway: DynGateway,
    store: DynCredentialStore,
    identity: Mutex<Option<Identity>>,
    tracker: RequestTracker,
    rehydrated: OnceCell<()>,
}

impl SessionManager {
    pub fn new(gateway: DynGateway, store: DynCredentialStore) -> Self {
        Self {
            gateway,
            store,
            identity: Mutex::new(None),
            tracker: RequestTracker::new(),
            rehydrated: OnceCell::new(),
        }
    }

    pub fn session(&self) -> Session {
        let status = self.tracker.status();
        Session {
            identity: lock(&self.identity).clone(),
            is_loading: status.loading,
            last_error: status.error,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.identity).is_some()
    }

    pub fn is_admin(&self) -> bool {
        lock(&self.identity)
            .as_ref()
            .map(|i| i.user.is_admin)
            .unwrap_or(false)
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        lock(&self.identity).as_ref().map(|i| i.user.clone())
    }

    /// Id of the signed-in user. Ownership checks resolve through here rather
    /// than through a copy held elsewhere.
    pub fn current_user_id(&self) -> Option<EntityId> {
        lock(&self.identity).as_ref().map(|i| i.user.id.clone())
    }

    pub fn is_current_user(&self, id: &EntityId) -> bool {
        lock(&self.identity)
            .as_ref()
            .map(|i| &i.user.id == id)
            .unwrap_or(false)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<Session, Failure> {
        let authenticated = async {
            let response = self.gateway.signup(request).await?;
            self.persist(response).await
        };
        self.tracker
            .run("signup", authenticated, |identity| Ok(self.activate(identity)))
            .await?;
        Ok(self.session())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<Session, Failure> {
        let authenticated = async {
            let response = self.gateway.login(request).await?;
            self.persist(response).await
        };
        self.tracker
            .run("login", authenticated, |identity| Ok(self.activate(identity)))
            .await?;
        Ok(self.session())
    }

    /// Forget the session everywhere. Safe to call when already signed out.
    pub async fn logout(&self) -> Result<(), Failure> {
        *lock(&self.identity) = None;
        self.gateway.set_auth_token(None);

        if let Err(err) = self.store.clear().await {
            tracing::warn!(error = %err, "Failed to clear stored credentials");
            let failure = Failure::from(&err);
            self.tracker.record(failure.clone());
            return Err(failure);
        }

        tracing::info!("Signed out");
        Ok(())
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Runs at most once per manager; later calls return the current session
    /// without touching storage. Unreadable credentials count as no session
    /// and are wiped.
    pub async fn rehydrate(&self) -> Session {
        self.rehydrated
            .get_or_init(|| async {
                self.restore().await;
            })
            .await;
        self.session()
    }

    pub fn is_rehydrated(&self) -> bool {
        self.rehydrated.initialized()
    }

    async fn restore(&self) {
        match self.store.load().await {
            Ok(Some(stored)) => {
                tracing::info!(user = %stored.user.username, "Restored stored session");
                self.activate(Identity {
                    token: stored.token,
                    user: stored.user,
                });
            }
            Ok(None) => {
                tracing::debug!("No stored session");
                self.gateway.set_auth_token(None);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Stored credentials are unreadable, starting signed out");
                self.gateway.set_auth_token(None);
                if let Err(err) = self.store.clear().await {
                    tracing::warn!(error = %err, "Failed to clear unreadable credentials");
                }
            }
        }
    }

    async fn persist(&self, response: AuthResponse) -> ClientResult<Identity> {
        let (token, user) = response.into_parts();
        let stored = StoredCredentials { token, user };
        self.store.save(&stored).await?;
        Ok(Identity {
            token: stored.token,
            user: stored.user,
        })
    }

    fn activate(&self, identity: Identity) {
        tracing::info!(user = %identity.user.username, admin = identity.user.is_admin, "Signed in");
        self.gateway.set_auth_token(Some(&identity.token));
        *lock(&self.identity) = Some(identity);
    }
}
