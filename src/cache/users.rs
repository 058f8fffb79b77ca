use std::sync::{Arc, Mutex};

use super::{apply_entries, decode, lock, merge, merged_entries, remove_id, RequestStatus, RequestTracker};
use crate::auth::SessionManager;
use crate::error::{ClientResult, Failure};
use crate::gateway::DynGateway;
use crate::models::{EntityId, Fields, UserSummary};

#[derive(Debug, Default)]
struct UserState {
    /// The signed-in user's own profile, as returned by `/me`.
    current: Option<UserSummary>,
    users: Vec<UserSummary>,
    selected: Option<UserSummary>,
}

impl UserState {
    /// Merge `patch` into every copy of user `id`. Nothing is written unless
    /// every copy merges cleanly.
    fn merge_everywhere(&mut self, id: &EntityId, patch: &Fields) -> ClientResult<UserSummary> {
        let entries = merged_entries(&self.users, id, patch)?;
        let current = match self.current.as_ref().filter(|u| &u.id == id) {
            Some(user) => Some(merge(user, patch)?),
            None => None,
        };
        let selected = match self.selected.as_ref().filter(|u| &u.id == id) {
            Some(user) => Some(merge(user, patch)?),
            None => None,
        };

        let updated = match current
            .clone()
            .or_else(|| selected.clone())
            .or_else(|| entries.first().map(|(_, u)| u.clone()))
        {
            Some(user) => user,
            None => decode(patch)?,
        };

        apply_entries(&mut self.users, entries);
        if current.is_some() {
            self.current = current;
        }
        if selected.is_some() {
            self.selected = selected;
        }
        Ok(updated)
    }

    fn forget(&mut self, id: &EntityId) {
        remove_id(&mut self.users, id);
        if self.current.as_ref().is_some_and(|u| &u.id == id) {
            self.current = None;
        }
        if self.selected.as_ref().is_some_and(|u| &u.id == id) {
            self.selected = None;
        }
    }
}

pub struct UserCache {
    gateway: DynGateway,
    session: Arc<SessionManager>,
    state: Mutex<UserState>,
    tracker: RequestTracker,
}

impl UserCache {
    pub fn new(gateway: DynGateway, session: Arc<SessionManager>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(UserState::default()),
            tracker: RequestTracker::new(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.tracker.status()
    }

    pub fn users(&self) -> Vec<UserSummary> {
        lock(&self.state).users.clone()
    }

    pub fn selected(&self) -> Option<UserSummary> {
        lock(&self.state).selected.clone()
    }

    pub fn get_by_id(&self, id: &EntityId) -> Option<UserSummary> {
        lock(&self.state).users.iter().find(|u| &u.id == id).cloned()
    }

    /// The loaded `/me` profile, as long as it still belongs to whoever is
    /// signed in. A profile left over from a previous session is hidden.
    pub fn current_profile(&self) -> Option<UserSummary> {
        let current = lock(&self.state).current.clone()?;
        self.session
            .is_current_user(&current.id)
            .then_some(current)
    }

    pub async fn load_current(&self) -> Result<UserSummary, Failure> {
        self.tracker
            .run("load_me", self.gateway.get_me(), |user| {
                lock(&self.state).current = Some(user.clone());
                Ok(user)
            })
            .await
    }

    pub async fn update_current(&self, patch: &Fields) -> Result<UserSummary, Failure> {
        self.tracker
            .run("update_me", self.gateway.update_me(patch), |response| {
                let mut state = lock(&self.state);
                let id = match (&state.current, self.session.current_user_id()) {
                    (Some(user), _) => user.id.clone(),
                    (None, Some(id)) => id,
                    (None, None) => {
                        let user: UserSummary = decode(&response)?;
                        user.id
                    }
                };
                state.merge_everywhere(&id, &response)
            })
            .await
    }

    /// Delete the signed-in account, then end the session it belonged to.
    pub async fn remove_current(&self) -> Result<(), Failure> {
        let id = lock(&self.state)
            .current
            .as_ref()
            .map(|u| u.id.clone())
            .or_else(|| self.session.current_user_id());

        self.tracker
            .run("delete_me", self.gateway.delete_me(), |()| {
                let mut state = lock(&self.state);
                state.current = None;
                if let Some(id) = &id {
                    state.forget(id);
                }
                Ok(())
            })
            .await?;

        tracing::info!("Account deleted");
        self.session.logout().await
    }

    pub async fn load_all(&self) -> Result<Vec<UserSummary>, Failure> {
        self.tracker
            .run("load_users", self.gateway.list_users(), |users| {
                tracing::debug!(count = users.len(), "user list replaced");
                lock(&self.state).users = users.clone();
                Ok(users)
            })
            .await
    }

    pub async fn fetch_by_id(&self, id: &EntityId) -> Result<UserSummary, Failure> {
        self.tracker
            .run("fetch_user", self.gateway.get_user(id), |user| {
                lock(&self.state).selected = Some(user.clone());
                Ok(user)
            })
            .await
    }

    pub async fn update_by_id(&self, id: &EntityId, patch: &Fields) -> Result<UserSummary, Failure> {
        self.tracker
            .run("update_user", self.gateway.update_user(id, patch), |response| {
                lock(&self.state).merge_everywhere(id, &response)
            })
            .await
    }

    pub async fn remove_by_id(&self, id: &EntityId) -> Result<(), Failure> {
        self.tracker
            .run("delete_user", self.gateway.delete_user(id), |()| {
                lock(&self.state).forget(id);
                Ok(())
            })
            .await
    }
}
