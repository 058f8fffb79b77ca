use serde_json::Value;
use std::sync::{Arc, Mutex};

use super::{apply_entries, decode, lock, merged_entries, remove_id, upsert, RequestStatus, RequestTracker};
use crate::auth::SessionManager;
use crate::error::{ClientError, Failure};
use crate::gateway::DynGateway;
use crate::models::{EntityId, Fields, Item};

/// Which list a fetch refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemScope {
    /// Every item the current credentials may see, into the global list.
    All,
    /// The signed-in user's items, into the "my items" list.
    Mine,
    /// Items created by one user, into the global list.
    ByUser(EntityId),
}

#[derive(Debug, Default)]
struct ItemState {
    items: Vec<Item>,
    my_items: Vec<Item>,
    selected: Option<Item>,
}

pub struct ItemCache {
    gateway: DynGateway,
    session: Arc<SessionManager>,
    state: Mutex<ItemState>,
    tracker: RequestTracker,
}

impl ItemCache {
    pub fn new(gateway: DynGateway, session: Arc<SessionManager>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(ItemState::default()),
            tracker: RequestTracker::new(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.tracker.status()
    }

    pub fn items(&self) -> Vec<Item> {
        lock(&self.state).items.clone()
    }

    pub fn my_items(&self) -> Vec<Item> {
        lock(&self.state).my_items.clone()
    }

    pub fn selected(&self) -> Option<Item> {
        lock(&self.state).selected.clone()
    }

    /// Lookup in the loaded global list. Never touches the network.
    pub fn get_by_id(&self, id: &EntityId) -> Option<Item> {
        lock(&self.state).items.iter().find(|i| &i.id == id).cloned()
    }

    pub fn get_by_permalink(&self, permalink: &str) -> Option<Item> {
        lock(&self.state)
            .items
            .iter()
            .find(|i| i.permalink.as_deref() == Some(permalink))
            .cloned()
    }

    pub fn public_items(&self) -> Vec<Item> {
        lock(&self.state)
            .items
            .iter()
            .filter(|i| !i.private)
            .cloned()
            .collect()
    }

    pub fn sticky_items(&self) -> Vec<Item> {
        lock(&self.state)
            .items
            .iter()
            .filter(|i| i.sticky)
            .cloned()
            .collect()
    }

    /// Whether the signed-in user created `item`.
    pub fn is_mine(&self, item: &Item) -> bool {
        item.owner_id()
            .map(|owner| self.session.is_current_user(owner))
            .unwrap_or(false)
    }

    /// Replace one list with the server's snapshot.
    pub async fn load(&self, scope: ItemScope) -> Result<Vec<Item>, Failure> {
        let request = async {
            match &scope {
                ItemScope::All => self.gateway.list_items().await,
                ItemScope::Mine => self.gateway.list_my_items().await,
                ItemScope::ByUser(user_id) => self.gateway.list_items_by_user(user_id).await,
            }
        };

        self.tracker
            .run("load_items", request, |items| {
                tracing::debug!(?scope, count = items.len(), "item list replaced");
                let mut state = lock(&self.state);
                match scope {
                    ItemScope::Mine => state.my_items = items.clone(),
                    ItemScope::All | ItemScope::ByUser(_) => state.items = items.clone(),
                }
                Ok(items)
            })
            .await
    }

    /// Fetch one item into `selected`, independently of the lists.
    pub async fn fetch_by_id(&self, id: &EntityId) -> Result<Item, Failure> {
        self.tracker
            .run("fetch_item", self.gateway.get_item(id), |item| {
                lock(&self.state).selected = Some(item.clone());
                Ok(item)
            })
            .await
    }

    pub async fn fetch_by_permalink(&self, permalink: &str) -> Result<Item, Failure> {
        self.tracker
            .run(
                "fetch_item_by_permalink",
                self.gateway.get_item_by_permalink(permalink),
                |item| {
                    lock(&self.state).selected = Some(item.clone());
                    Ok(item)
                },
            )
            .await
    }

    /// Create an item and add the server's copy to both lists without
    /// refetching. Fields the server fills in later show up on the next load.
    pub async fn create(&self, data: &Fields) -> Result<Item, Failure> {
        self.tracker
            .run("create_item", self.gateway.create_item(data), |item| {
                tracing::debug!(id = %item.id, "item created");
                let mut state = lock(&self.state);
                upsert(&mut state.items, item.clone());
                upsert(&mut state.my_items, item.clone());
                state.selected = Some(item.clone());
                Ok(item)
            })
            .await
    }

    /// Update an item and merge the response into every cached copy.
    pub async fn update(&self, id: &EntityId, patch: &Fields) -> Result<Item, Failure> {
        self.tracker
            .run("update_item", self.gateway.update_item(id, patch), |response| {
                self.apply_update(id, &response)
            })
            .await
    }

    /// Flip the pinned flag relative to what the cache currently shows.
    pub async fn toggle_pin(&self, id: &EntityId) -> Result<Item, Failure> {
        let Some(current) = self.cached(id) else {
            let failure = Failure::new(format!("Item {id} is not loaded"));
            self.tracker.record(failure.clone());
            return Err(failure);
        };

        let mut patch = Fields::new();
        patch.insert("sticky".into(), Value::Bool(!current.sticky));
        self.update(id, &patch).await
    }

    pub async fn remove(&self, id: &EntityId) -> Result<(), Failure> {
        self.tracker
            .run("delete_item", self.gateway.delete_item(id), |()| {
                tracing::debug!(%id, "item removed");
                let mut state = lock(&self.state);
                remove_id(&mut state.items, id);
                remove_id(&mut state.my_items, id);
                if state.selected.as_ref().is_some_and(|s| &s.id == id) {
                    state.selected = None;
                }
                Ok(())
            })
            .await
    }

    /// Drop data that belongs to the signed-in user.
    pub fn forget_mine(&self) {
        let mut state = lock(&self.state);
        state.my_items.clear();
    }

    fn cached(&self, id: &EntityId) -> Option<Item> {
        let state = lock(&self.state);
        state
            .items
            .iter()
            .chain(state.my_items.iter())
            .chain(state.selected.iter())
            .find(|i| &i.id == id)
            .cloned()
    }

    fn apply_update(&self, id: &EntityId, response: &Fields) -> Result<Item, ClientError> {
        let mut state = lock(&self.state);

        let items = merged_entries(&state.items, id, response)?;
        let my_items = merged_entries(&state.my_items, id, response)?;
        let selected = match state.selected.as_ref().filter(|s| &s.id == id) {
            Some(selected) => Some(super::merge(selected, response)?),
            None => None,
        };

        let updated = match items
            .first()
            .or(my_items.first())
            .map(|(_, item)| item.clone())
            .or_else(|| selected.clone())
        {
            Some(item) => item,
            None => decode(response)?,
        };

        tracing::debug!(%id, copies = items.len() + my_items.len(), "item merged");
        apply_entries(&mut state.items, items);
        apply_entries(&mut state.my_items, my_items);
        if selected.is_some() {
            state.selected = selected;
        }

        Ok(updated)
    }
}
