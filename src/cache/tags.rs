use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    apply_entries, decode, lock, merge, merged_entries, remove_id, upsert, RequestStatus,
    RequestTracker,
};
use crate::error::Failure;
use crate::gateway::DynGateway;
use crate::models::{EntityId, Fields, Tag};

/// The tag list, the selected tag and an id index over both. The index is
/// maintained entry by entry, so tags fetched on their own stay findable
/// after later list mutations.
#[derive(Debug, Default)]
struct TagState {
    tags: Vec<Tag>,
    selected: Option<Tag>,
    by_id: HashMap<EntityId, Tag>,
}

impl TagState {
    /// Rebuild the index after the list was replaced wholesale. The selected
    /// tag stays indexed when the new list does not hold it.
    fn reindex(&mut self) {
        let mut by_id: HashMap<EntityId, Tag> = self
            .selected
            .iter()
            .map(|tag| (tag.id.clone(), tag.clone()))
            .collect();
        by_id.extend(self.tags.iter().map(|tag| (tag.id.clone(), tag.clone())));
        self.by_id = by_id;
    }
}

pub struct TagCache {
    gateway: DynGateway,
    state: Mutex<TagState>,
    tracker: RequestTracker,
}

impl TagCache {
    pub fn new(gateway: DynGateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(TagState::default()),
            tracker: RequestTracker::new(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.tracker.status()
    }

    pub fn tags(&self) -> Vec<Tag> {
        lock(&self.state).tags.clone()
    }

    pub fn selected(&self) -> Option<Tag> {
        lock(&self.state).selected.clone()
    }

    pub fn get_by_id(&self, id: &EntityId) -> Option<Tag> {
        lock(&self.state).by_id.get(id).cloned()
    }

    pub async fn load_all(&self) -> Result<Vec<Tag>, Failure> {
        self.tracker
            .run("load_tags", self.gateway.list_tags(), |tags| {
                tracing::debug!(count = tags.len(), "tag list replaced");
                let mut state = lock(&self.state);
                state.tags = tags.clone();
                state.reindex();
                Ok(tags)
            })
            .await
    }

    /// Fetch one tag into `selected` and the index. The list is left alone.
    pub async fn fetch_by_id(&self, id: &EntityId) -> Result<Tag, Failure> {
        self.tracker
            .run("fetch_tag", self.gateway.get_tag(id), |tag| {
                let mut state = lock(&self.state);
                state.by_id.insert(tag.id.clone(), tag.clone());
                state.selected = Some(tag.clone());
                Ok(tag)
            })
            .await
    }

    pub async fn create(&self, data: &Fields) -> Result<Tag, Failure> {
        self.tracker
            .run("create_tag", self.gateway.create_tag(data), |tag| {
                tracing::debug!(id = %tag.id, name = %tag.name, "tag created");
                let mut state = lock(&self.state);
                upsert(&mut state.tags, tag.clone());
                state.by_id.insert(tag.id.clone(), tag.clone());
                Ok(tag)
            })
            .await
    }

    pub async fn update(&self, id: &EntityId, patch: &Fields) -> Result<Tag, Failure> {
        self.tracker
            .run("update_tag", self.gateway.update_tag(id, patch), |response| {
                let mut state = lock(&self.state);

                let entries = merged_entries(&state.tags, id, &response)?;
                let selected = match state.selected.as_ref().filter(|t| &t.id == id) {
                    Some(tag) => Some(merge(tag, &response)?),
                    None => None,
                };
                let indexed = match state.by_id.get(id) {
                    Some(tag) => Some(merge(tag, &response)?),
                    None => None,
                };
                let updated = match entries
                    .first()
                    .map(|(_, tag)| tag.clone())
                    .or_else(|| selected.clone())
                    .or(indexed)
                {
                    Some(tag) => tag,
                    None => decode(&response)?,
                };

                apply_entries(&mut state.tags, entries);
                if selected.is_some() {
                    state.selected = selected;
                }
                if state.by_id.contains_key(id) {
                    state.by_id.insert(id.clone(), updated.clone());
                }
                Ok(updated)
            })
            .await
    }

    pub async fn remove(&self, id: &EntityId) -> Result<(), Failure> {
        self.tracker
            .run("delete_tag", self.gateway.delete_tag(id), |()| {
                let mut state = lock(&self.state);
                remove_id(&mut state.tags, id);
                state.by_id.remove(id);
                if state.selected.as_ref().is_some_and(|t| &t.id == id) {
                    state.selected = None;
                }
                Ok(())
            })
            .await
    }
}
