//! In-memory mirrors of server-side collections.
//!
//! Every cache follows the same rules: it only changes after the gateway
//! reports success, list fetches replace a collection wholesale, creates
//! upsert, updates shallow-merge the response into every copy of the entity,
//! and deletes filter it out everywhere.

pub mod envelope;
pub mod items;
pub mod reactions;
pub mod tags;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{ClientError, ClientResult};
use crate::models::{normalize_document, EntityId, Fields, Item, Reaction, Tag, UserSummary};

pub use envelope::{RequestStatus, RequestTracker};
pub use items::{ItemCache, ItemScope};
pub use reactions::ReactionCache;
pub use tags::TagCache;
pub use users::UserCache;

/// A server-side record that a cache can hold.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Alternate spellings the server may use for a field, mapped to the
    /// name the entity serializes under. `_id` is handled for every entity.
    const ALIASES: &'static [(&'static str, &'static str)] = &[];

    fn id(&self) -> &EntityId;
}

impl Entity for Item {
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("createdBy", "created_by")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Entity for Tag {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Entity for UserSummary {
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("userId", "id"), ("isAdmin", "is_admin")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Entity for Reaction {
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("itemId", "item_id"), ("userId", "user_id")];

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Rename alias keys in a server response to the names `T` serializes under.
fn canonicalize<T: Entity>(patch: &Fields) -> Fields {
    let mut patch = patch.clone();
    normalize_document(&mut patch);
    patch
        .into_iter()
        .map(|(key, value)| {
            let key = T::ALIASES
                .iter()
                .find(|(alias, _)| *alias == key)
                .map(|(_, canonical)| (*canonical).to_string())
                .unwrap_or(key);
            (key, value)
        })
        .collect()
}

/// Shallow merge: every top-level field of `patch` overwrites the field of
/// `existing`; fields absent from `patch` are kept.
pub fn merge<T: Entity>(existing: &T, patch: &Fields) -> ClientResult<T> {
    let mut fields = match serde_json::to_value(existing)? {
        Value::Object(fields) => fields,
        _ => {
            return Err(ClientError::Internal(
                "entity did not serialize to an object".into(),
            ))
        }
    };
    fields.extend(canonicalize::<T>(patch));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Decode a full entity from a response object.
pub fn decode<T: Entity>(fields: &Fields) -> ClientResult<T> {
    Ok(serde_json::from_value(Value::Object(canonicalize::<T>(
        fields,
    )))?)
}

/// Compute the merged replacements for every entry matching `id` without
/// touching `list`, so a decode error cannot leave it half-updated.
pub(crate) fn merged_entries<T: Entity>(
    list: &[T],
    id: &EntityId,
    patch: &Fields,
) -> ClientResult<Vec<(usize, T)>> {
    list.iter()
        .enumerate()
        .filter(|(_, entity)| entity.id() == id)
        .map(|(index, entity)| Ok((index, merge(entity, patch)?)))
        .collect()
}

pub(crate) fn apply_entries<T>(list: &mut [T], entries: Vec<(usize, T)>) {
    for (index, entity) in entries {
        if let Some(slot) = list.get_mut(index) {
            *slot = entity;
        }
    }
}

/// Insert `entity`, or replace the entry with the same id so it appears once.
pub(crate) fn upsert<T: Entity>(list: &mut Vec<T>, entity: T) {
    match list.iter_mut().find(|existing| existing.id() == entity.id()) {
        Some(slot) => *slot = entity,
        None => list.push(entity),
    }
}

pub(crate) fn remove_id<T: Entity>(list: &mut Vec<T>, id: &EntityId) {
    list.retain(|entity| entity.id() != id);
}

/// Lock a cache's state. Every critical section is a plain assignment, so a
/// panic elsewhere cannot leave the data torn and poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
