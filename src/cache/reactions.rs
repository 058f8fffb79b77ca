use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{lock, remove_id, upsert, RequestStatus, RequestTracker};
use crate::auth::SessionManager;
use crate::error::Failure;
use crate::gateway::DynGateway;
use crate::models::{EntityId, Reaction};

#[derive(Debug, Default)]
struct ReactionState {
    /// Item whose reactions are loaded.
    item_id: Option<EntityId>,
    reactions: Vec<Reaction>,
}

/// Reactions of the item currently on screen.
pub struct ReactionCache {
    gateway: DynGateway,
    session: Arc<SessionManager>,
    state: Mutex<ReactionState>,
    tracker: RequestTracker,
}

impl ReactionCache {
    pub fn new(gateway: DynGateway, session: Arc<SessionManager>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(ReactionState::default()),
            tracker: RequestTracker::new(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.tracker.status()
    }

    pub fn item_id(&self) -> Option<EntityId> {
        lock(&self.state).item_id.clone()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        lock(&self.state).reactions.clone()
    }

    /// Number of reactions per type.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let state = lock(&self.state);
        let mut counts = BTreeMap::new();
        for reaction in &state.reactions {
            *counts.entry(reaction.kind.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn reaction_of(&self, user_id: &EntityId) -> Option<Reaction> {
        lock(&self.state)
            .reactions
            .iter()
            .find(|r| r.user_id.refers_to(user_id))
            .cloned()
    }

    /// The signed-in user's reaction to the loaded item.
    pub fn my_reaction(&self) -> Option<Reaction> {
        let user_id = self.session.current_user_id()?;
        self.reaction_of(&user_id)
    }

    pub async fn load_for_item(&self, item_id: &EntityId) -> Result<Vec<Reaction>, Failure> {
        self.tracker
            .run("load_reactions", self.gateway.list_reactions(item_id), |reactions| {
                tracing::debug!(item = %item_id, count = reactions.len(), "reactions replaced");
                let mut state = lock(&self.state);
                state.item_id = Some(item_id.clone());
                state.reactions = reactions.clone();
                Ok(reactions)
            })
            .await
    }

    /// React to an item. The new reaction joins the loaded list only when it
    /// belongs to the loaded item.
    pub async fn add(&self, item_id: &EntityId, kind: &str) -> Result<Reaction, Failure> {
        self.tracker
            .run(
                "create_reaction",
                self.gateway.create_reaction(item_id, kind),
                |reaction| {
                    let mut state = lock(&self.state);
                    if state.item_id.as_ref() == Some(item_id) {
                        upsert(&mut state.reactions, reaction.clone());
                    }
                    Ok(reaction)
                },
            )
            .await
    }

    pub async fn remove(&self, reaction_id: &EntityId) -> Result<(), Failure> {
        self.tracker
            .run(
                "delete_reaction",
                self.gateway.delete_reaction(reaction_id),
                |()| {
                    remove_id(&mut lock(&self.state).reactions, reaction_id);
                    Ok(())
                },
            )
            .await
    }
}
