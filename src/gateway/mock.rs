//! Scripted [`Gateway`] for unit tests.
//!
//! Replies are queued per operation and handed out in call order. A reply can
//! be held behind a gate so a test decides when its response "arrives".

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

use super::Gateway;
use crate::cache::lock;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    from_document, AuthResponse, EntityId, Fields, Item, LoginRequest, Reaction, SignupRequest,
    Tag, UserSummary,
};

enum Outcome {
    Ok(Value),
    Err { status: u16, message: Option<String> },
}

struct Reply {
    outcome: Outcome,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
pub(crate) struct MockGateway {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    auth_token: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, op: &'static str, value: Value) -> &Self {
        self.push(op, Outcome::Ok(value), None);
        self
    }

    pub fn fail(&self, op: &'static str, status: u16, message: Option<&str>) -> &Self {
        let outcome = Outcome::Err {
            status,
            message: message.map(str::to_string),
        };
        self.push(op, outcome, None);
        self
    }

    /// Queue a reply that is only delivered once the returned sender fires.
    pub fn reply_gated(&self, op: &'static str, value: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(op, Outcome::Ok(value), Some(rx));
        tx
    }

    /// Every call made so far, as `op` or `op:arg`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn called(&self, op: &str) -> bool {
        lock(&self.calls)
            .iter()
            .any(|call| call == op || call.starts_with(&format!("{op}:")))
    }

    fn push(&self, op: &'static str, outcome: Outcome, gate: Option<oneshot::Receiver<()>>) {
        lock(&self.replies)
            .entry(op)
            .or_default()
            .push_back(Reply { outcome, gate });
    }

    async fn respond<T: DeserializeOwned>(&self, op: &'static str, arg: Option<&str>) -> ClientResult<T> {
        let call = match arg {
            Some(arg) => format!("{op}:{arg}"),
            None => op.to_string(),
        };
        lock(&self.calls).push(call);

        let reply = lock(&self.replies).get_mut(op).and_then(VecDeque::pop_front);
        let Some(reply) = reply else {
            return Err(ClientError::Internal(format!("no reply scripted for {op}")));
        };

        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }

        match reply.outcome {
            Outcome::Ok(value) => Ok(from_document(value)?),
            Outcome::Err { status, message } => Err(ClientError::Api { status, message }),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn set_auth_token(&self, token: Option<&str>) {
        *lock(&self.auth_token) = token.map(str::to_string);
    }

    fn auth_token(&self) -> Option<String> {
        lock(&self.auth_token).clone()
    }

    async fn signup(&self, request: &SignupRequest) -> ClientResult<AuthResponse> {
        self.respond("signup", Some(&request.email)).await
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        self.respond("login", Some(&request.email)).await
    }

    async fn list_items(&self) -> ClientResult<Vec<Item>> {
        self.respond("list_items", None).await
    }

    async fn list_my_items(&self) -> ClientResult<Vec<Item>> {
        self.respond("list_my_items", None).await
    }

    async fn list_items_by_user(&self, user_id: &EntityId) -> ClientResult<Vec<Item>> {
        self.respond("list_items_by_user", Some(user_id.as_str())).await
    }

    async fn get_item(&self, id: &EntityId) -> ClientResult<Item> {
        self.respond("get_item", Some(id.as_str())).await
    }

    async fn get_item_by_permalink(&self, permalink: &str) -> ClientResult<Item> {
        self.respond("get_item_by_permalink", Some(permalink)).await
    }

    async fn create_item(&self, _data: &Fields) -> ClientResult<Item> {
        self.respond("create_item", None).await
    }

    async fn update_item(&self, id: &EntityId, _patch: &Fields) -> ClientResult<Fields> {
        self.respond("update_item", Some(id.as_str())).await
    }

    async fn delete_item(&self, id: &EntityId) -> ClientResult<()> {
        self.respond("delete_item", Some(id.as_str())).await
    }

    async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        self.respond("list_tags", None).await
    }

    async fn get_tag(&self, id: &EntityId) -> ClientResult<Tag> {
        self.respond("get_tag", Some(id.as_str())).await
    }

    async fn create_tag(&self, _data: &Fields) -> ClientResult<Tag> {
        self.respond("create_tag", None).await
    }

    async fn update_tag(&self, id: &EntityId, _patch: &Fields) -> ClientResult<Fields> {
        self.respond("update_tag", Some(id.as_str())).await
    }

    async fn delete_tag(&self, id: &EntityId) -> ClientResult<()> {
        self.respond("delete_tag", Some(id.as_str())).await
    }

    async fn get_me(&self) -> ClientResult<UserSummary> {
        self.respond("get_me", None).await
    }

    async fn update_me(&self, _patch: &Fields) -> ClientResult<Fields> {
        self.respond("update_me", None).await
    }

    async fn delete_me(&self) -> ClientResult<()> {
        self.respond("delete_me", None).await
    }

    async fn list_users(&self) -> ClientResult<Vec<UserSummary>> {
        self.respond("list_users", None).await
    }

    async fn get_user(&self, id: &EntityId) -> ClientResult<UserSummary> {
        self.respond("get_user", Some(id.as_str())).await
    }

    async fn update_user(&self, id: &EntityId, _patch: &Fields) -> ClientResult<Fields> {
        self.respond("update_user", Some(id.as_str())).await
    }

    async fn delete_user(&self, id: &EntityId) -> ClientResult<()> {
        self.respond("delete_user", Some(id.as_str())).await
    }

    async fn list_reactions(&self, item_id: &EntityId) -> ClientResult<Vec<Reaction>> {
        self.respond("list_reactions", Some(item_id.as_str())).await
    }

    async fn create_reaction(&self, item_id: &EntityId, _kind: &str) -> ClientResult<Reaction> {
        self.respond("create_reaction", Some(item_id.as_str())).await
    }

    async fn delete_reaction(&self, id: &EntityId) -> ClientResult<()> {
        self.respond("delete_reaction", Some(id.as_str())).await
    }
}
