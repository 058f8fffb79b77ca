//! Remote Entity Gateway: every network call the client makes.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::models::{
    AuthResponse, EntityId, Fields, Item, LoginRequest, Reaction, SignupRequest, Tag, UserSummary,
};

pub use http::HttpGateway;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Token sent as `Authorization: Bearer <token>` on every request.
    /// `None` removes the header entirely.
    fn set_auth_token(&self, token: Option<&str>);

    fn auth_token(&self) -> Option<String>;

    // Auth
    async fn signup(&self, request: &SignupRequest) -> ClientResult<AuthResponse>;
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse>;

    // Items
    async fn list_items(&self) -> ClientResult<Vec<Item>>;
    async fn list_my_items(&self) -> ClientResult<Vec<Item>>;
    async fn list_items_by_user(&self, user_id: &EntityId) -> ClientResult<Vec<Item>>;
    async fn get_item(&self, id: &EntityId) -> ClientResult<Item>;
    async fn get_item_by_permalink(&self, permalink: &str) -> ClientResult<Item>;
    async fn create_item(&self, data: &Fields) -> ClientResult<Item>;
    /// Returns the raw response object so it can be merged shallowly.
    async fn update_item(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields>;
    async fn delete_item(&self, id: &EntityId) -> ClientResult<()>;

    // Tags
    async fn list_tags(&self) -> ClientResult<Vec<Tag>>;
    async fn get_tag(&self, id: &EntityId) -> ClientResult<Tag>;
    async fn create_tag(&self, data: &Fields) -> ClientResult<Tag>;
    async fn update_tag(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields>;
    async fn delete_tag(&self, id: &EntityId) -> ClientResult<()>;

    // Users
    async fn get_me(&self) -> ClientResult<UserSummary>;
    async fn update_me(&self, patch: &Fields) -> ClientResult<Fields>;
    async fn delete_me(&self) -> ClientResult<()>;
    async fn list_users(&self) -> ClientResult<Vec<UserSummary>>;
    async fn get_user(&self, id: &EntityId) -> ClientResult<UserSummary>;
    async fn update_user(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields>;
    async fn delete_user(&self, id: &EntityId) -> ClientResult<()>;

    // Reactions
    async fn list_reactions(&self, item_id: &EntityId) -> ClientResult<Vec<Reaction>>;
    async fn create_reaction(&self, item_id: &EntityId, kind: &str) -> ClientResult<Reaction>;
    async fn delete_reaction(&self, id: &EntityId) -> ClientResult<()>;
}

pub type DynGateway = Arc<dyn Gateway>;
