use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use url::Url;

use super::Gateway;
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    from_document, AuthResponse, EntityId, ErrorBody, Fields, Item, LoginRequest, Reaction,
    SignupRequest, Tag, UserSummary,
};

/// [`Gateway`] over the service's REST API.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    auth_token: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Internal(format!(
                "API URL cannot be used as a base: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            auth_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Internal("API URL cannot be used as a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let builder = self.client.request(method, self.endpoint(segments)?);
        Ok(match self.auth_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let response = self.request(Method::GET, segments)?.send().await?;
        let document: Value = check(response).await?.json().await?;
        Ok(from_document(document)?)
    }

    async fn send_json<B, T>(&self, method: Method, segments: &[&str], body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(method, segments)?.json(body).send().await?;
        let document: Value = check(response).await?.json().await?;
        Ok(from_document(document)?)
    }

    async fn delete(&self, segments: &[&str]) -> ClientResult<()> {
        let response = self.request(Method::DELETE, segments)?.send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success status into [`ClientError::Api`], keeping the
/// server's `message` when the body has one.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Gateway for HttpGateway {
    fn set_auth_token(&self, token: Option<&str>) {
        *self
            .auth_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
    }

    fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn signup(&self, request: &SignupRequest) -> ClientResult<AuthResponse> {
        self.send_json(Method::POST, &["auth", "signup"], request)
            .await
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        self.send_json(Method::POST, &["auth", "login"], request)
            .await
    }

    async fn list_items(&self) -> ClientResult<Vec<Item>> {
        self.get(&["items"]).await
    }

    async fn list_my_items(&self) -> ClientResult<Vec<Item>> {
        self.get(&["me", "items"]).await
    }

    async fn list_items_by_user(&self, user_id: &EntityId) -> ClientResult<Vec<Item>> {
        self.get(&["users", user_id.as_str(), "items"]).await
    }

    async fn get_item(&self, id: &EntityId) -> ClientResult<Item> {
        self.get(&["items", id.as_str()]).await
    }

    async fn get_item_by_permalink(&self, permalink: &str) -> ClientResult<Item> {
        self.get(&["items", "permalink", permalink]).await
    }

    async fn create_item(&self, data: &Fields) -> ClientResult<Item> {
        self.send_json(Method::POST, &["items"], data).await
    }

    async fn update_item(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields> {
        self.send_json(Method::PUT, &["items", id.as_str()], patch)
            .await
    }

    async fn delete_item(&self, id: &EntityId) -> ClientResult<()> {
        self.delete(&["items", id.as_str()]).await
    }

    async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        self.get(&["tags"]).await
    }

    async fn get_tag(&self, id: &EntityId) -> ClientResult<Tag> {
        self.get(&["tags", id.as_str()]).await
    }

    async fn create_tag(&self, data: &Fields) -> ClientResult<Tag> {
        self.send_json(Method::POST, &["tags"], data).await
    }

    async fn update_tag(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields> {
        self.send_json(Method::PUT, &["tags", id.as_str()], patch)
            .await
    }

    async fn delete_tag(&self, id: &EntityId) -> ClientResult<()> {
        self.delete(&["tags", id.as_str()]).await
    }

    async fn get_me(&self) -> ClientResult<UserSummary> {
        self.get(&["me"]).await
    }

    async fn update_me(&self, patch: &Fields) -> ClientResult<Fields> {
        self.send_json(Method::PUT, &["me"], patch).await
    }

    async fn delete_me(&self) -> ClientResult<()> {
        self.delete(&["me"]).await
    }

    async fn list_users(&self) -> ClientResult<Vec<UserSummary>> {
        self.get(&["users"]).await
    }

    async fn get_user(&self, id: &EntityId) -> ClientResult<UserSummary> {
        self.get(&["users", id.as_str()]).await
    }

    async fn update_user(&self, id: &EntityId, patch: &Fields) -> ClientResult<Fields> {
        self.send_json(Method::PUT, &["users", id.as_str()], patch)
            .await
    }

    async fn delete_user(&self, id: &EntityId) -> ClientResult<()> {
        self.delete(&["users", id.as_str()]).await
    }

    async fn list_reactions(&self, item_id: &EntityId) -> ClientResult<Vec<Reaction>> {
        self.get(&["items", item_id.as_str(), "reactions"]).await
    }

    async fn create_reaction(&self, item_id: &EntityId, kind: &str) -> ClientResult<Reaction> {
        self.send_json(
            Method::POST,
            &["items", item_id.as_str(), "reactions"],
            &json!({ "type": kind }),
        )
        .await
    }

    async fn delete_reaction(&self, id: &EntityId) -> ClientResult<()> {
        self.delete(&["reactions", id.as_str()]).await
    }
}
