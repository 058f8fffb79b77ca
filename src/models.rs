use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON object as sent to or received from the API.
pub type Fields = Map<String, Value>;

/// Move a MongoDB-style `_id` to `id` in every object of `value`. Documents
/// may carry both keys; `_id` is the stored one and wins.
pub fn normalize_ids(value: &mut Value) {
    match value {
        Value::Object(fields) => normalize_document(fields),
        Value::Array(values) => values.iter_mut().for_each(normalize_ids),
        _ => {}
    }
}

pub fn normalize_document(fields: &mut Fields) {
    if let Some(id) = fields.remove("_id") {
        fields.insert("id".into(), id);
    }
    fields.values_mut().for_each(normalize_ids);
}

/// Decode a server document, whichever id keys it carries.
pub fn from_document<T: DeserializeOwned>(mut value: Value) -> serde_json::Result<T> {
    normalize_ids(&mut value);
    serde_json::from_value(value)
}

/// Identifier of a server-side entity.
///
/// Ids arrive either as strings or as numbers depending on the endpoint;
/// both normalize to the same string form so comparisons never depend on
/// the wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct EntityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for EntityId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => EntityId::new(s),
            RawId::Number(n) => EntityId(n.to_string()),
        }
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::new(id)
    }
}

/// A reference to another entity: either a bare id or the populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(EntityId),
    Expanded(EntityStub),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStub {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl EntityRef {
    pub fn id(&self) -> &EntityId {
        match self {
            EntityRef::Id(id) => id,
            EntityRef::Expanded(stub) => &stub.id,
        }
    }

    pub fn refers_to(&self, id: &EntityId) -> bool {
        self.id() == id
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        EntityRef::Id(id)
    }
}

/// Who a user is, as far as the client needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(alias = "_id", alias = "userId")]
    pub id: EntityId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default, alias = "createdBy")]
    pub created_by: Option<EntityRef>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub tags: Vec<EntityRef>,
    /// Title, url, description and whatever else the server sends.
    #[serde(flatten)]
    pub payload: Fields,
}

impl Item {
    pub fn owner_id(&self) -> Option<&EntityId> {
        self.created_by.as_ref().map(EntityRef::id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(default, alias = "itemId")]
    pub item_id: Option<EntityRef>,
    #[serde(alias = "userId")]
    pub user_id: EntityRef,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Body of a successful `/auth/login` or `/auth/signup` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(alias = "userId", alias = "_id", alias = "id")]
    pub user_id: EntityId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
}

impl AuthResponse {
    /// Split into the bearer token and the user it identifies.
    pub fn into_parts(self) -> (String, UserSummary) {
        let user = UserSummary {
            id: self.user_id,
            username: self.username,
            email: self.email,
            avatar: self.avatar,
            is_admin: self.is_admin,
            extra: Fields::new(),
        };
        (self.token, user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
