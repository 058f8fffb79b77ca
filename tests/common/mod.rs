//! In-process stand-in for the linkstash REST API.
//!
//! Serves a small seeded data set over real HTTP so the client can be driven
//! end to end. Tokens are `token-<user id>`; every seeded password is
//! `secret`.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

use linkstash::config::ApiConfig;

#[derive(Default)]
pub struct ApiData {
    pub users: Vec<Value>,
    pub items: Vec<Value>,
    pub tags: Vec<Value>,
    pub reactions: Vec<Value>,
    /// `Authorization` header of every request, in arrival order.
    pub auth_headers: Vec<Option<String>>,
    next_id: u64,
}

type Shared = Arc<Mutex<ApiData>>;
type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub struct StubApi {
    pub base_url: String,
    pub data: Shared,
}

impl StubApi {
    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        }
    }

    pub fn last_auth_header(&self) -> Option<String> {
        self.data
            .lock()
            .unwrap()
            .auth_headers
            .last()
            .cloned()
            .flatten()
    }

    pub fn item(&self, id: &str) -> Option<Value> {
        self.data
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i["_id"] == id)
            .cloned()
    }
}

fn seed() -> ApiData {
    ApiData {
        users: vec![
            json!({"_id": "u0", "username": "root", "email": "root@example.com", "password": "secret", "isAdmin": true}),
            json!({"_id": "u1", "username": "ana", "email": "ana@example.com", "password": "secret", "isAdmin": false}),
            json!({"_id": "u2", "username": "bo", "email": "bo@example.com", "password": "secret", "isAdmin": false}),
        ],
        items: vec![
            json!({"_id": "i1", "title": "Rust book", "url": "https://doc.rust-lang.org/book/", "permalink": "rust-book", "createdBy": "u1", "sticky": true, "private": false, "tags": ["t1"]}),
            json!({"_id": "i2", "title": "Secret plans", "url": "https://bo.example.com", "createdBy": {"_id": "u2", "username": "bo"}, "private": true}),
            // Serialized with virtuals: carries both `_id` and `id`.
            json!({"_id": "i3", "id": "i3", "title": "Tokio docs", "url": "https://tokio.rs", "createdBy": {"_id": "u2", "id": "u2"}}),
        ],
        tags: vec![json!({"_id": "t1", "name": "rust"})],
        reactions: vec![json!({"_id": "r1", "item_id": "i1", "user_id": "u2", "type": "like"})],
        auth_headers: Vec::new(),
        next_id: 100,
    }
}

/// Start the stub on an ephemeral port.
pub async fn spawn() -> StubApi {
    let data: Shared = Arc::new(Mutex::new(seed()));

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/permalink/{permalink}", get(item_by_permalink))
        .route(
            "/api/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route(
            "/api/items/{id}/reactions",
            get(list_reactions).post(create_reaction),
        )
        .route("/api/reactions/{id}", delete(delete_reaction))
        .route("/api/me", get(get_me))
        .route("/api/me/items", get(my_items))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/items", get(user_items))
        .route("/api/tags", get(list_tags))
        .with_state(data.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubApi {
        base_url: format!("http://{}/api", addr),
        data,
    }
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

fn public_user(user: &Value) -> Value {
    let mut user = user.clone();
    if let Some(fields) = user.as_object_mut() {
        fields.remove("password");
    }
    user
}

fn owner_of(item: &Value) -> Value {
    match &item["createdBy"] {
        Value::Object(stub) => stub["_id"].clone(),
        other => other.clone(),
    }
}

/// Record the caller's header and resolve it to a user.
fn caller(data: &mut ApiData, headers: &HeaderMap) -> Option<Value> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    data.auth_headers.push(header.clone());

    let user_id = header?.strip_prefix("Bearer token-")?.to_string();
    data.users.iter().find(|u| u["_id"] == user_id).cloned()
}

fn require_caller(data: &mut ApiData, headers: &HeaderMap) -> Result<Value, (StatusCode, Json<Value>)> {
    caller(data, headers).ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Authentication required"))
}

fn auth_response(user: &Value) -> Value {
    json!({
        "token": format!("token-{}", user["_id"].as_str().unwrap_or_default()),
        "userId": user["_id"],
        "username": user["username"],
        "email": user["email"],
        "avatar": null,
        "isAdmin": user["isAdmin"],
    })
}

async fn login(State(data): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    data.users
        .iter()
        .find(|u| u["email"] == body["email"] && u["password"] == body["password"])
        .map(|user| Json(auth_response(user)))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid email or password"))
}

async fn signup(State(data): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    if data.users.iter().any(|u| u["email"] == body["email"]) {
        return Err(error(StatusCode::CONFLICT, "Email already registered"));
    }

    data.next_id += 1;
    let user = json!({
        "_id": format!("u{}", data.next_id),
        "username": body["username"],
        "email": body["email"],
        "password": body["password"],
        "isAdmin": false,
    });
    data.users.push(user.clone());
    Ok(Json(auth_response(&user)))
}

async fn list_items(State(data): State<Shared>, headers: HeaderMap) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    Ok(Json(Value::Array(data.items.clone())))
}

async fn my_items(State(data): State<Shared>, headers: HeaderMap) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;
    let mine = data
        .items
        .iter()
        .filter(|i| owner_of(i) == user["_id"])
        .cloned()
        .collect();
    Ok(Json(Value::Array(mine)))
}

async fn user_items(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    let items = data
        .items
        .iter()
        .filter(|i| owner_of(i) == id)
        .cloned()
        .collect();
    Ok(Json(Value::Array(items)))
}

async fn get_item(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    data.items
        .iter()
        .find(|i| i["_id"] == id)
        .map(|i| Json(i.clone()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not found"))
}

async fn item_by_permalink(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(permalink): Path<String>,
) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    data.items
        .iter()
        .find(|i| i["permalink"] == permalink)
        .map(|i| Json(i.clone()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not found"))
}

async fn create_item(State(data): State<Shared>, headers: HeaderMap, Json(body): Json<Map<String, Value>>) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;

    data.next_id += 1;
    let mut item = body;
    item.insert("_id".into(), json!(format!("i{}", data.next_id)));
    item.insert("createdBy".into(), user["_id"].clone());
    let item = Value::Object(item);
    data.items.push(item.clone());
    Ok(Json(item))
}

async fn update_item(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;
    let is_admin = user["isAdmin"] == true;

    let item = data
        .items
        .iter_mut()
        .find(|i| i["_id"] == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not found"))?;
    if !is_admin && owner_of(item) != user["_id"] {
        return Err(error(StatusCode::FORBIDDEN, "Not allowed"));
    }

    if let Some(fields) = item.as_object_mut() {
        fields.extend(patch.clone());
    }
    // Like the real service, answer with the changed fields only.
    let mut response = patch;
    response.insert("_id".into(), json!(id));
    Ok(Json(Value::Object(response)))
}

async fn delete_item(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;
    let owned = data
        .items
        .iter()
        .find(|i| i["_id"] == id)
        .map(|i| owner_of(i) == user["_id"] || user["isAdmin"] == true)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not found"))?;
    if !owned {
        return Err(error(StatusCode::FORBIDDEN, "Not allowed"));
    }
    data.items.retain(|i| i["_id"] != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reactions(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    let reactions = data
        .reactions
        .iter()
        .filter(|r| r["item_id"] == id)
        .cloned()
        .collect();
    Ok(Json(Value::Array(reactions)))
}

async fn create_reaction(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;

    data.next_id += 1;
    let reaction = json!({
        "_id": format!("r{}", data.next_id),
        "item_id": id,
        "user_id": user["_id"],
        "type": body["type"],
    });
    data.reactions.push(reaction.clone());
    Ok(Json(reaction))
}

async fn delete_reaction(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = data.lock().unwrap();
    require_caller(&mut data, &headers)?;
    data.reactions.retain(|r| r["_id"] != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_me(State(data): State<Shared>, headers: HeaderMap) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;
    Ok(Json(public_user(&user)))
}

async fn get_user(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let mut data = data.lock().unwrap();
    caller(&mut data, &headers);
    data.users
        .iter()
        .find(|u| u["_id"] == id)
        .map(|u| Json(public_user(u)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))
}

async fn list_tags(State(data): State<Shared>, headers: HeaderMap) -> ApiResult {
    let mut data = data.lock().unwrap();
    let user = require_caller(&mut data, &headers)?;
    if user["isAdmin"] != true {
        return Err(error(StatusCode::FORBIDDEN, "Administrators only"));
    }
    Ok(Json(Value::Array(data.tags.clone())))
}
