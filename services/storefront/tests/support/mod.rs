//! Mock marketplace backend for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use storefront::config::Config;
use storefront::navigation::History;
use storefront::storage::{LocalStorage, ACCESS_TOKEN_KEY};
use storefront::AppState;

pub const GOOD_TOKEN: &str = "good-token";
pub const RETURN_URL: &str = "http://localhost:3000/thank-you";

#[derive(Default)]
pub struct Backend {
    pub requests: Vec<String>,
    pub pages: HashMap<u32, Vec<Value>>,
    pub game_queries: Vec<HashMap<String, String>>,
    pub cart: Vec<u64>,
    pub orders: Vec<Vec<u64>>,
    pub payments: Vec<Value>,
    pub purchased: Vec<u64>,
    pub reject_token: bool,
    pub omit_pay_url: bool,
    pub expire_after_add: bool,
}

pub type Shared = Arc<Mutex<Backend>>;

pub fn game(id: u64, title: &str, price: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{} description", title),
        "price": price,
        "categories": [{ "id": 2, "name": "Action" }],
        "tags": [{ "id": 1, "name": "Indie" }],
        "image": null,
        "view_count": 10,
        "purchase_count": 1,
        "developer": "Team Cherry",
        "created_at": "2024-05-01T10:00:00Z"
    })
}

fn record(state: &Shared, line: &str) {
    state.lock().unwrap().requests.push(line.to_string());
}

fn authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let backend = state.lock().unwrap();
    let bearer = format!("Bearer {}", GOOD_TOKEN);
    !backend.reject_token
        && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Authentication credentials were not provided." })),
    )
        .into_response()
}

async fn games(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Response {
    record(&state, "GET /games/");
    if query.get("q").map(String::as_str) == Some("slow") {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        return Json(json!([game(99, "Slow Result", "10000")])).into_response();
    }
    if query.get("q").map(String::as_str) == Some("broken") {
        return Json(json!({ "unexpected": true })).into_response();
    }
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let mut backend = state.lock().unwrap();
    backend.game_queries.push(query);
    match backend.pages.get(&page) {
        Some(items) => Json(json!({ "count": items.len(), "next": null, "results": items })).into_response(),
        None if page > 1 => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Invalid page." }))).into_response(),
        None => Json(json!([])).into_response(),
    }
}

async fn game_detail(State(state): State<Shared>, Path(id): Path<u64>) -> Response {
    record(&state, &format!("GET /games/{}/", id));
    let backend = state.lock().unwrap();
    let found = backend
        .pages
        .values()
        .flatten()
        .find(|g| g["id"] == json!(id))
        .cloned();
    match found {
        Some(game) => Json(game).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response(),
    }
}

async fn download(State(state): State<Shared>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    record(&state, &format!("GET /games/{}/download/", id));
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.lock().unwrap().purchased.contains(&id) {
        Json(json!({ "download_url": format!("https://cdn.example/{}.zip?sig=abc", id) })).into_response()
    } else {
        (StatusCode::FORBIDDEN, Json(json!({ "detail": "You have not purchased this game." }))).into_response()
    }
}

async fn categories(State(state): State<Shared>) -> Json<Value> {
    record(&state, "GET /categories/");
    Json(json!([{ "id": 2, "name": "Action" }]))
}

async fn tags(State(state): State<Shared>) -> Json<Value> {
    record(&state, "GET /tags/");
    Json(json!({ "results": [{ "id": 1, "name": "Indie" }] }))
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    record(&state, "POST /users/login/");
    if body["username"] == "an" && body["password"] == "secret1" {
        Json(json!({ "access": GOOD_TOKEN, "refresh": "refresh-token" })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid username or password." }))).into_response()
    }
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "GET /users/current_user/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({ "id": 1, "username": "an", "email": "an@example.com", "role": "CUSTOMER" })).into_response()
}

async fn create_order(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST /orders/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let ids: Vec<u64> = serde_json::from_value(body["game_ids"].clone()).unwrap_or_default();
    let mut backend = state.lock().unwrap();
    backend.orders.push(ids);
    let id = backend.orders.len() as u64 + 40;
    (StatusCode::CREATED, Json(json!({ "id": id, "status": "PENDING" }))).into_response()
}

async fn pay(state: Shared, headers: HeaderMap, body: Value, provider: &str) -> Response {
    record(&state, &format!("POST /payments/{}/", provider));
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut backend = state.lock().unwrap();
    backend.payments.push(body.clone());
    if backend.omit_pay_url {
        return Json(json!({ "message": "created" })).into_response();
    }
    let url = format!("https://{}.example/pay/{}", provider, body["order_id"]);
    match provider {
        "momo" => Json(json!({ "payUrl": url })).into_response(),
        _ => Json(json!({ "payment_url": url })).into_response(),
    }
}

async fn pay_momo(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    pay(state, headers, body, "momo").await
}

async fn pay_vnpay(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    pay(state, headers, body, "vnpay").await
}

async fn cart_items(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "GET /carts/items/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let backend = state.lock().unwrap();
    let items: Vec<Value> = backend
        .cart
        .iter()
        .enumerate()
        .map(|(i, id)| json!({ "id": i + 1, "game": id, "game_title": format!("Game {}", id), "price": "50000.00" }))
        .collect();
    Json(json!({ "items": items })).into_response()
}

async fn cart_add(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST /carts/add_item/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if let Some(id) = body["game_id"].as_u64() {
        let mut backend = state.lock().unwrap();
        backend.cart.push(id);
        if backend.expire_after_add {
            backend.reject_token = true;
        }
    }
    (StatusCode::CREATED, Json(json!({ "message": "added" }))).into_response()
}

async fn cart_remove(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "DELETE /carts/remove_item/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if let Some(id) = body["game_id"].as_u64() {
        state.lock().unwrap().cart.retain(|x| *x != id);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn cart_clear(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "DELETE /carts/clear/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.lock().unwrap().cart.clear();
    StatusCode::NO_CONTENT.into_response()
}

async fn reviews(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    record(&state, "GET /reviews/");
    let game: u64 = query.get("game_id").and_then(|g| g.parse().ok()).unwrap_or(0);
    Json(json!([
        { "id": 1, "customer": "binh", "game": game, "rating": 5, "comment": "Great", "created_at": "2024-05-02T08:00:00Z" },
        { "id": 2, "customer": "chi", "game": game, "rating": 4, "comment": "Good" }
    ]))
}

async fn create_review(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST /reviews/create_review/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let game = body["game"].as_u64().unwrap_or(0);
    if !state.lock().unwrap().purchased.contains(&game) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "You can only review games you have purchased." })),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({ "id": 9, "customer": "an", "game": game, "rating": body["rating"], "comment": body["comment"] }))).into_response()
}

async fn revenue(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "GET /stats/revenue/");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({
        "revenue_total": [{ "month": "2024-05", "total": "150000.00" }],
        "quantity_by_category": [{ "category": "Action", "quantity": 3 }],
        "quantity_by_tag": [{ "tag": "Indie", "quantity": 2 }]
    }))
    .into_response()
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/games/", get(games))
        .route("/games/{id}/", get(game_detail))
        .route("/games/{id}/download/", get(download))
        .route("/categories/", get(categories))
        .route("/tags/", get(tags))
        .route("/users/login/", post(login))
        .route("/users/current_user/", get(current_user))
        .route("/orders/", post(create_order))
        .route("/payments/momo/", post(pay_momo))
        .route("/payments/vnpay/", post(pay_vnpay))
        .route("/carts/items/", get(cart_items))
        .route("/carts/add_item/", post(cart_add))
        .route("/carts/remove_item/", delete(cart_remove))
        .route("/carts/clear/", delete(cart_clear))
        .route("/reviews/", get(reviews))
        .route("/reviews/create_review/", post(create_review))
        .route("/stats/revenue/", get(revenue))
        .with_state(state)
}

pub struct Fixture {
    pub app: AppState,
    pub backend: Shared,
    pub history: Arc<History>,
    pub storage: LocalStorage,
}

impl Fixture {
    pub async fn new(cart_mode: &str) -> Self {
        let backend: Shared = Arc::new(Mutex::new(Backend::default()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let app = router(Arc::clone(&backend));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}/", addr);
        let mode = cart_mode.to_string();
        let config = Config::from_lookup(move |key| match key {
            "API_BASE_URL" => Some(base_url.clone()),
            "CART_MODE" => Some(mode.clone()),
            "PAYMENT_RETURN_URL" => Some(RETURN_URL.to_string()),
            _ => None,
        })
        .unwrap();

        let storage = LocalStorage::in_memory();
        let history = Arc::new(History::new());
        let app = AppState::new(&config, storage.clone(), history.clone()).unwrap();

        Fixture {
            app,
            backend,
            history,
            storage,
        }
    }

    pub fn sign_in(&self) {
        self.storage.set(ACCESS_TOKEN_KEY, GOOD_TOKEN).unwrap();
    }

    pub fn requests(&self, line: &str) -> usize {
        self.backend
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.as_str() == line)
            .count()
    }

    pub fn with_backend<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.backend.lock().unwrap())
    }
}
