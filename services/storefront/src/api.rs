//! Typed bindings for the marketplace REST backend.

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use common::models::*;

use crate::error::{Result, StorefrontError};
use crate::storage::{LocalStorage, ACCESS_TOKEN_KEY};

pub mod endpoints {
    use common::models::GameId;

    pub const LOGIN: &str = "users/login/";
    pub const CURRENT_USER: &str = "users/current_user/";
    pub const REGISTER: &str = "users/";
    pub const GAMES: &str = "games/";
    pub const CATEGORIES: &str = "categories/";
    pub const TAGS: &str = "tags/";
    pub const ORDERS: &str = "orders/";
    pub const REVIEWS: &str = "reviews/";
    pub const CREATE_REVIEW: &str = "reviews/create_review/";
    pub const CART_ITEMS: &str = "carts/items/";
    pub const CART_ADD: &str = "carts/add_item/";
    pub const CART_REMOVE: &str = "carts/remove_item/";
    pub const CART_CLEAR: &str = "carts/clear/";
    pub const STATS_REVENUE: &str = "stats/revenue/";

    pub fn game_detail(id: GameId) -> String {
        format!("games/{}/", id)
    }

    pub fn game_download(id: GameId) -> String {
        format!("games/{}/download/", id)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    storage: LocalStorage,
}

impl ApiClient {
    /// The bearer token is read from `storage` on every authenticated call,
    /// so logging in or out elsewhere takes effect immediately.
    pub fn new(base_url: Url, storage: LocalStorage) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url, storage })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StorefrontError::Config(format!("cannot build url for {}: {}", path, e)))
    }

    fn with_bearer(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.storage.get(ACCESS_TOKEN_KEY) {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder, authenticated: bool) -> Result<reqwest::Response> {
        let builder = if authenticated { self.with_bearer(builder) } else { builder };
        let request = builder.build()?;
        debug!("{} {}", request.method(), request.url());

        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED && authenticated {
            return Err(StorefrontError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StorefrontError::Rejected {
            status: status.as_u16(),
            message: rejection_message(status, &body),
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder, authenticated: bool) -> Result<T> {
        let response = self.execute(builder, authenticated).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<Account> {
        let mut multipart = Form::new()
            .text("email", form.email.clone())
            .text("username", form.username.clone())
            .text("password", form.password.clone());
        for (name, value) in [
            ("phone_number", &form.phone_number),
            ("first_name", &form.first_name),
            ("last_name", &form.last_name),
        ] {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                multipart = multipart.text(name, value.clone());
            }
        }
        if let Some(role) = form.role {
            multipart = multipart.text("role", role.as_str());
        }
        if let Some(path) = &form.avatar {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "avatar".to_string());
            multipart = multipart.part("avatar", Part::bytes(bytes).file_name(file_name));
        }

        let builder = self.http.post(self.url(endpoints::REGISTER)?).multipart(multipart);
        self.json(builder, false).await
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<TokenPair> {
        let builder = self.http.post(self.url(endpoints::LOGIN)?).json(req);
        self.json(builder, false).await
    }

    pub async fn current_user(&self) -> Result<Account> {
        let builder = self.http.get(self.url(endpoints::CURRENT_USER)?);
        self.json(builder, true).await
    }

    pub async fn games(&self, params: &[(&'static str, String)]) -> Result<Vec<Game>> {
        let builder = self.http.get(self.url(endpoints::GAMES)?).query(params);
        let listing: GameListing = self.json(builder, false).await?;
        Ok(listing.into_games())
    }

    pub async fn game(&self, id: GameId) -> Result<Game> {
        let builder = self.http.get(self.url(&endpoints::game_detail(id))?);
        self.json(builder, false).await
    }

    pub async fn download_link(&self, id: GameId) -> Result<DownloadLink> {
        let builder = self.http.get(self.url(&endpoints::game_download(id))?);
        let body: Value = self.json(builder, true).await?;
        DownloadLink::from_response(&body)
            .ok_or_else(|| StorefrontError::Decode("download response carries no link".to_string()))
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let builder = self.http.get(self.url(endpoints::CATEGORIES)?);
        let listing: Listing<Category> = self.json(builder, false).await?;
        Ok(listing.into_vec())
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        let builder = self.http.get(self.url(endpoints::TAGS)?);
        let listing: Listing<Tag> = self.json(builder, false).await?;
        Ok(listing.into_vec())
    }

    pub async fn reviews(&self, game_id: GameId) -> Result<Vec<Review>> {
        let builder = self
            .http
            .get(self.url(endpoints::REVIEWS)?)
            .query(&[("game_id", game_id)]);
        let listing: Listing<Review> = self.json(builder, false).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let builder = self.http.post(self.url(endpoints::CREATE_REVIEW)?).json(review);
        self.json(builder, true).await
    }

    pub async fn create_order(&self, game_ids: &[GameId]) -> Result<OrderReceipt> {
        let body = CreateOrderRequest { game_ids: game_ids.to_vec() };
        let builder = self.http.post(self.url(endpoints::ORDERS)?).json(&body);
        self.json(builder, true).await
    }

    pub async fn create_payment(
        &self,
        provider: PaymentProvider,
        order_id: u64,
        redirect_url: &str,
    ) -> Result<PaymentLink> {
        let body = PaymentRequest {
            order_id,
            redirect_url: redirect_url.to_string(),
        };
        let builder = self.http.post(self.url(provider.endpoint())?).json(&body);
        self.json(builder, true).await
    }

    pub async fn cart_items(&self) -> Result<CartContents> {
        let builder = self.http.get(self.url(endpoints::CART_ITEMS)?);
        self.json(builder, true).await
    }

    pub async fn add_cart_item(&self, game_id: GameId) -> Result<()> {
        let builder = self
            .http
            .post(self.url(endpoints::CART_ADD)?)
            .json(&CartItemRequest { game_id });
        self.execute(builder, true).await.map(|_| ())
    }

    pub async fn remove_cart_item(&self, game_id: GameId) -> Result<()> {
        let builder = self
            .http
            .delete(self.url(endpoints::CART_REMOVE)?)
            .json(&CartItemRequest { game_id });
        self.execute(builder, true).await.map(|_| ())
    }

    pub async fn clear_cart(&self) -> Result<()> {
        let builder = self.http.delete(self.url(endpoints::CART_CLEAR)?);
        self.execute(builder, true).await.map(|_| ())
    }

    pub async fn revenue_stats(&self, period: Option<&str>) -> Result<RevenueStats> {
        let mut builder = self.http.get(self.url(endpoints::STATS_REVENUE)?);
        if let Some(period) = period {
            builder = builder.query(&[("type", period)]);
        }
        self.json(builder, true).await
    }
}

/// Picks the most useful human message out of an error body: `error`, then
/// `detail`, then the first field error of a validation map.
fn rejection_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.chars().take(200).collect()
        };
    };

    for key in ["error", "detail", "message"] {
        if let Some(value) = map.get(key) {
            return flatten(value);
        }
    }
    map.iter()
        .next()
        .map(|(field, value)| format!("{}: {}", field, flatten(value)))
        .unwrap_or_else(fallback)
}

fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
