use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod validation;

pub mod models {
    use super::*;

    pub type GameId = u64;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Category {
        pub id: u64,
        pub name: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Tag {
        pub id: u64,
        pub name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Game {
        pub id: GameId,
        pub title: String,
        #[serde(default)]
        pub description: String,
        pub price: Decimal,
        #[serde(default)]
        pub image: Option<String>,
        #[serde(default)]
        pub categories: Vec<Category>,
        #[serde(default)]
        pub tags: Vec<Tag>,
        #[serde(default)]
        pub developer: Option<String>,
        #[serde(default)]
        pub view_count: u32,
        #[serde(default)]
        pub purchase_count: u32,
        #[serde(default)]
        pub created_at: Option<DateTime<Utc>>,
    }

    /// `GET games/` answers a bare array, or a page envelope once the
    /// backend enables pagination.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(untagged)]
    pub enum GameListing {
        Plain(Vec<Game>),
        Paged {
            results: Vec<Game>,
            #[serde(default)]
            next: Option<String>,
        },
    }

    impl GameListing {
        pub fn into_games(self) -> Vec<Game> {
            match self {
                GameListing::Plain(games) => games,
                GameListing::Paged { results, .. } => results,
            }
        }
    }

    /// Lookup lists share the same envelope tolerance as the game listing.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(untagged)]
    pub enum Listing<T> {
        Plain(Vec<T>),
        Paged { results: Vec<T> },
    }

    impl<T> Listing<T> {
        pub fn into_vec(self) -> Vec<T> {
            match self {
                Listing::Plain(items) => items,
                Listing::Paged { results } => results,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CartLine {
        pub id: u64,
        #[serde(rename = "game")]
        pub game_id: GameId,
        #[serde(default)]
        pub game_title: String,
        pub price: Decimal,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct CartContents {
        #[serde(default)]
        pub items: Vec<CartLine>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct CartItemRequest {
        pub game_id: GameId,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct CreateOrderRequest {
        pub game_ids: Vec<GameId>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct OrderReceipt {
        #[serde(default)]
        pub id: Option<u64>,
        #[serde(default)]
        pub status: Option<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum PaymentProvider {
        Momo,
        Vnpay,
    }

    impl PaymentProvider {
        pub fn endpoint(&self) -> &'static str {
            match self {
                PaymentProvider::Momo => "payments/momo/",
                PaymentProvider::Vnpay => "payments/vnpay/",
            }
        }
    }

    impl std::fmt::Display for PaymentProvider {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                PaymentProvider::Momo => write!(f, "momo"),
                PaymentProvider::Vnpay => write!(f, "vnpay"),
            }
        }
    }

    impl std::str::FromStr for PaymentProvider {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.to_ascii_lowercase().as_str() {
                "momo" => Ok(PaymentProvider::Momo),
                "vnpay" => Ok(PaymentProvider::Vnpay),
                other => Err(format!("unknown payment provider '{}', expected momo or vnpay", other)),
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct PaymentRequest {
        pub order_id: u64,
        pub redirect_url: String,
    }

    /// MoMo answers `payUrl`, VNPAY answers `payment_url`.
    #[derive(Debug, Clone, Deserialize)]
    pub struct PaymentLink {
        #[serde(default, alias = "payUrl", alias = "payment_url")]
        pub pay_url: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Review {
        #[serde(default)]
        pub id: Option<u64>,
        #[serde(default)]
        pub customer: Option<String>,
        pub game: GameId,
        pub rating: u8,
        #[serde(default)]
        pub comment: String,
        #[serde(default)]
        pub created_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct NewReview {
        pub game: GameId,
        pub rating: u8,
        pub comment: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum AccountRole {
        Admin,
        Customer,
        #[serde(other)]
        Unknown,
    }

    impl AccountRole {
        pub fn as_str(&self) -> &'static str {
            match self {
                AccountRole::Admin => "ADMIN",
                AccountRole::Customer => "CUSTOMER",
                AccountRole::Unknown => "UNKNOWN",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Account {
        #[serde(default)]
        pub id: Option<u64>,
        pub username: String,
        #[serde(default)]
        pub email: Option<String>,
        #[serde(default)]
        pub first_name: Option<String>,
        #[serde(default)]
        pub last_name: Option<String>,
        #[serde(default)]
        pub avatar: Option<String>,
        #[serde(default)]
        pub role: Option<AccountRole>,
        #[serde(default)]
        pub phone_number: Option<String>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct LoginRequest {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct TokenPair {
        #[serde(default)]
        pub access: Option<String>,
        #[serde(default)]
        pub refresh: Option<String>,
    }

    /// Registration form as typed by the user, including the confirmation
    /// field that never leaves the client.
    #[derive(Debug, Clone, Default)]
    pub struct RegisterForm {
        pub email: String,
        pub username: String,
        pub password: String,
        pub confirm: String,
        pub phone_number: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub role: Option<AccountRole>,
        pub avatar: Option<std::path::PathBuf>,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct RevenuePoint {
        #[serde(deserialize_with = "crate::utils::string_or_number")]
        pub month: String,
        pub total: Decimal,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct CategoryQuantity {
        #[serde(deserialize_with = "crate::utils::string_or_number")]
        pub category: String,
        pub quantity: u64,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct TagQuantity {
        #[serde(deserialize_with = "crate::utils::string_or_number")]
        pub tag: String,
        pub quantity: u64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    pub struct RevenueStats {
        #[serde(default)]
        pub revenue_total: Vec<RevenuePoint>,
        #[serde(default)]
        pub quantity_by_category: Vec<CategoryQuantity>,
        #[serde(default)]
        pub quantity_by_tag: Vec<TagQuantity>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DownloadLink {
        pub link: String,
    }

    impl DownloadLink {
        const KEYS: [&'static str; 4] = ["download_url", "url", "file", "link"];

        /// The download endpoint answers either a bare string or an object
        /// carrying the signed link under one of a few keys.
        pub fn from_response(body: &serde_json::Value) -> Option<Self> {
            let link = match body {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Object(map) => Self::KEYS
                    .iter()
                    .find_map(|k| map.get(*k).and_then(|v| v.as_str())),
                _ => None,
            }?;
            if link.is_empty() {
                return None;
            }
            Some(DownloadLink { link: link.to_string() })
        }
    }
}

pub mod utils {
    use super::*;
    use rust_decimal::RoundingStrategy;
    use serde::Deserializer;

    /// Resolves a possibly relative media path against the API base url.
    pub fn image_url(base_url: &str, path: Option<&str>) -> String {
        match path {
            None | Some("") => String::new(),
            Some(p) if p.starts_with("http") => p.to_string(),
            Some(p) => format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                p.trim_start_matches('/')
            ),
        }
    }

    /// Formats an amount as Vietnamese dong, e.g. `100.000 ₫`.
    pub fn format_vnd(amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let digits = rounded.abs().trunc().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        format!("{}{}\u{a0}₫", sign, grouped)
    }

    pub fn cart_total<'a>(prices: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
        prices.into_iter().copied().sum()
    }

    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(s),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::Null => Ok(String::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected a string or number label, got {}",
                other
            ))),
        }
    }
}

pub use models::*;
pub use utils::*;
