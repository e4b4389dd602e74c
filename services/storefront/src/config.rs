//! Runtime configuration, read from the environment after `.env` is loaded.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use reqwest::Url;

use crate::error::{Result, StorefrontError};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_STORAGE_PATH: &str = ".storefront/storage.json";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:3000/thank-you";
pub const DEFAULT_LANDING_ADDR: &str = "127.0.0.1:3000";

/// Where cart contents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMode {
    /// `carts/` endpoints; consistent across devices.
    Server,
    /// JSON id array in local device storage.
    Local,
}

impl FromStr for CartMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(CartMode::Server),
            "local" => Ok(CartMode::Local),
            other => Err(format!("unknown cart mode '{}', expected server or local", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST root; always ends with `/` so endpoint paths join under it.
    pub api_base_url: Url,
    /// File backing local device storage.
    pub storage_path: PathBuf,
    pub cart_mode: CartMode,
    /// Where payment providers send the browser after payment.
    pub payment_return_url: String,
    pub landing_addr: SocketAddr,
    pub allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = parse_base_url(
            &lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        )?;

        let storage_path = lookup("STOREFRONT_STORAGE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let cart_mode = match lookup("CART_MODE") {
            Some(mode) => mode.parse().map_err(StorefrontError::Config)?,
            None => CartMode::Server,
        };

        let payment_return_url =
            lookup("PAYMENT_RETURN_URL").unwrap_or_else(|| DEFAULT_RETURN_URL.to_string());
        Url::parse(&payment_return_url).map_err(|e| {
            StorefrontError::Config(format!("PAYMENT_RETURN_URL is not a valid url: {}", e))
        })?;

        let landing_addr = lookup("LANDING_ADDR")
            .unwrap_or_else(|| DEFAULT_LANDING_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| StorefrontError::Config(format!("LANDING_ADDR is not a socket address: {}", e)))?;

        let allowed_origin = lookup("ALLOWED_ORIGIN").unwrap_or_else(|| origin_of(&payment_return_url));

        Ok(Config {
            api_base_url,
            storage_path,
            cart_mode,
            payment_return_url,
            landing_addr,
            allowed_origin,
        })
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| StorefrontError::Config(format!("API_BASE_URL is not a valid url: {}", e)))
}

fn origin_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}
