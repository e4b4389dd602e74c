pub mod api;
pub mod app;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod landing;
pub mod navigation;
pub mod reviews;
pub mod session;
pub mod stats;
pub mod storage;

pub use app::{AppState, GameDetail};
pub use error::{Result, StorefrontError};
