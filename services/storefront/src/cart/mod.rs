//! Cart stores. One strategy is active per application, picked by
//! [`CartMode`](crate::config::CartMode).

mod local;
mod server;

pub use local::LocalCart;
pub use server::ServerCart;

use async_trait::async_trait;
use rust_decimal::Decimal;

use common::models::GameId;

use crate::config::CartMode;
use crate::error::Result;
use crate::events::Subscription;

/// Published after every cart mutation with the resulting id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    pub ids: Vec<GameId>,
}

impl CartEvent {
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

/// A cart line ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEntry {
    pub game_id: GameId,
    pub title: String,
    pub price: Decimal,
}

pub type CartListener = Box<dyn Fn(&CartEvent) + Send + Sync>;

#[async_trait]
pub trait CartStore: Send + Sync {
    fn mode(&self) -> CartMode;

    async fn ids(&self) -> Result<Vec<GameId>>;

    async fn entries(&self) -> Result<Vec<CartEntry>>;

    /// Adding an id already in the cart leaves its contents unchanged.
    async fn add(&self, id: GameId) -> Result<()>;

    /// Removing an absent id is a no-op.
    async fn remove(&self, id: GameId) -> Result<()>;

    /// Removes only `ids`, leaving anything else in the cart.
    async fn clear(&self, ids: &[GameId]) -> Result<()>;

    fn subscribe(&self, listener: CartListener) -> Subscription;
}
