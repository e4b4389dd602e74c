use async_trait::async_trait;
use log::warn;

use common::models::GameId;

use crate::api::ApiClient;
use crate::cart::{CartEntry, CartEvent, CartListener, CartStore};
use crate::config::CartMode;
use crate::error::{Result, StorefrontError};
use crate::events::{Subscribers, Subscription};

/// Cart held by the backend under the `carts/` endpoints.
pub struct ServerCart {
    api: ApiClient,
    subscribers: Subscribers<CartEvent>,
}

impl ServerCart {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            subscribers: Subscribers::new(),
        }
    }

    /// Re-reads the cart after a mutation. The mutation already succeeded,
    /// so a failed re-read is only logged, except for a rejected token.
    async fn announce(&self) -> Result<()> {
        match self.ids().await {
            Ok(ids) => self.subscribers.publish(&CartEvent { ids }),
            Err(StorefrontError::Unauthorized) => return Err(StorefrontError::Unauthorized),
            Err(e) => warn!("cart changed but could not be re-read: {}", e),
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for ServerCart {
    fn mode(&self) -> CartMode {
        CartMode::Server
    }

    async fn ids(&self) -> Result<Vec<GameId>> {
        let contents = self.api.cart_items().await?;
        let mut ids: Vec<GameId> = Vec::with_capacity(contents.items.len());
        for line in contents.items {
            if !ids.contains(&line.game_id) {
                ids.push(line.game_id);
            }
        }
        Ok(ids)
    }

    async fn entries(&self) -> Result<Vec<CartEntry>> {
        let contents = self.api.cart_items().await?;
        Ok(contents
            .items
            .into_iter()
            .map(|line| CartEntry {
                game_id: line.game_id,
                title: line.game_title,
                price: line.price,
            })
            .collect())
    }

    async fn add(&self, id: GameId) -> Result<()> {
        if self.ids().await?.contains(&id) {
            return Ok(());
        }
        self.api.add_cart_item(id).await?;
        self.announce().await
    }

    async fn remove(&self, id: GameId) -> Result<()> {
        if !self.ids().await?.contains(&id) {
            return Ok(());
        }
        self.api.remove_cart_item(id).await?;
        self.announce().await
    }

    async fn clear(&self, subset: &[GameId]) -> Result<()> {
        let current = self.ids().await?;
        let targets: Vec<GameId> = current.iter().copied().filter(|id| subset.contains(id)).collect();
        if targets.is_empty() {
            return Ok(());
        }
        if targets.len() == current.len() {
            self.api.clear_cart().await?;
        } else {
            for id in targets {
                self.api.remove_cart_item(id).await?;
            }
        }
        self.announce().await
    }

    fn subscribe(&self, listener: CartListener) -> Subscription {
        self.subscribers.subscribe(listener)
    }
}
