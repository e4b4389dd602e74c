use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use serde_json::Value;

use common::models::GameId;

use crate::api::ApiClient;
use crate::cart::{CartEntry, CartEvent, CartListener, CartStore};
use crate::config::CartMode;
use crate::error::Result;
use crate::events::{Subscribers, Subscription};
use crate::storage::{LocalStorage, CART_KEY};

/// Cart kept as a JSON id array in local device storage.
///
/// Writes from other handles on the same storage are re-published to this
/// cart's subscribers, so every open view sees the same count.
pub struct LocalCart {
    storage: LocalStorage,
    api: ApiClient,
    subscribers: Arc<Subscribers<CartEvent>>,
    _watch: Subscription,
}

impl LocalCart {
    pub fn new(storage: LocalStorage, api: ApiClient) -> Self {
        let subscribers = Arc::new(Subscribers::new());

        let relay = Arc::clone(&subscribers);
        let watch = storage.watch(move |event| {
            if event.key == CART_KEY {
                relay.publish(&CartEvent {
                    ids: parse_ids(event.new_value.as_deref()),
                });
            }
        });

        Self {
            storage,
            api,
            subscribers,
            _watch: watch,
        }
    }

    pub fn read(&self) -> Vec<GameId> {
        parse_ids(self.storage.get(CART_KEY).as_deref())
    }

    fn write(&self, ids: Vec<GameId>) -> Result<()> {
        self.storage.set(CART_KEY, &serde_json::to_string(&ids)?)?;
        self.subscribers.publish(&CartEvent { ids });
        Ok(())
    }
}

/// Missing or corrupt storage reads as an empty cart. Entries stored as
/// numeric strings are accepted; anything else is dropped.
pub fn parse_ids(raw: Option<&str>) -> Vec<GameId> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let values: Vec<Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!("cart storage is not a JSON array, treating as empty: {}", e);
            return Vec::new();
        }
    };

    let mut ids: Vec<GameId> = Vec::with_capacity(values.len());
    for value in values {
        let id = match &value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[async_trait]
impl CartStore for LocalCart {
    fn mode(&self) -> CartMode {
        CartMode::Local
    }

    async fn ids(&self) -> Result<Vec<GameId>> {
        Ok(self.read())
    }

    async fn entries(&self) -> Result<Vec<CartEntry>> {
        let mut entries = Vec::new();
        for id in self.read() {
            match self.api.game(id).await {
                Ok(game) => entries.push(CartEntry {
                    game_id: game.id,
                    title: game.title,
                    price: game.price,
                }),
                Err(e) => warn!("skipping cart entry {}: {}", id, e),
            }
        }
        Ok(entries)
    }

    async fn add(&self, id: GameId) -> Result<()> {
        let mut ids = self.read();
        if !ids.contains(&id) {
            ids.push(id);
        }
        self.write(ids)
    }

    async fn remove(&self, id: GameId) -> Result<()> {
        let ids = self.read().into_iter().filter(|x| *x != id).collect();
        self.write(ids)
    }

    async fn clear(&self, subset: &[GameId]) -> Result<()> {
        let ids = self
            .read()
            .into_iter()
            .filter(|x| !subset.contains(x))
            .collect();
        self.write(ids)
    }

    fn subscribe(&self, listener: CartListener) -> Subscription {
        self.subscribers.subscribe(listener)
    }
}
