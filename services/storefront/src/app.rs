//! The application state container handed to every view.

use std::sync::Arc;

use log::warn;

use common::models::{Game, GameId, PaymentProvider, RevenueStats, Review};

use crate::api::ApiClient;
use crate::cart::{CartEntry, CartStore, LocalCart, ServerCart};
use crate::catalog::Catalog;
use crate::checkout::{self, CheckoutOutcome};
use crate::config::{CartMode, Config};
use crate::download::{self, GameAccess};
use crate::error::{Result, StorefrontError};
use crate::events::Subscription;
use crate::navigation::{Navigator, Route};
use crate::reviews;
use crate::session::SessionStore;
use crate::stats;
use crate::storage::LocalStorage;

/// Everything on a game's detail page.
#[derive(Debug, Clone)]
pub struct GameDetail {
    pub game: Game,
    pub reviews: Vec<Review>,
    pub access: GameAccess,
}

/// Owns the API client, storage, session, cart and navigator. Cart and
/// session changes go through the methods here; authenticated calls pass
/// through [`AppState::intercept`] so a 401 is handled in one place.
pub struct AppState {
    pub api: ApiClient,
    pub storage: LocalStorage,
    pub session: Arc<SessionStore>,
    pub cart: Box<dyn CartStore>,
    pub catalog: Catalog,
    pub navigator: Arc<dyn Navigator>,
    pub payment_return_url: String,
    _cart_badge: Subscription,
}

impl AppState {
    pub fn new(config: &Config, storage: LocalStorage, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let api = ApiClient::new(config.api_base_url.clone(), storage.clone())?;
        let session = Arc::new(SessionStore::new(api.clone(), storage.clone(), Arc::clone(&navigator)));

        let cart: Box<dyn CartStore> = match config.cart_mode {
            CartMode::Server => Box::new(ServerCart::new(api.clone())),
            CartMode::Local => Box::new(LocalCart::new(storage.clone(), api.clone())),
        };

        let badge = Arc::clone(&session);
        let cart_badge = cart.subscribe(Box::new(move |event| badge.set_cart_count(event.count())));

        Ok(Self {
            catalog: Catalog::new(api.clone()),
            api,
            storage,
            session,
            cart,
            navigator,
            payment_return_url: config.payment_return_url.clone(),
            _cart_badge: cart_badge,
        })
    }

    /// Start-up: restore a stored session, then sync the cart badge.
    pub async fn start(&self) {
        self.session.restore().await;
        self.refresh_cart_count().await;
    }

    /// Routes a 401 to the session before handing the result back.
    pub fn intercept<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(StorefrontError::Unauthorized) = &result {
            self.session.handle_unauthorized();
        }
        result
    }

    /// Sends the user to login when there is no stored token.
    pub fn require_session(&self) -> Result<()> {
        if self.session.has_token() {
            return Ok(());
        }
        self.navigator.navigate(Route::Login);
        Err(StorefrontError::Unauthorized)
    }

    fn cart_needs_session(&self) -> bool {
        self.cart.mode() == CartMode::Server
    }

    pub async fn refresh_cart_count(&self) -> usize {
        if self.cart_needs_session() && !self.session.has_token() {
            self.session.set_cart_count(0);
            return 0;
        }
        match self.cart.ids().await {
            Ok(ids) => {
                self.session.set_cart_count(ids.len());
                ids.len()
            }
            Err(StorefrontError::Unauthorized) => {
                self.session.handle_unauthorized();
                0
            }
            Err(e) => {
                warn!("could not refresh cart count: {}", e);
                self.session.cart_count()
            }
        }
    }

    pub async fn add_to_cart(&self, id: GameId) -> Result<()> {
        if self.cart_needs_session() {
            self.require_session()?;
        }
        self.intercept(self.cart.add(id).await)
    }

    pub async fn remove_from_cart(&self, id: GameId) -> Result<()> {
        if self.cart_needs_session() {
            self.require_session()?;
        }
        self.intercept(self.cart.remove(id).await)
    }

    pub async fn cart_entries(&self) -> Result<Vec<CartEntry>> {
        if self.cart_needs_session() {
            self.require_session()?;
        }
        self.intercept(self.cart.entries().await)
    }

    /// Pays for every game currently in the cart.
    pub async fn checkout_cart(&self, provider: PaymentProvider) -> Result<CheckoutOutcome> {
        self.require_session()?;
        let ids = self.intercept(self.cart.ids().await)?;
        checkout::run(self, &ids, provider).await
    }

    pub async fn checkout(&self, ids: &[GameId], provider: PaymentProvider) -> Result<CheckoutOutcome> {
        checkout::run(self, ids, provider).await
    }

    pub async fn buy_now(&self, id: GameId, provider: PaymentProvider) -> Result<CheckoutOutcome> {
        checkout::run(self, &[id], provider).await
    }

    pub async fn game_detail(&self, id: GameId) -> Result<GameDetail> {
        let game = self.api.game(id).await?;
        let reviews = self.api.reviews(id).await.unwrap_or_else(|e| {
            warn!("could not load reviews for game {}: {}", id, e);
            Vec::new()
        });
        let access = download::access(self, id).await;
        Ok(GameDetail { game, reviews, access })
    }

    pub async fn submit_review(&self, game: GameId, rating: u8, comment: &str) -> Result<Review> {
        reviews::submit(self, game, rating, comment).await
    }

    pub async fn revenue_stats(&self, period: Option<&str>) -> Result<RevenueStats> {
        stats::revenue(self, period).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.session.login(username, password).await?;
        self.refresh_cart_count().await;
        self.navigator.navigate(Route::Home(Default::default()));
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
    }
}
