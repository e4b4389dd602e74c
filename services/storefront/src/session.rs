//! Session state: bearer tokens in local storage, the signed-in account and
//! the cart badge count in memory.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use common::models::{Account, LoginRequest, RegisterForm};
use common::validation::{validate_login_request, validate_register_form};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::events::{lock, Subscribers, Subscription};
use crate::navigation::{Navigator, Route};
use crate::storage::{LocalStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Account),
    SignedOut,
    CartCount(usize),
}

pub struct SessionStore {
    api: ApiClient,
    storage: LocalStorage,
    navigator: Arc<dyn Navigator>,
    user: Mutex<Option<Account>>,
    cart_count: AtomicUsize,
    /// Set once a 401 has sent the user to login; cleared by the next login.
    login_redirected: AtomicBool,
    subscribers: Subscribers<SessionEvent>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: LocalStorage, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            storage,
            navigator,
            user: Mutex::new(None),
            cart_count: AtomicUsize::new(0),
            login_redirected: AtomicBool::new(false),
            subscribers: Subscribers::new(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.storage
            .get(ACCESS_TOKEN_KEY)
            .is_some_and(|t| !t.is_empty())
    }

    pub fn current_user(&self) -> Option<Account> {
        lock(&self.user).clone()
    }

    pub fn cart_count(&self) -> usize {
        self.cart_count.load(Ordering::SeqCst)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Stores both tokens, then tries to load the account. A failure to load
    /// the account does not fail the login.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<Account>> {
        let req = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        validate_login_request(&req).map_err(StorefrontError::Validation)?;

        let tokens = self.api.login(&req).await?;
        let access = tokens
            .access
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StorefrontError::Decode("login response carries no access token".to_string()))?;
        self.storage.set(ACCESS_TOKEN_KEY, &access)?;
        if let Some(refresh) = tokens.refresh.filter(|t| !t.is_empty()) {
            self.storage.set(REFRESH_TOKEN_KEY, &refresh)?;
        }
        self.login_redirected.store(false, Ordering::SeqCst);
        info!("signed in as {}", req.username);

        match self.api.current_user().await {
            Ok(account) => {
                self.set_user(account.clone());
                Ok(Some(account))
            }
            Err(e) => {
                warn!("signed in but could not load the account: {}", e);
                Ok(None)
            }
        }
    }

    /// Validates the form locally, submits it, and sends the user to login.
    pub async fn register(&self, form: &RegisterForm) -> Result<Account> {
        validate_register_form(form).map_err(StorefrontError::Validation)?;
        let account = self.api.register(form).await?;
        info!("registered account {}", account.username);
        self.navigator.navigate(Route::Login);
        Ok(account)
    }

    /// Eager session check on start-up. A stored token the backend no
    /// longer accepts is discarded without redirecting.
    pub async fn restore(&self) -> Option<Account> {
        if !self.has_token() {
            return None;
        }
        match self.api.current_user().await {
            Ok(account) => {
                self.set_user(account.clone());
                Some(account)
            }
            Err(StorefrontError::Unauthorized) => {
                info!("stored session expired");
                self.expire();
                None
            }
            Err(e) => {
                warn!("could not restore session: {}", e);
                None
            }
        }
    }

    pub fn logout(&self) {
        self.expire();
        self.navigator.navigate(Route::Home(Default::default()));
    }

    /// Clears the session and sends the user to login. Only the first 401
    /// after a login redirects; later ones just keep the session clear.
    /// Returns whether this call redirected.
    pub fn handle_unauthorized(&self) -> bool {
        self.expire();
        if self.login_redirected.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.navigator.navigate(Route::Login);
        true
    }

    pub fn set_cart_count(&self, count: usize) {
        if self.cart_count.swap(count, Ordering::SeqCst) != count {
            self.subscribers.publish(&SessionEvent::CartCount(count));
        }
    }

    fn set_user(&self, account: Account) {
        *lock(&self.user) = Some(account.clone());
        self.subscribers.publish(&SessionEvent::SignedIn(account));
    }

    /// Drops tokens, account and cart count without navigating.
    pub fn expire(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("could not remove {} from storage: {}", key, e);
            }
        }
        let had_user = lock(&self.user).take().is_some();
        if had_user {
            self.subscribers.publish(&SessionEvent::SignedOut);
        }
        self.set_cart_count(0);
    }
}
