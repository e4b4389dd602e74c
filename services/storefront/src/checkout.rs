//! Checkout handoff: order creation, payment session, provider redirect.

use log::{info, warn};

use common::models::{GameId, PaymentProvider};

use crate::app::AppState;
use crate::error::{Result, StorefrontError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub order_id: u64,
    pub provider: PaymentProvider,
    pub pay_url: String,
}

/// Runs the handoff for `ids`. Each step completes before the next starts.
///
/// An order that was created stays on the server even when the payment
/// session fails; nothing is rolled back or retried. On success only the
/// checked-out ids leave the cart and the navigator is sent to the
/// provider's hosted page.
pub async fn run(app: &AppState, ids: &[GameId], provider: PaymentProvider) -> Result<CheckoutOutcome> {
    app.require_session()?;

    let mut game_ids: Vec<GameId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !game_ids.contains(id) {
            game_ids.push(*id);
        }
    }
    if game_ids.is_empty() {
        return Err(StorefrontError::Validation("There is nothing to pay for".to_string()));
    }

    let receipt = app.intercept(app.api.create_order(&game_ids).await)?;
    let order_id = receipt
        .id
        .ok_or_else(|| StorefrontError::Decode("order was created without an id".to_string()))?;
    info!("created order {} for {} game(s)", order_id, game_ids.len());

    let link = app.intercept(
        app.api
            .create_payment(provider, order_id, &app.payment_return_url)
            .await,
    )?;
    let pay_url = link
        .pay_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| StorefrontError::Decode(format!("{} returned no payment url", provider)))?;

    if let Err(e) = app.intercept(app.cart.clear(&game_ids).await) {
        warn!("order {} created but the cart could not be cleared: {}", order_id, e);
    }

    info!("redirecting to {} for order {}", provider, order_id);
    app.navigator.redirect_external(&pay_url);

    Ok(CheckoutOutcome {
        order_id,
        provider,
        pay_url,
    })
}
