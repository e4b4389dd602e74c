mod support;

use common::models::PaymentProvider;
use serde_json::json;
use storefront::navigation::{Route, Visit};
use storefront::storage::CART_KEY;
use storefront::StorefrontError;

use support::{Fixture, RETURN_URL};

#[tokio::test]
async fn momo_checkout_redirects_and_clears_only_paid_games() {
    let fx = Fixture::new("local").await;
    fx.sign_in();
    fx.storage.set(CART_KEY, "[1, 2, 3]").unwrap();

    let outcome = fx.app.checkout(&[1, 2], PaymentProvider::Momo).await.unwrap();

    assert_eq!(outcome.provider, PaymentProvider::Momo);
    assert_eq!(outcome.pay_url, format!("https://momo.example/pay/{}", outcome.order_id));
    assert_eq!(fx.history.last(), Some(Visit::External(outcome.pay_url.clone())));
    assert_eq!(fx.app.cart.ids().await.unwrap(), vec![3]);

    fx.with_backend(|b| {
        assert_eq!(b.orders, vec![vec![1, 2]]);
        assert_eq!(b.payments.len(), 1);
        assert_eq!(b.payments[0]["order_id"], json!(outcome.order_id));
        assert_eq!(b.payments[0]["redirect_url"], json!(RETURN_URL));
    });
}

#[tokio::test]
async fn vnpay_payment_url_is_followed() {
    let fx = Fixture::new("local").await;
    fx.sign_in();

    let outcome = fx.app.buy_now(7, PaymentProvider::Vnpay).await.unwrap();

    assert!(outcome.pay_url.starts_with("https://vnpay.example/pay/"));
    assert_eq!(fx.requests("POST /payments/vnpay/"), 1);
    assert_eq!(fx.requests("POST /payments/momo/"), 0);
    assert_eq!(fx.history.last(), Some(Visit::External(outcome.pay_url)));
}

#[tokio::test]
async fn empty_checkout_sends_nothing() {
    let fx = Fixture::new("local").await;
    fx.sign_in();

    let err = fx.app.checkout(&[], PaymentProvider::Momo).await.unwrap_err();

    assert!(matches!(err, StorefrontError::Validation(_)));
    assert_eq!(fx.requests("POST /orders/"), 0);
    assert!(fx.history.visits().is_empty());
}

#[tokio::test]
async fn anonymous_empty_checkout_goes_to_login() {
    let fx = Fixture::new("local").await;

    let err = fx.app.checkout(&[], PaymentProvider::Momo).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(fx.history.count(&Route::Login), 1);
    assert_eq!(fx.requests("POST /orders/"), 0);
}

#[tokio::test]
async fn checkout_without_session_goes_to_login() {
    let fx = Fixture::new("local").await;
    fx.storage.set(CART_KEY, "[4]").unwrap();

    let err = fx.app.checkout_cart(PaymentProvider::Momo).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(fx.history.last(), Some(Visit::Route(Route::Login)));
    assert_eq!(fx.requests("POST /orders/"), 0);
    assert_eq!(fx.app.cart.ids().await.unwrap(), vec![4]);
}

#[tokio::test]
async fn missing_payment_url_keeps_cart_and_stays_put() {
    let fx = Fixture::new("local").await;
    fx.sign_in();
    fx.storage.set(CART_KEY, "[5]").unwrap();
    fx.with_backend(|b| b.omit_pay_url = true);

    let err = fx.app.checkout_cart(PaymentProvider::Momo).await.unwrap_err();

    assert!(matches!(err, StorefrontError::Decode(_)));
    // The order stays on the server.
    assert_eq!(fx.with_backend(|b| b.orders.clone()), vec![vec![5]]);
    assert_eq!(fx.app.cart.ids().await.unwrap(), vec![5]);
    assert!(!fx.history.visits().iter().any(|v| matches!(v, Visit::External(_))));
}

#[tokio::test]
async fn rejected_token_during_checkout_signs_out() {
    let fx = Fixture::new("local").await;
    fx.sign_in();
    fx.with_backend(|b| b.reject_token = true);

    let err = fx.app.checkout(&[1], PaymentProvider::Momo).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!fx.app.session.has_token());
    assert_eq!(fx.history.count(&Route::Login), 1);
    assert_eq!(fx.requests("POST /payments/momo/"), 0);
}

#[tokio::test]
async fn server_cart_checkout_clears_paid_items_on_backend() {
    let fx = Fixture::new("server").await;
    fx.sign_in();
    fx.with_backend(|b| b.cart = vec![1, 2]);

    fx.app.checkout_cart(PaymentProvider::Momo).await.unwrap();

    assert_eq!(fx.with_backend(|b| b.cart.clone()), Vec::<u64>::new());
    assert_eq!(fx.requests("DELETE /carts/clear/"), 1);
    assert_eq!(fx.app.session.cart_count(), 0);
}
