//! Listener for the payment providers' return redirect.
//!
//! Reaching `/thank-you` only refreshes the cart badge; whether the payment
//! went through is settled between the provider and the backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::{self, Next},
    web, App, Error, HttpMessage, HttpResponse, HttpServer,
};
use log::{info, warn};
use uuid::Uuid;

use crate::app::AppState;

/// Query keys the providers use to report their result code.
const RESULT_KEYS: [&str; 2] = ["resultCode", "vnp_ResponseCode"];

async fn request_id_middleware(
    req: ServiceRequest,
    next: Next<impl actix_web::body::MessageBody + 'static>,
) -> Result<ServiceResponse<actix_web::body::BoxBody>, Error> {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    info!("request {} - {} {}", request_id, req.method(), req.path());

    let mut res = next.call(req).await?;
    match HeaderValue::from_str(&request_id) {
        Ok(value) => {
            res.headers_mut()
                .insert(HeaderName::from_static("x-request-id"), value);
        }
        Err(e) => warn!("request id {} is not a valid header: {}", request_id, e),
    }
    Ok(res.map_into_boxed_body())
}

async fn thank_you(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    if let Some((key, code)) = RESULT_KEYS
        .iter()
        .find_map(|k| query.get(*k).map(|v| (*k, v)))
    {
        info!("payment provider returned {}={}", key, code);
    }

    let count = data.refresh_cart_count().await;

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!(
            "<!doctype html><html><body>\
             <h2>Thank you for your purchase!</h2>\
             <p>Once the order is confirmed you can download the game from its page.</p>\
             <p>Items left in cart: <span id=\"cart-count\">{}</span></p>\
             <a href=\"/\">Back to the store</a>\
             </body></html>",
            count
        ))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/thank-you", web::get().to(thank_you))
        .route("/health", web::get().to(health));
}

pub async fn serve(app: Arc<AppState>, addr: SocketAddr, allowed_origin: String) -> std::io::Result<()> {
    let data = web::Data::from(app);

    info!("payment return landing listening on http://{}", addr);

    HttpServer::new(move || {
        let mut cors = Cors::default();
        if !allowed_origin.is_empty() {
            cors = cors.allowed_origin(&allowed_origin);
        }
        let cors = cors
            .allowed_methods(vec!["GET", "OPTIONS"])
            .expose_headers(vec!["x-request-id"])
            .max_age(3600);

        App::new()
            .app_data(data.clone())
            .wrap(middleware::from_fn(request_id_middleware))
            .wrap(cors)
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %T"))
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::navigation::History;
    use crate::storage::{LocalStorage, CART_KEY};
    use actix_web::test;

    fn local_app() -> (Arc<AppState>, LocalStorage) {
        let config = Config::from_lookup(|key| match key {
            "CART_MODE" => Some("local".to_string()),
            "API_BASE_URL" => Some("http://127.0.0.1:9/".to_string()),
            _ => None,
        })
        .unwrap();
        let storage = LocalStorage::in_memory();
        let app = AppState::new(&config, storage.clone(), Arc::new(History::new())).unwrap();
        (Arc::new(app), storage)
    }

    #[actix_web::test]
    async fn thank_you_refreshes_cart_count() {
        let (app, storage) = local_app();
        storage.set(CART_KEY, "[4, 5]").unwrap();

        let service = test::init_service(
            App::new()
                .app_data(web::Data::from(Arc::clone(&app)))
                .wrap(middleware::from_fn(request_id_middleware))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/thank-you?resultCode=0")
            .to_request();
        let resp = test::call_service(&service, req).await;

        assert!(resp.status().is_success());
        assert!(resp.headers().contains_key("x-request-id"));
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("<span id=\"cart-count\">2</span>"));
        assert_eq!(app.session.cart_count(), 2);
    }

    #[actix_web::test]
    async fn health_answers_ok() {
        let (app, _) = local_app();
        let service = test::init_service(
            App::new()
                .app_data(web::Data::from(app))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&service, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
    }
}
