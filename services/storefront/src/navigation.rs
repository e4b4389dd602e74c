//! In-app routes and the navigator seam the stores redirect through.

use std::sync::Mutex;

use reqwest::Url;

use common::models::GameId;

use crate::catalog::CatalogFilter;
use crate::events::lock;

const ROUTE_BASE: &str = "http://storefront.local/";

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Home(CatalogFilter),
    GameDetail(GameId),
    Categories,
    Tags,
    Cart,
    Checkout(Vec<GameId>),
    Login,
    Register,
    ThankYou,
    Stats,
}

impl Route {
    /// Path plus query string, e.g. `/?category_id=2&price_max=100000`.
    pub fn to_path(&self) -> String {
        let mut url = route_url("/");
        match self {
            Route::Home(filter) => {
                let params = filter.to_params();
                if !params.is_empty() {
                    url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
                }
            }
            Route::GameDetail(id) => url.set_path(&format!("/games/{}", id)),
            Route::Categories => url.set_path("/categories"),
            Route::Tags => url.set_path("/tags"),
            Route::Cart => url.set_path("/cart"),
            Route::Checkout(ids) => {
                url.set_path("/checkout");
                let encoded = serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string());
                url.query_pairs_mut().append_pair("ids", &encoded);
            }
            Route::Login => url.set_path("/login"),
            Route::Register => url.set_path("/register"),
            Route::ThankYou => url.set_path("/thank-you"),
            Route::Stats => url.set_path("/stats"),
        }

        match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        }
    }

    /// Unknown paths fall back to the unfiltered home page.
    pub fn parse(path_and_query: &str) -> Route {
        let url = route_url(path_and_query);
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [] => Route::Home(CatalogFilter::from_pairs(url.query_pairs())),
            ["games", id] => id
                .parse()
                .map(Route::GameDetail)
                .unwrap_or_else(|_| Route::Home(CatalogFilter::default())),
            ["categories", ..] => Route::Categories,
            ["tags"] => Route::Tags,
            ["cart"] => Route::Cart,
            ["checkout"] => {
                let ids = url
                    .query_pairs()
                    .find(|(k, _)| k == "ids")
                    .and_then(|(_, v)| serde_json::from_str::<Vec<GameId>>(&v).ok())
                    .unwrap_or_default();
                Route::Checkout(ids)
            }
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["thank-you"] => Route::ThankYou,
            ["stats"] => Route::Stats,
            _ => Route::Home(CatalogFilter::default()),
        }
    }
}

fn route_url(path: &str) -> Url {
    let base = Url::parse(ROUTE_BASE).expect("route base is a valid url");
    base.join(path).unwrap_or(base)
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);

    /// Leaves the application for a provider-hosted page.
    fn redirect_external(&self, url: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    Route(Route),
    External(String),
}

/// Keeps every navigation in order, like a browser history.
#[derive(Debug, Default)]
pub struct History {
    visits: Mutex<Vec<Visit>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Visit> {
        lock(&self.visits).clone()
    }

    pub fn last(&self) -> Option<Visit> {
        lock(&self.visits).last().cloned()
    }

    pub fn count(&self, route: &Route) -> usize {
        lock(&self.visits)
            .iter()
            .filter(|v| matches!(v, Visit::Route(r) if r == route))
            .count()
    }
}

impl Navigator for History {
    fn navigate(&self, route: Route) {
        lock(&self.visits).push(Visit::Route(route));
    }

    fn redirect_external(&self, url: &str) {
        lock(&self.visits).push(Visit::External(url.to_string()));
    }
}
