//! Catalog browsing with "load more" pagination.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Mutex;

use log::{debug, warn};
use rust_decimal::Decimal;

use common::models::{Category, Game, Tag};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::events::lock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    pub q: Option<String>,
    pub category_id: Option<u64>,
    pub tag_id: Option<u64>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

impl CatalogFilter {
    /// Query parameters in a stable order; unset filters are omitted.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = self.q.as_ref().filter(|q| !q.is_empty()) {
            params.push(("q", q.clone()));
        }
        if let Some(id) = self.category_id {
            params.push(("category_id", id.to_string()));
        }
        if let Some(id) = self.tag_id {
            params.push(("tag_id", id.to_string()));
        }
        if let Some(min) = self.price_min {
            params.push(("price_min", min.normalize().to_string()));
        }
        if let Some(max) = self.price_max {
            params.push(("price_max", max.normalize().to_string()));
        }
        params
    }

    /// Empty or unparsable values are treated as unset.
    pub fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut filter = CatalogFilter::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "q" => filter.q = Some(value.to_string()),
                "category_id" => filter.category_id = value.parse().ok(),
                "tag_id" => filter.tag_id = value.parse().ok(),
                "price_min" => filter.price_min = value.parse().ok(),
                "price_max" => filter.price_max = value.parse().ok(),
                _ => {}
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.to_params().is_empty()
    }
}

#[derive(Debug)]
struct CatalogState {
    filter: CatalogFilter,
    page: u32,
    games: Vec<Game>,
    has_more: bool,
    loading: bool,
    generation: u64,
}

/// The displayed game list for one filter.
///
/// Changing the filter replaces the list with page 1; [`Catalog::load_more`]
/// appends the next page until an empty page is returned. A response that
/// arrives after the filter has changed again is dropped.
pub struct Catalog {
    api: ApiClient,
    state: Mutex<CatalogState>,
}

impl Catalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(CatalogState {
                filter: CatalogFilter::default(),
                page: 0,
                games: Vec::new(),
                has_more: true,
                loading: false,
                generation: 0,
            }),
        }
    }

    pub async fn apply_filter(&self, filter: CatalogFilter) -> Result<()> {
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.filter = filter.clone();
            state.page = 0;
            state.has_more = true;
            state.loading = true;
            state.generation
        };

        let result = self.fetch_page(&filter, 1).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!("dropping stale catalog response for generation {}", generation);
            return Ok(());
        }
        state.loading = false;
        let games = match result {
            Ok(games) => games,
            Err(e) => {
                // The old list belongs to the previous filter.
                state.games.clear();
                state.has_more = false;
                return Err(e);
            }
        };
        state.page = 1;
        state.has_more = !games.is_empty();
        state.games = dedup(games);
        Ok(())
    }

    /// Fetches and appends the next page. Returns `false` without issuing a
    /// request when there is nothing more to load or a load is in flight.
    pub async fn load_more(&self) -> Result<bool> {
        let (filter, next_page, generation) = {
            let mut state = lock(&self.state);
            if !state.has_more || state.loading || state.page == 0 {
                return Ok(false);
            }
            state.loading = true;
            (state.filter.clone(), state.page + 1, state.generation)
        };

        let result = self.fetch_page(&filter, next_page).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!("dropping stale page {} for generation {}", next_page, generation);
            return Ok(false);
        }
        state.loading = false;
        let games = result?;
        if games.is_empty() {
            state.has_more = false;
            return Ok(false);
        }
        state.page = next_page;
        let seen: HashSet<u64> = state.games.iter().map(|g| g.id).collect();
        let fresh: Vec<Game> = games.into_iter().filter(|g| !seen.contains(&g.id)).collect();
        let appended = !fresh.is_empty();
        state.games.extend(fresh);
        Ok(appended)
    }

    async fn fetch_page(&self, filter: &CatalogFilter, page: u32) -> Result<Vec<Game>> {
        let mut params = filter.to_params();
        params.push(("page", page.to_string()));
        match self.api.games(&params).await {
            // Paginated backends answer 404 past the last page.
            Err(StorefrontError::Rejected { status: 404, .. }) if page > 1 => Ok(Vec::new()),
            other => other,
        }
    }

    pub fn games(&self) -> Vec<Game> {
        lock(&self.state).games.clone()
    }

    pub fn has_more(&self) -> bool {
        lock(&self.state).has_more
    }

    pub fn page(&self) -> u32 {
        lock(&self.state).page
    }

    pub fn filter(&self) -> CatalogFilter {
        lock(&self.state).filter.clone()
    }

    /// Category and tag lists for the filter bar; a failed lookup is shown
    /// as an empty list.
    pub async fn lookups(&self) -> (Vec<Category>, Vec<Tag>) {
        let (categories, tags) = tokio::join!(self.api.categories(), self.api.tags());
        let categories = categories.unwrap_or_else(|e| {
            warn!("failed to load categories: {}", e);
            Vec::new()
        });
        let tags = tags.unwrap_or_else(|e| {
            warn!("failed to load tags: {}", e);
            Vec::new()
        });
        (categories, tags)
    }
}

fn dedup(games: Vec<Game>) -> Vec<Game> {
    let mut seen = HashSet::new();
    games.into_iter().filter(|g| seen.insert(g.id)).collect()
}
