//! Download gate for a game's detail page.

use log::{debug, info};

use common::models::GameId;

use crate::app::AppState;
use crate::error::StorefrontError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAccess {
    /// The signed, short-lived link for the current user.
    Download(String),
    /// Not signed in, not purchased, or the link could not be fetched.
    Buy,
}

impl GameAccess {
    pub fn can_download(&self) -> bool {
        matches!(self, GameAccess::Download(_))
    }
}

/// Asks the backend for a download link. Any failure leaves the buy action
/// in place; a rejected token is dropped without leaving the page.
pub async fn access(app: &AppState, game_id: GameId) -> GameAccess {
    if !app.session.has_token() {
        return GameAccess::Buy;
    }
    match app.api.download_link(game_id).await {
        Ok(link) => GameAccess::Download(link.link),
        Err(StorefrontError::Unauthorized) => {
            info!("session rejected while checking downloads, signing out");
            app.session.expire();
            GameAccess::Buy
        }
        Err(e) => {
            debug!("no download for game {}: {}", game_id, e);
            GameAccess::Buy
        }
    }
}
