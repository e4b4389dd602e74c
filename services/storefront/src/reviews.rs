use common::models::{GameId, NewReview, Review};
use common::validation::validate_review;

use crate::app::AppState;
use crate::error::{Result, StorefrontError};

/// Posts a review. Rating and comment are checked before any request; the
/// purchase requirement is the backend's to enforce.
pub async fn submit(app: &AppState, game: GameId, rating: u8, comment: &str) -> Result<Review> {
    let review = NewReview {
        game,
        rating,
        comment: comment.trim().to_string(),
    };
    validate_review(&review).map_err(StorefrontError::Validation)?;
    app.require_session()?;
    app.intercept(app.api.create_review(&review).await)
}

pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    Some(f64::from(sum) / reviews.len() as f64)
}
