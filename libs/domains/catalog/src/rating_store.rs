use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CatalogResult;
use crate::models::Rating;
use crate::repository::RatingStore;

/// In-memory rating aggregates. Updates take the write lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRatingStore {
    ratings: Arc<RwLock<HashMap<String, Rating>>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn add(&self, laptop_id: &str, score: f64) -> CatalogResult<Rating> {
        let mut ratings = self.ratings.write().await;

        let rating = ratings.entry(laptop_id.to_string()).or_default();
        rating.count += 1;
        rating.sum += score;

        debug!(laptop_id, count = rating.count, "rating updated");
        Ok(*rating)
    }

    async fn get(&self, laptop_id: &str) -> CatalogResult<Option<Rating>> {
        let ratings = self.ratings.read().await;
        Ok(ratings.get(laptop_id).copied())
    }
}
