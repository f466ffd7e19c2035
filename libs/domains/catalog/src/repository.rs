use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::CallContext;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Filter, ImageInfo, Laptop, Rating};

/// Receives laptops that matched a search, one call per match.
#[async_trait]
pub trait MatchSink: Send {
    async fn accept(&mut self, laptop: Laptop) -> CatalogResult<()>;
}

/// Forwards matches into a bounded channel. A full channel blocks the scan
/// until the consumer reads or the call stops; a closed one means the
/// consumer is gone and the scan stops as canceled.
#[async_trait]
impl MatchSink for mpsc::Sender<Laptop> {
    async fn accept(&mut self, laptop: Laptop) -> CatalogResult<()> {
        self.send(laptop).await.map_err(|_| CatalogError::Canceled)
    }
}

#[async_trait]
impl MatchSink for Vec<Laptop> {
    async fn accept(&mut self, laptop: Laptop) -> CatalogResult<()> {
        self.push(laptop);
        Ok(())
    }
}

/// Keyed laptop storage
#[async_trait]
pub trait LaptopStore: Send + Sync {
    /// Store a copy of `laptop`. The id must already be assigned.
    async fn save(&self, laptop: &Laptop) -> CatalogResult<()>;

    /// Copy of the stored laptop, or `None` if the id is unknown.
    async fn find(&self, id: &str) -> CatalogResult<Option<Laptop>>;

    /// Feed every laptop matching `filter` into `sink`, returning the match count.
    ///
    /// `ctx` is checked before each candidate and bounds every wait on the
    /// sink; matches already handed to the sink stay delivered when the scan
    /// aborts.
    async fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        sink: &mut dyn MatchSink,
    ) -> CatalogResult<usize>;

    async fn len(&self) -> CatalogResult<usize>;
}

/// Running score aggregates keyed by laptop id
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Fold `score` into the aggregate for `laptop_id` and return the result.
    async fn add(&self, laptop_id: &str, score: f64) -> CatalogResult<Rating>;

    async fn get(&self, laptop_id: &str) -> CatalogResult<Option<Rating>>;
}

/// Persisted laptop images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist a fully assembled image and return its generated id.
    async fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> CatalogResult<String>;

    async fn find(&self, image_id: &str) -> CatalogResult<Option<ImageInfo>>;

    async fn len(&self) -> CatalogResult<usize>;
}
