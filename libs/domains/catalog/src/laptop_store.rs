use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::context::CallContext;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Filter, Laptop};
use crate::repository::{LaptopStore, MatchSink};

/// In-memory laptop store.
///
/// One map behind one reader/writer lock. `search` holds the read lock for the
/// whole scan, so a long search delays writers until it finishes or aborts.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLaptopStore {
    laptops: Arc<RwLock<HashMap<String, Laptop>>>,
    scan_delay: Duration,
}

impl InMemoryLaptopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend `delay` evaluating each candidate during a search.
    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = delay;
        self
    }
}

impl InMemoryLaptopStore {
    /// Every wait inside the scan races `ctx`, so a stalled sink cannot keep
    /// the read lock past the call's deadline.
    async fn scan(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        laptops: &HashMap<String, Laptop>,
        sink: &mut dyn MatchSink,
        matched: &mut usize,
    ) -> CatalogResult<()> {
        for laptop in laptops.values() {
            if !self.scan_delay.is_zero() {
                ctx.run(tokio::time::sleep(self.scan_delay)).await?;
            }
            ctx.check()?;

            debug!(laptop_id = %laptop.id, "checking laptop");
            if filter.is_qualified(laptop) {
                ctx.run(sink.accept(laptop.clone())).await??;
                *matched += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LaptopStore for InMemoryLaptopStore {
    #[instrument(skip(self, laptop), fields(laptop_id = %laptop.id))]
    async fn save(&self, laptop: &Laptop) -> CatalogResult<()> {
        let mut laptops = self.laptops.write().await;

        if laptops.contains_key(&laptop.id) {
            return Err(CatalogError::AlreadyExists(laptop.id.clone()));
        }

        laptops.insert(laptop.id.clone(), laptop.clone());
        info!("Saved laptop");
        Ok(())
    }

    async fn find(&self, id: &str) -> CatalogResult<Option<Laptop>> {
        let laptops = self.laptops.read().await;
        Ok(laptops.get(id).cloned())
    }

    #[instrument(skip_all)]
    async fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        sink: &mut dyn MatchSink,
    ) -> CatalogResult<usize> {
        let laptops = self.laptops.read().await;
        let mut matched = 0;

        match self.scan(ctx, filter, &laptops, sink, &mut matched).await {
            Ok(()) => {
                debug!(matched, "search finished");
                Ok(matched)
            }
            Err(err) => {
                warn!(matched, error = %err, "search aborted");
                Err(err)
            }
        }
    }

    async fn len(&self) -> CatalogResult<usize> {
        Ok(self.laptops.read().await.len())
    }
}
