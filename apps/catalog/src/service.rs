//! gRPC service implementation for the laptop catalog
//!
//! `LaptopServiceImpl` adapts the four interaction shapes of
//! `catalog.v1.LaptopService` onto the domain stores:
//!
//! - `CreateLaptop`: unary, validates or assigns the id and saves
//! - `SearchLaptop`: server streaming, one response per matching laptop
//! - `UploadImage`: client streaming, info first then chunks, one response
//! - `RateLaptop`: bidirectional, one aggregate per score in arrival order
//!
//! Store errors become statuses through `From<CatalogError> for Status`.

use std::sync::Arc;

use domain_catalog::{
    CallContext, CatalogError, CatalogResult, Filter, ImageStore, Laptop, LaptopStore, MatchSink,
    RatingStore,
};
use futures::{Stream, StreamExt};
use rpc::catalog::laptop_service_server::LaptopService;
use rpc::catalog::upload_image_request::Data;
use rpc::catalog::{
    CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::{Instrument, Span, debug, info, instrument};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_IMAGE_SIZE;
use crate::metadata::{RequiredField, ToTonicResult, call_context};

type ResponseSender<T> = mpsc::Sender<Result<T, Status>>;

pub struct LaptopServiceImpl {
    laptops: Arc<dyn LaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_size: usize,
    stream_buffer: usize,
}

impl LaptopServiceImpl {
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            stream_buffer: 16,
        }
    }

    pub fn with_max_image_size(mut self, max_image_size: usize) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer.max(1);
        self
    }

    /// Assemble an upload and hand it to the image store.
    async fn receive_image<S>(
        &self,
        ctx: &CallContext,
        mut stream: S,
    ) -> Result<UploadImageResponse, Status>
    where
        S: Stream<Item = Result<UploadImageRequest, Status>> + Unpin + Send,
    {
        let info = match ctx.run(stream.next()).await?.transpose()? {
            Some(UploadImageRequest {
                data: Some(Data::Info(info)),
            }) => info,
            _ => return Err(CatalogError::invalid("first message must carry image info").into()),
        };
        let laptop_id = info.laptop_id;
        info!(laptop_id = %laptop_id, image_type = %info.image_type, "received upload-image request");

        if self.laptops.find(&laptop_id).await?.is_none() {
            return Err(CatalogError::invalid(format!("laptop {} doesn't exist", laptop_id)).into());
        }

        let mut image = Vec::new();
        loop {
            let Some(message) = ctx.run(stream.next()).await?.transpose()? else {
                debug!("no more data");
                break;
            };
            let chunk = match message.data {
                Some(Data::ChunkData(chunk)) => chunk,
                Some(Data::Info(_)) => {
                    return Err(CatalogError::invalid("image info may only be sent once").into());
                }
                None => return Err(CatalogError::invalid("upload message carries no data").into()),
            };

            let size = image.len() + chunk.len();
            debug!(chunk = chunk.len(), size, "received chunk");
            if size > self.max_image_size {
                return Err(CatalogError::invalid(format!(
                    "image is too large: {} > {}",
                    size, self.max_image_size
                ))
                .into());
            }
            image.extend_from_slice(&chunk);
        }

        let size = u32::try_from(image.len())
            .map_err(|_| CatalogError::Internal(format!("image size {} overflows", image.len())))?;
        let image_id = self
            .images
            .save(&laptop_id, &info.image_type, &image)
            .await?;

        info!(image_id = %image_id, size, "saved image");
        Ok(UploadImageResponse { id: image_id, size })
    }

    /// Run the search on its own task, streaming matches as they are found.
    fn spawn_search(
        &self,
        ctx: CallContext,
        filter: Filter,
    ) -> ReceiverStream<Result<SearchLaptopResponse, Status>> {
        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let laptops = Arc::clone(&self.laptops);

        tokio::spawn(
            async move {
                let _watch = DisconnectWatch::spawn(&tx, ctx.token().clone());
                let mut sink = SearchResponses(tx.clone());

                match laptops.search(&ctx, &filter, &mut sink).await {
                    Ok(matched) => debug!(matched, "search completed"),
                    Err(err) => {
                        let _ = tx.send(Err(err.into())).await;
                    }
                }
            }
            .in_current_span(),
        );

        ReceiverStream::new(rx)
    }

    /// Answer `inbound` scores on their own task.
    fn spawn_rating<S>(
        &self,
        ctx: CallContext,
        inbound: S,
    ) -> ReceiverStream<Result<RateLaptopResponse, Status>>
    where
        S: Stream<Item = Result<RateLaptopRequest, Status>> + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let laptops = Arc::clone(&self.laptops);
        let ratings = Arc::clone(&self.ratings);

        tokio::spawn(
            async move {
                let _watch = DisconnectWatch::spawn(&tx, ctx.token().clone());

                let result =
                    rate_stream(&ctx, inbound, laptops.as_ref(), ratings.as_ref(), &tx).await;
                if let Err(status) = result {
                    let _ = tx.send(Err(status)).await;
                }
            }
            .in_current_span(),
        );

        ReceiverStream::new(rx)
    }
}

/// Forwards search matches to the response stream. The store races each
/// `accept` against the call, so a client that stops reading cannot pin the scan.
struct SearchResponses(ResponseSender<SearchLaptopResponse>);

#[tonic::async_trait]
impl MatchSink for SearchResponses {
    async fn accept(&mut self, laptop: Laptop) -> CatalogResult<()> {
        debug!(laptop_id = %laptop.id, "found laptop");
        let response = SearchLaptopResponse {
            laptop: Some(laptop.into()),
        };
        self.0.send(Ok(response)).await.map_err(|_| CatalogError::Canceled)
    }
}

/// Cancels a token once the client drops the response stream. Stops
/// watching when dropped.
struct DisconnectWatch(JoinHandle<()>);

impl DisconnectWatch {
    fn spawn<T: Send + 'static>(tx: &ResponseSender<T>, token: CancellationToken) -> Self {
        let tx = tx.clone();
        Self(tokio::spawn(async move {
            tx.closed().await;
            debug!("client went away");
            token.cancel();
        }))
    }
}

impl Drop for DisconnectWatch {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Answer every inbound score with the updated aggregate, one for one.
async fn rate_stream<S>(
    ctx: &CallContext,
    mut inbound: S,
    laptops: &dyn LaptopStore,
    ratings: &dyn RatingStore,
    tx: &ResponseSender<RateLaptopResponse>,
) -> Result<(), Status>
where
    S: Stream<Item = Result<RateLaptopRequest, Status>> + Unpin,
{
    loop {
        let Some(RateLaptopRequest { laptop_id, score }) =
            ctx.run(inbound.next()).await?.transpose()?
        else {
            debug!("no more data");
            return Ok(());
        };

        if !score.is_finite() {
            return Err(CatalogError::invalid(format!("score must be finite, got {}", score)).into());
        }
        if laptops.find(&laptop_id).await?.is_none() {
            return Err(CatalogError::NotFound(laptop_id).into());
        }

        let rating = ratings.add(&laptop_id, score).await?;
        debug!(laptop_id = %laptop_id, score, count = rating.count, "rated laptop");

        let response = RateLaptopResponse {
            laptop_id,
            rated_count: rating.count,
            average_score: rating.average(),
        };
        ctx.run(tx.send(Ok(response)))
            .await?
            .map_err(|_| CatalogError::Canceled)?;
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServiceImpl {
    #[instrument(skip_all, fields(laptop_id))]
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let ctx = call_context(&request);
        let laptop = request.into_inner().laptop.required("laptop")?;

        if !laptop.id.is_empty() {
            Uuid::parse_str(&laptop.id).map_err(|e| {
                CatalogError::invalid(format!("laptop ID is not a valid UUID: {}", e))
            })?;
        }
        let mut laptop = Laptop::try_from(laptop).to_tonic()?;
        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        }
        Span::current().record("laptop_id", laptop.id.as_str());
        info!("received create-laptop request");

        ctx.check()?;
        self.laptops.save(&laptop).await?;

        info!("saved laptop");
        Ok(Response::new(CreateLaptopResponse { id: laptop.id }))
    }

    type SearchLaptopStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;

    #[instrument(skip_all)]
    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let ctx = call_context(&request);
        let filter = request.into_inner().filter.required("filter")?;
        let filter = Filter::try_from(filter).to_tonic()?;
        info!(?filter, "received search-laptop request");

        Ok(Response::new(self.spawn_search(ctx, filter)))
    }

    #[instrument(skip_all)]
    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let ctx = call_context(&request);
        let response = self.receive_image(&ctx, request.into_inner()).await?;
        Ok(Response::new(response))
    }

    type RateLaptopStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

    #[instrument(skip_all)]
    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let ctx = call_context(&request);
        Ok(Response::new(self.spawn_rating(ctx, request.into_inner())))
    }
}
