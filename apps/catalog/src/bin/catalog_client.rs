//! Command line client for the laptop catalog.
//!
//! Exercises every RPC against a running server: create sample laptops,
//! search them, upload an image and stream ratings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use core_config::Environment;
use domain_catalog::{Memory, MemoryUnit, sample};
use eyre::{Result, WrapErr, bail};
use futures::StreamExt;
use rpc::catalog::laptop_service_client::LaptopServiceClient;
use rpc::catalog::upload_image_request::Data;
use rpc::catalog::{
    CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest, SearchLaptopRequest,
    UploadImageRequest,
};
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::{Code, Request};
use tracing::{info, warn};

const CHUNK_SIZE: usize = 1024;

#[derive(Parser)]
#[command(name = "catalog-client")]
#[command(about = "Demo client for the laptop catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server address
    #[arg(long, env = "CATALOG_ADDRESS", default_value = "http://[::1]:50051", global = true)]
    address: String,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 5, global = true)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create one random laptop
    Create,
    /// Create ten random laptops, then search them
    Search {
        #[arg(long, default_value_t = 3000.0)]
        max_price: f64,
        #[arg(long, default_value_t = 4)]
        min_cores: u32,
        #[arg(long, default_value_t = 2.5)]
        min_ghz: f64,
        /// Minimum RAM in gigabytes
        #[arg(long, default_value_t = 8)]
        min_ram_gb: u64,
    },
    /// Create a laptop and upload an image for it
    Upload {
        /// Image file to send
        #[arg(long)]
        image: PathBuf,
    },
    /// Create three laptops and rate them for a number of rounds
    Rate {
        #[arg(long, default_value_t = 3)]
        rounds: usize,
    },
}

struct CatalogClient {
    client: LaptopServiceClient<Channel>,
    timeout: Duration,
}

impl CatalogClient {
    async fn connect(address: String, timeout: Duration) -> Result<Self> {
        let channel = Channel::from_shared(address.clone())
            .wrap_err_with(|| format!("Invalid server address: {}", address))?
            .connect()
            .await
            .wrap_err_with(|| format!("Failed to connect to {}", address))?;
        info!(%address, "Connected");

        let client = LaptopServiceClient::new(channel)
            .send_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Zstd);
        Ok(Self { client, timeout })
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.timeout);
        request
    }

    /// Returns `None` when the laptop already exists.
    async fn create_laptop(&mut self, laptop: Laptop) -> Result<Option<String>> {
        let request = self.request(CreateLaptopRequest {
            laptop: Some(laptop),
        });

        match self.client.create_laptop(request).await {
            Ok(response) => {
                let id = response.into_inner().id;
                info!(laptop_id = %id, "Created laptop");
                Ok(Some(id))
            }
            Err(status) if status.code() == Code::AlreadyExists => {
                warn!("Laptop already exists");
                Ok(None)
            }
            Err(status) => Err(status).wrap_err("Cannot create laptop"),
        }
    }

    async fn create_sample(&mut self) -> Result<String> {
        match self.create_laptop(sample::new_laptop().into()).await? {
            Some(id) => Ok(id),
            None => bail!("Randomly generated laptop id collided"),
        }
    }

    async fn search_laptop(&mut self, filter: Filter) -> Result<()> {
        info!(?filter, "Searching");
        let request = self.request(SearchLaptopRequest {
            filter: Some(filter),
        });
        let mut stream = self
            .client
            .search_laptop(request)
            .await
            .wrap_err("Cannot search laptops")?
            .into_inner();

        while let Some(response) = stream.next().await {
            let response = response.wrap_err("Cannot receive search response")?;
            let Some(laptop) = response.laptop else {
                continue;
            };
            let cpu = laptop.cpu.unwrap_or_default();
            info!(
                laptop_id = %laptop.id,
                brand = %laptop.brand,
                name = %laptop.name,
                cpu_cores = cpu.number_cores,
                cpu_min_ghz = cpu.min_ghz,
                ram = ?laptop.ram,
                price_usd = laptop.price_usd,
                "Found laptop"
            );
        }
        Ok(())
    }

    async fn upload_image(&mut self, laptop_id: String, image: &Path) -> Result<()> {
        let data = tokio::fs::read(image)
            .await
            .wrap_err_with(|| format!("Cannot read image {}", image.display()))?;
        let image_type = image
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut messages = vec![UploadImageRequest {
            data: Some(Data::Info(ImageInfo {
                laptop_id,
                image_type,
            })),
        }];
        messages.extend(data.chunks(CHUNK_SIZE).map(|chunk| UploadImageRequest {
            data: Some(Data::ChunkData(chunk.to_vec())),
        }));

        let request = self.request(tokio_stream::iter(messages));
        let response = self
            .client
            .upload_image(request)
            .await
            .wrap_err("Cannot upload image")?
            .into_inner();

        info!(image_id = %response.id, size = response.size, "Uploaded image");
        Ok(())
    }

    async fn rate_laptops(&mut self, laptop_ids: &[String], scores: &[f64]) -> Result<()> {
        let requests: Vec<_> = laptop_ids
            .iter()
            .zip(scores)
            .map(|(laptop_id, &score)| RateLaptopRequest {
                laptop_id: laptop_id.clone(),
                score,
            })
            .collect();
        let sent = requests.len();

        let request = self.request(tokio_stream::iter(requests));
        let mut responses = self
            .client
            .rate_laptop(request)
            .await
            .wrap_err("Cannot rate laptops")?
            .into_inner();

        let mut received = 0;
        while let Some(response) = responses.next().await {
            let response = response.wrap_err("Cannot receive rating")?;
            info!(
                laptop_id = %response.laptop_id,
                rated_count = response.rated_count,
                average_score = response.average_score,
                "Received rating"
            );
            received += 1;
        }

        if received != sent {
            bail!("Sent {} scores but received {} ratings", sent, received);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    core_config::tracing::install_color_eyre();
    core_config::tracing::init_tracing(&Environment::from_env());

    let cli = Cli::parse();
    let mut client =
        CatalogClient::connect(cli.address, Duration::from_secs(cli.timeout)).await?;

    match cli.command {
        Commands::Create => {
            client.create_sample().await?;
        }
        Commands::Search {
            max_price,
            min_cores,
            min_ghz,
            min_ram_gb,
        } => {
            for _ in 0..10 {
                client.create_sample().await?;
            }
            let filter = Filter {
                max_price_usd: max_price,
                min_cpu_cores: min_cores,
                min_cpu_ghz: min_ghz,
                min_ram: Some(Memory::new(min_ram_gb, MemoryUnit::Gigabyte).into()),
            };
            client.search_laptop(filter).await?;
        }
        Commands::Upload { image } => {
            let laptop_id = client.create_sample().await?;
            client.upload_image(laptop_id, &image).await?;
        }
        Commands::Rate { rounds } => {
            let mut laptop_ids = Vec::new();
            for _ in 0..3 {
                laptop_ids.push(client.create_sample().await?);
            }
            for round in 1..=rounds {
                let scores: Vec<f64> = laptop_ids
                    .iter()
                    .map(|_| sample::random_laptop_score())
                    .collect();
                info!(round, ?scores, "Rating laptops");
                client.rate_laptops(&laptop_ids, &scores).await?;
            }
        }
    }

    Ok(())
}
