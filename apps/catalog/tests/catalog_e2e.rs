//! End-to-end tests: a real server on an ephemeral port driven by the generated client.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use catalog_server::{CatalogConfig, serve};
use domain_catalog::{Memory, MemoryUnit, sample};
use futures::StreamExt;
use rpc::catalog::laptop_service_client::LaptopServiceClient;
use rpc::catalog::upload_image_request::Data;
use rpc::catalog::{
    CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest, SearchLaptopRequest,
    UploadImageRequest,
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::{Code, Request};
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;

struct TestServer {
    addr: SocketAddr,
    client: LaptopServiceClient<Channel>,
    image_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<eyre::Result<()>>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut CatalogConfig)) -> Self {
        let image_dir = tempfile::tempdir().unwrap();
        let mut config = CatalogConfig {
            image_dir: image_dir.path().to_path_buf(),
            ..Default::default()
        };
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(serve(config, listener, async {
            let _ = rx.await;
        }));

        let client = LaptopServiceClient::connect(format!("http://{}", addr))
            .await
            .unwrap();

        Self {
            addr,
            client,
            image_dir,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }

    async fn create(&mut self, laptop: Laptop) -> Result<String, tonic::Status> {
        let response = self
            .client
            .create_laptop(CreateLaptopRequest {
                laptop: Some(laptop),
            })
            .await?;
        Ok(response.into_inner().id)
    }
}

fn sample_laptop() -> Laptop {
    sample::new_laptop().into()
}

fn gigabytes(value: u64) -> Option<rpc::catalog::Memory> {
    Some(Memory::new(value, MemoryUnit::Gigabyte).into())
}

#[tokio::test]
async fn test_create_laptop_ids() {
    let mut server = TestServer::start().await;

    let laptop = sample_laptop();
    assert_eq!(server.create(laptop.clone()).await.unwrap(), laptop.id);

    let status = server.create(laptop).await.unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    let mut no_id = sample_laptop();
    no_id.id.clear();
    let id = server.create(no_id).await.unwrap();
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    let mut bad_id = sample_laptop();
    bad_id.id = "invalid-uuid".to_string();
    let status = server.create(bad_id).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn test_search_returns_exactly_the_matches() {
    let mut server = TestServer::start().await;

    let mut expected = HashSet::new();
    for i in 0..6 {
        let mut laptop = sample_laptop();
        let cpu = laptop.cpu.as_mut().unwrap();
        match i {
            0 => laptop.price_usd = 2500.0,
            1 => cpu.number_cores = 2,
            2 => cpu.min_ghz = 2.0,
            3 => {
                laptop.ram = Some(Memory::new(4096, MemoryUnit::Megabyte).into());
            }
            4 => {
                laptop.price_usd = 1999.0;
                cpu.number_cores = 4;
                cpu.min_ghz = 2.5;
                cpu.max_ghz = 4.5;
                laptop.ram = gigabytes(16);
                expected.insert(laptop.id.clone());
            }
            _ => {
                laptop.price_usd = 2000.0;
                cpu.number_cores = 6;
                cpu.min_ghz = 2.8;
                cpu.max_ghz = 5.0;
                laptop.ram = gigabytes(64);
                expected.insert(laptop.id.clone());
            }
        }
        server.create(laptop).await.unwrap();
    }

    let filter = Filter {
        max_price_usd: 2000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.2,
        min_ram: gigabytes(8),
    };
    let mut stream = server
        .client
        .search_laptop(SearchLaptopRequest {
            filter: Some(filter),
        })
        .await
        .unwrap()
        .into_inner();

    let mut found = Vec::new();
    while let Some(response) = stream.next().await {
        found.push(response.unwrap().laptop.unwrap().id);
    }

    assert_eq!(found.len(), 2);
    assert_eq!(found.into_iter().collect::<HashSet<_>>(), expected);

    server.stop().await;
}

#[tokio::test]
async fn test_search_stops_at_deadline() {
    let mut server = TestServer::start_with(|config| {
        config.scan_delay = Duration::from_millis(300);
    })
    .await;
    for _ in 0..5 {
        server.create(sample_laptop()).await.unwrap();
    }

    let mut request = Request::new(SearchLaptopRequest {
        filter: Some(Filter {
            max_price_usd: f64::MAX,
            ..Default::default()
        }),
    });
    request.set_timeout(Duration::from_millis(750));
    let mut stream = server
        .client
        .search_laptop(request)
        .await
        .unwrap()
        .into_inner();

    let mut found = 0;
    let mut failure = None;
    while let Some(response) = stream.next().await {
        match response {
            Ok(_) => found += 1,
            Err(status) => failure = Some(status),
        }
    }

    assert!(found < 5, "scan should not finish, got {found} matches");
    assert_eq!(failure.unwrap().code(), Code::DeadlineExceeded);

    server.stop().await;
}

fn upload_messages(laptop_id: &str, data: &[u8]) -> Vec<UploadImageRequest> {
    let mut messages = vec![UploadImageRequest {
        data: Some(Data::Info(ImageInfo {
            laptop_id: laptop_id.to_string(),
            image_type: ".jpg".to_string(),
        })),
    }];
    messages.extend(data.chunks(1024).map(|chunk| UploadImageRequest {
        data: Some(Data::ChunkData(chunk.to_vec())),
    }));
    messages
}

#[tokio::test]
async fn test_upload_image() {
    let mut server = TestServer::start().await;
    let laptop_id = server.create(sample_laptop()).await.unwrap();
    let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();

    let response = server
        .client
        .upload_image(tokio_stream::iter(upload_messages(&laptop_id, &data)))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.size, 3000);
    let path = server.image_dir.path().join(format!("{}.jpg", response.id));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), data);

    server.stop().await;
}

#[tokio::test]
async fn test_upload_rejections() {
    let mut server = TestServer::start_with(|config| {
        config.max_image_size = 2048;
    })
    .await;
    let laptop_id = server.create(sample_laptop()).await.unwrap();

    let status = server
        .client
        .upload_image(tokio_stream::iter(upload_messages(&laptop_id, &[0; 4096])))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let unknown = uuid::Uuid::new_v4().to_string();
    let status = server
        .client
        .upload_image(tokio_stream::iter(upload_messages(&unknown, &[0; 10])))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let mut entries = tokio::fs::read_dir(server.image_dir.path()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());

    server.stop().await;
}

fn rate_request(laptop_id: &str, score: f64) -> RateLaptopRequest {
    RateLaptopRequest {
        laptop_id: laptop_id.to_string(),
        score,
    }
}

#[tokio::test]
async fn test_rate_laptop_running_average() {
    let mut server = TestServer::start().await;
    let laptop_id = server.create(sample_laptop()).await.unwrap();

    let requests = [8.0, 7.5, 10.0].map(|score| rate_request(&laptop_id, score));
    let mut responses = server
        .client
        .rate_laptop(tokio_stream::iter(requests))
        .await
        .unwrap()
        .into_inner();

    let mut averages = Vec::new();
    while let Some(response) = responses.next().await {
        let response = response.unwrap();
        assert_eq!(response.laptop_id, laptop_id);
        averages.push((response.rated_count, response.average_score));
    }
    assert_eq!(averages, vec![(1, 8.0), (2, 7.75), (3, 8.5)]);

    server.stop().await;
}

#[tokio::test]
async fn test_rate_interleaves_requests_and_responses() {
    let mut server = TestServer::start().await;
    let laptop_id = server.create(sample_laptop()).await.unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let mut responses = server
        .client
        .rate_laptop(tokio_stream::wrappers::ReceiverStream::new(rx))
        .await
        .unwrap()
        .into_inner();

    // Each response arrives before the next score is sent.
    for (i, score) in [4.0, 6.0].into_iter().enumerate() {
        tx.send(rate_request(&laptop_id, score)).await.unwrap();
        let response = responses.next().await.unwrap().unwrap();
        assert_eq!(response.rated_count, i as u32 + 1);
    }
    drop(tx);
    assert!(responses.next().await.is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_rate_unknown_laptop_is_not_found() {
    let mut server = TestServer::start().await;
    let laptop_id = server.create(sample_laptop()).await.unwrap();

    let requests = vec![
        rate_request(&laptop_id, 9.0),
        rate_request(&uuid::Uuid::new_v4().to_string(), 9.0),
    ];
    let mut responses = server
        .client
        .rate_laptop(tokio_stream::iter(requests))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(responses.next().await.unwrap().unwrap().rated_count, 1);
    let status = responses.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    server.stop().await;
}

#[tokio::test]
async fn test_compressed_client() {
    let server = TestServer::start().await;
    let mut client = LaptopServiceClient::connect(format!("http://{}", server.addr))
        .await
        .unwrap()
        .send_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Zstd);

    let laptop = sample_laptop();
    let response = client
        .create_laptop(CreateLaptopRequest {
            laptop: Some(laptop.clone()),
        })
        .await
        .unwrap();
    assert_eq!(response.into_inner().id, laptop.id);

    server.stop().await;
}

#[tokio::test]
async fn test_health_reports_serving() {
    let server = TestServer::start().await;
    let channel = Channel::from_shared(format!("http://{}", server.addr))
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut health = HealthClient::new(channel);

    for service in ["", "catalog.v1.LaptopService"] {
        let response = health
            .check(HealthCheckRequest {
                service: service.to_string(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, ServingStatus::Serving as i32);
    }

    server.stop().await;
}
