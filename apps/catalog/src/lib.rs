//! Laptop catalog gRPC service
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   ↓ (gRPC, optional Zstd compression)
//! LaptopServiceImpl (service.rs)
//!   ↓ (proto ↔ domain conversions via From/TryFrom traits)
//! LaptopStore / ImageStore / RatingStore (domain_catalog)
//!   ↓
//! memory + image directory
//! ```
//!
//! ## Modules
//!
//! - `config`: `CatalogConfig` loaded from the environment
//! - `metadata`: `grpc-timeout` parsing and request helpers
//! - `server`: server initialization and lifecycle
//! - `service`: gRPC service implementation (`LaptopServiceImpl`)

pub mod config;
pub mod metadata;
pub mod server;
pub mod service;

pub use config::CatalogConfig;
pub use server::{build_service, run, serve};
pub use service::LaptopServiceImpl;
