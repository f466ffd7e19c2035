//! Catalog Domain
//!
//! Laptops, their search filter, running ratings and uploaded images.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ gRPC service (apps)  │  ← validation, status translation
//! └──────────┬───────────┘
//!            │ CallContext
//! ┌──────────▼───────────┐
//! │ Stores               │  ← LaptopStore / RatingStore / ImageStore
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │ Models               │  ← Laptop, Filter, Rating, ImageInfo
//! └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{CallContext, InMemoryLaptopStore, LaptopStore, sample};
//!
//! # async fn example() -> domain_catalog::CatalogResult<()> {
//! let store = InMemoryLaptopStore::new();
//! let laptop = sample::new_laptop();
//! store.save(&laptop).await?;
//! assert!(store.find(&laptop.id).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod image_store;
pub mod laptop_store;
pub mod models;
pub mod rating_store;
pub mod repository;
pub mod sample;
pub mod serializer;

pub use context::CallContext;
pub use error::{CatalogError, CatalogResult};
pub use image_store::DiskImageStore;
pub use laptop_store::InMemoryLaptopStore;
pub use models::{
    Cpu, Filter, Gpu, ImageInfo, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel,
    Rating, Resolution, Screen, Storage, StorageDriver, Weight,
};
pub use rating_store::InMemoryRatingStore;
pub use repository::{ImageStore, LaptopStore, MatchSink, RatingStore};
