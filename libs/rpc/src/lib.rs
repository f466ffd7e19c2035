//! Protobuf and tonic bindings for the catalog services.
//!
//! The code under `generated/` is generated from `proto/` (prost + tonic) and checked in;
//! regenerate it instead of editing by hand.

pub mod catalog {
    include!("generated/catalog/v1/catalog.v1.rs");
    // catalog.v1.tonic.rs is included by catalog.v1.rs
}
