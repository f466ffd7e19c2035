//! File and JSON helpers for laptops.
//!
//! The JSON form is the canonical one used to compare laptops structurally;
//! the binary helpers read and write any protobuf message.

use std::path::Path;

use prost::Message;

use crate::error::{CatalogError, CatalogResult};
use crate::models::Laptop;

/// Pretty-printed JSON with stable field order.
pub fn laptop_to_json(laptop: &Laptop) -> CatalogResult<String> {
    Ok(serde_json::to_string_pretty(laptop)?)
}

pub fn laptop_from_json(json: &str) -> CatalogResult<Laptop> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_json_file(laptop: &Laptop, path: impl AsRef<Path>) -> CatalogResult<()> {
    std::fs::write(path, laptop_to_json(laptop)?)?;
    Ok(())
}

pub fn write_protobuf_binary_file<M: Message>(
    message: &M,
    path: impl AsRef<Path>,
) -> CatalogResult<()> {
    std::fs::write(path, message.encode_to_vec())?;
    Ok(())
}

pub fn read_protobuf_binary_file<M: Message + Default>(path: impl AsRef<Path>) -> CatalogResult<M> {
    let data = std::fs::read(path)?;
    M::decode(data.as_slice())
        .map_err(|e| CatalogError::Internal(format!("cannot decode protobuf file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use rpc::catalog as proto;

    #[test]
    fn test_binary_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laptop.bin");
        let laptop: proto::Laptop = sample::new_laptop().into();

        write_protobuf_binary_file(&laptop, &path).unwrap();
        let read: proto::Laptop = read_protobuf_binary_file(&path).unwrap();

        assert_eq!(read, laptop);
    }

    #[test]
    fn test_json_file_matches_canonical_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laptop.json");
        let laptop = sample::new_laptop();

        write_json_file(&laptop, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert_eq!(written, laptop_to_json(&laptop).unwrap());
        let parsed = laptop_from_json(&written).unwrap();
        assert_eq!(parsed.id, laptop.id);
        assert_eq!(parsed.storages, laptop.storages);
    }

    #[test]
    fn test_read_garbage_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bin");
        std::fs::write(&path, [0xff, 0xff, 0xff]).unwrap();

        let result: CatalogResult<proto::Laptop> = read_protobuf_binary_file(&path);
        assert!(matches!(result, Err(CatalogError::Internal(_))));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let result: CatalogResult<proto::Laptop> = read_protobuf_binary_file("/nonexistent/laptop.bin");
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
