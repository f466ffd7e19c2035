use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_parse_or};

/// Upload ceiling used when `CATALOG_MAX_IMAGE_SIZE` is unset (1 MiB).
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 1 << 20;

/// Catalog server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub host: String,
    pub port: u16,
    /// zstd on requests and responses
    pub compression: bool,
    pub image_dir: PathBuf,
    pub max_image_size: usize,
    /// Capacity of the channel between a store scan and the response stream
    pub stream_buffer: usize,
    pub scan_delay: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            host: "[::1]".to_string(),
            port: 50051,
            compression: true,
            image_dir: PathBuf::from("img"),
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            stream_buffer: 16,
            scan_delay: Duration::ZERO,
        }
    }
}

impl CatalogConfig {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| ConfigError::InvalidValue {
            key: "GRPC_HOST".to_string(),
            details: format!("{}: {}", addr, e),
        })
    }
}

impl FromEnv for CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_image_size = env_parse_or("CATALOG_MAX_IMAGE_SIZE", defaults.max_image_size)?;
        if u32::try_from(max_image_size).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "CATALOG_MAX_IMAGE_SIZE".to_string(),
                details: format!("{} does not fit in 32 bits", max_image_size),
            });
        }

        let stream_buffer = env_parse_or("CATALOG_SEARCH_BUFFER", defaults.stream_buffer)?;
        if stream_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CATALOG_SEARCH_BUFFER".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: env_or_default("GRPC_HOST", &defaults.host),
            port: env_parse_or("GRPC_PORT", defaults.port)?,
            compression: env_flag("GRPC_COMPRESSION", defaults.compression),
            image_dir: PathBuf::from(env_or_default("CATALOG_IMAGE_DIR", "img")),
            max_image_size,
            stream_buffer,
            scan_delay: Duration::from_millis(env_parse_or("CATALOG_SCAN_DELAY_MS", 0u64)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "GRPC_HOST",
        "GRPC_PORT",
        "GRPC_COMPRESSION",
        "CATALOG_IMAGE_DIR",
        "CATALOG_MAX_IMAGE_SIZE",
        "CATALOG_SEARCH_BUFFER",
        "CATALOG_SCAN_DELAY_MS",
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let config = CatalogConfig::from_env().unwrap();
            assert_eq!(config.port, 50051);
            assert!(config.compression);
            assert_eq!(config.image_dir, PathBuf::from("img"));
            assert_eq!(config.max_image_size, 1_048_576);
            assert_eq!(config.stream_buffer, 16);
            assert_eq!(config.scan_delay, Duration::ZERO);
            assert_eq!(config.addr().unwrap().to_string(), "[::1]:50051");
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("GRPC_HOST", Some("127.0.0.1")),
                ("GRPC_PORT", Some("8080")),
                ("GRPC_COMPRESSION", Some("false")),
                ("CATALOG_IMAGE_DIR", Some("/tmp/laptops")),
                ("CATALOG_MAX_IMAGE_SIZE", Some("2048")),
                ("CATALOG_SEARCH_BUFFER", Some("4")),
                ("CATALOG_SCAN_DELAY_MS", Some("1000")),
            ],
            || {
                let config = CatalogConfig::from_env().unwrap();
                assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
                assert!(!config.compression);
                assert_eq!(config.image_dir, PathBuf::from("/tmp/laptops"));
                assert_eq!(config.max_image_size, 2048);
                assert_eq!(config.stream_buffer, 4);
                assert_eq!(config.scan_delay, Duration::from_secs(1));
            },
        );
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        temp_env::with_var("GRPC_PORT", Some("not-a-port"), || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "GRPC_PORT"));
        });
        temp_env::with_var("CATALOG_SEARCH_BUFFER", Some("0"), || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
        });
    }

    #[test]
    fn test_bad_host_is_rejected_by_addr() {
        let config = CatalogConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.addr().is_err());
    }
}
