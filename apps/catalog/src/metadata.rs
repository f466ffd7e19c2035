//! Helpers for inbound request metadata and error lifting.

use std::time::Duration;

use domain_catalog::{CallContext, CatalogError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Status};

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Parse a `grpc-timeout` header value such as `500m` or `2S`.
///
/// The value is at most eight ASCII digits followed by one unit character
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

/// Deadline implied by the caller's `grpc-timeout`, measured from now.
pub fn request_deadline<T>(request: &Request<T>) -> Option<Instant> {
    request
        .metadata()
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_grpc_timeout)
        .map(|timeout| Instant::now() + timeout)
}

/// Fresh cancellation state for one call, bounded by its `grpc-timeout`.
pub fn call_context<T>(request: &Request<T>) -> CallContext {
    CallContext::from_token(CancellationToken::new(), request_deadline(request))
}

/// Lift conversion errors into `InvalidArgument` through the logged
/// [`CatalogError`] translation.
pub trait ToTonicResult<T> {
    fn to_tonic(self) -> Result<T, Status>;
}

impl<T> ToTonicResult<T> for Result<T, String> {
    fn to_tonic(self) -> Result<T, Status> {
        self.map_err(|e| CatalogError::InvalidArgument(e).into())
    }
}

/// `None` becomes `InvalidArgument("{field} is required")`.
pub trait RequiredField<T> {
    fn required(self, field: &str) -> Result<T, Status>;
}

impl<T> RequiredField<T> for Option<T> {
    fn required(self, field: &str) -> Result<T, Status> {
        self.ok_or_else(|| CatalogError::invalid(format!("{} is required", field)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_parse_grpc_timeout_units() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("10u"), Some(Duration::from_micros(10)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn test_parse_grpc_timeout_rejects_garbage() {
        for value in ["", "S", "5", "5s", "-5S", "123456789S", "1.5S", "5é"] {
            assert_eq!(parse_grpc_timeout(value), None, "{value}");
        }
    }

    #[test]
    fn test_request_deadline_from_metadata() {
        let mut request = Request::new(());
        assert!(request_deadline(&request).is_none());

        request
            .metadata_mut()
            .insert(GRPC_TIMEOUT_HEADER, "5S".parse().unwrap());
        let deadline = request_deadline(&request).unwrap();
        assert!(deadline > Instant::now() + Duration::from_secs(4));
    }

    #[test]
    fn test_lifting_helpers() {
        let err = Err::<(), _>("Invalid memory unit: 0".to_string())
            .to_tonic()
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let err = None::<u8>.required("filter").unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.message(), "filter is required");
    }
}
