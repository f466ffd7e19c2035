use thiserror::Error;
use tonic::Status;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("laptop {0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("request is canceled")]
    Canceled,

    #[error("deadline is exceeded")]
    DeadlineExceeded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CatalogError::InvalidArgument(message.into())
    }

    /// Whether the request was aborted by the caller or by its deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CatalogError::Canceled | CatalogError::DeadlineExceeded)
    }
}

/// The one place catalog failures become gRPC statuses.
///
/// Every failure is logged here and nowhere else, so handlers just `?` or
/// `map_err(Status::from)`.
impl From<CatalogError> for Status {
    fn from(err: CatalogError) -> Self {
        match &err {
            CatalogError::Io(_) | CatalogError::Internal(_) => {
                error!(error = %err, "catalog request failed");
                Status::internal(err.to_string())
            }
            CatalogError::InvalidArgument(_) => {
                warn!(error = %err, "rejected invalid argument");
                Status::invalid_argument(err.to_string())
            }
            CatalogError::AlreadyExists(_) => {
                warn!(error = %err, "rejected duplicate record");
                Status::already_exists(err.to_string())
            }
            CatalogError::NotFound(_) => {
                warn!(error = %err, "referenced laptop does not exist");
                Status::not_found(err.to_string())
            }
            CatalogError::Canceled | CatalogError::DeadlineExceeded => {
                warn!(error = %err, "request aborted");
                Status::deadline_exceeded(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Internal(format!("JSON serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_codes() {
        let cases = [
            (CatalogError::AlreadyExists("a".into()), Code::AlreadyExists),
            (CatalogError::NotFound("a".into()), Code::NotFound),
            (CatalogError::invalid("bad id"), Code::InvalidArgument),
            (CatalogError::Canceled, Code::DeadlineExceeded),
            (CatalogError::DeadlineExceeded, Code::DeadlineExceeded),
            (CatalogError::Internal("boom".into()), Code::Internal),
            (
                CatalogError::Io(std::io::Error::other("disk full")),
                Code::Internal,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn test_cancellation_messages() {
        assert_eq!(
            Status::from(CatalogError::Canceled).message(),
            "request is canceled"
        );
        assert_eq!(
            Status::from(CatalogError::DeadlineExceeded).message(),
            "deadline is exceeded"
        );
        assert!(CatalogError::Canceled.is_cancellation());
        assert!(!CatalogError::NotFound("x".into()).is_cancellation());
    }
}
