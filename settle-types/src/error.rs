//! Error types for the settlement engine.

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Errors from outbound provider calls.
///
/// The engine never retries these on its own schedule; retry responsibility
/// sits with the interactive caller or with the provider's webhook mechanism.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing or rejected credentials. Not retryable; surfaced to the owner.
    #[error("Invalid provider credentials: {0}")]
    Credentials(String),

    /// Upstream responded non-2xx.
    #[error("Provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Network-level failure, mapped to a 502-equivalent code.
    #[error("Provider unreachable: {0}")]
    Network(String),

    /// Malformed or unexpected provider response body.
    #[error("Unexpected provider response: {0}")]
    Malformed(String),

    /// Operation the adapter does not support.
    #[error("Operation not supported by this provider: {0}")]
    Unsupported(&'static str),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Webhook signature mismatch: 400, dropped, never retried.
    #[error("Signature verification failed: {0}")]
    Signature(String),

    /// Upstream provider failure, surfaced as 502 so the business-level
    /// caller can decide whether to retry.
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::BadRequest(e),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Credentials(msg) => {
                AppError::BadRequest(format!("Invalid credentials: {}", msg))
            }
            ProviderError::Upstream { status, message } => AppError::Provider { status, message },
            ProviderError::Network(msg) => AppError::Provider {
                status: 502,
                message: msg,
            },
            ProviderError::Malformed(msg) => AppError::Provider {
                status: 502,
                message: msg,
            },
            ProviderError::Unsupported(what) => AppError::Internal(what.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_maps_to_502() {
        let err: AppError = ProviderError::Network("connection refused".into()).into();
        assert!(matches!(err, AppError::Provider { status: 502, .. }));
    }

    #[test]
    fn test_credential_error_surfaces_to_owner() {
        let err: AppError = ProviderError::Credentials("bad key".into()).into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
