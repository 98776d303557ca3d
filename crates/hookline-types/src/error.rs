use thiserror::Error;

/// Errors from repository operations (used by trait definitions in hookline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to secret resolution (env vars, OAuth tokens).
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("environment variable '{0}' could not be decrypted")]
    Decryption(String),

    #[error("no access token for provider '{0}'")]
    TokenUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from the Airtable payloads API.
#[derive(Debug, Error)]
pub enum AirtableError {
    #[error("airtable API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid payloads response: {0}")]
    Decode(String),
}

/// Errors raised while preparing or running a workflow execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("workflow serialization failed: {0}")]
    Serialize(String),

    #[error("execution engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_secret_error_display() {
        let err = SecretError::Decryption("API_KEY".to_string());
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_execution_error_wraps_secret_error() {
        let err: ExecutionError = SecretError::TokenUnavailable("airtable".to_string()).into();
        assert!(err.to_string().contains("airtable"));
    }
}
