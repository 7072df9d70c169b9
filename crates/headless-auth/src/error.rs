//! Error types for headless authentication operations

/// Errors from the PKCE flow and the credential store.
///
/// Callers branch on the variant: configuration problems and OAuth errors
/// reported by the service are final, transport failures may be retried by
/// the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required input missing (client id, redirect URI, code verifier)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token endpoint answered with an OAuth `error` payload
    #[error("token exchange failed: {0}")]
    Authentication(String),

    /// Network failure, timeout, non-2xx status or a non-JSON body
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// A success response lacking a required field such as `access_token`.
    /// Transport-level, never an authentication failure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Credential file matches neither known shape, or fails to decode
    #[error("invalid credentials file: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether the failure happened on the wire rather than in the caller's
    /// input or the service's verdict.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::MalformedResponse(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_carries_service_description() {
        let err = Error::Authentication("bad code".into());
        assert_eq!(err.to_string(), "token exchange failed: bad code");
        assert!(!err.is_transport());
    }

    #[test]
    fn malformed_response_counts_as_transport() {
        assert!(Error::MalformedResponse("missing access_token".into()).is_transport());
        assert!(Error::Transport("connection refused".into()).is_transport());
        assert!(!Error::Format("neither shape".into()).is_transport());
        assert!(!Error::Configuration("no verifier".into()).is_transport());
    }
}
