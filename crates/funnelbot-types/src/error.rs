use thiserror::Error;

/// Errors from rendering a response template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("no template registered for '{0}'")]
    MissingTemplate(String),

    #[error("template '{template}' has unresolved placeholder '{{{placeholder}}}'")]
    UnresolvedPlaceholder { template: String, placeholder: String },

    #[error("template '{template}' is malformed: {reason}")]
    Malformed { template: String, reason: String },
}

/// Errors from a credential issuer.
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("issuer unavailable: {0}")]
    Unavailable(String),

    #[error("issuer rejected the request: {0}")]
    Rejected(String),

    #[error("could not generate a unique username after {0} attempts")]
    Exhausted(u32),
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,

    #[error("transport rejected message: {0}")]
    Rejected(String),

    #[error("send failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Errors from the contact store.
#[derive(Debug, Error)]
pub enum ContactStoreError {
    #[error("contact not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while handling one inbound message.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Issuer(#[from] IssuerError),

    #[error("unknown plan '{0}'")]
    UnknownPlan(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_placeholder_message_shows_braces() {
        let err = ComposeError::UnresolvedPlaceholder {
            template: "trial_credentials".to_string(),
            placeholder: "name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template 'trial_credentials' has unresolved placeholder '{name}'"
        );
    }

    #[test]
    fn dispatch_error_wraps_sources() {
        let err: DispatchError = IssuerError::Exhausted(5).into();
        assert!(matches!(err, DispatchError::Issuer(_)));
        assert!(err.to_string().contains("5 attempts"));
    }
}
