use thiserror::Error;

/// Failures that abort an indexing or extraction run.
///
/// Functions return `anyhow::Result`; wrap one of these variants when the
/// caller needs to tell input problems from collaborator or model failures.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("lookup failed for '{term}': {reason}")]
    Lookup { term: String, reason: String },

    #[error("model error: {0}")]
    Model(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl TermError {
    pub fn invalid_input(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(TermError::InvalidInput(message.into()))
    }

    pub fn model(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(TermError::Model(message.into()))
    }

    pub fn storage(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(TermError::Storage(message.into()))
    }

    pub fn lookup(term: &str, reason: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(TermError::Lookup {
            term: term.to_string(),
            reason: reason.into(),
        })
    }
}

/// Returns the `TermError` carried by an `anyhow::Error`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&TermError> {
    err.downcast_ref::<TermError>()
}
