use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClmError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClmError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::NoFieldsToUpdate => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to any caller. Internal failures are reduced to
    /// nothing here; the route layer substitutes its own generic text.
    pub fn public_message(&self) -> Option<String> {
        match self {
            Self::NotFound(what) => Some(format!("{what} not found")),
            Self::InvalidInput(msg) => Some(msg.clone()),
            Self::NoFieldsToUpdate => Some("No fields to update".to_string()),
            Self::Internal(_) => None,
        }
    }
}
