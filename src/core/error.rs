use thiserror::Error;

/// Failures reported by the model. None of them carries a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("malformed bracket table: {0}")]
    MalformedBrackets(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("projection overflowed in year {year}; inputs are too large to model")]
    NonFinite { year: u32 },
}

impl ModelError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBrackets(reason.into())
    }
}
