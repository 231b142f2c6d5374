use rust_decimal::Decimal;
use thiserror::Error;
use tracing::error;

/// Coarse classification of a [`ComputeError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OverAllocation,
    InvalidRecipient,
    InvalidAmount,
    InvalidEventData,
    ConcurrencyTimeout,
    NotFound,
    Storage,
}

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The distributions of an income add up to more than the income itself.
    #[error("Distributions total {distributed} exceeds income amount {income_amount}")]
    OverAllocation {
        income_amount: Decimal,
        distributed: Decimal,
    },

    /// A distribution names a recipient that is unknown, inactive or malformed.
    #[error("Invalid recipient at {field}: {reason}")]
    InvalidRecipient { field: String, reason: String },

    /// A user supplied amount or currency that cannot be accepted.
    #[error("Invalid amount at {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// Malformed data reached the settlement engine. Indicates a validation bug upstream.
    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    /// The fund ledger could not be locked, or the locked mutation ran past its deadline.
    #[error("Timed out after {waited_ms} ms on the ledger of fund {fund_id}")]
    ConcurrencyTimeout { fund_id: i32, waited_ms: u128 },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
}

impl ComputeError {
    /// Builds an [`ComputeError::InvalidEventData`] and logs it, since it always
    /// points at a programming error rather than bad user input.
    pub fn invalid_event_data(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(%message, "Settlement engine received malformed event data");
        ComputeError::InvalidEventData(message)
    }

    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ComputeError::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_recipient(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ComputeError::InvalidRecipient {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ComputeError::Database(_) => ErrorKind::Storage,
            ComputeError::OverAllocation { .. } => ErrorKind::OverAllocation,
            ComputeError::InvalidRecipient { .. } => ErrorKind::InvalidRecipient,
            ComputeError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            ComputeError::InvalidEventData(_) => ErrorKind::InvalidEventData,
            ComputeError::ConcurrencyTimeout { .. } => ErrorKind::ConcurrencyTimeout,
            ComputeError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Only lock contention is transient. Everything else needs a data or input fix.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyTimeout
    }

    /// The request field a validation error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ComputeError::OverAllocation { .. } => Some("distributions"),
            ComputeError::InvalidRecipient { field, .. } | ComputeError::InvalidAmount { field, .. } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_retryable() {
        let timeout = ComputeError::ConcurrencyTimeout {
            fund_id: 1,
            waited_ms: 50,
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.kind(), ErrorKind::ConcurrencyTimeout);

        let over = ComputeError::OverAllocation {
            income_amount: Decimal::new(10000, 2),
            distributed: Decimal::new(10001, 2),
        };
        assert!(!over.is_retryable());
        assert_eq!(over.field(), Some("distributions"));

        let bad_data = ComputeError::invalid_event_data("negative amount");
        assert!(!bad_data.is_retryable());
        assert_eq!(bad_data.field(), None);
    }

    #[test]
    fn test_validation_errors_carry_field_path() {
        let err = ComputeError::invalid_recipient("distributions[2].recipient_id", "member 9 is inactive");
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
        assert_eq!(err.field(), Some("distributions[2].recipient_id"));
        assert_eq!(
            err.to_string(),
            "Invalid recipient at distributions[2].recipient_id: member 9 is inactive"
        );
    }
}
