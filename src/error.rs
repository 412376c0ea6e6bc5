use chrono::NaiveDate;
use thiserror::Error;

pub const UNRECOGNIZED_QUERY_MESSAGE: &str = "Sorry, I'm not equipped to answer that question. Please try asking about revenue, opex, cash, or margins.";

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("{}", UNRECOGNIZED_QUERY_MESSAGE)]
    UnrecognizedQuery,

    /// Carries the user-facing explanation verbatim.
    #[error("{0}")]
    InsufficientData(String),

    #[error("No data found for {0}.")]
    NoData(String),

    #[error("Invalid FX rate {rate} for {currency} on {month}: must be a finite number greater than 0")]
    InvalidFxRate {
        month: NaiveDate,
        currency: String,
        rate: f64,
    },

    #[error("Cash balances must be in ascending month order: {current} follows {previous}")]
    UnorderedCashBalances {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CopilotError {
    /// True for errors that describe the answer to a query rather than a broken input.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CopilotError::UnrecognizedQuery
                | CopilotError::InsufficientData(_)
                | CopilotError::NoData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CopilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        let err = CopilotError::NoData("June 2025".to_string());
        assert_eq!(err.to_string(), "No data found for June 2025.");
        assert!(err.is_user_facing());

        let err = CopilotError::UnrecognizedQuery;
        assert!(err.to_string().starts_with("Sorry"));

        let err = CopilotError::InvalidConfig("burn window must be positive".to_string());
        assert!(!err.is_user_facing());
    }
}
