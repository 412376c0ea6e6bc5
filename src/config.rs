use crate::error::{CopilotError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CopilotConfig {
    #[schemars(description = "Currency label appended to every monetary figure")]
    pub reporting_currency: String,

    #[schemars(description = "Window used by trend questions that do not say 'last N months'")]
    pub default_trend_months: usize,

    #[schemars(description = "Number of trailing months averaged to compute the net burn")]
    pub burn_window_months: usize,

    #[schemars(description = "Extra months drawn past the depletion point on a runway projection")]
    pub runway_margin_months: u32,

    #[schemars(description = "Months projected forward when the business is cash flow positive")]
    pub positive_projection_months: u32,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            reporting_currency: "USD".to_string(),
            default_trend_months: 6,
            burn_window_months: 3,
            runway_margin_months: 2,
            positive_projection_months: 12,
        }
    }
}

impl CopilotConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reporting_currency.trim().is_empty() {
            return Err(CopilotError::InvalidConfig(
                "reporting_currency must not be empty".to_string(),
            ));
        }
        if self.burn_window_months == 0 {
            return Err(CopilotError::InvalidConfig(
                "burn_window_months must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = CopilotConfig::from_json_str(r#"{ "default_trend_months": 12 }"#).unwrap();
        assert_eq!(config.default_trend_months, 12);
        assert_eq!(config.reporting_currency, "USD");
        assert_eq!(config.burn_window_months, 3);
    }

    #[test]
    fn test_zero_burn_window_is_rejected() {
        let result = CopilotConfig::from_json_str(r#"{ "burn_window_months": 0 }"#);
        assert!(matches!(result, Err(CopilotError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json_is_a_serialization_error() {
        let result = CopilotConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(CopilotError::SerializationError(_))));
    }
}
