use crate::error::{CopilotError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const REVENUE_CATEGORY: &str = "Revenue";
pub const COGS_CATEGORY: &str = "COGS";
pub const OPEX_PREFIX: &str = "Opex";
pub const OPEX_SUBCATEGORY_PREFIX: &str = "Opex:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "First day of the month the amount belongs to, in YYYY-MM-DD format")]
    pub month: NaiveDate,

    #[schemars(description = "Reporting entity or subsidiary (e.g. 'ParentCo', 'EMEA')")]
    pub entity: String,

    #[schemars(
        description = "Account category. 'Revenue' and 'COGS' are top-level categories; anything prefixed 'Opex:' is an operating expense sub-category (e.g. 'Opex: Marketing')"
    )]
    pub account_category: String,

    #[schemars(description = "ISO currency code the amount is denominated in")]
    pub currency: String,

    #[schemars(description = "Amount in the transaction currency")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FxRate {
    pub month: NaiveDate,
    pub currency: String,

    #[schemars(description = "Multiplier converting one unit of the currency into the reporting currency. Must be greater than 0.")]
    pub rate_to_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashBalance {
    pub month: NaiveDate,

    #[schemars(description = "End-of-month cash position in the reporting currency")]
    pub cash_usd: f64,
}

/// The four tables a query runs against. Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatasetBundle {
    pub actuals: Vec<Transaction>,
    pub budget: Vec<Transaction>,
    pub cash: Vec<CashBalance>,
    pub fx: Vec<FxRate>,
}

impl DatasetBundle {
    pub fn new(
        actuals: Vec<Transaction>,
        budget: Vec<Transaction>,
        cash: Vec<CashBalance>,
        fx: Vec<FxRate>,
    ) -> Self {
        Self {
            actuals,
            budget,
            cash,
            fx,
        }
    }

    /// Rejects bundles a loader should never have produced: non-positive FX
    /// rates and cash balances out of month order.
    pub fn validate(&self) -> Result<()> {
        for rate in &self.fx {
            if !rate.rate_to_usd.is_finite() || rate.rate_to_usd <= 0.0 {
                return Err(CopilotError::InvalidFxRate {
                    month: rate.month,
                    currency: rate.currency.clone(),
                    rate: rate.rate_to_usd,
                });
            }
        }

        for pair in self.cash.windows(2) {
            if pair[1].month <= pair[0].month {
                return Err(CopilotError::UnorderedCashBalances {
                    previous: pair[0].month,
                    current: pair[1].month,
                });
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DatasetBundle)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = DatasetBundle::schema_as_json().unwrap();
        assert!(schema_json.contains("actuals"));
        assert!(schema_json.contains("rate_to_usd"));
        assert!(schema_json.contains("cash_usd"));
    }

    #[test]
    fn test_transaction_deserializes_iso_month() {
        let json = r#"{
            "month": "2025-06-01",
            "entity": "ParentCo",
            "account_category": "Opex: Marketing",
            "currency": "USD",
            "amount": 1250.5
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.month, month(2025, 6));
        assert_eq!(tx.account_category, "Opex: Marketing");
    }

    #[test]
    fn test_validate_rejects_non_positive_fx_rate() {
        let bundle = DatasetBundle {
            fx: vec![FxRate {
                month: month(2025, 1),
                currency: "EUR".to_string(),
                rate_to_usd: 0.0,
            }],
            ..Default::default()
        };

        let err = bundle.validate().unwrap_err();
        assert!(matches!(err, CopilotError::InvalidFxRate { .. }));
    }

    #[test]
    fn test_validate_rejects_unordered_cash() {
        let bundle = DatasetBundle {
            cash: vec![
                CashBalance {
                    month: month(2025, 2),
                    cash_usd: 100.0,
                },
                CashBalance {
                    month: month(2025, 1),
                    cash_usd: 90.0,
                },
            ],
            ..Default::default()
        };

        assert!(matches!(
            bundle.validate(),
            Err(CopilotError::UnorderedCashBalances { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_empty_bundle() {
        assert!(DatasetBundle::default().validate().is_ok());
    }
}
