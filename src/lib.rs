//! # Financial Copilot
//!
//! A library that answers natural-language questions about a company's
//! monthly financials ("What was June 2025 revenue vs budget?") with a short
//! Markdown summary and, where it helps, a renderer-agnostic chart.
//!
//! ## Core Concepts
//!
//! - **Datasets**: monthly actuals, budget, end-of-month cash and FX rates
//!   ([`DatasetBundle`]), loaded once and never mutated
//! - **Normalization**: every amount is converted to the reporting currency
//!   with the rate of its month; a missing rate counts as 1.0
//! - **Intents**: a query is classified into exactly one [`Intent`] by an
//!   ordered list of keyword rules
//! - **Metric Engine**: pure calculations (Revenue, Opex, EBITDA, Gross Margin,
//!   burn and runway) over the normalized tables for an explicit `today`
//! - **Answers**: every query yields an [`Answer`]; questions that cannot be
//!   answered produce an explanatory text without a chart instead of an error
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_copilot::*;
//! use chrono::NaiveDate;
//!
//! let june = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let bundle = DatasetBundle::new(
//!     vec![Transaction {
//!         month: june,
//!         entity: "ParentCo".to_string(),
//!         account_category: "Revenue".to_string(),
//!         currency: "USD".to_string(),
//!         amount: 100_000.0,
//!     }],
//!     vec![],
//!     vec![],
//!     vec![],
//! );
//!
//! let copilot = FinancialCopilot::new(bundle).unwrap();
//! let answer = copilot.answer("What was revenue in June 2025?");
//! println!("{}", answer.summary);
//! ```

pub mod chart;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod normalizer;
pub mod planner;
pub mod render;
pub mod schema;
pub mod utils;

pub use chart::{ChartData, ChartKind, ChartSeries};
pub use classifier::{classify, IntentClassifier};
pub use config::CopilotConfig;
pub use engine::{Answer, BurnSummary, MetricEngine};
pub use error::{CopilotError, Result};
pub use intent::{Intent, Metric, RankDirection};
pub use normalizer::{normalize, KnownMonths, MonthlyFigures, NormalizedTransaction, PreparedDatasets};
pub use render::{MarkdownRenderer, Renderer, Transcript};
pub use schema::*;

use chrono::{Local, NaiveDate};
use log::{debug, info};

/// Holds a validated dataset bundle and answers queries against it.
#[derive(Debug, Clone)]
pub struct FinancialCopilot {
    datasets: DatasetBundle,
    config: CopilotConfig,
    known_months: KnownMonths,
}

impl FinancialCopilot {
    pub fn new(datasets: DatasetBundle) -> Result<Self> {
        Self::with_config(datasets, CopilotConfig::default())
    }

    pub fn with_config(datasets: DatasetBundle, config: CopilotConfig) -> Result<Self> {
        config.validate()?;
        datasets.validate()?;

        info!(
            "Loaded {} actuals, {} budget, {} cash and {} FX rows",
            datasets.actuals.len(),
            datasets.budget.len(),
            datasets.cash.len(),
            datasets.fx.len()
        );

        let known_months = KnownMonths::from_transactions(&datasets.actuals);
        Ok(Self {
            datasets,
            config,
            known_months,
        })
    }

    pub fn datasets(&self) -> &DatasetBundle {
        &self.datasets
    }

    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    /// Answers `query` using the local calendar date, read once.
    pub fn answer(&self, query: &str) -> Answer {
        let today = Local::now().date_naive();
        self.answer_at(query, today)
    }

    pub fn answer_at(&self, query: &str, today: NaiveDate) -> Answer {
        let intent = self.classify_at(query, today);
        info!("Classified query as '{}'", intent.name());

        let prepared = PreparedDatasets::prepare(&self.datasets);
        let engine = MetricEngine::new(&prepared, &self.config, today);
        let answer = planner::plan(&intent, &engine);

        debug!(
            "Answer for '{}' has {} summary chars, chart: {}",
            intent.name(),
            answer.summary.len(),
            answer.has_chart()
        );
        answer
    }

    pub fn classify_at(&self, query: &str, today: NaiveDate) -> Intent {
        IntentClassifier::new(&self.known_months, today)
            .with_default_trend_months(self.config.default_trend_months)
            .classify(query)
    }

    /// Answers and records the exchange in `transcript`.
    pub fn ask(&self, transcript: &mut Transcript, query: &str) -> Answer {
        let answer = self.answer(query);
        transcript.record(query, answer.clone());
        answer
    }
}

/// One-shot entry point with the default configuration.
///
/// A bundle that fails validation is still answered; validation only guards
/// [`FinancialCopilot::new`].
pub fn answer(query: &str, datasets: &DatasetBundle) -> Answer {
    answer_at(query, datasets, Local::now().date_naive())
}

pub fn answer_at(query: &str, datasets: &DatasetBundle, today: NaiveDate) -> Answer {
    let config = CopilotConfig::default();
    let known_months = KnownMonths::from_transactions(&datasets.actuals);
    let intent = classify(query, &known_months, today);

    let prepared = PreparedDatasets::prepare(datasets);
    let engine = MetricEngine::new(&prepared, &config, today);
    planner::plan(&intent, &engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn revenue(month: NaiveDate, amount: f64) -> Transaction {
        Transaction {
            month,
            entity: "ParentCo".to_string(),
            account_category: "Revenue".to_string(),
            currency: "USD".to_string(),
            amount,
        }
    }

    fn bundle() -> DatasetBundle {
        DatasetBundle::new(
            vec![revenue(month(2025, 6), 100_000.0)],
            vec![revenue(month(2025, 6), 90_000.0)],
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_end_to_end_revenue_vs_budget() {
        let copilot = FinancialCopilot::new(bundle()).unwrap();
        let answer = copilot.answer_at(
            "What was June 2025 revenue vs budget in USD?",
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
        );

        assert!(answer.summary.contains("Actual: $100,000.00"));
        assert!(answer.summary.contains("Budget: $90,000.00"));
        assert!(answer.summary.contains("Variance: $10,000.00"));
        assert!(answer.has_chart());
    }

    #[test]
    fn test_free_function_matches_copilot() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let query = "What was revenue in June 2025?";
        let copilot = FinancialCopilot::new(bundle()).unwrap();

        assert_eq!(answer_at(query, &bundle(), today), copilot.answer_at(query, today));
    }

    #[test]
    fn test_invalid_bundle_is_rejected() {
        let mut invalid = bundle();
        invalid.fx.push(FxRate {
            month: month(2025, 6),
            currency: "EUR".to_string(),
            rate_to_usd: -1.0,
        });

        assert!(matches!(
            FinancialCopilot::new(invalid),
            Err(CopilotError::InvalidFxRate { .. })
        ));
    }

    #[test]
    fn test_ask_records_transcript() {
        let copilot = FinancialCopilot::new(bundle()).unwrap();
        let mut transcript = Transcript::new();

        let answer = copilot.ask(&mut transcript, "What is the capital of France?");
        assert!(answer.summary.contains("Sorry"));
        assert!(answer.chart.is_none());
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.exchanges()[0].query, "What is the capital of France?");
    }
}
