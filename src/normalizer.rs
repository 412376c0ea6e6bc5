use crate::schema::{
    CashBalance, DatasetBundle, FxRate, Transaction, COGS_CATEGORY, OPEX_PREFIX, REVENUE_CATEGORY,
};
use crate::utils::{first_of_month, is_historical};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A transaction converted into the reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub month: NaiveDate,
    pub entity: String,
    pub account_category: String,
    pub currency: String,
    pub amount: f64,
    pub rate_to_usd: f64,
    pub amount_usd: f64,
}

/// Converts every transaction with the FX rate of its (month, currency).
/// A missing rate falls back to 1.0.
pub fn normalize(transactions: &[Transaction], fx_rates: &[FxRate]) -> Vec<NormalizedTransaction> {
    let mut rates: HashMap<(NaiveDate, &str), f64> = HashMap::new();
    for fx in fx_rates {
        rates
            .entry((first_of_month(fx.month), fx.currency.as_str()))
            .or_insert(fx.rate_to_usd);
    }

    transactions
        .iter()
        .map(|tx| {
            let month = first_of_month(tx.month);
            let rate = match rates.get(&(month, tx.currency.as_str())) {
                Some(rate) => *rate,
                None => {
                    debug!(
                        "No FX rate for {} in {}, assuming 1.0",
                        tx.currency,
                        month.format("%Y-%m")
                    );
                    1.0
                }
            };

            NormalizedTransaction {
                month,
                entity: tx.entity.clone(),
                account_category: tx.account_category.clone(),
                currency: tx.currency.clone(),
                amount: tx.amount,
                rate_to_usd: rate,
                amount_usd: tx.amount * rate,
            }
        })
        .collect()
}

/// Per-month totals of the actuals, in the reporting currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    pub revenue: f64,
    pub cogs: f64,
    pub opex: f64,
    /// Sum of every amount in the month regardless of category.
    pub net_total: f64,
    pub rows: usize,
}

impl MonthlyFigures {
    pub fn add(&mut self, tx: &NormalizedTransaction) {
        let category = tx.account_category.as_str();
        if category == REVENUE_CATEGORY {
            self.revenue += tx.amount_usd;
        } else if category == COGS_CATEGORY {
            self.cogs += tx.amount_usd;
        } else if category.starts_with(OPEX_PREFIX) {
            self.opex += tx.amount_usd;
        }
        self.net_total += tx.amount_usd;
        self.rows += 1;
    }

    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a NormalizedTransaction>,
    ) -> Self {
        let mut figures = Self::default();
        for tx in transactions {
            figures.add(tx);
        }
        figures
    }
}

pub fn monthly_pivot(transactions: &[NormalizedTransaction]) -> BTreeMap<NaiveDate, MonthlyFigures> {
    let mut pivot: BTreeMap<NaiveDate, MonthlyFigures> = BTreeMap::new();
    for tx in transactions {
        pivot.entry(tx.month).or_default().add(tx);
    }
    pivot
}

/// Latest year seen in the actuals for each calendar month (1-12).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownMonths {
    latest_year: BTreeMap<u32, i32>,
}

impl KnownMonths {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut latest_year: BTreeMap<u32, i32> = BTreeMap::new();
        for tx in transactions {
            let year = latest_year.entry(tx.month.month()).or_insert(tx.month.year());
            if tx.month.year() > *year {
                *year = tx.month.year();
            }
        }
        Self { latest_year }
    }

    pub fn latest_year(&self, month_number: u32) -> Option<i32> {
        self.latest_year.get(&month_number).copied()
    }
}

/// The bundle after conversion, built once per query.
#[derive(Debug, Clone)]
pub struct PreparedDatasets<'a> {
    pub actuals: Vec<NormalizedTransaction>,
    pub budget: Vec<NormalizedTransaction>,
    pub cash: &'a [CashBalance],
    pub monthly: BTreeMap<NaiveDate, MonthlyFigures>,
}

impl<'a> PreparedDatasets<'a> {
    pub fn prepare(bundle: &'a DatasetBundle) -> Self {
        let actuals = normalize(&bundle.actuals, &bundle.fx);
        let budget = normalize(&bundle.budget, &bundle.fx);
        let monthly = monthly_pivot(&actuals);

        debug!(
            "Prepared {} actuals rows across {} months and {} budget rows",
            actuals.len(),
            monthly.len(),
            budget.len()
        );

        Self {
            actuals,
            budget,
            cash: &bundle.cash,
            monthly,
        }
    }

    pub fn actuals_for(&self, month: NaiveDate) -> impl Iterator<Item = &NormalizedTransaction> {
        self.actuals.iter().filter(move |tx| tx.month == month)
    }

    pub fn budget_for(&self, month: NaiveDate) -> impl Iterator<Item = &NormalizedTransaction> {
        self.budget.iter().filter(move |tx| tx.month == month)
    }

    /// Pivot rows whose month is on or before `today`, oldest first.
    pub fn historical_months(
        &self,
        today: NaiveDate,
    ) -> impl DoubleEndedIterator<Item = (&NaiveDate, &MonthlyFigures)> {
        self.monthly.range(..=today)
    }

    pub fn historical_cash(&self, today: NaiveDate) -> &'a [CashBalance] {
        let end = self.cash.partition_point(|row| is_historical(row.month, today));
        &self.cash[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn tx(month: NaiveDate, category: &str, currency: &str, amount: f64) -> Transaction {
        Transaction {
            month,
            entity: "ParentCo".to_string(),
            account_category: category.to_string(),
            currency: currency.to_string(),
            amount,
        }
    }

    #[test]
    fn test_usd_amount_is_unchanged_without_rate() {
        let input = vec![tx(month(2025, 6), "Revenue", "USD", 12_345.67)];
        let normalized = normalize(&input, &[]);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].rate_to_usd, 1.0);
        assert_eq!(normalized[0].amount_usd, normalized[0].amount);
    }

    #[test]
    fn test_rate_matched_on_month_and_currency() {
        let fx = vec![
            FxRate {
                month: month(2025, 6),
                currency: "EUR".to_string(),
                rate_to_usd: 1.5,
            },
            FxRate {
                month: month(2025, 7),
                currency: "EUR".to_string(),
                rate_to_usd: 2.0,
            },
        ];
        let input = vec![
            tx(month(2025, 6), "Revenue", "EUR", 100.0),
            tx(month(2025, 7), "Revenue", "EUR", 100.0),
            tx(month(2025, 8), "Revenue", "EUR", 100.0),
        ];

        let normalized = normalize(&input, &fx);
        assert!((normalized[0].amount_usd - 150.0).abs() < 1e-9);
        assert!((normalized[1].amount_usd - 200.0).abs() < 1e-9);
        assert!((normalized[2].amount_usd - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_does_not_touch_input() {
        let input = vec![tx(month(2025, 6), "Revenue", "EUR", 100.0)];
        let fx = vec![FxRate {
            month: month(2025, 6),
            currency: "EUR".to_string(),
            rate_to_usd: 1.1,
        }];
        let before = input.clone();
        let _ = normalize(&input, &fx);
        assert_eq!(input, before);
    }

    #[test]
    fn test_monthly_pivot_categories() {
        let input = vec![
            tx(month(2025, 6), "Revenue", "USD", 1000.0),
            tx(month(2025, 6), "COGS", "USD", 400.0),
            tx(month(2025, 6), "Opex: Marketing", "USD", 150.0),
            tx(month(2025, 6), "Opex: Salaries", "USD", 200.0),
            tx(month(2025, 6), "Other", "USD", 10.0),
            tx(month(2025, 7), "Revenue", "USD", 2000.0),
        ];

        let pivot = monthly_pivot(&normalize(&input, &[]));
        let june = pivot[&month(2025, 6)];
        assert_eq!(june.revenue, 1000.0);
        assert_eq!(june.cogs, 400.0);
        assert_eq!(june.opex, 350.0);
        assert_eq!(june.net_total, 1760.0);
        assert_eq!(june.rows, 5);
        assert_eq!(pivot[&month(2025, 7)].revenue, 2000.0);
    }

    #[test]
    fn test_opex_prefix_is_case_sensitive() {
        let input = vec![tx(month(2025, 6), "opex: travel", "USD", 99.0)];
        let pivot = monthly_pivot(&normalize(&input, &[]));
        assert_eq!(pivot[&month(2025, 6)].opex, 0.0);
    }

    #[test]
    fn test_known_months_keep_latest_year() {
        let input = vec![
            tx(month(2024, 6), "Revenue", "USD", 1.0),
            tx(month(2025, 6), "Revenue", "USD", 1.0),
            tx(month(2023, 6), "Revenue", "USD", 1.0),
            tx(month(2024, 12), "Revenue", "USD", 1.0),
        ];

        let known = KnownMonths::from_transactions(&input);
        assert_eq!(known.latest_year(6), Some(2025));
        assert_eq!(known.latest_year(12), Some(2024));
        assert_eq!(known.latest_year(3), None);
    }

    #[test]
    fn test_historical_cash_stops_at_today() {
        let bundle = DatasetBundle {
            cash: vec![
                CashBalance {
                    month: month(2025, 8),
                    cash_usd: 1.0,
                },
                CashBalance {
                    month: month(2025, 9),
                    cash_usd: 2.0,
                },
                CashBalance {
                    month: month(2025, 10),
                    cash_usd: 3.0,
                },
            ],
            ..Default::default()
        };

        let prepared = PreparedDatasets::prepare(&bundle);
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let cash = prepared.historical_cash(today);
        assert_eq!(cash.len(), 2);
        assert_eq!(cash[1].cash_usd, 2.0);
    }
}
