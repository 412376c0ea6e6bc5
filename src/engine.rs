use crate::chart::{ChartData, ChartKind};
use crate::config::CopilotConfig;
use crate::error::{CopilotError, Result};
use crate::intent::{Metric, RankDirection};
use crate::normalizer::{MonthlyFigures, NormalizedTransaction, PreparedDatasets};
use crate::schema::{OPEX_SUBCATEGORY_PREFIX, REVENUE_CATEGORY};
use crate::utils::{format_amount, format_money, format_percent, long_month, shift_months, short_month};
use chrono::NaiveDate;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest cash projection ever drawn, whatever the runway works out to.
pub const MAX_PROJECTION_MONTHS: i64 = 600;

/// Average burns below one cent a month count as break-even.
pub const MIN_MONTHLY_BURN: f64 = 0.01;

pub const NOT_ENOUGH_BURN_DATA: &str = "Not enough data to calculate cash runway or projection.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Answer {
    pub summary: String,
    pub chart: Option<ChartData>,
}

impl Answer {
    pub fn text(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            chart: None,
        }
    }

    pub fn with_chart(summary: impl Into<String>, chart: ChartData) -> Self {
        Self {
            summary: summary.into(),
            chart: Some(chart),
        }
    }

    pub fn has_chart(&self) -> bool {
        self.chart.is_some()
    }

    pub fn into_parts(self) -> (String, Option<ChartData>) {
        (self.summary, self.chart)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnSummary {
    /// Positive when the business is losing cash.
    pub average_burn: f64,
    pub latest_cash: f64,
    pub latest_cash_month: NaiveDate,
}

/// Computes reports over prepared tables for a fixed `today`.
pub struct MetricEngine<'a> {
    data: &'a PreparedDatasets<'a>,
    config: &'a CopilotConfig,
    today: NaiveDate,
}

impl<'a> MetricEngine<'a> {
    pub fn new(data: &'a PreparedDatasets<'a>, config: &'a CopilotConfig, today: NaiveDate) -> Self {
        Self {
            data,
            config,
            today,
        }
    }

    fn money(&self, value: f64) -> String {
        format_money(value, &self.config.reporting_currency)
    }

    fn currency_axis(&self, label: &str) -> String {
        format!("{} ({})", label, self.config.reporting_currency)
    }

    fn metric_text(&self, metric: Metric, value: f64) -> String {
        if metric.is_percentage() {
            format_percent(value)
        } else {
            self.money(value)
        }
    }

    fn metric_axis(&self, metric: Metric) -> String {
        if metric.is_percentage() {
            format!("{} (%)", metric.display_name())
        } else {
            self.currency_axis(metric.display_name())
        }
    }

    fn figures_for(&self, month: NaiveDate) -> Option<&'a MonthlyFigures> {
        self.data.monthly.get(&month).filter(|f| f.rows > 0)
    }

    /// The most recent `count` historical pivot rows, oldest first.
    fn trailing_months(&self, count: usize) -> Vec<(NaiveDate, &'a MonthlyFigures)> {
        let mut rows: Vec<(NaiveDate, &'a MonthlyFigures)> = self
            .data
            .historical_months(self.today)
            .rev()
            .take(count)
            .map(|(month, figures)| (*month, figures))
            .collect();
        rows.reverse();
        rows
    }

    /// Historical pivot rows within the `count` calendar months ending at
    /// the latest historical month, oldest first.
    fn calendar_window(&self, count: usize) -> Vec<(NaiveDate, &'a MonthlyFigures)> {
        let Some((last, _)) = self.data.historical_months(self.today).next_back() else {
            return Vec::new();
        };
        let start = shift_months(*last, 1 - count as i64);
        self.data
            .monthly
            .range(start..=*last)
            .map(|(month, figures)| (*month, figures))
            .collect()
    }

    pub fn revenue_vs_budget(&self, month: NaiveDate) -> Result<Answer> {
        let actual_rows: Vec<&NormalizedTransaction> = self.data.actuals_for(month).collect();
        let budget_rows: Vec<&NormalizedTransaction> = self.data.budget_for(month).collect();
        if actual_rows.is_empty() && budget_rows.is_empty() {
            return Err(CopilotError::NoData(long_month(month)));
        }

        let actual = sum_revenue(&actual_rows);
        let budget = sum_revenue(&budget_rows);
        let variance = actual - budget;

        let summary = [
            format!("**Revenue for {}:**", long_month(month)),
            format!("- Actual: {}", self.money(actual)),
            format!("- Budget: {}", self.money(budget)),
            format!("- Variance: {}", self.money(variance)),
        ]
        .join("\n");

        let chart = ChartData::new(
            ChartKind::Bar,
            format!("Revenue vs. Budget for {}", long_month(month)),
            vec!["Actual".to_string(), "Budget".to_string()],
        )
        .with_series("Revenue", vec![actual, budget])
        .with_y_label(self.currency_axis("Amount"));

        Ok(Answer::with_chart(summary, chart))
    }

    pub fn opex_breakdown(&self, month: NaiveDate) -> Result<Answer> {
        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for tx in self.data.actuals_for(month) {
            if let Some(category) = tx.account_category.strip_prefix(OPEX_SUBCATEGORY_PREFIX) {
                *by_category.entry(category.trim().to_string()).or_default() += tx.amount_usd;
            }
        }
        if by_category.is_empty() {
            return Err(CopilotError::NoData(format!("Opex in {}", long_month(month))));
        }

        let mut categories: Vec<(String, f64)> = by_category.into_iter().collect();
        categories.sort_by(|a, b| b.1.total_cmp(&a.1));
        let total: f64 = categories.iter().map(|(_, amount)| amount).sum();

        let mut lines = vec![format!(
            "**Opex Breakdown for {} (Total: {}):**",
            long_month(month),
            self.money(total)
        )];
        lines.extend(
            categories
                .iter()
                .map(|(category, amount)| format!("- {}: {}", category, self.money(*amount))),
        );

        let (labels, values): (Vec<String>, Vec<f64>) = categories.into_iter().unzip();
        let chart = ChartData::new(
            ChartKind::Pie,
            format!("Opex Breakdown for {}", long_month(month)),
            labels,
        )
        .with_series("Opex", values);

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    pub fn ebitda(&self, month: NaiveDate) -> Result<Answer> {
        let figures = self
            .figures_for(month)
            .ok_or_else(|| CopilotError::NoData(long_month(month)))?;
        let ebitda = Metric::Ebitda.value(figures);

        let summary = [
            format!("**EBITDA Calculation for {}:**", long_month(month)),
            format!("- Revenue: {}", self.money(figures.revenue)),
            format!("- COGS: -{}", self.money(figures.cogs)),
            format!("- Opex: -{}", self.money(figures.opex)),
            "-----------------------------".to_string(),
            format!("- EBITDA: **{}**", self.money(ebitda)),
        ]
        .join("\n");

        let chart = ChartData::new(
            ChartKind::Waterfall,
            format!("EBITDA Waterfall for {}", long_month(month)),
            ["Revenue", "COGS", "Opex", "EBITDA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .with_series("Amount", vec![figures.revenue, -figures.cogs, -figures.opex, ebitda])
        .with_y_label(self.currency_axis("Amount"));

        Ok(Answer::with_chart(summary, chart))
    }

    pub fn metric_trend(&self, metric: Metric, months: usize) -> Result<Answer> {
        let rows = self.trailing_months(months);
        if rows.is_empty() {
            return Err(CopilotError::InsufficientData(format!(
                "No historical data available for the {} trend.",
                metric.display_name()
            )));
        }

        let mut lines = vec![format!(
            "**{} Trend ({} Months):**",
            metric.display_name(),
            months
        )];
        let mut labels = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (month, figures) in rows {
            let value = metric.value(figures);
            lines.push(format!("- {}: {}", short_month(month), self.metric_text(metric, value)));
            labels.push(short_month(month));
            values.push(value);
        }

        let chart = ChartData::new(
            ChartKind::Line,
            format!("{} Trend (Last {} Months)", metric.display_name(), months),
            labels,
        )
        .with_series(metric.display_name(), values)
        .with_x_label("Month")
        .with_y_label(self.metric_axis(metric));

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    pub fn gross_margin_trend(&self, months: usize) -> Result<Answer> {
        self.metric_trend(Metric::GrossMargin, months)
    }

    pub fn revenue_variance_by_entity(&self, month: NaiveDate) -> Result<Answer> {
        // entity -> (actual, budget)
        let mut by_entity: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for tx in self.data.actuals_for(month).filter(|tx| is_revenue(tx)) {
            by_entity.entry(tx.entity.as_str()).or_default().0 += tx.amount_usd;
        }
        for tx in self.data.budget_for(month).filter(|tx| is_revenue(tx)) {
            by_entity.entry(tx.entity.as_str()).or_default().1 += tx.amount_usd;
        }
        if by_entity.is_empty() {
            return Err(CopilotError::NoData(format!("revenue in {}", long_month(month))));
        }

        let mut variances: Vec<(&str, f64, f64, f64)> = by_entity
            .into_iter()
            .map(|(entity, (actual, budget))| (entity, actual, budget, actual - budget))
            .collect();
        variances.sort_by(|a, b| a.3.total_cmp(&b.3));

        let mut lines = vec![format!(
            "**Entities That Missed Revenue Budget for {}:**",
            long_month(month)
        )];
        let missed: Vec<_> = variances.iter().filter(|v| v.3 < 0.0).collect();
        if missed.is_empty() {
            lines.push(
                "Congratulations! All entities met or exceeded their revenue budget.".to_string(),
            );
        } else {
            for (entity, actual, budget, variance) in missed {
                lines.push(format!(
                    "- {}: Missed by {} (Actual: ${}, Budget: ${})",
                    entity,
                    self.money(variance.abs()),
                    format_amount(*actual),
                    format_amount(*budget)
                ));
            }
        }

        let chart = ChartData::new(
            ChartKind::BarH,
            format!("Revenue Variance by Entity for {}", long_month(month)),
            variances.iter().map(|v| v.0.to_string()).collect(),
        )
        .with_series("Variance", variances.iter().map(|v| v.3).collect())
        .with_x_label(format!(
            "Variance ({}) - Actual vs. Budget",
            self.config.reporting_currency
        ));

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    pub fn cash_balance_trend(&self, months: usize) -> Result<Answer> {
        let cash = self.data.historical_cash(self.today);
        let start = cash.len().saturating_sub(months);
        let rows = &cash[start..];
        if rows.is_empty() {
            return Err(CopilotError::InsufficientData(
                "No historical cash balances available.".to_string(),
            ));
        }

        let mut lines = vec![format!("**Cash Balance Trend ({} Months):**", months)];
        lines.extend(
            rows.iter()
                .map(|row| format!("- {}: {}", short_month(row.month), self.money(row.cash_usd))),
        );

        let chart = ChartData::new(
            ChartKind::Line,
            format!("Cash Balance Trend (Last {} Months)", months),
            rows.iter().map(|row| short_month(row.month)).collect(),
        )
        .with_series("Cash Balance", rows.iter().map(|row| row.cash_usd).collect())
        .with_x_label("Month")
        .with_y_label(self.currency_axis("Cash Balance"));

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    pub fn metric_ranking(&self, metric: Metric, direction: RankDirection, n: usize) -> Result<Answer> {
        let mut ranked: Vec<(NaiveDate, f64)> = self
            .data
            .historical_months(self.today)
            .map(|(month, figures)| (*month, metric.value(figures)))
            .collect();
        match direction {
            RankDirection::Top => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
            RankDirection::Bottom => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
        }
        ranked.truncate(n);
        if ranked.is_empty() {
            return Err(CopilotError::InsufficientData(format!(
                "No historical data available to rank {}.",
                metric.display_name()
            )));
        }

        let mut lines = vec![format!(
            "**{} {} Month(s) for {}:**",
            direction.label(),
            n,
            metric.display_name()
        )];
        lines.extend(ranked.iter().map(|(month, value)| {
            format!("- {}: {}", long_month(*month), self.metric_text(metric, *value))
        }));

        // Bars always run smallest to largest.
        let mut bars = ranked;
        bars.sort_by(|a, b| a.1.total_cmp(&b.1));
        let chart = ChartData::new(
            ChartKind::BarH,
            format!("{} {} {} Months", direction.label(), n, metric.display_name()),
            bars.iter().map(|(month, _)| short_month(*month)).collect(),
        )
        .with_series(metric.display_name(), bars.iter().map(|(_, value)| *value).collect())
        .with_x_label(self.metric_axis(metric));

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    pub fn single_metric(&self, metric: Metric, month: NaiveDate) -> Result<Answer> {
        let figures = self
            .figures_for(month)
            .ok_or_else(|| CopilotError::NoData(long_month(month)))?;
        let value = metric.value(figures);
        let unit = if metric.is_percentage() {
            "%"
        } else {
            self.config.reporting_currency.as_str()
        };

        Ok(Answer::text(format!(
            "**{} for {}:** {} {}",
            metric.display_name(),
            long_month(month),
            format_amount(value),
            unit
        )))
    }

    /// Months without any actuals are skipped, not reported as zero.
    pub fn multi_month_metric(&self, metric: Metric, months: &[NaiveDate]) -> Result<Answer> {
        let results: Vec<(NaiveDate, f64)> = months
            .iter()
            .filter_map(|month| {
                let figures = self.figures_for(*month);
                if figures.is_none() {
                    debug!("Skipping {} in comparison: no actuals", short_month(*month));
                }
                figures.map(|f| (*month, metric.value(f)))
            })
            .collect();
        if results.is_empty() {
            return Err(CopilotError::NoData("the specified months".to_string()));
        }

        let display_name = if metric.is_percentage() {
            format!("{} %", metric.display_name())
        } else {
            metric.display_name().to_string()
        };

        let mut lines = vec![format!("**Comparison for {}:**", display_name)];
        lines.extend(results.iter().map(|(month, value)| {
            format!("- {}: {}", short_month(*month), self.metric_text(metric, *value))
        }));

        let chart = ChartData::new(
            ChartKind::Bar,
            format!("{} Comparison", display_name),
            results.iter().map(|(month, _)| short_month(*month)).collect(),
        )
        .with_series(metric.display_name(), results.iter().map(|(_, value)| *value).collect())
        .with_y_label(display_name);

        Ok(Answer::with_chart(lines.join("\n"), chart))
    }

    /// Average net burn over the trailing window plus the latest cash position.
    pub fn net_burn(&self) -> Result<BurnSummary> {
        let insufficient = || CopilotError::InsufficientData(NOT_ENOUGH_BURN_DATA.to_string());

        let latest = self
            .data
            .historical_cash(self.today)
            .last()
            .ok_or_else(insufficient)?;

        let window = self.config.burn_window_months;
        let totals: Vec<f64> = self
            .calendar_window(window)
            .into_iter()
            .map(|(_, figures)| figures.net_total)
            .collect();
        if totals.len() < window {
            debug!(
                "Only {} of {} months available for burn calculation",
                totals.len(),
                window
            );
            return Err(insufficient());
        }

        let mean = totals.iter().sum::<f64>() / totals.len() as f64;
        Ok(BurnSummary {
            average_burn: -mean,
            latest_cash: latest.cash_usd,
            latest_cash_month: latest.month,
        })
    }

    pub fn cash_runway_or_projection(&self) -> Result<Answer> {
        let burn = self.net_burn()?;
        info!(
            "Average monthly burn {:.2} against cash {:.2} at {}",
            burn.average_burn,
            burn.latest_cash,
            short_month(burn.latest_cash_month)
        );

        if burn.average_burn >= MIN_MONTHLY_BURN {
            Ok(self.cash_runway(&burn))
        } else {
            Ok(self.cash_projection(&burn))
        }
    }

    fn cash_runway(&self, burn: &BurnSummary) -> Answer {
        let runway_months = burn.latest_cash / burn.average_burn;
        let whole_months = (runway_months.trunc() as i64).min(MAX_PROJECTION_MONTHS);
        let runway_text = if runway_months > MAX_PROJECTION_MONTHS as f64 {
            format!("more than {} months", MAX_PROJECTION_MONTHS)
        } else {
            format!(
                "{:.1} months (until **{}**)",
                runway_months,
                long_month(shift_months(burn.latest_cash_month, whole_months))
            )
        };

        let summary = [
            "**Cash Runway Analysis:**".to_string(),
            format!("- Current Cash Balance: {}", self.money(burn.latest_cash)),
            format!(
                "- Avg. Monthly Net Burn ({}-mo): {}",
                self.config.burn_window_months,
                self.money(burn.average_burn)
            ),
            format!("- Estimated Runway: {}", runway_text),
        ]
        .join("\n");

        let points = whole_months
            .saturating_add(self.config.runway_margin_months as i64)
            .clamp(0, MAX_PROJECTION_MONTHS);
        let projection: Vec<(NaiveDate, f64)> = (0..points)
            .map(|i| {
                (
                    shift_months(burn.latest_cash_month, i),
                    burn.latest_cash - burn.average_burn * i as f64,
                )
            })
            .collect();

        let chart = self
            .projection_chart("Cash Runway Projection", "Projected Runway", burn, &projection)
            .with_baseline(0.0);

        Answer::with_chart(summary, chart)
    }

    fn cash_projection(&self, burn: &BurnSummary) -> Answer {
        let gain = (-burn.average_burn).max(0.0);
        let horizon = self.config.positive_projection_months;

        let summary = [
            "**Cash Flow Positive Analysis:**".to_string(),
            format!("- Current Cash Balance: {}", self.money(burn.latest_cash)),
            format!(
                "- Avg. Monthly Net Gain ({}-mo): {}",
                self.config.burn_window_months,
                self.money(gain)
            ),
            "- Your business is currently cash flow positive.".to_string(),
        ]
        .join("\n");

        let projection: Vec<(NaiveDate, f64)> = (0..=horizon as i64)
            .map(|i| {
                (
                    shift_months(burn.latest_cash_month, i),
                    burn.latest_cash + gain * i as f64,
                )
            })
            .collect();

        let chart = self.projection_chart(
            &format!("Cash Growth Projection ({} Months)", horizon),
            "Projected Growth",
            burn,
            &projection,
        );

        Answer::with_chart(summary, chart)
    }

    /// Historical cash and a projection sharing one month axis.
    fn projection_chart(
        &self,
        title: &str,
        projection_name: &str,
        burn: &BurnSummary,
        projection: &[(NaiveDate, f64)],
    ) -> ChartData {
        let mut axis: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for row in self
            .data
            .cash
            .iter()
            .filter(|row| row.month <= burn.latest_cash_month)
        {
            axis.entry(row.month).or_default().0 = Some(row.cash_usd);
        }
        for (month, value) in projection {
            axis.entry(*month).or_default().1 = Some(*value);
        }

        let labels = axis.keys().map(|month| short_month(*month)).collect();
        let (historical, projected): (Vec<Option<f64>>, Vec<Option<f64>>) =
            axis.into_values().unzip();

        ChartData::new(ChartKind::Line, title, labels)
            .with_sparse_series("Historical Cash", historical)
            .with_sparse_series(projection_name, projected)
            .with_x_label("Month")
            .with_y_label(self.currency_axis("Cash Balance"))
    }
}

fn is_revenue(tx: &NormalizedTransaction) -> bool {
    tx.account_category == REVENUE_CATEGORY
}

fn sum_revenue(rows: &[&NormalizedTransaction]) -> f64 {
    rows.iter()
        .filter(|tx| is_revenue(tx))
        .map(|tx| tx.amount_usd)
        .sum()
}
