use crate::normalizer::MonthlyFigures;
use crate::utils::gross_margin_pct;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Metric {
    #[schemars(description = "Sum of the 'Revenue' category")]
    Revenue,

    #[schemars(description = "Sum of every category starting with 'Opex'")]
    Opex,

    #[schemars(description = "Revenue - COGS - Opex")]
    Ebitda,

    #[schemars(description = "(Revenue - COGS) / Revenue as a percentage, 0 when there is no revenue")]
    GrossMargin,
}

pub type Aggregator = fn(&MonthlyFigures) -> f64;

fn revenue(figures: &MonthlyFigures) -> f64 {
    figures.revenue
}

fn opex(figures: &MonthlyFigures) -> f64 {
    figures.opex
}

fn ebitda(figures: &MonthlyFigures) -> f64 {
    figures.revenue - figures.cogs - figures.opex
}

fn gross_margin(figures: &MonthlyFigures) -> f64 {
    gross_margin_pct(figures.revenue, figures.cogs)
}

impl Metric {
    /// Order in which keywords are tried when a query names more than one metric.
    pub const ALL: [Metric; 4] = [
        Metric::Revenue,
        Metric::Opex,
        Metric::Ebitda,
        Metric::GrossMargin,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Opex => "opex",
            Metric::Ebitda => "ebitda",
            Metric::GrossMargin => "gross margin",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Opex => "Opex",
            Metric::Ebitda => "EBITDA",
            Metric::GrossMargin => "Gross Margin",
        }
    }

    pub fn aggregator(self) -> Aggregator {
        match self {
            Metric::Revenue => revenue,
            Metric::Opex => opex,
            Metric::Ebitda => ebitda,
            Metric::GrossMargin => gross_margin,
        }
    }

    pub fn value(self, figures: &MonthlyFigures) -> f64 {
        (self.aggregator())(figures)
    }

    pub fn is_percentage(self) -> bool {
        matches!(self, Metric::GrossMargin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum RankDirection {
    Top,
    Bottom,
}

impl RankDirection {
    pub fn label(self) -> &'static str {
        match self {
            RankDirection::Top => "Top",
            RankDirection::Bottom => "Bottom",
        }
    }
}

/// What a query asks for. Months are always the first day of the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    RevenueVsBudget {
        month: NaiveDate,
    },
    OpexBreakdown {
        month: NaiveDate,
    },
    CashRunwayOrProjection,
    EbitdaSingleMonth {
        month: NaiveDate,
    },
    MetricTrend {
        metric: Metric,
        months: usize,
    },
    GrossMarginTrend {
        months: usize,
    },
    RevenueVarianceByEntity {
        month: NaiveDate,
    },
    CashBalanceTrend {
        months: usize,
    },
    MetricRanking {
        metric: Metric,
        direction: RankDirection,
        n: usize,
    },
    SingleMetric {
        metric: Metric,
        month: NaiveDate,
    },
    MultiMonthMetric {
        metric: Metric,
        months: Vec<NaiveDate>,
    },
    Unknown,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::RevenueVsBudget { .. } => "revenue_vs_budget",
            Intent::OpexBreakdown { .. } => "opex_breakdown",
            Intent::CashRunwayOrProjection => "cash_runway_or_projection",
            Intent::EbitdaSingleMonth { .. } => "ebitda_single_month",
            Intent::MetricTrend { .. } => "metric_trend",
            Intent::GrossMarginTrend { .. } => "gross_margin_trend",
            Intent::RevenueVarianceByEntity { .. } => "revenue_variance_by_entity",
            Intent::CashBalanceTrend { .. } => "cash_balance_trend",
            Intent::MetricRanking { .. } => "metric_ranking",
            Intent::SingleMetric { .. } => "single_metric",
            Intent::MultiMonthMetric { .. } => "multi_month_metric",
            Intent::Unknown => "unknown",
        }
    }
}
