use crate::engine::{Answer, MetricEngine};
use crate::error::{CopilotError, Result};
use crate::intent::Intent;
use log::{debug, warn};

/// Runs the engine call an intent stands for.
pub fn dispatch(intent: &Intent, engine: &MetricEngine<'_>) -> Result<Answer> {
    match intent {
        Intent::RevenueVsBudget { month } => engine.revenue_vs_budget(*month),
        Intent::OpexBreakdown { month } => engine.opex_breakdown(*month),
        Intent::CashRunwayOrProjection => engine.cash_runway_or_projection(),
        Intent::EbitdaSingleMonth { month } => engine.ebitda(*month),
        Intent::MetricTrend { metric, months } => engine.metric_trend(*metric, *months),
        Intent::GrossMarginTrend { months } => engine.gross_margin_trend(*months),
        Intent::RevenueVarianceByEntity { month } => engine.revenue_variance_by_entity(*month),
        Intent::CashBalanceTrend { months } => engine.cash_balance_trend(*months),
        Intent::MetricRanking {
            metric,
            direction,
            n,
        } => engine.metric_ranking(*metric, *direction, *n),
        Intent::SingleMetric { metric, month } => engine.single_metric(*metric, *month),
        Intent::MultiMonthMetric { metric, months } => engine.multi_month_metric(*metric, months),
        Intent::Unknown => Err(CopilotError::UnrecognizedQuery),
    }
}

/// Like [`dispatch`], but every failure becomes a text-only answer.
pub fn plan(intent: &Intent, engine: &MetricEngine<'_>) -> Answer {
    match dispatch(intent, engine) {
        Ok(answer) => answer,
        Err(err) => {
            if err.is_user_facing() {
                debug!("Intent '{}' answered without chart: {}", intent.name(), err);
            } else {
                warn!("Intent '{}' failed: {}", intent.name(), err);
            }
            Answer::text(err.to_string())
        }
    }
}
