//! Keyword classifier turning a free-text question into an [`Intent`].
//!
//! Rules are tried in a fixed order and the first one that produces an intent
//! wins:
//!
//! 1. ranking ("top 3 revenue months")
//! 2. trend ("opex trend for the last 4 months")
//! 3. several named months ("revenue for June and July 2025")
//! 4. a single named month ("EBITDA for March 2025")
//! 5. runway ("what is our cash runway?")
//!
//! Anything else is [`Intent::Unknown`]. Keyword checks are plain substring
//! matches on the lowercased query; month names are matched on word
//! boundaries so that "margin" never reads as "Mar".

use crate::intent::{Intent, Metric, RankDirection};
use crate::normalizer::KnownMonths;
use chrono::{Datelike, NaiveDate};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_TREND_MONTHS: usize = 6;

static RANKING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(top|bottom|highest|lowest|best|worst)(?:\s*(\d+))?\b")
        .expect("ranking pattern compiles")
});

static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:last|past)\s*(\d+)\s*months").expect("window pattern compiles")
});

static MONTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b(?:\s+(\d{4}))?",
    )
    .expect("month pattern compiles")
});

const TREND_KEYWORDS: [&str; 3] = ["trend", "history", "historical"];

/// The lowercased query plus everything extracted from it up front.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub text: String,
    pub months: Vec<NaiveDate>,
    pub default_trend_months: usize,
}

impl QueryContext {
    pub fn contains(&self, keyword: &str) -> bool {
        self.text.contains(keyword)
    }

    pub fn mentions(&self, metric: Metric) -> bool {
        self.contains(metric.keyword())
    }

    fn first_metric(&self, candidates: &[Metric]) -> Option<Metric> {
        candidates.iter().copied().find(|m| self.mentions(*m))
    }
}

pub type Rule = fn(&QueryContext) -> Option<Intent>;

/// Evaluated top to bottom; the first `Some` wins.
pub const RULES: [(&str, Rule); 5] = [
    ("ranking", ranking_rule),
    ("trend", trend_rule),
    ("multi_month", multi_month_rule),
    ("single_month", single_month_rule),
    ("runway", runway_rule),
];

pub fn ranking_rule(ctx: &QueryContext) -> Option<Intent> {
    let captures = RANKING_PATTERN.captures(&ctx.text)?;
    let direction = match &captures[1] {
        "top" | "highest" | "best" => RankDirection::Top,
        _ => RankDirection::Bottom,
    };
    let n = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .unwrap_or(1);

    let metric = ctx.first_metric(&Metric::ALL)?;
    Some(Intent::MetricRanking {
        metric,
        direction,
        n,
    })
}

pub fn trend_rule(ctx: &QueryContext) -> Option<Intent> {
    if !TREND_KEYWORDS.iter().any(|kw| ctx.contains(kw)) {
        return None;
    }
    let months = extract_month_count(&ctx.text, ctx.default_trend_months);

    if let Some(metric) = ctx.first_metric(&[Metric::Revenue, Metric::Opex, Metric::Ebitda]) {
        return Some(Intent::MetricTrend { metric, months });
    }
    if ctx.mentions(Metric::GrossMargin) {
        return Some(Intent::GrossMarginTrend { months });
    }
    if ctx.contains("cash balance") {
        return Some(Intent::CashBalanceTrend { months });
    }
    None
}

pub fn multi_month_rule(ctx: &QueryContext) -> Option<Intent> {
    if ctx.months.len() < 2 {
        return None;
    }
    let metric = ctx.first_metric(&Metric::ALL)?;
    Some(Intent::MultiMonthMetric {
        metric,
        months: ctx.months.clone(),
    })
}

pub fn single_month_rule(ctx: &QueryContext) -> Option<Intent> {
    let [month] = ctx.months.as_slice() else {
        return None;
    };
    let month = *month;

    if ctx.mentions(Metric::Revenue) && ctx.contains("budget") {
        return Some(Intent::RevenueVsBudget { month });
    }
    if ctx.mentions(Metric::Opex) && (ctx.contains("break down") || ctx.contains("breakdown")) {
        return Some(Intent::OpexBreakdown { month });
    }
    if ctx.mentions(Metric::Ebitda) {
        return Some(Intent::EbitdaSingleMonth { month });
    }
    if ctx.mentions(Metric::Revenue) && ctx.contains("entity") {
        return Some(Intent::RevenueVarianceByEntity { month });
    }

    let metric = ctx.first_metric(&[Metric::Revenue, Metric::Opex, Metric::GrossMargin])?;
    Some(Intent::SingleMetric { metric, month })
}

pub fn runway_rule(ctx: &QueryContext) -> Option<Intent> {
    if ctx.contains("cash runway") || ctx.contains("runway") {
        Some(Intent::CashRunwayOrProjection)
    } else {
        None
    }
}

/// "last 3 months" / "past 12 months"; falls back to `default` when absent or unparseable.
pub fn extract_month_count(text: &str, default: usize) -> usize {
    WINDOW_PATTERN
        .captures(text)
        .and_then(|c| c[1].parse::<usize>().ok())
        .unwrap_or(default)
}

fn month_number(token: &str) -> Option<u32> {
    let number = match token.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(number)
}

/// Every month named in `text` as a first-of-month date, deduplicated and ascending.
///
/// A month without a year takes the latest year it appears in the actuals,
/// or the year of `today` when the actuals never contain it.
pub fn extract_months(text: &str, known: &KnownMonths, today: NaiveDate) -> Vec<NaiveDate> {
    let mut months: Vec<NaiveDate> = MONTH_PATTERN
        .captures_iter(text)
        .filter_map(|captures| {
            let number = month_number(&captures[1])?;
            let year = match captures.get(2) {
                Some(year) => year.as_str().parse::<i32>().ok()?,
                None => known.latest_year(number).unwrap_or(today.year()),
            };
            NaiveDate::from_ymd_opt(year, number, 1)
        })
        .collect();

    months.sort();
    months.dedup();
    months
}

pub struct IntentClassifier<'a> {
    known_months: &'a KnownMonths,
    today: NaiveDate,
    default_trend_months: usize,
}

impl<'a> IntentClassifier<'a> {
    pub fn new(known_months: &'a KnownMonths, today: NaiveDate) -> Self {
        Self {
            known_months,
            today,
            default_trend_months: DEFAULT_TREND_MONTHS,
        }
    }

    pub fn with_default_trend_months(mut self, months: usize) -> Self {
        self.default_trend_months = months;
        self
    }

    pub fn context(&self, query: &str) -> QueryContext {
        let text = query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let months = extract_months(&text, self.known_months, self.today);

        QueryContext {
            text,
            months,
            default_trend_months: self.default_trend_months,
        }
    }

    pub fn classify(&self, query: &str) -> Intent {
        let ctx = self.context(query);

        for (name, rule) in RULES {
            if let Some(intent) = rule(&ctx) {
                debug!("Query '{}' matched rule '{}': {:?}", ctx.text, name, intent);
                return intent;
            }
        }

        debug!("Query '{}' matched no rule", ctx.text);
        Intent::Unknown
    }
}

pub fn classify(query: &str, known_months: &KnownMonths, today: NaiveDate) -> Intent {
    IntentClassifier::new(known_months, today).classify(query)
}
