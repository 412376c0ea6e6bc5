use chrono::{Datelike, Months, NaiveDate};

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Moves `month` forward (or backward for negative offsets), saturating at the calendar limits.
pub fn shift_months(month: NaiveDate, offset: i64) -> NaiveDate {
    let count = Months::new(offset.unsigned_abs().min(u32::MAX as u64) as u32);
    if offset >= 0 {
        month.checked_add_months(count).unwrap_or(NaiveDate::MAX)
    } else {
        month.checked_sub_months(count).unwrap_or(NaiveDate::MIN)
    }
}

/// A month counts as historical once its first day is on or before `today`.
pub fn is_historical(month: NaiveDate, today: NaiveDate) -> bool {
    month <= today
}

/// "June 2025"
pub fn long_month(month: NaiveDate) -> String {
    month.format("%B %Y").to_string()
}

/// "Jun 2025"
pub fn short_month(month: NaiveDate) -> String {
    month.format("%b %Y").to_string()
}

/// Two decimals with thousands separators, e.g. `-60,000.00`.
pub fn format_amount(value: f64) -> String {
    format_num::format_num!(",.2", value)
}

/// `$60,000.00 USD`. Negative values keep the sign after the dollar: `$-60,000.00 USD`.
pub fn format_money(value: f64, currency: &str) -> String {
    format!("${} {}", format_amount(value), currency)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// (Revenue - COGS) / Revenue as a percentage. Zero revenue yields 0.
pub fn gross_margin_pct(revenue: f64, cogs: f64) -> f64 {
    if revenue == 0.0 {
        return 0.0;
    }
    (revenue - cogs) / revenue * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_of_month() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(
            first_of_month(date),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_shift_months_rolls_year() {
        let nov = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(
            shift_months(nov, 3),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert_eq!(
            shift_months(nov, -11),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_month_labels() {
        let june = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(long_month(june), "June 2025");
        assert_eq!(short_month(june), "Jun 2025");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(100_000.0, "USD"), "$100,000.00 USD");
        assert_eq!(format_money(1234.5, "USD"), "$1,234.50 USD");
        assert_eq!(format_amount(0.0), "0.00");
    }

    #[test]
    fn test_gross_margin_guards_zero_revenue() {
        assert_eq!(gross_margin_pct(0.0, 500.0), 0.0);
        assert!((gross_margin_pct(100_000.0, 40_000.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_is_historical() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert!(is_historical(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(), today));
        assert!(!is_historical(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(), today));
    }
}
