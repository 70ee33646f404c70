use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::trace;

use crate::domain::{DATE_COLUMN, TrendsError};
use crate::table::string_values;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    Bar,
    Pie { start_angle: f64, equal_aspect: bool },
    Line { markers: bool },
}

/// Renderable chart description. Building one never draws anything;
/// the UI layer decides how a spec ends up on screen.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub y_label: Option<String>,
    pub categories: Vec<String>,
    pub values: Vec<u64>,
    /// Slice percentages rounded to one decimal, pie charts only.
    pub percents: Vec<f64>,
}

// Frequency tally of a column, ordered by descending count.
// Ties follow the value ordering so repeated runs agree.
fn value_counts(cells: &[String]) -> (Vec<String>, Vec<u64>) {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for cell in cells {
        *counts.entry(cell.as_str()).or_insert(0) += 1;
    }
    let mut sorted: Vec<(u64, &str)> = counts.into_iter().map(|(v, c)| (c, v)).collect();
    sorted.sort_unstable();
    sorted.reverse();
    let (values, categories): (Vec<u64>, Vec<&str>) = sorted.into_iter().unzip();
    (categories.into_iter().map(String::from).collect(), values)
}

/// Count of rows per distinct value of a text column, as vertical bars.
pub fn frequency_bar(df: &DataFrame, column: &str) -> Result<ChartSpec, TrendsError> {
    let cells = string_values(df, column)?;
    let (categories, values) = value_counts(&cells);
    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Distribution of {column}"),
        y_label: Some("Count".to_string()),
        categories,
        values,
        percents: Vec::new(),
    })
}

/// Category breakdown as a pie with one-decimal percentage labels.
/// Skipped entirely when the table has no Category column.
pub fn category_pie(df: &DataFrame) -> Result<Option<ChartSpec>, TrendsError> {
    if df.column("Category").is_err() {
        return Ok(None);
    }
    let cells = string_values(df, "Category")?;
    let (categories, values) = value_counts(&cells);
    let total: u64 = values.iter().sum();
    let percents: Vec<f64> = values
        .iter()
        .map(|&count| (count as f64 * 1000.0 / total as f64).round() / 10.0)
        .collect();

    Ok(Some(ChartSpec {
        kind: ChartKind::Pie {
            start_angle: 90.0,
            equal_aspect: true,
        },
        title: "Category Breakdown".to_string(),
        y_label: None,
        categories,
        values,
        percents,
    }))
}

/// Purchases per month as a line with marker points, bucketed by the
/// year-month of each parseable purchase date. Rows whose date does not
/// parse are dropped from the tally, not reported. Works on the full
/// unfiltered table. `None` when the date column is absent.
pub fn monthly_trend(df: &DataFrame) -> Result<Option<ChartSpec>, TrendsError> {
    if df.column(DATE_COLUMN).is_err() {
        return Ok(None);
    }
    let cells = string_values(df, DATE_COLUMN)?;

    // BTreeMap keys are zero-padded YYYY-MM, so iteration order is
    // already chronological.
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    let mut dropped = 0usize;
    for cell in &cells {
        match parse_purchase_date(cell) {
            Some(date) => {
                let key = format!("{}", date.format("%Y-%m"));
                *buckets.entry(key).or_insert(0) += 1;
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        trace!("Dropped {dropped} rows with unparseable purchase dates");
    }

    let (categories, values): (Vec<String>, Vec<u64>) = buckets.into_iter().unzip();
    Ok(Some(ChartSpec {
        kind: ChartKind::Line { markers: true },
        title: "Monthly Shopping Trend".to_string(),
        y_label: Some("Number of Purchases".to_string()),
        categories,
        values,
        percents: Vec::new(),
    }))
}

/// Lenient calendar date parse. Anything unrecognized is `None`, never
/// an error; the trend silently skips those rows.
pub fn parse_purchase_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // Datetime strings: take the leading date part.
    if let Some(prefix) = value.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn bar_orders_by_descending_count() {
        let df = df!(
            "Category" => ["Clothing", "Footwear", "Clothing", "Clothing", "Footwear"],
        )
        .unwrap();
        let spec = frequency_bar(&df, "Category").unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.y_label.as_deref(), Some("Count"));
        assert_eq!(spec.categories, vec!["Clothing", "Footwear"]);
        assert_eq!(spec.values, vec![3, 2]);
    }

    #[test]
    fn bar_on_unknown_column_errors() {
        let df = df!("Gender" => ["Male"]).unwrap();
        assert!(matches!(
            frequency_bar(&df, "Category"),
            Err(TrendsError::MissingColumn(_))
        ));
    }

    #[test]
    fn pie_percentages_sum_to_one_hundred() {
        let df = df!("Category" => ["A", "A", "B"]).unwrap();
        let spec = category_pie(&df).unwrap().unwrap();
        assert_eq!(
            spec.kind,
            ChartKind::Pie {
                start_angle: 90.0,
                equal_aspect: true
            }
        );
        assert_eq!(spec.categories, vec!["A", "B"]);
        assert_eq!(spec.percents, vec![66.7, 33.3]);
        let total: f64 = spec.percents.iter().sum();
        assert!((total - 100.0).abs() <= 0.1);
    }

    #[test]
    fn pie_is_skipped_without_category_column() {
        let df = df!("Gender" => ["Male"]).unwrap();
        assert!(category_pie(&df).unwrap().is_none());
    }

    #[test]
    fn trend_groups_by_month_in_order() {
        let df = df!(
            "Purchase Date" => ["2024-01-05", "2024-01-20", "2024-02-01"],
        )
        .unwrap();
        let spec = monthly_trend(&df).unwrap().unwrap();
        assert_eq!(spec.kind, ChartKind::Line { markers: true });
        assert_eq!(spec.categories, vec!["2024-01", "2024-02"]);
        assert_eq!(spec.values, vec![2, 1]);
    }

    #[test]
    fn trend_drops_unparseable_dates_silently() {
        let df = df!(
            "Purchase Date" => ["2024-01-05", "not a date", "2024-03-09"],
        )
        .unwrap();
        let spec = monthly_trend(&df).unwrap().unwrap();
        assert_eq!(spec.categories, vec!["2024-01", "2024-03"]);
        assert_eq!(spec.values, vec![1, 1]);
    }

    #[test]
    fn trend_without_date_column_is_informational() {
        let df = df!("Gender" => ["Male"]).unwrap();
        assert!(monthly_trend(&df).unwrap().is_none());
    }

    #[test]
    fn date_parse_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_purchase_date("2024-01-05"), Some(expected));
        assert_eq!(parse_purchase_date("2024/01/05"), Some(expected));
        assert_eq!(parse_purchase_date("05-01-2024"), Some(expected));
        assert_eq!(parse_purchase_date("05/01/2024"), Some(expected));
        assert_eq!(parse_purchase_date("2024-01-05 13:45:00"), Some(expected));
        assert_eq!(parse_purchase_date("yesterday"), None);
        assert_eq!(parse_purchase_date(""), None);
    }
}
