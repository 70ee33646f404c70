use std::cmp::Ordering;

use polars::prelude::*;

use crate::domain::TrendsError;
use crate::table::{is_numeric_type, numeric_values};

/// Summary row for one numeric column, pandas `describe()` style.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1). NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summary statistics for every numeric column of the table.
/// Non-numeric and all-null columns are left out of the report.
pub fn describe(df: &DataFrame) -> Result<Vec<ColumnStats>, TrendsError> {
    let mut report = Vec::new();
    for (name, dtype) in df.schema().iter() {
        if !is_numeric_type(dtype) {
            continue;
        }
        let values = numeric_values(df, name.as_str())?;
        if values.is_empty() {
            continue;
        }
        report.push(column_stats(name.as_str(), values));
    }
    Ok(report)
}

fn column_stats(name: &str, mut values: Vec<f64>) -> ColumnStats {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (squares / (count - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    ColumnStats {
        name: name.to_string(),
        count,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[count - 1],
    }
}

// Linear-interpolation quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
    }
}

/// Serialize the table as UTF-8 comma-separated text with a header row,
/// one line per row in original order, no index column.
pub fn export_csv(df: &DataFrame) -> Result<Vec<u8>, TrendsError> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df.clone())?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_table;
    use crate::table::string_values;
    use polars::df;
    use std::io::Write;

    #[test]
    fn describe_matches_reference_values() {
        let df = df!("Amount" => [1.0f64, 2.0, 3.0, 4.0]).unwrap();
        let report = describe(&df).unwrap();
        assert_eq!(report.len(), 1);

        let stats = &report[0];
        assert_eq!(stats.name, "Amount");
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.min - 1.0).abs() < 1e-12);
        assert!((stats.max - 4.0).abs() < 1e-12);
        assert!((stats.q25 - 1.75).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.q75 - 3.25).abs() < 1e-12);
        assert!((stats.std - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn describe_skips_text_columns() {
        let df = df!(
            "Category" => ["Clothing", "Footwear"],
            "Age" => [34i64, 27],
        )
        .unwrap();
        let report = describe(&df).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "Age");
    }

    #[test]
    fn describe_handles_integer_columns() {
        let df = df!("Age" => [27i64, 34, 41]).unwrap();
        let stats = &describe(&df).unwrap()[0];
        assert!((stats.mean - 34.0).abs() < 1e-12);
        assert!((stats.median - 34.0).abs() < 1e-12);
    }

    #[test]
    fn export_round_trips_through_the_loader() {
        let df = df!(
            "Gender" => ["Male", "Female"],
            "Age" => [34i64, 27],
            "Category" => ["Clothing", "Accessories"],
        )
        .unwrap();
        let bytes = export_csv(&df).unwrap();

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let (_, reloaded) = load_table(file.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.get_column_names_str(), df.get_column_names_str());
        assert_eq!(reloaded.height(), df.height());
        for name in df.get_column_names_str() {
            assert_eq!(
                string_values(&reloaded, name).unwrap(),
                string_values(&df, name).unwrap()
            );
        }
    }
}
