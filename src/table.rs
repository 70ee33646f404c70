use polars::prelude::*;

use crate::domain::TrendsError;

/// Rendering of null cells, shared by the filter engine and the UI.
pub const NULL_MARKER: &str = "∅";

/// All cell values of a column as strings, nulls as [`NULL_MARKER`].
///
/// Filtering and the chart tallies compare values through this rendering,
/// so an integer Age column and its selected value sets always agree.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>, TrendsError> {
    let col = df
        .column(name)
        .map_err(|_| TrendsError::MissingColumn(name.to_string()))?
        .cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| match value {
            Some(s) => s.to_string(),
            None => NULL_MARKER.to_string(),
        })
        .collect())
}

/// Non-null values of a numeric column as f64.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, TrendsError> {
    let col = df
        .column(name)
        .map_err(|_| TrendsError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    let series = col.f64()?;
    Ok(series.into_iter().flatten().collect())
}

pub fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of the text-typed columns, the candidates for the bar chart.
pub fn text_columns(df: &DataFrame) -> Vec<String> {
    df.schema()
        .iter()
        .filter(|(_, dtype)| matches!(dtype, DataType::String))
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn string_values_render_nulls() {
        let df = df!("Category" => [Some("Clothing"), None, Some("Footwear")]).unwrap();
        let values = string_values(&df, "Category").unwrap();
        assert_eq!(values, vec!["Clothing", NULL_MARKER, "Footwear"]);
    }

    #[test]
    fn numeric_values_skip_nulls() {
        let df = df!("Age" => [Some(34i64), None, Some(27)]).unwrap();
        assert_eq!(numeric_values(&df, "Age").unwrap(), vec![34.0, 27.0]);
    }

    #[test]
    fn unknown_column_is_a_schema_error() {
        let df = df!("Age" => [1i64, 2]).unwrap();
        assert!(matches!(
            string_values(&df, "Gender"),
            Err(TrendsError::MissingColumn(name)) if name == "Gender"
        ));
    }

    #[test]
    fn text_columns_exclude_numerics() {
        let df = df!("Gender" => ["Male"], "Age" => [34i64]).unwrap();
        assert_eq!(text_columns(&df), vec!["Gender".to_string()]);
    }
}
