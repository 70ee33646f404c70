use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::trace;

use crate::domain::{FILTER_COLUMNS, TrendsError};
use crate::table::string_values;

/// Multi-select state for one filterable column.
#[derive(Debug, Clone)]
pub struct ColumnSelection {
    pub column: String,
    /// Distinct observed values, in first-seen row order.
    pub values: Vec<String>,
    /// Values currently allowed through the filter.
    pub selected: BTreeSet<String>,
}

impl ColumnSelection {
    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.contains(value)
    }

    pub fn toggle(&mut self, value: &str) {
        if !self.selected.remove(value) {
            self.selected.insert(value.to_string());
        }
    }

    fn select_all(&mut self) {
        self.selected = self.values.iter().cloned().collect();
    }
}

/// User-selected value sets for the fixed filterable columns.
///
/// Everything is selected by default, mirroring a freshly opened file.
#[derive(Debug, Clone)]
pub struct Selections {
    pub columns: Vec<ColumnSelection>,
}

impl Selections {
    /// Build default selections from the distinct values of each
    /// filterable column. A missing filterable column is a schema error.
    pub fn from_table(df: &DataFrame) -> Result<Self, TrendsError> {
        let mut columns = Vec::with_capacity(FILTER_COLUMNS.len());
        for name in FILTER_COLUMNS {
            let cells = string_values(df, name)?;
            let mut seen = BTreeSet::new();
            let mut values = Vec::new();
            for cell in cells {
                if seen.insert(cell.clone()) {
                    values.push(cell);
                }
            }
            trace!("Column \"{}\": {} distinct values", name, values.len());
            columns.push(ColumnSelection {
                column: name.to_string(),
                selected: seen,
                values,
            });
        }
        Ok(Selections { columns })
    }

    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.select_all();
        }
    }

    /// Row subset matching all selections: AND across columns, OR within
    /// a column's selected set. Row order is preserved, nothing is
    /// deduplicated, and a missing filterable column errors instead of
    /// silently dropping that filter dimension.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, TrendsError> {
        let mut keep = vec![true; df.height()];
        for selection in &self.columns {
            let cells = string_values(df, &selection.column)?;
            for (ridx, cell) in cells.iter().enumerate() {
                if !selection.selected.contains(cell) {
                    keep[ridx] = false;
                }
            }
        }
        let mask = BooleanChunked::new("keep".into(), keep);
        Ok(df.filter(&mask)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn sample() -> DataFrame {
        df!(
            "Gender" => ["Male", "Female", "Female", "Male"],
            "Age" => [34i64, 27, 41, 27],
            "Category" => ["Clothing", "Accessories", "Clothing", "Footwear"],
            "Purchase Amount" => [53.5f64, 21.0, 88.25, 64.1],
        )
        .unwrap()
    }

    #[test]
    fn default_selection_keeps_every_row() {
        let df = sample();
        let selections = Selections::from_table(&df).unwrap();
        let filtered = selections.apply(&df).unwrap();
        assert!(filtered.equals(&df));
    }

    #[test]
    fn filter_is_a_row_subset_in_original_order() {
        let df = sample();
        let mut selections = Selections::from_table(&df).unwrap();
        selections.columns[0].toggle("Male");

        let filtered = selections.apply(&df).unwrap();
        assert_eq!(filtered.height(), 2);
        let genders = string_values(&filtered, "Gender").unwrap();
        assert_eq!(genders, vec!["Female", "Female"]);
        let ages = string_values(&filtered, "Age").unwrap();
        assert_eq!(ages, vec!["27", "41"]);
    }

    #[test]
    fn selections_combine_with_and() {
        let df = sample();
        let mut selections = Selections::from_table(&df).unwrap();
        selections.columns[0].toggle("Female");
        selections.columns[2].toggle("Footwear");

        let filtered = selections.apply(&df).unwrap();
        assert_eq!(filtered.height(), 1);
        assert_eq!(
            string_values(&filtered, "Category").unwrap(),
            vec!["Clothing"]
        );
    }

    #[test]
    fn filter_is_idempotent() {
        let df = sample();
        let mut selections = Selections::from_table(&df).unwrap();
        selections.columns[1].toggle("27");

        let once = selections.apply(&df).unwrap();
        let twice = selections.apply(&once).unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn reset_restores_full_selection() {
        let df = sample();
        let mut selections = Selections::from_table(&df).unwrap();
        selections.columns[2].toggle("Clothing");
        selections.columns[2].toggle("Footwear");
        selections.reset();
        assert!(selections.apply(&df).unwrap().equals(&df));
    }

    #[test]
    fn missing_filterable_column_is_a_schema_error() {
        let df = sample();
        let selections = Selections::from_table(&df).unwrap();
        let no_category = df.drop("Category").unwrap();
        assert!(matches!(
            selections.apply(&no_category),
            Err(TrendsError::MissingColumn(name)) if name == "Category"
        ));
        assert!(matches!(
            Selections::from_table(&no_category),
            Err(TrendsError::MissingColumn(_))
        ));
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let df = sample();
        let selections = Selections::from_table(&df).unwrap();
        assert_eq!(selections.columns[1].values, vec!["34", "27", "41"]);
    }
}
