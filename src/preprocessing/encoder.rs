//! One-hot encoding of categorical columns

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder
///
/// Each fitted column expands into one `Int32` indicator per observed
/// category, named `<column>_<category>`. Categories are kept in sorted
/// order so the output layout does not depend on row order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // column name -> sorted categories
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create an unfitted encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the categories observed in each listed column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.categories.clear();

        for col_name in columns {
            let values = string_values(df, col_name)?;
            let observed: BTreeSet<String> = values.into_iter().flatten().collect();
            self.categories
                .push((col_name.clone(), observed.into_iter().collect()));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Produce the indicator columns, grouped by source column in fit order
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut encoded = Vec::new();
        for (col_name, categories) in &self.categories {
            let values = string_values(df, col_name)?;

            for category in categories {
                let new_col_name = format!("{}_{}", col_name, category);
                let indicator: Vec<i32> = values
                    .iter()
                    .map(|v| if v.as_deref() == Some(category.as_str()) { 1 } else { 0 })
                    .collect();
                encoded.push(Column::new(new_col_name.into(), indicator));
            }
        }

        Ok(encoded)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<Vec<Column>> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Names of the indicator columns produced for a source column
    pub fn output_names(&self, column: &str) -> Vec<String> {
        self.categories
            .iter()
            .filter(|(name, _)| name == column)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{}_{}", name, c)))
            .collect()
    }
}

/// Render any column as optional strings (categorical, boolean and integer
/// columns all go through the string representation)
fn string_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(col_name)
        .map_err(|_| PipelineError::Schema(format!("column '{}' not found", col_name)))?;
    let as_str = column
        .cast(&DataType::String)
        .map_err(|e| PipelineError::Data(e.to_string()))?;
    let values = as_str
        .str()
        .map_err(|e| PipelineError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onehot_names_and_values() {
        let df = df!("ChestPainType" => &["ATA", "NAP", "ATA", "ASY"]).unwrap();

        let mut encoder = OneHotEncoder::new();
        let cols = encoder
            .fit_transform(&df, &["ChestPainType".to_string()])
            .unwrap();

        let names: Vec<&str> = cols.iter().map(|c| c.name().as_str()).collect();
        assert_eq!(
            names,
            vec!["ChestPainType_ASY", "ChestPainType_ATA", "ChestPainType_NAP"]
        );

        let ata: Vec<Option<i32>> = cols[1].i32().unwrap().into_iter().collect();
        assert_eq!(ata, vec![Some(1), Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_rows_sum_to_one() {
        let df = df!("Sex" => &["M", "F", "M", "F", "M"]).unwrap();

        let mut encoder = OneHotEncoder::new();
        let cols = encoder.fit_transform(&df, &["Sex".to_string()]).unwrap();

        for row in 0..df.height() {
            let sum: i32 = cols
                .iter()
                .map(|c| c.i32().unwrap().get(row).unwrap())
                .sum();
            assert_eq!(sum, 1);
        }
    }

    #[test]
    fn test_single_category() {
        let df = df!("ST_Slope" => &["Up", "Up", "Up"]).unwrap();

        let mut encoder = OneHotEncoder::new();
        let cols = encoder.fit_transform(&df, &["ST_Slope".to_string()]).unwrap();

        assert_eq!(cols.len(), 1);
        assert!(cols[0].i32().unwrap().into_iter().all(|v| v == Some(1)));
    }

    #[test]
    fn test_integer_categories() {
        let df = df!("FastingBS" => &[0i64, 1, 0]).unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &["FastingBS".to_string()]).unwrap();

        assert_eq!(
            encoder.output_names("FastingBS"),
            vec!["FastingBS_0".to_string(), "FastingBS_1".to_string()]
        );
    }
}
