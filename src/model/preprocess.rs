use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::features::N_FEATURES;

/// Positions in `FEATURE_NAMES` of the columns scaled to zero mean and unit variance:
/// season_number followed by the seven weather columns.
pub const NUMERIC_COLUMNS: [usize; 8] = [10, 0, 1, 2, 3, 4, 5, 6];

/// Positions of day, month and dayofweek, expanded into one indicator per seen value.
pub const CATEGORICAL_COLUMNS: [usize; 3] = [7, 8, 9];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub column: usize,
    pub mean: f64,
    pub scale: f64,
}

impl StandardScaler {
    /// Population statistics. A constant column keeps a scale of 1.
    pub fn fit(column: usize, rows: &[[f64; N_FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mean = rows.iter().map(|row| row[column]).sum::<f64>() / n;
        let variance = rows
            .iter()
            .map(|row| (row[column] - mean).powi(2))
            .sum::<f64>()
            / n;
        let scale = if variance > f64::EPSILON {
            variance.sqrt()
        } else {
            1.0
        };
        Self {
            column,
            mean,
            scale,
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    pub column: usize,
    /// Sorted categories seen during fit.
    pub categories: Vec<i64>,
}

impl OneHotEncoder {
    pub fn fit(column: usize, rows: &[[f64; N_FEATURES]]) -> Self {
        let mut categories: Vec<i64> = rows.iter().map(|row| row[column].round() as i64).collect();
        categories.sort_unstable();
        categories.dedup();
        Self { column, categories }
    }

    /// Writes the indicators into `out`. An unseen value leaves every indicator at zero.
    pub fn transform_into(&self, value: f64, out: &mut [f64]) {
        out.fill(0.0);
        if let Ok(index) = self.categories.binary_search(&(value.round() as i64)) {
            out[index] = 1.0;
        }
    }
}

/// Scalers first, then one-hot blocks, in column-list order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Preprocessor {
    pub scalers: Vec<StandardScaler>,
    pub encoders: Vec<OneHotEncoder>,
}

impl Preprocessor {
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Self {
        let scalers = NUMERIC_COLUMNS
            .iter()
            .map(|&column| StandardScaler::fit(column, rows))
            .collect();
        let encoders = CATEGORICAL_COLUMNS
            .iter()
            .map(|&column| OneHotEncoder::fit(column, rows))
            .collect();
        Self { scalers, encoders }
    }

    /// Width of a transformed row.
    pub fn n_outputs(&self) -> usize {
        self.scalers.len()
            + self
                .encoders
                .iter()
                .map(|encoder| encoder.categories.len())
                .sum::<usize>()
    }

    pub fn transform_row(&self, row: &[f64; N_FEATURES]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_outputs()];
        for (value, scaler) in out.iter_mut().zip(&self.scalers) {
            *value = scaler.transform(row[scaler.column]);
        }
        let mut offset = self.scalers.len();
        for encoder in &self.encoders {
            let width = encoder.categories.len();
            encoder.transform_into(row[encoder.column], &mut out[offset..offset + width]);
            offset += width;
        }
        out
    }

    /// One transformed example per matrix row.
    pub fn transform(&self, rows: &[[f64; N_FEATURES]]) -> DMatrix<f64> {
        let n_outputs = self.n_outputs();
        let mut matrix = DMatrix::zeros(rows.len(), n_outputs);
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in self.transform_row(row).into_iter().enumerate() {
                matrix[(i, j)] = value;
            }
        }
        matrix
    }
}
