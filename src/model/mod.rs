//! The serialized demand model: preprocessing plus a boosted tree ensemble.

pub mod gbt;
pub mod preprocess;

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::{FeatureVector, FEATURE_NAMES, N_FEATURES};

pub use gbt::{Regressor, TrainOptions};
pub use preprocess::Preprocessor;

/// Maps one feature row to a demand estimate.
pub trait DemandRegressor {
    fn predict(&self, features: &FeatureVector) -> f64;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DemandModel {
    pub feature_names: Vec<String>,
    pub preprocessor: Preprocessor,
    pub regressor: Regressor,
}

impl DemandModel {
    pub fn fit(rows: &[[f64; N_FEATURES]], labels: &[f64], options: &TrainOptions) -> Self {
        let preprocessor = Preprocessor::fit(rows);
        let encoded = preprocessor.transform(rows);
        info!(
            "training on {} examples x {} encoded columns",
            encoded.nrows(),
            encoded.ncols()
        );
        let regressor = Regressor::train(&encoded, labels, options);
        Self {
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            preprocessor,
            regressor,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let model: DemandModel = bincode::deserialize(bytes)?;
        if model.feature_names != FEATURE_NAMES {
            return Err(ModelError::SchemaMismatch {
                expected: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
                found: model.feature_names,
            });
        }
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_owned(),
            source,
        })?;
        let model = Self::from_bytes(&bytes)?;
        info!(
            "loaded model from {} ({} trees)",
            path.display(),
            model.regressor.trees.len()
        );
        Ok(model)
    }

    pub fn predict_rows(&self, rows: &[[f64; N_FEATURES]]) -> Vec<f64> {
        self.regressor
            .predict_matrix(&self.preprocessor.transform(rows))
    }
}

impl DemandRegressor for DemandModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let encoded = self.preprocessor.transform_row(&features.values());
        self.regressor.predict(&encoded)
    }
}

/// Trip count shown to the user: the model output truncated toward zero, never negative.
pub fn trip_count(prediction: f64) -> i64 {
    if prediction.is_finite() && prediction > 0.0 {
        prediction.trunc() as i64
    } else {
        0
    }
}
