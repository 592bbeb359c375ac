#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Held-out error of a regressor. A constant label set scores R² 1.0 only on a perfect fit.
pub fn regression_metrics(predictions: &[f64], labels: &[f64]) -> RegressionMetrics {
    let n = labels.len() as f64;
    let mean = labels.iter().sum::<f64>() / n;
    let mut squared_error = 0.0;
    let mut absolute_error = 0.0;
    let mut total_variation = 0.0;
    for (prediction, label) in predictions.iter().zip(labels) {
        squared_error += (label - prediction).powi(2);
        absolute_error += (label - prediction).abs();
        total_variation += (label - mean).powi(2);
    }
    let mse = squared_error / n;
    let r2 = if total_variation > 0.0 {
        1.0 - squared_error / total_variation
    } else if squared_error == 0.0 {
        1.0
    } else {
        0.0
    };
    RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae: absolute_error / n,
        r2,
    }
}
