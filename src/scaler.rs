use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Per-column standardization fitted on the training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(records: &Array2<f64>) -> Result<Self> {
        if records.nrows() == 0 {
            return Err(RiskError::Training("cannot fit scaler on an empty split".to_string()));
        }

        let mean = records
            .mean_axis(Axis(0))
            .ok_or_else(|| RiskError::Training("scaler mean is undefined".to_string()))?;
        // Population std (ddof = 0); constant columns keep their scale at 1.
        let scale = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, records: &Array2<f64>) -> Result<Array2<f64>> {
        if records.ncols() != self.n_features() {
            return Err(RiskError::ShapeMismatch {
                expected: self.n_features(),
                actual: records.ncols(),
            });
        }

        Ok((records - &self.mean) / &self.scale)
    }
}
