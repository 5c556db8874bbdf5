use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::TrainingConfig;
use crate::data::{self, FeatureRecord, LabeledSample, FEATURE_COUNT};
use crate::error::{Result, RiskError};
use crate::forest::{self, BaggedForest, ForestParams};
use crate::scaler::StandardScaler;

pub const MODEL_FILE: &str = "student_performance_model.json";
pub const SCALER_FILE: &str = "scaler.json";

const MEDIUM_RISK_FROM: f64 = 0.3;
const HIGH_RISK_FROM: f64 = 0.7;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability < MEDIUM_RISK_FROM {
            RiskLevel::Low
        } else if probability < HIGH_RISK_FROM {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskPrediction {
    pub at_risk: bool,
    pub risk_probability: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelInfo {
    pub accuracy: f64,
    pub n_samples: usize,
    pub n_trees: usize,
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
}

/// On-disk form of the classifier half of the pair.
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    pair_id: u64,
    info: ModelInfo,
    forest: BaggedForest,
}

/// On-disk form of the scaler half; `pair_id` must match the classifier's.
#[derive(Debug, Serialize, Deserialize)]
struct ScalerArtifact {
    pair_id: u64,
    scaler: StandardScaler,
}

/// Fitted ensemble and the scaler it was trained behind. Never split up.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pair_id: u64,
    forest: BaggedForest,
    scaler: StandardScaler,
    info: ModelInfo,
}

impl TrainedModel {
    pub fn fit(samples: &[LabeledSample], config: &TrainingConfig) -> Result<Self> {
        if samples.len() < 2 {
            return Err(RiskError::Training(format!(
                "need at least 2 samples, got {}",
                samples.len()
            )));
        }

        let (train, holdout) = data::train_test_split(samples, config.test_ratio, config.seed);
        if train.is_empty() {
            return Err(RiskError::Training("training split is empty".to_string()));
        }

        let (at_risk, safe) = data::class_distribution(&train);
        log::info!("Class distribution: {} at risk, {} not at risk", at_risk, safe);

        let scaler = StandardScaler::fit(&data::to_records(&train))?;
        let train_scaled = scaler.transform(&data::to_records(&train))?;

        let params = ForestParams {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            seed: config.seed,
        };
        let forest = BaggedForest::fit(&train_scaled, &data::to_targets(&train), &params)?;

        let accuracy = if holdout.is_empty() {
            log::warn!("Holdout split is empty, reporting training accuracy");
            let predictions = forest.predict(&train_scaled)?;
            forest::calculate_accuracy(&predictions, &data::to_targets(&train))
        } else {
            let holdout_scaled = scaler.transform(&data::to_records(&holdout))?;
            let predictions = forest.predict(&holdout_scaled)?;
            forest::calculate_accuracy(&predictions, &data::to_targets(&holdout))
        };

        Ok(Self {
            pair_id: rand::random(),
            info: ModelInfo {
                accuracy,
                n_samples: samples.len(),
                n_trees: forest.n_trees(),
                seed: config.seed,
                trained_at: Utc::now(),
            },
            forest,
            scaler,
        })
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Returns `(at_risk, probability of the at-risk class)`.
    pub fn predict(&self, record: &FeatureRecord) -> Result<(bool, f64)> {
        let features = record.to_features();
        if let Some(i) = features.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::Inference(format!(
                "{} is not a finite number",
                data::FEATURE_NAMES[i]
            )));
        }

        let input = Array2::from_shape_vec((1, FEATURE_COUNT), features.to_vec())
            .map_err(|e| RiskError::Inference(e.to_string()))?;
        let scaled = self.scaler.transform(&input)?;

        let probability = self.forest.predict_proba(&scaled)?[0];

        Ok((forest::is_positive(probability), probability))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let artifact = ModelArtifact {
            pair_id: self.pair_id,
            info: self.info.clone(),
            forest: self.forest.clone(),
        };
        let scaler = ScalerArtifact {
            pair_id: self.pair_id,
            scaler: self.scaler.clone(),
        };
        write_atomic(&dir.join(MODEL_FILE), &serde_json::to_vec(&artifact)?)?;
        write_atomic(&dir.join(SCALER_FILE), &serde_json::to_vec(&scaler)?)?;

        log::info!("Model saved to {}", dir.display());
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let model_path = dir.join(MODEL_FILE);
        let scaler_path = dir.join(SCALER_FILE);
        if !model_path.is_file() || !scaler_path.is_file() {
            return Err(RiskError::PersistenceMissing(dir.to_path_buf()));
        }

        let artifact: ModelArtifact = serde_json::from_slice(&fs::read(&model_path)?)?;
        let ScalerArtifact { pair_id, scaler } =
            serde_json::from_slice(&fs::read(&scaler_path)?)?;

        if pair_id != artifact.pair_id {
            return Err(RiskError::MismatchedPair {
                model: artifact.pair_id,
                scaler: pair_id,
            });
        }

        if scaler.n_features() != FEATURE_COUNT || artifact.forest.n_features() != FEATURE_COUNT {
            return Err(RiskError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: if scaler.n_features() != FEATURE_COUNT {
                    scaler.n_features()
                } else {
                    artifact.forest.n_features()
                },
            });
        }

        Ok(Self {
            pair_id,
            forest: artifact.forest,
            scaler,
            info: artifact.info,
        })
    }
}

pub fn artifact_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(MODEL_FILE), dir.join(SCALER_FILE))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn train_model(config: &TrainingConfig) -> Result<TrainedModel> {
    let samples = data::generate_samples(config.n_samples, config.seed);
    TrainedModel::fit(&samples, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_samples: 300,
            n_trees: 15,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.2999999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.6999999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
        assert_eq!(RiskLevel::High.as_str(), "high");
    }

    #[test]
    fn too_few_samples_fail_training() {
        let samples = data::generate_samples(1, 42);
        assert!(matches!(
            TrainedModel::fit(&samples, &small_config()),
            Err(RiskError::Training(_))
        ));
    }

    #[test]
    fn trained_model_separates_extremes() {
        let model = train_model(&small_config()).unwrap();
        assert_eq!(model.info().n_trees, 15);
        assert_eq!(model.info().n_samples, 300);

        let (at_risk, p) = model.predict(&FeatureRecord::new(0.55, 55.0, 1.0, 62.0, 2.0)).unwrap();
        assert!(at_risk);
        assert!(p > 0.5);

        let (at_risk, p) = model.predict(&FeatureRecord::new(0.98, 97.0, 9.5, 98.0, 19.0)).unwrap();
        assert!(!at_risk);
        assert!(p < 0.5);
    }

    #[test]
    fn non_finite_input_is_an_inference_error() {
        let model = train_model(&small_config()).unwrap();
        let record = FeatureRecord::new(f64::NAN, 80.0, 5.0, 80.0, 10.0);
        assert!(matches!(model.predict(&record), Err(RiskError::Inference(_))));
    }

    #[test]
    fn missing_artifacts_are_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrainedModel::load(dir.path()).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn save_then_load_predicts_identically() {
        let dir = tempfile::tempdir().unwrap();
        let model = train_model(&small_config()).unwrap();
        model.save(dir.path()).unwrap();

        let (model_path, scaler_path) = artifact_paths(dir.path());
        assert!(model_path.is_file());
        assert!(scaler_path.is_file());

        let loaded = TrainedModel::load(dir.path()).unwrap();
        assert_eq!(loaded.info(), model.info());
        for sample in data::generate_samples(25, 9) {
            let record = sample.record();
            assert_eq!(loaded.predict(&record).unwrap(), model.predict(&record).unwrap());
        }
    }

    #[test]
    fn scaler_from_another_run_is_rejected() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        train_model(&small_config()).unwrap().save(dir_a.path()).unwrap();
        let other = TrainingConfig {
            n_samples: 40,
            seed: 7,
            n_trees: 5,
            ..TrainingConfig::default()
        };
        train_model(&other).unwrap().save(dir_b.path()).unwrap();

        fs::copy(dir_b.path().join(MODEL_FILE), dir_a.path().join(MODEL_FILE)).unwrap();

        let err = TrainedModel::load(dir_a.path()).unwrap_err();
        assert!(matches!(err, RiskError::MismatchedPair { .. }));
        assert!(!err.is_missing());
        assert!(TrainedModel::load(dir_b.path()).is_ok());
    }

    #[test]
    fn corrupt_artifact_is_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        train_model(&small_config()).unwrap().save(dir.path()).unwrap();
        fs::write(dir.path().join(SCALER_FILE), b"{ not json").unwrap();

        let err = TrainedModel::load(dir.path()).unwrap_err();
        assert!(matches!(err, RiskError::Serialization(_)));
        assert!(!err.is_missing());
    }
}
