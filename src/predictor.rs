//! Predictor facade.
//!
//! Owns the current [`TrainedModel`] behind a shared handle. Inference clones
//! the handle and runs without holding a lock; training builds the
//! replacement first and swaps it in once it is complete. Retrains are
//! serialized by a separate mutex.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PredictorConfig;
use crate::data::FeatureRecord;
use crate::error::{Result, RiskError};
use crate::model::{self, ModelInfo, RiskLevel, RiskPrediction, TrainedModel};
use crate::recommendations::{recommend, MAINTAIN_HABITS};

pub const FALLBACK_PROBABILITY: f64 = 0.2;

#[derive(Debug, Clone)]
enum ModelState {
    Untrained,
    /// `None` is the degraded state left behind by a failed training run.
    Ready(Option<Arc<TrainedModel>>),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictorState {
    Untrained,
    Ready,
    Degraded,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictorStatus {
    pub state: PredictorState,
    pub model: Option<ModelInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StudentFeatures {
    pub name: String,
    #[serde(flatten)]
    pub features: FeatureRecord,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StudentPrediction {
    pub name: String,
    #[serde(flatten)]
    pub prediction: RiskPrediction,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchSummary {
    pub at_risk_count: usize,
    pub low_count: usize,
    pub medium_count: usize,
    pub high_count: usize,
    pub avg_probability: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchPredictResponse {
    pub predictions: Vec<StudentPrediction>,
    pub summary: BatchSummary,
    pub total_students: usize,
}

/// The conservative answer given whenever no usable model exists.
pub fn fallback_prediction() -> RiskPrediction {
    RiskPrediction {
        at_risk: false,
        risk_probability: FALLBACK_PROBABILITY,
        risk_level: RiskLevel::Low,
        recommendations: vec![MAINTAIN_HABITS.to_string()],
    }
}

pub struct RiskPredictor {
    config: PredictorConfig,
    state: RwLock<ModelState>,
    retrain: Mutex<()>,
}

impl RiskPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ModelState::Untrained),
            retrain: Mutex::new(()),
        }
    }

    /// Builds the predictor and drives it to ready with train-or-load.
    pub fn initialize(config: PredictorConfig) -> Self {
        let predictor = Self::new(config);
        predictor.load();
        predictor
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Trains a fresh model, persists it and swaps it in.
    /// Returns the holdout accuracy, or `None` if training failed.
    pub fn train(&self) -> Option<f64> {
        let _guard = self.retrain.lock();
        self.train_locked()
    }

    /// Loads the persisted pair, training a new one if it is missing or unusable.
    pub fn load(&self) -> Option<f64> {
        let _guard = self.retrain.lock();
        self.load_locked()
    }

    fn train_locked(&self) -> Option<f64> {
        let training = &self.config.training;
        log::info!(
            "Training risk model on {} synthetic samples ({} trees, seed {})",
            training.n_samples,
            training.n_trees,
            training.seed
        );

        match model::train_model(training) {
            Ok(trained) => {
                let accuracy = trained.info().accuracy;
                log::info!("Model trained with holdout accuracy: {:.2}", accuracy);

                if let Err(e) = trained.save(&self.config.model_dir) {
                    log::error!(
                        "Could not persist model to {}: {}",
                        self.config.model_dir.display(),
                        e
                    );
                }

                self.install(Some(Arc::new(trained)));
                Some(accuracy)
            }
            Err(e) => {
                log::error!("Model training failed: {}", e);
                self.install(None);
                None
            }
        }
    }

    fn load_locked(&self) -> Option<f64> {
        let dir = &self.config.model_dir;
        match TrainedModel::load(dir) {
            Ok(loaded) => {
                let accuracy = loaded.info().accuracy;
                log::info!("Model loaded successfully from {}", dir.display());
                self.install(Some(Arc::new(loaded)));
                Some(accuracy)
            }
            Err(e) if e.is_missing() => {
                log::info!("Model files not found in {}. Training new model...", dir.display());
                self.train_locked()
            }
            Err(e) => {
                log::warn!(
                    "Persisted model in {} is unusable ({}). Training new model...",
                    dir.display(),
                    e
                );
                self.train_locked()
            }
        }
    }

    fn install(&self, trained: Option<Arc<TrainedModel>>) {
        *self.state.write() = ModelState::Ready(trained);
    }

    /// Current model handle, loading lazily if nothing was initialized yet.
    fn current_model(&self) -> Result<Arc<TrainedModel>> {
        if matches!(*self.state.read(), ModelState::Untrained) {
            let _guard = self.retrain.lock();
            if matches!(*self.state.read(), ModelState::Untrained) {
                self.load_locked();
            }
        }

        match &*self.state.read() {
            ModelState::Ready(Some(trained)) => Ok(Arc::clone(trained)),
            _ => Err(RiskError::ModelUnavailable),
        }
    }

    pub fn status(&self) -> PredictorStatus {
        match &*self.state.read() {
            ModelState::Untrained => PredictorStatus {
                state: PredictorState::Untrained,
                model: None,
            },
            ModelState::Ready(None) => PredictorStatus {
                state: PredictorState::Degraded,
                model: None,
            },
            ModelState::Ready(Some(trained)) => PredictorStatus {
                state: PredictorState::Ready,
                model: Some(trained.info().clone()),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), ModelState::Ready(Some(_)))
    }

    /// Like [`predict`](Self::predict) but reports why no real prediction was made.
    pub fn try_predict(&self, record: &FeatureRecord) -> Result<RiskPrediction> {
        let trained = self.current_model()?;
        predict_with(&trained, record)
    }

    /// Never fails; falls back to the low-risk default and logs why.
    pub fn predict(&self, record: &FeatureRecord) -> RiskPrediction {
        self.try_predict(record).unwrap_or_else(|e| fallback_for(&e))
    }

    pub fn predict_batch(&self, students: &[StudentFeatures]) -> BatchPredictResponse {
        let trained = self.current_model();

        let predictions: Vec<StudentPrediction> = students
            .iter()
            .map(|student| {
                let prediction = match &trained {
                    Ok(m) => predict_with(m, &student.features).unwrap_or_else(|e| fallback_for(&e)),
                    Err(e) => fallback_for(e),
                };
                StudentPrediction {
                    name: student.name.clone(),
                    prediction,
                }
            })
            .collect();

        let total_students = predictions.len();
        let mut summary = BatchSummary {
            at_risk_count: 0,
            low_count: 0,
            medium_count: 0,
            high_count: 0,
            avg_probability: 0.0,
        };

        for p in predictions.iter().map(|s| &s.prediction) {
            if p.at_risk {
                summary.at_risk_count += 1;
            }
            match p.risk_level {
                RiskLevel::Low => summary.low_count += 1,
                RiskLevel::Medium => summary.medium_count += 1,
                RiskLevel::High => summary.high_count += 1,
            }
            summary.avg_probability += p.risk_probability;
        }
        if total_students > 0 {
            summary.avg_probability /= total_students as f64;
        }

        BatchPredictResponse {
            predictions,
            summary,
            total_students,
        }
    }
}

fn predict_with(trained: &TrainedModel, record: &FeatureRecord) -> Result<RiskPrediction> {
    let (at_risk, risk_probability) = trained.predict(record)?;
    let risk_level = RiskLevel::from_probability(risk_probability);

    Ok(RiskPrediction {
        at_risk,
        risk_probability,
        risk_level,
        recommendations: recommend(record, risk_level),
    })
}

/// Logs the cause and returns the same sentinel used when no model exists.
/// Inference failures get no distinct "error" recommendation; callers that
/// need to tell them apart use [`RiskPredictor::try_predict`].
fn fallback_for(err: &RiskError) -> RiskPrediction {
    match err {
        RiskError::ModelUnavailable => {
            log::warn!("No trained model available, returning default prediction")
        }
        e => log::warn!("Prediction failed ({}), returning default prediction", e),
    }
    fallback_prediction()
}
