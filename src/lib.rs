//! At-risk student prediction.
//!
//! A bagged decision-tree classifier trained on reproducible synthetic
//! student records, a rule-based recommendation engine, and a facade that
//! trains or loads the model once and degrades to a safe default when no
//! model is usable.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod forest;
pub mod model;
pub mod predictor;
pub mod recommendations;
pub mod scaler;

pub use config::{Config, PredictorConfig, TrainingConfig};
pub use data::{FeatureRecord, LabeledSample};
pub use error::{Result, RiskError};
pub use model::{RiskLevel, RiskPrediction, TrainedModel};
pub use predictor::{RiskPredictor, PredictorState, PredictorStatus};
