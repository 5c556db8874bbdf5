//! Configuration module

use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Parameters of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Number of synthetic samples to generate
    pub n_samples: usize,

    /// Seed shared by the generator, the split and the bootstrap draws
    pub seed: u64,

    /// Number of trees in the ensemble
    pub n_trees: usize,

    /// Share of samples held out for scoring
    pub test_ratio: f64,

    /// Depth limit per tree, `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            n_trees: DEFAULT_TREES,
            test_ratio: DEFAULT_TEST_RATIO,
            max_depth: None,
        }
    }
}

/// Where the predictor keeps its artifacts and how it trains.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub model_dir: PathBuf,
    pub training: TrainingConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            training: TrainingConfig::default(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    pub predictor: PredictorConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = TrainingConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: parse_var("PORT").unwrap_or(8080),

            predictor: PredictorConfig {
                model_dir: env::var("MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR)),
                training: TrainingConfig {
                    n_samples: parse_var("TRAINING_SAMPLES").unwrap_or(defaults.n_samples),
                    seed: parse_var("TRAINING_SEED").unwrap_or(defaults.seed),
                    n_trees: parse_var("N_TREES").unwrap_or(defaults.n_trees),
                    test_ratio: parse_var("TEST_RATIO").unwrap_or(defaults.test_ratio),
                    max_depth: parse_var("MAX_DEPTH"),
                },
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
