use ndarray::{Array1, Array2};
use csv::{Reader, Writer};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

pub const FEATURE_COUNT: usize = 5;

/// Canonical column order used for training and inference.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "attendance_rate",
    "assignment_avg",
    "participation_score",
    "previous_grades",
    "study_hours",
];

/// Label rule weights; a sample is at risk once the weighted sum reaches `RISK_CUTOFF`.
const ATTENDANCE_WEIGHT: u32 = 3;
const ASSIGNMENT_WEIGHT: u32 = 2;
const PARTICIPATION_WEIGHT: u32 = 2;
const PREVIOUS_GRADES_WEIGHT: u32 = 2;
const STUDY_HOURS_WEIGHT: u32 = 1;
pub const RISK_CUTOFF: u32 = 5;

/// A student as supplied by the caller. Any field may be missing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct FeatureRecord {
    #[serde(default)]
    pub attendance_rate: Option<f64>,
    #[serde(default)]
    pub assignment_avg: Option<f64>,
    #[serde(default)]
    pub participation_score: Option<f64>,
    #[serde(default)]
    pub previous_grades: Option<f64>,
    #[serde(default)]
    pub study_hours: Option<f64>,
}

impl FeatureRecord {
    pub fn new(
        attendance_rate: f64,
        assignment_avg: f64,
        participation_score: f64,
        previous_grades: f64,
        study_hours: f64,
    ) -> Self {
        Self {
            attendance_rate: Some(attendance_rate),
            assignment_avg: Some(assignment_avg),
            participation_score: Some(participation_score),
            previous_grades: Some(previous_grades),
            study_hours: Some(study_hours),
        }
    }

    /// Model input in canonical order, missing fields become 0.
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.attendance_rate.unwrap_or(0.0),
            self.assignment_avg.unwrap_or(0.0),
            self.participation_score.unwrap_or(0.0),
            self.previous_grades.unwrap_or(0.0),
            self.study_hours.unwrap_or(0.0),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LabeledSample {
    pub attendance_rate: f64,
    pub assignment_avg: f64,
    pub participation_score: f64,
    pub previous_grades: f64,
    pub study_hours: f64,
    pub at_risk: u8,
}

impl LabeledSample {
    pub fn from_features(features: [f64; FEATURE_COUNT]) -> Self {
        let [attendance_rate, assignment_avg, participation_score, previous_grades, study_hours] =
            features;
        let at_risk = label_for(risk_score(&features));
        Self {
            attendance_rate,
            assignment_avg,
            participation_score,
            previous_grades,
            study_hours,
            at_risk,
        }
    }

    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.attendance_rate,
            self.assignment_avg,
            self.participation_score,
            self.previous_grades,
            self.study_hours,
        ]
    }

    pub fn record(&self) -> FeatureRecord {
        let f = self.features();
        FeatureRecord::new(f[0], f[1], f[2], f[3], f[4])
    }
}

/// Weighted count of risk indicators for one feature tuple.
pub fn risk_score(features: &[f64; FEATURE_COUNT]) -> u32 {
    let [attendance, assignment, participation, previous, study] = *features;
    let mut score = 0;

    if attendance < 0.7 {
        score += ATTENDANCE_WEIGHT;
    }
    if assignment < 70.0 {
        score += ASSIGNMENT_WEIGHT;
    }
    if participation < 5.0 {
        score += PARTICIPATION_WEIGHT;
    }
    if previous < 75.0 {
        score += PREVIOUS_GRADES_WEIGHT;
    }
    if study < 5.0 {
        score += STUDY_HOURS_WEIGHT;
    }

    score
}

pub fn label_for(score: u32) -> u8 {
    u8::from(score >= RISK_CUTOFF)
}

/// Draws `n_samples` labeled students. Each column is drawn in full before the
/// next one, all from a single ChaCha8 stream seeded with `seed`.
pub fn generate_samples(n_samples: usize, seed: u64) -> Vec<LabeledSample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ranges = [(0.5, 1.0), (50.0, 100.0), (0.0, 10.0), (60.0, 100.0), (1.0, 20.0)];

    let columns: Vec<Vec<f64>> = ranges
        .iter()
        .map(|&(low, high)| (0..n_samples).map(|_| rng.gen_range(low..high)).collect())
        .collect();

    (0..n_samples)
        .map(|i| {
            LabeledSample::from_features([
                columns[0][i],
                columns[1][i],
                columns[2][i],
                columns[3][i],
                columns[4][i],
            ])
        })
        .collect()
}

/// Seeded shuffle split. Returns `(train, holdout)`; the holdout takes the
/// first `ceil(n * test_ratio)` permuted samples.
pub fn train_test_split(
    samples: &[LabeledSample],
    test_ratio: f64,
    seed: u64,
) -> (Vec<LabeledSample>, Vec<LabeledSample>) {
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((samples.len() as f64) * test_ratio.clamp(0.0, 1.0)).ceil() as usize;
    let (test_idx, train_idx) = indices.split_at(n_test.min(samples.len()));

    let pick = |idx: &[usize]| idx.iter().map(|&i| samples[i]).collect::<Vec<_>>();
    (pick(train_idx), pick(test_idx))
}

pub fn to_records(samples: &[LabeledSample]) -> Array2<f64> {
    Array2::from_shape_fn((samples.len(), FEATURE_COUNT), |(i, j)| samples[i].features()[j])
}

pub fn to_targets(samples: &[LabeledSample]) -> Array1<usize> {
    samples.iter().map(|s| s.at_risk as usize).collect()
}

pub fn write_samples_csv<P: AsRef<Path>>(path: P, samples: &[LabeledSample]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for sample in samples {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_samples_csv<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledSample>> {
    let mut rdr = Reader::from_path(path)?;
    let mut samples = Vec::new();

    for result in rdr.deserialize() {
        let sample: LabeledSample = result?;
        samples.push(sample);
    }

    Ok(samples)
}

pub fn class_distribution(samples: &[LabeledSample]) -> (usize, usize) {
    let at_risk = samples.iter().filter(|s| s.at_risk == 1).count();
    (at_risk, samples.len() - at_risk)
}
