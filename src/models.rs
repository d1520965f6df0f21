//! Response bodies for the HTTP layer, plus the static model metadata.

use crate::predictor::{ClassProbabilities, PredictionResult};
use crate::severity::SeverityClass;
use serde::Serialize;

/// Static descriptive record for the deployed classifier. Built once,
/// never mutated; repeated reads are identical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: &'static str,
    pub architecture: &'static str,
    pub input_shape: (u32, u32, u32),
    pub num_classes: usize,
    pub accuracy: f32,
    pub training_samples: u32,
    pub version: &'static str,
}

pub const MODEL_INFO: ModelInfo = ModelInfo {
    model_name: "AccidentSeverityNet",
    architecture: "EfficientNetB0",
    input_shape: (224, 224, 3),
    num_classes: 3,
    accuracy: 94.2,
    training_samples: 15_000,
    version: "v1.0",
};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub severity: SeverityClass,
    pub label: &'static str,
    pub description: &'static str,
    pub confidence: f32,
    pub color: &'static str,
    pub emoji: &'static str,
    pub recommendations: &'static [&'static str],
    pub probabilities: ClassProbabilities,
}

impl PredictionResponse {
    pub fn new(result: PredictionResult, probabilities: ClassProbabilities) -> Self {
        let class = result.class;
        Self {
            severity: class,
            label: class.label(),
            description: class.description(),
            confidence: result.confidence,
            color: class.color(),
            emoji: class.emoji(),
            recommendations: class.recommendations(),
            probabilities,
        }
    }
}
