//! Severity prediction: the tensor validation contract and the inference
//! seam where a trained model replaces the random placeholder.

use crate::error::PipelineError;
use crate::models::{ModelInfo, MODEL_INFO};
use crate::preprocess::{INPUT_CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};
use crate::severity::SeverityClass;
use ndarray::{ArrayD, ArrayView4, Ix4};
use rand::distr::{Distribution, Open01};
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tract_onnx::prelude::*;

/// The only tensor shape the predictor accepts.
pub const EXPECTED_SHAPE: [usize; 4] = [
    1,
    INPUT_HEIGHT as usize,
    INPUT_WIDTH as usize,
    INPUT_CHANNELS,
];

/// Confidence bounds reported by the placeholder policy.
pub const PLACEHOLDER_CONFIDENCE_MIN: f32 = 75.0;
pub const PLACEHOLDER_CONFIDENCE_MAX: f32 = 98.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub class: SeverityClass,
    /// Percentage in `[0, 100]`.
    pub confidence: f32,
}

/// Per-class probabilities as percentages; the three values sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub minor_damage: f32,
    pub moderate_damage: f32,
    pub severe_crash: f32,
}

impl ClassProbabilities {
    pub fn from_percentages(values: [f32; 3]) -> Self {
        Self {
            minor_damage: values[0],
            moderate_damage: values[1],
            severe_crash: values[2],
        }
    }

    pub fn get(&self, class: SeverityClass) -> f32 {
        match class {
            SeverityClass::MinorDamage => self.minor_damage,
            SeverityClass::ModerateDamage => self.moderate_damage,
            SeverityClass::SevereCrash => self.severe_crash,
        }
    }

    pub fn total(&self) -> f32 {
        self.minor_damage + self.moderate_damage + self.severe_crash
    }
}

/// The inference seam. Implementations only choose scores; the validation
/// contract and output invariants live in [`SeverityPredictor`] and must not
/// change when a policy is swapped.
pub trait SeverityModel: Send + Sync {
    fn predict(&self, input: ArrayView4<f32>) -> Result<PredictionResult, PipelineError>;

    fn class_probabilities(
        &self,
        input: ArrayView4<f32>,
    ) -> Result<ClassProbabilities, PipelineError>;
}

/// Placeholder policy used while no trained model is available: a uniformly
/// random class with a uniformly random confidence in the placeholder range.
#[derive(Debug, Default)]
pub struct RandomSeverityModel;

impl RandomSeverityModel {
    pub fn new() -> Self {
        Self
    }
}

impl SeverityModel for RandomSeverityModel {
    fn predict(&self, _input: ArrayView4<f32>) -> Result<PredictionResult, PipelineError> {
        let mut rng = rand::rng();
        let class = SeverityClass::ALL[rng.random_range(0..SeverityClass::ALL.len())];
        let confidence =
            rng.random_range(PLACEHOLDER_CONFIDENCE_MIN..=PLACEHOLDER_CONFIDENCE_MAX);
        Ok(PredictionResult { class, confidence })
    }

    fn class_probabilities(
        &self,
        _input: ArrayView4<f32>,
    ) -> Result<ClassProbabilities, PipelineError> {
        let mut rng = rand::rng();
        // Three Exp(1) draws renormalized are a symmetric Dirichlet(1,1,1)
        // sample over the three classes.
        let mut draws = [0.0f32; 3];
        for draw in draws.iter_mut() {
            let u: f32 = Open01.sample(&mut rng);
            *draw = -u.ln();
        }
        let total: f32 = draws.iter().sum();
        Ok(ClassProbabilities::from_percentages([
            draws[0] / total * 100.0,
            draws[1] / total * 100.0,
            draws[2] / total * 100.0,
        ]))
    }
}

/// Model-backed policy: an ONNX plan over the NHWC input tensor. Softmax is
/// applied to the three outputs so the probability invariants hold whatever
/// the exported model emits.
pub struct OnnxSeverityModel {
    plan: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
}

impl OnnxSeverityModel {
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let plan = onnx()
            .model_for_path(model_path)
            .map_err(PipelineError::inference)?
            .into_optimized()
            .map_err(PipelineError::inference)?
            .into_runnable()
            .map_err(PipelineError::inference)?;
        Ok(Self { plan })
    }

    fn scores(&self, input: ArrayView4<f32>) -> Result<[f32; 3], PipelineError> {
        let tensor = tract_ndarray::Array4::from_shape_vec(
            (
                1,
                INPUT_HEIGHT as usize,
                INPUT_WIDTH as usize,
                INPUT_CHANNELS,
            ),
            input.iter().copied().collect(),
        )
        .map_err(PipelineError::inference)?
        .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(PipelineError::inference)?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(PipelineError::inference)?;

        let logits: Vec<f32> = view.iter().copied().collect();
        if logits.len() != SeverityClass::ALL.len() {
            return Err(PipelineError::inference(format!(
                "model produced {} outputs, expected {}",
                logits.len(),
                SeverityClass::ALL.len()
            )));
        }

        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        Ok([exps[0] / total, exps[1] / total, exps[2] / total])
    }
}

impl SeverityModel for OnnxSeverityModel {
    fn predict(&self, input: ArrayView4<f32>) -> Result<PredictionResult, PipelineError> {
        let scores = self.scores(input)?;
        let (class_idx, top) = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, &score)| (idx, score))
            .unwrap_or((0, scores[0]));
        Ok(PredictionResult {
            class: SeverityClass::ALL[class_idx],
            confidence: top * 100.0,
        })
    }

    fn class_probabilities(
        &self,
        input: ArrayView4<f32>,
    ) -> Result<ClassProbabilities, PipelineError> {
        let scores = self.scores(input)?;
        Ok(ClassProbabilities::from_percentages([
            scores[0] * 100.0,
            scores[1] * 100.0,
            scores[2] * 100.0,
        ]))
    }
}

/// One-time model initialization. Returns the shared, read-only policy handle
/// that every request borrows; nothing here is mutated after startup.
pub fn load_model(model_path: Option<&Path>) -> Result<Arc<dyn SeverityModel>, PipelineError> {
    match model_path {
        Some(path) => {
            log::info!("loading severity model from {}", path.display());
            let model = OnnxSeverityModel::load(path)?;
            log::info!("severity model loaded");
            Ok(Arc::new(model))
        }
        None => {
            log::info!("no model configured, serving random placeholder predictions");
            Ok(Arc::new(RandomSeverityModel::new()))
        }
    }
}

/// Owns the input contract: every operation validates shape and element
/// values before the policy runs, whichever policy is plugged in.
#[derive(Clone)]
pub struct SeverityPredictor {
    model: Arc<dyn SeverityModel>,
}

impl SeverityPredictor {
    pub fn new(model: Arc<dyn SeverityModel>) -> Self {
        Self { model }
    }

    pub fn predict(&self, tensor: &ArrayD<f32>) -> Result<PredictionResult, PipelineError> {
        let input = validate(tensor)?;
        self.model.predict(input)
    }

    pub fn class_probabilities(
        &self,
        tensor: &ArrayD<f32>,
    ) -> Result<ClassProbabilities, PipelineError> {
        let input = validate(tensor)?;
        self.model.class_probabilities(input)
    }

    pub fn model_info(&self) -> ModelInfo {
        MODEL_INFO
    }
}

fn validate(tensor: &ArrayD<f32>) -> Result<ArrayView4<'_, f32>, PipelineError> {
    let view = tensor
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| PipelineError::InvalidShape {
            expected: EXPECTED_SHAPE,
            actual: tensor.shape().to_vec(),
        })?;

    if view.dim()
        != (
            EXPECTED_SHAPE[0],
            EXPECTED_SHAPE[1],
            EXPECTED_SHAPE[2],
            EXPECTED_SHAPE[3],
        )
    {
        return Err(PipelineError::InvalidShape {
            expected: EXPECTED_SHAPE,
            actual: tensor.shape().to_vec(),
        });
    }

    if let Some(bad) = tensor.iter().find(|v| !v.is_finite()) {
        return Err(PipelineError::InvalidType {
            message: format!("tensor contains non-finite value {bad}"),
        });
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array4, IxDyn};
    use std::collections::HashSet;

    fn valid_tensor() -> ArrayD<f32> {
        Array4::<f32>::zeros((1, 224, 224, 3)).into_dyn()
    }

    fn random_predictor() -> SeverityPredictor {
        SeverityPredictor::new(Arc::new(RandomSeverityModel::new()))
    }

    #[test]
    fn placeholder_confidence_stays_in_documented_range() {
        let predictor = random_predictor();
        let tensor = valid_tensor();
        for _ in 0..100 {
            let result = predictor.predict(&tensor).unwrap();
            assert!(result.confidence >= PLACEHOLDER_CONFIDENCE_MIN);
            assert!(result.confidence <= PLACEHOLDER_CONFIDENCE_MAX);
        }
    }

    #[test]
    fn placeholder_draws_every_class() {
        let predictor = random_predictor();
        let tensor = valid_tensor();
        let mut seen = HashSet::new();
        for _ in 0..300 {
            seen.insert(predictor.predict(&tensor).unwrap().class);
        }
        assert_eq!(seen.len(), SeverityClass::ALL.len());
    }

    #[test]
    fn probabilities_are_nonnegative_and_sum_to_hundred() {
        let predictor = random_predictor();
        let tensor = valid_tensor();
        for _ in 0..100 {
            let probs = predictor.class_probabilities(&tensor).unwrap();
            assert!(probs.minor_damage >= 0.0);
            assert!(probs.moderate_damage >= 0.0);
            assert!(probs.severe_crash >= 0.0);
            assert!((probs.total() - 100.0).abs() < 1e-3, "sum {}", probs.total());
        }
    }

    #[test]
    fn probability_accessor_matches_fields() {
        let probs = ClassProbabilities::from_percentages([10.0, 30.0, 60.0]);
        assert_eq!(probs.get(SeverityClass::MinorDamage), 10.0);
        assert_eq!(probs.get(SeverityClass::ModerateDamage), 30.0);
        assert_eq!(probs.get(SeverityClass::SevereCrash), 60.0);
    }

    #[test]
    fn two_dimensional_input_is_rejected_as_shape_error() {
        let predictor = random_predictor();
        let flat = ArrayD::<f32>::zeros(IxDyn(&[224, 224]));
        assert!(matches!(
            predictor.predict(&flat),
            Err(PipelineError::InvalidShape { .. })
        ));
        assert!(matches!(
            predictor.class_probabilities(&flat),
            Err(PipelineError::InvalidShape { .. })
        ));
    }

    #[test]
    fn wrong_dimensions_are_rejected() {
        let predictor = random_predictor();
        for shape in [
            vec![1usize, 224, 224, 1],
            vec![2, 224, 224, 3],
            vec![1, 112, 224, 3],
            vec![1, 224, 224, 3, 1],
        ] {
            let tensor = ArrayD::<f32>::zeros(IxDyn(&shape));
            assert!(
                matches!(
                    predictor.predict(&tensor),
                    Err(PipelineError::InvalidShape { .. })
                ),
                "shape {shape:?}"
            );
        }
    }

    #[test]
    fn non_finite_data_is_rejected_as_type_error() {
        let predictor = random_predictor();
        let mut tensor = valid_tensor();
        tensor[[0, 10, 10, 1]] = f32::NAN;
        assert!(matches!(
            predictor.predict(&tensor),
            Err(PipelineError::InvalidType { .. })
        ));
    }

    struct PanickingModel;

    impl SeverityModel for PanickingModel {
        fn predict(&self, _input: ArrayView4<f32>) -> Result<PredictionResult, PipelineError> {
            panic!("policy must not run on invalid input");
        }

        fn class_probabilities(
            &self,
            _input: ArrayView4<f32>,
        ) -> Result<ClassProbabilities, PipelineError> {
            panic!("policy must not run on invalid input");
        }
    }

    #[test]
    fn validation_runs_before_any_policy_work() {
        let predictor = SeverityPredictor::new(Arc::new(PanickingModel));
        let flat = ArrayD::<f32>::zeros(IxDyn(&[224, 224]));
        assert!(predictor.predict(&flat).is_err());
        assert!(predictor.class_probabilities(&flat).is_err());
    }

    #[test]
    fn model_info_is_static_and_stable() {
        let predictor = random_predictor();
        let info = predictor.model_info();
        assert_eq!(info.num_classes, 3);
        assert_eq!(info.input_shape, (224, 224, 3));
        assert_eq!(predictor.model_info(), info);
    }
}
