use crate::common::config::RecognizerConfig;
use crate::common::{DataLayout, Result};
use crate::core::features::FeatureVector;
use crate::model::artifacts;
use crate::model::trainer::TrainedModel;
use crate::storage::name_map::UNKNOWN_LABEL;

/// One per-frame recognition result. `label` is a PersonDirectoryKey (or the
/// unknown sentinel), never a display name; `confidence_pct` is reported
/// even when the label collapsed to unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence_pct: f32,
}

/// Seam for the verification driver; lets tests script per-frame results.
pub trait Recognize {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;
}

/// Applies a loaded transform/classifier pair to one live feature vector.
/// The recognizer holds its pair for its whole lifetime; a retrain that
/// lands new artifacts on disk does not affect it until it is reloaded.
pub struct Recognizer {
    model: TrainedModel,
    confidence_threshold: f32,
}

impl Recognizer {
    pub fn load(layout: &DataLayout, config: &RecognizerConfig) -> Result<Self> {
        Ok(Self::from_model(
            artifacts::load_pair(layout)?,
            config.confidence_threshold,
        ))
    }

    pub fn from_model(model: TrainedModel, confidence_threshold: f32) -> Self {
        Self {
            model,
            confidence_threshold,
        }
    }
}

impl Recognize for Recognizer {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let projected = self.model.transform.project(features);
        let (label, proba) = self.model.classifier.predict(&projected);
        Ok(resolve_prediction(label, proba, self.confidence_threshold))
    }
}

/// Collapse a low-confidence arg-max to the unknown sentinel. The boundary
/// is exclusive: a probability exactly at the threshold is unknown. The
/// confidence is reported as a percentage rounded to one decimal, and the
/// cut is applied to the rounded value.
pub fn resolve_prediction(label: String, proba: f32, threshold: f32) -> Prediction {
    let confidence_pct = (proba * 1000.0).round() / 10.0;
    let threshold_pct = threshold * 100.0;
    let label = if confidence_pct > threshold_pct {
        label
    } else {
        UNKNOWN_LABEL.to_string()
    };
    Prediction {
        label,
        confidence_pct,
    }
}
