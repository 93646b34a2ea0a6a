use crate::common::paths::{write_atomic, DataLayout};
use crate::common::{FacegateError, Result};
use crate::model::classifier::KernelSvc;
use crate::model::pca::Pca;
use crate::model::trainer::TrainedModel;

/// Persist the transform/classifier pair, unconditionally replacing any
/// prior pair. Each artifact is written to a temp file and renamed so a
/// concurrent reader holding the old pair is never handed a torn file.
pub fn save_pair(model: &TrainedModel, layout: &DataLayout) -> Result<()> {
    let transform_bytes = bincode::serialize(&model.transform)
        .map_err(|e| FacegateError::Storage(format!("Failed to serialize transform: {}", e)))?;
    let classifier_bytes = bincode::serialize(&model.classifier)
        .map_err(|e| FacegateError::Storage(format!("Failed to serialize classifier: {}", e)))?;

    write_atomic(&layout.transform_path(), &transform_bytes)?;
    write_atomic(&layout.classifier_path(), &classifier_bytes)?;

    tracing::info!(
        transform = %layout.transform_path().display(),
        classifier = %layout.classifier_path().display(),
        "persisted model pair"
    );
    Ok(())
}

/// Load both artifacts of the pair. The two are only valid together; a
/// missing half means no usable model exists yet.
pub fn load_pair(layout: &DataLayout) -> Result<TrainedModel> {
    let transform_path = layout.transform_path();
    let classifier_path = layout.classifier_path();

    if !transform_path.exists() || !classifier_path.exists() {
        return Err(FacegateError::Model(
            "Model pair not found; enroll at least two people to train one".into(),
        ));
    }

    let transform: Pca = bincode::deserialize(&std::fs::read(&transform_path)?)
        .map_err(|e| FacegateError::Storage(format!("Failed to deserialize transform: {}", e)))?;
    let classifier: KernelSvc = bincode::deserialize(&std::fs::read(&classifier_path)?)
        .map_err(|e| FacegateError::Storage(format!("Failed to deserialize classifier: {}", e)))?;

    Ok(TrainedModel {
        transform,
        classifier,
    })
}
