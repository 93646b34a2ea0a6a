use crate::common::config::TrainingConfig;
use crate::common::{FacegateError, Result};
use crate::model::classifier::KernelSvc;
use crate::model::pca::Pca;
use crate::storage::corpus::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// The jointly-fit transform + classifier pair. Superseded as a whole on
/// every enrollment, never patched; a transform and classifier fit on
/// different datasets are an invalid pairing.
#[derive(Debug)]
pub struct TrainedModel {
    pub transform: Pca,
    pub classifier: KernelSvc,
}

// Fixed shuffle seed so the train/holdout split is reproducible run to run.
const SPLIT_SEED: u64 = 42;

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit the pair over the accumulated dataset. Blocking and CPU-bound;
    /// this is the single most expensive operation in the system and runs
    /// to completion before the new pair can be loaded by anyone.
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModel> {
        let distinct = dataset.distinct_labels();
        if distinct.len() < 2 {
            return Err(FacegateError::InsufficientClasses {
                found: distinct.len(),
            });
        }

        let n = dataset.len();
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(SPLIT_SEED));

        let holdout_len = ((n as f32 * self.config.holdout_ratio).round() as usize)
            .max(1)
            .min(n - 1);
        let (holdout_idx, train_idx) = indices.split_at(holdout_len);

        // The transform is fit on the full feature set, not just the train
        // split; this stabilizes the axes under small sample counts.
        let n_components = self.config.desired_components.min(train_idx.len().saturating_sub(1));
        let transform = Pca::fit(&dataset.features, n_components.max(1))?;

        let train_x: Vec<Vec<f32>> = train_idx
            .iter()
            .map(|&i| transform.project(&dataset.features[i]))
            .collect();
        let train_y: Vec<String> = train_idx.iter().map(|&i| dataset.labels[i].clone()).collect();

        let best_c = self.grid_search(&train_x, &train_y)?;
        tracing::info!(best_c, "grid search selected regularization");

        let classifier = KernelSvc::fit(&train_x, &train_y, best_c, self.config.gamma)?;

        let holdout_hits = holdout_idx
            .iter()
            .filter(|&&i| {
                let projected = transform.project(&dataset.features[i]);
                classifier.predict(&projected).0 == dataset.labels[i]
            })
            .count();
        tracing::info!(
            holdout_hits,
            holdout_len = holdout_idx.len(),
            classes = distinct.len(),
            "trained transform/classifier pair"
        );

        Ok(TrainedModel {
            transform,
            classifier,
        })
    }

    /// Pick C from 1..=c_grid_max by k-fold cross-validation accuracy over
    /// the transformed training split. Kernel and gamma stay fixed.
    fn grid_search(&self, x: &[Vec<f32>], labels: &[String]) -> Result<f32> {
        let folds = self.config.cv_folds.max(2).min(x.len());
        let mut best = (1.0f32, -1.0f64);

        for c in 1..=self.config.c_grid_max {
            let c = c as f32;
            let accuracy = self.cv_accuracy(x, labels, c, folds)?;
            tracing::debug!(c, accuracy, "cross-validation fold sweep");
            if accuracy > best.1 {
                best = (c, accuracy);
            }
        }

        Ok(best.0)
    }

    fn cv_accuracy(&self, x: &[Vec<f32>], labels: &[String], c: f32, folds: usize) -> Result<f64> {
        let mut hits = 0usize;
        let mut total = 0usize;

        for fold in 0..folds {
            let mut train_x = Vec::new();
            let mut train_y = Vec::new();
            let mut test_idx = Vec::new();
            for i in 0..x.len() {
                if i % folds == fold {
                    test_idx.push(i);
                } else {
                    train_x.push(x[i].clone());
                    train_y.push(labels[i].clone());
                }
            }
            if train_x.is_empty() || test_idx.is_empty() {
                continue;
            }

            let svc = KernelSvc::fit(&train_x, &train_y, c, self.config.gamma)?;
            for i in test_idx {
                if svc.predict(&x[i]).0 == labels[i] {
                    hits += 1;
                }
                total += 1;
            }
        }

        if total == 0 {
            return Ok(0.0);
        }
        Ok(hits as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_dataset(classes: &[(&str, f32)], per_class: usize) -> Dataset {
        let mut dataset = Dataset::default();
        for &(label, center) in classes {
            for i in 0..per_class {
                let jitter = i as f32 * 0.3;
                let row: Vec<f32> = (0..16)
                    .map(|j| center + jitter + (j as f32 * 0.01))
                    .collect();
                dataset.features.push(row);
                dataset.labels.push(label.to_string());
            }
        }
        dataset
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            min_sample: 15,
            desired_components: 8,
            holdout_ratio: 0.2,
            c_grid_max: 3,
            gamma: 0.05,
            cv_folds: 3,
        }
    }

    #[test]
    fn single_class_is_a_fatal_precondition() {
        let trainer = Trainer::new(quick_config());
        let dataset = synthetic_dataset(&[("solo_user", 0.0)], 20);
        match trainer.train(&dataset) {
            Err(FacegateError::InsufficientClasses { found }) => assert_eq!(found, 1),
            other => panic!("expected InsufficientClasses, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn separable_classes_classify_their_own_samples() {
        let trainer = Trainer::new(quick_config());
        let dataset = synthetic_dataset(&[("alice_a", 0.0), ("bob_b", 120.0)], 12);
        let model = trainer.train(&dataset).unwrap();

        for (features, label) in dataset.features.iter().zip(&dataset.labels) {
            let projected = model.transform.project(features);
            let (pred, _) = model.classifier.predict(&projected);
            assert_eq!(&pred, label);
        }
    }

    #[test]
    fn component_count_respects_training_size() {
        let trainer = Trainer::new(quick_config());
        let dataset = synthetic_dataset(&[("alice_a", 0.0), ("bob_b", 120.0)], 4);
        let model = trainer.train(&dataset).unwrap();
        assert!(model.transform.n_components() < dataset.len());
    }
}
