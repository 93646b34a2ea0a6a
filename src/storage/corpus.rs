use crate::common::Result;
use crate::core::detector::FaceDetect;
use crate::core::features::{FeatureExtractor, FeatureVector};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Parallel feature/label sequences over every qualifying person directory.
/// Labels are PersonDirectoryKeys, not display names.
#[derive(Debug, Default)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn distinct_labels(&self) -> BTreeSet<&str> {
        self.labels.iter().map(|l| l.as_str()).collect()
    }
}

/// Walks the per-person image corpus and materializes training data.
pub struct CorpusScanner<'a> {
    detector: &'a dyn FaceDetect,
    extractor: &'a FeatureExtractor,
    min_sample: usize,
}

impl<'a> CorpusScanner<'a> {
    pub fn new(
        detector: &'a dyn FaceDetect,
        extractor: &'a FeatureExtractor,
        min_sample: usize,
    ) -> Self {
        Self {
            detector,
            extractor,
            min_sample,
        }
    }

    /// Scan immediate subdirectories of `root`. A directory enters training
    /// only if it holds at least `min_sample` files; anything below the
    /// threshold is excluded entirely, not under-weighted. Images with no
    /// detectable (or an ambiguous) face are skipped silently.
    pub fn build_dataset(&self, root: &Path) -> Result<Dataset> {
        let mut dataset = Dataset::default();

        let mut person_dirs: Vec<_> = fs::read_dir(root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        person_dirs.sort_by_key(|e| e.file_name());

        for entry in person_dirs {
            let dir = entry.path();
            let key = entry.file_name().to_string_lossy().to_string();

            let mut image_paths: Vec<_> = fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            image_paths.sort();

            if image_paths.len() < self.min_sample {
                tracing::info!(
                    person = %key,
                    files = image_paths.len(),
                    min_sample = self.min_sample,
                    "person directory below sample threshold, excluded from training"
                );
                continue;
            }

            for path in image_paths {
                let img = match image::open(&path) {
                    Ok(img) => img,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "unreadable image skipped");
                        continue;
                    }
                };

                let region = match self.detector.detect(&img)? {
                    Some(region) => region,
                    None => continue,
                };

                if let Some(features) = self.extractor.extract(&img, &region) {
                    dataset.features.push(features);
                    dataset.labels.push(key.clone());
                }
            }
        }

        tracing::info!(
            samples = dataset.len(),
            people = dataset.distinct_labels().len(),
            "built dataset from corpus"
        );
        Ok(dataset)
    }

    /// Incremental entry point after an enrollment. The whole corpus is
    /// re-scanned, never just the new person: the classifier's label space
    /// changes whenever a person is added or removed, so retraining is
    /// always global.
    pub fn register_new_data(&self, root: &Path, person_key: &str) -> Result<Dataset> {
        tracing::info!(person = %person_key, "rebuilding dataset after enrollment");
        self.build_dataset(root)
    }
}
