use crate::common::{DataLayout, FacegateError, Result};
use crate::core::detector::FaceDetect;
use crate::core::features::FeatureExtractor;
use crate::core::verify::FrameSource;
use crate::model::artifacts;
use crate::model::trainer::Trainer;
use crate::storage::accounts::{AccountStore, AccountUpdate};
use crate::storage::corpus::CorpusScanner;
use crate::storage::name_map::NameMap;
use std::fs;
use std::path::Path;

/// Unique corpus directory name for one person: username plus the display
/// name lowercased with all whitespace removed. Usernames are unique, so
/// the key survives display-name collisions.
pub fn person_directory_key(username: &str, name: &str) -> String {
    let squashed: String = name.to_lowercase().split_whitespace().collect();
    format!("{}_{}", username, squashed)
}

pub struct Enroller<'a> {
    detector: &'a dyn FaceDetect,
    extractor: &'a FeatureExtractor,
    trainer: &'a Trainer,
    layout: &'a DataLayout,
    min_sample: usize,
    target_captures: usize,
}

impl<'a> Enroller<'a> {
    pub fn new(
        detector: &'a dyn FaceDetect,
        extractor: &'a FeatureExtractor,
        trainer: &'a Trainer,
        layout: &'a DataLayout,
        min_sample: usize,
        target_captures: usize,
    ) -> Self {
        Self {
            detector,
            extractor,
            trainer,
            layout,
            min_sample,
            target_captures,
        }
    }

    /// Capture a fresh sample set for `username`, rebuild the dataset over
    /// the whole corpus, retrain and persist the model pair, and mark the
    /// account. Transactional: any failure after the person directory is
    /// created removes that directory and all its contents before the error
    /// surfaces, leaving the corpus exactly as it was.
    pub fn enroll(
        &self,
        frames: &mut dyn FrameSource,
        store: &dyn AccountStore,
        username: &str,
    ) -> Result<String> {
        let account = store
            .find_by_username(username)?
            .ok_or_else(|| FacegateError::AccountNotFound(username.to_string()))?;

        let key = person_directory_key(username, &account.name);
        let person_dir = self.layout.corpus_dir().join(&key);
        if person_dir.exists() {
            return Err(FacegateError::AlreadyEnrolled(key));
        }
        fs::create_dir_all(&person_dir)?;

        match self.capture_and_retrain(frames, store, &account.id, &account.name, &key, &person_dir)
        {
            Ok(()) => Ok(key),
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&person_dir) {
                    tracing::warn!(
                        dir = %person_dir.display(),
                        error = %cleanup,
                        "failed to remove partial enrollment directory"
                    );
                }
                Err(FacegateError::EnrollmentAborted(Box::new(e)))
            }
        }
    }

    fn capture_and_retrain(
        &self,
        frames: &mut dyn FrameSource,
        store: &dyn AccountStore,
        account_id: &str,
        display_name: &str,
        key: &str,
        person_dir: &Path,
    ) -> Result<()> {
        self.capture_samples(frames, person_dir)?;

        let scanner = CorpusScanner::new(self.detector, self.extractor, self.min_sample);
        let dataset = scanner.register_new_data(&self.layout.corpus_dir(), key)?;

        let mut names = NameMap::load_or_default(&self.layout.name_map_path());
        names.insert(key, display_name);
        names.save(&self.layout.name_map_path())?;

        let model = self.trainer.train(&dataset)?;
        artifacts::save_pair(&model, self.layout)?;

        store.update_fields(
            account_id,
            AccountUpdate {
                face_added: Some(true),
                ..AccountUpdate::default()
            },
        )?;

        tracing::info!(person = %key, "enrollment complete");
        Ok(())
    }

    /// Record frames until `target_captures` of them contain a detectable
    /// face. Whole frames are stored, not crops; the dataset rebuild runs
    /// detection again on its own terms. Frames without a face are skipped.
    fn capture_samples(&self, frames: &mut dyn FrameSource, person_dir: &Path) -> Result<()> {
        let mut saved = 0usize;
        while saved < self.target_captures {
            let frame = frames.next_frame()?.ok_or_else(|| {
                FacegateError::Camera(format!(
                    "Frame source closed after {} of {} captures",
                    saved, self.target_captures
                ))
            })?;

            if self.detector.detect(&frame)?.is_none() {
                continue;
            }

            frame.save(person_dir.join(format!("img_{}.jpg", saved)))?;
            saved += 1;
        }
        Ok(())
    }
}
