use crate::common::config::SessionConfig;
use crate::common::Result;
use crate::core::detector::FaceDetect;
use crate::core::features::FeatureExtractor;
use crate::core::identity;
use crate::core::recognizer::Recognize;
use crate::core::session::{Outcome, Progress, VerificationSession};
use crate::storage::accounts::AccountRecord;
use crate::storage::name_map::{NameMap, UNKNOWN_LABEL};
use image::DynamicImage;

/// Blocking frame supplier. One active source at a time; a caller aborts a
/// running verification by closing the source (`Ok(None)`).
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// Drive one verification attempt over a live frame stream. Each frame runs
/// detection, feature extraction, recognition and the per-account identity
/// hash check; the session counters turn the per-frame stream into a single
/// terminal outcome. The loop stops the instant a counter reaches its
/// limit and never reads further frames.
pub fn run_verification(
    frames: &mut dyn FrameSource,
    detector: &dyn FaceDetect,
    extractor: &FeatureExtractor,
    recognizer: &dyn Recognize,
    names: &NameMap,
    account: &AccountRecord,
    limits: SessionConfig,
) -> Result<Outcome> {
    let mut session = VerificationSession::new(limits);

    loop {
        let frame = match frames.next_frame()? {
            Some(frame) => frame,
            // Source closed under us; the attempt dies without a decision.
            None => return Ok(Outcome::Abandoned),
        };

        let region = match detector.detect(&frame)? {
            Some(region) => region,
            None => {
                if let Progress::Done(outcome) = session.note_missed_frame() {
                    return Ok(outcome);
                }
                continue;
            }
        };

        let features = match extractor.extract(&frame, &region) {
            Some(features) => features,
            None => {
                if let Progress::Done(outcome) = session.note_missed_frame() {
                    return Ok(outcome);
                }
                continue;
            }
        };

        let prediction = recognizer.predict(&features)?;
        // Classifier labels are directory keys; anything the map does not
        // know is treated as the unknown sentinel, which can never chain to
        // a stored hash.
        let display_name = names.display_name(&prediction.label);

        let matched = display_name != UNKNOWN_LABEL
            && identity::verify_at_login(
                display_name,
                &account.username,
                &account.id,
                &account.hash_face,
            );

        tracing::debug!(
            label = %prediction.label,
            confidence_pct = prediction.confidence_pct,
            matched,
            "verification frame"
        );

        if let Progress::Done(outcome) = session.note_match(matched) {
            return Ok(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::FaceRegion;
    use crate::core::features::FeatureVector;
    use crate::core::recognizer::Prediction;
    use image::{ImageBuffer, Luma};
    use std::cell::RefCell;

    struct QueueFrames {
        frames: Vec<DynamicImage>,
    }

    impl QueueFrames {
        fn solid(count: usize) -> Self {
            let frames = (0..count)
                .map(|_| DynamicImage::ImageLuma8(ImageBuffer::from_pixel(64, 64, Luma([128u8]))))
                .collect();
            Self { frames }
        }

        fn remaining(&self) -> usize {
            self.frames.len()
        }
    }

    impl FrameSource for QueueFrames {
        fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
            if self.frames.is_empty() {
                return Ok(None);
            }
            Ok(Some(self.frames.remove(0)))
        }
    }

    struct FullFrameDetector;

    impl FaceDetect for FullFrameDetector {
        fn detect(&self, image: &DynamicImage) -> Result<Option<FaceRegion>> {
            Ok(Some(FaceRegion {
                x1: 0.0,
                y1: 0.0,
                x2: image.width() as f32,
                y2: image.height() as f32,
                confidence: 0.9,
            }))
        }
    }

    struct BlindDetector;

    impl FaceDetect for BlindDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Option<FaceRegion>> {
            Ok(None)
        }
    }

    /// Recognizer scripted with one label per frame; repeats the last.
    struct ScriptedRecognizer {
        labels: RefCell<Vec<&'static str>>,
    }

    impl ScriptedRecognizer {
        fn new(labels: &[&'static str]) -> Self {
            let mut labels: Vec<_> = labels.to_vec();
            labels.reverse();
            Self {
                labels: RefCell::new(labels),
            }
        }
    }

    impl Recognize for ScriptedRecognizer {
        fn predict(&self, _features: &FeatureVector) -> Result<Prediction> {
            let mut labels = self.labels.borrow_mut();
            let label = if labels.len() > 1 {
                labels.pop().unwrap()
            } else {
                labels[0]
            };
            Ok(Prediction {
                label: label.to_string(),
                confidence_pct: 91.0,
            })
        }
    }

    fn enrolled_account() -> (AccountRecord, NameMap) {
        let id = "5f2a9c0d1e2f3a4b5c6d7e8f".to_string();
        let hash_face = identity::derive_at_enrollment("duca", "Duc Anh", &id);
        let account = AccountRecord {
            id,
            name: "Duc Anh".to_string(),
            username: "duca".to_string(),
            face_added: true,
            hash_pass: identity::hash_password("pw"),
            hash_face,
        };
        let mut names = NameMap::default();
        names.insert("duca_ducanh", "Duc Anh");
        names.insert("julie_julie", "Julie");
        (account, names)
    }

    #[test]
    fn accepts_on_third_match_without_reading_more_frames() {
        let (account, names) = enrolled_account();
        let mut frames = QueueFrames::solid(8);
        let recognizer = ScriptedRecognizer::new(&[
            "duca_ducanh",
            "julie_julie",
            "duca_ducanh",
            "julie_julie",
            "duca_ducanh",
            "duca_ducanh",
        ]);

        let outcome = run_verification(
            &mut frames,
            &FullFrameDetector,
            &FeatureExtractor::new(16),
            &recognizer,
            &names,
            &account,
            SessionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Accepted);
        // Accepted on the fifth frame; the remaining three are untouched.
        assert_eq!(frames.remaining(), 3);
    }

    #[test]
    fn ten_mismatches_reject() {
        let (account, names) = enrolled_account();
        let mut frames = QueueFrames::solid(15);
        let recognizer = ScriptedRecognizer::new(&["julie_julie"]);

        let outcome = run_verification(
            &mut frames,
            &FullFrameDetector,
            &FeatureExtractor::new(16),
            &recognizer,
            &names,
            &account,
            SessionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(frames.remaining(), 5);
    }

    #[test]
    fn unknown_label_counts_as_mismatch() {
        let (account, names) = enrolled_account();
        let mut frames = QueueFrames::solid(15);
        // A label with no map entry resolves to the unknown sentinel.
        let recognizer = ScriptedRecognizer::new(&["stranger_sue"]);

        let outcome = run_verification(
            &mut frames,
            &FullFrameDetector,
            &FeatureExtractor::new(16),
            &recognizer,
            &names,
            &account,
            SessionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Rejected);
    }

    #[test]
    fn faceless_frames_abandon_the_session() {
        let (account, names) = enrolled_account();
        let mut frames = QueueFrames::solid(60);
        let recognizer = ScriptedRecognizer::new(&["duca_ducanh"]);

        let outcome = run_verification(
            &mut frames,
            &BlindDetector,
            &FeatureExtractor::new(16),
            &recognizer,
            &names,
            &account,
            SessionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Abandoned);
        assert_eq!(frames.remaining(), 10);
    }

    #[test]
    fn closed_frame_source_abandons() {
        let (account, names) = enrolled_account();
        let mut frames = QueueFrames::solid(0);
        let recognizer = ScriptedRecognizer::new(&["duca_ducanh"]);

        let outcome = run_verification(
            &mut frames,
            &FullFrameDetector,
            &FeatureExtractor::new(16),
            &recognizer,
            &names,
            &account,
            SessionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Abandoned);
    }
}
