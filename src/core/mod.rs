pub mod detector;
pub mod enroll;
pub mod features;
pub mod identity;
pub mod recognizer;
pub mod session;
pub mod verify;

pub use detector::{FaceDetect, FaceRegion, OrtFaceDetector};
pub use enroll::Enroller;
pub use features::{FeatureExtractor, FeatureVector};
pub use recognizer::{Prediction, Recognize, Recognizer};
pub use session::{Outcome, Progress, VerificationSession};
pub use verify::{run_verification, FrameSource};
