// Core modules
pub mod camera;
pub mod common;
pub mod core;
pub mod model;
pub mod storage;

// Re-export commonly used types
pub use common::{Config, DataLayout, FacegateError, Result};
pub use core::{
    run_verification, Enroller, FaceDetect, FaceRegion, FeatureExtractor, FeatureVector,
    FrameSource, Outcome, OrtFaceDetector, Prediction, Recognize, Recognizer, VerificationSession,
};
pub use model::{KernelSvc, Pca, TrainedModel, Trainer};
pub use storage::{
    AccountRecord, AccountStore, CorpusScanner, Dataset, FileAccountStore, NameMap, UNKNOWN_LABEL,
};
