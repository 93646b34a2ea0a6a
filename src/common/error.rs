use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacegateError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Already enrolled: {0}")]
    AlreadyEnrolled(String),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("More than one face detected")]
    AmbiguousDetection,

    #[error("Training requires at least 2 enrolled people, found {found}")]
    InsufficientClasses { found: usize },

    #[error("Enrollment aborted: {0}")]
    EnrollmentAborted(#[source] Box<FacegateError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::OrtError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FacegateError>;
