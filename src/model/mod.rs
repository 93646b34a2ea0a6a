pub mod artifacts;
pub mod classifier;
pub mod pca;
pub mod trainer;

pub use classifier::KernelSvc;
pub use pca::Pca;
pub use trainer::{TrainedModel, Trainer};
