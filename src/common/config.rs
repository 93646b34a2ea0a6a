use crate::common::error::{FacegateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    /// Minimum detection score for a box to count as a face.
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/face_detector.onnx"),
            input_width: 300,
            input_height: 300,
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeatureConfig {
    /// Side length of the square face crop; feature length is crop_size^2.
    pub crop_size: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { crop_size: 32 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainingConfig {
    /// A person directory needs at least this many images to enter training.
    pub min_sample: usize,
    pub desired_components: usize,
    pub holdout_ratio: f32,
    /// Grid search tries C = 1..=c_grid_max.
    pub c_grid_max: u32,
    pub gamma: f32,
    pub cv_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_sample: 15,
            desired_components: 150,
            holdout_ratio: 0.2,
            c_grid_max: 15,
            gamma: 0.001,
            cv_folds: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    /// Predictions at or below this probability collapse to "Unknown".
    pub confidence_threshold: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.70,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    pub required_matches: u32,
    pub max_mismatches: u32,
    pub max_missed_frames: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_matches: 3,
            max_mismatches: 10,
            max_missed_frames: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnrollmentConfig {
    /// Number of face-bearing frames captured per enrollment.
    pub target_captures: usize,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self { target_captures: 30 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
    pub warmup_frames: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            warmup_frames: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root for the image corpus, model artifacts, name map and accounts.
    pub data_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("facegate_data"),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| FacegateError::Other(anyhow::anyhow!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }
        if self.detector.confidence_threshold < 0.0 || self.detector.confidence_threshold > 1.0 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.confidence_threshold
            )));
        }
        if self.features.crop_size == 0 || self.features.crop_size > 1024 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Crop size must be between 1 and 1024, got {}",
                self.features.crop_size
            )));
        }
        if self.recognizer.confidence_threshold < 0.0 || self.recognizer.confidence_threshold > 1.0
        {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Recognizer confidence threshold must be between 0.0 and 1.0, got {}",
                self.recognizer.confidence_threshold
            )));
        }
        if self.training.min_sample == 0 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "min_sample must be at least 1"
            )));
        }
        if self.training.holdout_ratio <= 0.0 || self.training.holdout_ratio >= 1.0 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Holdout ratio must be strictly between 0.0 and 1.0, got {}",
                self.training.holdout_ratio
            )));
        }
        if self.training.c_grid_max == 0 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "c_grid_max must be at least 1"
            )));
        }
        if self.session.required_matches == 0 || self.session.max_mismatches == 0 {
            return Err(FacegateError::Other(anyhow::anyhow!(
                "Session counters must be at least 1"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.recognizer.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
