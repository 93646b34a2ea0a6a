use crate::core::detector::FaceRegion;
use image::{imageops::FilterType, DynamicImage};

/// Flat grayscale intensity vector of length crop_size^2, derived
/// deterministically from one face crop.
pub type FeatureVector = Vec<f32>;

pub struct FeatureExtractor {
    crop_size: u32,
}

impl FeatureExtractor {
    pub fn new(crop_size: u32) -> Self {
        Self { crop_size }
    }

    pub fn feature_len(&self) -> usize {
        (self.crop_size * self.crop_size) as usize
    }

    /// Crop the detected region, resize to crop_size x crop_size, convert to
    /// single-channel intensity and flatten. Returns `None` for a degenerate
    /// crop; that is a recoverable per-frame condition, not a fault.
    pub fn extract(&self, image: &DynamicImage, region: &FaceRegion) -> Option<FeatureVector> {
        let x1 = region.x1.max(0.0) as u32;
        let y1 = region.y1.max(0.0) as u32;
        let x2 = (region.x2 as u32).min(image.width());
        let y2 = (region.y2 as u32).min(image.height());

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let face = image.crop_imm(x1, y1, x2 - x1, y2 - y1);
        let resized = face.resize_exact(self.crop_size, self.crop_size, FilterType::Triangle);
        let gray = resized.to_luma8();

        Some(gray.as_raw().iter().map(|&p| p as f32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn test_image() -> DynamicImage {
        let buf = ImageBuffer::from_fn(100, 80, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 40]));
        DynamicImage::ImageRgb8(buf)
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(32);
        let img = test_image();
        let region = FaceRegion {
            x1: 10.0,
            y1: 5.0,
            x2: 70.0,
            y2: 60.0,
            confidence: 0.9,
        };

        let a = extractor.extract(&img, &region).unwrap();
        let b = extractor.extract(&img, &region).unwrap();
        assert_eq!(a.len(), 32 * 32);
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_region_yields_nothing() {
        let extractor = FeatureExtractor::new(32);
        let img = test_image();
        let region = FaceRegion {
            x1: 50.0,
            y1: 20.0,
            x2: 50.0,
            y2: 20.0,
            confidence: 0.9,
        };
        assert!(extractor.extract(&img, &region).is_none());
    }

    #[test]
    fn region_is_clamped_to_image_bounds() {
        let extractor = FeatureExtractor::new(32);
        let img = test_image();
        let region = FaceRegion {
            x1: -15.0,
            y1: -10.0,
            x2: 500.0,
            y2: 500.0,
            confidence: 0.9,
        };
        let features = extractor.extract(&img, &region).unwrap();
        assert_eq!(features.len(), extractor.feature_len());
    }
}
