use crate::common::{Config, FacegateError, Result};
use image::DynamicImage;
use ndarray::{Array4, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::sync::Arc;

/// One detected face, axis-aligned, in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRegion {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

/// Detector collaborator contract: a frame yields zero or one face. More
/// than one qualifying detection is a frame-level failure and collapses to
/// `None` rather than an arbitrary pick. `Err` is reserved for real faults
/// (model failure, bad input), never for "nothing found".
pub trait FaceDetect {
    fn detect(&self, image: &DynamicImage) -> Result<Option<FaceRegion>>;
}

/// SSD face detector running through ONNX Runtime. Input is a 300x300 BGR
/// blob with per-channel mean subtraction; output rows are
/// [_, _, score, x1, y1, x2, y2] with normalized coordinates.
pub struct OrtFaceDetector {
    session: Session,
    _environment: Arc<Environment>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
}

// Mean subtraction values for the SSD face model, BGR order.
const MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];

impl OrtFaceDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .build()
                .map_err(|e| {
                    FacegateError::Model(format!("Failed to create environment: {}", e))
                })?,
        );

        let model_path = &config.detector.model_path;
        if !model_path.exists() {
            return Err(FacegateError::Model(format!(
                "Detector model not found at: {:?}",
                model_path
            )));
        }

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        Ok(Self {
            session,
            _environment: environment,
            input_width: config.detector.input_width,
            input_height: config.detector.input_height,
            confidence_threshold: config.detector.confidence_threshold,
        })
    }

    fn image_to_blob(&self, img: &DynamicImage) -> Array4<f32> {
        let rgb = img.to_rgb8();
        let width = rgb.width() as usize;
        let height = rgb.height() as usize;
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        for y in 0..height {
            for x in 0..width {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                // BGR channel order, matching the Caffe-trained model.
                array[[0, 0, y, x]] = pixel[2] as f32 - MEAN_BGR[0];
                array[[0, 1, y, x]] = pixel[1] as f32 - MEAN_BGR[1];
                array[[0, 2, y, x]] = pixel[0] as f32 - MEAN_BGR[2];
            }
        }

        array
    }

    fn parse_detections(&self, outputs: &[Value], orig_w: f32, orig_h: f32) -> Result<Vec<FaceRegion>> {
        let output = outputs
            .first()
            .ok_or_else(|| FacegateError::Model("Detector produced no output".into()))?
            .try_extract::<f32>()?
            .view()
            .to_owned();

        let flat = output
            .as_slice()
            .ok_or_else(|| FacegateError::Model("Non-contiguous detector output".into()))?;

        // Output shape is [1, 1, N, 7].
        let mut faces = Vec::new();
        for row in flat.chunks_exact(7) {
            let score = row[2];
            if score > self.confidence_threshold {
                faces.push(FaceRegion {
                    x1: (row[3] * orig_w).clamp(0.0, orig_w),
                    y1: (row[4] * orig_h).clamp(0.0, orig_h),
                    x2: (row[5] * orig_w).clamp(0.0, orig_w),
                    y2: (row[6] * orig_h).clamp(0.0, orig_h),
                    confidence: score,
                });
            }
        }

        Ok(faces)
    }
}

impl FaceDetect for OrtFaceDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<FaceRegion>> {
        let orig_w = image.width() as f32;
        let orig_h = image.height() as f32;

        let blob = if image.width() == self.input_width && image.height() == self.input_height {
            self.image_to_blob(image)
        } else {
            let resized = image.resize_exact(
                self.input_width,
                self.input_height,
                image::imageops::FilterType::Nearest,
            );
            self.image_to_blob(&resized)
        };

        let cow_array = CowArray::from(blob.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let faces = self.parse_detections(&outputs, orig_w, orig_h)?;

        if faces.len() > 1 {
            tracing::debug!(
                count = faces.len(),
                "multiple faces in frame, treating as no detection"
            );
            return Ok(None);
        }
        Ok(faces.into_iter().next())
    }
}
