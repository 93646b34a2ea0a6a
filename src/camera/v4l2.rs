use crate::common::config::CameraConfig;
use crate::common::{FacegateError, Result};
use crate::core::verify::FrameSource;
use image::{DynamicImage, ImageBuffer, Luma};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// V4L2 webcam. Only one session may stream at a time; the capture loop
/// blocks the calling flow on every frame.
pub struct Camera {
    device: Device,
    config: CameraConfig,
}

pub struct CameraSession<'a> {
    stream: v4l::io::mmap::Stream<'a>,
    format: v4l::Format,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let device = Device::new(config.device_index as usize).map_err(|e| {
            FacegateError::Camera(format!(
                "Failed to open camera {}: {}",
                config.device_index, e
            ))
        })?;

        let mut fmt = device
            .format()
            .map_err(|e| FacegateError::Camera(format!("Failed to get format: {}", e)))?;

        fmt.width = config.width;
        fmt.height = config.height;
        // Keep a grayscale format if the device already delivers one
        // (IR cameras), otherwise ask for raw YUYV so frames decode locally.
        if fmt.fourcc != FourCC::new(b"GREY") {
            fmt.fourcc = FourCC::new(b"YUYV");
        }

        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!(error = %e, "could not set exact camera format, using device defaults");
        }

        let actual = device
            .format()
            .map_err(|e| FacegateError::Camera(format!("Failed to get final format: {}", e)))?;
        tracing::info!(
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc.str().unwrap_or("????"),
            "camera opened"
        );

        Ok(Self {
            device,
            config: config.clone(),
        })
    }

    /// Start streaming. Warmup frames are drained here so exposure has
    /// settled before the first frame anyone sees.
    pub fn start_session(&mut self) -> Result<CameraSession<'_>> {
        let format = self
            .device
            .format()
            .map_err(|e| FacegateError::Camera(format!("Failed to get format: {}", e)))?;

        let mut stream =
            v4l::io::mmap::Stream::with_buffers(&mut self.device, Type::VideoCapture, 4)
                .map_err(|e| FacegateError::Camera(format!("Failed to create stream: {}", e)))?;

        for _ in 0..self.config.warmup_frames {
            stream
                .next()
                .map_err(|e| FacegateError::Camera(format!("Failed to capture warmup frame: {}", e)))?;
        }

        Ok(CameraSession { stream, format })
    }
}

impl CameraSession<'_> {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
        let width = self.format.width;
        let height = self.format.height;

        match &self.format.fourcc.repr {
            b"GREY" => {
                let buf = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data.to_vec())
                    .ok_or_else(|| {
                        FacegateError::Camera("Grayscale frame shorter than its format".into())
                    })?;
                Ok(DynamicImage::ImageLuma8(buf))
            }
            b"YUYV" => {
                // Every other byte is a luma sample.
                let luma: Vec<u8> = data.iter().step_by(2).copied().collect();
                let buf = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, luma).ok_or_else(
                    || FacegateError::Camera("YUYV frame shorter than its format".into()),
                )?;
                Ok(DynamicImage::ImageLuma8(buf))
            }
            other => Err(FacegateError::Camera(format!(
                "Unsupported camera format: {:?}",
                std::str::from_utf8(other).unwrap_or("????")
            ))),
        }
    }
}

impl FrameSource for CameraSession<'_> {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let (buf, _meta) = self
            .stream
            .next()
            .map_err(|e| FacegateError::Camera(format!("Failed to capture: {}", e)))?;
        let data = buf.to_vec();
        self.decode(&data).map(Some)
    }
}
