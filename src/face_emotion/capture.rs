use std::path::{Path, PathBuf};

use anyhow::Error;
use log::{error, info, warn};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY};

use crate::face_emotion::error::RecognitionError;

/// Camera indices tried in order: an external webcam first, then the built-in one.
pub const DEFAULT_CAMERA_INDICES: [i32; 2] = [1, 0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// First device that opens wins.
    Cameras(Vec<i32>),
    File(PathBuf),
}

impl Default for VideoSource {
    fn default() -> Self {
        VideoSource::Cameras(DEFAULT_CAMERA_INDICES.to_vec())
    }
}

/// Anything the session loop can pull frames from.
pub trait FrameSource {
    fn description(&self) -> &str;

    /// Next frame, or `None` once the stream has no more frames.
    fn read_frame(&mut self) -> Result<Option<Mat>, Error>;

    fn release(&mut self) -> Result<(), Error>;
}

/// Owns the capture device and releases it on drop.
pub struct Camera {
    capture: VideoCapture,
    description: String,
    released: bool,
}

impl Camera {
    pub fn open_source(source: &VideoSource) -> Result<Camera, Error> {
        match source {
            VideoSource::Cameras(indices) => Self::open(indices),
            VideoSource::File(path) => Self::from_file(path),
        }
    }

    /// Try each camera index in order.
    pub fn open(indices: &[i32]) -> Result<Camera, Error> {
        for &index in indices {
            match VideoCapture::new(index, CAP_ANY) {
                Ok(capture) if capture.is_opened()? => {
                    info!("opened camera {}", index);
                    return Ok(Camera {
                        capture,
                        description: format!("camera {}", index),
                        released: false,
                    });
                }
                Ok(_) => warn!("camera {} did not open", index),
                Err(e) => warn!("camera {} failed: {}", index, e),
            }
        }
        Err(RecognitionError::CameraUnavailable(indices.to_vec()).into())
    }

    /// Read frames from a video file instead of a device.
    pub fn from_file(path: &Path) -> Result<Camera, Error> {
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::msg(format!("video path {:?} is not valid UTF-8", path)))?;
        let capture = VideoCapture::from_file(path_str, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(RecognitionError::VideoFileUnavailable(path.to_path_buf()).into());
        }
        info!("opened video file {:?}", path);

        Ok(Camera {
            capture,
            description: path.display().to_string(),
            released: false,
        })
    }
}

impl FrameSource for Camera {
    fn description(&self) -> &str {
        &self.description
    }

    fn read_frame(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<(), Error> {
        if !self.released {
            self.released = true;
            self.capture.release()?;
            info!("released {}", self.description);
        }
        Ok(())
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("Error releasing {}: {}", self.description, e);
        }
    }
}
