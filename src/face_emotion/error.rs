use std::path::PathBuf;
use thiserror::Error;

/// Failures callers may want to tell apart. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Cannot open webcam (tried indices {0:?})")]
    CameraUnavailable(Vec<i32>),

    #[error("Cannot open video file {0:?}")]
    VideoFileUnavailable(PathBuf),

    #[error("haar cascade not found: {0}")]
    CascadeNotFound(String),

    #[error("haar cascade {0:?} loaded but is empty")]
    EmptyCascade(PathBuf),

    #[error("incompatible model: {0}")]
    IncompatibleModel(String),

    #[error("crop {0:?} does not intersect the frame")]
    EmptyCrop((i32, i32, i32, i32)),

    #[error("unknown emotion label {0:?}")]
    UnknownLabel(String),
}
