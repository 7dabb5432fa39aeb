use std::path::PathBuf;

use crate::face_emotion::capture::VideoSource;
use crate::face_emotion::display::WINDOW_TITLE;
use crate::face_emotion::face_detection::{MIN_NEIGHBORS, SCALE_FACTOR};
use crate::face_emotion::labels::LabelPolicy;
use crate::face_emotion::recognizer::TensorOptions;

/// Settings for one recognition session.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    pub source: VideoSource,
    /// `None` searches the OpenCV data directories.
    pub cascade_path: Option<PathBuf>,
    pub model_path: PathBuf,
    pub label_policy: LabelPolicy,
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub tensor_options: TensorOptions,
    pub window_title: String,
    /// `None` runs without a window.
    pub wait_ms: Option<i32>,
    pub max_frames: Option<u64>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            source: VideoSource::default(),
            cascade_path: None,
            model_path: PathBuf::from("./models/emotion.tflite"),
            label_policy: LabelPolicy::default(),
            scale_factor: SCALE_FACTOR,
            min_neighbors: MIN_NEIGHBORS,
            tensor_options: TensorOptions::default(),
            window_title: WINDOW_TITLE.to_string(),
            wait_ms: Some(2),
            max_frames: None,
        }
    }
}

impl RecognitionConfig {
    pub fn headless(&self) -> bool {
        self.wait_ms.is_none()
    }

    /// Whether the session should stop after `frames` frames.
    pub fn frame_limit_reached(&self, frames: u64) -> bool {
        self.max_frames.is_some_and(|max| frames >= max)
    }
}
