use std::env;
use std::path::{Path, PathBuf};

use anyhow::Error;
use log::{debug, info};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::face_emotion::error::RecognitionError;

/// Frontal face cascade bundled with OpenCV.
pub const CASCADE_NAME: &str = "haarcascade_frontalface_default.xml";

/// Directories the OpenCV packages install their haar cascades into.
const CASCADE_DIRS: [&str; 4] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
];

/// Scale factor used by the face pass.
pub const SCALE_FACTOR: f64 = 1.1;

/// Minimum neighbors used by the face pass.
pub const MIN_NEIGHBORS: i32 = 4;

/// Locates faces, then the inner face region inside a face crop.
pub trait FaceLocator {
    /// Face boxes in `gray` frame coordinates.
    fn locate_faces(&mut self, gray: &Mat) -> Result<Vec<Rect>, Error>;

    /// Boxes inside `face_gray`, relative to the crop.
    fn locate_inner(&mut self, face_gray: &Mat) -> Result<Vec<Rect>, Error>;
}

/// Resolve the cascade file to load.
///
/// An explicit path is used as is when it exists. Otherwise `OPENCV_DATA_DIR`
/// and the usual OpenCV install locations are searched for [`CASCADE_NAME`].
pub fn resolve_cascade_path(cascade_path: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = cascade_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(RecognitionError::CascadeNotFound(path.display().to_string()).into());
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(dir) = env::var("OPENCV_DATA_DIR") {
        candidates.push(PathBuf::from(&dir).join(CASCADE_NAME));
        candidates.push(PathBuf::from(dir).join("haarcascades").join(CASCADE_NAME));
    }
    candidates.extend(CASCADE_DIRS.iter().map(|dir| Path::new(dir).join(CASCADE_NAME)));

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            RecognitionError::CascadeNotFound(format!("{} in OPENCV_DATA_DIR or {:?}", CASCADE_NAME, CASCADE_DIRS))
                .into()
        })
}

/// Haar cascade face detector. The classifier is loaded once and reused for
/// both the face pass and the inner pass.
pub struct CascadeFaceDetector {
    cascade_path: PathBuf,
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl CascadeFaceDetector {
    pub fn new(cascade_path: Option<&Path>) -> Result<CascadeFaceDetector, Error> {
        let cascade_path = resolve_cascade_path(cascade_path)?;
        let path_str = cascade_path
            .to_str()
            .ok_or_else(|| Error::msg(format!("cascade path {:?} is not valid UTF-8", cascade_path)))?;

        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(RecognitionError::EmptyCascade(cascade_path).into());
        }
        info!("loaded haar cascade {:?}", cascade_path);

        Ok(CascadeFaceDetector {
            cascade_path,
            classifier,
            scale_factor: SCALE_FACTOR,
            min_neighbors: MIN_NEIGHBORS,
        })
    }

    pub fn with_params(mut self, scale_factor: f64, min_neighbors: i32) -> Self {
        self.scale_factor = scale_factor;
        self.min_neighbors = min_neighbors;
        self
    }

    pub fn cascade_path(&self) -> &Path {
        &self.cascade_path
    }
}

impl FaceLocator for CascadeFaceDetector {
    fn locate_faces(&mut self, gray: &Mat) -> Result<Vec<Rect>, Error> {
        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            gray,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::new(0, 0),
            Size::new(0, 0),
        )?;
        debug!("cascade found {} face(s)", faces.len());
        Ok(faces.to_vec())
    }

    fn locate_inner(&mut self, face_gray: &Mat) -> Result<Vec<Rect>, Error> {
        let mut regions = Vector::<Rect>::new();
        self.classifier.detect_multi_scale_def(face_gray, &mut regions)?;
        Ok(regions.to_vec())
    }
}
