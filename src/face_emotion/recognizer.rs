use anyhow::Error;
use log::debug;
use opencv::core::{Mat, Rect};
use opencv::imgproc::{cvt_color_def, COLOR_BGR2GRAY};

use crate::face_emotion::emotion_classifier::EmotionModel;
use crate::face_emotion::face_detection::FaceLocator;
use crate::face_emotion::labels::LabelPolicy;
use crate::face_emotion::transform::{crop, image_to_tensor, largest_rect};
use crate::face_emotion::types::{BBox, Emotion, Prediction};

/// Everything found in one frame. Built fresh per frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    /// All face boxes, frame coordinates.
    pub faces: Vec<Rect>,
    /// Largest face box.
    pub primary_face: Option<Rect>,
    /// Region that was classified, frame coordinates.
    pub crop_region: Option<Rect>,
    pub prediction: Option<Prediction>,
    pub label: Option<Emotion>,
}

impl FrameAnalysis {
    pub fn has_face(&self) -> bool {
        !self.faces.is_empty()
    }
}

/// Preprocessing applied to a crop before it reaches the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorOptions {
    pub output_range: (f64, f64),
    pub swap_rb: bool,
}

impl Default for TensorOptions {
    fn default() -> Self {
        Self {
            output_range: (0.0, 1.0),
            swap_rb: false,
        }
    }
}

/// Face detection, cropping, classification and labeling for a single frame.
pub struct EmotionRecognizer<L: FaceLocator, M: EmotionModel> {
    locator: L,
    model: M,
    policy: LabelPolicy,
    tensor_options: TensorOptions,
}

impl<L: FaceLocator, M: EmotionModel> EmotionRecognizer<L, M> {
    pub fn new(locator: L, model: M, policy: LabelPolicy) -> Self {
        Self {
            locator,
            model,
            policy,
            tensor_options: TensorOptions::default(),
        }
    }

    pub fn with_tensor_options(mut self, tensor_options: TensorOptions) -> Self {
        self.tensor_options = tensor_options;
        self
    }

    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// Run the pipeline on a BGR frame.
    ///
    /// The classified region is the last inner region found inside the largest
    /// face. A frame without a face or without an inner region has no prediction.
    pub fn analyze(&mut self, frame: &Mat) -> Result<FrameAnalysis, Error> {
        let mut gray = Mat::default();
        cvt_color_def(frame, &mut gray, COLOR_BGR2GRAY)?;

        let faces = self.locator.locate_faces(&gray)?;
        let primary_face = match largest_rect(&faces) {
            Some(face) => face,
            None => {
                debug!("no face in frame");
                return Ok(FrameAnalysis { faces, ..Default::default() });
            }
        };

        let face_gray = crop(&gray, primary_face)?;
        let inner = self.locator.locate_inner(&face_gray)?;
        let region = match inner.last() {
            Some(region) => Rect::from(BBox::from(*region).offset(primary_face.x, primary_face.y)),
            None => {
                debug!("Face not detected inside {:?}", primary_face);
                return Ok(FrameAnalysis {
                    faces,
                    primary_face: Some(primary_face),
                    ..Default::default()
                });
            }
        };

        let face_color = crop(frame, region)?;
        let tensor = image_to_tensor(
            &face_color,
            self.model.input_size(),
            self.tensor_options.output_range,
            self.tensor_options.swap_rb,
        )?;
        let prediction = self.model.predict(&tensor)?;
        let label = prediction.argmax().and_then(|index| self.policy.label(index));
        debug!("prediction {:?} label {:?}", prediction.scores, label);

        Ok(FrameAnalysis {
            faces,
            primary_face: Some(primary_face),
            crop_region: Some(region),
            prediction: Some(prediction),
            label,
        })
    }
}
