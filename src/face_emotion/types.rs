use std::fmt;
use std::str::FromStr;

use ndarray::Array4;
use opencv::core::Rect;
use serde::Deserialize;

use crate::face_emotion::error::RecognitionError;
use crate::face_emotion::render::{Color, Colors};

/// NHWC tensor data obtained from a face crop, batch axis included.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    pub tensor_data: Array4<f32>,
    /// Size of the crop before resizing (width, height).
    pub original_size: (i32, i32),
}

impl ImageTensor {
    pub fn new(tensor_data: Array4<f32>, original_size: (i32, i32)) -> Self {
        Self {
            tensor_data,
            original_size,
        }
    }

    /// Tensor size as (width, height).
    pub fn size(&self) -> (usize, usize) {
        let shape = self.tensor_data.shape();
        (shape[2], shape[1])
    }
}

/// Pixel bounding box with exclusive max corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BBox {
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }

    pub fn empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn area(&self) -> i64 {
        if self.empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    pub fn intersect(&self, other: &BBox) -> Option<BBox> {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        let xmax = self.xmax.min(other.xmax);
        let ymax = self.ymax.min(other.ymax);

        if xmin < xmax && ymin < ymax {
            Some(BBox::new(xmin, ymin, xmax, ymax))
        } else {
            None
        }
    }

    /// Shift the box by (dx, dy), e.g. to go from face-relative to frame coordinates.
    pub fn offset(&self, dx: i32, dy: i32) -> BBox {
        BBox::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }
}

impl From<Rect> for BBox {
    fn from(rect: Rect) -> Self {
        BBox::new(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height)
    }
}

impl From<BBox> for Rect {
    fn from(bbox: BBox) -> Self {
        Rect::new(bbox.xmin, bbox.ymin, bbox.width(), bbox.height())
    }
}

/// The fixed emotion label set. Deserializes from a label name, case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }

    /// Overlay color of the label.
    pub fn color(&self) -> Color {
        match self {
            Emotion::Angry | Emotion::Disgust | Emotion::Fear | Emotion::Sad => Colors::RED,
            Emotion::Happy | Emotion::Neutral | Emotion::Surprise => Colors::GREEN,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .iter()
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| RecognitionError::UnknownLabel(s.to_string()))
    }
}

impl TryFrom<String> for Emotion {
    type Error = RecognitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Raw score vector returned by the emotion model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub scores: Vec<f32>,
}

impl Prediction {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    /// Index of the first maximum score, `None` for an empty vector.
    pub fn argmax(&self) -> Option<usize> {
        crate::face_emotion::transform::argmax(&self.scores)
    }

    /// Score at the argmax index.
    pub fn confidence(&self) -> Option<f32> {
        self.argmax().map(|index| self.scores[index])
    }
}
