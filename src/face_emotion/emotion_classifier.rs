use std::path::{Path, PathBuf};

use anyhow::Error;
use log::{debug, info, warn};
use tflite::ops::builtin::BuiltinOpResolver;
use tflite::{FlatBufferModel, InterpreterBuilder};

use crate::face_emotion::error::RecognitionError;
use crate::face_emotion::types::{ImageTensor, Prediction};

/// Number of classes the overlay labels are defined for.
pub const NUM_EMOTIONS: usize = 7;

/// Image classifier producing one score per emotion class.
pub trait EmotionModel {
    /// Input size as (width, height).
    fn input_size(&self) -> (i32, i32);

    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, Error>;
}

/// Emotion classifier exported to TensorFlow Lite.
///
/// The model is an external artifact: its input must be `[1, H, W, 3]` float32
/// and its first output holds the class scores. The interpreter borrows the
/// flatbuffer, so one is built per [`EmotionModel::predict`] call.
pub struct TfliteEmotionModel {
    model_path: PathBuf,
    model: FlatBufferModel,
    input_shape: Vec<usize>,
    num_classes: usize,
}

impl TfliteEmotionModel {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<TfliteEmotionModel, Error> {
        let model_path_buf = model_path.as_ref().to_path_buf();
        let model = FlatBufferModel::build_from_file(model_path_buf.clone())
            .map_err(|e| Error::msg(format!("failed to load model {:?}: {}", model_path_buf, e)))?;

        let (input_details, output_details) = {
            let resolver = BuiltinOpResolver::default();
            let builder = InterpreterBuilder::new(&model, &resolver)?;
            let mut interpreter = builder.build()?;
            interpreter.allocate_tensors()?;
            (interpreter.get_input_details()?, interpreter.get_output_details()?)
        };

        let input_shape = input_details
            .first()
            .map(|info| info.dims.clone())
            .ok_or(RecognitionError::IncompatibleModel("model has no inputs".to_string()))?;
        if input_shape.len() != 4 || input_shape[3] != 3 {
            return Err(RecognitionError::IncompatibleModel(format!(
                "expected input [1, H, W, 3], got {:?}",
                input_shape
            ))
            .into());
        }

        let output_shape = output_details
            .first()
            .map(|info| info.dims.clone())
            .ok_or(RecognitionError::IncompatibleModel("model has no outputs".to_string()))?;
        let num_classes = output_shape.last().copied().unwrap_or(0);
        if num_classes == 0 {
            return Err(RecognitionError::IncompatibleModel(format!("empty output {:?}", output_shape)).into());
        }
        if num_classes != NUM_EMOTIONS {
            warn!("model predicts {} classes, overlay labels expect {}", num_classes, NUM_EMOTIONS);
        }

        info!("loaded emotion model {:?} input {:?} classes {}", model_path_buf, input_shape, num_classes);

        Ok(TfliteEmotionModel {
            model_path: model_path_buf,
            model,
            input_shape,
            num_classes,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl EmotionModel for TfliteEmotionModel {
    fn input_size(&self) -> (i32, i32) {
        (self.input_shape[2] as i32, self.input_shape[1] as i32)
    }

    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, Error> {
        let expected: usize = self.input_shape.iter().product();
        if tensor.tensor_data.len() != expected {
            return Err(Error::msg(format!(
                "tensor shape {:?} does not match model input {:?}",
                tensor.tensor_data.shape(),
                self.input_shape
            )));
        }

        let resolver = BuiltinOpResolver::default();
        let builder = InterpreterBuilder::new(&self.model, &resolver)?;
        let mut interpreter = builder.build()?;
        interpreter.allocate_tensors()?;

        let inputs = interpreter.inputs().to_vec();
        let input_index = inputs[0];
        let input_data: Vec<f32> = tensor.tensor_data.iter().copied().collect();
        interpreter.tensor_data_mut(input_index)?.copy_from_slice(&input_data);
        interpreter.invoke()?;

        let outputs = interpreter.outputs().to_vec();
        let scores: &[f32] = interpreter.tensor_data(outputs[0])?;
        debug!("emotion scores {:?}", scores);

        Ok(Prediction::new(scores.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_an_error() {
        let err = match TfliteEmotionModel::new("/nonexistent/emotion.tflite") {
            Ok(_) => panic!("model should not load"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("emotion.tflite"));
    }

    #[test]
    fn test_emotion_model() {
        let path = std::env::var("EMOTION_MODEL").unwrap_or_else(|_| "./models/emotion.tflite".to_string());
        let model = match TfliteEmotionModel::new(&path) {
            Ok(model) => model,
            Err(e) => {
                println!("{:?}", e);
                return;
            }
        };

        let (width, height) = model.input_size();
        let tensor = ImageTensor::new(
            ndarray::Array4::<f32>::zeros((1, height as usize, width as usize, 3)),
            (width, height),
        );
        let prediction = model.predict(&tensor).unwrap();
        assert_eq!(prediction.scores.len(), model.num_classes());
    }
}
