use std::collections::HashMap;

use anyhow::Error;
use log::{debug, info, warn};
use opencv::core::{Mat, Point};
use opencv::prelude::*;

use crate::face_emotion::capture::{Camera, FrameSource};
use crate::face_emotion::config::RecognitionConfig;
use crate::face_emotion::display::Window;
use crate::face_emotion::emotion_classifier::{EmotionModel, TfliteEmotionModel};
use crate::face_emotion::face_detection::{CascadeFaceDetector, FaceLocator};
use crate::face_emotion::recognizer::{EmotionRecognizer, FrameAnalysis};
use crate::face_emotion::render::{annotate, draw_text_box, Colors};
use crate::face_emotion::types::Emotion;

const NO_FACE_TEXT: &str = "No face detected";

/// Counters collected over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub labelled_frames: u64,
    pub labels: HashMap<Emotion, u64>,
}

impl SessionSummary {
    pub fn record(&mut self, analysis: &FrameAnalysis) {
        self.frames += 1;
        if let Some(label) = analysis.label {
            self.labelled_frames += 1;
            *self.labels.entry(label).or_insert(0) += 1;
        }
    }
}

/// Annotate a frame for display; frames without a face get a status line.
pub fn render_frame(frame: &mut Mat, analysis: &FrameAnalysis) -> Result<(), Error> {
    annotate(frame, analysis)?;
    if !analysis.has_face() {
        let rows = frame.rows();
        draw_text_box(frame, NO_FACE_TEXT, Point::new(10, rows - 25), 1.5, Colors::WHITE, Colors::BLACK)?;
    }
    Ok(())
}

/// Build the cascade detector and tflite model described by `config`.
pub fn build_recognizer(
    config: &RecognitionConfig,
) -> Result<EmotionRecognizer<CascadeFaceDetector, TfliteEmotionModel>, Error> {
    let detector = CascadeFaceDetector::new(config.cascade_path.as_deref())?
        .with_params(config.scale_factor, config.min_neighbors);
    let model = TfliteEmotionModel::new(&config.model_path)?;
    info!(
        "cascade {:?}, model {:?} with {} classes",
        detector.cascade_path(),
        model.model_path(),
        model.num_classes()
    );

    let num_classes = model.num_classes();
    let recognizer = EmotionRecognizer::new(detector, model, config.label_policy.clone())
        .with_tensor_options(config.tensor_options);

    let unlabelled = recognizer.policy().unlabelled_classes(num_classes);
    if unlabelled > 0 {
        warn!("{} of {} model classes have no label and will not be shown", unlabelled, num_classes);
    }
    Ok(recognizer)
}

/// Open the video source and run the capture, recognize, display loop until
/// `q` is pressed, the stream ends or the frame limit is reached.
pub fn run(config: &RecognitionConfig) -> Result<SessionSummary, Error> {
    let mut recognizer = build_recognizer(config)?;
    let mut camera = Camera::open_source(&config.source)?;
    let window = match config.wait_ms {
        Some(_) => Some(Window::new(&config.window_title)?),
        None => None,
    };
    run_loop(&mut camera, &mut recognizer, window.as_ref(), config)
}

fn run_loop<S: FrameSource, L: FaceLocator, M: EmotionModel>(
    source: &mut S, recognizer: &mut EmotionRecognizer<L, M>, window: Option<&Window>, config: &RecognitionConfig,
) -> Result<SessionSummary, Error> {
    let mut summary = SessionSummary::default();
    info!("reading frames from {}", source.description());

    while !config.frame_limit_reached(summary.frames) {
        let mut frame = match source.read_frame()? {
            Some(frame) => frame,
            None => {
                info!("{} has no more frames", source.description());
                break;
            }
        };

        let analysis = recognizer.analyze(&frame)?;
        summary.record(&analysis);
        debug!(
            "frame {} label {:?} confidence {:?}",
            summary.frames,
            analysis.label,
            analysis.prediction.as_ref().and_then(|p| p.confidence())
        );

        if let (Some(window), Some(wait_ms)) = (window, config.wait_ms) {
            render_frame(&mut frame, &analysis)?;
            window.show(&frame)?;
            if window.quit_requested(wait_ms)? {
                info!("quit requested");
                break;
            }
        }
    }

    source.release()?;
    info!(
        "processed {} frames, {} labelled: {:?}",
        summary.frames, summary.labelled_frames, summary.labels
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_emotion::labels::LabelPolicy;
    use crate::face_emotion::types::{ImageTensor, Prediction};
    use opencv::core::{Rect, Scalar, Vec3b, CV_8UC3};
    use std::collections::VecDeque;

    struct ClipSource {
        frames: VecDeque<Mat>,
        released: bool,
    }

    impl ClipSource {
        /// One frame per blue level.
        fn new(blue_levels: &[f64]) -> Self {
            let frames = blue_levels
                .iter()
                .map(|&blue| {
                    Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::new(blue, 60.0, 60.0, 0.0)).unwrap()
                })
                .collect();
            Self { frames, released: false }
        }
    }

    impl FrameSource for ClipSource {
        fn description(&self) -> &str {
            "clip"
        }

        fn read_frame(&mut self) -> Result<Option<Mat>, Error> {
            Ok(self.frames.pop_front())
        }

        fn release(&mut self) -> Result<(), Error> {
            self.released = true;
            Ok(())
        }
    }

    /// Finds a face in frames listed in `with_face`, counted from 0.
    struct CountingLocator {
        calls: usize,
        with_face: Vec<usize>,
    }

    impl FaceLocator for CountingLocator {
        fn locate_faces(&mut self, _gray: &Mat) -> Result<Vec<Rect>, Error> {
            let frame = self.calls;
            self.calls += 1;
            if self.with_face.contains(&frame) {
                Ok(vec![Rect::new(20, 20, 60, 60)])
            } else {
                Ok(vec![])
            }
        }

        fn locate_inner(&mut self, _face_gray: &Mat) -> Result<Vec<Rect>, Error> {
            Ok(vec![Rect::new(5, 5, 30, 30)])
        }
    }

    /// Class index is the blue level / 10.
    struct BlueLevelModel;

    impl EmotionModel for BlueLevelModel {
        fn input_size(&self) -> (i32, i32) {
            (4, 4)
        }

        fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, Error> {
            let class = (tensor.tensor_data[[0, 0, 0, 0]] * 255.0 / 10.0).round() as usize;
            let mut scores = vec![0.0; 7];
            scores[class.min(6)] = 1.0;
            Ok(Prediction::new(scores))
        }
    }

    fn recognizer(with_face: Vec<usize>) -> EmotionRecognizer<CountingLocator, BlueLevelModel> {
        let locator = CountingLocator { calls: 0, with_face };
        EmotionRecognizer::new(locator, BlueLevelModel, LabelPolicy::Legacy)
    }

    fn headless(max_frames: Option<u64>) -> RecognitionConfig {
        RecognitionConfig {
            wait_ms: None,
            max_frames,
            ..Default::default()
        }
    }

    #[test]
    fn test_loop_runs_until_stream_ends() {
        let mut source = ClipSource::new(&[0.0, 10.0, 0.0, 30.0, 10.0]);
        let mut recognizer = recognizer(vec![0, 1, 2, 3]);

        let summary = run_loop(&mut source, &mut recognizer, None, &headless(None)).unwrap();

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.labelled_frames, 4);
        assert_eq!(summary.labels.get(&Emotion::Angry), Some(&2));
        assert_eq!(summary.labels.get(&Emotion::Disgust), Some(&1));
        assert_eq!(summary.labels.get(&Emotion::Surprise), Some(&1));
        assert!(source.frames.is_empty());
        assert!(source.released);
    }

    #[test]
    fn test_loop_stops_at_frame_limit() {
        let mut source = ClipSource::new(&[0.0, 10.0, 20.0, 30.0]);
        let mut recognizer = recognizer(vec![0, 1, 2, 3]);

        let summary = run_loop(&mut source, &mut recognizer, None, &headless(Some(2))).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.labels.get(&Emotion::Angry), Some(&1));
        assert_eq!(summary.labels.get(&Emotion::Disgust), Some(&1));
        assert_eq!(source.frames.len(), 2);
        assert!(source.released);
    }

    #[test]
    fn test_loop_without_window_skips_display() {
        // a wait delay without a window must not block on a key press
        let config = RecognitionConfig {
            max_frames: None,
            ..Default::default()
        };
        let mut source = ClipSource::new(&[0.0, 0.0, 0.0]);
        let mut recognizer = recognizer(vec![]);

        let summary = run_loop(&mut source, &mut recognizer, None, &config).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.labelled_frames, 0);
        assert!(summary.labels.is_empty());
    }

    #[test]
    fn test_summary_counts_labels() {
        let mut summary = SessionSummary::default();
        summary.record(&FrameAnalysis::default());
        summary.record(&FrameAnalysis {
            label: Some(Emotion::Angry),
            ..Default::default()
        });
        summary.record(&FrameAnalysis {
            label: Some(Emotion::Angry),
            ..Default::default()
        });

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.labelled_frames, 2);
        assert_eq!(summary.labels.get(&Emotion::Angry), Some(&2));
    }

    #[test]
    fn test_render_frame_status_line_without_face() {
        let mut frame = Mat::new_rows_cols_with_default(200, 300, CV_8UC3, Scalar::all(60.0)).unwrap();
        render_frame(&mut frame, &FrameAnalysis::default()).unwrap();

        // top-left corner of the white box sits above the text
        let mut white = false;
        for y in 150..175 {
            let px = frame.at_2d::<Vec3b>(y, 10).unwrap();
            if px[0] == 255 && px[1] == 255 && px[2] == 255 {
                white = true;
            }
        }
        assert!(white);
    }

    #[test]
    fn test_render_frame_with_face_has_no_status_line() {
        let mut frame = Mat::new_rows_cols_with_default(200, 300, CV_8UC3, Scalar::all(60.0)).unwrap();
        let analysis = FrameAnalysis {
            faces: vec![Rect::new(150, 50, 40, 40)],
            primary_face: Some(Rect::new(150, 50, 40, 40)),
            ..Default::default()
        };
        render_frame(&mut frame, &analysis).unwrap();

        let px = frame.at_2d::<Vec3b>(170, 12).unwrap();
        assert_eq!([px[0], px[1], px[2]], [60, 60, 60]);
    }
}
