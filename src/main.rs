use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::info;

use face_emotion_recognition::face_emotion::capture::{VideoSource, DEFAULT_CAMERA_INDICES};
use face_emotion_recognition::face_emotion::config::RecognitionConfig;
use face_emotion_recognition::face_emotion::display::WINDOW_TITLE;
use face_emotion_recognition::face_emotion::face_detection::{MIN_NEIGHBORS, SCALE_FACTOR};
use face_emotion_recognition::face_emotion::labels::{LabelPolicy, LabelSet};
use face_emotion_recognition::face_emotion::recognizer::TensorOptions;
use face_emotion_recognition::face_emotion::session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// 0 = Angry, 1 = Disgust, anything else = Surprise.
    Legacy,
    /// Index into the label set (see --labels).
    Direct,
}

/// Detect faces from a webcam and overlay the predicted emotion.
#[derive(Parser)]
#[command(name = "face-emotion")]
struct Cli {
    /// Emotion classifier (.tflite), input [1, H, W, 3] float32.
    #[arg(long, default_value = "./models/emotion.tflite")]
    model: PathBuf,

    /// JSON array of label names in model class order.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// How class indices map to overlay labels.
    #[arg(long, value_enum, default_value = "legacy")]
    label_policy: PolicyArg,

    /// Haar cascade XML; defaults to the one bundled with OpenCV.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Camera indices to try, in order.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CAMERA_INDICES.to_vec())]
    camera: Vec<i32>,

    /// Read frames from a video file instead of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Cascade scale factor.
    #[arg(long, default_value_t = SCALE_FACTOR)]
    scale_factor: f64,

    /// Cascade minimum neighbors.
    #[arg(long, default_value_t = MIN_NEIGHBORS)]
    min_neighbors: i32,

    /// Feed the model RGB instead of BGR.
    #[arg(long)]
    swap_rb: bool,

    /// Run without a window.
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Milliseconds to wait for a key press per frame.
    #[arg(long, default_value = "2")]
    wait_ms: i32,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = build_config(cli)?;

    let summary = session::run(&config)?;
    info!("done after {} frames", summary.frames);
    Ok(())
}

fn build_config(cli: Cli) -> Result<RecognitionConfig, anyhow::Error> {
    if cli.labels.is_some() && cli.label_policy == PolicyArg::Legacy {
        return Err(anyhow::Error::msg("--labels requires --label-policy direct"));
    }
    if cli.wait_ms <= 0 && !cli.headless {
        return Err(anyhow::Error::msg("--wait-ms must be positive"));
    }

    let label_policy = match cli.label_policy {
        PolicyArg::Legacy => LabelPolicy::Legacy,
        PolicyArg::Direct => {
            let labels = match &cli.labels {
                Some(path) => LabelSet::from_file(path)?,
                None => LabelSet::default(),
            };
            LabelPolicy::Direct(labels)
        }
    };

    let source = match cli.input {
        Some(path) => VideoSource::File(path),
        None => VideoSource::Cameras(cli.camera),
    };

    Ok(RecognitionConfig {
        source,
        cascade_path: cli.cascade,
        model_path: cli.model,
        label_policy,
        scale_factor: cli.scale_factor,
        min_neighbors: cli.min_neighbors,
        tensor_options: TensorOptions {
            swap_rb: cli.swap_rb,
            ..Default::default()
        },
        window_title: WINDOW_TITLE.to_string(),
        wait_ms: if cli.headless { None } else { Some(cli.wait_ms) },
        max_frames: cli.max_frames,
    })
}
