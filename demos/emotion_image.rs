use std::env;
use std::process;

use face_emotion_recognition::face_emotion::config::RecognitionConfig;
use face_emotion_recognition::face_emotion::session::{build_recognizer, render_frame};
use face_emotion_recognition::face_emotion::utils::{read_image, write_image};

/// Usage: emotion_image <image> <output.png> [model.tflite]
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <image> <output.png> [model.tflite]", args[0]);
        process::exit(2);
    }

    let mut config = RecognitionConfig::default();
    if let Some(model) = args.get(3) {
        config.model_path = model.into();
    }

    if let Err(e) = run(&args[1], &args[2], &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(input: &str, output: &str, config: &RecognitionConfig) -> Result<(), anyhow::Error> {
    let mut recognizer = build_recognizer(config)?;
    let mut image = read_image(input)?;

    let analysis = recognizer.analyze(&image)?;
    println!("faces: {:?}", analysis.faces);
    match (&analysis.prediction, analysis.label) {
        (Some(prediction), Some(label)) => println!(
            "label: {} confidence: {:?} scores: {:?}",
            label,
            prediction.confidence(),
            prediction.scores
        ),
        _ => println!("no emotion predicted"),
    }

    render_frame(&mut image, &analysis)?;
    write_image(output, &image)
}
