pub mod types;
pub mod error;
pub mod transform;
pub mod labels;
pub mod face_detection;
pub mod emotion_classifier;
pub mod recognizer;
pub mod render;
pub mod capture;
pub mod display;
pub mod config;
pub mod session;
pub mod utils;
