pub mod face_emotion;
