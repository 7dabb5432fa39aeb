use anyhow::Error;
use log::error;
use opencv::core::Mat;
use opencv::highgui::{destroy_window, imshow, named_window, wait_key, WINDOW_AUTOSIZE};

pub const WINDOW_TITLE: &str = "Face Emotion Recognition";

pub const QUIT_KEY: char = 'q';

/// True when a `wait_key` result is the quit key.
pub fn is_quit_key(key: i32) -> bool {
    key >= 0 && (key & 0xFF) == QUIT_KEY as i32
}

/// A highgui window destroyed on drop.
pub struct Window {
    title: String,
}

impl Window {
    pub fn new(title: &str) -> Result<Window, Error> {
        named_window(title, WINDOW_AUTOSIZE)?;
        Ok(Window {
            title: title.to_string(),
        })
    }

    pub fn show(&self, frame: &Mat) -> Result<(), Error> {
        imshow(&self.title, frame)?;
        Ok(())
    }

    /// Pump the event loop for `delay_ms` and report whether `q` was pressed.
    pub fn quit_requested(&self, delay_ms: i32) -> Result<bool, Error> {
        Ok(is_quit_key(wait_key(delay_ms)?))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(e) = destroy_window(&self.title) {
            error!("Error closing window {}: {}", self.title, e);
        }
    }
}
