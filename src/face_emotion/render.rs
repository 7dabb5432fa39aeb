use anyhow::Error;
use opencv::core::{Mat, Point, Rect, Scalar, Size};
use opencv::imgproc::{
    get_text_size, put_text, rectangle, FILLED, FONT_HERSHEY_PLAIN, FONT_HERSHEY_SIMPLEX, LINE_4, LINE_8,
};

use crate::face_emotion::recognizer::FrameAnalysis;
use crate::face_emotion::types::Emotion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

impl Color {
    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b }
    }

    /// OpenCV frames are BGR.
    pub fn to_scalar(&self) -> Scalar {
        Scalar::new(self.b as f64, self.g as f64, self.r as f64, 0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Colors;

impl Colors {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255);
}

/// Banner in the top-left corner holding the label.
pub const BANNER: (i32, i32, i32, i32) = (0, 0, 175, 75);

/// Anchor of the large label text.
pub const LABEL_ORIGIN: (i32, i32) = (100, 150);

/// Padding around text drawn with [`draw_text_box`].
pub const TEXT_BOX_PADDING: i32 = 2;

/// Draw the analysis onto the frame in place.
///
/// Every face gets a 2 px blue box. When a label was produced, it is drawn in
/// a black banner, repeated in large text and the primary face is outlined in
/// the label color.
pub fn annotate(frame: &mut Mat, analysis: &FrameAnalysis) -> Result<(), Error> {
    for face in &analysis.faces {
        rectangle(frame, *face, Colors::BLUE.to_scalar(), 2, LINE_8, 0)?;
    }

    if let (Some(label), Some(face)) = (analysis.label, analysis.primary_face) {
        draw_label(frame, label, face)?;
    }
    Ok(())
}

fn draw_label(frame: &mut Mat, label: Emotion, face: Rect) -> Result<(), Error> {
    let color = label.color().to_scalar();
    let text = label.as_str();
    let (x1, y1, w1, h1) = BANNER;

    rectangle(frame, Rect::new(x1, y1, w1, h1), Colors::BLACK.to_scalar(), FILLED, LINE_8, 0)?;
    put_text(
        frame,
        text,
        Point::new(x1 + w1 / 10, y1 + h1 / 2),
        FONT_HERSHEY_SIMPLEX,
        0.7,
        color,
        2,
        LINE_8,
        false,
    )?;
    put_text(
        frame,
        text,
        Point::new(LABEL_ORIGIN.0, LABEL_ORIGIN.1),
        FONT_HERSHEY_PLAIN,
        3.0,
        color,
        2,
        LINE_4,
        false,
    )?;
    rectangle(frame, face, color, 1, LINE_8, 0)?;
    Ok(())
}

/// Draw `text` with its baseline at `origin` on top of a filled box sized to the text.
/// Returns the box that was filled.
pub fn draw_text_box(
    frame: &mut Mat, text: &str, origin: Point, font_scale: f64, background: Color, foreground: Color,
) -> Result<Rect, Error> {
    let font = FONT_HERSHEY_PLAIN;
    let mut baseline = 0;
    let text_size: Size = get_text_size(text, font, font_scale, 1, &mut baseline)?;
    let (width, height) = (text_size.width, text_size.height);

    let box_rect = Rect::new(
        origin.x,
        origin.y - height - TEXT_BOX_PADDING,
        width + TEXT_BOX_PADDING,
        height + TEXT_BOX_PADDING,
    );
    rectangle(frame, box_rect, background.to_scalar(), FILLED, LINE_8, 0)?;
    put_text(frame, text, origin, font, font_scale, foreground.to_scalar(), 1, LINE_8, false)?;
    Ok(box_rect)
}
