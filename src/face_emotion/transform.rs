use crate::face_emotion::error::RecognitionError;
use crate::face_emotion::types::{BBox, ImageTensor};
use anyhow::Error;
use ndarray::{Array3, Axis};
use opencv::core::{Mat, Rect, Size, CV_8UC3};
use opencv::imgproc::{cvt_color_def, resize, COLOR_BGR2RGB, INTER_LINEAR};
use opencv::prelude::*;

/// Return the box with the largest area; the first one wins on ties.
pub fn largest_rect(rects: &[Rect]) -> Option<Rect> {
    let mut best: Option<Rect> = None;
    for rect in rects {
        match best {
            Some(current) if BBox::from(*rect).area() <= BBox::from(current).area() => {}
            _ => best = Some(*rect),
        }
    }
    best
}

/// Index of the first maximum value, `None` for an empty slice. NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// Copy a region out of `image`, clamped to the image bounds.
pub fn crop(image: &Mat, rect: Rect) -> Result<Mat, Error> {
    let size = image.size()?;
    let frame_box = BBox::from_size(size.width, size.height);
    let region = BBox::from(rect)
        .intersect(&frame_box)
        .ok_or(RecognitionError::EmptyCrop((rect.x, rect.y, rect.width, rect.height)))?;

    let roi = Mat::roi(image, Rect::from(region))?;
    Ok(roi.try_clone()?)
}

/// Resize a BGR crop to `output_size` and scale it into an NHWC `f32` tensor.
/// * Args:
///     - image (`Mat`): 8-bit, 3 channel crop, BGR as captured.
///     - output_size (`(i32, i32)`): `(width, height)` expected by the model.
///     - output_range (`(f64, f64)`): `(min_val, max_val)` of the output tensor;
///       `(0, 1)` divides every byte by 255.
///     - swap_rb (`bool`): convert to RGB before scaling.
///
/// * Returns:
///     - `ImageTensor` with shape `[1, height, width, 3]`.
pub fn image_to_tensor(
    image: &Mat, output_size: (i32, i32), output_range: (f64, f64), swap_rb: bool,
) -> Result<ImageTensor, Error> {
    if image.typ() != CV_8UC3 {
        return Err(Error::msg(format!("expected an 8-bit 3 channel image, got type {}", image.typ())));
    }
    let original_size = image.size()?;
    let (width, height) = output_size;

    let mut resized = Mat::default();
    resize(image, &mut resized, Size::new(width, height), 0.0, 0.0, INTER_LINEAR)?;

    if swap_rb {
        let mut rgb = Mat::default();
        cvt_color_def(&resized, &mut rgb, COLOR_BGR2RGB)?;
        resized = rgb;
    }

    // resize output is continuous
    let bytes = resized.data_bytes()?;
    let (min_val, max_val) = output_range;
    let scaled: Vec<f32> = bytes
        .iter()
        .map(|&pixel| (pixel as f64 * (max_val - min_val) / 255.0 + min_val) as f32)
        .collect();

    let tensor = Array3::from_shape_vec((height as usize, width as usize, 3usize), scaled)?;

    Ok(ImageTensor::new(
        tensor.insert_axis(Axis(0)),
        (original_size.width, original_size.height),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Vec3b};

    fn solid_image(width: i32, height: i32, bgr: (f64, f64, f64)) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(bgr.0, bgr.1, bgr.2, 0.0)).unwrap()
    }

    #[test]
    fn test_argmax_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.2]), Some(1));
        assert_eq!(argmax(&[5.0, -1.0]), Some(0));
        assert_eq!(argmax(&[-3.0, -2.0, -2.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some(1));
    }

    #[test]
    fn test_largest_rect() {
        let rects = vec![Rect::new(0, 0, 10, 10), Rect::new(5, 5, 30, 20), Rect::new(1, 1, 20, 30)];
        assert_eq!(largest_rect(&rects), Some(Rect::new(5, 5, 30, 20)));
        assert_eq!(largest_rect(&[]), None);
    }

    #[test]
    fn test_crop_is_clamped() {
        let image = solid_image(40, 30, (10., 20., 30.));
        let cropped = crop(&image, Rect::new(30, 20, 20, 20)).unwrap();
        let size = cropped.size().unwrap();
        assert_eq!((size.width, size.height), (10, 10));

        assert!(crop(&image, Rect::new(50, 50, 5, 5)).is_err());
    }

    #[test]
    fn test_image_to_tensor_scaling() {
        let image = solid_image(16, 8, (255., 0., 51.));
        let tensor = image_to_tensor(&image, (4, 6), (0.0, 1.0), false).unwrap();

        assert_eq!(tensor.tensor_data.shape(), &[1, 6, 4, 3]);
        assert_eq!(tensor.size(), (4, 6));
        assert_eq!(tensor.original_size, (16, 8));
        let px = tensor.tensor_data.slice(ndarray::s![0, 2, 1, ..]).to_vec();
        assert!((px[0] - 1.0).abs() < 1e-6);
        assert!(px[1].abs() < 1e-6);
        assert!((px[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_image_to_tensor_swap_rb_and_range() {
        let mut image = solid_image(2, 2, (0., 0., 0.));
        *image.at_2d_mut::<Vec3b>(0, 0).unwrap() = Vec3b::from([255, 0, 0]);
        let tensor = image_to_tensor(&image, (2, 2), (-1.0, 1.0), true).unwrap();

        let px = tensor.tensor_data.slice(ndarray::s![0, 0, 0, ..]).to_vec();
        assert_eq!(px, vec![-1.0, -1.0, 1.0]);
    }
}
