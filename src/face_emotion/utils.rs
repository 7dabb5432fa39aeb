use std::fs;
use std::path::Path;

use anyhow::Error;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs::{imdecode, imwrite, IMREAD_COLOR};
use opencv::prelude::*;

/// Decode encoded image bytes (jpeg, png, ...) into a BGR `Mat`, the layout frames arrive in.
pub fn convert_image_to_mat(im_bytes: &[u8]) -> Result<Mat, Error> {
    let img_as_mat = Mat::from_slice(im_bytes)?;

    let bgr_img = imdecode(&img_as_mat, IMREAD_COLOR)?;
    if bgr_img.empty() {
        return Err(Error::msg("failed to decode image"));
    }
    Ok(bgr_img)
}

pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Mat, Error> {
    let bytes = fs::read(path.as_ref())
        .map_err(|e| Error::msg(format!("failed to read image {:?}: {}", path.as_ref(), e)))?;
    convert_image_to_mat(&bytes)
}

pub fn write_image<P: AsRef<Path>>(path: P, image: &Mat) -> Result<(), Error> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| Error::msg(format!("image path {:?} is not valid UTF-8", path.as_ref())))?;
    if !imwrite(path_str, image, &Vector::new())? {
        return Err(Error::msg(format!("failed to write image {}", path_str)));
    }
    Ok(())
}
