//! Turns uploaded image bytes into the classifier's input batch.
//!
//! The model was trained on square 480x480 RGB inputs, so every image is
//! stretched to that size; aspect ratio is not preserved.

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::error::ImageDecodeError;

pub const INPUT_SIZE: u32 = 480;
pub const CHANNELS: usize = 3;

/// `[1, 480, 480, 3]` batch of RGB values scaled to `[0, 1]`.
pub type ImageBatch = Array4<f32>;

pub fn preprocess(bytes: &[u8]) -> Result<ImageBatch, ImageDecodeError> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let side = INPUT_SIZE as usize;
    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();

    Ok(Array4::from_shape_vec((1, side, side, CHANNELS), data)?)
}
