//! Input image preparation.
//!
//! Decodes the digit image as 8-bit grayscale, resizes it to the network's
//! input size and converts pixels to the signed 8-bit format the DPU reads.

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array2;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DpuError, Result};
use crate::inference::TensorBuffer;

/// Decode an image file to single-channel 8-bit luma.
pub fn load_grayscale(path: impl AsRef<Path>) -> Result<GrayImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| DpuError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "decoded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image.to_luma8())
}

/// Saturating `u8 -> i8`: values above 127 clamp to 127.
pub fn saturate_i8(value: u8) -> i8 {
    value.min(i8::MAX as u8) as i8
}

/// Resize to `width` x `height` and convert to signed pixels.
///
/// The returned array is indexed `[row, column]`.
pub fn prepare_input(image: &GrayImage, width: u32, height: u32, filter: FilterType) -> Array2<i8> {
    let resized = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, filter)
    };
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        saturate_i8(resized.get_pixel(x as u32, y as u32)[0])
    })
}

/// Copy prepared pixels into the start of an input buffer.
///
/// # Errors
///
/// Returns an error if the buffer holds fewer elements than the image.
pub fn fill_input(buffer: &mut TensorBuffer, pixels: &Array2<i8>) -> Result<()> {
    // Ensure data is contiguous
    let contiguous = pixels.as_standard_layout();
    let src = contiguous
        .as_slice()
        .ok_or_else(|| DpuError::tensor("image is not contiguous"))?;

    let name = buffer.desc().name.clone();
    let dst = buffer.as_mut_slice();
    if dst.len() < src.len() {
        return Err(DpuError::tensor(format!(
            "input `{}` holds {} elements, image needs {}",
            name,
            dst.len(),
            src.len()
        )));
    }
    if dst.len() > src.len() {
        warn!(
            "input `{}` holds {} elements, image fills {}; the rest stay zero",
            name,
            dst.len(),
            src.len()
        );
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(())
}
