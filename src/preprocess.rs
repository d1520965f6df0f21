//! Image normalization: decoded upload -> `[1, 224, 224, 3]` float tensor.

use crate::error::PipelineError;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;
use std::path::Path;

pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;

/// Decodes an in-memory upload, sniffing the format from the bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    image::load_from_memory(bytes).map_err(PipelineError::Decode)
}

/// Opens an image file, guessing the format from content rather than the
/// file extension (uploads are spooled under generated names).
pub fn open_image(path: &Path) -> Result<DynamicImage, PipelineError> {
    image::io::Reader::open(path)
        .map_err(PipelineError::Io)?
        .with_guessed_format()
        .map_err(PipelineError::Io)?
        .decode()
        .map_err(PipelineError::Decode)
}

/// Converts a decoded image into the model input tensor.
///
/// The image is resized so its longer side maps to 224 (Triangle filter,
/// aspect ratio preserved), centered on a black 224x224 canvas, forced to
/// 3 channels, and scaled by 1/255 into `[0.0, 1.0]`. Pure and deterministic;
/// never fails for a successfully decoded image.
pub fn normalize(img: &DynamicImage) -> Array4<f32> {
    let canvas = letterbox(img);
    Array4::from_shape_fn(
        (
            1,
            INPUT_HEIGHT as usize,
            INPUT_WIDTH as usize,
            INPUT_CHANNELS,
        ),
        |(_, y, x, c)| canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
}

fn letterbox(img: &DynamicImage) -> RgbImage {
    let (width, height) = img.dimensions();

    let (new_width, new_height) = if width > height {
        (INPUT_WIDTH, (INPUT_HEIGHT * height) / width)
    } else {
        ((INPUT_WIDTH * width) / height, INPUT_HEIGHT)
    };
    // extreme aspect ratios round the short side down to zero
    let resized = img
        .resize(
            new_width.max(1),
            new_height.max(1),
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();

    let mut canvas = RgbImage::new(INPUT_WIDTH, INPUT_HEIGHT);
    let (resized_width, resized_height) = resized.dimensions();
    let pad_x = (INPUT_WIDTH - resized_width) / 2;
    let pad_y = (INPUT_HEIGHT - resized_height) / 2;

    for y in 0..resized_height {
        for x in 0..resized_width {
            canvas.put_pixel(x + pad_x, y + pad_y, *resized.get_pixel(x, y));
        }
    }

    canvas
}
