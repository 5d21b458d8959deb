use std::path::Path;

use crate::drawing::*;
use image::{DynamicImage, ImageFormat};
use tracing::*;

use super::*;

/// Saves the sheet with the bounding box and every cell outline drawn on it.
///
/// # Arguments
/// * `image` - The sheet being sliced.
/// * `bbox` - The box the grid was laid over.
/// * `cells` - The planned cells.
/// * `output_path` - Where to write the preview PNG.
/// * `config` - The drawing configuration.
///
/// # Errors
/// Returns [`SliceError::Preview`] if the preview cannot be saved.
pub fn save_preview(
    image: &DynamicImage,
    bbox: &BoundingBox,
    cells: &[Cell<'_>],
    output_path: impl AsRef<Path>,
    config: &PreviewConfig,
) -> Result<(), SliceError> {
    let output_path = output_path.as_ref();
    let mut rgba_img = image.to_rgba8();
    for cell in cells {
        cell.draw(&mut rgba_img, config);
    }
    bbox.draw(&mut rgba_img, config);
    rgba_img
        .save_with_format(output_path, ImageFormat::Png)
        .map_err(|source| SliceError::Preview {
            path: output_path.to_path_buf(),
            source,
        })?;
    info!("Saved grid preview to {}", output_path.display());
    Ok(())
}
