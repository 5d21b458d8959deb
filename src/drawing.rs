//! This module provides functionality for drawing the bounding box and cell outlines on images.
//! It is feature-gated under the `drawing` feature and requires the `image` and `imageproc` crates.
//!
//! # Examples
//!
//! ```rust
//! use image::{Rgba, RgbaImage};
//! use sheet_slicer::drawing::{Drawable, PreviewConfig};
//! use sheet_slicer::{BoundingBox, GridSlicer, GridSpec, IconNames};
//!
//! let mut canvas = RgbaImage::new(40, 20);
//! let bbox = BoundingBox::full(40, 20);
//! let slicer = GridSlicer::new(GridSpec::new(2, 1).unwrap(), IconNames::new(["a", "b"])).unwrap();
//! let cells = slicer.plan(&bbox).unwrap();
//!
//! let config = PreviewConfig {
//!     bounding_box_color: Rgba([0, 255, 0, 255]), // Green for the visible area
//!     cell_color: Rgba([255, 0, 255, 255]),       // Magenta for cells
//!     line_thickness: 1,
//! };
//! bbox.draw(&mut canvas, &config);
//! for cell in &cells {
//!     cell.draw(&mut canvas, &config);
//! }
//! assert_eq!(*canvas.get_pixel(20, 10), Rgba([255, 0, 255, 255]));
//! ```

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::{BoundingBox, Cell, Crop};

/// Colors and line thickness for the preview overlay.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Outline color of the detected bounding box.
    pub bounding_box_color: Rgba<u8>,
    /// Outline color of each cell.
    pub cell_color: Rgba<u8>,
    /// Thickness of outlines, drawn inwards.
    pub line_thickness: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            bounding_box_color: Rgba([0, 255, 0, 255]), // Green
            cell_color: Rgba([255, 0, 0, 255]),         // Red
            line_thickness: 2,
        }
    }
}

/// Trait for types that can be drawn on an image.
///
/// This trait is implemented for [`BoundingBox`], [`Crop`] and [`Cell`].
pub trait Drawable {
    /// Draws the object on the provided image using the given configuration.
    fn draw(&self, image: &mut RgbaImage, config: &PreviewConfig);
}

impl From<&BoundingBox> for Rect {
    fn from(bbox: &BoundingBox) -> Self {
        Rect::at(bbox.left as i32, bbox.top as i32).of_size(bbox.width(), bbox.height())
    }
}

impl From<&Crop> for Rect {
    fn from(crop: &Crop) -> Self {
        Rect::at(crop.left as i32, crop.top as i32).of_size(crop.width(), crop.height())
    }
}

/// Draws `thickness` nested outlines, shrinking inwards until the rectangle runs out.
fn draw_outline(image: &mut RgbaImage, rect: Rect, thickness: u32, color: Rgba<u8>) {
    for i in 0..thickness.max(1) {
        if rect.width() <= 2 * i || rect.height() <= 2 * i {
            break;
        }
        let inset = Rect::at(rect.left() + i as i32, rect.top() + i as i32)
            .of_size(rect.width() - 2 * i, rect.height() - 2 * i);
        draw_hollow_rect_mut(image, inset, color);
    }
}

impl Drawable for BoundingBox {
    fn draw(&self, image: &mut RgbaImage, config: &PreviewConfig) {
        if self.is_empty() {
            return;
        }
        draw_outline(
            image,
            Rect::from(self),
            config.line_thickness,
            config.bounding_box_color,
        );
    }
}

impl Drawable for Crop {
    fn draw(&self, image: &mut RgbaImage, config: &PreviewConfig) {
        if self.width() == 0 || self.height() == 0 {
            return;
        }
        draw_outline(image, Rect::from(self), config.line_thickness, config.cell_color);
    }
}

impl Drawable for Cell<'_> {
    fn draw(&self, image: &mut RgbaImage, config: &PreviewConfig) {
        self.crop.draw(image, config);
    }
}
