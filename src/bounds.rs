use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, Primitive, Rgba};
use rayon::prelude::*;
use tracing::*;

use crate::{BoundingBox, SliceError};

/// Finds the bounding box of the visible artwork on a sheet.
///
/// A pixel is visible when its alpha is strictly greater than `alpha_threshold`.
/// With the default threshold of 0 any non-zero alpha counts.
///
/// # Example
/// ```
/// use image::{DynamicImage, Rgba, RgbaImage};
/// use sheet_slicer::{BoundingBox, BoundsDetector};
///
/// let mut img = RgbaImage::new(8, 8);
/// img.put_pixel(2, 3, Rgba([255, 0, 0, 255]));
/// img.put_pixel(5, 6, Rgba([0, 255, 0, 10]));
///
/// let bbox = BoundsDetector::default().detect(&DynamicImage::ImageRgba8(img)).unwrap();
/// assert_eq!(bbox, BoundingBox::new(3, 2, 7, 6));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundsDetector {
    alpha_threshold: u8,
    parallel: bool,
}

impl BoundsDetector {
    pub fn new(alpha_threshold: u8, parallel: bool) -> Self {
        Self {
            alpha_threshold,
            parallel,
        }
    }

    pub fn alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    /// Scans rows on the rayon pool instead of the calling thread.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the full canvas when `detect` is false, otherwise runs [`Self::detect`].
    pub fn detect_or_full(
        &self,
        image: &DynamicImage,
        detect: bool,
    ) -> Result<BoundingBox, SliceError> {
        if detect {
            self.detect(image)
        } else {
            let (width, height) = image.dimensions();
            debug!("Skipping bounding-box detection, using {}x{}", width, height);
            Ok(BoundingBox::full(width, height))
        }
    }

    /// Detects the tightest box around every visible pixel.
    ///
    /// # Errors
    /// [`SliceError::InvalidImage`] if the image is empty, has no alpha channel,
    /// or has no visible pixel.
    pub fn detect(&self, image: &DynamicImage) -> Result<BoundingBox, SliceError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            error!("Invalid image dimensions: width={}, height={}", width, height);
            return Err(SliceError::InvalidImage {
                reason: format!("image has zero area ({width}x{height})"),
            });
        }
        if !image.color().has_alpha() {
            return Err(SliceError::InvalidImage {
                reason: format!(
                    "bounding-box detection needs an alpha channel, got {:?}",
                    image.color()
                ),
            });
        }

        // Alpha is compared at the source depth so faint 16-bit or float alpha survives
        let extent = match image {
            DynamicImage::ImageRgba8(_) | DynamicImage::ImageLumaA8(_) => {
                let threshold = self.alpha_threshold;
                self.scan(&image.to_rgba8(), move |p: &Rgba<u8>| p[3] > threshold)
            }
            DynamicImage::ImageRgba16(_) | DynamicImage::ImageLumaA16(_) => {
                let threshold = u16::from(self.alpha_threshold) * 257;
                self.scan(&image.to_rgba16(), move |p: &Rgba<u16>| p[3] > threshold)
            }
            _ => {
                let threshold = f32::from(self.alpha_threshold) / 255.0;
                self.scan(&image.to_rgba32f(), move |p: &Rgba<f32>| p[3] > threshold)
            }
        };

        let Some(extent) = extent else {
            return Err(SliceError::InvalidImage {
                reason: "image is fully transparent".to_owned(),
            });
        };
        let bbox = extent.into_box();
        info!(
            "Visible area {}x{}px, padding top={} left={} bottom={} right={}",
            bbox.width(),
            bbox.height(),
            bbox.top,
            bbox.left,
            height - bbox.bottom,
            width - bbox.right
        );
        Ok(bbox)
    }

    fn scan<S>(
        &self,
        img: &ImageBuffer<Rgba<S>, Vec<S>>,
        visible: impl Fn(&Rgba<S>) -> bool + Sync,
    ) -> Option<Extent>
    where
        S: Primitive + Send + Sync,
        Rgba<S>: Pixel<Subpixel = S>,
    {
        if self.parallel {
            trace!("Scanning alpha in parallel");
            (0..img.height())
                .into_par_iter()
                .filter_map(|y| scan_row(img, y, &visible))
                .reduce_with(Extent::union)
        } else {
            trace!("Scanning alpha sequentially");
            (0..img.height())
                .filter_map(|y| scan_row(img, y, &visible))
                .reduce(Extent::union)
        }
    }
}

/// Extent of the visible pixels on row `y`, if any.
fn scan_row<S: Primitive>(
    img: &ImageBuffer<Rgba<S>, Vec<S>>,
    y: u32,
    visible: &impl Fn(&Rgba<S>) -> bool,
) -> Option<Extent>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    let at = |x: &u32| visible(img.get_pixel(*x, y));
    let first = (0..img.width()).find(at)?;
    // first is visible, so the reverse search always succeeds
    let last = (first..img.width()).rev().find(at).unwrap_or(first);
    Some(Extent {
        min_x: first,
        max_x: last,
        min_y: y,
        max_y: y,
    })
}

/// Inclusive pixel extent, widened row by row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl Extent {
    fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn into_box(self) -> BoundingBox {
        BoundingBox::new(self.min_y, self.min_x, self.max_y + 1, self.max_x + 1)
    }
}
