//! This crate slices sprite sheets (a regular grid of icons) into individually named images.
//! It uses the `image` crate for decoding, cropping and encoding, and optionally `imageproc`
//! to draw a preview overlay of the computed grid.
//!
//! The grid either spans the whole canvas or, when bounding-box detection is enabled,
//! only the smallest rectangle holding every visible pixel. That compensates for the
//! transparent padding image generators like to leave around the artwork.
//!
//! # Example
//! ```
//! use sheet_slicer::{BoundingBox, GridSpec};
//!
//! let grid = GridSpec::new(4, 7).unwrap();
//! let crop = grid.crop(&BoundingBox::full(1024, 1536), 0, 0);
//! assert_eq!((crop.left, crop.top, crop.right, crop.bottom), (0, 0, 256, 219));
//! ```

/// Bounding-box detection over the alpha channel.
pub mod bounds;
/// Slicing configuration and TOML sheet manifests.
pub mod config;
/// Debug helpers for saving a preview of the grid on top of the sheet.
///
/// # Example
/// ```no_run
/// use sheet_slicer::{drawing::PreviewConfig, BoundingBox, GridSpec, IconNames};
/// use sheet_slicer::slicer::GridSlicer;
///
/// let img = image::open("Food.png").unwrap();
/// let bbox = BoundingBox::full(img.width(), img.height());
/// let slicer = GridSlicer::new(GridSpec::new(4, 7).unwrap(), IconNames::food_sheet()).unwrap();
/// let cells = slicer.plan(&bbox).unwrap();
///
/// sheet_slicer::debug::save_preview(&img, &bbox, &cells, "preview.png", &PreviewConfig::default())
///     .unwrap();
/// ```
#[cfg(feature = "drawing")]
pub mod debug;
/// Drawing of bounding boxes and cell outlines on images.
#[cfg(feature = "drawing")]
pub mod drawing;
/// Cell planning, cropping and output sinks.
pub mod slicer;

pub use bounds::BoundsDetector;
pub use config::SliceConfig;
pub use slicer::{
    slice_sheet, Cell, CellSink, DirectorySink, GridSlicer, PreparedSheet, SliceReport,
};

use smallvec::SmallVec;
use std::path::PathBuf;
use thiserror::Error;

// A 4x7 sheet is the common case; anything up to 32 cells stays on the stack
const DEFAULT_SMALLVEC_SIZE: usize = 32;

/// Extension given to every written cell.
pub const OUTPUT_EXTENSION: &str = "png";

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("Failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("Icon name list has {actual} entries but the grid has {expected} cells")]
    NameListMismatch { expected: usize, actual: usize },

    #[error("Invalid grid shape: cols={cols}, rows={rows} (both must be positive)")]
    InvalidGrid { cols: u32, rows: u32 },

    #[error("Area of {width}x{height}px is too small for a {cols}x{rows} grid")]
    CellTooSmall {
        width: u32,
        height: u32,
        cols: u32,
        rows: u32,
    },

    #[error("Invalid icon name {name:?} at index {index}")]
    InvalidIconName { index: usize, name: String },

    #[error("Icon name {name:?} is used more than once")]
    DuplicateIconName { name: String },

    #[error("Failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cell {index} to {path}: {source}")]
    Write {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save preview {path}: {source}")]
    Preview {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A type alias for SmallVec sized for a typical sheet.
pub type SmallVecCells<T> = SmallVec<[T; DEFAULT_SMALLVEC_SIZE]>;

/// The smallest axis-aligned rectangle holding every visible pixel.
///
/// The box is half-open: it covers `[left, right) x [top, bottom)`.
///
/// # Example
/// ```
/// use sheet_slicer::BoundingBox;
///
/// let bbox = BoundingBox::new(10, 20, 110, 220);
/// assert_eq!(bbox.width(), 200);
/// assert_eq!(bbox.height(), 100);
/// assert!(bbox.contains(20, 10));
/// assert!(!bbox.contains(220, 10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl BoundingBox {
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// The box covering a whole `width` x `height` canvas.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, height, width)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..self.right).contains(&x) && (self.top..self.bottom).contains(&y)
    }
}

/// A crop rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Crop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Crop {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// The shape of the icon grid.
///
/// # Example
/// ```
/// use sheet_slicer::GridSpec;
///
/// let grid = GridSpec::new(4, 7).unwrap();
/// assert_eq!(grid.cell_count(), 28);
/// assert!(GridSpec::new(0, 7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GridSpec {
    cols: u32,
    rows: u32,
}

impl GridSpec {
    /// Creates a grid shape, rejecting zero columns or rows.
    pub fn new(cols: u32, rows: u32) -> Result<Self, SliceError> {
        if cols == 0 || rows == 0 {
            return Err(SliceError::InvalidGrid { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Fractional cell width and height for the given box.
    pub fn cell_size(&self, bbox: &BoundingBox) -> (f64, f64) {
        (
            f64::from(bbox.width()) / f64::from(self.cols),
            f64::from(bbox.height()) / f64::from(self.rows),
        )
    }

    /// Fails when the box cannot give every cell at least one pixel.
    pub fn check_fits(&self, bbox: &BoundingBox) -> Result<(), SliceError> {
        if bbox.width() < self.cols || bbox.height() < self.rows {
            return Err(SliceError::CellTooSmall {
                width: bbox.width(),
                height: bbox.height(),
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(())
    }

    /// Computes the crop of cell (`row`, `col`) inside `bbox`.
    ///
    /// Each edge is `floor(index * extent / count)`, evaluated exactly in integers,
    /// so every cell is derived from its own index and never from its neighbour.
    pub fn crop(&self, bbox: &BoundingBox, row: u32, col: u32) -> Crop {
        let edge = |index: u32, extent: u32, count: u32| -> u32 {
            // index <= count, so the quotient never exceeds extent
            (u64::from(index) * u64::from(extent) / u64::from(count)) as u32
        };
        let (width, height) = (bbox.width(), bbox.height());
        Crop {
            left: bbox.left + edge(col, width, self.cols),
            top: bbox.top + edge(row, height, self.rows),
            right: bbox.left + edge(col + 1, width, self.cols),
            bottom: bbox.top + edge(row + 1, height, self.rows),
        }
    }
}

/// Output names for the cells, in reading order (left to right, top to bottom).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct IconNames(Vec<String>);

impl IconNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// The 28 names of the 4x7 food sheet.
    pub fn food_sheet() -> Self {
        Self::new([
            "pizza",
            "basketball",
            "croissant",
            "hotdog",
            "icecream",
            "coffee",
            "cupcake",
            "pretzel",
            "banana",
            "apple",
            "grapes",
            "watermelon",
            "cookie",
            "popcorn",
            "fries",
            "strawberry",
            "onigiri",
            "popsicle",
            "pancakes",
            "muffin",
            "donut",
            "icecream_bar",
            "chicken",
            "lollipop",
            "donut2",
            "cinnamon_roll",
            "cupcake2",
            "chocolate",
        ])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Checks the list against the grid before any pixel is touched.
    ///
    /// Names end up as file stems, so they must be non-empty, free of path
    /// separators, and unique within the sheet. Uniqueness ignores case since
    /// `Donut.png` and `donut.png` are the same file on Windows and macOS.
    pub fn validate(&self, grid: &GridSpec) -> Result<(), SliceError> {
        if self.len() != grid.cell_count() {
            return Err(SliceError::NameListMismatch {
                expected: grid.cell_count(),
                actual: self.len(),
            });
        }
        let mut seen = std::collections::HashSet::with_capacity(self.len());
        for (index, name) in self.iter().enumerate() {
            let bad = name.trim().is_empty()
                || name == "."
                || name == ".."
                || name.contains(['/', '\\', '\0']);
            if bad {
                return Err(SliceError::InvalidIconName {
                    index,
                    name: name.to_owned(),
                });
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(SliceError::DuplicateIconName {
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl Default for IconNames {
    fn default() -> Self {
        Self::food_sheet()
    }
}

impl<S: Into<String>> FromIterator<S> for IconNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
