use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::*;

use crate::{
    BoundingBox, Crop, GridSpec, IconNames, SliceConfig, SliceError, SmallVecCells,
    OUTPUT_EXTENSION,
};

/// One planned output: its position in the grid, its name and its crop.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Cell<'a> {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub name: &'a str,
    pub crop: Crop,
}

/// Destination for cropped cells.
///
/// The slicer calls [`CellSink::write`] once per cell in reading order and stops at
/// the first error. Whatever a sink already persisted stays where it is.
pub trait CellSink {
    /// Persists one cropped cell.
    ///
    /// # Errors
    /// Returns [`SliceError`] if the cell cannot be stored.
    fn write(&mut self, cell: &Cell<'_>, image: &DynamicImage) -> Result<(), SliceError>;
}

/// Writes every cell as `{name}.png` into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates the directory (and missing parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SliceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SliceError::CreateOutputDir {
            path: dir.clone(),
            source,
        })?;
        debug!("Output directory ready: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{OUTPUT_EXTENSION}"))
    }
}

impl CellSink for DirectorySink {
    fn write(&mut self, cell: &Cell<'_>, image: &DynamicImage) -> Result<(), SliceError> {
        let path = self.path_for(cell.name);
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| SliceError::Write {
                index: cell.index,
                path,
                source,
            })
    }
}

/// Accepts every cell without storing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSink;

impl CellSink for DryRunSink {
    fn write(&mut self, _cell: &Cell<'_>, _image: &DynamicImage) -> Result<(), SliceError> {
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SliceReport {
    pub bounding_box: BoundingBox,
    pub cell_width: f64,
    pub cell_height: f64,
    pub written: usize,
}

/// Cuts a sheet into named cells.
///
/// # Example
/// ```
/// use image::{DynamicImage, RgbaImage, Rgba};
/// use sheet_slicer::slicer::DryRunSink;
/// use sheet_slicer::{BoundingBox, GridSlicer, GridSpec, IconNames};
///
/// let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255])));
/// let slicer = GridSlicer::new(GridSpec::new(2, 1).unwrap(), IconNames::new(["left", "right"])).unwrap();
///
/// let cells = slicer.plan(&BoundingBox::full(40, 20)).unwrap();
/// assert_eq!(cells[1].name, "right");
/// assert_eq!(cells[1].crop.left, 20);
///
/// let report = slicer.slice(&img, &BoundingBox::full(40, 20), &mut DryRunSink).unwrap();
/// assert_eq!(report.written, 2);
/// ```
#[derive(Debug, Clone)]
pub struct GridSlicer {
    grid: GridSpec,
    names: IconNames,
}

impl GridSlicer {
    /// Validates the names against the grid up front.
    ///
    /// # Errors
    /// [`SliceError::NameListMismatch`], [`SliceError::InvalidIconName`] or
    /// [`SliceError::DuplicateIconName`].
    pub fn new(grid: GridSpec, names: IconNames) -> Result<Self, SliceError> {
        names.validate(&grid)?;
        Ok(Self { grid, names })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn names(&self) -> &IconNames {
        &self.names
    }

    /// Lists every cell of the grid over `bbox`, row by row.
    pub fn plan(&self, bbox: &BoundingBox) -> Result<SmallVecCells<Cell<'_>>, SliceError> {
        self.grid.check_fits(bbox)?;
        let mut cells = SmallVecCells::with_capacity(self.grid.cell_count());
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                let index = (row * self.grid.cols() + col) as usize;
                let name = self
                    .names
                    .get(index)
                    .ok_or(SliceError::NameListMismatch {
                        expected: self.grid.cell_count(),
                        actual: self.names.len(),
                    })?;
                cells.push(Cell {
                    index,
                    row,
                    col,
                    name,
                    crop: self.grid.crop(bbox, row, col),
                });
            }
        }
        Ok(cells)
    }

    /// Crops every cell out of `image` and hands it to `sink`.
    ///
    /// The source image is only borrowed; each crop is a fresh copy.
    pub fn slice(
        &self,
        image: &DynamicImage,
        bbox: &BoundingBox,
        sink: &mut impl CellSink,
    ) -> Result<SliceReport, SliceError> {
        let (width, height) = image.dimensions();
        if bbox.right > width || bbox.bottom > height {
            return Err(SliceError::InvalidImage {
                reason: format!(
                    "bounding box {bbox:?} exceeds the {width}x{height} image"
                ),
            });
        }

        let cells = self.plan(bbox)?;
        let (cell_width, cell_height) = self.grid.cell_size(bbox);
        let total = cells.len();
        info!(
            "Cell size {:.2}x{:.2}px, extracting {} icons",
            cell_width, cell_height, total
        );

        for cell in &cells {
            let Crop {
                left,
                top,
                right,
                bottom,
            } = cell.crop;
            let icon = image.crop_imm(left, top, cell.crop.width(), cell.crop.height());
            sink.write(cell, &icon)?;
            info!(
                "[{}/{}] {}.{} ({},{} -> {},{})",
                cell.index + 1,
                total,
                cell.name,
                OUTPUT_EXTENSION,
                left,
                top,
                right,
                bottom
            );
        }

        Ok(SliceReport {
            bounding_box: *bbox,
            cell_width,
            cell_height,
            written: total,
        })
    }
}

/// Opens `path`, decoding it into a [`DynamicImage`].
pub fn load_sheet(path: &Path) -> Result<DynamicImage, SliceError> {
    let image = image::open(path).map_err(|source| SliceError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "Loaded {}: {}x{}px ({:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

/// A loaded sheet whose grid, names and bounding box have all been checked.
///
/// Nothing has been written yet. Use [`PreparedSheet::write_to`] to persist the
/// cells, or [`PreparedSheet::slice_into`] for any other [`CellSink`].
#[derive(Debug, Clone)]
pub struct PreparedSheet {
    slicer: GridSlicer,
    image: DynamicImage,
    bounding_box: BoundingBox,
}

impl PreparedSheet {
    /// Validates the configuration, loads `input` and locates the artwork.
    ///
    /// # Errors
    /// Any configuration, load or detection error, and
    /// [`SliceError::CellTooSmall`] when the box cannot hold the grid.
    pub fn prepare(input: &Path, config: &SliceConfig) -> Result<Self, SliceError> {
        let slicer = config.slicer()?;
        let image = load_sheet(input)?;
        let bounding_box = config
            .detector()
            .detect_or_full(&image, config.detect_bounding_box)?;
        slicer.grid().check_fits(&bounding_box)?;
        Ok(Self {
            slicer,
            image,
            bounding_box,
        })
    }

    pub fn slicer(&self) -> &GridSlicer {
        &self.slicer
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Every cell that would be written, in reading order.
    pub fn cells(&self) -> Result<SmallVecCells<Cell<'_>>, SliceError> {
        self.slicer.plan(&self.bounding_box)
    }

    pub fn slice_into(&self, sink: &mut impl CellSink) -> Result<SliceReport, SliceError> {
        self.slicer.slice(&self.image, &self.bounding_box, sink)
    }

    /// Creates `output_dir` and writes one PNG per cell into it.
    pub fn write_to(&self, output_dir: &Path) -> Result<SliceReport, SliceError> {
        let mut sink = DirectorySink::create(output_dir)?;
        let report = self.slice_into(&mut sink)?;
        info!(
            "Extraction complete: {} icons saved in {}",
            report.written,
            output_dir.display()
        );
        Ok(report)
    }
}

/// Slices the sheet at `input` into `output_dir` according to `config`.
///
/// Everything that can be checked up front (names, grid, image, bounding box) is
/// checked before the output directory is created, so a rejected run leaves no
/// trace on disk.
pub fn slice_sheet(
    input: &Path,
    output_dir: &Path,
    config: &SliceConfig,
) -> Result<SliceReport, SliceError> {
    PreparedSheet::prepare(input, config)?.write_to(output_dir)
}
