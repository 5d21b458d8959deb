use std::path::Path;

use serde::Deserialize;
use tracing::*;

use crate::{BoundsDetector, GridSlicer, GridSpec, IconNames, SliceError};

const DEFAULT_COLS: u32 = 4;
const DEFAULT_ROWS: u32 = 7;

/// Everything a slicing run needs besides the input and output paths.
///
/// The default is the 4x7 food sheet in full-canvas mode.
///
/// # Example
/// ```
/// use sheet_slicer::SliceConfig;
///
/// let config = SliceConfig::default();
/// assert_eq!(config.grid.cols(), 4);
/// assert_eq!(config.grid.rows(), 7);
/// assert_eq!(config.icon_names.len(), 28);
/// assert!(!config.detect_bounding_box);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SliceConfig {
    pub grid: GridSpec,
    /// Output names in reading order
    pub icon_names: IconNames,
    /// Trim transparent padding before laying out the grid
    pub detect_bounding_box: bool,
    /// Pixels with alpha at or below this are treated as padding (default: 0)
    pub alpha_threshold: u8,
    /// Run the bounding-box scan on the rayon pool (default: false)
    pub parallel_scan: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec {
                cols: DEFAULT_COLS,
                rows: DEFAULT_ROWS,
            },
            icon_names: IconNames::food_sheet(),
            detect_bounding_box: false,
            alpha_threshold: 0,
            parallel_scan: false,
        }
    }
}

/// On-disk description of a sheet. Every key is optional.
///
/// ```toml
/// cols = 4
/// rows = 7
/// detect_bounding_box = true
/// icon_names = ["pizza", "basketball", "..."]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetManifest {
    pub cols: Option<u32>,
    pub rows: Option<u32>,
    pub icon_names: Option<IconNames>,
    pub detect_bounding_box: Option<bool>,
    pub alpha_threshold: Option<u8>,
    pub parallel_scan: Option<bool>,
}

impl SheetManifest {
    /// Reads and parses a TOML manifest.
    pub fn from_file(path: &Path) -> Result<Self, SliceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SliceError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = toml::from_str(&raw).map_err(|source| SliceError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded manifest {}: {:?}", path.display(), manifest);
        Ok(manifest)
    }
}

impl SliceConfig {
    /// The default config overlaid with the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Self, SliceError> {
        let mut config = Self::default();
        config.apply(SheetManifest::from_file(path)?)?;
        Ok(config)
    }

    /// Overrides every field the manifest sets.
    pub fn apply(&mut self, manifest: SheetManifest) -> Result<(), SliceError> {
        if manifest.cols.is_some() || manifest.rows.is_some() {
            self.grid = GridSpec::new(
                manifest.cols.unwrap_or(self.grid.cols()),
                manifest.rows.unwrap_or(self.grid.rows()),
            )?;
        }
        if let Some(names) = manifest.icon_names {
            self.icon_names = names;
        }
        if let Some(detect) = manifest.detect_bounding_box {
            self.detect_bounding_box = detect;
        }
        if let Some(threshold) = manifest.alpha_threshold {
            self.alpha_threshold = threshold;
        }
        if let Some(parallel) = manifest.parallel_scan {
            self.parallel_scan = parallel;
        }
        Ok(())
    }

    /// Checks the names against the grid without building anything.
    pub fn validate(&self) -> Result<(), SliceError> {
        self.icon_names.validate(&self.grid)
    }

    /// A slicer for this config's grid and names.
    pub fn slicer(&self) -> Result<GridSlicer, SliceError> {
        GridSlicer::new(self.grid, self.icon_names.clone())
    }

    /// A bounding-box detector with this config's threshold and scan mode.
    pub fn detector(&self) -> BoundsDetector {
        BoundsDetector::new(self.alpha_threshold, self.parallel_scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(raw: &str) -> Result<SheetManifest, toml::de::Error> {
        toml::from_str(raw)
    }

    #[test]
    fn test_default_config_is_valid() {
        SliceConfig::default().validate().unwrap();
    }

    #[test]
    fn test_empty_manifest_keeps_defaults() {
        let mut config = SliceConfig::default();
        config.apply(parse("").unwrap()).unwrap();
        assert_eq!(config, SliceConfig::default());
    }

    #[test]
    fn test_manifest_overrides() {
        let manifest = parse(
            r#"
            cols = 2
            rows = 1
            detect_bounding_box = true
            alpha_threshold = 16
            icon_names = ["sun", "moon"]
            "#,
        )
        .unwrap();
        let mut config = SliceConfig::default();
        config.apply(manifest).unwrap();

        assert_eq!(config.grid, GridSpec::new(2, 1).unwrap());
        assert_eq!(config.icon_names, IconNames::new(["sun", "moon"]));
        assert!(config.detect_bounding_box);
        assert_eq!(config.alpha_threshold, 16);
        assert!(!config.parallel_scan);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_grid_override_keeps_other_axis() {
        let mut config = SliceConfig::default();
        config.apply(parse("rows = 2").unwrap()).unwrap();
        assert_eq!(config.grid, GridSpec::new(4, 2).unwrap());
        // Food names no longer fit an 8-cell grid
        assert!(matches!(
            config.validate(),
            Err(SliceError::NameListMismatch {
                expected: 8,
                actual: 28
            })
        ));
    }

    #[test]
    fn test_zero_cols_in_manifest() {
        let mut config = SliceConfig::default();
        let err = config.apply(parse("cols = 0").unwrap()).unwrap_err();
        assert!(matches!(err, SliceError::InvalidGrid { cols: 0, .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(parse("colums = 3").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "cols = 1\nrows = 1\nicon_names = [\"only\"]").unwrap();
        let config = SliceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.icon_names.get(0), Some("only"));
        assert_eq!(config.grid.cell_count(), 1);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = SliceConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, SliceError::ManifestRead { .. }));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "cols = \"four\"").unwrap();
        let err = SliceConfig::from_file(&bad).unwrap_err();
        assert!(matches!(err, SliceError::ManifestParse { .. }));
    }

    #[test]
    fn test_detector_follows_config() {
        let config = SliceConfig {
            alpha_threshold: 3,
            parallel_scan: true,
            ..SliceConfig::default()
        };
        assert_eq!(
            format!("{:?}", config.detector()),
            format!("{:?}", BoundsDetector::new(3, true))
        );
    }
}
