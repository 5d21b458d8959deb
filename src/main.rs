use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sheet_slicer::{
    config::SheetManifest, slicer::DryRunSink, IconNames, PreparedSheet, SliceConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Slice a sprite sheet into one PNG per grid cell.
#[derive(Parser, Debug)]
#[command(name = "sheet-slicer", version, about)]
struct Cli {
    /// Sprite sheet to slice.
    input: PathBuf,

    /// Output directory [default: <input dir>/extracted].
    output: Option<PathBuf>,

    /// TOML sheet manifest (cols, rows, icon_names, detect_bounding_box, ...).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of grid columns.
    #[arg(long)]
    cols: Option<u32>,

    /// Number of grid rows.
    #[arg(long)]
    rows: Option<u32>,

    /// Comma-separated icon names in reading order.
    #[arg(long, value_delimiter = ',')]
    names: Option<Vec<String>>,

    /// Trim transparent padding before laying out the grid. `=false` turns off
    /// detection enabled by the manifest.
    #[arg(
        short = 'b',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    detect_bounds: Option<bool>,

    /// Treat pixels with alpha at or below this as padding.
    #[arg(long)]
    alpha_threshold: Option<u8>,

    /// Scan for the bounding box on all cores.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    parallel: Option<bool>,

    /// Also write an overlay of the grid on the sheet to this path.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Plan and log every cell without writing any file.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Defaults, then the manifest, then flags.
    fn resolve_config(&self) -> Result<SliceConfig> {
        let mut config = match &self.config {
            Some(path) => SliceConfig::from_file(path)?,
            None => SliceConfig::default(),
        };
        config.apply(SheetManifest {
            cols: self.cols,
            rows: self.rows,
            icon_names: self.names.clone().map(IconNames::new),
            detect_bounding_box: self.detect_bounds,
            alpha_threshold: self.alpha_threshold,
            parallel_scan: self.parallel,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_dir(&self.input))
    }
}

/// `extracted/` next to the input sheet.
fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("extracted")
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config().context("Invalid slicing configuration")?;
    let sheet = PreparedSheet::prepare(&cli.input, &config)
        .with_context(|| format!("Failed to prepare {}", cli.input.display()))?;

    #[cfg(feature = "drawing")]
    if let Some(preview) = &cli.preview {
        sheet_slicer::debug::save_preview(
            sheet.image(),
            sheet.bounding_box(),
            &sheet.cells()?,
            preview,
            &sheet_slicer::drawing::PreviewConfig::default(),
        )?;
    }
    #[cfg(not(feature = "drawing"))]
    if cli.preview.is_some() {
        tracing::warn!("--preview needs the `drawing` feature, skipping");
    }

    if cli.dry_run {
        let report = sheet.slice_into(&mut DryRunSink)?;
        info!("Dry run: {} cells planned, nothing written", report.written);
        return Ok(());
    }

    sheet
        .write_to(&cli.output_dir())
        .context("Extraction aborted; cells written so far are left in place")?;
    Ok(())
}

fn main() -> Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sheet_slicer=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

/// Unit tests for argument handling and the end-to-end run.
#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
    use sheet_slicer::{GridSpec, SliceError};
    use test_case::test_case;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sheet-slicer").chain(args.iter().copied())).unwrap()
    }

    fn write_sheet(path: &Path, width: u32, height: u32) {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([5, 5, 5, 255])))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test_case("assets/ingredients/Food.png" => PathBuf::from("assets/ingredients/extracted"); "nested")]
    #[test_case("Food.png" => PathBuf::from("extracted"); "bare file")]
    fn test_default_output_dir(input: &str) -> PathBuf {
        default_output_dir(Path::new(input))
    }

    #[test]
    fn test_defaults_are_food_sheet() {
        let config = parse(&["Food.png"]).resolve_config().unwrap();
        pretty_assertions::assert_eq!(config, SliceConfig::default());
    }

    #[test]
    fn test_flags_override_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("sheet.toml");
        std::fs::write(
            &manifest,
            "cols = 3\nrows = 1\nicon_names = [\"a\", \"b\", \"c\"]\n",
        )
        .unwrap();

        let cli = parse(&[
            "sheet.png",
            "--config",
            manifest.to_str().unwrap(),
            "--cols",
            "2",
            "--names",
            "x,y",
            "-b",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.grid, GridSpec::new(2, 1).unwrap());
        assert_eq!(config.icon_names, IconNames::new(["x", "y"]));
        assert!(config.detect_bounding_box);
    }

    #[test_case(&["-b"] => true; "short flag")]
    #[test_case(&["--detect-bounds"] => true; "long flag")]
    #[test_case(&["--detect-bounds=true"] => true; "explicit true")]
    #[test_case(&["--detect-bounds=false"] => false; "explicit false")]
    #[test_case(&["-b=false"] => false; "short explicit false")]
    #[test_case(&[] => true; "manifest value kept")]
    fn test_detect_bounds_flag_over_manifest(flags: &[&str]) -> bool {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("sheet.toml");
        std::fs::write(&manifest, "detect_bounding_box = true\nparallel_scan = true\n").unwrap();

        let mut args = vec!["sheet.png", "--config", manifest.to_str().unwrap()];
        args.extend_from_slice(flags);
        parse(&args).resolve_config().unwrap().detect_bounding_box
    }

    #[test]
    fn test_flag_without_value_leaves_positional_alone() {
        let cli = parse(&["sheet.png", "-b", "out", "--parallel=false"]);
        assert_eq!(cli.detect_bounds, Some(true));
        assert_eq!(cli.parallel, Some(false));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_mismatched_flags_fail_validation() {
        let err = parse(&["sheet.png", "--cols", "2", "--rows", "2", "--names", "a,b,c"])
            .resolve_config()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SliceError>(),
            Some(SliceError::NameListMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_run_writes_every_cell() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("Food.png");
        write_sheet(&input, 1024, 1536);

        run(&parse(&[input.to_str().unwrap()])).unwrap();

        let out = dir.path().join("extracted");
        let mut written: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        let mut expected: Vec<String> = IconNames::food_sheet()
            .iter()
            .map(|n| format!("{n}.png"))
            .collect();
        expected.sort();
        assert_eq!(written, expected);

        let pizza = image::open(out.join("pizza.png")).unwrap();
        assert_eq!(pizza.dimensions(), (256, 219));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("sheet.png");
        write_sheet(&input, 40, 70);
        let out = dir.path().join("out");

        run(&parse(&[
            input.to_str().unwrap(),
            out.to_str().unwrap(),
            "--dry-run",
        ]))
        .unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_detection_on_opaque_rgb_fails_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("sheet.png");
        DynamicImage::ImageRgb8(image::RgbImage::new(40, 70))
            .save(&input)
            .unwrap();
        let out = dir.path().join("out");

        let err = run(&parse(&[
            input.to_str().unwrap(),
            out.to_str().unwrap(),
            "--detect-bounds",
        ]))
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SliceError>(),
            Some(SliceError::InvalidImage { .. })
        ));
        assert!(!out.exists());
    }

    #[cfg(feature = "drawing")]
    #[test]
    fn test_preview_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("sheet.png");
        write_sheet(&input, 40, 70);
        let preview = dir.path().join("preview.png");

        run(&parse(&[
            input.to_str().unwrap(),
            "--dry-run",
            "--preview",
            preview.to_str().unwrap(),
        ]))
        .unwrap();
        assert!(preview.exists());
    }
}
