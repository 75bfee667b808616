//! crack-detect: find and outline cracks in grayscale surface scans.
//!
//! Two modes share one pipeline:
//!
//! - `detect <IMAGE>` analyzes a single image and prints the verdict.
//! - `batch <FOLDER>` analyzes every `.tif`/`.tiff` scan in a folder,
//!   cropping the scanner's info bar off the bottom of each one.
//!
//! For every image with a crack, an outline preview (`<stem>_outline.jpg`)
//! is written, plus a region-of-interest subset file (`<stem>_subset.txt`)
//! when `--subset` is given.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin crack-detect -- detect scan.tif --subset
//! cargo run --release --bin crack-detect -- batch scans/ --darkness 50
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage pipeline events on stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crack_detect_pipeline::{
    ComponentStats, DetectConfig, DetectParams, Dimensions, GrayImage, PipelineError, Polygon,
    RankingKind, StagedResult,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Find and outline crack-like defects in grayscale scans.
#[derive(Parser)]
#[command(name = "crack-detect", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a single image.
    Detect {
        /// Path to the input image (TIFF, PNG, JPEG, BMP, WebP).
        image: PathBuf,

        /// Directory for the outline preview and subset file.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Analyze every `.tif`/`.tiff` image in a folder.
    ///
    /// Results are written to `<FOLDER>_results/`.
    Batch {
        /// Folder containing the scans.
        folder: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Pipeline parameters.
#[derive(Args)]
struct ParamArgs {
    /// Highest gray level (after smoothing) treated as crack.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_DARKNESS)]
    darkness: u8,

    /// Number of 5x5 dilation passes used to merge crack fragments.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_FILL_ITERATIONS)]
    fill_iterations: u32,

    /// Number of cracks to keep and outline.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_KEEP_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    keep_count: usize,

    /// Re-threshold cutoff for the smoothed outline mask.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_SHARPNESS)]
    sharpness: u8,

    /// Maximum outline simplification error in pixels.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Rows to drop from the bottom of each image [default: 0 for
    /// `detect`, 60 for `batch`].
    #[arg(long)]
    crop_bottom_rows: Option<u32>,

    /// How noise components are ranked against the crack.
    #[arg(long, value_enum, default_value_t = Ranking::Area)]
    ranking: Ranking,

    /// Full detection config as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Output options.
#[derive(Args)]
struct OutputArgs {
    /// Also write a region-of-interest subset file for each crack.
    #[arg(long)]
    subset: bool,

    /// Print one JSON object per image instead of the plain verdict.
    #[arg(long)]
    json: bool,

    /// Write every intermediate mask as PNG into this directory.
    #[arg(long)]
    dump_stages: Option<PathBuf>,
}

/// Component ranking selection.
#[derive(Clone, Copy, ValueEnum)]
enum Ranking {
    /// Keep the largest components.
    Area,
    /// Keep the most elongated components.
    Elongation,
}

impl From<Ranking> for RankingKind {
    fn from(r: Ranking) -> Self {
        match r {
            Ranking::Area => Self::Area,
            Ranking::Elongation => Self::Elongation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid --config-json: {0}")]
    ConfigJson(serde_json::Error),

    #[error("failed to serialize report: {0}")]
    Report(serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Per-image result, printed with `--json`.
#[derive(Serialize)]
struct ImageReport {
    image: String,
    defect: bool,
    component: Option<ComponentStats>,
    dimensions: Dimensions,
    polygons: Vec<Polygon>,
    outputs: Vec<String>,
}

/// Build a [`DetectConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed (and validated)
/// directly and all individual parameter flags are ignored. Otherwise
/// the config is assembled from the flags. Either way `default_crop`
/// applies when no crop is given.
fn config_from_cli(params: &ParamArgs, default_crop: u32) -> Result<DetectConfig, CliError> {
    if let Some(ref json) = params.config_json {
        let mut value: serde_json::Value =
            serde_json::from_str(json).map_err(CliError::ConfigJson)?;
        if let Some(object) = value.as_object_mut() {
            object
                .entry("crop_bottom_rows")
                .or_insert_with(|| default_crop.into());
        }
        return serde_json::from_value(value).map_err(CliError::ConfigJson);
    }

    Ok(DetectConfig::new(DetectParams {
        darkness: params.darkness,
        fill_iterations: params.fill_iterations,
        sharpness: params.sharpness,
        simplify_tolerance: params.simplify_tolerance,
        keep_count: params.keep_count,
        crop_bottom_rows: params.crop_bottom_rows.unwrap_or(default_crop),
        ranking: params.ranking.into(),
        ..DetectParams::default()
    })?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Detect {
            image,
            out_dir,
            params,
            output,
        } => run_detect(image, out_dir, params, output),
        Command::Batch {
            folder,
            params,
            output,
        } => run_batch(folder, params, output),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_detect(
    image: &Path,
    out_dir: &Path,
    params: &ParamArgs,
    output: &OutputArgs,
) -> Result<ExitCode, CliError> {
    let config = config_from_cli(params, DetectConfig::DEFAULT_CROP_BOTTOM_ROWS)?;
    tracing::debug!(?config, "detect");

    let report = process_image(image, &config, out_dir, output)?;
    if output.json {
        print_json(&report)?;
    } else {
        println!("{}", verdict(report.defect));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_batch(folder: &Path, params: &ParamArgs, output: &OutputArgs) -> Result<ExitCode, CliError> {
    let config = config_from_cli(params, DetectConfig::BATCH_CROP_BOTTOM_ROWS)?;
    let images = list_scans(folder)?;
    let out_dir = results_dir(folder);
    tracing::info!(
        folder = %folder.display(),
        images = images.len(),
        out_dir = %out_dir.display(),
        "starting batch"
    );

    let mut failed = 0_usize;
    let mut defects = 0_usize;
    for path in &images {
        match process_image(path, &config, &out_dir, output) {
            Ok(report) => {
                if report.defect {
                    defects += 1;
                }
                if output.json {
                    print_json(&report)?;
                } else {
                    println!("{}: {}", path.display(), verdict(report.defect));
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{e}");
            }
        }
    }

    tracing::info!(
        processed = images.len() - failed,
        defects,
        failed,
        "batch finished"
    );
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

const fn verdict(defect: bool) -> &'static str {
    if defect {
        "Crack detected"
    } else {
        "No crack detected"
    }
}

fn print_json(report: &ImageReport) -> Result<(), CliError> {
    let json = serde_json::to_string(report).map_err(CliError::Report)?;
    println!("{json}");
    Ok(())
}

/// Run the pipeline on one image file and write its outputs.
fn process_image(
    path: &Path,
    config: &DetectConfig,
    out_dir: &Path,
    output: &OutputArgs,
) -> Result<ImageReport, CliError> {
    let source = load_gray(path)?;
    let staged = crack_detect_pipeline::process_staged(&source, config)?;
    let stem = file_stem(path);
    tracing::info!(
        image = %path.display(),
        defect = staged.has_defect(),
        polygons = staged.polygons.len(),
        "analyzed"
    );

    if let Some(ref dir) = output.dump_stages {
        dump_stages(dir, &stem, &staged)?;
    }

    let mut outputs = Vec::new();
    if staged.has_defect() {
        create_dir(out_dir)?;

        let preview = crack_detect_export::render_outline(&staged.source, &staged.polygons);
        let outline_path = out_dir.join(format!("{stem}_outline.jpg"));
        preview
            .save(&outline_path)
            .map_err(|source| CliError::Save {
                path: outline_path.clone(),
                source,
            })?;
        outputs.push(outline_path.display().to_string());

        if output.subset {
            let roi = crack_detect_export::to_roi(&staged.polygons, staged.dimensions);
            let subset_path = out_dir.join(format!("{stem}_subset.txt"));
            fs::write(&subset_path, roi).map_err(|source| CliError::Io {
                path: subset_path.clone(),
                source,
            })?;
            outputs.push(subset_path.display().to_string());
        }
    }

    Ok(ImageReport {
        image: path.display().to_string(),
        defect: staged.has_defect(),
        component: staged.defect,
        dimensions: staged.dimensions,
        polygons: staged.polygons,
        outputs,
    })
}

/// Decode an image file to 8-bit grayscale.
fn load_gray(path: &Path) -> Result<GrayImage, CliError> {
    image::open(path)
        .map(image::DynamicImage::into_luma8)
        .map_err(|source| CliError::Load {
            path: path.to_path_buf(),
            source,
        })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned())
}

fn create_dir(dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(dir).map_err(|source| CliError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write each intermediate mask of `staged` as `<stem>_<stage>.png`.
fn dump_stages(dir: &Path, stem: &str, staged: &StagedResult) -> Result<(), CliError> {
    create_dir(dir)?;
    let stages: [(&str, &GrayImage); 7] = [
        ("source", &staged.source),
        ("binary", &staged.binary),
        ("dilated", &staged.dilated),
        ("filled", &staged.filled),
        ("eroded", &staged.eroded),
        ("cleaned", &staged.cleaned),
        ("smoothed", &staged.smoothed),
    ];
    for (name, mask) in stages {
        let path = dir.join(format!("{stem}_{name}.png"));
        mask.save(&path).map_err(|source| CliError::Save {
            path: path.clone(),
            source,
        })?;
    }
    tracing::debug!(dir = %dir.display(), stem, "dumped stage masks");
    Ok(())
}

/// Scans in `folder` with a `.tif` or `.tiff` extension, sorted by path.
fn list_scans(folder: &Path) -> Result<Vec<PathBuf>, CliError> {
    let io_err = |source: std::io::Error| CliError::Io {
        path: folder.to_path_buf(),
        source,
    };
    let mut scans = Vec::new();
    for entry in fs::read_dir(folder).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_tiff(&path) {
            scans.push(path);
        }
    }
    scans.sort();
    Ok(scans)
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

/// `<folder>_results`, next to `folder`.
fn results_dir(folder: &Path) -> PathBuf {
    let trimmed: PathBuf = folder.components().collect();
    let mut name = trimmed.into_os_string();
    name.push("_results");
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("crack-detect").chain(args.iter().copied())).unwrap()
    }

    fn params_of(cli: &Cli) -> &ParamArgs {
        match &cli.command {
            Command::Detect { params, .. } | Command::Batch { params, .. } => params,
        }
    }

    #[test]
    fn flag_defaults_match_pipeline_defaults() {
        let cli = parse(&["detect", "scan.tif"]);
        let config = config_from_cli(params_of(&cli), 0).unwrap();
        assert_eq!(config, DetectConfig::default());
    }

    #[test]
    fn batch_defaults_to_cropping_the_info_bar() {
        let cli = parse(&["batch", "scans"]);
        let config =
            config_from_cli(params_of(&cli), DetectConfig::BATCH_CROP_BOTTOM_ROWS).unwrap();
        assert_eq!(config.crop_bottom_rows(), 60);

        let cli = parse(&["batch", "scans", "--crop-bottom-rows", "0"]);
        let config =
            config_from_cli(params_of(&cli), DetectConfig::BATCH_CROP_BOTTOM_ROWS).unwrap();
        assert_eq!(config.crop_bottom_rows(), 0);
    }

    #[test]
    fn batch_config_json_keeps_the_info_bar_crop() {
        let cli = parse(&["batch", "scans", "--config-json", r#"{"darkness": 55}"#]);
        let config =
            config_from_cli(params_of(&cli), DetectConfig::BATCH_CROP_BOTTOM_ROWS).unwrap();
        assert_eq!(config.darkness(), 55);
        assert_eq!(config.crop_bottom_rows(), DetectConfig::BATCH_CROP_BOTTOM_ROWS);

        let cli = parse(&["batch", "scans", "--config-json", r#"{"crop_bottom_rows": 12}"#]);
        let config =
            config_from_cli(params_of(&cli), DetectConfig::BATCH_CROP_BOTTOM_ROWS).unwrap();
        assert_eq!(config.crop_bottom_rows(), 12);
    }

    #[test]
    fn flags_reach_the_config() {
        let cli = parse(&[
            "detect",
            "scan.tif",
            "--darkness",
            "70",
            "--fill-iterations",
            "3",
            "--keep-count",
            "2",
            "--ranking",
            "elongation",
        ]);
        let config = config_from_cli(params_of(&cli), 0).unwrap();
        assert_eq!(config.darkness(), 70);
        assert_eq!(config.fill_iterations(), 3);
        assert_eq!(config.keep_count(), 2);
        assert_eq!(config.ranking(), RankingKind::Elongation);
    }

    #[test]
    fn zero_keep_count_is_rejected_by_clap() {
        let args = ["crack-detect", "detect", "scan.tif", "--keep-count", "0"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "detect",
            "scan.tif",
            "--darkness",
            "70",
            "--config-json",
            r#"{"sharpness": 90}"#,
        ]);
        let config = config_from_cli(params_of(&cli), 0).unwrap();
        assert_eq!(config.darkness(), DetectConfig::DEFAULT_DARKNESS);
        assert_eq!(config.sharpness(), 90);
    }

    #[test]
    fn invalid_config_json_is_an_error() {
        let cli = parse(&["detect", "scan.tif", "--config-json", r#"{"keep_count": 0}"#]);
        assert!(matches!(
            config_from_cli(params_of(&cli), 0),
            Err(CliError::ConfigJson(_))
        ));
    }

    #[test]
    fn results_dir_sits_next_to_the_folder() {
        assert_eq!(results_dir(Path::new("scans")), PathBuf::from("scans_results"));
        assert_eq!(
            results_dir(Path::new("data/scans/")),
            PathBuf::from("data/scans_results")
        );
    }

    #[test]
    fn tiff_extensions() {
        assert!(is_tiff(Path::new("a.tif")));
        assert!(is_tiff(Path::new("b.TIFF")));
        assert!(!is_tiff(Path::new("c.png")));
        assert!(!is_tiff(Path::new("tif")));
    }

    #[test]
    fn verdict_text() {
        assert_eq!(verdict(true), "Crack detected");
        assert_eq!(verdict(false), "No crack detected");
    }
}
