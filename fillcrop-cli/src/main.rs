mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fillcrop::{PngCompression, ProcessedResult, ResizeConfig, ResultCache, UploadedFile, TARGET};

#[derive(Parser)]
#[command(name = "fillcrop")]
#[command(about = "Resize and center-crop images to 640x480 without letterboxing", long_about = None)]
#[command(version)]
struct Args {
    /// Input images (JPEG or PNG)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// PNG compression level (defaults to the saved config)
    #[arg(long, value_enum)]
    png_compression: Option<PngCompressionArg>,

    /// Process every input even if an identical one was seen already
    #[arg(long, default_value_t)]
    no_cache: bool,

    /// Print a JSON report of every result to stdout
    #[arg(long, default_value_t)]
    json: bool,

    /// Persist the effective settings as the new defaults
    #[arg(long, default_value_t)]
    save_config: bool,

    /// Verbose output
    #[arg(short, long, default_value_t)]
    verbose: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, default_value_t)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PngCompressionArg {
    Fast,
    Default,
    Best,
}

impl From<PngCompressionArg> for PngCompression {
    fn from(arg: PngCompressionArg) -> Self {
        match arg {
            PngCompressionArg::Fast => PngCompression::Fast,
            PngCompressionArg::Default => PngCompression::Default,
            PngCompressionArg::Best => PngCompression::Best,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    let config = build_config(&args);
    if args.save_config && config.save().is_none() {
        log::warn!("Failed to save config");
    }

    // Create output directory if it doesn't exist
    if !args.output_dir.exists() {
        std::fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;
    }

    let uploads = load_uploads(&args.inputs);
    if uploads.is_empty() {
        anyhow::bail!("None of the inputs could be read");
    }

    log::info!("Resizing {} images to {TARGET}...", uploads.len());

    let results = run_batch(&uploads, &config, !args.no_cache);

    let failed = render(&results, &args.output_dir)?;

    if args.json {
        let report = report::Report::new(&results);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    let skipped = args.inputs.len() - uploads.len();
    if failed > 0 || skipped > 0 {
        anyhow::bail!(
            "{} of {} inputs failed",
            failed + skipped,
            args.inputs.len()
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn build_config(args: &Args) -> ResizeConfig {
    let mut config = ResizeConfig::load().unwrap_or_default();

    if let Some(compression) = args.png_compression {
        config.png_compression = compression.into();
    }

    config
}

/// Read every input into memory, reporting and skipping the unreadable ones
fn load_uploads(inputs: &[PathBuf]) -> Vec<UploadedFile> {
    inputs
        .iter()
        .filter_map(|path| {
            UploadedFile::from_path(path)
                .map_err(|e| log::error!("Skipping {}: {e:#}", path.display()))
                .ok()
        })
        .collect()
}

fn run_batch(
    uploads: &[UploadedFile],
    config: &ResizeConfig,
    use_cache: bool,
) -> Vec<Arc<ProcessedResult>> {
    let cache = use_cache
        .then(|| ResultCache::with_capacity(config.cache_capacity))
        .flatten();

    match cache {
        Some(cache) => cache.process_all(uploads, config),
        None => fillcrop::process_all_with(uploads, config)
            .into_iter()
            .map(Arc::new)
            .collect(),
    }
}

/// Write every processed image next to its siblings and report failures.
///
/// Returns the number of failed results.
fn render(results: &[Arc<ProcessedResult>], output_dir: &Path) -> Result<usize> {
    let mut failed = 0;

    for result in results {
        let resized = match &result.outcome {
            Ok(resized) => resized,
            Err(e) => {
                log::error!("Error: {} - {e}", result.filename);
                failed += 1;
                continue;
            }
        };

        let output_path = output_dir.join(result.download_name());
        std::fs::write(&output_path, &resized.encoded)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        log::info!(
            "{}: {}x{} -> {TARGET} in {:.2}s ({})",
            result.filename,
            resized.original.width(),
            resized.original.height(),
            resized.processing_time.as_secs_f64(),
            output_path.display()
        );
    }

    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use std::io::Cursor;

    fn jpeg(name: &str, width: u32, height: u32) -> UploadedFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 40, 60])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        UploadedFile::new(name, buffer.into_inner())
    }

    #[test]
    fn writes_resized_pngs_and_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = vec![
            jpeg("wide.jpg", 1920, 1080),
            UploadedFile::new("bad.png", b"nope".to_vec()),
            jpeg("tall.jpg", 600, 1200),
        ];

        let results = run_batch(&uploads, &ResizeConfig::default(), true);
        let failed = render(&results, dir.path()).unwrap();

        assert_eq!(failed, 1);
        assert!(!dir.path().join("resized_bad.png").exists());
        for name in ["resized_wide.jpg", "resized_tall.jpg"] {
            let bytes = std::fs::read(dir.path().join(name)).unwrap();
            let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
            assert_eq!((img.width(), img.height()), (640, 480), "{name}");
        }
    }

    #[test]
    fn unreadable_inputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("here.png");
        std::fs::write(&present, b"bytes").unwrap();

        let uploads = load_uploads(&[dir.path().join("missing.png"), present]);

        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, "here.png");
    }

    #[test]
    fn cache_can_be_bypassed() {
        let uploads = vec![jpeg("a.jpg", 100, 100), jpeg("a.jpg", 100, 100)];

        let cached = run_batch(&uploads, &ResizeConfig::default(), true);
        let uncached = run_batch(&uploads, &ResizeConfig::default(), false);

        assert!(Arc::ptr_eq(&cached[0], &cached[1]));
        assert!(!Arc::ptr_eq(&uncached[0], &uncached[1]));
    }

    #[test]
    fn cli_flag_overrides_compression() {
        let args = Args::parse_from(["fillcrop", "--png-compression", "best", "x.jpg"]);
        assert_eq!(build_config(&args).png_compression, PngCompression::Best);
    }
}
