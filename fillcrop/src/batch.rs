//! Concurrent decode -> resize -> encode over a batch of uploads

use image::GenericImageView;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::config::ResizeConfig;
use crate::error::ProcessError;
use crate::image::{self as imaging, PngCompression, SourceImage, TARGET};
use crate::upload::Upload;

/// Everything the presentation layer needs for one successfully processed upload
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub original: SourceImage,
    pub resized: SourceImage,
    pub encoded: Vec<u8>,
    pub processing_time: Duration,
}

/// One entry per upload, in upload order. Never mutated once built.
#[derive(Debug, Clone)]
pub struct ProcessedResult {
    pub filename: String,
    pub outcome: Result<ResizedImage, ProcessError>,
}

impl ProcessedResult {
    pub const MIME_TYPE: &'static str = "image/png";

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn original(&self) -> Option<&SourceImage> {
        self.outcome.as_ref().ok().map(|r| &r.original)
    }

    pub fn resized(&self) -> Option<&SourceImage> {
        self.outcome.as_ref().ok().map(|r| &r.resized)
    }

    pub fn encoded(&self) -> Option<&[u8]> {
        self.outcome.as_ref().ok().map(|r| r.encoded.as_slice())
    }

    pub fn error(&self) -> Option<&ProcessError> {
        self.outcome.as_ref().err()
    }

    pub fn processing_time(&self) -> Option<Duration> {
        self.outcome.as_ref().ok().map(|r| r.processing_time)
    }

    pub fn processing_time_secs(&self) -> Option<f64> {
        self.processing_time().map(|d| d.as_secs_f64())
    }

    /// File name the processed image is offered for download under
    pub fn download_name(&self) -> String {
        format!("resized_{}", self.filename)
    }
}

/// Process a single upload, turning every failure (panics included) into a result
pub fn process_one<U>(upload: &U, config: &ResizeConfig) -> ProcessedResult
where
    U: Upload + ?Sized,
{
    let filename = upload.name().to_string();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        resize_upload(upload, config.png_compression)
    }))
    .unwrap_or_else(|payload| {
        Err(ProcessError::processing(format!(
            "worker panicked: {}",
            panic_message(payload.as_ref())
        )))
    });

    match &outcome {
        Ok(resized) => log::debug!(
            "Processed {filename} in {:.2}s",
            resized.processing_time.as_secs_f64()
        ),
        Err(e) => log::warn!("Failed to process {filename}: {e}"),
    }

    ProcessedResult { filename, outcome }
}

fn resize_upload<U>(upload: &U, compression: PngCompression) -> Result<ResizedImage, ProcessError>
where
    U: Upload + ?Sized,
{
    let start = Instant::now();

    let original = imaging::read_and_decode(upload)?;
    let resized = imaging::resize_and_crop(&original, TARGET)?;
    let encoded = imaging::encode_png(&resized, compression)?;

    let processing_time = start.elapsed();

    log::trace!(
        "{}: {:?} -> {TARGET}, {} bytes",
        upload.name(),
        original.dimensions(),
        encoded.len()
    );

    Ok(ResizedImage {
        original,
        resized,
        encoded,
        processing_time,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Process every upload with the default settings. See [`process_all_with`].
pub fn process_all<U>(uploads: &[U]) -> Vec<ProcessedResult>
where
    U: Upload + Sync,
{
    process_all_with(uploads, &ResizeConfig::default())
}

/// Process every upload concurrently and return one result per upload, in input order.
///
/// A dedicated pool sized to the host's parallelism is built for the call and
/// torn down before returning. Never fails as a whole: per-upload failures are
/// reported in the matching result.
pub fn process_all_with<U>(uploads: &[U], config: &ResizeConfig) -> Vec<ProcessedResult>
where
    U: Upload + Sync,
{
    if uploads.is_empty() {
        return Vec::new();
    }

    log::info!("Processing batch of {} images", uploads.len());

    let start = Instant::now();
    // indexed parallel iterator: collect keeps input order regardless of completion order
    let run = || {
        uploads
            .par_iter()
            .map(|upload| process_one(upload, config))
            .collect::<Vec<_>>()
    };

    let num_threads = worker_count();
    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("fillcrop-worker-{i}"))
        .build()
    {
        Ok(pool) => {
            log::debug!("Processing with {num_threads} threads");
            pool.install(run)
        }
        Err(e) => {
            log::warn!("Failed to build worker pool, using the global one: {e}");
            run()
        }
    };

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        log::warn!(
            "Batch completed with {failed} failed images out of {} in {:.2}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );
    } else {
        log::info!(
            "Batch completed: {} images in {:.2}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );
    }

    results
}

fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
