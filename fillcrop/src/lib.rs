pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod image;
pub mod upload;

// Re-export commonly used types
pub use batch::{process_all, process_all_with, process_one, ProcessedResult, ResizedImage};
pub use cache::{ContentKey, ResultCache};
pub use config::ResizeConfig;
pub use error::{ErrorKind, ProcessError};
pub use crate::image::{PngCompression, SourceImage, TargetSpec, TARGET};
pub use upload::{Upload, UploadedFile};
