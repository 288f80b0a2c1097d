//! Decode, fill-frame resize and PNG encode

mod decode;
mod encode;
mod transform;

// Re-export public API
pub use decode::{decode, read_and_decode};
pub use encode::{compress_to_png, encode_png, PngCompression};
pub use transform::{crop_offsets, fill_dimensions, resize_and_crop};

use image::DynamicImage;

/// A decoded raster, alive only for the duration of one item's processing
pub type SourceImage = DynamicImage;

/// Every processed image comes out exactly this size
pub const TARGET: TargetSpec = TargetSpec::new(640, 480);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TargetSpec {
    pub width: u32,
    pub height: u32,
}

impl TargetSpec {
    pub const fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "target dimensions must be non-zero");
        Self { width, height }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
