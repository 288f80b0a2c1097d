//! Image decoding

use image::{load_from_memory, GenericImageView, ImageError};

use std::io::Read;

use crate::error::ProcessError;
use crate::upload::Upload;

use super::SourceImage;

/// Decode image from memory
///
/// Unrecognized or corrupt data, and rasters with no pixels, are `ProcessError::Decode`.
pub fn decode(data: &[u8]) -> Result<SourceImage, ProcessError> {
    let img = load_from_memory(data).map_err(|e| match e {
        // nothing to fail on but the buffer itself: the data is truncated or garbled
        ImageError::IoError(_) => ProcessError::Decode,
        other => other.into(),
    })?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessError::Decode);
    }

    Ok(img)
}

/// Drain the upload's byte stream and decode it
pub fn read_and_decode<U>(upload: &U) -> Result<SourceImage, ProcessError>
where
    U: Upload + ?Sized,
{
    let mut data = Vec::new();
    upload.open()?.read_to_end(&mut data)?;

    log::trace!("Read {} bytes from {}", data.len(), upload.name());
    decode(&data)
}
