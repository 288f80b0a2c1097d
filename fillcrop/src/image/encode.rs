//! Image encoding: PNG

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Compress an image to PNG format with the specified compression level
pub fn compress_to_png<W>(
    img: &DynamicImage,
    writer: &mut W,
    compression: PngCompression,
) -> Result<()>
where
    W: std::io::Write,
{
    let compression_type = match compression {
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Default => CompressionType::Default,
        PngCompression::Best => CompressionType::Best,
    };

    let is_grayscale = img.color() == ColorType::L8 || img.color() == ColorType::La8;

    let encoder = PngEncoder::new_with_quality(
        writer,
        compression_type,
        if is_grayscale {
            FilterType::NoFilter
        } else {
            FilterType::Adaptive
        },
    );

    encoder
        .write_image(
            img.as_bytes(),
            img.width(),
            img.height(),
            img.color().into(),
        )
        .with_context(|| "Failed to compress image to PNG")?;

    Ok(())
}

/// Encode an image into an in-memory PNG
pub fn encode_png(img: &DynamicImage, compression: PngCompression) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let mut buffer = Vec::with_capacity(size_hint(width, height));

    compress_to_png(img, &mut buffer, compression)?;

    log::trace!("Encoded {width}x{height} PNG: {} bytes", buffer.len());
    Ok(buffer)
}

/// Rough PNG size guess: one byte per pixel
fn size_hint(width: u32, height: u32) -> usize {
    (width as usize).saturating_mul(height as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn writes_a_png_that_reads_back_identically() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(5, 4, |x, y| {
            Rgba([x as u8 * 40, y as u8 * 60, 7, 200])
        }));

        let png = encode_png(&img, PngCompression::Best).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));

        let back = image::load_from_memory(&png).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn grayscale_stays_grayscale() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([128])));
        let png = encode_png(&img, PngCompression::Fast).unwrap();

        let back = image::load_from_memory(&png).unwrap();
        assert_eq!(back.color(), ColorType::L8);
    }

    #[test]
    fn size_hint_does_not_overflow() {
        assert_eq!(size_hint(640, 480), 307_200);
        assert!(size_hint(u32::MAX, u32::MAX) >= u32::MAX as usize);
    }
}
