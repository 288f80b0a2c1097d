//! Fill-frame resize followed by a center crop

use anyhow::{Context, Result};
use fast_image_resize as fr;
use fr::images::Image as FrImage;
use image::{
    ColorType, DynamicImage, GenericImageView, GrayAlphaImage, GrayImage, RgbImage, RgbaImage,
};

use std::borrow::Cow;

use super::{SourceImage, TargetSpec};

/// Size the source has to be scaled to so that it covers `target` on both axes.
///
/// The constrained axis matches the target exactly, the other one overflows or matches.
/// `None` when the overflowing axis does not fit in a `u32`.
pub fn fill_dimensions(source: (u32, u32), target: TargetSpec) -> Option<(u32, u32)> {
    let (width, height) = source;
    let source_aspect = width as f64 / height as f64;

    if source_aspect > target.aspect() {
        // wider than the target: pin the height
        let new_width = to_dimension(target.height as f64 * source_aspect)?;
        Some((new_width.max(target.width), target.height))
    } else {
        // taller or same shape: pin the width
        let new_height = to_dimension(target.width as f64 / source_aspect)?;
        Some((target.width, new_height.max(target.height)))
    }
}

fn to_dimension(value: f64) -> Option<u32> {
    let value = value.round();
    (value.is_finite() && value <= u32::MAX as f64).then_some(value as u32)
}

/// Top-left corner of the centered `target` window inside an image of `intermediate` size
pub fn crop_offsets(intermediate: (u32, u32), target: TargetSpec) -> (u32, u32) {
    let (width, height) = intermediate;
    let left = width.saturating_sub(target.width) / 2;
    let top = height.saturating_sub(target.height) / 2;
    (left, top)
}

/// Region of the source, in source pixels, that ends up in the output
#[derive(Debug, Clone, Copy, PartialEq)]
struct SourceWindow {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

/// Scale `img` uniformly until it fills `target`, then cut away the overflow evenly.
///
/// The result is always exactly `target` sized. The source must have a non-zero area.
/// The scaled intermediate is never materialized: the crop window is mapped back onto
/// the source and only that region is resampled, so extreme aspect ratios cost no more
/// memory than the output itself.
pub fn resize_and_crop(img: &SourceImage, target: TargetSpec) -> Result<SourceImage> {
    let source = img.dimensions();
    anyhow::ensure!(
        source.0 > 0 && source.1 > 0,
        "Cannot resize an empty {}x{} image",
        source.0,
        source.1
    );

    let (new_width, new_height) = fill_dimensions(source, target).with_context(|| {
        format!(
            "Cannot fill {target} from {}x{}: intermediate size too large",
            source.0, source.1
        )
    })?;
    let (left, top) = crop_offsets((new_width, new_height), target);

    log::trace!(
        "{}x{} -> {new_width}x{new_height}, crop at ({left}, {top})",
        source.0,
        source.1
    );

    let img = normalize(img);

    if (new_width, new_height) == source {
        return Ok(img.crop_imm(left, top, target.width, target.height));
    }

    let window = if (left, top) == (0, 0) && (new_width, new_height) == target.dimensions() {
        None
    } else {
        let scale_x = new_width as f64 / source.0 as f64;
        let scale_y = new_height as f64 / source.1 as f64;
        Some(SourceWindow {
            left: left as f64 / scale_x,
            top: top as f64 / scale_y,
            width: target.width as f64 / scale_x,
            height: target.height as f64 / scale_y,
        })
    };

    resize_lanczos(&img, target.width, target.height, window)
}

/// Bring exotic color types (16 bit, float) down to the 8 bit layouts the resizer handles
fn normalize(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    let color = img.color();
    match color {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(img),
        _ => Cow::Owned(match (color.has_color(), color.has_alpha()) {
            (false, false) => DynamicImage::ImageLuma8(img.to_luma8()),
            (false, true) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
            (true, false) => DynamicImage::ImageRgb8(img.to_rgb8()),
            (true, true) => DynamicImage::ImageRgba8(img.to_rgba8()),
        }),
    }
}

fn resize_lanczos(
    img: &DynamicImage,
    new_width: u32,
    new_height: u32,
    window: Option<SourceWindow>,
) -> Result<DynamicImage> {
    let (width, height) = img.dimensions();
    let color = img.color();

    let pixel_type = match color {
        ColorType::L8 => fr::PixelType::U8,
        ColorType::La8 => fr::PixelType::U8x2,
        ColorType::Rgb8 => fr::PixelType::U8x3,
        ColorType::Rgba8 => fr::PixelType::U8x4,
        other => anyhow::bail!("Unsupported color mode: {other:?}"),
    };

    // fast_image_resize wants to own the source buffer
    let src_image = FrImage::from_vec_u8(width, height, img.as_bytes().to_vec(), pixel_type)
        .context("Failed to wrap source pixels")?;
    let mut dst_image = FrImage::new(new_width, new_height, pixel_type);

    let mut options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
    if let Some(w) = window {
        options = options.crop(w.left, w.top, w.width, w.height);
    }

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .with_context(|| format!("Failed to resize {width}x{height} to {new_width}x{new_height}"))?;

    let buffer = dst_image.into_vec();
    let resized = match color {
        ColorType::L8 => GrayImage::from_raw(new_width, new_height, buffer).map(DynamicImage::from),
        ColorType::La8 => {
            GrayAlphaImage::from_raw(new_width, new_height, buffer).map(DynamicImage::from)
        }
        ColorType::Rgb8 => RgbImage::from_raw(new_width, new_height, buffer).map(DynamicImage::from),
        _ => RgbaImage::from_raw(new_width, new_height, buffer).map(DynamicImage::from),
    };

    resized.context("Resized buffer does not match its dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::TARGET;
    use image::{ImageBuffer, Luma, Rgb, Rgba};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn output_is_always_target_sized() {
        let sources = [
            (1920, 1080),
            (1080, 1920),
            (640, 480),
            (480, 640),
            (1000, 1000),
            (1, 1),
            (1200, 90),
            (90, 1200),
            (641, 480),
            (640, 481),
        ];

        for (w, h) in sources {
            let out = resize_and_crop(&gradient(w, h), TARGET).unwrap();
            assert_eq!(out.dimensions(), (640, 480), "source {w}x{h}");
        }
    }

    #[test]
    fn full_hd_scenario() {
        let target = TARGET;
        assert_eq!(fill_dimensions((1920, 1080), target).unwrap(), (853, 480));
        assert_eq!(crop_offsets((853, 480), target), (106, 0));
    }

    #[test]
    fn portrait_pins_the_width() {
        let (w, h) = fill_dimensions((1080, 1920), TARGET).unwrap();
        assert_eq!(w, 640);
        assert_eq!(h, 1138);
        assert_eq!(crop_offsets((w, h), TARGET), (0, 329));
    }

    #[test]
    fn wider_sources_pin_the_height() {
        for (w, h) in [(1920, 1080), (800, 480), (5000, 100), (2, 1)] {
            let (iw, ih) = fill_dimensions((w, h), TARGET).unwrap();
            assert_eq!(ih, TARGET.height, "source {w}x{h}");
            assert!(iw >= TARGET.width, "source {w}x{h}");
        }
    }

    #[test]
    fn taller_sources_pin_the_width() {
        for (w, h) in [(1080, 1920), (480, 480), (1, 5000), (639, 480)] {
            let (iw, ih) = fill_dimensions((w, h), TARGET).unwrap();
            assert_eq!(iw, TARGET.width, "source {w}x{h}");
            assert!(ih >= TARGET.height, "source {w}x{h}");
        }
    }

    #[test]
    fn square_to_square_is_a_plain_resize() {
        let target = TargetSpec::new(200, 200);
        let src = gradient(500, 500);

        assert_eq!(fill_dimensions((500, 500), target), Some((200, 200)));
        assert_eq!(crop_offsets((200, 200), target), (0, 0));

        let cropped = resize_and_crop(&src, target).unwrap();
        let direct = resize_lanczos(&src, 200, 200, None).unwrap();
        assert_eq!(cropped, direct);
    }

    #[test]
    fn already_sized_image_is_left_alone() {
        let once = resize_and_crop(&gradient(1920, 1080), TARGET).unwrap();
        let twice = resize_and_crop(&once, TARGET).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn crop_keeps_the_center() {
        // left third red, middle third green, right third blue
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(1920, 480, |x, _| match x {
            0..=639 => Rgb([255, 0, 0]),
            640..=1279 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        }));

        let out = resize_and_crop(&src, TARGET).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(320, 240), &Rgb([0, 255, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 255, 0]));
        assert_eq!(out.get_pixel(639, 479), &Rgb([0, 255, 0]));
    }

    #[test]
    fn keeps_alpha_and_grayscale() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 100, Rgba([1, 2, 3, 4])));
        assert_eq!(resize_and_crop(&rgba, TARGET).unwrap().color(), ColorType::Rgba8);

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 300, Luma([9])));
        assert_eq!(resize_and_crop(&gray, TARGET).unwrap().color(), ColorType::L8);
    }

    #[test]
    fn sixteen_bit_sources_are_normalized() {
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(1000, 500, Rgb([65535, 0, 0]));
        let out = resize_and_crop(&DynamicImage::ImageRgb16(img), TARGET).unwrap();

        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.dimensions(), (640, 480));
        let Rgb([r, g, b]) = *out.to_rgb8().get_pixel(320, 240);
        assert!(r >= 250 && g <= 5 && b <= 5, "got {r},{g},{b}");
    }

    #[test]
    fn empty_images_are_rejected() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(resize_and_crop(&empty, TARGET).is_err());
    }

    #[test]
    fn extreme_strips_fill_the_frame_without_a_huge_intermediate() {
        // the fill size would be 19_200_000x480 and 640x19_200_000
        let wide = gradient(40_000, 1);
        assert_eq!(fill_dimensions((40_000, 1), TARGET), Some((19_200_000, 480)));
        assert_eq!(resize_and_crop(&wide, TARGET).unwrap().dimensions(), (640, 480));

        let tall = gradient(1, 40_000);
        assert_eq!(resize_and_crop(&tall, TARGET).unwrap().dimensions(), (640, 480));
    }

    #[test]
    fn fill_size_beyond_u32_is_reported() {
        assert_eq!(fill_dimensions((u32::MAX, 1), TARGET), None);
        assert_eq!(fill_dimensions((1, u32::MAX), TARGET), None);
    }

    #[test]
    fn strip_keeps_its_middle() {
        // 4000x1: the window is the middle 5.33 source pixels, all green
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(4000, 1, |x, _| {
            if (1900..2100).contains(&x) {
                Rgb([0, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        }));

        let out = resize_and_crop(&src, TARGET).unwrap().to_rgb8();
        let Rgb([r, g, _]) = *out.get_pixel(320, 240);
        assert!(g >= 250 && r <= 5, "got {r},{g}");
    }
}
