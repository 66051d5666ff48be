//! 16-bit fixed-point raster format (KITTI convention).
//!
//! Disparity: single 16-bit channel, `disparity = raw / 256`, raw 0 marks an
//! invalid pixel.
//!
//! Flow: three 16-bit channels, `component = (raw - 2^15) / 64` for u and v,
//! third channel is a validity flag — raw 0 invalidates the pixel regardless
//! of the numeric payload in the first two channels.
//!
//! Encoders invert the transforms with rounding and clamp to the 16-bit
//! range; the validity channel is derived from each pixel's NaN state, so
//! partially-invalid fields round-trip.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb};

use crate::field::{Field, Mask};
use crate::io::{format_error, io_error, CodecError, CodecResult, FormatReason};

/// Fixed-point offset of the flow channels (`2^15`).
const FLOW_OFFSET: f64 = 32768.0;

/// Fixed-point scale of the flow channels: 1/64 pixel resolution.
const FLOW_SCALE: f64 = 64.0;

/// Fixed-point scale of disparity samples: 1/256 pixel resolution.
const DISP_SCALE: f64 = 256.0;

fn open(path: &Path) -> CodecResult<DynamicImage> {
    image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) => io_error(path, source),
        other => format_error(path, FormatReason::Container(other.to_string())),
    })
}

fn save(img: DynamicImage, path: &Path) -> CodecResult<()> {
    img.save(path).map_err(|e| match e {
        image::ImageError::IoError(source) => io_error(path, source),
        other => format_error(path, FormatReason::Container(other.to_string())),
    })
}

#[inline]
fn quantize(value: f64, scale: f64, offset: f64) -> u16 {
    (scale * value + offset).round().clamp(0.0, 65535.0) as u16
}

// ── Flow ───────────────────────────────────────────────────────────────────

/// Read a flow field from a 3-channel 16-bit PNG.
pub fn read_flow_png(path: &Path) -> CodecResult<Field> {
    let img = open(path)?;
    let rgb = match img {
        DynamicImage::ImageRgb16(buf) => buf,
        other => {
            return Err(format_error(
                path,
                FormatReason::ChannelLayout {
                    expected: "3-channel 16-bit",
                    found: format!("{:?}", other.color()),
                },
            ))
        }
    };

    let (w, h) = rgb.dimensions();
    let mut field = Field::filled(h as usize, w as usize, 2, f64::NAN);
    for (x, y, px) in rgb.enumerate_pixels() {
        let [u_raw, v_raw, valid] = px.0;
        if valid != 0 {
            field.set(y as usize, x as usize, 0, (u_raw as f64 - FLOW_OFFSET) / FLOW_SCALE);
            field.set(y as usize, x as usize, 1, (v_raw as f64 - FLOW_OFFSET) / FLOW_SCALE);
        }
    }
    Ok(field)
}

/// Write a flow field as a 3-channel 16-bit PNG.
///
/// Invalid pixels are written as `(0, 0, 0)`; valid pixels carry a validity
/// sample of 1.
pub fn write_flow_png(field: &Field, path: &Path) -> CodecResult<()> {
    if field.channels() != 2 {
        return Err(CodecError::Validation {
            reason: format!(
                "png flow encode needs a 2-channel field, got {} channels",
                field.channels()
            ),
        });
    }

    let (h, w) = (field.height(), field.width());
    let mut buf = ImageBuffer::<Rgb<u16>, Vec<u16>>::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let px = if field.is_valid(y, x) {
                Rgb([
                    quantize(field.get(y, x, 0), FLOW_SCALE, FLOW_OFFSET),
                    quantize(field.get(y, x, 1), FLOW_SCALE, FLOW_OFFSET),
                    1,
                ])
            } else {
                Rgb([0, 0, 0])
            };
            buf.put_pixel(x as u32, y as u32, px);
        }
    }
    save(DynamicImage::ImageRgb16(buf), path)
}

// ── Disparity ──────────────────────────────────────────────────────────────

/// Read a disparity field from a 1-channel 16-bit PNG.
pub fn read_disparity_png(path: &Path) -> CodecResult<Field> {
    let img = open(path)?;
    let gray = match img {
        DynamicImage::ImageLuma16(buf) => buf,
        other => {
            return Err(format_error(
                path,
                FormatReason::ChannelLayout {
                    expected: "1-channel 16-bit",
                    found: format!("{:?}", other.color()),
                },
            ))
        }
    };

    let (w, h) = gray.dimensions();
    let mut field = Field::filled(h as usize, w as usize, 1, f64::NAN);
    for (x, y, px) in gray.enumerate_pixels() {
        let raw = px.0[0];
        if raw != 0 {
            field.set(y as usize, x as usize, 0, raw as f64 / DISP_SCALE);
        }
    }
    Ok(field)
}

/// Write a disparity field as a 1-channel 16-bit PNG; NaN writes raw 0.
pub fn write_disparity_png(field: &Field, path: &Path) -> CodecResult<()> {
    if field.channels() != 1 {
        return Err(CodecError::Validation {
            reason: format!(
                "png disparity encode needs a 1-channel field, got {} channels",
                field.channels()
            ),
        });
    }

    let (h, w) = (field.height(), field.width());
    let mut buf = ImageBuffer::<Luma<u16>, Vec<u16>>::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let d = field.get(y, x, 0);
            let raw = if d.is_nan() {
                0
            } else {
                quantize(d, DISP_SCALE, 0.0)
            };
            buf.put_pixel(x as u32, y as u32, Luma([raw]));
        }
    }
    save(DynamicImage::ImageLuma16(buf), path)
}

// ── Masks ──────────────────────────────────────────────────────────────────

/// Read a grayscale PNG as a boolean mask (nonzero = true).
///
/// Object maps and evaluation masks ship as 8-bit grayscale images in the
/// dataset family this format comes from; 16-bit grayscale is accepted too.
pub fn read_mask_png(path: &Path) -> CodecResult<Mask> {
    let img = open(path)?;
    let (w, h, nonzero): (u32, u32, Vec<bool>) = match img {
        DynamicImage::ImageLuma8(buf) => {
            let (w, h) = buf.dimensions();
            (w, h, buf.pixels().map(|p| p.0[0] != 0).collect())
        }
        DynamicImage::ImageLuma16(buf) => {
            let (w, h) = buf.dimensions();
            (w, h, buf.pixels().map(|p| p.0[0] != 0).collect())
        }
        other => {
            return Err(format_error(
                path,
                FormatReason::ChannelLayout {
                    expected: "grayscale",
                    found: format!("{:?}", other.color()),
                },
            ))
        }
    };

    let mut mask = Mask::filled(h as usize, w as usize, false);
    for y in 0..h as usize {
        for x in 0..w as usize {
            mask.set(y, x, nonzero[y * w as usize + x]);
        }
    }
    Ok(mask)
}
