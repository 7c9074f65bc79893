//! GeoTIFF decoding into [`RasterHandle`]s.
//!
//! Snapshots are uncompressed or deflate/LZW compressed 8-bit GeoTIFFs. The
//! pixel data is decoded with the `tiff` crate; georeferencing comes from the
//! standard GeoTIFF tags:
//!
//! | Tag | Number | Use |
//! |---|---|---|
//! | ModelPixelScale | 33550 | pixel size, with ModelTiepoint |
//! | ModelTiepoint | 33922 | raster-to-model anchor |
//! | ModelTransformation | 34264 | full affine, used when no tiepoint is present |
//! | GeoKeyDirectory | 34735 | EPSG code |
//! | GDAL_NODATA | 42113 | no-data sentinel |

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, warn};

use super::raster::{BandLayout, RasterHandle};
use crate::error::DecodeError;
use crate::geo::{GeoTransform, EPSG_WEB_MERCATOR};

pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

const GEO_KEY_PROJECTED_CS_TYPE: u16 = 3072;
const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;

/// Code used by GeoTIFF for "user defined"; never a real EPSG code.
const GEO_KEY_USER_DEFINED: u16 = 32767;

/// Largest decoded sample buffer accepted for one snapshot (256 MiB).
pub const MAX_DECODED_BYTES: usize = 256 * 1024 * 1024;

/// Decode GeoTIFF bytes into a raster handle.
///
/// Only the first image of the file is read. Fails with [`DecodeError`] when
/// the container is invalid, the sample layout is not 8-bit gray, gray+alpha,
/// RGB or RGBA, or the file carries no usable georeferencing.
pub fn decode_geotiff(bytes: &[u8]) -> Result<RasterHandle, DecodeError> {
    decode_geotiff_with_limit(bytes, MAX_DECODED_BYTES)
}

/// Decode with an explicit cap on the decoded sample buffer.
///
/// Oversized images are refused from their header, before any pixel data is
/// allocated.
pub fn decode_geotiff_with_limit(
    bytes: &[u8],
    max_decoded_bytes: usize,
) -> Result<RasterHandle, DecodeError> {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = max_decoded_bytes;

    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(tiff_error)?
        .with_limits(limits);

    let (width, height) = decoder.dimensions().map_err(tiff_error)?;
    let color_type = decoder.colortype().map_err(tiff_error)?;
    let layout = band_layout(color_type)?;

    let needed = u64::from(width) * u64::from(height) * layout.band_count() as u64;
    if needed > max_decoded_bytes as u64 {
        return Err(DecodeError::TooLarge {
            width,
            height,
            limit: max_decoded_bytes,
        });
    }

    let transform = read_transform(&mut decoder)?;
    let epsg = read_epsg(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let samples = match decoder.read_image().map_err(tiff_error)? {
        DecodingResult::U8(samples) => samples,
        _ => {
            return Err(DecodeError::UnsupportedLayout {
                color_type: format!("{:?}", color_type),
            })
        }
    };

    debug!(
        width,
        height,
        epsg,
        ?layout,
        ?nodata,
        "Decoded GeoTIFF"
    );

    RasterHandle::new(width, height, epsg, transform, layout, samples, nodata)
}

fn tiff_error(err: tiff::TiffError) -> DecodeError {
    DecodeError::Tiff(err.to_string())
}

fn band_layout(color_type: ColorType) -> Result<BandLayout, DecodeError> {
    match color_type {
        ColorType::Gray(8) => Ok(BandLayout::Gray),
        ColorType::GrayA(8) => Ok(BandLayout::GrayAlpha),
        ColorType::RGB(8) => Ok(BandLayout::Rgb),
        ColorType::RGBA(8) => Ok(BandLayout::Rgba),
        other => Err(DecodeError::UnsupportedLayout {
            color_type: format!("{:?}", other),
        }),
    }
}

fn find_f64s<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: u16,
) -> Result<Option<Vec<f64>>, DecodeError> {
    match decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(tiff_error)?
    {
        Some(value) => Ok(Some(value.into_f64_vec().map_err(tiff_error)?)),
        None => Ok(None),
    }
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform, DecodeError> {
    let scale = find_f64s(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64s(decoder, TAG_MODEL_TIEPOINT)?;

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            let scale = [scale[0], scale[1], scale.get(2).copied().unwrap_or(0.0)];
            let mut tp = [0.0; 6];
            tp.copy_from_slice(&tiepoint[..6]);
            return Ok(GeoTransform::from_tiepoint_and_scale(&tp, &scale));
        }
    }

    if let Some(matrix) = find_f64s(decoder, TAG_MODEL_TRANSFORMATION)? {
        if matrix.len() >= 16 {
            let mut m = [0.0; 16];
            m.copy_from_slice(&matrix[..16]);
            return Ok(GeoTransform::from_model_transformation(&m));
        }
    }

    Err(DecodeError::MissingGeoreference)
}

/// EPSG code from the GeoKeyDirectory.
///
/// Snapshots without a key directory are produced in Web Mercator.
fn read_epsg<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<u32, DecodeError> {
    let Some(value) = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
        .map_err(tiff_error)?
    else {
        return Ok(EPSG_WEB_MERCATOR);
    };
    let directory = value.into_u16_vec().map_err(tiff_error)?;

    Ok(geo_key(&directory, GEO_KEY_PROJECTED_CS_TYPE)
        .or_else(|| geo_key(&directory, GEO_KEY_GEOGRAPHIC_TYPE))
        .map(u32::from)
        .unwrap_or(EPSG_WEB_MERCATOR))
}

/// Inline value of `key` in a GeoKeyDirectory.
///
/// The directory is a 4-short header (version, revision, minor, key count)
/// followed by `(key, location, count, value)` entries. Only keys stored
/// inline (location 0) carry an EPSG code.
fn geo_key(directory: &[u16], key: u16) -> Option<u16> {
    let count = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
        .filter(|&code| code != 0 && code != GEO_KEY_USER_DEFINED)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<u8>, DecodeError> {
    let Some(value) = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .map_err(tiff_error)?
    else {
        return Ok(None);
    };
    let text = value.into_string().map_err(tiff_error)?;
    Ok(parse_nodata(&text))
}

/// Parse a GDAL_NODATA string into an 8-bit sentinel.
///
/// Values that no 8-bit sample can equal are dropped.
pub(crate) fn parse_nodata(text: &str) -> Option<u8> {
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && (0.0..=255.0).contains(&v) => Some(v as u8),
        _ => {
            warn!(nodata = trimmed, "Ignoring no-data value outside the 8-bit sample range");
            None
        }
    }
}
