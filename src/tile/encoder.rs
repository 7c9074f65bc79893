//! PNG tile encoder.
//!
//! Rendered tiles carry transparency, so they are always encoded as RGBA PNG.

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::rasterizer::RgbaTile;
use crate::error::TileError;

/// PNG encoder for rendered tiles.
///
/// # Example
///
/// ```ignore
/// use snapshot_tiler::tile::PngTileEncoder;
///
/// let encoder = PngTileEncoder::new();
/// let png = encoder.encode(&tile)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PngTileEncoder {
    compression: CompressionType,
    filter: FilterType,
}

impl Default for PngTileEncoder {
    fn default() -> Self {
        Self {
            compression: CompressionType::Fast,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngTileEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trade encoding speed for smaller tiles.
    pub fn best_compression(mut self) -> Self {
        self.compression = CompressionType::Best;
        self
    }

    /// Encode an RGBA tile as PNG.
    pub fn encode(&self, tile: &RgbaTile) -> Result<Bytes, TileError> {
        let mut output = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut output, self.compression, self.filter);

        encoder
            .write_image(
                tile.as_raw(),
                tile.size(),
                tile.size(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Check whether data starts with the PNG signature.
#[inline]
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}
