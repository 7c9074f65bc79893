use crate::error::{DecodeError, GeoError};
use crate::geo::{native_bounding_box, BoundingBox, Crs, GeoTransform};

/// Band arrangement of an 8-bit, pixel-interleaved raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl BandLayout {
    /// Number of samples per pixel.
    pub fn band_count(self) -> usize {
        match self {
            BandLayout::Gray => 1,
            BandLayout::GrayAlpha => 2,
            BandLayout::Rgb => 3,
            BandLayout::Rgba => 4,
        }
    }

    /// Number of samples per pixel that carry color.
    pub fn color_bands(self) -> usize {
        match self {
            BandLayout::Gray | BandLayout::GrayAlpha => 1,
            BandLayout::Rgb | BandLayout::Rgba => 3,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, BandLayout::GrayAlpha | BandLayout::Rgba)
    }
}

/// A decoded snapshot raster.
///
/// Immutable after construction and shared between concurrent renders via
/// `Arc`. Construction validates that the sample buffer matches the declared
/// dimensions and that the transform can be inverted, so readers never have
/// to re-check either.
#[derive(Debug)]
pub struct RasterHandle {
    width: u32,
    height: u32,
    epsg: u32,
    transform: GeoTransform,
    layout: BandLayout,
    samples: Vec<u8>,
    nodata: Option<u8>,
}

impl RasterHandle {
    pub fn new(
        width: u32,
        height: u32,
        epsg: u32,
        transform: GeoTransform,
        layout: BandLayout,
        samples: Vec<u8>,
        nodata: Option<u8>,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }

        let expected = width as usize * height as usize * layout.band_count();
        if samples.len() != expected {
            return Err(DecodeError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }

        if !transform.is_invertible() {
            return Err(DecodeError::DegenerateTransform);
        }

        Ok(Self {
            width,
            height,
            epsg,
            transform,
            layout,
            samples,
            nodata,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// EPSG code of the raster's native projection.
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn layout(&self) -> BandLayout {
        self.layout
    }

    pub fn nodata(&self) -> Option<u8> {
        self.nodata
    }

    /// Size of the decoded sample buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.samples.len()
    }

    /// Samples of the pixel at `(col, row)`, or `None` outside the raster.
    #[inline]
    pub fn pixel(&self, col: u32, row: u32) -> Option<&[u8]> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let bands = self.layout.band_count();
        let start = (row as usize * self.width as usize + col as usize) * bands;
        self.samples.get(start..start + bands)
    }

    /// Resolve the native projection.
    pub fn crs(&self) -> Result<Crs, GeoError> {
        Crs::from_epsg(self.epsg)
    }

    /// Bounding box in the native projection.
    pub fn native_bounds(&self) -> BoundingBox {
        native_bounding_box(self.width, self.height, &self.transform)
    }

    /// Bounding box in geographic longitude/latitude.
    ///
    /// The four native corners are reprojected and re-enveloped.
    pub fn geographic_bounds(&self) -> Result<BoundingBox, GeoError> {
        let crs = self.crs()?;
        let corners = self
            .native_bounds()
            .corners()
            .map(|p| crs.transform(Crs::Geographic, p));
        Ok(BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0)))
    }
}
