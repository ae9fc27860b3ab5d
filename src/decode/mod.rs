//! Decoder collaborator: encoded bytes in, straight-alpha RGBA8 raster out.

pub(crate) mod codec;

use std::ops::Deref;

use crate::foundation::{
    core::Dimensions,
    error::{SurfError, SurfResult},
};

/// Transient decoded image: row-major `R, G, B, A` bytes with straight alpha.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedRaster {
    dims: Dimensions,
    pixels: Vec<u8>,
}

impl DecodedRaster {
    /// Wrap decoded pixels; `pixels.len()` must equal `width * height * 4`.
    pub fn new(dims: Dimensions, pixels: Vec<u8>) -> SurfResult<Self> {
        let expected = dims.byte_size()?;
        if pixels.len() != expected {
            return Err(SurfError::validation(format!(
                "decoded raster {}x{} has {} bytes, expected {expected}",
                dims.width,
                dims.height,
                pixels.len()
            )));
        }
        Ok(Self { dims, pixels })
    }

    /// Raster width and height.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Row-major `R, G, B, A` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Unwrap into the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Something that turns encoded image bytes into a [`DecodedRaster`].
///
/// Implementations must always produce four channels, synthesizing alpha `255` for sources
/// without one. Rasters handed out by [`RasterDecoder::decode_rgba8`] come back through
/// [`RasterDecoder::release`] exactly once.
pub trait RasterDecoder {
    /// Decode `bytes`, forcing RGBA8. Failures are [`SurfError::Decode`] carrying the
    /// decoder's own diagnostic.
    fn decode_rgba8(&self, bytes: &[u8]) -> SurfResult<DecodedRaster>;

    /// Give a raster back to the decoder once it has been consumed.
    fn release(&self, raster: DecodedRaster) {
        drop(raster);
    }
}

/// A decoded raster that returns itself to its decoder when dropped.
pub(crate) struct RasterLease<'d, D: RasterDecoder + ?Sized> {
    decoder: &'d D,
    raster: DecodedRaster,
}

impl<'d, D: RasterDecoder + ?Sized> RasterLease<'d, D> {
    pub(crate) fn decode(decoder: &'d D, bytes: &[u8]) -> SurfResult<Self> {
        let raster = decoder.decode_rgba8(bytes)?;
        Ok(Self { decoder, raster })
    }
}

impl<D: RasterDecoder + ?Sized> Deref for RasterLease<'_, D> {
    type Target = DecodedRaster;

    fn deref(&self) -> &DecodedRaster {
        &self.raster
    }
}

impl<D: RasterDecoder + ?Sized> Drop for RasterLease<'_, D> {
    fn drop(&mut self) {
        let raster = std::mem::take(&mut self.raster);
        tracing::trace!(
            width = raster.dims.width,
            height = raster.dims.height,
            "release decoded raster"
        );
        self.decoder.release(raster);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/lease.rs"]
mod tests;
