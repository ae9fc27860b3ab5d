use std::io::Cursor;

use crate::{
    decode::{DecodedRaster, RasterDecoder},
    foundation::{
        core::Dimensions,
        error::{SurfError, SurfResult},
    },
};

/// Encoded container formats [`ImageDecoder`] can be asked to accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodedFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
    /// GIF; only the first frame is decoded.
    Gif,
    /// Windows bitmap.
    Bmp,
}

impl EncodedFormat {
    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }
}

/// Decoder configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecoderOpts {
    /// Formats accepted by the decoder. Anything else is a decode error.
    pub formats: Vec<EncodedFormat>,
    /// Reject images wider than this.
    pub max_width: Option<u32>,
    /// Reject images taller than this.
    pub max_height: Option<u32>,
    /// Upper bound on decoder-internal allocations, in bytes.
    pub max_alloc: Option<u64>,
}

impl Default for DecoderOpts {
    fn default() -> Self {
        Self {
            formats: vec![EncodedFormat::Png, EncodedFormat::Jpeg],
            max_width: None,
            max_height: None,
            max_alloc: None,
        }
    }
}

impl DecoderOpts {
    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> SurfResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| SurfError::Other(anyhow::Error::new(e).context("parse decoder options")))
    }

    fn limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = self.max_width;
        limits.max_image_height = self.max_height;
        if self.max_alloc.is_some() {
            limits.max_alloc = self.max_alloc;
        }
        limits
    }
}

/// [`RasterDecoder`] backed by the `image` crate.
#[derive(Clone, Debug, Default)]
pub struct ImageDecoder {
    opts: DecoderOpts,
}

impl ImageDecoder {
    /// Decoder with explicit options.
    pub fn new(opts: DecoderOpts) -> Self {
        Self { opts }
    }

    /// Options in effect.
    pub fn opts(&self) -> &DecoderOpts {
        &self.opts
    }
}

impl RasterDecoder for ImageDecoder {
    fn decode_rgba8(&self, bytes: &[u8]) -> SurfResult<DecodedRaster> {
        if bytes.is_empty() {
            return Err(SurfError::decode("empty input"));
        }

        let format = image::guess_format(bytes).map_err(|e| SurfError::decode(e.to_string()))?;
        if !EncodedFormat::from_image_format(format).is_some_and(|f| self.opts.formats.contains(&f))
        {
            return Err(SurfError::decode(format!(
                "unsupported image format: {format:?}"
            )));
        }

        let mut reader = image::ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(self.opts.limits());
        let img = reader
            .decode()
            .map_err(|e| SurfError::decode(e.to_string()))?;

        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(?format, width, height, "decoded raster");
        DecodedRaster::new(Dimensions::new(width, height), rgba.into_raw())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/codec.rs"]
mod tests;
