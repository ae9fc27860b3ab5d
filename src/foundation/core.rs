use crate::foundation::error::{SurfError, SurfResult};

/// Bytes per pixel for every raster and surface handled by this crate.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel layout of a surface buffer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum SurfaceFormat {
    /// 32-bit premultiplied ARGB in native little-endian word order, i.e. bytes `B, G, R, A`.
    #[default]
    Argb32Premul,
}

impl SurfaceFormat {
    /// Bytes used by one pixel in this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Argb32Premul => BYTES_PER_PIXEL,
        }
    }
}

/// Width and height of a raster or surface, in pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Dimensions {
    /// Pixels per row.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Dimensions {
    /// Build dimensions from a width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    pub fn is_zero_area(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes per row (`width * 4`).
    pub fn stride(self) -> SurfResult<usize> {
        (self.width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(|| {
                SurfError::validation(format!("stride overflows for width {}", self.width))
            })
    }

    /// Total buffer size (`width * height * 4`); overflow is a validation error.
    pub fn byte_size(self) -> SurfResult<usize> {
        self.stride()?
            .checked_mul(self.height as usize)
            .ok_or_else(|| {
                SurfError::validation(format!(
                    "byte size overflows for {}x{}",
                    self.width, self.height
                ))
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
