//! Straight-alpha RGBA8 to premultiplied BGRA8 conversion.
//!
//! Premultiplication truncates (`floor(c * a / 255)`) rather than rounding, so output is
//! reproducible byte-for-byte across platforms.

use crate::foundation::{
    core::{BYTES_PER_PIXEL, Dimensions},
    error::{SurfError, SurfResult},
};

/// Scale one colour channel by `alpha / 255`, truncating.
#[inline]
pub fn premultiply_channel(value: u8, alpha: u8) -> u8 {
    ((u16::from(value) * u16::from(alpha)) / 255) as u8
}

/// Convert one `R, G, B, A` straight-alpha pixel into `B, G, R, A` premultiplied bytes.
#[inline]
pub fn convert_pixel(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    [
        premultiply_channel(b, a),
        premultiply_channel(g, a),
        premultiply_channel(r, a),
        a,
    ]
}

/// Convert as many whole pixels as both slices hold.
pub fn convert_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(dst.chunks_exact_mut(BYTES_PER_PIXEL))
    {
        d.copy_from_slice(&convert_pixel([s[0], s[1], s[2], s[3]]));
    }
}

/// Convert a full `dims` raster from `src` into `dst`, one stride-sized row at a time.
///
/// Both buffers must hold at least `height * stride` bytes; trailing bytes are left untouched.
pub fn convert_rows(src: &[u8], dst: &mut [u8], dims: Dimensions) -> SurfResult<()> {
    let stride = dims.stride()?;
    let needed = dims.byte_size()?;
    if src.len() < needed {
        return Err(SurfError::validation(format!(
            "source raster holds {} bytes, {}x{} needs {needed}",
            src.len(),
            dims.width,
            dims.height
        )));
    }
    if dst.len() < needed {
        return Err(SurfError::validation(format!(
            "destination buffer holds {} bytes, {}x{} needs {needed}",
            dst.len(),
            dims.width,
            dims.height
        )));
    }
    if needed == 0 {
        return Ok(());
    }

    for (src_row, dst_row) in src[..needed]
        .chunks_exact(stride)
        .zip(dst[..needed].chunks_exact_mut(stride))
    {
        convert_row(src_row, dst_row);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/convert.rs"]
mod tests;
