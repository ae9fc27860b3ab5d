//! premulsurf turns encoded images into renderer-ready surfaces.
//!
//! Decoded rasters arrive as straight-alpha `R, G, B, A` bytes. Renderers that use 32-bit
//! premultiplied ARGB (native little-endian, so `B, G, R, A` in memory) need every pixel
//! reordered and scaled by its alpha. This crate does that conversion and wraps the resulting
//! surface in an owning value:
//!
//! - [`convert_pixel`] / [`convert_rows`]: truncating premultiplication plus channel reorder.
//! - [`SurfaceResource`]: owns one surface handle from a [`SurfaceBackend`]; explicit
//!   [`SurfaceResource::duplicate`] deep-copies, [`SurfaceResource::transfer_from`] moves, and the
//!   handle is destroyed exactly once.
//! - [`RasterDecoder`] / [`ImageDecoder`]: the decoding collaborator (PNG and JPEG by default).
//! - [`PixmapBackend`]: the default surface allocator, storing bytes in a `vello_cpu::Pixmap`.
//!
//! ```no_run
//! # fn main() -> premulsurf::SurfResult<()> {
//! let bytes = std::fs::read("logo.png").map_err(anyhow::Error::from)?;
//! let surface = premulsurf::SurfaceResource::from_encoded(&bytes)?;
//! let copy = surface.duplicate()?;
//! assert_eq!(copy.byte_size(), surface.byte_size());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decode;
mod foundation;
mod pixel;
mod surface;

pub use decode::codec::{DecoderOpts, EncodedFormat, ImageDecoder};
pub use decode::{DecodedRaster, RasterDecoder};
pub use foundation::core::{BYTES_PER_PIXEL, Dimensions, SurfaceFormat};
pub use foundation::error::{AllocStatus, SurfError, SurfResult};
pub use pixel::convert::{convert_pixel, convert_row, convert_rows, premultiply_channel};
pub use surface::access::{ReadAccess, WriteAccess};
pub use surface::backend::{
    BackendStats, PixmapBackend, PixmapBackendOpts, PixmapSurface, SurfaceBackend,
};
pub use surface::resource::SurfaceResource;
