use std::fmt;

use crate::{
    decode::{DecodedRaster, RasterDecoder, RasterLease, codec::ImageDecoder},
    foundation::{
        core::{BYTES_PER_PIXEL, Dimensions, SurfaceFormat},
        error::{SurfError, SurfResult},
    },
    pixel::convert::convert_rows,
    surface::{
        access::{ReadAccess, WriteAccess},
        backend::{PixmapBackend, SurfaceBackend},
    },
};

/// A renderer surface holding premultiplied `B, G, R, A` pixels, owned by exactly one value.
///
/// The surface handle is allocated by a [`SurfaceBackend`] and given back to it exactly once:
/// on [`SurfaceResource::release`], on drop, or when the value is overwritten. Copies are explicit
/// ([`SurfaceResource::duplicate`]) because they allocate and can fail; they never share a handle.
pub struct SurfaceResource<B: SurfaceBackend = PixmapBackend> {
    backend: B,
    handle: Option<B::Handle>,
    dims: Dimensions,
    byte_size: usize,
}

impl SurfaceResource<PixmapBackend> {
    /// Decode PNG/JPEG bytes into a new pixmap-backed surface with default options.
    pub fn from_encoded(bytes: &[u8]) -> SurfResult<Self> {
        Self::from_encoded_with(&ImageDecoder::default(), PixmapBackend::default(), bytes)
    }
}

impl TryFrom<&[u8]> for SurfaceResource<PixmapBackend> {
    type Error = SurfError;

    fn try_from(bytes: &[u8]) -> SurfResult<Self> {
        Self::from_encoded(bytes)
    }
}

impl<B: SurfaceBackend + Default> Default for SurfaceResource<B> {
    fn default() -> Self {
        Self::empty(B::default())
    }
}

impl<B: SurfaceBackend> SurfaceResource<B> {
    /// The single format every surface is created in.
    pub const FORMAT: SurfaceFormat = SurfaceFormat::Argb32Premul;

    /// A resource that owns no surface.
    pub fn empty(backend: B) -> Self {
        Self {
            backend,
            handle: None,
            dims: Dimensions::default(),
            byte_size: 0,
        }
    }

    /// Decode `bytes`, allocate a same-size surface on `backend` and fill it with premultiplied
    /// pixels.
    ///
    /// The decoded raster goes back to `decoder` before this returns, on success and on failure.
    /// On failure no surface stays allocated.
    #[tracing::instrument(skip(decoder, backend, bytes), fields(len = bytes.len()))]
    pub fn from_encoded_with<D: RasterDecoder + ?Sized>(
        decoder: &D,
        backend: B,
        bytes: &[u8],
    ) -> SurfResult<Self> {
        let raster = RasterLease::decode(decoder, bytes)?;
        Self::from_raster(backend, &raster)
    }

    /// Allocate a surface matching `raster` and convert every row into it.
    pub fn from_raster(backend: B, raster: &DecodedRaster) -> SurfResult<Self> {
        let dims = raster.dimensions();
        let mut surface = Self::allocate(backend, dims)?;
        if let Some(mut dst) = surface.write() {
            convert_rows(raster.pixels(), &mut dst, dims)?;
        }
        tracing::debug!(
            width = dims.width,
            height = dims.height,
            bytes = surface.byte_size,
            "surface populated"
        );
        Ok(surface)
    }

    /// Replace the contents with a surface decoded from `bytes`.
    ///
    /// The current surface is released only once the new one is complete; on error `self` is
    /// left untouched.
    pub fn load_encoded<D: RasterDecoder + ?Sized>(
        &mut self,
        decoder: &D,
        bytes: &[u8],
    ) -> SurfResult<()> {
        let fresh = Self::from_encoded_with(decoder, self.backend.clone(), bytes)?;
        *self = fresh;
        Ok(())
    }

    /// Deep copy into a newly allocated surface. An empty resource duplicates to an empty one.
    #[tracing::instrument(skip(self), fields(width = self.dims.width, height = self.dims.height))]
    pub fn duplicate(&self) -> SurfResult<Self> {
        let Some(src) = self.handle.as_ref() else {
            return Ok(Self::empty(self.backend.clone()));
        };

        let mut copy = Self::allocate(self.backend.clone(), self.dims)?;
        let n = self.byte_size;
        let src_bytes = ReadAccess::new(&self.backend, src);
        if let Some(mut dst) = copy.write() {
            dst[..n].copy_from_slice(&src_bytes[..n]);
        }
        Ok(copy)
    }

    /// Copy-assign from `src`: release the current surface and install a deep copy of `src`.
    ///
    /// An empty `src` leaves `self` unchanged, as does a failed allocation.
    pub fn duplicate_from(&mut self, src: &Self) -> SurfResult<()> {
        if src.is_empty() {
            return Ok(());
        }
        let copy = src.duplicate()?;
        *self = copy;
        Ok(())
    }

    /// Move-assign from `src`: release the current surface, then take over everything `src`
    /// owned. `src` is left empty. Never allocates or copies pixels.
    pub fn transfer_from(&mut self, src: &mut Self) {
        self.release();
        std::mem::swap(self, src);
    }

    /// Move the contents out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        let mut out = Self::empty(self.backend.clone());
        std::mem::swap(self, &mut out);
        out
    }

    /// Destroy the owned surface, if any. Calling this on an empty resource does nothing.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.destroy(handle);
        }
        self.dims = Dimensions::default();
        self.byte_size = 0;
    }

    /// True when no surface is owned.
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    /// Width and height; zero when empty.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Total bytes in the surface buffer (`width * height * 4`).
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Bytes per row (`width * 4`).
    pub fn stride(&self) -> usize {
        self.dims.width as usize * BYTES_PER_PIXEL
    }

    /// Always [`SurfaceFormat::Argb32Premul`].
    pub fn format(&self) -> SurfaceFormat {
        Self::FORMAT
    }

    /// Borrow the backend surface without giving up ownership.
    pub fn handle(&self) -> Option<&B::Handle> {
        self.handle.as_ref()
    }

    /// The allocator this resource returns its surface to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Flush the surface and borrow its bytes.
    pub fn read(&self) -> Option<ReadAccess<'_>> {
        let handle = self.handle.as_ref()?;
        Some(ReadAccess::new(&self.backend, handle))
    }

    /// Flush the surface and borrow its bytes mutably; the surface is marked dirty when the
    /// guard drops.
    pub fn write(&mut self) -> Option<WriteAccess<'_, B>> {
        let handle = self.handle.as_mut()?;
        Some(WriteAccess::new(&self.backend, handle))
    }

    fn allocate(backend: B, dims: Dimensions) -> SurfResult<Self> {
        let byte_size = dims.byte_size()?;
        let handle = backend.allocate(Self::FORMAT, dims).map_err(|status| {
            tracing::warn!(
                width = dims.width,
                height = dims.height,
                %status,
                "surface allocation failed"
            );
            SurfError::allocation(status, dims.width, dims.height)
        })?;

        let surface = Self {
            backend,
            handle: Some(handle),
            dims,
            byte_size,
        };
        let actual = surface
            .handle
            .as_ref()
            .map_or(0, |h| surface.backend.data(h).len());
        if actual != byte_size {
            return Err(SurfError::validation(format!(
                "backend returned {actual} bytes for a {}x{} surface, expected {byte_size}",
                dims.width, dims.height
            )));
        }
        Ok(surface)
    }
}

impl<B: SurfaceBackend> Drop for SurfaceResource<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: SurfaceBackend> fmt::Debug for SurfaceResource<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceResource")
            .field("dimensions", &self.dims)
            .field("byte_size", &self.byte_size)
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/resource.rs"]
mod tests;
