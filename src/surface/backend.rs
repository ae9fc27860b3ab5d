use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::foundation::{
    core::{Dimensions, SurfaceFormat},
    error::{AllocStatus, SurfError, SurfResult},
};

/// Allocator and owner of renderer surfaces.
///
/// Handles returned by [`SurfaceBackend::allocate`] are exclusively owned by the caller and must be
/// handed back to [`SurfaceBackend::destroy`] exactly once. Raw bytes may only be touched between
/// a [`SurfaceBackend::flush`] and, after writing, a [`SurfaceBackend::mark_dirty`].
pub trait SurfaceBackend: Clone {
    /// Opaque surface owned by the backend's storage.
    type Handle;

    /// Create a zero-filled surface of `format` at `dims`.
    fn allocate(
        &self,
        format: SurfaceFormat,
        dims: Dimensions,
    ) -> Result<Self::Handle, AllocStatus>;

    /// Finish any pending backend work on `handle` before its bytes are accessed.
    fn flush(&self, handle: &Self::Handle);

    /// Raw bytes of `handle`, `height * stride` long.
    fn data<'h>(&self, handle: &'h Self::Handle) -> &'h [u8];

    /// Writable raw bytes of `handle`.
    fn data_mut<'h>(&self, handle: &'h mut Self::Handle) -> &'h mut [u8];

    /// Tell the backend the bytes of `handle` were changed behind its back.
    fn mark_dirty(&self, handle: &mut Self::Handle);

    /// Free `handle`.
    fn destroy(&self, handle: Self::Handle);
}

/// Limits applied by [`PixmapBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PixmapBackendOpts {
    /// Largest single surface, in bytes. Bigger requests fail with [`AllocStatus::NoMemory`].
    pub max_surface_bytes: usize,
}

impl Default for PixmapBackendOpts {
    fn default() -> Self {
        Self {
            max_surface_bytes: 256 * 1024 * 1024,
        }
    }
}

impl PixmapBackendOpts {
    /// Environment variable overriding [`PixmapBackendOpts::max_surface_bytes`].
    pub const MAX_SURFACE_BYTES_ENV: &'static str = "PREMULSURF_MAX_SURFACE_BYTES";

    /// Defaults, with `PREMULSURF_MAX_SURFACE_BYTES` applied when it parses as a positive integer.
    pub fn from_env() -> Self {
        let max_surface_bytes = std::env::var(Self::MAX_SURFACE_BYTES_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(Self::default().max_surface_bytes);
        Self { max_surface_bytes }
    }

    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> SurfResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| SurfError::Other(anyhow::Error::new(e).context("parse backend options")))
    }
}

/// Snapshot of [`PixmapBackend`] allocation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BackendStats {
    /// Allocated and not yet destroyed.
    pub live_surfaces: u64,
    /// Successful allocations so far.
    pub allocated_surfaces: u64,
    /// Destroy calls so far.
    pub destroyed_surfaces: u64,
    /// Sum of the byte sizes of every successful allocation.
    pub allocated_bytes: u64,
    /// Flush calls so far.
    pub flushes: u64,
    /// Mark-dirty calls so far.
    pub dirty_marks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    allocated_surfaces: AtomicU64,
    destroyed_surfaces: AtomicU64,
    allocated_bytes: AtomicU64,
    flushes: AtomicU64,
    dirty_marks: AtomicU64,
}

/// Surface storage backed by [`vello_cpu::Pixmap`].
///
/// The pixmap is used purely as a byte store holding `B, G, R, A` premultiplied pixels.
/// Clones share allocation counters, so a resource and its duplicates report into the same
/// [`BackendStats`].
#[derive(Debug, Clone, Default)]
pub struct PixmapBackend {
    opts: PixmapBackendOpts,
    counters: Arc<Counters>,
}

impl PixmapBackend {
    /// Backend with explicit limits and fresh counters.
    pub fn new(opts: PixmapBackendOpts) -> Self {
        Self {
            opts,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Limits in effect.
    pub fn opts(&self) -> PixmapBackendOpts {
        self.opts
    }

    /// Current counter values.
    pub fn stats(&self) -> BackendStats {
        let c = &self.counters;
        let allocated_surfaces = c.allocated_surfaces.load(Ordering::Relaxed);
        let destroyed_surfaces = c.destroyed_surfaces.load(Ordering::Relaxed);
        BackendStats {
            live_surfaces: allocated_surfaces.saturating_sub(destroyed_surfaces),
            allocated_surfaces,
            destroyed_surfaces,
            allocated_bytes: c.allocated_bytes.load(Ordering::Relaxed),
            flushes: c.flushes.load(Ordering::Relaxed),
            dirty_marks: c.dirty_marks.load(Ordering::Relaxed),
        }
    }
}

/// A surface allocated by [`PixmapBackend`].
pub struct PixmapSurface {
    dims: Dimensions,
    pixmap: vello_cpu::Pixmap,
    format: SurfaceFormat,
    dirty_count: u64,
}

impl PixmapSurface {
    /// Width and height the surface was allocated with.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Pixel layout of the surface bytes.
    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    /// Underlying pixmap. Its bytes are in `B, G, R, A` order, not RGBA.
    pub fn pixmap(&self) -> &vello_cpu::Pixmap {
        &self.pixmap
    }

    /// Number of times the surface was marked dirty.
    pub fn dirty_count(&self) -> u64 {
        self.dirty_count
    }
}

impl fmt::Debug for PixmapSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixmapSurface")
            .field("dimensions", &self.dimensions())
            .field("format", &self.format)
            .field("dirty_count", &self.dirty_count)
            .finish()
    }
}

impl SurfaceBackend for PixmapBackend {
    type Handle = PixmapSurface;

    fn allocate(
        &self,
        format: SurfaceFormat,
        dims: Dimensions,
    ) -> Result<PixmapSurface, AllocStatus> {
        let (Ok(w), Ok(h)) = (u16::try_from(dims.width), u16::try_from(dims.height)) else {
            return Err(AllocStatus::InvalidSize);
        };
        let bytes = usize::from(w) * usize::from(h) * format.bytes_per_pixel();
        if bytes > self.opts.max_surface_bytes {
            return Err(AllocStatus::NoMemory);
        }

        let surface = match format {
            SurfaceFormat::Argb32Premul => PixmapSurface {
                dims,
                pixmap: vello_cpu::Pixmap::new(w, h),
                format,
                dirty_count: 0,
            },
        };

        let c = &self.counters;
        c.allocated_surfaces.fetch_add(1, Ordering::Relaxed);
        c.allocated_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        tracing::debug!(width = w, height = h, bytes, "allocate surface");
        Ok(surface)
    }

    fn flush(&self, _handle: &PixmapSurface) {
        // Nothing is deferred on a pixmap.
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("flush surface");
    }

    fn data<'h>(&self, handle: &'h PixmapSurface) -> &'h [u8] {
        handle.pixmap.data_as_u8_slice()
    }

    fn data_mut<'h>(&self, handle: &'h mut PixmapSurface) -> &'h mut [u8] {
        handle.pixmap.data_as_u8_slice_mut()
    }

    fn mark_dirty(&self, handle: &mut PixmapSurface) {
        handle.dirty_count = handle.dirty_count.saturating_add(1);
        self.counters.dirty_marks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("mark surface dirty");
    }

    fn destroy(&self, handle: PixmapSurface) {
        let dims = handle.dimensions();
        drop(handle);
        self.counters.destroyed_surfaces.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(width = dims.width, height = dims.height, "destroy surface");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/backend.rs"]
mod tests;
