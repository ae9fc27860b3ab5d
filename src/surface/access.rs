use std::ops::{Deref, DerefMut};

use crate::surface::backend::SurfaceBackend;

/// Read window over a surface's bytes. The surface is flushed when the window opens.
pub struct ReadAccess<'a> {
    bytes: &'a [u8],
}

impl<'a> ReadAccess<'a> {
    pub(crate) fn new<B: SurfaceBackend>(backend: &B, handle: &'a B::Handle) -> Self {
        backend.flush(handle);
        Self {
            bytes: backend.data(handle),
        }
    }
}

impl Deref for ReadAccess<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

/// Write window over a surface's bytes.
///
/// Opening flushes the surface; dropping marks it dirty, including on early returns.
pub struct WriteAccess<'a, B: SurfaceBackend> {
    backend: &'a B,
    handle: &'a mut B::Handle,
}

impl<'a, B: SurfaceBackend> WriteAccess<'a, B> {
    pub(crate) fn new(backend: &'a B, handle: &'a mut B::Handle) -> Self {
        backend.flush(handle);
        Self { backend, handle }
    }
}

impl<B: SurfaceBackend> Deref for WriteAccess<'_, B> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.backend.data(&*self.handle)
    }
}

impl<B: SurfaceBackend> DerefMut for WriteAccess<'_, B> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.backend.data_mut(&mut *self.handle)
    }
}

impl<B: SurfaceBackend> Drop for WriteAccess<'_, B> {
    fn drop(&mut self) {
        self.backend.mark_dirty(&mut *self.handle);
    }
}
