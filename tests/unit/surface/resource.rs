use std::{cell::Cell, io::Cursor, rc::Rc};

use super::*;
use crate::foundation::error::AllocStatus;

fn raster(width: u32, height: u32, rgba: &[u8]) -> DecodedRaster {
    DecodedRaster::new(Dimensions::new(width, height), rgba.to_vec()).unwrap()
}

fn png_bytes(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Heap-backed allocator with a shared live-handle counter and scripted failures.
#[derive(Clone, Default)]
struct VecBackend {
    live: Rc<Cell<i64>>,
    destroyed: Rc<Cell<u32>>,
    fail_with: Option<AllocStatus>,
    short_by: usize,
}

impl SurfaceBackend for VecBackend {
    type Handle = Vec<u8>;

    fn allocate(&self, _format: SurfaceFormat, dims: Dimensions) -> Result<Vec<u8>, AllocStatus> {
        if let Some(status) = self.fail_with {
            return Err(status);
        }
        self.live.set(self.live.get() + 1);
        let len = dims.byte_size().unwrap() - self.short_by;
        Ok(vec![0; len])
    }

    fn flush(&self, _handle: &Vec<u8>) {}

    fn data<'h>(&self, handle: &'h Vec<u8>) -> &'h [u8] {
        handle
    }

    fn data_mut<'h>(&self, handle: &'h mut Vec<u8>) -> &'h mut [u8] {
        handle
    }

    fn mark_dirty(&self, _handle: &mut Vec<u8>) {}

    fn destroy(&self, _handle: Vec<u8>) {
        self.live.set(self.live.get() - 1);
        self.destroyed.set(self.destroyed.get() + 1);
    }
}

/// Decoder that hands out a fixed raster and counts releases.
struct FixedDecoder {
    raster: DecodedRaster,
    released: Cell<u32>,
}

impl FixedDecoder {
    fn new(raster: DecodedRaster) -> Self {
        Self {
            raster,
            released: Cell::new(0),
        }
    }
}

impl RasterDecoder for FixedDecoder {
    fn decode_rgba8(&self, bytes: &[u8]) -> SurfResult<DecodedRaster> {
        if bytes.is_empty() {
            return Err(SurfError::decode("empty input"));
        }
        Ok(self.raster.clone())
    }

    fn release(&self, _raster: DecodedRaster) {
        self.released.set(self.released.get() + 1);
    }
}

#[test]
fn from_raster_premultiplies_and_reorders() {
    let r = raster(2, 1, &[200, 100, 50, 128, 10, 20, 30, 255]);
    let s = SurfaceResource::from_raster(PixmapBackend::default(), &r).unwrap();

    assert_eq!(s.dimensions(), Dimensions::new(2, 1));
    assert_eq!(s.byte_size(), 8);
    assert_eq!(s.stride(), 8);
    assert_eq!(&*s.read().unwrap(), &[25, 50, 100, 128, 30, 20, 10, 255]);
}

#[test]
fn from_encoded_png_end_to_end() {
    let bytes = png_bytes(1, 2, vec![200, 100, 50, 128, 9, 9, 9, 0]);
    let s = SurfaceResource::from_encoded(&bytes).unwrap();

    assert_eq!(s.dimensions(), Dimensions::new(1, 2));
    assert_eq!(&*s.read().unwrap(), &[25, 50, 100, 128, 0, 0, 0, 0]);

    let st = s.backend().stats();
    assert_eq!(st.live_surfaces, 1);
    assert!(st.dirty_marks >= 1);
    assert!(s.handle().unwrap().dirty_count() >= 1);
}

#[test]
fn decode_failure_allocates_nothing() {
    let backend = PixmapBackend::default();
    let err = SurfaceResource::from_encoded_with(
        &ImageDecoder::default(),
        backend.clone(),
        b"\x89PNG\r\n\x1a\n truncated",
    )
    .unwrap_err();
    assert!(err.is_decode());
    assert_eq!(backend.stats().allocated_surfaces, 0);
    assert_eq!(backend.stats().live_surfaces, 0);
}

#[test]
fn raster_released_once_on_success_and_failure() {
    let dec = FixedDecoder::new(raster(1, 1, &[1, 2, 3, 255]));

    let ok = SurfaceResource::from_encoded_with(&dec, VecBackend::default(), b"x").unwrap();
    assert_eq!(dec.released.get(), 1);
    drop(ok);

    let failing = VecBackend {
        fail_with: Some(AllocStatus::NoMemory),
        ..VecBackend::default()
    };
    let err = SurfaceResource::from_encoded_with(&dec, failing.clone(), b"x").unwrap_err();
    assert!(err.is_allocation());
    assert_eq!(dec.released.get(), 2);
    assert_eq!(failing.live.get(), 0);

    assert!(SurfaceResource::from_encoded_with(&dec, VecBackend::default(), b"").is_err());
    assert_eq!(dec.released.get(), 2);
}

#[test]
fn allocation_error_carries_status_and_size() {
    let r = raster(70_000, 1, &vec![0u8; 70_000 * 4]);
    let err = SurfaceResource::from_raster(PixmapBackend::default(), &r).unwrap_err();
    match err {
        SurfError::Allocation {
            status,
            width,
            height,
        } => {
            assert_eq!(status, AllocStatus::InvalidSize);
            assert_eq!((width, height), (70_000, 1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn short_backend_buffer_is_destroyed() {
    let backend = VecBackend {
        short_by: 4,
        ..VecBackend::default()
    };
    let r = raster(2, 1, &[0; 8]);
    let err = SurfaceResource::from_raster(backend.clone(), &r).unwrap_err();
    assert!(err.to_string().contains("validation error:"));
    assert_eq!(backend.live.get(), 0);
    assert_eq!(backend.destroyed.get(), 1);
}

#[test]
fn zero_area_raster_gives_valid_zero_byte_surface() {
    let r = raster(0, 3, &[]);
    let s = SurfaceResource::from_raster(PixmapBackend::default(), &r).unwrap();
    assert!(!s.is_empty());
    assert_eq!(s.byte_size(), 0);
    assert!(s.read().unwrap().is_empty());
}

#[test]
fn default_is_empty() {
    let s: SurfaceResource = SurfaceResource::default();
    assert!(s.is_empty());
    assert!(s.handle().is_none());
    assert!(s.read().is_none());
    assert_eq!(s.byte_size(), 0);
    assert_eq!(s.dimensions(), Dimensions::default());
    assert_eq!(s.format(), SurfaceFormat::Argb32Premul);
}

#[test]
fn duplicate_is_deep_and_independent() {
    let backend = PixmapBackend::default();
    let r = raster(2, 2, &[200, 100, 50, 128].repeat(4));
    let a = SurfaceResource::from_raster(backend.clone(), &r).unwrap();
    let mut b = a.duplicate().unwrap();

    assert_eq!(backend.stats().live_surfaces, 2);
    assert_eq!(a.dimensions(), b.dimensions());
    assert_eq!(a.byte_size(), b.byte_size());
    assert_eq!(&*a.read().unwrap(), &*b.read().unwrap());
    assert_ne!(
        a.read().unwrap().as_ptr(),
        b.read().unwrap().as_ptr(),
        "duplicate must not alias"
    );

    b.write().unwrap()[0] = 0xEE;
    assert_eq!(a.read().unwrap()[0], 25);
    assert_eq!(b.read().unwrap()[0], 0xEE);
}

#[test]
fn duplicate_of_empty_allocates_nothing() {
    let backend = PixmapBackend::default();
    let empty = SurfaceResource::empty(backend.clone());
    let copy = empty.duplicate().unwrap();
    assert!(copy.is_empty());
    assert_eq!(backend.stats().allocated_surfaces, 0);
}

#[test]
fn duplicate_from_releases_previous_handle() {
    let backend = PixmapBackend::default();
    let src_raster = raster(1, 1, &[1, 2, 3, 255]);
    let dst_raster = raster(2, 1, &[9, 9, 9, 255, 8, 8, 8, 255]);
    let src = SurfaceResource::from_raster(backend.clone(), &src_raster).unwrap();
    let mut dst = SurfaceResource::from_raster(backend.clone(), &dst_raster).unwrap();
    assert_eq!(backend.stats().live_surfaces, 2);

    dst.duplicate_from(&src).unwrap();
    let st = backend.stats();
    assert_eq!(st.live_surfaces, 2);
    assert_eq!(st.destroyed_surfaces, 1);
    assert_eq!(dst.dimensions(), Dimensions::new(1, 1));
    assert_eq!(&*dst.read().unwrap(), &[3, 2, 1, 255]);
}

#[test]
fn duplicate_from_empty_keeps_target() {
    let backend = PixmapBackend::default();
    let mut dst =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[1, 2, 3, 255])).unwrap();
    dst.duplicate_from(&SurfaceResource::empty(backend.clone()))
        .unwrap();
    assert!(!dst.is_empty());
    assert_eq!(&*dst.read().unwrap(), &[3, 2, 1, 255]);
    assert_eq!(backend.stats().live_surfaces, 1);
}

#[test]
fn duplicate_from_failure_leaves_target() {
    let dec = FixedDecoder::new(raster(1, 1, &[1, 2, 3, 255]));
    let ok_backend = VecBackend::default();
    let src = SurfaceResource::from_encoded_with(&dec, ok_backend.clone(), b"x").unwrap();

    // A source whose backend now refuses allocations.
    let mut refusing = src.duplicate().unwrap();
    refusing.backend.fail_with = Some(AllocStatus::NoMemory);

    let mut dst = SurfaceResource::from_encoded_with(&dec, ok_backend.clone(), b"x").unwrap();
    let err = dst.duplicate_from(&refusing).unwrap_err();
    assert!(err.is_allocation());
    assert!(!dst.is_empty());
    assert_eq!(ok_backend.live.get(), 3);
}

#[test]
fn transfer_moves_without_allocating() {
    let backend = PixmapBackend::default();
    let mut x =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[1, 2, 3, 255])).unwrap();
    let mut y = SurfaceResource::empty(backend.clone());
    let before = backend.stats();

    y.transfer_from(&mut x);

    let after = backend.stats();
    assert_eq!(after.live_surfaces, before.live_surfaces);
    assert_eq!(after.allocated_surfaces, before.allocated_surfaces);
    assert!(x.is_empty());
    assert_eq!(x.byte_size(), 0);
    assert_eq!(y.dimensions(), Dimensions::new(1, 1));
    assert_eq!(&*y.read().unwrap(), &[3, 2, 1, 255]);
}

#[test]
fn transfer_over_populated_target_releases_it() {
    let backend = PixmapBackend::default();
    let mut x =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[1, 2, 3, 255])).unwrap();
    let mut y =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[4, 5, 6, 255])).unwrap();

    y.transfer_from(&mut x);
    assert!(x.is_empty());
    assert_eq!(&*y.read().unwrap(), &[3, 2, 1, 255]);
    assert_eq!(backend.stats().live_surfaces, 1);
}

#[test]
fn take_leaves_source_empty() {
    let backend = PixmapBackend::default();
    let mut x =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[1, 2, 3, 255])).unwrap();
    let y = x.take();
    assert!(x.is_empty());
    assert!(!y.is_empty());
    assert_eq!(backend.stats().live_surfaces, 1);
}

#[test]
fn release_is_idempotent_and_drop_does_not_double_free() {
    let backend = VecBackend::default();
    let r = raster(1, 1, &[1, 2, 3, 255]);
    {
        let mut s = SurfaceResource::from_raster(backend.clone(), &r).unwrap();
        s.release();
        assert!(s.is_empty());
        assert_eq!(s.byte_size(), 0);
        s.release();
    }
    assert_eq!(backend.destroyed.get(), 1);
    assert_eq!(backend.live.get(), 0);
}

#[test]
fn load_encoded_replaces_or_keeps() {
    let backend = PixmapBackend::default();
    let dec = ImageDecoder::default();
    let mut s = SurfaceResource::from_encoded_with(
        &dec,
        backend.clone(),
        &png_bytes(1, 1, vec![1, 2, 3, 255]),
    )
    .unwrap();

    assert!(s.load_encoded(&dec, b"garbage").unwrap_err().is_decode());
    assert_eq!(&*s.read().unwrap(), &[3, 2, 1, 255]);

    s.load_encoded(&dec, &png_bytes(2, 1, vec![0, 0, 255, 255, 0, 255, 0, 255]))
        .unwrap();
    assert_eq!(s.dimensions(), Dimensions::new(2, 1));
    assert_eq!(&*s.read().unwrap(), &[255, 0, 0, 255, 0, 255, 0, 255]);

    let st = backend.stats();
    assert_eq!(st.live_surfaces, 1);
    assert_eq!(st.destroyed_surfaces, 1);
}

#[test]
fn access_guards_bracket_the_buffer() {
    let backend = PixmapBackend::default();
    let mut s =
        SurfaceResource::from_raster(backend.clone(), &raster(1, 1, &[1, 2, 3, 255])).unwrap();
    let before = backend.stats();

    {
        let mut w = s.write().unwrap();
        w[3] = 7;
        assert_eq!(backend.stats().dirty_marks, before.dirty_marks);
    }
    let after = backend.stats();
    assert_eq!(after.dirty_marks, before.dirty_marks + 1);
    assert_eq!(after.flushes, before.flushes + 1);

    let _r = s.read().unwrap();
    assert_eq!(backend.stats().flushes, before.flushes + 2);
}

#[test]
fn debug_reports_shape() {
    let s = SurfaceResource::from_raster(PixmapBackend::default(), &raster(1, 1, &[0; 4])).unwrap();
    let dbg = format!("{s:?}");
    assert!(dbg.contains("byte_size: 4"));
    assert!(dbg.contains("empty: false"));
}
