/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use zune_toolkit::{
    Bitmap, BitmapFormat, BitmapInfo, BlendingMode, ColorMatrix, Cube, LookupTable, OwnedBitmap,
    Toolkit, ToolkitErrors, YuvFormat
};

use crate::{random_bytes, SHARPEN_3X3};

/// Bitmap that records how often it is locked and unlocked
struct CountingBitmap {
    inner:    OwnedBitmap,
    locks:    AtomicUsize,
    unlocks:  AtomicUsize,
    /// refuse to lock, like a recycled platform bitmap
    recycled: bool
}

impl CountingBitmap {
    fn new(inner: OwnedBitmap) -> CountingBitmap {
        CountingBitmap {
            inner,
            locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
            recycled: false
        }
    }

    fn balanced(&self) -> bool {
        self.locks.load(Ordering::SeqCst) == self.unlocks.load(Ordering::SeqCst)
    }
}

// SAFETY: Locking is delegated to the wrapped bitmap
unsafe impl Bitmap for CountingBitmap {
    fn info(&self) -> BitmapInfo {
        self.inner.info()
    }

    fn lock_pixels(&self) -> Option<NonNull<u8>> {
        if self.recycled {
            return None;
        }
        let pixels = self.inner.lock_pixels()?;
        self.locks.fetch_add(1, Ordering::SeqCst);
        Some(pixels)
    }

    fn unlock_pixels(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.inner.unlock_pixels();
    }
}

fn rgba_bitmap(width: usize, height: usize, seed: u64) -> OwnedBitmap {
    let info = BitmapInfo::packed(width, height, BitmapFormat::Rgba8888);
    OwnedBitmap::from_pixels(info, random_bytes(info.byte_len(), seed)).unwrap()
}

#[test]
fn bitmap_variants_match_byte_variants() {
    let toolkit = Toolkit::default();
    let (sx, sy) = (45, 38);
    let pixels = random_bytes(sx * sy * 4, 40);
    let input = OwnedBitmap::from_pixels(
        BitmapInfo::packed(sx, sy, BitmapFormat::Rgba8888),
        pixels.clone()
    )
    .unwrap();

    let mut expected = vec![0; sx * sy * 4];
    let mut output = OwnedBitmap::new(sx, sy, BitmapFormat::Rgba8888);

    toolkit.blur(&pixels, &mut expected, sx, sy, 4, 6, None).unwrap();
    toolkit.blur_bitmap(&input, &output, 6, None).unwrap();
    assert_eq!(output.pixels(), expected);

    toolkit
        .convolve3x3(&pixels, &mut expected, sx, sy, 4, &SHARPEN_3X3, None)
        .unwrap();
    toolkit
        .convolve3x3_bitmap(&input, &output, &SHARPEN_3X3, None)
        .unwrap();
    assert_eq!(output.pixels(), expected);

    let table = LookupTable {
        red: [3; 256],
        ..LookupTable::identity()
    };
    toolkit
        .lut(&pixels, &mut expected, sx, sy, &table, None)
        .unwrap();
    toolkit.lut_bitmap(&input, &output, &table, None).unwrap();
    assert_eq!(output.pixels(), expected);

    let cube = Cube::identity(3, 4, 5).unwrap();
    toolkit
        .lut3d(&pixels, &mut expected, sx, sy, &cube, None)
        .unwrap();
    toolkit.lut3d_bitmap(&input, &output, &cube, None).unwrap();
    assert_eq!(output.pixels(), expected);

    let mut counts = vec![0_u32; 1024];
    let mut bitmap_counts = vec![0_u32; 1024];
    toolkit
        .histogram(&pixels, sx, sy, 4, &mut counts, None)
        .unwrap();
    toolkit
        .histogram_bitmap(&input, &mut bitmap_counts, None)
        .unwrap();
    assert_eq!(counts, bitmap_counts);
}

#[test]
fn blend_bitmap_writes_destination() {
    let toolkit = Toolkit::default();
    let source = rgba_bitmap(20, 10, 41);
    let mut dest = rgba_bitmap(20, 10, 42);

    let source_bytes = random_bytes(20 * 10 * 4, 41);
    let mut expected = random_bytes(20 * 10 * 4, 42);
    toolkit
        .blend(BlendingMode::Multiply, &source_bytes, &mut expected, 20, 10, None)
        .unwrap();
    toolkit
        .blend_bitmap(BlendingMode::Multiply, &source, &dest, None)
        .unwrap();
    assert_eq!(dest.pixels(), expected);
}

#[test]
fn resize_bitmap_takes_output_size() {
    let toolkit = Toolkit::default();
    let input = rgba_bitmap(16, 16, 43);
    let mut output = OwnedBitmap::new(40, 7, BitmapFormat::Rgba8888);
    toolkit.resize_bitmap(&input, &output, None).unwrap();

    let mut expected = vec![0; 40 * 7 * 4];
    toolkit
        .resize(&random_bytes(16 * 16 * 4, 43), 16, 16, 4, &mut expected, 40, 7, None)
        .unwrap();
    assert_eq!(output.pixels(), expected);
}

#[test]
fn yuv_bitmap_and_greyscale_alpha() {
    let toolkit = Toolkit::default();
    let mut rgba = OwnedBitmap::new(8, 4, BitmapFormat::Rgba8888);
    let mut nv21 = vec![235_u8; 8 * 4];
    nv21.resize(8 * 4 + 8 * 2, 128);
    toolkit
        .yuv_to_rgb_bitmap(&nv21, YuvFormat::Nv21, &rgba)
        .unwrap();
    assert!(rgba.pixels().iter().all(|v| *v == 255));

    // RGBA to one channel luminance, the matrix truncates
    let mut grey = OwnedBitmap::new(8, 4, BitmapFormat::Alpha8);
    toolkit
        .color_matrix_bitmap(&rgba, &grey, &ColorMatrix::greyscale(), None)
        .unwrap();
    assert!(grey.pixels().iter().all(|v| *v >= 254));
}

#[test]
fn locks_are_released_on_every_path() {
    let toolkit = Toolkit::default();
    let input = CountingBitmap::new(rgba_bitmap(12, 12, 44));
    let output = CountingBitmap::new(OwnedBitmap::new(12, 12, BitmapFormat::Rgba8888));
    let small = CountingBitmap::new(OwnedBitmap::new(6, 12, BitmapFormat::Rgba8888));

    toolkit.blur_bitmap(&input, &output, 2, None).unwrap();
    // fails after locking
    assert!(toolkit.blur_bitmap(&input, &small, 2, None).is_err());
    // fails in the byte level validation
    assert!(toolkit.blur_bitmap(&input, &output, 40, None).is_err());

    assert_eq!(input.locks.load(Ordering::SeqCst), 3);
    assert!(input.balanced());
    assert!(output.balanced());
    assert!(small.balanced());
}

#[test]
fn recycled_bitmaps_are_reported() {
    let toolkit = Toolkit::default();
    let mut recycled = CountingBitmap::new(rgba_bitmap(4, 4, 45));
    recycled.recycled = true;
    let output = OwnedBitmap::new(4, 4, BitmapFormat::Rgba8888);

    assert!(matches!(
        toolkit.lut_bitmap(&recycled, &output, &LookupTable::identity(), None),
        Err(ToolkitErrors::InvalidParameter(_))
    ));
    assert_eq!(recycled.unlocks.load(Ordering::SeqCst), 0);
}

#[test]
fn unsupported_formats() {
    let toolkit = Toolkit::default();
    let rgb565 = OwnedBitmap::new(8, 8, BitmapFormat::Rgb565);
    let f16 = OwnedBitmap::new(8, 8, BitmapFormat::RgbaF16);
    let rgba = OwnedBitmap::new(8, 8, BitmapFormat::Rgba8888);
    let alpha = OwnedBitmap::new(8, 8, BitmapFormat::Alpha8);

    assert!(matches!(
        toolkit.blur_bitmap(&rgb565, &rgba, 3, None),
        Err(ToolkitErrors::UnsupportedFormat(BitmapFormat::Rgb565))
    ));
    assert!(matches!(
        toolkit.histogram_dot_bitmap(&f16, &mut [0_u32; 256], None, None),
        Err(ToolkitErrors::UnsupportedFormat(BitmapFormat::RgbaF16))
    ));
    assert!(matches!(
        toolkit.lut_bitmap(&alpha, &alpha, &LookupTable::identity(), None),
        Err(ToolkitErrors::InvalidParameter(_))
    ));
    assert!(matches!(
        toolkit.lut3d_bitmap(&alpha, &rgba, &Cube::identity(2, 2, 2).unwrap(), None),
        Err(ToolkitErrors::UnsupportedFormat(BitmapFormat::Rgba8888))
    ));

    let padded = OwnedBitmap::from_pixels(
        BitmapInfo {
            width:  8,
            height: 8,
            stride: 40,
            format: BitmapFormat::Rgba8888
        },
        vec![0; 320]
    )
    .unwrap();
    assert!(matches!(
        toolkit.convolve5x5_bitmap(&padded, &rgba, &[0.04; 25], None),
        Err(ToolkitErrors::UnsupportedFormat(BitmapFormat::Rgba8888))
    ));
}
