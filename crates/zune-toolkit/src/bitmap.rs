/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Bitmap handles
//!
//! A [`Bitmap`] is pixel memory owned by somebody else, typically a
//! platform image object, which has to be locked before its pixels can be
//! touched and unlocked afterwards. The `*_bitmap` entry points of
//! [`Toolkit`](crate::Toolkit) lock every bitmap they are given for the
//! duration of the call.
use std::cell::UnsafeCell;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use zune_core::log::error;

use crate::errors::ToolkitErrors;

/// Pixel layout of a bitmap
///
/// Only [`Alpha8`](BitmapFormat::Alpha8) and
/// [`Rgba8888`](BitmapFormat::Rgba8888) can be processed, the rest exist
/// so that handles can describe what they hold.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BitmapFormat {
    /// One byte per pixel, coverage only
    Alpha8,
    /// Four bytes per pixel, R G B A in memory order
    Rgba8888,
    /// Sixteen bit packed 5-6-5
    Rgb565,
    /// Sixteen bit packed 4-4-4-4
    Rgba4444,
    /// Four half floats per pixel
    RgbaF16,
    /// 32 bit packed 10-10-10-2
    Rgba1010102,
    /// Pixels live in gpu memory and can't be mapped
    Hardware
}

impl BitmapFormat {
    /// Bytes a pixel occupies, zero when the pixels aren't addressable
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            BitmapFormat::Alpha8 => 1,
            BitmapFormat::Rgb565 | BitmapFormat::Rgba4444 => 2,
            BitmapFormat::Rgba8888 | BitmapFormat::Rgba1010102 => 4,
            BitmapFormat::RgbaF16 => 8,
            BitmapFormat::Hardware => 0
        }
    }

    /// Vector size kernels use for this format, `None` if unsupported
    #[must_use]
    pub const fn vector_size(self) -> Option<usize> {
        match self {
            BitmapFormat::Alpha8 => Some(1),
            BitmapFormat::Rgba8888 => Some(4),
            _ => None
        }
    }
}

/// Geometry of a bitmap
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BitmapInfo {
    pub width:  usize,
    pub height: usize,
    /// Bytes between the start of two rows
    pub stride: usize,
    pub format: BitmapFormat
}

impl BitmapInfo {
    /// Info of a tightly packed bitmap
    #[must_use]
    pub const fn packed(width: usize, height: usize, format: BitmapFormat) -> BitmapInfo {
        BitmapInfo {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            format
        }
    }

    /// Bytes spanned by the pixels
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.stride * self.height
    }
}

/// Lockable pixel memory
///
/// # Safety
/// When `lock_pixels` returns `Some(ptr)`, `ptr` must be valid for reads
/// and writes of `info().byte_len()` bytes, and nothing else may access
/// that memory, until the matching `unlock_pixels` call.
pub unsafe trait Bitmap {
    fn info(&self) -> BitmapInfo;

    /// Pin the pixels in memory, `None` when they can't be locked
    fn lock_pixels(&self) -> Option<NonNull<u8>>;

    /// Release a lock taken by `lock_pixels`
    fn unlock_pixels(&self);
}

/// Locked pixels of a bitmap, unlocked on drop
pub(crate) struct BitmapGuard<'a, B: Bitmap + ?Sized> {
    bitmap:      &'a B,
    pixels:      NonNull<u8>,
    info:        BitmapInfo,
    vector_size: usize
}

impl<'a, B: Bitmap + ?Sized> BitmapGuard<'a, B> {
    /// Check the format of `bitmap` and lock it
    ///
    /// # Errors
    /// - `UnsupportedFormat` when the format or stride can't be processed
    /// - `InvalidParameter` when the pixels could not be locked
    pub(crate) fn lock(bitmap: &'a B) -> Result<BitmapGuard<'a, B>, ToolkitErrors> {
        let info = bitmap.info();
        let vector_size = info
            .format
            .vector_size()
            .ok_or(ToolkitErrors::UnsupportedFormat(info.format))?;

        if info.stride != info.width * vector_size {
            return Err(ToolkitErrors::UnsupportedFormat(info.format));
        }

        match bitmap.lock_pixels() {
            Some(pixels) => Ok(BitmapGuard {
                bitmap,
                pixels,
                info,
                vector_size
            }),
            None => {
                error!(
                    "Could not lock the pixels of a {}x{} {:?} bitmap",
                    info.width, info.height, info.format
                );
                Err(ToolkitErrors::InvalidParameter(
                    "Could not lock the bitmap pixels".to_string()
                ))
            }
        }
    }

    pub(crate) const fn info(&self) -> &BitmapInfo {
        &self.info
    }

    pub(crate) const fn vector_size(&self) -> usize {
        self.vector_size
    }

    pub(crate) fn pixels(&self) -> &[u8] {
        // SAFETY: The Bitmap contract keeps the memory valid while locked
        unsafe { std::slice::from_raw_parts(self.pixels.as_ptr(), self.info.byte_len()) }
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        // SAFETY: The Bitmap contract keeps the memory valid and unaliased while locked
        unsafe { std::slice::from_raw_parts_mut(self.pixels.as_ptr(), self.info.byte_len()) }
    }

    /// Whether the pixels of the two guards share any byte
    pub(crate) fn overlaps<C: Bitmap + ?Sized>(&self, other: &BitmapGuard<'_, C>) -> bool {
        let a = self.pixels.as_ptr() as usize;
        let b = other.pixels.as_ptr() as usize;
        a < b + other.info.byte_len() && b < a + self.info.byte_len()
    }
}

impl<B: Bitmap + ?Sized> Drop for BitmapGuard<'_, B> {
    fn drop(&mut self) {
        self.bitmap.unlock_pixels();
    }
}

/// A bitmap backed by a `Vec`
///
/// Locking an already locked `OwnedBitmap` fails.
pub struct OwnedBitmap {
    info:   BitmapInfo,
    pixels: UnsafeCell<Vec<u8>>,
    locked: AtomicBool
}

impl OwnedBitmap {
    /// A zeroed, tightly packed bitmap
    #[must_use]
    pub fn new(width: usize, height: usize, format: BitmapFormat) -> OwnedBitmap {
        let info = BitmapInfo::packed(width, height, format);
        OwnedBitmap {
            info,
            pixels: UnsafeCell::new(vec![0; info.byte_len()]),
            locked: AtomicBool::new(false)
        }
    }

    /// Wrap existing pixels
    ///
    /// # Errors
    /// `BufferTooSmall` when `pixels` can't hold `info.byte_len()` bytes
    pub fn from_pixels(info: BitmapInfo, pixels: Vec<u8>) -> Result<OwnedBitmap, ToolkitErrors> {
        if pixels.len() < info.byte_len() {
            return Err(ToolkitErrors::BufferTooSmall(
                "bitmap",
                info.byte_len(),
                pixels.len()
            ));
        }
        Ok(OwnedBitmap {
            info,
            pixels: UnsafeCell::new(pixels),
            locked: AtomicBool::new(false)
        })
    }

    pub fn pixels(&mut self) -> &[u8] {
        self.pixels.get_mut()
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixels.get_mut()
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels.into_inner()
    }
}

// SAFETY: The pointer handed out covers the whole Vec, which holds at least
// info.byte_len() bytes, and the locked flag refuses a second lock.
unsafe impl Bitmap for OwnedBitmap {
    fn info(&self) -> BitmapInfo {
        self.info
    }

    fn lock_pixels(&self) -> Option<NonNull<u8>> {
        if self.locked.swap(true, Ordering::Acquire) {
            return None;
        }
        // SAFETY: No reference into the Vec exists while unlocked, pixels()
        // and pixels_mut() need exclusive access
        let pixels = unsafe { &mut *self.pixels.get() };
        NonNull::new(pixels.as_mut_ptr())
    }

    fn unlock_pixels(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
