/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Blend a source image onto a destination image
//!
//! Both images are RGBA with one byte per channel, the result is written
//! to the destination. All arithmetic happens in 16 or 32 bit integers,
//! division by 255 is approximated with a shift by 8.
#![allow(clippy::cast_possible_truncation)]

use crate::task::{SharedBuffer, Task, TaskShape};

mod neon;
mod sse41;

/// How source and destination pixels are combined
///
/// `in` is the source pixel, `out` the destination pixel and `.a` their alpha.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum BlendingMode {
    /// `out = 0`
    Clear = 0,
    /// `out = in`
    Src,
    /// `out = out`, the destination is left as is
    Dst,
    /// `out = in + out * (1 - in.a)`
    SrcOver,
    /// `out = out + in * (1 - out.a)`
    DstOver,
    /// `out = in * out.a`
    SrcIn,
    /// `out = out * in.a`
    DstIn,
    /// `out = in * (1 - out.a)`
    SrcOut,
    /// `out = out * (1 - in.a)`
    DstOut,
    /// `out.rgb = in.rgb * out.a + (1 - in.a) * out.rgb`, `out.a = out.a`
    SrcAtop,
    /// `out.rgb = out.rgb * in.a + (1 - out.a) * in.rgb`, `out.a = in.a`
    DstAtop,
    /// `out = in ^ out`
    ///
    /// This is a bitwise xor of the bytes, not the Porter-Duff
    /// xor operator that shares its name.
    Xor,
    /// `out = in * out`
    Multiply,
    /// `out = min(in + out, 255)`
    Add,
    /// `out = max(out - in, 0)`
    Subtract
}

impl BlendingMode {
    /// All modes in numbering order
    pub const ALL: [BlendingMode; 15] = [
        BlendingMode::Clear,
        BlendingMode::Src,
        BlendingMode::Dst,
        BlendingMode::SrcOver,
        BlendingMode::DstOver,
        BlendingMode::SrcIn,
        BlendingMode::DstIn,
        BlendingMode::SrcOut,
        BlendingMode::DstOut,
        BlendingMode::SrcAtop,
        BlendingMode::DstAtop,
        BlendingMode::Xor,
        BlendingMode::Multiply,
        BlendingMode::Add,
        BlendingMode::Subtract
    ];

    /// Decode a mode from its number, `None` if out of range
    #[must_use]
    pub fn from_u8(value: u8) -> Option<BlendingMode> {
        BlendingMode::ALL.get(usize::from(value)).copied()
    }
}

pub(crate) struct BlendTask<'a> {
    shape:  TaskShape,
    mode:   BlendingMode,
    source: &'a [u8],
    dest:   SharedBuffer<'a>
}

impl<'a> BlendTask<'a> {
    pub(crate) fn new(
        mode: BlendingMode, source: &'a [u8], dest: &'a mut [u8], size_x: usize, size_y: usize,
        restriction: Option<&crate::restriction::Restriction>
    ) -> BlendTask<'a> {
        BlendTask {
            shape: TaskShape::new(size_x, size_y, 4, restriction, true),
            mode,
            source,
            dest: SharedBuffer::new(dest)
        }
    }
}

impl Task for BlendTask<'_> {
    fn shape(&self) -> &TaskShape {
        &self.shape
    }

    fn shape_mut(&mut self) -> &mut TaskShape {
        &mut self.shape
    }

    fn process(
        &self, _thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
    ) {
        let size_x = self.shape.size_x();
        for y in start_y..end_y {
            let start = (y * size_x + start_x) * 4;
            let end = (y * size_x + end_x) * 4;
            // SAFETY: The row segment lies inside this tile
            let dest = unsafe { self.dest.slice_mut(start, end) };
            blend_row(self.shape.uses_simd(), self.mode, &self.source[start..end], dest);
        }
    }
}

/// Blend a row of RGBA pixels, picking the simd path when allowed
pub(crate) fn blend_row(uses_simd: bool, mode: BlendingMode, source: &[u8], dest: &mut [u8]) {
    #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
    if uses_simd {
        // SAFETY: uses_simd is only set when sse4.1 is available
        unsafe { return sse41::blend_row_sse41(mode, source, dest) }
    }
    #[cfg(all(feature = "neon", target_arch = "aarch64"))]
    if uses_simd {
        // SAFETY: uses_simd is only set when neon is available
        unsafe { return neon::blend_row_neon(mode, source, dest) }
    }
    let _ = uses_simd;
    blend_row_scalar(mode, source, dest);
}

/// Reference per pixel blending
pub(crate) fn blend_row_scalar(mode: BlendingMode, source: &[u8], dest: &mut [u8]) {
    match mode {
        BlendingMode::Clear => dest.fill(0),
        BlendingMode::Src => dest.copy_from_slice(source),
        BlendingMode::Dst => (),
        _ => {
            for (src, dst) in source.chunks_exact(4).zip(dest.chunks_exact_mut(4)) {
                let out = blend_pixel(
                    mode,
                    [src[0], src[1], src[2], src[3]],
                    [dst[0], dst[1], dst[2], dst[3]]
                );
                dst.copy_from_slice(&out);
            }
        }
    }
}

/// Blend one pixel, `src` being `in` and `dst` being `out`
#[inline(always)]
pub(crate) fn blend_pixel(mode: BlendingMode, src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let s = src.map(u32::from);
    let d = dst.map(u32::from);
    let (sa, da) = (s[3], d[3]);

    let per_channel = |f: &dyn Fn(u32, u32) -> u32| -> [u8; 4] {
        [0, 1, 2, 3].map(|c| f(s[c], d[c]).min(255) as u8)
    };

    match mode {
        BlendingMode::Clear => [0; 4],
        BlendingMode::Src => src,
        BlendingMode::Dst => dst,
        BlendingMode::SrcOver => per_channel(&|i, o| i + ((o * (255 - sa)) >> 8)),
        BlendingMode::DstOver => per_channel(&|i, o| o + ((i * (255 - da)) >> 8)),
        BlendingMode::SrcIn => per_channel(&|i, _| (i * da) >> 8),
        BlendingMode::DstIn => per_channel(&|_, o| (o * sa) >> 8),
        BlendingMode::SrcOut => per_channel(&|i, _| (i * (255 - da)) >> 8),
        BlendingMode::DstOut => per_channel(&|_, o| (o * (255 - sa)) >> 8),
        BlendingMode::SrcAtop => {
            // up to 255 * 255 * 2 before the shift, hence u32
            let mut out = per_channel(&|i, o| (i * da + o * (255 - sa)) >> 8);
            out[3] = dst[3];
            out
        }
        BlendingMode::DstAtop => {
            let mut out = per_channel(&|i, o| (o * sa + i * (255 - da)) >> 8);
            out[3] = src[3];
            out
        }
        BlendingMode::Xor => [0, 1, 2, 3].map(|c| src[c] ^ dst[c]),
        BlendingMode::Multiply => per_channel(&|i, o| (i * o) >> 8),
        BlendingMode::Add => [0, 1, 2, 3].map(|c| src[c].saturating_add(dst[c])),
        BlendingMode::Subtract => [0, 1, 2, 3].map(|c| dst[c].saturating_sub(src[c]))
    }
}

#[cfg(test)]
mod tests {
    use nanorand::Rng;
    use zune_core::options::ToolkitOptions;

    use crate::blend::{blend_pixel, blend_row, blend_row_scalar, BlendingMode};

    #[test]
    fn modes_round_trip_numbers() {
        for (i, mode) in BlendingMode::ALL.iter().enumerate() {
            assert_eq!(*mode as usize, i);
            assert_eq!(BlendingMode::from_u8(i as u8), Some(*mode));
        }
        assert_eq!(BlendingMode::from_u8(15), None);
    }

    #[test]
    fn add_saturates() {
        let out = blend_pixel(BlendingMode::Add, [200; 4], [100; 4]);
        assert_eq!(out, [255; 4]);
        let out = blend_pixel(BlendingMode::Subtract, [200; 4], [100; 4]);
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn opaque_src_over_replaces() {
        let src = [12, 200, 77, 255];
        assert_eq!(blend_pixel(BlendingMode::SrcOver, src, src), src);
        assert_eq!(blend_pixel(BlendingMode::SrcOver, src, [1, 2, 3, 4]), src);
    }

    #[test]
    fn atop_keeps_alpha() {
        let src = [255, 255, 255, 0];
        let dst = [255, 255, 255, 255];
        // 255*255 + 255*255 overflows 16 bits, the result must still saturate
        assert_eq!(blend_pixel(BlendingMode::SrcAtop, src, dst), [255, 255, 255, 255]);
        assert_eq!(blend_pixel(BlendingMode::DstAtop, dst, src)[3], 255);
        assert_eq!(blend_pixel(BlendingMode::DstAtop, [9, 9, 9, 17], dst)[3], 17);
    }

    #[test]
    fn xor_is_bitwise() {
        assert_eq!(
            blend_pixel(BlendingMode::Xor, [0xF0, 0x0F, 0xFF, 0x00], [0xFF, 0xFF, 0x0F, 0x00]),
            [0x0F, 0xF0, 0xF0, 0x00]
        );
    }

    #[test]
    fn simd_matches_scalar() {
        let uses_simd = ToolkitOptions::new_fast().use_simd();
        let mut rng = nanorand::WyRand::new_seed(11);
        // odd lengths exercise the scalar tails
        for pixels in [1, 3, 4, 15, 16, 17, 131] {
            let mut source = vec![0_u8; pixels * 4];
            let mut dest = vec![0_u8; pixels * 4];
            rng.fill(&mut source);
            rng.fill(&mut dest);
            // some fully opaque and fully transparent pixels
            source[3] = 255;
            dest[3] = 0;

            for mode in BlendingMode::ALL {
                let mut scalar = dest.clone();
                blend_row_scalar(mode, &source, &mut scalar);
                let mut fast = dest.clone();
                blend_row(uses_simd, mode, &source, &mut fast);
                assert_eq!(scalar, fast, "{mode:?} with {pixels} pixels");
            }
        }
    }
}
