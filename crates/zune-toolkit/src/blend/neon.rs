/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]
//! Blending sixteen pixels per iteration on de-interleaved channels

use std::arch::aarch64::*;

use crate::blend::{blend_row_scalar, BlendingMode};

/// `(a * b) >> 8` for all sixteen lanes
#[inline]
#[target_feature(enable = "neon")]
unsafe fn mul_shr8(a: uint8x16_t, b: uint8x16_t) -> uint8x16_t {
    let lo = vshrq_n_u16::<8>(vmull_u8(vget_low_u8(a), vget_low_u8(b)));
    let hi = vshrq_n_u16::<8>(vmull_high_u8(a, b));
    vcombine_u8(vmovn_u16(lo), vmovn_u16(hi))
}

/// `min((a * b + c * d) >> 8, 255)`
#[inline]
#[target_feature(enable = "neon")]
unsafe fn mul_add_shr8(a: uint8x16_t, b: uint8x16_t, c: uint8x16_t, d: uint8x16_t) -> uint8x16_t {
    // the halving add keeps the sum in 16 bits
    let lo = vhaddq_u16(
        vmull_u8(vget_low_u8(a), vget_low_u8(b)),
        vmull_u8(vget_low_u8(c), vget_low_u8(d))
    );
    let hi = vhaddq_u16(vmull_high_u8(a, b), vmull_high_u8(c, d));
    vcombine_u8(
        vqmovn_u16(vshrq_n_u16::<7>(lo)),
        vqmovn_u16(vshrq_n_u16::<7>(hi))
    )
}

/// Blend one channel of sixteen pixels
#[inline]
#[target_feature(enable = "neon")]
unsafe fn blend_channel(
    mode: BlendingMode, s: uint8x16_t, d: uint8x16_t, sa: uint8x16_t, da: uint8x16_t
) -> uint8x16_t {
    // !x == 255 - x for bytes
    match mode {
        BlendingMode::SrcOver => vqaddq_u8(s, mul_shr8(d, vmvnq_u8(sa))),
        BlendingMode::DstOver => vqaddq_u8(d, mul_shr8(s, vmvnq_u8(da))),
        BlendingMode::SrcIn => mul_shr8(s, da),
        BlendingMode::DstIn => mul_shr8(d, sa),
        BlendingMode::SrcOut => mul_shr8(s, vmvnq_u8(da)),
        BlendingMode::DstOut => mul_shr8(d, vmvnq_u8(sa)),
        BlendingMode::SrcAtop => mul_add_shr8(s, da, d, vmvnq_u8(sa)),
        BlendingMode::DstAtop => mul_add_shr8(d, sa, s, vmvnq_u8(da)),
        BlendingMode::Xor => veorq_u8(s, d),
        BlendingMode::Multiply => mul_shr8(s, d),
        BlendingMode::Add => vqaddq_u8(s, d),
        BlendingMode::Subtract => vqsubq_u8(d, s),
        _ => d
    }
}

#[target_feature(enable = "neon")]
pub(crate) unsafe fn blend_row_neon(mode: BlendingMode, source: &[u8], dest: &mut [u8]) {
    if matches!(
        mode,
        BlendingMode::Clear | BlendingMode::Src | BlendingMode::Dst
    ) {
        return blend_row_scalar(mode, source, dest);
    }
    let mut src_chunks = source.chunks_exact(64);
    let mut dst_chunks = dest.chunks_exact_mut(64);

    for (src, dst) in (&mut src_chunks).zip(&mut dst_chunks) {
        let s = vld4q_u8(src.as_ptr());
        let d = vld4q_u8(dst.as_ptr());
        let (sa, da) = (s.3, d.3);

        let alpha = match mode {
            BlendingMode::SrcAtop => da,
            BlendingMode::DstAtop => sa,
            _ => blend_channel(mode, sa, da, sa, da)
        };
        let out = uint8x16x4_t(
            blend_channel(mode, s.0, d.0, sa, da),
            blend_channel(mode, s.1, d.1, sa, da),
            blend_channel(mode, s.2, d.2, sa, da),
            alpha
        );
        vst4q_u8(dst.as_mut_ptr(), out);
    }
    blend_row_scalar(mode, src_chunks.remainder(), dst_chunks.into_remainder());
}
