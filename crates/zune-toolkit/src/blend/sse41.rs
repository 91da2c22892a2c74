/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
//! Blending four pixels per iteration
//!
//! Pixels are widened to 16 bit lanes, a product of two bytes always fits
//! in a lane, sums of two products are halved before they would overflow.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::blend::{blend_row_scalar, BlendingMode};

/// Copy the alpha lane of each pixel into its other three lanes
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn broadcast_alpha(x: __m128i) -> __m128i {
    _mm_shufflehi_epi16::<0xFF>(_mm_shufflelo_epi16::<0xFF>(x))
}

/// `(a * b) >> 8`
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn mul_shr8(a: __m128i, b: __m128i) -> __m128i {
    _mm_srli_epi16::<8>(_mm_mullo_epi16(a, b))
}

/// `(a * b + c * d) >> 8`, the sum may not fit 16 bits
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn mul_add_shr8(a: __m128i, b: __m128i, c: __m128i, d: __m128i) -> __m128i {
    let p = _mm_mullo_epi16(a, b);
    let q = _mm_mullo_epi16(c, d);
    // floor((p + q) / 2) == (p & q) + ((p ^ q) >> 1)
    let half = _mm_add_epi16(_mm_and_si128(p, q), _mm_srli_epi16::<1>(_mm_xor_si128(p, q)));
    _mm_srli_epi16::<7>(half)
}

/// Blend two widened pixels, results above 255 are saturated by the caller
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn blend_u16(mode: BlendingMode, s: __m128i, d: __m128i) -> __m128i {
    let max = _mm_set1_epi16(255);
    let sa = broadcast_alpha(s);
    let da = broadcast_alpha(d);

    match mode {
        BlendingMode::SrcOver => _mm_add_epi16(s, mul_shr8(d, _mm_sub_epi16(max, sa))),
        BlendingMode::DstOver => _mm_add_epi16(d, mul_shr8(s, _mm_sub_epi16(max, da))),
        BlendingMode::SrcIn => mul_shr8(s, da),
        BlendingMode::DstIn => mul_shr8(d, sa),
        BlendingMode::SrcOut => mul_shr8(s, _mm_sub_epi16(max, da)),
        BlendingMode::DstOut => mul_shr8(d, _mm_sub_epi16(max, sa)),
        // lanes 3 and 7 are the alpha channels
        BlendingMode::SrcAtop => {
            _mm_blend_epi16::<0x88>(mul_add_shr8(s, da, d, _mm_sub_epi16(max, sa)), d)
        }
        BlendingMode::DstAtop => {
            _mm_blend_epi16::<0x88>(mul_add_shr8(d, sa, s, _mm_sub_epi16(max, da)), s)
        }
        BlendingMode::Multiply => mul_shr8(s, d),
        _ => d
    }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn blend_row_sse41(mode: BlendingMode, source: &[u8], dest: &mut [u8]) {
    if matches!(
        mode,
        BlendingMode::Clear | BlendingMode::Src | BlendingMode::Dst
    ) {
        return blend_row_scalar(mode, source, dest);
    }
    let zero = _mm_setzero_si128();
    let mut src_chunks = source.chunks_exact(16);
    let mut dst_chunks = dest.chunks_exact_mut(16);

    for (src, dst) in (&mut src_chunks).zip(&mut dst_chunks) {
        let s = _mm_loadu_si128(src.as_ptr().cast());
        let d = _mm_loadu_si128(dst.as_ptr().cast());

        let out = match mode {
            BlendingMode::Xor => _mm_xor_si128(s, d),
            BlendingMode::Add => _mm_adds_epu8(s, d),
            BlendingMode::Subtract => _mm_subs_epu8(d, s),
            _ => {
                let lo = blend_u16(mode, _mm_unpacklo_epi8(s, zero), _mm_unpacklo_epi8(d, zero));
                let hi = blend_u16(mode, _mm_unpackhi_epi8(s, zero), _mm_unpackhi_epi8(d, zero));
                // packus saturates to 255
                _mm_packus_epi16(lo, hi)
            }
        };
        _mm_storeu_si128(dst.as_mut_ptr().cast(), out);
    }
    blend_row_scalar(mode, src_chunks.remainder(), dst_chunks.into_remainder());
}
