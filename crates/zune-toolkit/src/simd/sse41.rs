/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Widen the first four bytes of `bytes` to float lanes
#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn load_u8x4_ps(bytes: &[u8]) -> __m128 {
    let word = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    _mm_cvtepi32_ps(_mm_cvtepu8_epi32(_mm_cvtsi32_si128(word as i32)))
}

/// Widen the first `count` bytes of `bytes`, remaining lanes are zero
#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn load_partial_u8_ps(bytes: &[u8], count: usize) -> __m128 {
    let mut tmp = [0_u8; 4];
    tmp[..count].copy_from_slice(&bytes[..count]);
    load_u8x4_ps(&tmp)
}

/// Round float lanes to bytes, `+0.5`, clamp to `[0, 255]` then truncate
#[inline]
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn round_ps_to_u8x4(value: __m128) -> [u8; 4] {
    let rounded = _mm_add_ps(value, _mm_set1_ps(0.5));
    let clamped = _mm_min_ps(_mm_max_ps(rounded, _mm_setzero_ps()), _mm_set1_ps(255.0));
    let ints = _mm_cvttps_epi32(clamped);
    let packed = _mm_packus_epi16(_mm_packs_epi32(ints, ints), _mm_setzero_si128());
    (_mm_cvtsi128_si32(packed) as u32).to_ne_bytes()
}
