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

use crate::yuv_to_rgb::YuvRow;

#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn clamp_epi32(a: __m128i) -> __m128i {
    _mm_min_epi32(_mm_max_epi32(a, _mm_setzero_si128()), _mm_set1_epi32(255))
}

/// Convert four pixels per step in 32 bit lanes, the tail is scalar
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn yuv_row_sse41(row: &YuvRow, out: &mut [u8]) {
    let rounding = _mm_set1_epi32(128);
    let alpha = _mm_slli_epi32::<24>(_mm_set1_epi32(255));

    let mut x = row.start_x;
    while x + 4 <= row.end_x {
        let c = [
            row.chroma(x),
            row.chroma(x + 1),
            row.chroma(x + 2),
            row.chroma(x + 3)
        ];
        let y = _mm_setr_epi32(
            i32::from(row.y[x]),
            i32::from(row.y[x + 1]),
            i32::from(row.y[x + 2]),
            i32::from(row.y[x + 3])
        );
        let u = _mm_setr_epi32(
            i32::from(row.u[c[0]]),
            i32::from(row.u[c[1]]),
            i32::from(row.u[c[2]]),
            i32::from(row.u[c[3]])
        );
        let v = _mm_setr_epi32(
            i32::from(row.v[c[0]]),
            i32::from(row.v[c[1]]),
            i32::from(row.v[c[2]]),
            i32::from(row.v[c[3]])
        );
        let y = _mm_mullo_epi32(_mm_sub_epi32(y, _mm_set1_epi32(16)), _mm_set1_epi32(298));
        let u = _mm_sub_epi32(u, rounding);
        let v = _mm_sub_epi32(v, rounding);
        let y = _mm_add_epi32(y, rounding);

        let r = _mm_add_epi32(y, _mm_mullo_epi32(v, _mm_set1_epi32(409)));
        let g = _mm_sub_epi32(
            _mm_sub_epi32(y, _mm_mullo_epi32(u, _mm_set1_epi32(100))),
            _mm_mullo_epi32(v, _mm_set1_epi32(208))
        );
        let b = _mm_add_epi32(y, _mm_mullo_epi32(u, _mm_set1_epi32(516)));

        let r = clamp_epi32(_mm_srai_epi32::<8>(r));
        let g = clamp_epi32(_mm_srai_epi32::<8>(g));
        let b = clamp_epi32(_mm_srai_epi32::<8>(b));

        let rgba = _mm_or_si128(
            _mm_or_si128(r, _mm_slli_epi32::<8>(g)),
            _mm_or_si128(_mm_slli_epi32::<16>(b), alpha)
        );
        let pos = (x - row.start_x) * 4;
        _mm_storeu_si128(out[pos..pos + 16].as_mut_ptr().cast(), rgba);
        x += 4;
    }
    row.run_scalar(x, out);
}
