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

use crate::resize::{taps, ResizeRow};
use crate::simd::sse41::{load_u8x4_ps, round_ps_to_u8x4};

/// Lane wise [`cubic`](crate::resize::cubic)
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn cubic_ps(p0: __m128, p1: __m128, p2: __m128, p3: __m128, x: __m128) -> __m128 {
    let a = _mm_sub_ps(
        _mm_add_ps(_mm_mul_ps(_mm_set1_ps(3.0), _mm_sub_ps(p1, p2)), p3),
        p0
    );
    let b = _mm_sub_ps(
        _mm_add_ps(
            _mm_sub_ps(
                _mm_mul_ps(_mm_set1_ps(2.0), p0),
                _mm_mul_ps(_mm_set1_ps(5.0), p1)
            ),
            _mm_mul_ps(_mm_set1_ps(4.0), p2)
        ),
        p3
    );
    let c = _mm_sub_ps(p2, p0);
    let inner = _mm_add_ps(c, _mm_mul_ps(x, _mm_add_ps(b, _mm_mul_ps(x, a))));
    _mm_add_ps(p1, _mm_mul_ps(_mm_mul_ps(_mm_set1_ps(0.5), x), inner))
}

/// Resize a row of three or four channel cells, one cell per vector
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn resize_row_sse41(row: &ResizeRow, out: &mut [u8]) {
    let vector_size = row.vector_size;

    for (x, cell) in (row.start_x..row.end_x).zip(out.chunks_exact_mut(4)) {
        let (xs, x_frac) = taps(x, row.scale_x, row.input_x);
        let x_frac = _mm_set1_ps(x_frac);

        let mut along_x = [_mm_setzero_ps(); 4];
        for (value, input) in along_x.iter_mut().zip(row.rows.iter()) {
            let p0 = load_u8x4_ps(&input[xs[0] * 4..]);
            let p1 = load_u8x4_ps(&input[xs[1] * 4..]);
            let p2 = load_u8x4_ps(&input[xs[2] * 4..]);
            let p3 = load_u8x4_ps(&input[xs[3] * 4..]);
            *value = cubic_ps(p0, p1, p2, p3, x_frac);
        }
        let result = cubic_ps(
            along_x[0],
            along_x[1],
            along_x[2],
            along_x[3],
            _mm_set1_ps(row.y_frac)
        );
        let bytes = round_ps_to_u8x4(result);
        cell[..vector_size].copy_from_slice(&bytes[..vector_size]);
    }
}
