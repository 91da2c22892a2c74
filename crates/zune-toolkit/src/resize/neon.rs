/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

use crate::resize::{taps, ResizeRow};
use crate::simd::neon::{load_u8x4_f32, round_f32_to_u8x4};

/// Lane wise [`cubic`](crate::resize::cubic), without fused multiply-adds
#[inline]
#[target_feature(enable = "neon")]
unsafe fn cubic_f32(
    p0: float32x4_t, p1: float32x4_t, p2: float32x4_t, p3: float32x4_t, x: float32x4_t
) -> float32x4_t {
    let a = vsubq_f32(vaddq_f32(vmulq_n_f32(vsubq_f32(p1, p2), 3.0), p3), p0);
    let b = vsubq_f32(
        vaddq_f32(
            vsubq_f32(vmulq_n_f32(p0, 2.0), vmulq_n_f32(p1, 5.0)),
            vmulq_n_f32(p2, 4.0)
        ),
        p3
    );
    let c = vsubq_f32(p2, p0);
    let inner = vaddq_f32(c, vmulq_f32(x, vaddq_f32(b, vmulq_f32(x, a))));
    vaddq_f32(p1, vmulq_f32(vmulq_n_f32(x, 0.5), inner))
}

#[target_feature(enable = "neon")]
pub(crate) unsafe fn resize_row_neon(row: &ResizeRow, out: &mut [u8]) {
    let vector_size = row.vector_size;

    for (x, cell) in (row.start_x..row.end_x).zip(out.chunks_exact_mut(4)) {
        let (xs, x_frac) = taps(x, row.scale_x, row.input_x);
        let x_frac = vdupq_n_f32(x_frac);

        let mut along_x = [vdupq_n_f32(0.0); 4];
        for (value, input) in along_x.iter_mut().zip(row.rows.iter()) {
            let p0 = load_u8x4_f32(&input[xs[0] * 4..]);
            let p1 = load_u8x4_f32(&input[xs[1] * 4..]);
            let p2 = load_u8x4_f32(&input[xs[2] * 4..]);
            let p3 = load_u8x4_f32(&input[xs[3] * 4..]);
            *value = cubic_f32(p0, p1, p2, p3, x_frac);
        }
        let result = cubic_f32(
            along_x[0],
            along_x[1],
            along_x[2],
            along_x[3],
            vdupq_n_f32(row.y_frac)
        );
        let bytes = round_f32_to_u8x4(result);
        cell[..vector_size].copy_from_slice(&bytes[..vector_size]);
    }
}
