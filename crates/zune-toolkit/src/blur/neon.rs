/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

use crate::blur::{vertical_pass_scalar, HorizontalPass};
use crate::simd::neon::{load_u8x4_f32, round_f32_to_u8x4};
use crate::utils::round_f32_to_u8;

/// Vertical pass, four bytes at a time
#[target_feature(enable = "neon")]
pub(crate) unsafe fn vertical_pass_neon(rows: &[&[u8]], weights: &[f32], out: &mut [f32]) {
    let len = out.len();
    let mut i = 0;

    while i + 4 <= len {
        let mut acc = vdupq_n_f32(0.0);
        for (row, w) in rows.iter().zip(weights) {
            let v = load_u8x4_f32(&row[i..i + 4]);
            // separate multiply and add, a fused vfma would round differently
            acc = vaddq_f32(acc, vmulq_f32(vdupq_n_f32(*w), v));
        }
        vst1q_f32(out[i..i + 4].as_mut_ptr(), acc);
        i += 4;
    }
    vertical_pass_scalar(rows, weights, out, i);
}

/// Horizontal pass for one byte cells, four interior cells at a time
#[target_feature(enable = "neon")]
pub(crate) unsafe fn horizontal_pass_u1_neon(pass: &HorizontalPass, out: &mut [u8]) {
    let radius = pass.iradius;
    let mut x = pass.start_x;

    while x < pass.end_x {
        let out_pos = x - pass.start_x;

        if x >= radius && x + 3 + radius < pass.size_x && x + 4 <= pass.end_x {
            let mut acc = vdupq_n_f32(0.0);
            for (k, w) in pass.weights.iter().enumerate() {
                let tap = x + k - radius;
                let v = vld1q_f32(pass.scratch[tap..tap + 4].as_ptr());
                acc = vaddq_f32(acc, vmulq_f32(vdupq_n_f32(*w), v));
            }
            out[out_pos..out_pos + 4].copy_from_slice(&round_f32_to_u8x4(acc));
            x += 4;
        } else {
            out[out_pos] = round_f32_to_u8(pass.cell_u1(x));
            x += 1;
        }
    }
}

/// Horizontal pass for four byte cells, one cell per vector
#[target_feature(enable = "neon")]
pub(crate) unsafe fn horizontal_pass_u4_neon(pass: &HorizontalPass, out: &mut [u8]) {
    for (x, pix) in (pass.start_x..pass.end_x).zip(out.chunks_exact_mut(4)) {
        let mut acc = vdupq_n_f32(0.0);
        for (k, w) in pass.weights.iter().enumerate() {
            let tap = pass.tap(x, k) * 4;
            let v = vld1q_f32(pass.scratch[tap..tap + 4].as_ptr());
            acc = vaddq_f32(acc, vmulq_f32(vdupq_n_f32(*w), v));
        }
        pix.copy_from_slice(&round_f32_to_u8x4(acc));
    }
}
