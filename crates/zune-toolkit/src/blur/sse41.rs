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

use crate::blur::{vertical_pass_scalar, HorizontalPass};
use crate::simd::sse41::{load_u8x4_ps, round_ps_to_u8x4};
use crate::utils::round_f32_to_u8;

/// Vertical pass, four bytes at a time
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn vertical_pass_sse41(rows: &[&[u8]], weights: &[f32], out: &mut [f32]) {
    let len = out.len();
    let mut i = 0;

    while i + 4 <= len {
        let mut acc = _mm_setzero_ps();
        for (row, w) in rows.iter().zip(weights) {
            let v = load_u8x4_ps(&row[i..i + 4]);
            acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(*w), v));
        }
        _mm_storeu_ps(out[i..i + 4].as_mut_ptr(), acc);
        i += 4;
    }
    vertical_pass_scalar(rows, weights, out, i);
}

/// Horizontal pass for one byte cells
///
/// Four neighbouring cells are blurred together when none of their taps
/// needs clamping, cells near the edges go through the scalar code.
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn horizontal_pass_u1_sse41(pass: &HorizontalPass, out: &mut [u8]) {
    let radius = pass.iradius;
    let mut x = pass.start_x;

    while x < pass.end_x {
        let out_pos = x - pass.start_x;

        if x >= radius && x + 3 + radius < pass.size_x && x + 4 <= pass.end_x {
            let mut acc = _mm_setzero_ps();
            for (k, w) in pass.weights.iter().enumerate() {
                let tap = x + k - radius;
                let v = _mm_loadu_ps(pass.scratch[tap..tap + 4].as_ptr());
                acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(*w), v));
            }
            out[out_pos..out_pos + 4].copy_from_slice(&round_ps_to_u8x4(acc));
            x += 4;
        } else {
            out[out_pos] = round_f32_to_u8(pass.cell_u1(x));
            x += 1;
        }
    }
}

/// Horizontal pass for four byte cells, one cell per vector
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn horizontal_pass_u4_sse41(pass: &HorizontalPass, out: &mut [u8]) {
    for (x, pix) in (pass.start_x..pass.end_x).zip(out.chunks_exact_mut(4)) {
        let mut acc = _mm_setzero_ps();
        for (k, w) in pass.weights.iter().enumerate() {
            let tap = pass.tap(x, k) * 4;
            let v = _mm_loadu_ps(pass.scratch[tap..tap + 4].as_ptr());
            acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(*w), v));
        }
        pix.copy_from_slice(&round_ps_to_u8x4(acc));
    }
}
