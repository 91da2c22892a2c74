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

use crate::convolve::ConvolveRow;
use crate::simd::sse41::{load_partial_u8_ps, load_u8x4_ps, round_ps_to_u8x4};
use crate::utils::{padded_size, round_f32_to_u8};

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn convolve_row_sse41(row: &ConvolveRow, out: &mut [u8]) {
    if row.vector_size == 1 {
        convolve_u1_sse41(row, out);
    } else {
        convolve_cells_sse41(row, out);
    }
}

/// One cell per vector, lanes are channels
#[target_feature(enable = "sse4.1")]
unsafe fn convolve_cells_sse41(row: &ConvolveRow, out: &mut [u8]) {
    let vector_size = row.vector_size;
    let padded = padded_size(vector_size);
    let diameter = 2 * row.radius + 1;

    for (x, cell) in (row.start_x..row.end_x).zip(out.chunks_exact_mut(padded)) {
        let mut acc = _mm_setzero_ps();
        for (ky, input) in row.rows.iter().enumerate() {
            for kx in 0..diameter {
                let w = _mm_set1_ps(row.weights[ky * diameter + kx]);
                let offset = row.tap(x, kx) * padded;
                let v = if padded == 4 {
                    load_u8x4_ps(&input[offset..offset + 4])
                } else {
                    load_partial_u8_ps(&input[offset..], vector_size)
                };
                acc = _mm_add_ps(acc, _mm_mul_ps(w, v));
            }
        }
        let bytes = round_ps_to_u8x4(acc);
        cell[..vector_size].copy_from_slice(&bytes[..vector_size]);
    }
}

/// Four neighbouring one byte cells per vector
#[target_feature(enable = "sse4.1")]
unsafe fn convolve_u1_sse41(row: &ConvolveRow, out: &mut [u8]) {
    let radius = row.radius;
    let diameter = 2 * radius + 1;
    let mut x = row.start_x;

    while x < row.end_x {
        let pos = x - row.start_x;

        if x >= radius && x + 3 + radius < row.size_x && x + 4 <= row.end_x {
            let mut acc = _mm_setzero_ps();
            for (ky, input) in row.rows.iter().enumerate() {
                for kx in 0..diameter {
                    let w = _mm_set1_ps(row.weights[ky * diameter + kx]);
                    let tap = x + kx - radius;
                    acc = _mm_add_ps(acc, _mm_mul_ps(w, load_u8x4_ps(&input[tap..tap + 4])));
                }
            }
            out[pos..pos + 4].copy_from_slice(&round_ps_to_u8x4(acc));
            x += 4;
        } else {
            out[pos] = round_f32_to_u8(row.cell(x)[0]);
            x += 1;
        }
    }
}
