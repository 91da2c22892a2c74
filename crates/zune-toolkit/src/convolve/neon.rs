/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

use crate::convolve::ConvolveRow;
use crate::simd::neon::{load_partial_u8_f32, load_u8x4_f32, round_f32_to_u8x4};
use crate::utils::{padded_size, round_f32_to_u8};

#[target_feature(enable = "neon")]
pub(crate) unsafe fn convolve_row_neon(row: &ConvolveRow, out: &mut [u8]) {
    let radius = row.radius;
    let diameter = 2 * radius + 1;
    let vector_size = row.vector_size;

    if vector_size > 1 {
        let padded = padded_size(vector_size);
        for (x, cell) in (row.start_x..row.end_x).zip(out.chunks_exact_mut(padded)) {
            let mut acc = vdupq_n_f32(0.0);
            for (ky, input) in row.rows.iter().enumerate() {
                for kx in 0..diameter {
                    let w = vdupq_n_f32(row.weights[ky * diameter + kx]);
                    let offset = row.tap(x, kx) * padded;
                    let v = if padded == 4 {
                        load_u8x4_f32(&input[offset..offset + 4])
                    } else {
                        load_partial_u8_f32(&input[offset..], vector_size)
                    };
                    // no vfma, it rounds differently from the scalar code
                    acc = vaddq_f32(acc, vmulq_f32(w, v));
                }
            }
            let bytes = round_f32_to_u8x4(acc);
            cell[..vector_size].copy_from_slice(&bytes[..vector_size]);
        }
        return;
    }

    let mut x = row.start_x;
    while x < row.end_x {
        let pos = x - row.start_x;

        if x >= radius && x + 3 + radius < row.size_x && x + 4 <= row.end_x {
            let mut acc = vdupq_n_f32(0.0);
            for (ky, input) in row.rows.iter().enumerate() {
                for kx in 0..diameter {
                    let w = vdupq_n_f32(row.weights[ky * diameter + kx]);
                    let tap = x + kx - radius;
                    acc = vaddq_f32(acc, vmulq_f32(w, load_u8x4_f32(&input[tap..tap + 4])));
                }
            }
            out[pos..pos + 4].copy_from_slice(&round_f32_to_u8x4(acc));
            x += 4;
        } else {
            out[pos] = round_f32_to_u8(row.cell(x)[0]);
            x += 1;
        }
    }
}
