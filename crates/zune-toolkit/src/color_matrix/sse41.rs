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

use crate::color_matrix::MatrixKernel;
use crate::utils::padded_size;

/// Clamp lanes to `[0, 255]` and truncate them to bytes
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn truncate_ps_to_u8x4(value: __m128) -> [u8; 4] {
    let clamped = _mm_min_ps(_mm_max_ps(value, _mm_setzero_ps()), _mm_set1_ps(255.0));
    let ints = _mm_cvttps_epi32(clamped);
    let packed = _mm_packus_epi16(_mm_packs_epi32(ints, ints), _mm_setzero_si128());
    (_mm_cvtsi128_si32(packed) as u32).to_ne_bytes()
}

/// One cell per vector, `acc += column[j] * in[j]` for every input channel
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn color_matrix_sse41(kernel: &MatrixKernel, input: &[u8], output: &mut [u8]) {
    let in_size = kernel.input_vector_size;
    let out_size = kernel.output_vector_size;
    let copy_alpha = kernel.path.copies_alpha() && out_size == 4;

    let columns = kernel.columns.map(|c| _mm_loadu_ps(c.as_ptr()));
    let add = _mm_loadu_ps(kernel.add.as_ptr());

    for (i, o) in input
        .chunks_exact(padded_size(in_size))
        .zip(output.chunks_exact_mut(padded_size(out_size)))
    {
        let mut acc = _mm_setzero_ps();
        for (j, column) in columns.iter().enumerate() {
            // missing channels are zero, the product still takes part in the sum
            let channel = if j < in_size { f32::from(i[j]) } else { 0.0 };
            acc = _mm_add_ps(acc, _mm_mul_ps(*column, _mm_set1_ps(channel)));
        }
        acc = _mm_add_ps(acc, add);

        let bytes = truncate_ps_to_u8x4(acc);
        o[..out_size].copy_from_slice(&bytes[..out_size]);
        if copy_alpha {
            o[3] = i[3];
        }
    }
}
