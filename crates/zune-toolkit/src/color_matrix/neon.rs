/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

use crate::color_matrix::MatrixKernel;
use crate::utils::padded_size;

/// Clamp lanes to `[0, 255]` and truncate them to bytes
#[inline]
#[target_feature(enable = "neon")]
unsafe fn truncate_f32_to_u8x4(value: float32x4_t) -> [u8; 4] {
    let clamped = vminq_f32(vmaxq_f32(value, vdupq_n_f32(0.0)), vdupq_n_f32(255.0));
    let ints = vmovn_u32(vcvtq_u32_f32(clamped));
    let bytes = vmovn_u16(vcombine_u16(ints, ints));
    vget_lane_u32::<0>(vreinterpret_u32_u8(bytes)).to_ne_bytes()
}

#[target_feature(enable = "neon")]
pub(crate) unsafe fn color_matrix_neon(kernel: &MatrixKernel, input: &[u8], output: &mut [u8]) {
    let in_size = kernel.input_vector_size;
    let out_size = kernel.output_vector_size;
    let copy_alpha = kernel.path.copies_alpha() && out_size == 4;

    let columns = kernel.columns.map(|c| vld1q_f32(c.as_ptr()));
    let add = vld1q_f32(kernel.add.as_ptr());

    for (i, o) in input
        .chunks_exact(padded_size(in_size))
        .zip(output.chunks_exact_mut(padded_size(out_size)))
    {
        let mut acc = vdupq_n_f32(0.0);
        for (j, column) in columns.iter().enumerate() {
            let channel = if j < in_size { f32::from(i[j]) } else { 0.0 };
            // kept apart from the add to match the scalar rounding
            acc = vaddq_f32(acc, vmulq_f32(*column, vdupq_n_f32(channel)));
        }
        acc = vaddq_f32(acc, add);

        let bytes = truncate_f32_to_u8x4(acc);
        o[..out_size].copy_from_slice(&bytes[..out_size]);
        if copy_alpha {
            o[3] = i[3];
        }
    }
}
