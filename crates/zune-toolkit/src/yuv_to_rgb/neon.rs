/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

use crate::yuv_to_rgb::YuvRow;

#[inline]
#[target_feature(enable = "neon")]
unsafe fn clamp_u32(a: int32x4_t) -> uint32x4_t {
    vreinterpretq_u32_s32(vminq_s32(vmaxq_s32(a, vdupq_n_s32(0)), vdupq_n_s32(255)))
}

#[target_feature(enable = "neon")]
pub(crate) unsafe fn yuv_row_neon(row: &YuvRow, out: &mut [u8]) {
    let alpha = vdupq_n_u32(0xFF00_0000);

    let mut x = row.start_x;
    while x + 4 <= row.end_x {
        let c = [
            row.chroma(x),
            row.chroma(x + 1),
            row.chroma(x + 2),
            row.chroma(x + 3)
        ];
        let y: [i32; 4] = std::array::from_fn(|i| i32::from(row.y[x + i]));
        let u: [i32; 4] = c.map(|o| i32::from(row.u[o]));
        let v: [i32; 4] = c.map(|o| i32::from(row.v[o]));

        let y = vmulq_n_s32(vsubq_s32(vld1q_s32(y.as_ptr()), vdupq_n_s32(16)), 298);
        let y = vaddq_s32(y, vdupq_n_s32(128));
        let u = vsubq_s32(vld1q_s32(u.as_ptr()), vdupq_n_s32(128));
        let v = vsubq_s32(vld1q_s32(v.as_ptr()), vdupq_n_s32(128));

        let r = vaddq_s32(y, vmulq_n_s32(v, 409));
        let g = vsubq_s32(vsubq_s32(y, vmulq_n_s32(u, 100)), vmulq_n_s32(v, 208));
        let b = vaddq_s32(y, vmulq_n_s32(u, 516));

        let r = clamp_u32(vshrq_n_s32::<8>(r));
        let g = clamp_u32(vshrq_n_s32::<8>(g));
        let b = clamp_u32(vshrq_n_s32::<8>(b));

        let rgba = vorrq_u32(
            vorrq_u32(r, vshlq_n_u32::<8>(g)),
            vorrq_u32(vshlq_n_u32::<16>(b), alpha)
        );
        let pos = (x - row.start_x) * 4;
        vst1q_u8(out[pos..pos + 16].as_mut_ptr(), vreinterpretq_u8_u32(rgba));
        x += 4;
    }
    row.run_scalar(x, out);
}
