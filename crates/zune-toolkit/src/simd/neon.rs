/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! NEON is mandatory on aarch64 but it is still detected at runtime,
//! callers go through `ToolkitOptions::use_neon`.

#![cfg(all(feature = "neon", target_arch = "aarch64"))]

use std::arch::aarch64::*;

/// Widen the first four bytes of `bytes` to float lanes
#[inline]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn load_u8x4_f32(bytes: &[u8]) -> float32x4_t {
    let word = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let bytes8 = vreinterpret_u8_u32(vdup_n_u32(word));
    let wide = vmovl_u16(vget_low_u16(vmovl_u8(bytes8)));
    vcvtq_f32_u32(wide)
}

/// Widen the first `count` bytes of `bytes`, remaining lanes are zero
#[inline]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn load_partial_u8_f32(bytes: &[u8], count: usize) -> float32x4_t {
    let mut tmp = [0_u8; 4];
    tmp[..count].copy_from_slice(&bytes[..count]);
    load_u8x4_f32(&tmp)
}

/// Round float lanes to bytes, `+0.5`, clamp to `[0, 255]` then truncate
#[inline]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn round_f32_to_u8x4(value: float32x4_t) -> [u8; 4] {
    let rounded = vaddq_f32(value, vdupq_n_f32(0.5));
    let clamped = vminq_f32(vmaxq_f32(rounded, vdupq_n_f32(0.0)), vdupq_n_f32(255.0));
    // vcvtq truncates toward zero
    let ints = vmovn_u32(vcvtq_u32_f32(clamped));
    let bytes = vmovn_u16(vcombine_u16(ints, ints));
    vget_lane_u32::<0>(vreinterpret_u32_u8(bytes)).to_ne_bytes()
}

#[cfg(test)]
mod tests {
    use std::arch::aarch64::vld1q_f32;

    use nanorand::Rng;

    use crate::simd::neon::{load_partial_u8_f32, load_u8x4_f32, round_f32_to_u8x4};
    use crate::utils::round_f32_to_u8;

    #[test]
    fn round_matches_scalar() {
        let mut rng = nanorand::WyRand::new_seed(42);
        for _ in 0..10_000 {
            let lanes: [f32; 4] = [
                rng.generate_range(0_u32..400_000) as f32 / 1000.0 - 50.0,
                rng.generate_range(0_u32..400_000) as f32 / 1000.0 - 50.0,
                rng.generate_range(0_u32..1000) as f32 + 0.5,
                rng.generate_range(0_u32..256) as f32 - 0.5
            ];
            let expected = lanes.map(round_f32_to_u8);
            let found = unsafe { round_f32_to_u8x4(vld1q_f32(lanes.as_ptr())) };
            assert_eq!(expected, found, "{lanes:?}");
        }
    }

    #[test]
    fn loads_widen_bytes() {
        unsafe {
            assert_eq!(round_f32_to_u8x4(load_u8x4_f32(&[1, 2, 254, 255])), [1, 2, 254, 255]);
            assert_eq!(round_f32_to_u8x4(load_partial_u8_f32(&[7, 8, 9, 10], 3)), [7, 8, 9, 0]);
        }
    }
}
