/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Shared pieces of the simd kernels
//!
//! Each kernel keeps its own `sse41.rs` and `neon.rs` next to the scalar
//! code, this module only holds the load/round/store helpers they share.
//!
//! The float kernels evaluate every lane with the same sequence of
//! multiplies and adds as the scalar code, without fused multiply-add,
//! so simd and scalar output are byte identical.

pub(crate) mod neon;
pub(crate) mod sse41;

/// Name of the kernel family a task with `uses_simd` will run, for logs
pub(crate) const fn path_name(uses_simd: bool) -> &'static str {
    if !uses_simd {
        return "scalar";
    }
    if cfg!(all(
        feature = "x86",
        any(target_arch = "x86", target_arch = "x86_64")
    )) {
        "sse4.1"
    } else if cfg!(all(feature = "neon", target_arch = "aarch64")) {
        "neon"
    } else {
        "scalar"
    }
}
