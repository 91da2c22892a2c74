/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Multithreaded image kernels over raw pixel buffers
//!
//! The toolkit runs blur, blend, 3x3 and 5x5 convolution, color matrices,
//! histograms, lookup tables, bicubic resize and YUV conversion over
//! buffers of one to four byte cells. Work is split in tiles and spread
//! over a persistent thread pool, with SSE4.1 and NEON kernels picked at
//! runtime when the cpu has them.
//!
//! # Example
//! - Lighten an RGBA image by blending white over it with half alpha
//! ```
//! use zune_toolkit::{BlendingMode, Toolkit, ToolkitErrors};
//!
//! let toolkit = Toolkit::default();
//! let source = [128, 128, 128, 128].repeat(16 * 16);
//! let mut dest = vec![0_u8; 16 * 16 * 4];
//! toolkit.blend(BlendingMode::SrcOver, &source, &mut dest, 16, 16, None)?;
//! # Ok::<(), ToolkitErrors>(())
//! ```
//!
//! # Features
//! - `x86`: SSE4.1 kernels, detected at runtime
//! - `neon`: aarch64 kernels
//! - `log`: forward diagnostics to the `log` crate
#![warn(
    clippy::correctness,
    clippy::perf,
    clippy::pedantic,
    clippy::inline_always,
    clippy::missing_errors_doc,
    clippy::panic
)]
#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::inline_always,
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::wildcard_imports
)]

pub use zune_core::options::{ToolkitFlags, ToolkitOptions};

pub use crate::bitmap::{Bitmap, BitmapFormat, BitmapInfo, OwnedBitmap};
pub use crate::blend::BlendingMode;
pub use crate::blur::{GaussianCoefficients, MAX_BLUR_RADIUS};
pub use crate::color_matrix::ColorMatrix;
pub use crate::convolve::ConvolveCoefficients;
pub use crate::errors::ToolkitErrors;
pub use crate::histogram::DEFAULT_DOT_COEFFICIENTS;
pub use crate::lut::LookupTable;
pub use crate::lut3d::Cube;
pub use crate::restriction::Restriction;
pub use crate::toolkit::Toolkit;
pub use crate::yuv_to_rgb::YuvFormat;

pub mod bitmap;
pub mod blend;
pub mod blur;
pub mod color_matrix;
pub mod convolve;
pub mod errors;
pub mod histogram;
pub mod lut;
pub mod lut3d;
mod resize;
pub mod restriction;
mod scheduler;
mod simd;
mod task;
mod toolkit;
mod utils;
pub mod yuv_to_rgb;
