/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! 3x3 and 5x5 convolution
//!
//! Both sizes share one implementation parameterized by the radius.
//! Neighbours outside the image are replaced by the closest edge cell,
//! channels are convolved independently of each other.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use crate::errors::ToolkitErrors;
use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};
use crate::utils::{clamp_index, load_float4, padded_size, store_float4_rounded, Float4};

mod neon;
mod sse41;

/// Largest supported radius, a 5x5 kernel
const MAX_RADIUS: usize = 2;

/// Coefficients of a 3x3 or 5x5 convolution kernel
#[derive(Clone, Debug)]
pub struct ConvolveCoefficients {
    radius:      usize,
    weights:     Vec<f32>,
    fixed_point: Vec<i16>
}

impl ConvolveCoefficients {
    /// Create coefficients from 9 or 25 row-major weights
    ///
    /// # Errors
    /// `InvalidParameter` when there is another number of weights
    /// or one of them is not finite
    pub fn new(weights: &[f32]) -> Result<ConvolveCoefficients, ToolkitErrors> {
        let radius = match weights.len() {
            9 => 1,
            25 => 2,
            n => {
                return Err(ToolkitErrors::InvalidParameter(format!(
                    "Convolution expects 9 or 25 coefficients, found {n}"
                )))
            }
        };
        if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "Convolution coefficient {bad} is not finite"
            )));
        }
        // scaled by 256, rounded away from zero
        let fixed_point = weights
            .iter()
            .map(|w| {
                let scaled = w * 256.0;
                if scaled >= 0.0 {
                    (scaled + 0.5) as i16
                } else {
                    (scaled - 0.5) as i16
                }
            })
            .collect();

        Ok(ConvolveCoefficients {
            radius,
            weights: weights.to_vec(),
            fixed_point
        })
    }

    /// 1 for a 3x3 kernel, 2 for a 5x5 kernel
    pub const fn radius(&self) -> usize {
        self.radius
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weights scaled by 256 and rounded
    pub fn fixed_point(&self) -> &[i16] {
        &self.fixed_point
    }
}

pub(crate) struct ConvolveTask<'a> {
    shape:        TaskShape,
    input:        &'a [u8],
    output:       SharedBuffer<'a>,
    coefficients: ConvolveCoefficients
}

impl<'a> ConvolveTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize, vector_size: usize,
        coefficients: ConvolveCoefficients, restriction: Option<&Restriction>
    ) -> ConvolveTask<'a> {
        ConvolveTask {
            shape: TaskShape::new(size_x, size_y, vector_size, restriction, false),
            input,
            output: SharedBuffer::new(output),
            coefficients
        }
    }
}

impl Task for ConvolveTask<'_> {
    fn shape(&self) -> &TaskShape {
        &self.shape
    }

    fn shape_mut(&mut self) -> &mut TaskShape {
        &mut self.shape
    }

    fn process(
        &self, _thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
    ) {
        let size_x = self.shape.size_x();
        let size_y = self.shape.size_y();
        let vector_size = self.shape.vector_size();
        let padded = padded_size(vector_size);
        let stride = size_x * padded;
        let radius = self.coefficients.radius();

        let mut rows: [&[u8]; 2 * MAX_RADIUS + 1] = [&[]; 2 * MAX_RADIUS + 1];

        for y in start_y..end_y {
            for (k, row) in rows.iter_mut().take(2 * radius + 1).enumerate() {
                let ry = clamp_index(y as isize + k as isize - radius as isize, size_y);
                *row = &self.input[ry * stride..(ry + 1) * stride];
            }
            // SAFETY: The row segment lies inside this tile
            let out = unsafe {
                self.output
                    .slice_mut((y * size_x + start_x) * padded, (y * size_x + end_x) * padded)
            };
            let row = ConvolveRow {
                rows: &rows[..2 * radius + 1],
                weights: self.coefficients.weights(),
                radius,
                size_x,
                vector_size,
                start_x,
                end_x
            };
            row.run(self.shape.uses_simd(), out);
        }
    }
}

/// One output row and the input rows around it
pub(crate) struct ConvolveRow<'a> {
    /// `2 * radius + 1` input rows, already clamped
    pub(crate) rows:        &'a [&'a [u8]],
    pub(crate) weights:     &'a [f32],
    pub(crate) radius:      usize,
    pub(crate) size_x:      usize,
    pub(crate) vector_size: usize,
    pub(crate) start_x:     usize,
    pub(crate) end_x:       usize
}

impl ConvolveRow<'_> {
    /// Clamped x of the `k`'th horizontal tap around `x`
    #[inline(always)]
    pub(crate) fn tap(&self, x: usize, k: usize) -> usize {
        clamp_index(x as isize + k as isize - self.radius as isize, self.size_x)
    }

    /// Weighted sum around cell `x`, row-major over the kernel
    #[inline(always)]
    pub(crate) fn cell(&self, x: usize) -> Float4 {
        let padded = padded_size(self.vector_size);
        let diameter = 2 * self.radius + 1;
        let mut acc = [0.0_f32; 4];

        for (ky, row) in self.rows.iter().enumerate() {
            for kx in 0..diameter {
                let w = self.weights[ky * diameter + kx];
                let offset = self.tap(x, kx) * padded;
                let v = load_float4(&row[offset..offset + padded], self.vector_size);
                for (a, v) in acc.iter_mut().zip(v) {
                    *a += w * v;
                }
            }
        }
        acc
    }

    /// Convolve cells `from_x..end_x`, `out` starts at `start_x`
    pub(crate) fn run_scalar(&self, from_x: usize, out: &mut [u8]) {
        let padded = padded_size(self.vector_size);
        for x in from_x..self.end_x {
            let pos = (x - self.start_x) * padded;
            store_float4_rounded(&self.cell(x), &mut out[pos..pos + padded], self.vector_size);
        }
    }

    fn run(&self, uses_simd: bool, out: &mut [u8]) {
        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::convolve_row_sse41(self, out) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::convolve_row_neon(self, out) }
        }
        let _ = uses_simd;
        self.run_scalar(self.start_x, out);
    }
}
