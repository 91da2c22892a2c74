/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Gaussian blur
//!
//! The blur is separable, each row is first blurred vertically into a
//! float scratch row owned by the thread, the scratch row is then
//! blurred horizontally into the output.
//!
//! Both passes replicate edge pixels instead of wrapping or padding with
//! zeroes, so blurring an image of a single color gives the same image back.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::sync::{Mutex, PoisonError};

use crate::errors::ToolkitErrors;
use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};
use crate::utils::{clamp_index, round_f32_to_u8};

mod neon;
mod sse41;

/// Largest radius supported
pub const MAX_BLUR_RADIUS: usize = 25;

/// Largest number of taps, `2 * MAX_BLUR_RADIUS + 1`
const MAX_TAPS: usize = 2 * MAX_BLUR_RADIUS + 1;

/// Normalized gaussian weights for a radius
///
/// `weights()[iradius]` is the centre tap.
#[derive(Clone, Debug)]
pub struct GaussianCoefficients {
    radius:      usize,
    weights:     Vec<f32>,
    fixed_point: Vec<u16>
}

impl GaussianCoefficients {
    /// Compute the weights for `radius`
    ///
    /// # Errors
    /// `InvalidParameter` if radius isn't in `1..=25`
    pub fn new(radius: usize) -> Result<GaussianCoefficients, ToolkitErrors> {
        if !(1..=MAX_BLUR_RADIUS).contains(&radius) {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "The radius should be between 1 and {MAX_BLUR_RADIUS}, {radius} provided"
            )));
        }
        // Empirical fit between radius and sigma
        let sigma = 0.4 * radius as f32 + 0.6;

        let coeff1 = 1.0 / ((2.0 * std::f32::consts::PI).sqrt() * sigma);
        let coeff2 = -1.0 / (2.0 * sigma * sigma);

        let iradius = radius as isize;

        let mut weights: Vec<f32> = (-iradius..=iradius)
            .map(|r| {
                let r = r as f32;
                coeff1 * (coeff2 * r * r).exp()
            })
            .collect();

        let sum: f32 = weights.iter().sum();
        let normalize = 1.0 / sum;
        weights.iter_mut().for_each(|w| *w *= normalize);

        let fixed_point = weights
            .iter()
            .map(|w| (w * 65536.0 + 0.5).min(f32::from(u16::MAX)) as u16)
            .collect();

        Ok(GaussianCoefficients {
            radius,
            weights,
            fixed_point
        })
    }

    pub const fn radius(&self) -> usize {
        self.radius
    }

    /// Normalized float weights, `2 * radius + 1` taps summing to one
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// The weights scaled by 65536, for integer kernels
    pub fn fixed_point(&self) -> &[u16] {
        &self.fixed_point
    }
}

pub(crate) struct BlurTask<'a> {
    shape:        TaskShape,
    input:        &'a [u8],
    output:       SharedBuffer<'a>,
    coefficients: GaussianCoefficients,
    /// One vertical pass row per thread
    scratch:      Vec<Mutex<Vec<f32>>>
}

impl<'a> BlurTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize, vector_size: usize,
        coefficients: GaussianCoefficients, restriction: Option<&Restriction>, threads: usize
    ) -> BlurTask<'a> {
        BlurTask {
            shape: TaskShape::new(size_x, size_y, vector_size, restriction, false),
            input,
            output: SharedBuffer::new(output),
            coefficients,
            scratch: (0..threads).map(|_| Mutex::new(Vec::new())).collect()
        }
    }
}

impl Task for BlurTask<'_> {
    fn shape(&self) -> &TaskShape {
        &self.shape
    }

    fn shape_mut(&mut self) -> &mut TaskShape {
        &mut self.shape
    }

    fn process(
        &self, thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
    ) {
        let size_x = self.shape.size_x();
        let size_y = self.shape.size_y();
        let vector_size = self.shape.vector_size();
        let uses_simd = self.shape.uses_simd();
        let stride = size_x * vector_size;

        let weights = self.coefficients.weights();
        let iradius = self.coefficients.radius();

        let mut scratch = self.scratch[thread_index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if scratch.len() < stride {
            scratch.resize(stride, 0.0);
        }
        // columns the horizontal pass will look at
        let read_start = start_x.saturating_sub(iradius) * vector_size;
        let read_end = (end_x + iradius).min(size_x) * vector_size;

        let mut rows: [&[u8]; MAX_TAPS] = [&[]; MAX_TAPS];

        for y in start_y..end_y {
            for (k, row) in rows.iter_mut().take(weights.len()).enumerate() {
                let ry = clamp_index(y as isize + k as isize - iradius as isize, size_y);
                *row = &self.input[ry * stride + read_start..ry * stride + read_end];
            }
            vertical_pass(
                uses_simd,
                &rows[..weights.len()],
                weights,
                &mut scratch[read_start..read_end]
            );

            // SAFETY: The row segment lies inside this tile
            let out = unsafe {
                self.output.slice_mut(
                    (y * size_x + start_x) * vector_size,
                    (y * size_x + end_x) * vector_size
                )
            };
            let pass = HorizontalPass {
                scratch: &scratch,
                weights,
                iradius,
                size_x,
                start_x,
                end_x
            };
            if vector_size == 4 {
                pass.run_u4(uses_simd, out);
            } else {
                pass.run_u1(uses_simd, out);
            }
        }
    }
}

/// Blur `rows` vertically, `out[i] = sum(weights[k] * rows[k][i])`
fn vertical_pass(uses_simd: bool, rows: &[&[u8]], weights: &[f32], out: &mut [f32]) {
    #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
    if uses_simd {
        // SAFETY: uses_simd is only set when sse4.1 is available
        unsafe { return sse41::vertical_pass_sse41(rows, weights, out) }
    }
    #[cfg(all(feature = "neon", target_arch = "aarch64"))]
    if uses_simd {
        // SAFETY: uses_simd is only set when neon is available
        unsafe { return neon::vertical_pass_neon(rows, weights, out) }
    }
    let _ = uses_simd;
    vertical_pass_scalar(rows, weights, out, 0);
}

/// Scalar vertical pass over `out[start..]`
pub(crate) fn vertical_pass_scalar(rows: &[&[u8]], weights: &[f32], out: &mut [f32], start: usize) {
    for (i, value) in out.iter_mut().enumerate().skip(start) {
        let mut acc = 0.0;
        for (row, w) in rows.iter().zip(weights) {
            acc += w * f32::from(row[i]);
        }
        *value = acc;
    }
}

/// Horizontal pass over one row of vertically blurred values
pub(crate) struct HorizontalPass<'a> {
    pub(crate) scratch: &'a [f32],
    pub(crate) weights: &'a [f32],
    pub(crate) iradius: usize,
    pub(crate) size_x:  usize,
    pub(crate) start_x: usize,
    pub(crate) end_x:   usize
}

impl HorizontalPass<'_> {
    /// Tap `k` of the kernel centred on `x`, clamped to the row
    #[inline(always)]
    pub(crate) fn tap(&self, x: usize, k: usize) -> usize {
        clamp_index(x as isize + k as isize - self.iradius as isize, self.size_x)
    }

    /// Blurred value of the single channel cell `x`
    #[inline(always)]
    pub(crate) fn cell_u1(&self, x: usize) -> f32 {
        let mut acc = 0.0;
        for (k, w) in self.weights.iter().enumerate() {
            acc += w * self.scratch[self.tap(x, k)];
        }
        acc
    }

    fn run_u1(&self, uses_simd: bool, out: &mut [u8]) {
        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::horizontal_pass_u1_sse41(self, out) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::horizontal_pass_u1_neon(self, out) }
        }
        let _ = uses_simd;
        for (x, pix) in (self.start_x..self.end_x).zip(out.iter_mut()) {
            *pix = round_f32_to_u8(self.cell_u1(x));
        }
    }

    fn run_u4(&self, uses_simd: bool, out: &mut [u8]) {
        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::horizontal_pass_u4_sse41(self, out) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::horizontal_pass_u4_neon(self, out) }
        }
        let _ = uses_simd;
        for (x, pix) in (self.start_x..self.end_x).zip(out.chunks_exact_mut(4)) {
            let mut acc = [0.0_f32; 4];
            for (k, w) in self.weights.iter().enumerate() {
                let tap = self.tap(x, k) * 4;
                for (a, v) in acc.iter_mut().zip(&self.scratch[tap..tap + 4]) {
                    *a += w * v;
                }
            }
            for (p, a) in pix.iter_mut().zip(acc) {
                *p = round_f32_to_u8(a);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nanorand::Rng;
    use zune_core::options::ToolkitOptions;

    use crate::blur::{BlurTask, GaussianCoefficients};
    use crate::restriction::Restriction;
    use crate::scheduler::TaskProcessor;

    fn run_blur(
        options: &ToolkitOptions, input: &[u8], size_x: usize, size_y: usize, vector_size: usize,
        radius: usize, restriction: Option<&Restriction>
    ) -> Vec<u8> {
        let processor = TaskProcessor::new(options);
        let mut output = vec![0; input.len()];
        let mut task = BlurTask::new(
            input,
            &mut output,
            size_x,
            size_y,
            vector_size,
            GaussianCoefficients::new(radius).unwrap(),
            restriction,
            processor.thread_count()
        );
        processor.do_task(&mut task);
        output
    }

    #[test]
    fn weights_sum_to_one() {
        for radius in 1..=25 {
            let c = GaussianCoefficients::new(radius).unwrap();
            assert_eq!(c.weights().len(), 2 * radius + 1);
            let sum: f32 = c.weights().iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "radius {radius} sums to {sum}");
            // symmetric and peaked at the centre
            assert_eq!(c.weights()[0], c.weights()[2 * radius]);
            assert!(c.weights()[radius] > c.weights()[0]);
            let fixed_sum: u32 = c.fixed_point().iter().map(|x| u32::from(*x)).sum();
            assert!(fixed_sum.abs_diff(65536) <= c.fixed_point().len() as u32);
        }
    }

    #[test]
    fn rejects_bad_radius() {
        assert!(GaussianCoefficients::new(0).is_err());
        assert!(GaussianCoefficients::new(26).is_err());
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let input: Vec<u8> = [10, 20, 30, 255].repeat(4 * 4);
        let output = run_blur(&ToolkitOptions::default(), &input, 4, 4, 4, 5, None);
        assert_eq!(input, output);

        let input = vec![77_u8; 3000 * 3];
        for radius in [1, 7, 25] {
            let output = run_blur(&ToolkitOptions::default(), &input, 3000, 3, 1, radius, None);
            assert_eq!(input, output);
        }
    }

    #[test]
    fn simd_matches_scalar() {
        let mut rng = nanorand::WyRand::new_seed(7);
        for (size_x, size_y, vector_size) in [(61, 23, 1), (61, 23, 4), (2100, 5, 4), (5, 40, 1)] {
            let mut input = vec![0_u8; size_x * size_y * vector_size];
            rng.fill(&mut input);
            for radius in [1, 3, 25] {
                let fast = run_blur(
                    &ToolkitOptions::new_fast(),
                    &input,
                    size_x,
                    size_y,
                    vector_size,
                    radius,
                    None
                );
                let scalar = run_blur(
                    &ToolkitOptions::new_scalar(),
                    &input,
                    size_x,
                    size_y,
                    vector_size,
                    radius,
                    None
                );
                assert_eq!(fast, scalar, "{size_x}x{size_y}x{vector_size} radius {radius}");
            }
        }
    }

    #[test]
    fn impulse_spreads_symmetrically() {
        let mut input = vec![0_u8; 21 * 21];
        input[10 * 21 + 10] = 255;
        let output = run_blur(&ToolkitOptions::new_scalar(), &input, 21, 21, 1, 3, None);

        assert!(output[10 * 21 + 10] > 0);
        assert_eq!(output[10 * 21 + 9], output[10 * 21 + 11]);
        assert_eq!(output[9 * 21 + 10], output[11 * 21 + 10]);
        assert_eq!(output[0], 0);
    }

    #[test]
    fn restriction_leaves_outside_untouched() {
        let mut rng = nanorand::WyRand::new_seed(3);
        let mut input = vec![0_u8; 40 * 30 * 4];
        rng.fill(&mut input);
        let r = Restriction::new(5, 17, 3, 29);
        let output = run_blur(&ToolkitOptions::default(), &input, 40, 30, 4, 4, Some(&r));
        let full = run_blur(&ToolkitOptions::default(), &input, 40, 30, 4, 4, None);

        for y in 0..30 {
            for x in 0..40 {
                let i = (y * 40 + x) * 4;
                if (5..17).contains(&x) && (3..29).contains(&y) {
                    assert_eq!(output[i..i + 4], full[i..i + 4]);
                } else {
                    assert_eq!(output[i..i + 4], [0, 0, 0, 0]);
                }
            }
        }
    }
}
