/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Bicubic resizing
//!
//! Uses the Catmull-Rom spline over four taps per axis, first along x on
//! four input rows and then along y on the four results. Taps outside the
//! input are clamped to its edges. The task runs over the output grid, a
//! restriction selects output cells.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};
use crate::utils::{clamp_index, load_float4, padded_size, store_float4_rounded, Float4};

mod neon;
mod sse41;

/// Catmull-Rom interpolation between `p1` and `p2`, `x` in `[0, 1)`
///
/// The simd kernels evaluate the same expression tree, keep them in sync.
#[inline(always)]
pub(crate) fn cubic(p0: f32, p1: f32, p2: f32, p3: f32, x: f32) -> f32 {
    let a = 3.0 * (p1 - p2) + p3 - p0;
    let b = 2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3;
    let c = p2 - p0;
    p1 + 0.5 * x * (c + x * (b + x * a))
}

#[inline(always)]
fn cubic4(p: [Float4; 4], x: f32) -> Float4 {
    [0, 1, 2, 3].map(|c| cubic(p[0][c], p[1][c], p[2][c], p[3][c], x))
}

/// Input taps and fraction for output coordinate `o`
#[inline(always)]
pub(crate) fn taps(o: usize, scale: f32, size: usize) -> ([usize; 4], f32) {
    let position = (o as f32 + 0.5) * scale - 0.5;
    let floor = position.floor();
    let start = floor as isize - 1;
    (
        [0, 1, 2, 3].map(|k| clamp_index(start + k, size)),
        position - floor
    )
}

pub(crate) struct ResizeTask<'a> {
    shape:    TaskShape,
    input:    &'a [u8],
    input_x:  usize,
    input_y:  usize,
    output:   SharedBuffer<'a>,
    scale_x:  f32,
    scale_y:  f32
}

impl<'a> ResizeTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], input_x: usize, input_y: usize, vector_size: usize,
        output: &'a mut [u8], output_x: usize, output_y: usize,
        restriction: Option<&Restriction>
    ) -> ResizeTask<'a> {
        ResizeTask {
            shape: TaskShape::new(output_x, output_y, vector_size, restriction, false),
            input,
            input_x,
            input_y,
            output: SharedBuffer::new(output),
            scale_x: input_x as f32 / output_x as f32,
            scale_y: input_y as f32 / output_y as f32
        }
    }
}

impl Task for ResizeTask<'_> {
    fn shape(&self) -> &TaskShape {
        &self.shape
    }

    fn shape_mut(&mut self) -> &mut TaskShape {
        &mut self.shape
    }

    fn process(
        &self, _thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
    ) {
        let output_x = self.shape.size_x();
        let vector_size = self.shape.vector_size();
        let padded = padded_size(vector_size);
        let stride = self.input_x * padded;

        for y in start_y..end_y {
            let (ys, y_frac) = taps(y, self.scale_y, self.input_y);
            let rows = ys.map(|ry| &self.input[ry * stride..(ry + 1) * stride]);

            // SAFETY: The row segment lies inside this tile
            let out = unsafe {
                self.output
                    .slice_mut((y * output_x + start_x) * padded, (y * output_x + end_x) * padded)
            };
            let row = ResizeRow {
                rows,
                y_frac,
                input_x: self.input_x,
                scale_x: self.scale_x,
                vector_size,
                start_x,
                end_x
            };
            row.run(self.shape.uses_simd(), out);
        }
    }
}

/// One output row and the four input rows it is interpolated from
pub(crate) struct ResizeRow<'a> {
    pub(crate) rows:        [&'a [u8]; 4],
    pub(crate) y_frac:      f32,
    pub(crate) input_x:     usize,
    pub(crate) scale_x:     f32,
    pub(crate) vector_size: usize,
    pub(crate) start_x:     usize,
    pub(crate) end_x:       usize
}

impl ResizeRow<'_> {
    fn cell(&self, x: usize) -> Float4 {
        let padded = padded_size(self.vector_size);
        let (xs, x_frac) = taps(x, self.scale_x, self.input_x);

        let along_x = self.rows.map(|row| {
            let p = xs.map(|tx| load_float4(&row[tx * padded..(tx + 1) * padded], self.vector_size));
            cubic4(p, x_frac)
        });
        cubic4(along_x, self.y_frac)
    }

    pub(crate) fn run_scalar(&self, out: &mut [u8]) {
        let padded = padded_size(self.vector_size);
        for (x, cell) in (self.start_x..self.end_x).zip(out.chunks_exact_mut(padded)) {
            store_float4_rounded(&self.cell(x), cell, self.vector_size);
        }
    }

    fn run(&self, uses_simd: bool, out: &mut [u8]) {
        // lanes are channels, narrow cells stay scalar
        let wide = self.vector_size >= 3;

        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd && wide {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::resize_row_sse41(self, out) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd && wide {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::resize_row_neon(self, out) }
        }
        let _ = (uses_simd, wide);
        self.run_scalar(out);
    }
}
