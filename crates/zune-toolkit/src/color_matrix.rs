/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Affine per pixel color transforms
//!
//! Each cell is read as a vector of four floats, missing channels being
//! zero, and transformed as
//!
//! ```text
//! out[i] = sum(matrix[i * 4 + j] * in[j]) + add[i] * 255
//! ```
//!
//! Results are clamped to `[0, 255]` and truncated.
//!
//! Common matrix shapes get a specialized path, picked from a fingerprint
//! of the matrix and remembered between calls. Every path evaluates the
//! same float expressions in the same order, the choice never changes
//! the output.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::sync::{Mutex, PoisonError};

use zune_core::log::trace;

use crate::errors::ToolkitErrors;
use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};
use crate::utils::{load_float4, padded_size, Float4};

mod neon;
mod sse41;

/// Rows of the alpha channel that pass it through untouched
const ALPHA_ROW: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// A 4x4 matrix and an add vector to transform cells with
///
/// The matrix is row-major, row `i` produces output channel `i`.
/// The add vector is in normalized units, `1.0` adds 255.
#[derive(Debug)]
pub struct ColorMatrix {
    matrix:  [f32; 16],
    add:     [f32; 4],
    /// Last fingerprint seen and the path it selected
    program: Mutex<Option<(ProgramKey, MatrixPath)>>
}

/// Structural fingerprint of a matrix for a pair of vector sizes
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct ProgramKey {
    /// bit `i` set when `matrix[i] != 0`
    coefficient_mask:   u16,
    /// bit `i` set when `add[i] != 0`
    add_mask:           u8,
    input_vector_size:  u8,
    output_vector_size: u8,
    /// rows 0 to 2 are equal and nothing is added to them
    dot:                bool,
    /// row 3 forwards the input alpha untouched
    copy_alpha:         bool
}

/// Specialized ways of evaluating a matrix
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum MatrixPath {
    General,
    /// One dot product shared by the three color channels
    Dot,
    /// Alpha is copied from the input
    CopyAlpha,
    DotCopyAlpha
}

impl MatrixPath {
    const fn shares_dot(self) -> bool {
        matches!(self, MatrixPath::Dot | MatrixPath::DotCopyAlpha)
    }

    const fn copies_alpha(self) -> bool {
        matches!(self, MatrixPath::CopyAlpha | MatrixPath::DotCopyAlpha)
    }
}

impl ProgramKey {
    fn new(
        matrix: &[f32; 16], add: &[f32; 4], input_vector_size: usize, output_vector_size: usize
    ) -> ProgramKey {
        let mut coefficient_mask = 0_u16;
        for (i, c) in matrix.iter().enumerate() {
            if *c != 0.0 {
                coefficient_mask |= 1 << i;
            }
        }
        let mut add_mask = 0_u8;
        for (i, c) in add.iter().enumerate() {
            if *c != 0.0 {
                add_mask |= 1 << i;
            }
        }
        let dot = matrix[0..4] == matrix[4..8]
            && matrix[0..4] == matrix[8..12]
            && add_mask & 0b0111 == 0;
        let copy_alpha = input_vector_size == 4 && matrix[12..16] == ALPHA_ROW && add[3] == 0.0;

        ProgramKey {
            coefficient_mask,
            add_mask,
            input_vector_size: input_vector_size as u8,
            output_vector_size: output_vector_size as u8,
            dot,
            copy_alpha
        }
    }

    const fn path(&self) -> MatrixPath {
        match (self.dot, self.copy_alpha) {
            (true, true) => MatrixPath::DotCopyAlpha,
            (true, false) => MatrixPath::Dot,
            (false, true) => MatrixPath::CopyAlpha,
            (false, false) => MatrixPath::General
        }
    }
}

impl ColorMatrix {
    /// Create a transform from a row-major matrix and an add vector
    ///
    /// # Errors
    /// `InvalidParameter` if a coefficient is NaN or infinite
    pub fn new(matrix: [f32; 16], add: [f32; 4]) -> Result<ColorMatrix, ToolkitErrors> {
        if matrix.iter().chain(add.iter()).any(|c| !c.is_finite()) {
            return Err(ToolkitErrors::InvalidParameter(
                "Color matrix coefficients must be finite".to_string()
            ));
        }
        Ok(ColorMatrix::from_parts(matrix, add))
    }

    const fn from_parts(matrix: [f32; 16], add: [f32; 4]) -> ColorMatrix {
        ColorMatrix {
            matrix,
            add,
            program: Mutex::new(None)
        }
    }

    /// Leaves every channel as is
    #[must_use]
    pub const fn identity() -> ColorMatrix {
        ColorMatrix::from_parts(
            [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0
            ],
            [0.0; 4]
        )
    }

    /// Luminosity in all three color channels, alpha is kept
    #[must_use]
    pub const fn greyscale() -> ColorMatrix {
        ColorMatrix::from_parts(
            [
                0.299, 0.587, 0.114, 0.0, //
                0.299, 0.587, 0.114, 0.0, //
                0.299, 0.587, 0.114, 0.0, //
                0.0, 0.0, 0.0, 1.0
            ],
            [0.0; 4]
        )
    }

    /// RGB to BT.601 YUV, chroma is offset by half the byte range
    #[must_use]
    pub const fn rgb_to_yuv() -> ColorMatrix {
        ColorMatrix::from_parts(
            [
                0.299, 0.587, 0.114, 0.0, //
                -0.14713, -0.28886, 0.436, 0.0, //
                0.615, -0.51499, -0.10001, 0.0, //
                0.0, 0.0, 0.0, 1.0
            ],
            [0.0, 0.5, 0.5, 0.0]
        )
    }

    /// Inverse of [`rgb_to_yuv`](ColorMatrix::rgb_to_yuv)
    #[must_use]
    pub const fn yuv_to_rgb() -> ColorMatrix {
        ColorMatrix::from_parts(
            [
                1.0, 0.0, 1.13983, 0.0, //
                1.0, -0.39465, -0.5806, 0.0, //
                1.0, 2.03211, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0
            ],
            // the -0.5 chroma offset multiplied through the matrix
            [-0.569915, 0.487625, -1.016055, 0.0]
        )
    }

    pub const fn matrix(&self) -> &[f32; 16] {
        &self.matrix
    }

    pub const fn add(&self) -> &[f32; 4] {
        &self.add
    }

    /// Path for the given vector sizes, reusing the last one when the
    /// fingerprint did not change
    pub(crate) fn program(&self, input_vector_size: usize, output_vector_size: usize) -> MatrixPath {
        let key = ProgramKey::new(&self.matrix, &self.add, input_vector_size, output_vector_size);

        let mut cached = self.program.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((last_key, path)) = *cached {
            if last_key == key {
                return path;
            }
        }
        let path = key.path();
        trace!("Color matrix program {key:?} uses the {path:?} path");
        *cached = Some((key, path));
        path
    }

    /// Everything a task needs to evaluate this matrix
    pub(crate) fn kernel(&self, input_vector_size: usize, output_vector_size: usize) -> MatrixKernel {
        let mut columns = [[0.0; 4]; 4];
        for (j, column) in columns.iter_mut().enumerate() {
            for (i, c) in column.iter_mut().enumerate() {
                *c = self.matrix[i * 4 + j];
            }
        }
        MatrixKernel {
            matrix: self.matrix,
            columns,
            add: self.add.map(|a| a * 255.0),
            input_vector_size,
            output_vector_size,
            path: self.program(input_vector_size, output_vector_size)
        }
    }
}

impl Clone for ColorMatrix {
    fn clone(&self) -> Self {
        ColorMatrix::from_parts(self.matrix, self.add)
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        ColorMatrix::identity()
    }
}

/// A matrix ready to be applied to rows of cells
#[derive(Copy, Clone, Debug)]
pub(crate) struct MatrixKernel {
    pub(crate) matrix:             [f32; 16],
    /// `columns[j][i] == matrix[i * 4 + j]`
    pub(crate) columns:            [[f32; 4]; 4],
    /// add vector scaled to byte units
    pub(crate) add:                Float4,
    pub(crate) input_vector_size:  usize,
    pub(crate) output_vector_size: usize,
    pub(crate) path:               MatrixPath
}

/// Clamp to `[0, 255]` then truncate
#[inline(always)]
pub(crate) fn clamp_truncate(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

impl MatrixKernel {
    /// Output channel `i` for input `v`
    #[inline(always)]
    fn row(&self, i: usize, v: &Float4) -> f32 {
        let mut acc = 0.0_f32;
        for (m, x) in self.matrix[i * 4..i * 4 + 4].iter().zip(v) {
            acc += m * x;
        }
        acc + self.add[i]
    }

    #[inline(always)]
    fn cell(&self, v: &Float4) -> Float4 {
        if self.path.shares_dot() {
            let dot = self.row(0, v);
            [dot, dot, dot, self.row(3, v)]
        } else {
            [0, 1, 2, 3].map(|i| self.row(i, v))
        }
    }

    pub(crate) fn run_scalar(&self, input: &[u8], output: &mut [u8]) {
        let in_padded = padded_size(self.input_vector_size);
        let out_padded = padded_size(self.output_vector_size);

        for (i, o) in input
            .chunks_exact(in_padded)
            .zip(output.chunks_exact_mut(out_padded))
        {
            let v = load_float4(i, self.input_vector_size);
            let result = self.cell(&v);
            for (byte, value) in o.iter_mut().zip(result).take(self.output_vector_size) {
                *byte = clamp_truncate(value);
            }
            if self.path.copies_alpha() && self.output_vector_size == 4 {
                o[3] = i[3];
            }
        }
    }

    pub(crate) fn run(&self, uses_simd: bool, input: &[u8], output: &mut [u8]) {
        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::color_matrix_sse41(self, input, output) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::color_matrix_neon(self, input, output) }
        }
        let _ = uses_simd;
        self.run_scalar(input, output);
    }
}

pub(crate) struct ColorMatrixTask<'a> {
    shape:  TaskShape,
    input:  &'a [u8],
    output: SharedBuffer<'a>,
    kernel: MatrixKernel
}

impl<'a> ColorMatrixTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize, kernel: MatrixKernel,
        restriction: Option<&Restriction>
    ) -> ColorMatrixTask<'a> {
        ColorMatrixTask {
            shape: TaskShape::new(size_x, size_y, kernel.output_vector_size, restriction, true),
            input,
            output: SharedBuffer::new(output),
            kernel
        }
    }
}

impl Task for ColorMatrixTask<'_> {
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
        let in_padded = padded_size(self.kernel.input_vector_size);
        let out_padded = padded_size(self.kernel.output_vector_size);

        for y in start_y..end_y {
            let (start, end) = (y * size_x + start_x, y * size_x + end_x);
            let input = &self.input[start * in_padded..end * in_padded];
            // SAFETY: The row segment lies inside this tile
            let output = unsafe { self.output.slice_mut(start * out_padded, end * out_padded) };
            self.kernel.run(self.shape.uses_simd(), input, output);
        }
    }
}
