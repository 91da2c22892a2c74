/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Pixel and vector helpers shared by the kernels
//!
//! A cell holds one to four channel bytes. Cells of three channels
//! are stored padded to four bytes, the fourth byte is never read as a
//! channel.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::errors::ToolkitErrors;

/// Four float lanes, one per channel of a cell
pub(crate) type Float4 = [f32; 4];

/// Number of bytes a cell of `vector_size` channels occupies in a buffer
#[inline(always)]
#[must_use]
pub const fn padded_size(vector_size: usize) -> usize {
    if vector_size == 3 {
        4
    } else {
        vector_size
    }
}

/// Divide `a` by `b` rounding up, `b` must not be zero
#[inline(always)]
#[must_use]
pub const fn div_round_up(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Round `value` up to the next multiple of `multiple`
#[inline(always)]
#[must_use]
pub const fn round_up(value: usize, multiple: usize) -> usize {
    div_round_up(value, multiple) * multiple
}

/// Clamp a possibly out of range neighbour index into `[0, len - 1]`
#[inline(always)]
pub(crate) fn clamp_index(position: isize, len: usize) -> usize {
    position.clamp(0, len as isize - 1) as usize
}

/// Limit values to 0 and 255
#[inline(always)]
pub(crate) fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Round a float channel to a byte, `+0.5` then clamp then truncate
///
/// The simd kernels reproduce this exact sequence, keep them in sync.
#[inline(always)]
pub(crate) fn round_f32_to_u8(value: f32) -> u8 {
    (value + 0.5).clamp(0.0, 255.0) as u8
}

/// Widen the `vector_size` channels of `cell` into float lanes,
/// missing lanes read as zero
#[inline(always)]
pub(crate) fn load_float4(cell: &[u8], vector_size: usize) -> Float4 {
    let mut out = [0.0; 4];
    for (lane, byte) in out.iter_mut().zip(cell.iter().take(vector_size)) {
        *lane = f32::from(*byte);
    }
    out
}

/// Round the lanes of `value` and write the first `vector_size` to `cell`
#[inline(always)]
pub(crate) fn store_float4_rounded(value: &Float4, cell: &mut [u8], vector_size: usize) {
    for (byte, lane) in cell.iter_mut().zip(value.iter()).take(vector_size) {
        *byte = round_f32_to_u8(*lane);
    }
}

/// Number of bytes a buffer of `size_x * size_y` cells needs, `None` on overflow
pub(crate) fn buffer_size(size_x: usize, size_y: usize, vector_size: usize) -> Option<usize> {
    size_x
        .checked_mul(size_y)?
        .checked_mul(padded_size(vector_size))
}

/// Confirm `found` bytes are enough for `size_x * size_y` cells
///
/// Dimensions whose byte count does not fit a `usize` are an `InvalidDimension`.
pub(crate) fn check_buffer(
    name: &'static str, found: usize, size_x: usize, size_y: usize, vector_size: usize
) -> Result<(), ToolkitErrors> {
    let expected = buffer_size(size_x, size_y, vector_size)
        .ok_or(ToolkitErrors::InvalidDimension("size_x", size_x))?;
    if found < expected {
        return Err(ToolkitErrors::BufferTooSmall(name, expected, found));
    }
    Ok(())
}

/// Confirm both dimensions are non-zero
pub(crate) fn check_dimensions(size_x: usize, size_y: usize) -> Result<(), ToolkitErrors> {
    if size_x == 0 {
        return Err(ToolkitErrors::InvalidDimension("size_x", size_x));
    }
    if size_y == 0 {
        return Err(ToolkitErrors::InvalidDimension("size_y", size_y));
    }
    Ok(())
}

/// Confirm a vector size lies in `1..=4`
pub(crate) fn check_vector_size(
    operation: &'static str, vector_size: usize
) -> Result<(), ToolkitErrors> {
    if !(1..=4).contains(&vector_size) {
        return Err(ToolkitErrors::InvalidVectorSize(operation, vector_size));
    }
    Ok(())
}
