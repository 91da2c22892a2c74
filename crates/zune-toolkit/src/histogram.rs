/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per channel and luminance histograms
//!
//! Every thread counts into its own partial histogram, the partials are
//! summed once all tiles are done.
//!
//! Channel histograms are value major, the count of value `v` in channel
//! `c` lives at `out[v * vector_size + c]`.
#![allow(clippy::cast_possible_truncation)]

use std::sync::{Mutex, PoisonError};

use crate::errors::ToolkitErrors;
use crate::restriction::Restriction;
use crate::task::{Task, TaskShape};
use crate::utils::padded_size;

/// Entries in a partial channel histogram, indexed by `(value << 2) + channel`
const PARTIAL_SLOTS: usize = 256 * 4;

/// Luminance weights used when none are given
pub const DEFAULT_DOT_COEFFICIENTS: [f32; 4] = [0.299, 0.587, 0.114, 0.0];

/// Slack allowed on the coefficient sum for float rounding
const DOT_SUM_TOLERANCE: f32 = 1e-5;

fn new_partials(threads: usize, slots: usize) -> Vec<Mutex<Vec<u32>>> {
    (0..threads).map(|_| Mutex::new(vec![0; slots])).collect()
}

/// Sum the per thread partials
fn sum_partials(partials: Vec<Mutex<Vec<u32>>>, slots: usize) -> Vec<u32> {
    let mut total = vec![0_u32; slots];
    for partial in partials {
        let partial = partial.into_inner().unwrap_or_else(PoisonError::into_inner);
        for (t, p) in total.iter_mut().zip(partial) {
            *t += p;
        }
    }
    total
}

pub(crate) struct HistogramTask<'a> {
    shape:    TaskShape,
    input:    &'a [u8],
    partials: Vec<Mutex<Vec<u32>>>
}

impl<'a> HistogramTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], size_x: usize, size_y: usize, vector_size: usize,
        restriction: Option<&Restriction>, threads: usize
    ) -> HistogramTask<'a> {
        HistogramTask {
            shape: TaskShape::new(size_x, size_y, vector_size, restriction, true),
            input,
            partials: new_partials(threads, PARTIAL_SLOTS)
        }
    }

    /// Merge the partials into `out`, which holds `256 * vector_size` entries
    pub(crate) fn collate(self, out: &mut [u32]) {
        let vector_size = self.shape.vector_size();
        let total = sum_partials(self.partials, PARTIAL_SLOTS);

        for (value, slot) in total.chunks_exact(4).enumerate() {
            if vector_size == 1 {
                // one byte cells are spread over the four slots
                out[value] = slot.iter().sum();
            } else {
                out[value * vector_size..(value + 1) * vector_size]
                    .copy_from_slice(&slot[..vector_size]);
            }
        }
    }
}

/// Count the channels of `cells` into `partial`
fn tally(cells: &[u8], vector_size: usize, partial: &mut [u32]) {
    if vector_size == 1 {
        // neighbouring bytes go to different counters so repeated
        // values do not serialize on one of them
        let mut chunks = cells.chunks_exact(4);
        for chunk in &mut chunks {
            partial[usize::from(chunk[0]) << 2] += 1;
            partial[(usize::from(chunk[1]) << 2) + 1] += 1;
            partial[(usize::from(chunk[2]) << 2) + 2] += 1;
            partial[(usize::from(chunk[3]) << 2) + 3] += 1;
        }
        for value in chunks.remainder() {
            partial[usize::from(*value) << 2] += 1;
        }
        return;
    }
    for cell in cells.chunks_exact(padded_size(vector_size)) {
        for (channel, value) in cell.iter().take(vector_size).enumerate() {
            partial[(usize::from(*value) << 2) + channel] += 1;
        }
    }
}

impl Task for HistogramTask<'_> {
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
        let vector_size = self.shape.vector_size();
        let padded = padded_size(vector_size);

        let mut partial = self.partials[thread_index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        for y in start_y..end_y {
            let cells = &self.input[(y * size_x + start_x) * padded..(y * size_x + end_x) * padded];
            tally(cells, vector_size, &mut partial);
        }
    }
}

/// Convert luminance weights to the fixed point form the kernel uses
///
/// # Errors
/// `InvalidParameter` when a weight is negative or not finite, or the
/// weights sum to more than one
pub(crate) fn dot_coefficients(coefficients: &[f32; 4]) -> Result<[i32; 4], ToolkitErrors> {
    if let Some(bad) = coefficients.iter().find(|c| !c.is_finite() || **c < 0.0) {
        return Err(ToolkitErrors::InvalidParameter(format!(
            "Histogram dot coefficient {bad} should be a non-negative number"
        )));
    }
    let sum: f32 = coefficients.iter().sum();
    if sum > 1.0 + DOT_SUM_TOLERANCE {
        return Err(ToolkitErrors::InvalidParameter(format!(
            "Histogram dot coefficients sum to {sum}, more than 1.0"
        )));
    }
    Ok(coefficients.map(|c| (c * 256.0 + 0.5) as i32))
}

pub(crate) struct HistogramDotTask<'a> {
    shape:    TaskShape,
    input:    &'a [u8],
    dot:      [i32; 4],
    partials: Vec<Mutex<Vec<u32>>>
}

impl<'a> HistogramDotTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], size_x: usize, size_y: usize, vector_size: usize, dot: [i32; 4],
        restriction: Option<&Restriction>, threads: usize
    ) -> HistogramDotTask<'a> {
        HistogramDotTask {
            shape: TaskShape::new(size_x, size_y, vector_size, restriction, true),
            input,
            dot,
            partials: new_partials(threads, 256)
        }
    }

    /// Merge the partials into the 256 entries of `out`
    pub(crate) fn collate(self, out: &mut [u32]) {
        out[..256].copy_from_slice(&sum_partials(self.partials, 256));
    }
}

/// Luminance bucket of one cell
#[inline(always)]
fn dot_bucket(cell: &[u8], dot: &[i32; 4]) -> usize {
    let mut sum = 0_i32;
    for (value, weight) in cell.iter().zip(dot) {
        sum += i32::from(*value) * weight;
    }
    (((sum + 0x7f) >> 8) as usize).min(255)
}

impl Task for HistogramDotTask<'_> {
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
        let vector_size = self.shape.vector_size();
        let padded = padded_size(vector_size);

        let mut partial = self.partials[thread_index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        for y in start_y..end_y {
            let cells = &self.input[(y * size_x + start_x) * padded..(y * size_x + end_x) * padded];
            for cell in cells.chunks_exact(padded) {
                partial[dot_bucket(&cell[..vector_size], &self.dot)] += 1;
            }
        }
    }
}
