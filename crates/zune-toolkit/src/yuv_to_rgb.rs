/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Convert NV21 and YV12 images to RGBA
//!
//! Chroma is subsampled by two in both directions, one U,V pair covers a
//! 2x2 block of luma samples. Conversion uses the BT.601 integer
//! coefficients and produces opaque pixels.
use crate::errors::ToolkitErrors;
use crate::task::{SharedBuffer, Task, TaskShape};
use crate::utils::{clamp_u8, div_round_up, round_up};

mod neon;
mod sse41;

/// Layout of a YUV 4:2:0 buffer
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum YuvFormat {
    /// Y plane followed by interleaved V,U samples
    Nv21,
    /// Y plane followed by a U plane and a V plane, all rows 16 byte aligned
    Yv12
}

/// Where the planes of a YUV buffer start and how they are strided
///
/// Both formats carry `ceil(size_y / 2)` chroma rows, so an odd height has
/// a chroma row for its last luma row. For YV12 this moves the V plane,
/// which starts after that many U rows rather than `size_y / 2` of them,
/// and a buffer laid out with `size_y / 2` chroma rows is read with its V
/// plane shifted by one chroma row. Even heights are identical either way.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct YuvLayout {
    pub(crate) y_stride:      usize,
    pub(crate) u_offset:      usize,
    pub(crate) v_offset:      usize,
    pub(crate) chroma_stride: usize,
    /// distance between two samples of the same chroma plane
    pub(crate) chroma_step:   usize,
    pub(crate) chroma_width:  usize,
    pub(crate) chroma_rows:   usize,
    /// bytes the whole buffer occupies
    pub(crate) size:          usize
}

impl YuvLayout {
    /// Layout of a `size_x` by `size_y` image
    ///
    /// # Errors
    /// `InvalidDimension` when `size_x` is odd
    pub(crate) fn new(
        format: YuvFormat, size_x: usize, size_y: usize
    ) -> Result<YuvLayout, ToolkitErrors> {
        if size_x % 2 != 0 {
            return Err(ToolkitErrors::InvalidDimension("size_x", size_x));
        }
        let chroma_rows = div_round_up(size_y, 2);
        let chroma_width = size_x / 2;

        let layout = match format {
            YuvFormat::Nv21 => {
                let plane = size_x * size_y;
                YuvLayout {
                    y_stride: size_x,
                    u_offset: plane + 1,
                    v_offset: plane,
                    chroma_stride: size_x,
                    chroma_step: 2,
                    chroma_width,
                    chroma_rows,
                    size: plane + size_x * chroma_rows
                }
            }
            YuvFormat::Yv12 => {
                let y_stride = round_up(size_x, 16);
                let chroma_stride = round_up(y_stride / 2, 16);
                let u_offset = y_stride * size_y;
                let v_offset = u_offset + chroma_stride * chroma_rows;
                YuvLayout {
                    y_stride,
                    u_offset,
                    v_offset,
                    chroma_stride,
                    chroma_step: 1,
                    chroma_width,
                    chroma_rows,
                    size: v_offset + chroma_stride * chroma_rows
                }
            }
        };
        Ok(layout)
    }
}

/// BT.601 conversion of one sample triple
#[inline(always)]
pub(crate) fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let y = i32::from(y) - 16;
    let u = i32::from(u) - 128;
    let v = i32::from(v) - 128;

    [
        clamp_u8((298 * y + 409 * v + 128) >> 8),
        clamp_u8((298 * y - 100 * u - 208 * v + 128) >> 8),
        clamp_u8((298 * y + 516 * u + 128) >> 8),
        255
    ]
}

/// Luma row and the chroma samples it shares
pub(crate) struct YuvRow<'a> {
    pub(crate) y:       &'a [u8],
    /// chroma row starting at its first U sample
    pub(crate) u:       &'a [u8],
    /// chroma row starting at its first V sample
    pub(crate) v:       &'a [u8],
    pub(crate) step:    usize,
    pub(crate) width:   usize,
    pub(crate) start_x: usize,
    pub(crate) end_x:   usize
}

impl YuvRow<'_> {
    /// Offset of the chroma sample covering luma column `x`
    #[inline(always)]
    pub(crate) fn chroma(&self, x: usize) -> usize {
        (x / 2).min(self.width - 1) * self.step
    }

    pub(crate) fn run_scalar(&self, from_x: usize, out: &mut [u8]) {
        for x in from_x..self.end_x {
            let c = self.chroma(x);
            let pos = (x - self.start_x) * 4;
            out[pos..pos + 4].copy_from_slice(&yuv_to_rgba(self.y[x], self.u[c], self.v[c]));
        }
    }

    fn run(&self, uses_simd: bool, out: &mut [u8]) {
        #[cfg(all(feature = "x86", any(target_arch = "x86", target_arch = "x86_64")))]
        if uses_simd {
            // SAFETY: uses_simd is only set when sse4.1 is available
            unsafe { return sse41::yuv_row_sse41(self, out) }
        }
        #[cfg(all(feature = "neon", target_arch = "aarch64"))]
        if uses_simd {
            // SAFETY: uses_simd is only set when neon is available
            unsafe { return neon::yuv_row_neon(self, out) }
        }
        let _ = uses_simd;
        self.run_scalar(self.start_x, out);
    }
}

pub(crate) struct YuvToRgbTask<'a> {
    shape:  TaskShape,
    input:  &'a [u8],
    layout: YuvLayout,
    output: SharedBuffer<'a>
}

impl<'a> YuvToRgbTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize, layout: YuvLayout
    ) -> YuvToRgbTask<'a> {
        YuvToRgbTask {
            shape: TaskShape::new(size_x, size_y, 4, None, false),
            input,
            layout,
            output: SharedBuffer::new(output)
        }
    }
}

impl Task for YuvToRgbTask<'_> {
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
        let layout = &self.layout;
        let chroma_len = (layout.chroma_width - 1) * layout.chroma_step + 1;

        for y in start_y..end_y {
            let cy = (y / 2).min(layout.chroma_rows - 1);
            let u_start = layout.u_offset + cy * layout.chroma_stride;
            let v_start = layout.v_offset + cy * layout.chroma_stride;

            let row = YuvRow {
                y:       &self.input[y * layout.y_stride..y * layout.y_stride + size_x],
                u:       &self.input[u_start..u_start + chroma_len],
                v:       &self.input[v_start..v_start + chroma_len],
                step:    layout.chroma_step,
                width:   layout.chroma_width,
                start_x,
                end_x
            };
            // SAFETY: The row segment lies inside this tile
            let out = unsafe {
                self.output
                    .slice_mut((y * size_x + start_x) * 4, (y * size_x + end_x) * 4)
            };
            row.run(self.shape.uses_simd(), out);
        }
    }
}
