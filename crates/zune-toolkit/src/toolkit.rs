/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Entry points of the toolkit
//!
//! Every operation validates its arguments once, before a task is built.
//! A failed validation is logged, returned to the caller and leaves the
//! output untouched, past that point kernels trust their input.
use std::sync::Once;

use zune_core::log::{trace, warn};
use zune_core::options::ToolkitOptions;

use crate::bitmap::{Bitmap, BitmapGuard, BitmapInfo};
use crate::blend::{BlendTask, BlendingMode};
use crate::blur::{BlurTask, GaussianCoefficients};
use crate::color_matrix::{ColorMatrix, ColorMatrixTask};
use crate::convolve::{ConvolveCoefficients, ConvolveTask};
use crate::errors::ToolkitErrors;
use crate::histogram::{
    dot_coefficients, HistogramDotTask, HistogramTask, DEFAULT_DOT_COEFFICIENTS
};
use crate::lut::{LookupTable, LutTask};
use crate::lut3d::{Cube, Lut3dTask};
use crate::resize::ResizeTask;
use crate::restriction::{validate_restriction, Restriction};
use crate::scheduler::TaskProcessor;
use crate::simd::path_name;
use crate::utils::{check_buffer, check_dimensions, check_vector_size};
use crate::yuv_to_rgb::{YuvFormat, YuvLayout, YuvToRgbTask};

static BLEND_PATH: Once = Once::new();
static BLUR_PATH: Once = Once::new();
static COLOR_MATRIX_PATH: Once = Once::new();
static CONVOLVE_PATH: Once = Once::new();
static RESIZE_PATH: Once = Once::new();
static YUV_PATH: Once = Once::new();

fn log_path(once: &Once, kernel: &str, uses_simd: bool) {
    once.call_once(|| {
        trace!("Using {} {kernel} kernels", path_name(uses_simd));
    });
}

/// Run the argument checks of `operation`, logging a failure
fn checked<T>(
    operation: &str, checks: impl FnOnce() -> Result<T, ToolkitErrors>
) -> Result<T, ToolkitErrors> {
    checks().map_err(|e| {
        warn!("{operation} rejected its arguments: {e:?}");
        e
    })
}

/// Confirm a histogram output holds `expected` counters
fn check_counts(out: &[u32], expected: usize) -> Result<(), ToolkitErrors> {
    if out.len() < expected {
        return Err(ToolkitErrors::BufferTooSmall("histogram", expected, out.len()));
    }
    Ok(())
}

fn check_same_size(input: &BitmapInfo, output: &BitmapInfo) -> Result<(), ToolkitErrors> {
    if input.width != output.width || input.height != output.height {
        return Err(ToolkitErrors::InvalidParameter(format!(
            "Bitmaps should have the same size, found {}x{} and {}x{}",
            input.width, input.height, output.width, output.height
        )));
    }
    Ok(())
}

fn check_rgba<B: Bitmap + ?Sized>(guard: &BitmapGuard<'_, B>) -> Result<(), ToolkitErrors> {
    if guard.vector_size() != 4 {
        return Err(ToolkitErrors::UnsupportedFormat(guard.info().format));
    }
    Ok(())
}

/// Lock an input and an output bitmap that don't share memory
fn lock_pair<'a, A: Bitmap + ?Sized, B: Bitmap + ?Sized>(
    input: &'a A, output: &'a B
) -> Result<(BitmapGuard<'a, A>, BitmapGuard<'a, B>), ToolkitErrors> {
    let input = BitmapGuard::lock(input)?;
    let output = BitmapGuard::lock(output)?;
    if input.overlaps(&output) {
        return Err(ToolkitErrors::InvalidParameter(
            "Input and output bitmaps should not share pixels".to_string()
        ));
    }
    Ok((input, output))
}

/// Image operations over a shared thread pool
///
/// # Example
/// ```
/// use zune_toolkit::{Toolkit, ToolkitErrors};
///
/// let toolkit = Toolkit::default();
/// let input = vec![128_u8; 64 * 48 * 4];
/// let mut output = vec![0_u8; 64 * 48 * 4];
/// toolkit.blur(&input, &mut output, 64, 48, 4, 5, None)?;
/// assert!(output.iter().all(|v| *v == 128));
/// # Ok::<(), ToolkitErrors>(())
/// ```
pub struct Toolkit {
    processor: TaskProcessor
}

impl Default for Toolkit {
    fn default() -> Self {
        Toolkit::new(ToolkitOptions::default())
    }
}

impl Toolkit {
    /// Create a toolkit and its thread pool
    #[must_use]
    pub fn new(options: ToolkitOptions) -> Toolkit {
        Toolkit {
            processor: TaskProcessor::new(&options)
        }
    }

    /// Threads that process tiles, the calling thread included
    #[must_use]
    pub const fn thread_count(&self) -> usize {
        self.processor.thread_count()
    }

    /// Whether kernels run their simd paths
    #[must_use]
    pub const fn uses_simd(&self) -> bool {
        self.processor.uses_simd()
    }

    /// Blend `source` into `dest`, both RGBA
    ///
    /// [`BlendingMode::Dst`] leaves `dest` as is and schedules no work.
    ///
    /// # Errors
    /// Bad dimensions, restriction or buffer sizes
    pub fn blend(
        &self, mode: BlendingMode, source: &[u8], dest: &mut [u8], size_x: usize, size_y: usize,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("blend", || {
            check_dimensions(size_x, size_y)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("source", source.len(), size_x, size_y, 4)?;
            check_buffer("dest", dest.len(), size_x, size_y, 4)
        })?;
        if mode == BlendingMode::Dst {
            return Ok(());
        }
        log_path(&BLEND_PATH, "blend", self.uses_simd());

        let mut task = BlendTask::new(mode, source, dest, size_x, size_y, restriction);
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Gaussian blur of one or four channel cells
    ///
    /// # Errors
    /// - `InvalidVectorSize` unless `vector_size` is 1 or 4
    /// - `InvalidParameter` for a radius outside `1..=25` or a bad restriction
    /// - Bad dimensions or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn blur(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize,
        vector_size: usize, radius: usize, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let coefficients = checked("blur", || {
            check_dimensions(size_x, size_y)?;
            if vector_size != 1 && vector_size != 4 {
                return Err(ToolkitErrors::InvalidVectorSize("blur", vector_size));
            }
            let coefficients = GaussianCoefficients::new(radius)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, vector_size)?;
            check_buffer("output", output.len(), size_x, size_y, vector_size)?;
            Ok(coefficients)
        })?;
        log_path(&BLUR_PATH, "blur", self.uses_simd());

        let mut task = BlurTask::new(
            input,
            output,
            size_x,
            size_y,
            vector_size,
            coefficients,
            restriction,
            self.thread_count()
        );
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Multiply every cell by `matrix`
    ///
    /// Input and output vector sizes may differ, missing input channels
    /// read as zero.
    ///
    /// # Errors
    /// Bad dimensions, vector sizes, restriction or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn color_matrix(
        &self, input: &[u8], input_vector_size: usize, output: &mut [u8],
        output_vector_size: usize, size_x: usize, size_y: usize, matrix: &ColorMatrix,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("color_matrix", || {
            check_dimensions(size_x, size_y)?;
            check_vector_size("color_matrix", input_vector_size)?;
            check_vector_size("color_matrix", output_vector_size)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, input_vector_size)?;
            check_buffer("output", output.len(), size_x, size_y, output_vector_size)
        })?;
        log_path(&COLOR_MATRIX_PATH, "color matrix", self.uses_simd());

        let kernel = matrix.kernel(input_vector_size, output_vector_size);
        let mut task = ColorMatrixTask::new(input, output, size_x, size_y, kernel, restriction);
        self.processor.do_task(&mut task);
        Ok(())
    }

    fn convolve(
        &self, operation: &'static str, input: &[u8], output: &mut [u8], size_x: usize,
        size_y: usize, vector_size: usize, weights: &[f32], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let coefficients = checked(operation, || {
            check_dimensions(size_x, size_y)?;
            check_vector_size(operation, vector_size)?;
            let coefficients = ConvolveCoefficients::new(weights)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, vector_size)?;
            check_buffer("output", output.len(), size_x, size_y, vector_size)?;
            Ok(coefficients)
        })?;
        log_path(&CONVOLVE_PATH, "convolve", self.uses_simd());

        let mut task = ConvolveTask::new(
            input,
            output,
            size_x,
            size_y,
            vector_size,
            coefficients,
            restriction
        );
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Convolve with a 3x3 kernel given row major
    ///
    /// # Errors
    /// Bad dimensions, vector size, weights, restriction or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn convolve3x3(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize,
        vector_size: usize, weights: &[f32; 9], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        self.convolve(
            "convolve3x3",
            input,
            output,
            size_x,
            size_y,
            vector_size,
            weights,
            restriction
        )
    }

    /// Convolve with a 5x5 kernel given row major
    ///
    /// # Errors
    /// Bad dimensions, vector size, weights, restriction or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn convolve5x5(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize,
        vector_size: usize, weights: &[f32; 25], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        self.convolve(
            "convolve5x5",
            input,
            output,
            size_x,
            size_y,
            vector_size,
            weights,
            restriction
        )
    }

    /// Count the values of every channel
    ///
    /// `out` receives `256 * vector_size` counters, the count of value `v`
    /// in channel `c` at `out[v * vector_size + c]`.
    ///
    /// # Errors
    /// Bad dimensions, vector size, restriction or buffer sizes
    pub fn histogram(
        &self, input: &[u8], size_x: usize, size_y: usize, vector_size: usize, out: &mut [u32],
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("histogram", || {
            check_dimensions(size_x, size_y)?;
            check_vector_size("histogram", vector_size)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, vector_size)?;
            check_counts(out, 256 * vector_size)
        })?;

        let mut task = HistogramTask::new(
            input,
            size_x,
            size_y,
            vector_size,
            restriction,
            self.thread_count()
        );
        self.processor.do_task(&mut task);
        task.collate(out);
        Ok(())
    }

    /// Count the luminance of every cell into 256 buckets
    ///
    /// `coefficients` weight the channels, they default to
    /// [`DEFAULT_DOT_COEFFICIENTS`].
    ///
    /// # Errors
    /// - `InvalidParameter` for negative weights or weights summing past one
    /// - Bad dimensions, vector size, restriction or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn histogram_dot(
        &self, input: &[u8], size_x: usize, size_y: usize, vector_size: usize, out: &mut [u32],
        coefficients: Option<&[f32; 4]>, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let dot = checked("histogram_dot", || {
            check_dimensions(size_x, size_y)?;
            check_vector_size("histogram_dot", vector_size)?;
            let dot = dot_coefficients(coefficients.unwrap_or(&DEFAULT_DOT_COEFFICIENTS))?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, vector_size)?;
            check_counts(out, 256)?;
            Ok(dot)
        })?;

        let mut task = HistogramDotTask::new(
            input,
            size_x,
            size_y,
            vector_size,
            dot,
            restriction,
            self.thread_count()
        );
        self.processor.do_task(&mut task);
        task.collate(out);
        Ok(())
    }

    /// Map every channel of RGBA cells through its own table
    ///
    /// # Errors
    /// Bad dimensions, restriction or buffer sizes
    pub fn lut(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize,
        table: &LookupTable, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("lut", || {
            check_dimensions(size_x, size_y)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, 4)?;
            check_buffer("output", output.len(), size_x, size_y, 4)
        })?;

        let mut task = LutTask::new(input, output, size_x, size_y, table, restriction);
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Map the RGB of RGBA cells through a cube, keeping alpha
    ///
    /// # Errors
    /// Bad dimensions, restriction or buffer sizes
    pub fn lut3d(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize, cube: &Cube,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("lut3d", || {
            check_dimensions(size_x, size_y)?;
            validate_restriction(restriction, size_x, size_y)?;
            check_buffer("input", input.len(), size_x, size_y, 4)?;
            check_buffer("output", output.len(), size_x, size_y, 4)
        })?;

        let mut task = Lut3dTask::new(input, output, size_x, size_y, cube, restriction);
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Bicubic resize from `input_x * input_y` to `output_x * output_y` cells
    ///
    /// The restriction selects output cells.
    ///
    /// # Errors
    /// Bad dimensions, vector size, restriction or buffer sizes
    #[allow(clippy::too_many_arguments)]
    pub fn resize(
        &self, input: &[u8], input_x: usize, input_y: usize, vector_size: usize,
        output: &mut [u8], output_x: usize, output_y: usize, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        checked("resize", || {
            check_dimensions(input_x, input_y)?;
            if output_x == 0 {
                return Err(ToolkitErrors::InvalidDimension("output_x", output_x));
            }
            if output_y == 0 {
                return Err(ToolkitErrors::InvalidDimension("output_y", output_y));
            }
            check_vector_size("resize", vector_size)?;
            validate_restriction(restriction, output_x, output_y)?;
            check_buffer("input", input.len(), input_x, input_y, vector_size)?;
            check_buffer("output", output.len(), output_x, output_y, vector_size)
        })?;
        log_path(&RESIZE_PATH, "resize", self.uses_simd());

        let mut task = ResizeTask::new(
            input,
            input_x,
            input_y,
            vector_size,
            output,
            output_x,
            output_y,
            restriction
        );
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// Convert a 4:2:0 image to RGBA
    ///
    /// # Errors
    /// - `InvalidDimension` for an odd `size_x`
    /// - Bad dimensions or buffer sizes
    pub fn yuv_to_rgb(
        &self, input: &[u8], output: &mut [u8], size_x: usize, size_y: usize, format: YuvFormat
    ) -> Result<(), ToolkitErrors> {
        let layout = checked("yuv_to_rgb", || {
            check_dimensions(size_x, size_y)?;
            // bounds size_x * size_y before the plane offsets are computed
            check_buffer("output", output.len(), size_x, size_y, 4)?;
            let layout = YuvLayout::new(format, size_x, size_y)?;
            if input.len() < layout.size {
                return Err(ToolkitErrors::BufferTooSmall("input", layout.size, input.len()));
            }
            Ok(layout)
        })?;
        log_path(&YUV_PATH, "yuv", self.uses_simd());

        let mut task = YuvToRgbTask::new(input, output, size_x, size_y, layout);
        self.processor.do_task(&mut task);
        Ok(())
    }

    /// [`blend`](Self::blend) on two RGBA bitmaps of the same size
    ///
    /// # Errors
    /// - `UnsupportedFormat` when a bitmap isn't tightly packed RGBA
    /// - `InvalidParameter` when the bitmaps differ in size, share pixels
    ///   or can't be locked
    /// - what [`blend`](Self::blend) returns
    pub fn blend_bitmap(
        &self, mode: BlendingMode, source: &(impl Bitmap + ?Sized), dest: &(impl Bitmap + ?Sized),
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (source, mut dest) = checked("blend", || {
            let (source, dest) = lock_pair(source, dest)?;
            check_rgba(&source)?;
            check_rgba(&dest)?;
            check_same_size(source.info(), dest.info())?;
            Ok((source, dest))
        })?;
        let info = *dest.info();
        self.blend(
            mode,
            source.pixels(),
            dest.pixels_mut(),
            info.width,
            info.height,
            restriction
        )
    }

    /// [`blur`](Self::blur) between two bitmaps of the same size and format
    ///
    /// # Errors
    /// Same as [`blend_bitmap`](Self::blend_bitmap), except both bitmaps
    /// may also be `Alpha8`
    pub fn blur_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized), radius: usize,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("blur", || lock_same_shape(input, output))?;
        let info = *input.info();
        self.blur(
            input.pixels(),
            output.pixels_mut(),
            info.width,
            info.height,
            input.vector_size(),
            radius,
            restriction
        )
    }

    /// [`color_matrix`](Self::color_matrix) between two bitmaps of the same size
    ///
    /// The vector sizes follow the formats, so an `Alpha8` input may feed
    /// an `Rgba8888` output.
    ///
    /// # Errors
    /// Same as [`blend_bitmap`](Self::blend_bitmap), formats may be `Alpha8`
    pub fn color_matrix_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized),
        matrix: &ColorMatrix, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("color_matrix", || {
            let (input, output) = lock_pair(input, output)?;
            check_same_size(input.info(), output.info())?;
            Ok((input, output))
        })?;
        let info = *input.info();
        let output_vector_size = output.vector_size();
        self.color_matrix(
            input.pixels(),
            input.vector_size(),
            output.pixels_mut(),
            output_vector_size,
            info.width,
            info.height,
            matrix,
            restriction
        )
    }

    /// [`convolve3x3`](Self::convolve3x3) between two bitmaps of the same size and format
    ///
    /// # Errors
    /// Same as [`blur_bitmap`](Self::blur_bitmap)
    pub fn convolve3x3_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized),
        weights: &[f32; 9], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("convolve3x3", || lock_same_shape(input, output))?;
        let info = *input.info();
        self.convolve3x3(
            input.pixels(),
            output.pixels_mut(),
            info.width,
            info.height,
            input.vector_size(),
            weights,
            restriction
        )
    }

    /// [`convolve5x5`](Self::convolve5x5) between two bitmaps of the same size and format
    ///
    /// # Errors
    /// Same as [`blur_bitmap`](Self::blur_bitmap)
    pub fn convolve5x5_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized),
        weights: &[f32; 25], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("convolve5x5", || lock_same_shape(input, output))?;
        let info = *input.info();
        self.convolve5x5(
            input.pixels(),
            output.pixels_mut(),
            info.width,
            info.height,
            input.vector_size(),
            weights,
            restriction
        )
    }

    /// [`histogram`](Self::histogram) of a bitmap
    ///
    /// # Errors
    /// `UnsupportedFormat` or `InvalidParameter` for a bitmap that can't be
    /// locked, then what [`histogram`](Self::histogram) returns
    pub fn histogram_bitmap(
        &self, input: &(impl Bitmap + ?Sized), out: &mut [u32], restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let input = checked("histogram", || BitmapGuard::lock(input))?;
        let info = *input.info();
        self.histogram(
            input.pixels(),
            info.width,
            info.height,
            input.vector_size(),
            out,
            restriction
        )
    }

    /// [`histogram_dot`](Self::histogram_dot) of a bitmap
    ///
    /// # Errors
    /// Same as [`histogram_bitmap`](Self::histogram_bitmap)
    pub fn histogram_dot_bitmap(
        &self, input: &(impl Bitmap + ?Sized), out: &mut [u32], coefficients: Option<&[f32; 4]>,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let input = checked("histogram_dot", || BitmapGuard::lock(input))?;
        let info = *input.info();
        self.histogram_dot(
            input.pixels(),
            info.width,
            info.height,
            input.vector_size(),
            out,
            coefficients,
            restriction
        )
    }

    /// [`lut`](Self::lut) between two RGBA bitmaps of the same size
    ///
    /// # Errors
    /// Same as [`blend_bitmap`](Self::blend_bitmap)
    pub fn lut_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized),
        table: &LookupTable, restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("lut", || lock_rgba_pair(input, output))?;
        let info = *input.info();
        self.lut(
            input.pixels(),
            output.pixels_mut(),
            info.width,
            info.height,
            table,
            restriction
        )
    }

    /// [`lut3d`](Self::lut3d) between two RGBA bitmaps of the same size
    ///
    /// # Errors
    /// Same as [`blend_bitmap`](Self::blend_bitmap)
    pub fn lut3d_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized), cube: &Cube,
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("lut3d", || lock_rgba_pair(input, output))?;
        let info = *input.info();
        self.lut3d(
            input.pixels(),
            output.pixels_mut(),
            info.width,
            info.height,
            cube,
            restriction
        )
    }

    /// [`resize`](Self::resize) `input` to the size of `output`
    ///
    /// # Errors
    /// - `UnsupportedFormat` when the formats differ or can't be processed
    /// - `InvalidParameter` when the bitmaps share pixels or can't be locked
    /// - what [`resize`](Self::resize) returns
    pub fn resize_bitmap(
        &self, input: &(impl Bitmap + ?Sized), output: &(impl Bitmap + ?Sized),
        restriction: Option<&Restriction>
    ) -> Result<(), ToolkitErrors> {
        let (input, mut output) = checked("resize", || {
            let (input, output) = lock_pair(input, output)?;
            if input.info().format != output.info().format {
                return Err(ToolkitErrors::UnsupportedFormat(output.info().format));
            }
            Ok((input, output))
        })?;
        let (from, to) = (*input.info(), *output.info());
        self.resize(
            input.pixels(),
            from.width,
            from.height,
            input.vector_size(),
            output.pixels_mut(),
            to.width,
            to.height,
            restriction
        )
    }

    /// [`yuv_to_rgb`](Self::yuv_to_rgb) into an RGBA bitmap, which gives the size
    ///
    /// # Errors
    /// `UnsupportedFormat` unless `output` is RGBA, then what
    /// [`yuv_to_rgb`](Self::yuv_to_rgb) returns
    pub fn yuv_to_rgb_bitmap(
        &self, input: &[u8], format: YuvFormat, output: &(impl Bitmap + ?Sized)
    ) -> Result<(), ToolkitErrors> {
        let mut output = checked("yuv_to_rgb", || {
            let output = BitmapGuard::lock(output)?;
            check_rgba(&output)?;
            Ok(output)
        })?;
        let info = *output.info();
        self.yuv_to_rgb(input, output.pixels_mut(), info.width, info.height, format)
    }
}

/// Lock two bitmaps of equal size and format
fn lock_same_shape<'a, A: Bitmap + ?Sized, B: Bitmap + ?Sized>(
    input: &'a A, output: &'a B
) -> Result<(BitmapGuard<'a, A>, BitmapGuard<'a, B>), ToolkitErrors> {
    let (input, output) = lock_pair(input, output)?;
    if input.info().format != output.info().format {
        return Err(ToolkitErrors::UnsupportedFormat(output.info().format));
    }
    check_same_size(input.info(), output.info())?;
    Ok((input, output))
}

fn lock_rgba_pair<'a, A: Bitmap + ?Sized, B: Bitmap + ?Sized>(
    input: &'a A, output: &'a B
) -> Result<(BitmapGuard<'a, A>, BitmapGuard<'a, B>), ToolkitErrors> {
    let (input, output) = lock_same_shape(input, output)?;
    check_rgba(&input)?;
    Ok((input, output))
}
