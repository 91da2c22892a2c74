/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors reported by toolkit entry points
use std::fmt::{Debug, Display, Formatter};

use crate::bitmap::BitmapFormat;

/// Possible errors reported before an operation starts
///
/// Every entry point validates its arguments once, before any work is
/// scheduled, an error therefore means no output byte was written.
pub enum ToolkitErrors {
    /// A width or height is zero or otherwise unusable
    ///
    /// # Arguments
    /// - 1st argument is the name of the dimension
    /// - 2nd argument is the value found
    InvalidDimension(&'static str, usize),
    /// The number of bytes per cell is not supported by the operation
    ///
    /// # Arguments
    /// - 1st argument is the name of the operation
    /// - 2nd argument is the vector size found
    InvalidVectorSize(&'static str, usize),
    /// A parameter other than dimensions or vector size is wrong,
    /// e.g a blur radius out of range or an inverted restriction
    InvalidParameter(String),
    /// The bitmap has a pixel format the toolkit cannot work on
    UnsupportedFormat(BitmapFormat),
    /// A buffer is smaller than the dimensions require
    ///
    /// # Arguments
    /// - 1st argument is the name of the buffer
    /// - 2nd argument is the number of elements expected
    /// - 3rd argument is the number of elements found
    BufferTooSmall(&'static str, usize, usize)
}

impl Debug for ToolkitErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolkitErrors::InvalidDimension(name, value) => {
                writeln!(f, "Invalid dimension {name} of {value}")
            }
            ToolkitErrors::InvalidVectorSize(operation, size) => {
                writeln!(f, "Vector size {size} is not supported by {operation}")
            }
            ToolkitErrors::InvalidParameter(reason) => {
                writeln!(f, "{reason}")
            }
            ToolkitErrors::UnsupportedFormat(format) => {
                writeln!(
                    f,
                    "Unsupported bitmap format {format:?}, expected either Alpha8 or Rgba8888"
                )
            }
            ToolkitErrors::BufferTooSmall(name, expected, found) => {
                writeln!(
                    f,
                    "Too small {name} buffer, expected at least {expected} elements but found {found}"
                )
            }
        }
    }
}

impl Display for ToolkitErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ToolkitErrors {}

impl From<String> for ToolkitErrors {
    fn from(reason: String) -> Self {
        ToolkitErrors::InvalidParameter(reason)
    }
}
