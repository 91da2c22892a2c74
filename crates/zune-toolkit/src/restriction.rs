/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Rectangular sub regions of a buffer
use crate::errors::ToolkitErrors;

/// Restrict an operation to the cells in `[start_x, end_x) x [start_y, end_y)`
///
/// Cells outside the rectangle are neither read as centre cells nor written,
/// kernels that look at neighbours may still read around the rectangle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Restriction {
    pub start_x: usize,
    pub end_x:   usize,
    pub start_y: usize,
    pub end_y:   usize
}

impl Restriction {
    #[must_use]
    pub const fn new(start_x: usize, end_x: usize, start_y: usize, end_y: usize) -> Restriction {
        Restriction {
            start_x,
            end_x,
            start_y,
            end_y
        }
    }

    /// The restriction covering a whole `size_x` by `size_y` buffer
    #[must_use]
    pub const fn full(size_x: usize, size_y: usize) -> Restriction {
        Restriction::new(0, size_x, 0, size_y)
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.end_x - self.start_x
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.end_y - self.start_y
    }

    /// Check the rectangle is non-empty and lies inside a `size_x` by `size_y` buffer
    ///
    /// # Errors
    /// `InvalidParameter` describing the first violated bound
    pub fn validate(&self, size_x: usize, size_y: usize) -> Result<(), ToolkitErrors> {
        if self.start_x >= size_x || self.end_x > size_x {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "X restriction [{}, {}) is not within the width {size_x}",
                self.start_x, self.end_x
            )));
        }
        if self.start_y >= size_y || self.end_y > size_y {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "Y restriction [{}, {}) is not within the height {size_y}",
                self.start_y, self.end_y
            )));
        }
        if self.start_x >= self.end_x {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "Restriction start_x {} should be less than end_x {}",
                self.start_x, self.end_x
            )));
        }
        if self.start_y >= self.end_y {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "Restriction start_y {} should be less than end_y {}",
                self.start_y, self.end_y
            )));
        }
        Ok(())
    }
}

/// Validate an optional restriction, `None` is always valid
pub(crate) fn validate_restriction(
    restriction: Option<&Restriction>, size_x: usize, size_y: usize
) -> Result<(), ToolkitErrors> {
    match restriction {
        Some(r) => r.validate(size_x, size_y),
        None => Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::restriction::Restriction;

    #[test]
    fn full_restriction_is_valid() {
        assert!(Restriction::full(10, 20).validate(10, 20).is_ok());
        assert_eq!(Restriction::full(10, 20).width(), 10);
        assert_eq!(Restriction::full(10, 20).height(), 20);
    }

    #[test]
    fn rejects_out_of_bounds_and_inverted() {
        assert!(Restriction::new(0, 11, 0, 5).validate(10, 5).is_err());
        assert!(Restriction::new(10, 10, 0, 5).validate(10, 5).is_err());
        assert!(Restriction::new(0, 10, 0, 6).validate(10, 5).is_err());
        assert!(Restriction::new(5, 3, 0, 5).validate(10, 5).is_err());
        assert!(Restriction::new(0, 10, 4, 4).validate(10, 5).is_err());
        assert!(Restriction::new(9, 10, 4, 5).validate(10, 5).is_ok());
    }
}
