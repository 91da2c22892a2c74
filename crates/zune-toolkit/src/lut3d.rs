/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Three dimensional lookup tables
//!
//! The red, green and blue channels of a cell address a point in a cube
//! of RGBA entries, the result is interpolated from the eight entries
//! around that point. Alpha is passed through.
//!
//! Coordinates and weights are fixed point with 15 fractional bits.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::errors::ToolkitErrors;
use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};

/// A cube of RGBA entries, x varying fastest
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cube {
    data:   Vec<u8>,
    size_x: usize,
    size_y: usize,
    size_z: usize
}

impl Cube {
    /// Wrap `size_x * size_y * size_z` RGBA entries
    ///
    /// # Errors
    /// `InvalidParameter` if a dimension is below 2 or `data` is too short
    pub fn new(
        data: Vec<u8>, size_x: usize, size_y: usize, size_z: usize
    ) -> Result<Cube, ToolkitErrors> {
        check_cube_dimensions(size_x, size_y, size_z)?;
        let expected = size_x * size_y * size_z * 4;
        if data.len() < expected {
            return Err(ToolkitErrors::InvalidParameter(format!(
                "Cube of {size_x}x{size_y}x{size_z} needs {expected} bytes, found {}",
                data.len()
            )));
        }
        Ok(Cube {
            data,
            size_x,
            size_y,
            size_z
        })
    }

    /// A cube mapping every color to itself
    ///
    /// # Errors
    /// Same as [`Cube::new`]
    pub fn identity(size_x: usize, size_y: usize, size_z: usize) -> Result<Cube, ToolkitErrors> {
        check_cube_dimensions(size_x, size_y, size_z)?;
        let scale = |i: usize, size: usize| ((i * 255) as f32 / (size - 1) as f32 + 0.5) as u8;

        let mut data = Vec::with_capacity(size_x * size_y * size_z * 4);
        for z in 0..size_z {
            for y in 0..size_y {
                for x in 0..size_x {
                    data.extend_from_slice(&[
                        scale(x, size_x),
                        scale(y, size_y),
                        scale(z, size_z),
                        255
                    ]);
                }
            }
        }
        Cube::new(data, size_x, size_y, size_z)
    }

    pub const fn dimensions(&self) -> (usize, usize, usize) {
        (self.size_x, self.size_y, self.size_z)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    fn entry(&self, x: usize, y: usize, z: usize) -> [u32; 4] {
        let offset = ((z * self.size_y + y) * self.size_x + x) * 4;
        let e = &self.data[offset..offset + 4];
        [e[0], e[1], e[2], e[3]].map(u32::from)
    }
}

fn check_cube_dimensions(size_x: usize, size_y: usize, size_z: usize) -> Result<(), ToolkitErrors> {
    if size_x < 2 || size_y < 2 || size_z < 2 {
        return Err(ToolkitErrors::InvalidParameter(format!(
            "Cube dimensions should all be at least 2, found {size_x}x{size_y}x{size_z}"
        )));
    }
    Ok(())
}

/// Integer position along one axis of the cube
#[derive(Copy, Clone)]
struct Axis {
    lower:  usize,
    upper:  usize,
    /// weight of `lower`
    w1:     u32,
    /// weight of `upper`
    w2:     u32
}

impl Axis {
    #[inline(always)]
    fn new(value: u8, coord_mul: i32, size: usize) -> Axis {
        let base = i32::from(value) * coord_mul;
        let lower = (base >> 15) as usize;
        let w2 = (base & 0x7fff) as u32;
        Axis {
            lower,
            upper: (lower + 1).min(size - 1),
            w1: 0x8000 - w2,
            w2
        }
    }
}

/// Multiplier taking a byte to a 15 bit fixed point cube coordinate
fn coord_mul(size: usize) -> i32 {
    ((size - 1) as f32 / 255.0 * 32768.0) as i32
}

pub(crate) struct Lut3dTask<'a> {
    shape:     TaskShape,
    input:     &'a [u8],
    output:    SharedBuffer<'a>,
    cube:      &'a Cube,
    coord_mul: [i32; 3]
}

impl<'a> Lut3dTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize, cube: &'a Cube,
        restriction: Option<&Restriction>
    ) -> Lut3dTask<'a> {
        Lut3dTask {
            shape: TaskShape::new(size_x, size_y, 4, restriction, true),
            input,
            output: SharedBuffer::new(output),
            cube,
            coord_mul: [
                coord_mul(cube.size_x),
                coord_mul(cube.size_y),
                coord_mul(cube.size_z)
            ]
        }
    }

    /// Interpolate the cube at the color of `cell`
    #[inline(always)]
    fn lookup(&self, cell: &[u8]) -> [u8; 4] {
        let cube = self.cube;
        let x = Axis::new(cell[0], self.coord_mul[0], cube.size_x);
        let y = Axis::new(cell[1], self.coord_mul[1], cube.size_y);
        let z = Axis::new(cell[2], self.coord_mul[2], cube.size_z);

        // interpolate along x for the four (y, z) corners, 8 fractional bits remain
        let along_x = |yy: usize, zz: usize| -> [u32; 4] {
            let a = cube.entry(x.lower, yy, zz);
            let b = cube.entry(x.upper, yy, zz);
            [0, 1, 2, 3].map(|c| (a[c] * x.w1 + b[c] * x.w2) >> 7)
        };
        let lerp = |a: [u32; 4], b: [u32; 4], axis: &Axis| -> [u32; 4] {
            [0, 1, 2, 3].map(|c| (a[c] * axis.w1 + b[c] * axis.w2) >> 15)
        };

        let z0 = lerp(along_x(y.lower, z.lower), along_x(y.upper, z.lower), &y);
        let z1 = lerp(along_x(y.lower, z.upper), along_x(y.upper, z.upper), &y);
        let v = lerp(z0, z1, &z);

        [
            ((v[0] + 0x7f) >> 8) as u8,
            ((v[1] + 0x7f) >> 8) as u8,
            ((v[2] + 0x7f) >> 8) as u8,
            cell[3]
        ]
    }
}

impl Task for Lut3dTask<'_> {
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

        for y in start_y..end_y {
            let (start, end) = ((y * size_x + start_x) * 4, (y * size_x + end_x) * 4);
            // SAFETY: The row segment lies inside this tile
            let output = unsafe { self.output.slice_mut(start, end) };

            for (i, o) in self.input[start..end]
                .chunks_exact(4)
                .zip(output.chunks_exact_mut(4))
            {
                o.copy_from_slice(&self.lookup(i));
            }
        }
    }
}
