/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Units of work over a 2D grid of cells
//!
//! A task describes one kernel invocation, the scheduler splits its
//! domain into tiles by index and calls back into [`Task::process`]
//! for every tile, possibly from several threads at once.
use std::marker::PhantomData;

use crate::restriction::Restriction;
use crate::utils::{div_round_up, padded_size};

/// Byte budget of a tile, large enough to amortize the dispatch
/// and small enough to spread work across the pool
pub const TILE_TARGET_BYTES: usize = 16 * 1024;

/// Smallest byte budget `set_tiling` accepts
const MIN_TILE_BYTES: usize = 1000;

/// How a task is laid out and how it is split in tiles
#[derive(Copy, Clone, Debug)]
pub struct TaskShape {
    size_x:           usize,
    size_y:           usize,
    vector_size:      usize,
    restriction:      Restriction,
    prefers_one_row:  bool,
    uses_simd:        bool,
    // tiling, valid after set_tiling
    tiles_per_row:    usize,
    cells_per_tile_x: usize,
    cells_per_tile_y: usize
}

impl TaskShape {
    /// Create the shape of a task over `size_x * size_y` cells
    ///
    /// `prefers_one_row` tells the scheduler the kernel only looks at the
    /// cell it writes, so a tile spanning whole rows may be presented
    /// as one long row.
    #[must_use]
    pub fn new(
        size_x: usize, size_y: usize, vector_size: usize, restriction: Option<&Restriction>,
        prefers_one_row: bool
    ) -> TaskShape {
        TaskShape {
            size_x,
            size_y,
            vector_size,
            restriction: restriction
                .copied()
                .unwrap_or_else(|| Restriction::full(size_x, size_y)),
            prefers_one_row,
            uses_simd: false,
            tiles_per_row: 1,
            cells_per_tile_x: size_x,
            cells_per_tile_y: size_y
        }
    }

    pub const fn size_x(&self) -> usize {
        self.size_x
    }

    pub const fn size_y(&self) -> usize {
        self.size_y
    }

    pub const fn vector_size(&self) -> usize {
        self.vector_size
    }

    #[cfg(test)]
    pub const fn restriction(&self) -> &Restriction {
        &self.restriction
    }

    pub const fn prefers_one_row(&self) -> bool {
        self.prefers_one_row
    }

    /// Whether kernels may take their simd paths, set by the scheduler
    pub const fn uses_simd(&self) -> bool {
        self.uses_simd
    }

    pub fn set_uses_simd(&mut self, yes: bool) {
        self.uses_simd = yes;
    }

    /// Split the domain in tiles of roughly `target_tile_bytes` and return
    /// the number of tiles
    ///
    /// The width of a tile is picked first, its height follows from the
    /// width so that the area stays close to the budget. Every tile is
    /// non-empty and the tiles partition the restricted domain.
    pub fn set_tiling(&mut self, target_tile_bytes: usize) -> usize {
        let target_tile_bytes = target_tile_bytes.max(MIN_TILE_BYTES);
        let target_cells = (target_tile_bytes / padded_size(self.vector_size)).max(1);

        let cells_x = self.restriction.width();
        let cells_y = self.restriction.height();

        // Split in x first
        self.tiles_per_row = div_round_up(cells_x, target_cells);
        self.cells_per_tile_x = div_round_up(cells_x, self.tiles_per_row);

        // then in y using what is left of the budget
        let target_rows = div_round_up(target_cells, self.cells_per_tile_x);
        let tiles_per_column = div_round_up(cells_y, target_rows);
        self.cells_per_tile_y = div_round_up(cells_y, tiles_per_column);

        self.tiles_per_row * tiles_per_column
    }

    /// Rectangle `(start_x, end_x, start_y, end_y)` covered by tile `tile_index`
    #[must_use]
    pub fn tile_bounds(&self, tile_index: usize) -> (usize, usize, usize, usize) {
        let tile_y = tile_index / self.tiles_per_row;
        let tile_x = tile_index % self.tiles_per_row;

        let start_x = self.restriction.start_x + tile_x * self.cells_per_tile_x;
        let start_y = self.restriction.start_y + tile_y * self.cells_per_tile_y;
        let end_x = (start_x + self.cells_per_tile_x).min(self.restriction.end_x);
        let end_y = (start_y + self.cells_per_tile_y).min(self.restriction.end_y);

        (start_x, end_x, start_y, end_y)
    }
}

/// A unit of work the scheduler can split in tiles
///
/// Implementations are shared between pool threads, anything they write
/// must go to cells inside the rectangle they are handed.
pub trait Task: Sync {
    fn shape(&self) -> &TaskShape;

    fn shape_mut(&mut self) -> &mut TaskShape;

    /// Process the cells in `[start_x, end_x) x [start_y, end_y)`
    ///
    /// When the task prefers one row a tile spanning full rows arrives as
    /// a single row starting at `(0, start_y)` whose `end_x` may exceed
    /// `size_x`, the cells are contiguous so the usual
    /// `y * size_x + x` offset still addresses them.
    fn process(
        &self, thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
    );

    /// Map a tile index to its rectangle and process it row by row
    fn process_tile(&self, thread_index: usize, tile_index: usize) {
        let shape = self.shape();
        let (start_x, end_x, start_y, end_y) = shape.tile_bounds(tile_index);

        if shape.prefers_one_row() && start_x == 0 && end_x == shape.size_x() {
            let cells = shape.size_x() * (end_y - start_y);
            self.process(thread_index, 0, start_y, cells, start_y + 1);
        } else {
            for y in start_y..end_y {
                self.process(thread_index, start_x, y, end_x, y + 1);
            }
        }
    }
}

/// An output buffer written concurrently by the tiles of one task
///
/// Tiles never overlap, so handing each of them a mutable view of the
/// bytes it owns is sound even though the views come from a shared
/// reference.
pub(crate) struct SharedBuffer<'a> {
    ptr:     *mut u8,
    len:     usize,
    _marker: PhantomData<&'a mut [u8]>
}

// SAFETY: writers only touch the disjoint byte ranges of their own tile
unsafe impl Send for SharedBuffer<'_> {}
unsafe impl Sync for SharedBuffer<'_> {}

impl<'a> SharedBuffer<'a> {
    pub(crate) fn new(buffer: &'a mut [u8]) -> SharedBuffer<'a> {
        SharedBuffer {
            ptr:     buffer.as_mut_ptr(),
            len:     buffer.len(),
            _marker: PhantomData
        }
    }

    /// Mutable view of `start..end`
    ///
    /// # Safety
    /// The caller must own `start..end` exclusively, i.e the range lies inside the
    /// tile being processed and no other view of it is alive.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, start: usize, end: usize) -> &mut [u8] {
        assert!(start <= end && end <= self.len, "range out of bounds");
        std::slice::from_raw_parts_mut(self.ptr.add(start), end - start)
    }
}
