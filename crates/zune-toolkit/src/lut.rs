/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per channel lookup tables on RGBA cells
#![allow(clippy::cast_possible_truncation)]

use crate::restriction::Restriction;
use crate::task::{SharedBuffer, Task, TaskShape};

/// One 256 entry table per channel, `out[c] = table_c[in[c]]`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupTable {
    pub red:   [u8; 256],
    pub green: [u8; 256],
    pub blue:  [u8; 256],
    pub alpha: [u8; 256]
}

impl LookupTable {
    /// Tables that map every value to itself
    #[must_use]
    pub fn identity() -> LookupTable {
        let table: [u8; 256] = std::array::from_fn(|i| i as u8);
        LookupTable {
            red:   table,
            green: table,
            blue:  table,
            alpha: table
        }
    }
}

impl Default for LookupTable {
    fn default() -> Self {
        LookupTable::identity()
    }
}

pub(crate) struct LutTask<'a> {
    shape:  TaskShape,
    input:  &'a [u8],
    output: SharedBuffer<'a>,
    table:  &'a LookupTable
}

impl<'a> LutTask<'a> {
    pub(crate) fn new(
        input: &'a [u8], output: &'a mut [u8], size_x: usize, size_y: usize,
        table: &'a LookupTable, restriction: Option<&Restriction>
    ) -> LutTask<'a> {
        LutTask {
            shape: TaskShape::new(size_x, size_y, 4, restriction, true),
            input,
            output: SharedBuffer::new(output),
            table
        }
    }
}

impl Task for LutTask<'_> {
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
        let table = self.table;

        for y in start_y..end_y {
            let (start, end) = ((y * size_x + start_x) * 4, (y * size_x + end_x) * 4);
            // SAFETY: The row segment lies inside this tile
            let output = unsafe { self.output.slice_mut(start, end) };

            for (i, o) in self.input[start..end]
                .chunks_exact(4)
                .zip(output.chunks_exact_mut(4))
            {
                o[0] = table.red[usize::from(i[0])];
                o[1] = table.green[usize::from(i[1])];
                o[2] = table.blue[usize::from(i[2])];
                o[3] = table.alpha[usize::from(i[3])];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nanorand::Rng;
    use zune_core::options::ToolkitOptions;

    use crate::lut::{LookupTable, LutTask};
    use crate::scheduler::TaskProcessor;

    fn run_lut(input: &[u8], size_x: usize, size_y: usize, table: &LookupTable) -> Vec<u8> {
        let processor = TaskProcessor::new(&ToolkitOptions::default());
        let mut output = vec![0; input.len()];
        let mut task = LutTask::new(input, &mut output, size_x, size_y, table, None);
        processor.do_task(&mut task);
        output
    }

    #[test]
    fn identity_is_a_no_op() {
        let mut input = vec![0; 97 * 61 * 4];
        nanorand::WyRand::new_seed(6).fill(&mut input);
        assert_eq!(run_lut(&input, 97, 61, &LookupTable::identity()), input);
    }

    #[test]
    fn channels_use_their_own_table() {
        let mut table = LookupTable::identity();
        table.red = [1; 256];
        table.alpha = std::array::from_fn(|i| 255 - i as u8);

        let output = run_lut(&[10, 20, 30, 40, 50, 60, 70, 255], 2, 1, &table);
        assert_eq!(output, [1, 20, 30, 215, 1, 60, 70, 0]);
    }
}
