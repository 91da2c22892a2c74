/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use nanorand::Rng;

/// Width and height every kernel is benchmarked at
pub const BENCH_SIZE: (usize, usize) = (1920, 1080);

/// A seeded random image of `size_x * size_y` cells of `cell_bytes` each
pub fn random_image(size_x: usize, size_y: usize, cell_bytes: usize) -> Vec<u8> {
    let mut pixels = vec![0; size_x * size_y * cell_bytes];
    nanorand::WyRand::new_seed(size_x as u64).fill(&mut pixels);
    pixels
}
