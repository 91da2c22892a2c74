/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Cross crate tests of the toolkit
//!
//! `tests/scenarios.json` lists operations run over seeded random images,
//! each one is run on a single scalar thread and on the full pool with simd
//! and the output hashes have to agree.
#![cfg(test)]

use std::path::{Path, PathBuf};

use nanorand::Rng;
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_128;
use zune_toolkit::{
    BlendingMode, ColorMatrix, Cube, LookupTable, Restriction, Toolkit, ToolkitErrors, YuvFormat
};

mod bitmap;
mod operations;
mod scenarios;

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Blend,
    Blur,
    ColorMatrix,
    Convolve3x3,
    Convolve5x5,
    Histogram,
    HistogramDot,
    Lut,
    Lut3d,
    Resize,
    YuvToRgb
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonYuvFormat {
    Nv21,
    Yv12
}

impl JsonYuvFormat {
    pub fn to_format(self) -> YuvFormat {
        match self {
            Self::Nv21 => YuvFormat::Nv21,
            Self::Yv12 => YuvFormat::Yv12
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMatrix {
    Identity,
    Greyscale,
    RgbToYuv,
    YuvToRgb
}

impl JsonMatrix {
    pub fn to_matrix(self) -> ColorMatrix {
        match self {
            Self::Identity => ColorMatrix::identity(),
            Self::Greyscale => ColorMatrix::greyscale(),
            Self::RgbToYuv => ColorMatrix::rgb_to_yuv(),
            Self::YuvToRgb => ColorMatrix::yuv_to_rgb()
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct Scenario {
    pub name:               String,
    pub operation:          Operation,
    pub size_x:             usize,
    pub size_y:             usize,
    #[serde(default = "default_vector_size")]
    pub vector_size:        usize,
    pub seed:               u64,
    pub radius:             Option<usize>,
    pub mode:               Option<u8>,
    pub matrix:             Option<JsonMatrix>,
    pub output_vector_size: Option<usize>,
    /// output width and height of a resize
    pub output_size:        Option<[usize; 2]>,
    /// start_x, end_x, start_y, end_y
    pub restriction:        Option<[usize; 4]>,
    pub format:             Option<JsonYuvFormat>,
    pub comment:            Option<String>
}

const fn default_vector_size() -> usize {
    4
}

/// Byte every output starts as, so untouched bytes are visible in hashes
pub const OUTPUT_FILL: u8 = 0xCD;

pub const SHARPEN_3X3: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

pub const EDGE_5X5: [f32; 25] = [
    -0.04, -0.04, -0.04, -0.04, -0.04, //
    -0.04, 0.1, 0.1, 0.1, -0.04, //
    -0.04, 0.1, 0.2, 0.1, -0.04, //
    -0.04, 0.1, 0.1, 0.1, -0.04, //
    -0.04, -0.04, -0.04, -0.04, -0.04
];

pub fn scenarios_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scenarios.json")
}

pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut bytes = vec![0; len];
    nanorand::WyRand::new_seed(seed).fill(&mut bytes);
    bytes
}

/// Bytes a cell takes in memory
pub const fn padded(vector_size: usize) -> usize {
    if vector_size == 3 {
        4
    } else {
        vector_size
    }
}

pub fn hash(contents: &[u8]) -> u128 {
    xxh3_128(contents)
}

fn counts_to_bytes(counts: &[u32]) -> Vec<u8> {
    counts.iter().flat_map(|c| c.to_le_bytes()).collect()
}

fn random_table(seed: u64) -> LookupTable {
    let bytes = random_bytes(1024, seed);
    let mut table = LookupTable::identity();
    table.red.copy_from_slice(&bytes[..256]);
    table.green.copy_from_slice(&bytes[256..512]);
    table.blue.copy_from_slice(&bytes[512..768]);
    table.alpha.copy_from_slice(&bytes[768..]);
    table
}

/// Run one scenario and return its output bytes
pub fn run_scenario(toolkit: &Toolkit, scenario: &Scenario) -> Result<Vec<u8>, ToolkitErrors> {
    let (sx, sy, vs) = (scenario.size_x, scenario.size_y, scenario.vector_size);
    let restriction = scenario
        .restriction
        .map(|[start_x, end_x, start_y, end_y]| Restriction::new(start_x, end_x, start_y, end_y));
    let restriction = restriction.as_ref();
    let seed = scenario.seed;

    let input = random_bytes(sx * sy * padded(vs), seed);
    let mut output = vec![OUTPUT_FILL; sx * sy * padded(vs)];

    match scenario.operation {
        Operation::Blend => {
            let mode = BlendingMode::from_u8(scenario.mode.unwrap_or(3))
                .ok_or_else(|| ToolkitErrors::InvalidParameter("bad blend mode".to_string()))?;
            let mut dest = random_bytes(sx * sy * 4, seed + 1);
            toolkit.blend(mode, &input, &mut dest, sx, sy, restriction)?;
            Ok(dest)
        }
        Operation::Blur => {
            let radius = scenario.radius.unwrap_or(5);
            toolkit.blur(&input, &mut output, sx, sy, vs, radius, restriction)?;
            Ok(output)
        }
        Operation::ColorMatrix => {
            let matrix = scenario.matrix.map_or_else(ColorMatrix::identity, JsonMatrix::to_matrix);
            let out_vs = scenario.output_vector_size.unwrap_or(vs);
            let mut output = vec![OUTPUT_FILL; sx * sy * padded(out_vs)];
            toolkit.color_matrix(&input, vs, &mut output, out_vs, sx, sy, &matrix, restriction)?;
            Ok(output)
        }
        Operation::Convolve3x3 => {
            toolkit.convolve3x3(&input, &mut output, sx, sy, vs, &SHARPEN_3X3, restriction)?;
            Ok(output)
        }
        Operation::Convolve5x5 => {
            toolkit.convolve5x5(&input, &mut output, sx, sy, vs, &EDGE_5X5, restriction)?;
            Ok(output)
        }
        Operation::Histogram => {
            let mut counts = vec![0; 256 * vs];
            toolkit.histogram(&input, sx, sy, vs, &mut counts, restriction)?;
            Ok(counts_to_bytes(&counts))
        }
        Operation::HistogramDot => {
            let mut counts = vec![0; 256];
            toolkit.histogram_dot(&input, sx, sy, vs, &mut counts, None, restriction)?;
            Ok(counts_to_bytes(&counts))
        }
        Operation::Lut => {
            toolkit.lut(&input, &mut output, sx, sy, &random_table(seed + 1), restriction)?;
            Ok(output)
        }
        Operation::Lut3d => {
            let cube = Cube::new(random_bytes(5 * 7 * 9 * 4, seed + 1), 5, 7, 9)?;
            toolkit.lut3d(&input, &mut output, sx, sy, &cube, restriction)?;
            Ok(output)
        }
        Operation::Resize => {
            let [ox, oy] = scenario.output_size.unwrap_or([sx * 2, sy * 2]);
            let mut output = vec![OUTPUT_FILL; ox * oy * padded(vs)];
            toolkit.resize(&input, sx, sy, vs, &mut output, ox, oy, restriction)?;
            Ok(output)
        }
        Operation::YuvToRgb => {
            let format = scenario.format.map_or(YuvFormat::Nv21, JsonYuvFormat::to_format);
            // generous, the toolkit only needs the planes to fit
            let input = random_bytes(sx * sy * 2 + 4096, seed);
            let mut output = vec![OUTPUT_FILL; sx * sy * 4];
            toolkit.yuv_to_rgb(&input, &mut output, sx, sy, format)?;
            Ok(output)
        }
    }
}
