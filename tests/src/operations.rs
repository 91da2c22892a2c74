/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use zune_core::options::ToolkitOptions;
use zune_toolkit::{
    BlendingMode, ColorMatrix, Cube, LookupTable, Restriction, Toolkit, ToolkitErrors, YuvFormat
};

use crate::{random_bytes, EDGE_5X5, OUTPUT_FILL, SHARPEN_3X3};

fn toolkit() -> Toolkit {
    Toolkit::new(ToolkitOptions::default().set_num_threads(3))
}

#[test]
fn uniform_image_survives_every_filter() {
    let toolkit = toolkit();
    let (sx, sy) = (83, 61);
    let input = vec![77_u8; sx * sy * 4];
    let mut output = vec![0; sx * sy * 4];

    for radius in [1, 7, 25] {
        toolkit.blur(&input, &mut output, sx, sy, 4, radius, None).unwrap();
        assert_eq!(input, output, "blur radius {radius}");
    }
    toolkit
        .convolve3x3(&input, &mut output, sx, sy, 4, &SHARPEN_3X3, None)
        .unwrap();
    assert_eq!(input, output);

    let box_5x5 = [1.0 / 25.0; 25];
    toolkit
        .convolve5x5(&input, &mut output, sx, sy, 4, &box_5x5, None)
        .unwrap();
    assert_eq!(input, output);

    let mut resized = vec![0; 190 * 20 * 4];
    toolkit
        .resize(&input, sx, sy, 4, &mut resized, 190, 20, None)
        .unwrap();
    assert!(resized.iter().all(|v| *v == 77));
}

#[test]
fn add_saturates_and_subtract_floors() {
    let toolkit = toolkit();
    let source = [200, 10, 255, 128].repeat(32 * 32);

    let mut dest = [100, 5, 1, 200].repeat(32 * 32);
    toolkit
        .blend(BlendingMode::Add, &source, &mut dest, 32, 32, None)
        .unwrap();
    assert_eq!(dest, [255, 15, 255, 255].repeat(32 * 32));

    let mut dest = [100, 5, 1, 200].repeat(32 * 32);
    toolkit
        .blend(BlendingMode::Subtract, &source, &mut dest, 32, 32, None)
        .unwrap();
    assert_eq!(dest, [0, 0, 0, 72].repeat(32 * 32));
}

#[test]
fn dst_leaves_destination_alone() {
    let toolkit = toolkit();
    let source = random_bytes(50 * 50 * 4, 30);
    let original = random_bytes(50 * 50 * 4, 31);
    let mut dest = original.clone();
    toolkit
        .blend(BlendingMode::Dst, &source, &mut dest, 50, 50, None)
        .unwrap();
    assert_eq!(dest, original);
}

#[test]
fn clear_and_src_respect_restriction() {
    let toolkit = toolkit();
    let source = random_bytes(40 * 30 * 4, 32);
    let r = Restriction::new(5, 35, 10, 20);

    let mut dest = vec![OUTPUT_FILL; 40 * 30 * 4];
    toolkit
        .blend(BlendingMode::Src, &source, &mut dest, 40, 30, Some(&r))
        .unwrap();
    for y in 0..30 {
        for x in 0..40 {
            let i = (y * 40 + x) * 4;
            if (5..35).contains(&x) && (10..20).contains(&y) {
                assert_eq!(dest[i..i + 4], source[i..i + 4]);
            } else {
                assert_eq!(dest[i..i + 4], [OUTPUT_FILL; 4]);
            }
        }
    }

    toolkit
        .blend(BlendingMode::Clear, &source, &mut dest, 40, 30, None)
        .unwrap();
    assert!(dest.iter().all(|v| *v == 0));
}

#[test]
fn histogram_counts_sum_to_cells() {
    let toolkit = toolkit();
    let (sx, sy) = (211, 67);
    let r = Restriction::new(11, 200, 3, 60);

    for vector_size in 1..=4 {
        let cell = if vector_size == 3 { 4 } else { vector_size };
        let input = random_bytes(sx * sy * cell, 33);
        let mut counts = vec![0_u32; 256 * vector_size];

        toolkit
            .histogram(&input, sx, sy, vector_size, &mut counts, None)
            .unwrap();
        for channel in 0..vector_size {
            let total: u32 = counts.iter().skip(channel).step_by(vector_size).sum();
            assert_eq!(total as usize, sx * sy);
        }

        toolkit
            .histogram(&input, sx, sy, vector_size, &mut counts, Some(&r))
            .unwrap();
        for channel in 0..vector_size {
            let total: u32 = counts.iter().skip(channel).step_by(vector_size).sum();
            assert_eq!(total as usize, r.width() * r.height());
        }

        let mut dot = vec![0_u32; 256];
        toolkit
            .histogram_dot(&input, sx, sy, vector_size, &mut dot, None, Some(&r))
            .unwrap();
        assert_eq!(dot.iter().sum::<u32>() as usize, r.width() * r.height());
    }
}

#[test]
fn histogram_dot_buckets_grey() {
    let toolkit = toolkit();
    let input = [90, 90, 90, 255].repeat(10);
    let mut dot = vec![0_u32; 256];
    toolkit
        .histogram_dot(&input, 5, 2, 4, &mut dot, None, None)
        .unwrap();
    assert_eq!(dot[90], 10);
}

#[test]
fn identity_tables_and_matrices_are_no_ops() {
    let toolkit = toolkit();
    let (sx, sy) = (129, 77);
    let input = random_bytes(sx * sy * 4, 34);
    let mut output = vec![0; sx * sy * 4];

    toolkit
        .lut(&input, &mut output, sx, sy, &LookupTable::identity(), None)
        .unwrap();
    assert_eq!(input, output);

    toolkit
        .color_matrix(&input, 4, &mut output, 4, sx, sy, &ColorMatrix::identity(), None)
        .unwrap();
    assert_eq!(input, output);

    let cube = Cube::identity(17, 17, 17).unwrap();
    toolkit.lut3d(&input, &mut output, sx, sy, &cube, None).unwrap();
    for (i, o) in input.chunks_exact(4).zip(output.chunks_exact(4)) {
        for c in 0..3 {
            assert!(i[c].abs_diff(o[c]) <= 1, "{i:?} became {o:?}");
        }
        assert_eq!(i[3], o[3]);
    }
}

#[test]
fn yuv_white_is_white() {
    let toolkit = toolkit();
    let (sx, sy) = (64, 33);

    let mut nv21 = vec![235_u8; sx * sy];
    nv21.resize(sx * sy + sx * 17, 128);
    let mut output = vec![0; sx * sy * 4];
    toolkit
        .yuv_to_rgb(&nv21, &mut output, sx, sy, YuvFormat::Nv21)
        .unwrap();
    assert!(output.iter().all(|v| *v == 255));

    // 64 wide rows are already aligned, chroma rows are 32 bytes
    let mut yv12 = vec![235_u8; sx * sy];
    yv12.resize(sx * sy + 2 * 32 * 17, 128);
    let mut output = vec![0; sx * sy * 4];
    toolkit
        .yuv_to_rgb(&yv12, &mut output, sx, sy, YuvFormat::Yv12)
        .unwrap();
    assert!(output.iter().all(|v| *v == 255));
}

#[test]
fn short_yuv_input_is_rejected() {
    let toolkit = toolkit();
    let input = vec![128_u8; 64 * 33];
    let mut output = vec![OUTPUT_FILL; 64 * 33 * 4];
    assert!(matches!(
        toolkit.yuv_to_rgb(&input, &mut output, 64, 33, YuvFormat::Nv21),
        Err(ToolkitErrors::BufferTooSmall("input", _, _))
    ));
    assert!(output.iter().all(|v| *v == OUTPUT_FILL));
}

#[test]
fn validation_errors_write_nothing() {
    let toolkit = toolkit();
    let input = random_bytes(30 * 30 * 4, 35);
    let mut output = vec![OUTPUT_FILL; 30 * 30 * 4];
    let outside = Restriction::new(0, 31, 0, 30);

    let results = [
        toolkit.blur(&input, &mut output, 30, 30, 3, 4, None),
        toolkit.blur(&input, &mut output, 30, 30, 4, 0, None),
        toolkit.convolve5x5(&input, &mut output, 30, 30, 5, &EDGE_5X5, None),
        toolkit.convolve3x3(&input, &mut output, 30, 30, 4, &SHARPEN_3X3, Some(&outside)),
        toolkit.color_matrix(&input, 0, &mut output, 4, 30, 30, &ColorMatrix::identity(), None),
        toolkit.resize(&input, 30, 30, 4, &mut output, 31, 30, None),
        toolkit.lut3d(&input, &mut output, 30, 0, &Cube::identity(2, 2, 2).unwrap(), None),
        toolkit.blend(BlendingMode::Xor, &input[..100], &mut output, 30, 30, None)
    ];
    for result in results {
        assert!(result.is_err());
    }
    assert!(output.iter().all(|v| *v == OUTPUT_FILL));
}
