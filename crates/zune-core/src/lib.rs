/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Core routines shared by the toolkit crates
//!
//! It currently contains
//!
//! - A logging facade that compiles to nothing unless the `log` feature is on
//! - Toolkit options, sizing of the worker pool and simd selection
//!
//! # Features
//!  - `std`: Enables runtime cpu feature detection, without it only the
//!     target features the crate was compiled with are considered.
//!
//!  - `log`: Forward the logging macros to the `log` crate.
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]

pub mod log;
pub mod options;
