/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Toolkit options
//!
//! This module exposes a struct holding options shared by every
//! operation of a toolkit instance, i.e the size of the worker pool
//! and which platform specific kernels may run.
pub use toolkit::*;

mod toolkit;
