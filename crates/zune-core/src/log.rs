/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Logging facade for the toolkit
//!
//! With the `log` feature `error!`, `warn!`, `debug!` and `trace!` are the
//! macros of the `log` crate. Without it they still type-check their
//! arguments, so values that only feed a log line do not turn into unused
//! variable warnings, but nothing is formatted or emitted.

#[cfg(feature = "log")]
pub use log::{debug, error, trace, warn};

// Exported macros land in the crate root, re-export them under `log`
#[cfg(not(feature = "log"))]
pub use crate::{
    __toolkit_silent as debug, __toolkit_silent as error, __toolkit_silent as trace,
    __toolkit_silent as warn
};

#[doc(hidden)]
#[macro_export]
macro_rules! __toolkit_silent {
    ($($arg:tt)+) => {{
        if false {
            let _ = format_args!($($arg)+);
        }
    }};
}
