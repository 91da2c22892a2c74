/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Global toolkit options
//!
//! The options are read once, when a toolkit and its thread pool
//! are created, changing them afterwards has no effect on a running pool.

/// Options that enable every platform specific path the
/// running cpu supports
fn fast_options() -> ToolkitFlags {
    ToolkitFlags {
        zune_use_unsafe: true,
        zune_use_ssse3:  true,
        zune_use_sse41:  true,
        zune_use_neon:   true
    }
}

/// Options that force the portable scalar kernels
///
/// Mostly useful for debugging and for comparing simd output against
/// the reference scalar path
fn scalar_options() -> ToolkitFlags {
    ToolkitFlags {
        zune_use_unsafe: false,
        zune_use_ssse3:  false,
        zune_use_sse41:  false,
        zune_use_neon:   false
    }
}

/// Toolkit options that are flags
///
/// NOTE: When you extend this, add true or false to
/// all options above that return a `ToolkitFlags`
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolkitFlags {
    /// Whether the kernels may use unsafe platform specific intrinsics
    ///
    /// Turning this off disables every `zune_use_{EXT}` flag below.
    zune_use_unsafe: bool,
    /// Whether we should use SSSE3 instructions where possible.
    zune_use_ssse3:  bool,
    /// Whether we should use SSE4.1 instructions where possible.
    zune_use_sse41:  bool,
    /// Whether we should use neon instructions where possible.
    zune_use_neon:   bool
}

/// Toolkit options
///
/// Controls the size of the worker pool and which instruction set
/// extensions the image kernels are allowed to use.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ToolkitOptions {
    /// Total number of threads that process tiles, including the thread
    /// that submits the work.
    ///
    /// Zero picks a value from the available parallelism of the machine,
    /// capped so that at most six pool threads are spawned.
    ///
    /// - Default value: 0
    num_threads: usize,
    /// Boolean flags that influence kernel selection
    flags:       ToolkitFlags
}

/// Initializers
impl ToolkitOptions {
    /// Create options with every simd path enabled and
    /// an automatically sized thread pool.
    ///
    /// This is the same as `default`
    pub fn new_fast() -> ToolkitOptions {
        ToolkitOptions::default()
    }

    /// Create options that only run the scalar kernels
    ///
    /// Output is byte identical to the fast options, this only
    /// exists to help with debugging and testing.
    pub fn new_scalar() -> ToolkitOptions {
        ToolkitOptions::default().set_toolkit_flags(scalar_options())
    }
}

impl ToolkitOptions {
    /// Get the requested number of threads, zero
    /// means the pool is sized automatically
    pub const fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    /// Set the total number of threads that process tiles
    ///
    /// # Arguments
    ///
    /// * `threads`: Number of threads including the calling thread,
    ///   zero means pick automatically
    ///
    /// returns: ToolkitOptions
    pub fn set_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Return true if the kernels may use unsafe
    /// routines where possible
    pub const fn get_use_unsafe(&self) -> bool {
        self.flags.zune_use_unsafe
    }

    /// Set whether the kernels may use unsafe platform intrinsics
    pub fn set_use_unsafe(mut self, yes: bool) -> Self {
        self.flags.zune_use_unsafe = yes;
        self
    }

    /// Replace all flags with `flags`
    pub fn set_toolkit_flags(mut self, flags: ToolkitFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Get the flags currently set
    pub const fn get_toolkit_flags(&self) -> ToolkitFlags {
        self.flags
    }

    /// Set whether we should use SSSE3 paths where possible
    pub fn set_use_ssse3(mut self, yes: bool) -> Self {
        self.flags.zune_use_ssse3 = yes;
        self
    }

    /// Set whether we should use SSE4.1 paths where possible
    pub fn set_use_sse41(mut self, yes: bool) -> Self {
        self.flags.zune_use_sse41 = yes;
        self
    }

    /// Set whether we should use neon paths where possible
    pub fn set_use_neon(mut self, yes: bool) -> Self {
        self.flags.zune_use_neon = yes;
        self
    }
}

/// Cpu feature detection
impl ToolkitOptions {
    /// Use SSSE3 paths where possible
    ///
    /// This returns true only if the option is set and the
    /// running cpu supports it
    #[allow(unreachable_code)]
    pub fn use_ssse3(&self) -> bool {
        let opt = self.flags.zune_use_ssse3 & self.flags.zune_use_unsafe;
        // options says no
        if !opt {
            return false;
        }

        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        {
            // where we can do runtime check if feature is present
            #[cfg(feature = "std")]
            {
                if is_x86_feature_detected!("ssse3") {
                    return true;
                }
            }
            // where we can't do runtime check if feature is present
            // check if the compile feature had it enabled
            #[cfg(all(not(feature = "std"), target_feature = "ssse3"))]
            {
                return true;
            }
        }
        // everything failed return false
        false
    }

    /// Use SSE4.1 paths where possible
    ///
    /// This returns true only if the option is set and the
    /// running cpu supports it
    #[allow(unreachable_code)]
    pub fn use_sse41(&self) -> bool {
        let opt = self.flags.zune_use_sse41 & self.flags.zune_use_unsafe;
        // options says no
        if !opt {
            return false;
        }

        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        {
            #[cfg(feature = "std")]
            {
                if is_x86_feature_detected!("sse4.1") {
                    return true;
                }
            }
            #[cfg(all(not(feature = "std"), target_feature = "sse4.1"))]
            {
                return true;
            }
        }
        false
    }

    /// Use neon paths where possible
    #[allow(unreachable_code)]
    pub fn use_neon(&self) -> bool {
        let opt = self.flags.zune_use_neon & self.flags.zune_use_unsafe;
        // options says no
        if !opt {
            return false;
        }

        #[cfg(target_arch = "aarch64")]
        {
            #[cfg(feature = "std")]
            {
                if std::arch::is_aarch64_feature_detected!("neon") {
                    return true;
                }
            }
            #[cfg(all(not(feature = "std"), target_feature = "neon"))]
            {
                return true;
            }
        }
        false
    }

    /// Return true if the simd kernels of this platform can be used
    ///
    /// On x86 the kernels need both SSSE3 and SSE4.1, on aarch64 they need neon.
    pub fn use_simd(&self) -> bool {
        (self.use_ssse3() && self.use_sse41()) || self.use_neon()
    }
}

impl Default for ToolkitOptions {
    fn default() -> Self {
        Self {
            num_threads: 0,
            flags:       fast_options()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ToolkitOptions;

    #[test]
    fn scalar_options_never_report_simd() {
        let options = ToolkitOptions::new_scalar();
        assert!(!options.use_ssse3());
        assert!(!options.use_sse41());
        assert!(!options.use_neon());
        assert!(!options.use_simd());
    }

    #[test]
    fn unsafe_flag_gates_extensions() {
        let options = ToolkitOptions::new_fast().set_use_unsafe(false);
        assert!(!options.use_simd());
    }

    #[test]
    fn builder_keeps_thread_count() {
        let options = ToolkitOptions::default().set_num_threads(3);
        assert_eq!(options.get_num_threads(), 3);
        assert_eq!(ToolkitOptions::default().get_num_threads(), 0);
    }
}
