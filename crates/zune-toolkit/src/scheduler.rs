/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A persistent thread pool that runs tiled tasks
//!
//! The pool is created once and reused for every task. A task is split in
//! tiles by [`TaskShape::set_tiling`](crate::task::TaskShape::set_tiling), pool threads and the
//! thread submitting the task then claim tile indices until none is
//! left. Submitting returns once every tile has been processed.
//!
//! Only one task runs at a time, concurrent submissions from different
//! threads wait for each other.
//!
//! A panic inside a tile does not take the pool down. The remaining tiles
//! are abandoned, the submitter waits for the tiles already running and
//! the panic is resumed on the submitting thread.
use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use zune_core::log::{debug, error, trace};
use zune_core::options::ToolkitOptions;

use crate::task::{Task, TILE_TARGET_BYTES};

/// Upper bound of pool threads when the size is picked automatically
const MAX_AUTO_POOL_THREADS: usize = 6;

/// Pointer to the task being processed
///
/// The lifetime is erased when the task is published, `do_task` does not
/// return before every thread is done with it and the slot is cleared.
#[derive(Copy, Clone)]
struct TaskPtr(*const (dyn Task + 'static));

// SAFETY: Task is Sync, and the pointer is only dereferenced while do_task
// keeps the task borrowed.
unsafe impl Send for TaskPtr {}

struct PoolState {
    task:                  Option<TaskPtr>,
    tiles_not_yet_started: usize,
    tiles_in_process:      usize,
    /// First panic raised by a tile of the current task
    panic:                 Option<Box<dyn Any + Send>>,
    stop:                  bool
}

struct Shared {
    state:          Mutex<PoolState>,
    work_available: Condvar,
    work_finished:  Condvar
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // kernels run outside the lock, the state is always consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim and process tiles until none is left to start
    ///
    /// Returns with the lock held.
    fn process_tiles_until_done<'a>(
        &'a self, mut state: MutexGuard<'a, PoolState>, thread_index: usize
    ) -> MutexGuard<'a, PoolState> {
        while state.tiles_not_yet_started > 0 {
            let Some(task) = state.task else {
                break;
            };
            // Tiles are handed out from the last one down
            let tile_index = state.tiles_not_yet_started - 1;
            state.tiles_not_yet_started -= 1;
            state.tiles_in_process += 1;
            drop(state);

            // SAFETY: do_task keeps the task alive until tiles_in_process drops
            // back to zero, which cannot happen before this tile is accounted for.
            let result = catch_unwind(AssertUnwindSafe(|| unsafe {
                (*task.0).process_tile(thread_index, tile_index);
            }));

            state = self.lock();
            state.tiles_in_process -= 1;
            if let Err(payload) = result {
                error!("Tile {tile_index} panicked on thread {thread_index}");
                state.tiles_not_yet_started = 0;
                if state.panic.is_none() {
                    state.panic = Some(payload);
                }
            }
            if state.tiles_in_process == 0 && state.tiles_not_yet_started == 0 {
                self.work_finished.notify_one();
            }
        }
        state
    }
}

/// Owns the pool threads and schedules tasks over them
pub struct TaskProcessor {
    shared:       Arc<Shared>,
    /// Serializes do_task calls
    task_lock:    Mutex<()>,
    threads:      Vec<JoinHandle<()>>,
    /// Whether the running cpu can take the simd paths
    uses_simd:    bool,
    thread_count: usize
}

impl TaskProcessor {
    /// Create the pool
    ///
    /// With `options.get_num_threads() == n > 0`, `n - 1` pool threads are
    /// spawned, the calling thread being the n'th. With zero the pool gets
    /// `available_parallelism - 1` threads, capped at six.
    #[must_use]
    pub fn new(options: &ToolkitOptions) -> TaskProcessor {
        let requested = options.get_num_threads();
        let pool_threads = if requested > 0 {
            requested - 1
        } else {
            let hardware = std::thread::available_parallelism().map_or(1, usize::from);
            hardware.saturating_sub(1).min(MAX_AUTO_POOL_THREADS)
        };
        let uses_simd = options.use_simd();

        let shared = Arc::new(Shared {
            state:          Mutex::new(PoolState {
                task:                  None,
                tiles_not_yet_started: 0,
                tiles_in_process:      0,
                panic:                 None,
                stop:                  false
            }),
            work_available: Condvar::new(),
            work_finished:  Condvar::new()
        });

        let mut threads = Vec::with_capacity(pool_threads);
        for i in 0..pool_threads {
            let shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("zune-toolkit-{}", i + 1))
                // The calling thread is index 0
                .spawn(move || worker_loop(&shared, i + 1));

            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    // run with what we have, the caller still processes tiles
                    debug!("Could not spawn pool thread {}: {e}", i + 1);
                    break;
                }
            }
        }
        let thread_count = threads.len() + 1;

        debug!("Created task processor with {thread_count} threads, simd: {uses_simd}");

        TaskProcessor {
            shared,
            task_lock: Mutex::new(()),
            threads,
            uses_simd,
            thread_count
        }
    }

    /// Number of threads that process tiles, the calling thread included
    ///
    /// Thread indices handed to [`Task::process`] lie in `0..thread_count()`.
    #[must_use]
    pub const fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Whether tasks are told they may use simd
    #[must_use]
    pub const fn uses_simd(&self) -> bool {
        self.uses_simd
    }

    /// Process every tile of `task` and return once all are done
    ///
    /// # Panics
    /// Resumes the first panic raised by a tile, after every tile that was
    /// already running has finished.
    pub fn do_task(&self, task: &mut dyn Task) {
        let _serialized = self.task_lock.lock().unwrap_or_else(PoisonError::into_inner);

        task.shape_mut().set_uses_simd(self.uses_simd);
        let tiles = task.shape_mut().set_tiling(TILE_TARGET_BYTES);
        trace!("Processing task in {tiles} tiles");

        let task: &dyn Task = task;
        // SAFETY: only the lifetime is erased. The pointer is cleared before this
        // function returns and no thread touches it after tiles_in_process hits zero.
        let erased: &(dyn Task + 'static) = unsafe { std::mem::transmute(task) };

        let mut state = self.shared.lock();
        state.task = Some(TaskPtr(erased));
        state.tiles_not_yet_started = tiles;
        state.tiles_in_process = 0;
        state.panic = None;

        // Only wake the pool when there is something to share
        if tiles > 1 && !self.threads.is_empty() {
            self.shared.work_available.notify_all();
        }

        state = self.shared.process_tiles_until_done(state, 0);

        while state.tiles_in_process > 0 || state.tiles_not_yet_started > 0 {
            state = self
                .shared
                .work_finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.task = None;
        let panic = state.panic.take();
        drop(state);

        if let Some(payload) = panic {
            resume_unwind(payload);
        }
    }
}

fn worker_loop(shared: &Shared, thread_index: usize) {
    let mut state = shared.lock();
    loop {
        while !state.stop && (state.task.is_none() || state.tiles_not_yet_started == 0) {
            state = shared
                .work_available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.stop {
            return;
        }
        state = shared.process_tiles_until_done(state, thread_index);
    }
}

impl Drop for TaskProcessor {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.stop = true;
            self.shared.work_available.notify_all();
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use zune_core::options::ToolkitOptions;

    use crate::scheduler::TaskProcessor;
    use crate::task::{Task, TaskShape};

    /// Records which cell was visited how many times and by which thread
    struct CountingTask {
        shape:   TaskShape,
        visits:  Vec<AtomicUsize>,
        threads: Mutex<Vec<usize>>
    }

    impl Task for CountingTask {
        fn shape(&self) -> &TaskShape {
            &self.shape
        }

        fn shape_mut(&mut self) -> &mut TaskShape {
            &mut self.shape
        }

        fn process(
            &self, thread_index: usize, start_x: usize, start_y: usize, end_x: usize, end_y: usize
        ) {
            for y in start_y..end_y {
                for x in start_x..end_x {
                    self.visits[y * self.shape.size_x() + x].fetch_add(1, Ordering::Relaxed);
                }
            }
            self.threads.lock().unwrap().push(thread_index);
        }
    }

    fn counting_task(size_x: usize, size_y: usize, one_row: bool) -> CountingTask {
        CountingTask {
            shape:   TaskShape::new(size_x, size_y, 4, None, one_row),
            visits:  (0..size_x * size_y).map(|_| AtomicUsize::new(0)).collect(),
            threads: Mutex::new(vec![])
        }
    }

    #[test]
    fn every_cell_is_visited_once() {
        for threads in [1, 2, 7] {
            let processor = TaskProcessor::new(&ToolkitOptions::default().set_num_threads(threads));
            assert_eq!(processor.thread_count(), threads);

            for one_row in [false, true] {
                let mut task = counting_task(317, 211, one_row);
                processor.do_task(&mut task);
                assert!(task.visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
                let used = task.threads.lock().unwrap();
                assert!(used.iter().all(|t| *t < threads));
            }
        }
    }

    #[test]
    fn pool_is_reused_across_tasks() {
        let processor = TaskProcessor::new(&ToolkitOptions::default().set_num_threads(4));
        for _ in 0..20 {
            let mut task = counting_task(64, 300, false);
            processor.do_task(&mut task);
            assert!(task.visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
        }
    }

    #[test]
    fn concurrent_submissions_are_serialized() {
        let processor = TaskProcessor::new(&ToolkitOptions::default().set_num_threads(3));
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut task = counting_task(200, 100, true);
                    processor.do_task(&mut task);
                    assert!(task.visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
                });
            }
        });
    }

    /// Panics in the tile covering row `panic_row`
    struct PanickingTask {
        shape:     TaskShape,
        panic_row: usize
    }

    impl Task for PanickingTask {
        fn shape(&self) -> &TaskShape {
            &self.shape
        }

        fn shape_mut(&mut self) -> &mut TaskShape {
            &mut self.shape
        }

        fn process(&self, _: usize, _: usize, start_y: usize, _: usize, end_y: usize) {
            assert!(!(start_y..end_y).contains(&self.panic_row), "row {}", self.panic_row);
        }
    }

    #[test]
    fn panicking_tile_is_resumed_and_pool_survives() {
        for threads in [1, 4] {
            let processor = TaskProcessor::new(&ToolkitOptions::default().set_num_threads(threads));

            for panic_row in [0, 128, 255] {
                let mut task = PanickingTask {
                    shape: TaskShape::new(4096, 256, 4, None, false),
                    panic_row
                };
                let result = catch_unwind(AssertUnwindSafe(|| processor.do_task(&mut task)));
                assert!(result.is_err(), "{threads} threads, row {panic_row}");
            }
            // the pool still takes work afterwards
            let mut task = counting_task(4096, 64, false);
            processor.do_task(&mut task);
            assert!(task.visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
        }
    }

    #[test]
    fn automatic_pool_size_is_capped() {
        let processor = TaskProcessor::new(&ToolkitOptions::default());
        assert!(processor.thread_count() >= 1);
        assert!(processor.thread_count() <= 7);
    }
}
