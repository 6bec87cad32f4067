use std::sync::atomic::{AtomicUsize, Ordering};

include!(concat!(env!("OUT_DIR"), "/tuned_constants.rs"));

/// Upper bound on overflow retries anyone may configure.
pub const MAX_ATTEMPTS_LIMIT: usize = 16;

// Default build retry bound. One regrow is always enough for a static
// position set, the third attempt is headroom.
const DEFAULT_MAX_BUILD_ATTEMPTS: usize = 3;

static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(TUNED_PARALLEL_THRESHOLD);
static MAX_BUILD_ATTEMPTS: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_BUILD_ATTEMPTS);

/// Ranges shorter than this run serially even on a parallel execution space.
pub fn get_parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

pub fn set_parallel_threshold(val: usize) {
    PARALLEL_THRESHOLD.store(val, Ordering::Relaxed);
}

pub fn get_max_build_attempts() -> usize {
    MAX_BUILD_ATTEMPTS.load(Ordering::Relaxed)
}

pub fn set_max_build_attempts(val: usize) {
    MAX_BUILD_ATTEMPTS.store(val.clamp(1, MAX_ATTEMPTS_LIMIT), Ordering::Relaxed);
}
