// Copyright 2020 Joyent, Inc.

use std::time::{Duration, Instant};

/// Tracks remaining time against an absolute monotonic deadline.
///
/// Blocking calls that accept a maximum wait construct a `Timer` once and
/// consult `remaining` across repeated condition waits, so spurious wakeups
/// do not extend the overall deadline. A single `Timer` may also be shared
/// across several calls to spread one deadline over all of them.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    deadline: Instant,
}

impl Timer {
    /// Return a timer that expires `max_wait_ms` milliseconds from now.
    pub fn new(max_wait_ms: u64) -> Self {
        Timer {
            deadline: Instant::now() + Duration::from_millis(max_wait_ms),
        }
    }

    /// The time remaining before the deadline. Zero once expired.
    pub fn remaining(&self) -> Duration {
        let now = Instant::now();
        if now >= self.deadline {
            Duration::from_millis(0)
        } else {
            self.deadline - now
        }
    }

    /// True once the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
