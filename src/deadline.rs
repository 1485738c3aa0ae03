//! Deadlines accepted by the suspending operations.

use std::time::{Duration, Instant};

/// When a suspending call should give up waiting for a rendezvous.
///
/// This plays the role of the source's `deadline` parameter (`0` for
/// non-blocking, negative for infinite, positive for an absolute monotonic
/// instant), expressed as a proper Rust enum instead of a signed integer.
#[derive(Clone, Copy, Debug)]
pub enum Deadline {
    /// Fail immediately with `Timeout` if no fast-path rendezvous is
    /// available; never suspends.
    Immediate,
    /// Suspend until a rendezvous, cancellation or peer closure ends the
    /// wait; never times out on its own.
    Never,
    /// Suspend until a rendezvous occurs or the given instant is reached.
    At(Instant),
}

impl Deadline {
    /// A deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Deadline::At(Instant::now() + duration)
    }

    /// The remaining duration until this deadline, or `None` for `Never`.
    ///
    /// `Immediate` is treated as a zero duration; callers are expected to
    /// special-case `Immediate` ahead of calling this, since a zero-duration
    /// timeout still races the fast path instead of skipping it outright.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        match self {
            Deadline::Immediate => Some(Duration::ZERO),
            Deadline::Never => None,
            Deadline::At(instant) => Some(instant.saturating_duration_since(Instant::now())),
        }
    }
}
