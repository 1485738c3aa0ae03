//! Error types returned by channel operations.

use std::error;
use std::fmt;

/// An error returned by a suspending `send`, `recv` or `done` call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelError {
    /// The peer direction has been marked `done`, or both descriptors of the
    /// pair have been closed.
    PeerClosed,
    /// The sender and receiver declared different payload lengths; neither
    /// side's message was delivered.
    SizeMismatch,
    /// The deadline elapsed before a rendezvous could be completed.
    Timeout,
    /// `pair_in` was called on storage that already backs a live pair.
    InvalidArgument,
}

impl error::Error for ChannelError {}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::PeerClosed => "the other direction of the channel is closed".fmt(f),
            ChannelError::SizeMismatch => {
                "sender and receiver declared different payload lengths".fmt(f)
            }
            ChannelError::Timeout => "deadline elapsed before a rendezvous occurred".fmt(f),
            ChannelError::InvalidArgument => "storage is already bound to a pair".fmt(f),
        }
    }
}

/// An error returned when an attempt to send a message non-blockingly is
/// unsuccessful.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrySendError {
    /// No receiver was waiting.
    WouldBlock,
    /// The receive direction is closed.
    PeerClosed,
    /// The queued receiver declared a different length.
    SizeMismatch,
}

impl error::Error for TrySendError {}

impl fmt::Display for TrySendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::WouldBlock => "no receiver is ready".fmt(f),
            TrySendError::PeerClosed => "the other direction of the channel is closed".fmt(f),
            TrySendError::SizeMismatch => {
                "sender and receiver declared different payload lengths".fmt(f)
            }
        }
    }
}

impl From<TrySendError> for ChannelError {
    fn from(e: TrySendError) -> Self {
        match e {
            TrySendError::WouldBlock => ChannelError::Timeout,
            TrySendError::PeerClosed => ChannelError::PeerClosed,
            TrySendError::SizeMismatch => ChannelError::SizeMismatch,
        }
    }
}

/// An error returned when an attempt to receive a message non-blockingly is
/// unsuccessful.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TryRecvError {
    /// No sender was waiting.
    WouldBlock,
    /// The receive direction is closed.
    PeerClosed,
    /// The queued sender declared a different length.
    SizeMismatch,
}

impl error::Error for TryRecvError {}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::WouldBlock => "no sender is ready".fmt(f),
            TryRecvError::PeerClosed => "the other direction of the channel is closed".fmt(f),
            TryRecvError::SizeMismatch => {
                "sender and receiver declared different payload lengths".fmt(f)
            }
        }
    }
}

impl From<TryRecvError> for ChannelError {
    fn from(e: TryRecvError) -> Self {
        match e {
            TryRecvError::WouldBlock => ChannelError::Timeout,
            TryRecvError::PeerClosed => ChannelError::PeerClosed,
            TryRecvError::SizeMismatch => ChannelError::SizeMismatch,
        }
    }
}

/// An error returned by [`choose`](crate::choose).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChooseError {
    /// No clause could be satisfied before the deadline elapsed.
    Timeout,
    /// The clause at `index` failed immediately, or was the first to report
    /// an error after suspension.
    Failed {
        /// Position of the failing clause in the slice passed to `choose`.
        index: usize,
        /// The reason the clause failed.
        error: ChannelError,
    },
}

impl error::Error for ChooseError {}

impl fmt::Display for ChooseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChooseError::Timeout => "deadline elapsed before any clause was ready".fmt(f),
            ChooseError::Failed { index, error } => {
                write!(f, "clause {index} failed: {error}")
            }
        }
    }
}
