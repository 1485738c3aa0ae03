//! An unbuffered, bidirectional rendezvous channel.
//!
//! A channel is a pair of descriptors — a [`Sender`] and a [`Receiver`] —
//! obtained from [`pair`] or [`pair_in`]. `send` only completes once a
//! matching `recv` is simultaneously ready: there is no buffering, and a
//! length mismatch between the two sides fails both of them with
//! [`ChannelError::SizeMismatch`] rather than delivering a partial message.
//!
//! Besides the direct `send`/`recv` pair, [`choose`] waits on several send
//! and receive clauses — possibly spanning several channels — and completes
//! whichever one becomes ready first. [`Sender::done`]/[`Receiver::done`]
//! half-close a direction, waking any peer blocked on it with `PeerClosed`
//! without waiting for the descriptor itself to be dropped.
//!
//! # Example
//!
//! ```
//! use futures_executor::block_on;
//! use rendez::pair;
//!
//! let (tx, mut rx) = pair();
//!
//! block_on(async move {
//!     let send = tx.send(b"PING");
//!     let mut buf = [0u8; 4];
//!     let recv = rx.recv(&mut buf);
//!     let (sent, received) = futures_util::join!(send, recv);
//!     assert_eq!(sent, Ok(()));
//!     assert_eq!(received, Ok(4));
//!     assert_eq!(&buf, b"PING");
//! });
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

mod choose;
mod deadline;
mod error;
mod half;
mod loom_exports;
mod receiver;
mod sender;
mod storage;

pub use choose::{choose, Clause};
pub use deadline::Deadline;
pub use error::{ChannelError, ChooseError, TryRecvError, TrySendError};
pub use receiver::Receiver;
pub use sender::Sender;
pub use storage::{pair, pair_in, PairStorage};
