//! The receiving half of a rendezvous pair.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_time::future::FutureExt as _;

use crate::deadline::Deadline;
use crate::error::{ChannelError, TryRecvError};
use crate::half::{ClauseSlot, Pair};
use crate::storage::PairHandle;

/// The receiving end of a rendezvous pair.
///
/// A `recv` only completes once a matching [`Sender::send`](crate::Sender::send)
/// is simultaneously ready; there is no buffering. `Receiver` is not `Clone`:
/// exactly one task may hold the receive end of a given pair.
pub struct Receiver<'a> {
    pub(crate) handle: PairHandle<'a>,
}

impl<'a> Receiver<'a> {
    pub(crate) fn pair(&self) -> &Pair {
        self.handle.pair()
    }

    /// Attempts to receive into `buf` without suspending.
    ///
    /// Fails with [`TryRecvError::WouldBlock`] if no sender is currently
    /// waiting.
    pub fn try_recv(&self, buf: &mut [u8]) -> Result<usize, TryRecvError> {
        match self.pair().try_recv(1, buf) {
            Some(Ok(len)) => Ok(len),
            Some(Err(ChannelError::PeerClosed)) => Err(TryRecvError::PeerClosed),
            Some(Err(ChannelError::SizeMismatch)) => Err(TryRecvError::SizeMismatch),
            Some(Err(_)) => unreachable!("fast path only yields PeerClosed or SizeMismatch"),
            None => Err(TryRecvError::WouldBlock),
        }
    }

    /// Receives into `buf`, suspending until a sender is ready.
    ///
    /// Equivalent to `recv_deadline(buf, Deadline::Never)`.
    pub async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.recv_deadline(buf, Deadline::Never).await
    }

    /// Receives into `buf`, suspending until a sender is ready, the task is
    /// cancelled (by dropping the returned future), or `deadline` elapses.
    pub async fn recv_deadline(
        &mut self,
        buf: &mut [u8],
        deadline: Deadline,
    ) -> Result<usize, ChannelError> {
        match deadline {
            Deadline::Immediate => self.try_recv(buf).map_err(Into::into),
            Deadline::Never => RecvFuture::new(self, buf).await,
            Deadline::At(_) => {
                let remaining = deadline.remaining().unwrap();
                match RecvFuture::new(self, buf)
                    .timeout(futures_time::time::Duration::from(remaining))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => Err(ChannelError::Timeout),
                }
            }
        }
    }

    /// Marks this direction done: fails with [`ChannelError::PeerClosed`] if
    /// it was already done, otherwise wakes every currently queued sender
    /// (and every future one) with `PeerClosed`.
    ///
    /// Mirrors [`Sender::done`](crate::Sender::done)'s orientation rule: it
    /// operates on the sibling half, which is the otherwise-unused half `0`
    /// in this API — see spec.md §9's note on the asymmetry of `done`. Calling
    /// this has no effect on a `Sender` blocked in `send`; use
    /// [`Sender::done`](crate::Sender::done) for that.
    pub fn done(&self) -> Result<(), ChannelError> {
        self.pair().set_done(0)
    }

    /// Closes this descriptor.
    ///
    /// If the send end is still open this only marks the receive end closed;
    /// any sender blocked on this pair is *not* woken (use [`Receiver::done`]
    /// for that). Once both ends are closed, every queued waiter on either
    /// half is woken with `PeerClosed`. Idempotent and cannot fail.
    pub fn close(&self) {
        self.pair().close_half(1);
    }
}

impl<'a> Drop for Receiver<'a> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'a> fmt::Debug for Receiver<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

/// The future returned by `Receiver::recv`/`recv_deadline`'s inner suspend.
pub(crate) struct RecvFuture<'a, 'b> {
    receiver: &'b mut Receiver<'a>,
    buf: &'b mut [u8],
    seq: u64,
    slot: Option<Arc<ClauseSlot>>,
}

impl<'a, 'b> RecvFuture<'a, 'b> {
    pub(crate) fn new(receiver: &'b mut Receiver<'a>, buf: &'b mut [u8]) -> Self {
        let seq = receiver.pair().next_seq();
        RecvFuture {
            receiver,
            buf,
            seq,
            slot: None,
        }
    }
}

impl<'a, 'b> Future for RecvFuture<'a, 'b> {
    type Output = Result<usize, ChannelError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(slot) = &this.slot {
            slot.register(cx.waker());
            if let Some(outcome) = slot.take_outcome() {
                this.slot = None;
                return Poll::Ready(outcome);
            }
            return Poll::Pending;
        }

        if let Some(outcome) = this.receiver.pair().try_recv(1, this.buf) {
            return Poll::Ready(outcome);
        }

        let slot = Arc::new(ClauseSlot::new_recv(this.buf));
        match this
            .receiver
            .pair()
            .enqueue_recv(1, this.seq, &slot, this.buf, cx.waker())
        {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                this.slot = Some(slot);
                Poll::Pending
            }
        }
    }
}

impl<'a, 'b> Drop for RecvFuture<'a, 'b> {
    fn drop(&mut self) {
        if self.slot.is_some() {
            self.receiver.pair().cancel_recv(1, self.seq);
        }
    }
}

