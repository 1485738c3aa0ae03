//! The sending half of a rendezvous pair.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_time::future::FutureExt as _;

use crate::deadline::Deadline;
use crate::error::{ChannelError, TrySendError};
use crate::half::{ClauseSlot, Pair};
use crate::storage::PairHandle;

/// The sending end of a rendezvous pair.
///
/// A `send` only completes once a matching [`Receiver::recv`](crate::Receiver::recv)
/// is simultaneously ready; there is no buffering. `Sender` is not `Clone`:
/// exactly one task may hold the send end of a given pair.
pub struct Sender<'a> {
    pub(crate) handle: PairHandle<'a>,
}

impl<'a> Sender<'a> {
    pub(crate) fn pair(&self) -> &Pair {
        self.handle.pair()
    }

    /// Attempts to send `val` without suspending.
    ///
    /// Fails with [`TrySendError::WouldBlock`] if no receiver is currently
    /// waiting, rather than enqueuing the message for later delivery — this
    /// channel never buffers.
    pub fn try_send(&self, val: &[u8]) -> Result<(), TrySendError> {
        match self.pair().try_send(1, val) {
            Some(Ok(_)) => Ok(()),
            Some(Err(ChannelError::PeerClosed)) => Err(TrySendError::PeerClosed),
            Some(Err(ChannelError::SizeMismatch)) => Err(TrySendError::SizeMismatch),
            Some(Err(_)) => unreachable!("fast path only yields PeerClosed or SizeMismatch"),
            None => Err(TrySendError::WouldBlock),
        }
    }

    /// Sends `val`, suspending until a receiver is ready.
    ///
    /// Equivalent to `send_deadline(val, Deadline::Never)`.
    pub async fn send(&self, val: &[u8]) -> Result<(), ChannelError> {
        self.send_deadline(val, Deadline::Never).await
    }

    /// Sends `val`, suspending until a receiver is ready, the task is
    /// cancelled (by dropping the returned future), or `deadline` elapses.
    pub async fn send_deadline(&self, val: &[u8], deadline: Deadline) -> Result<(), ChannelError> {
        match deadline {
            Deadline::Immediate => self.try_send(val).map_err(Into::into),
            Deadline::Never => SendFuture::new(self, val).await,
            Deadline::At(_) => {
                let remaining = deadline.remaining().unwrap();
                match SendFuture::new(self, val)
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
    /// it was already done, otherwise wakes every currently queued receiver
    /// (and every future one) with `PeerClosed`.
    ///
    /// This does not close the descriptor; it is purely a one-shot signal
    /// that no further messages will be sent. Call [`Sender::close`]
    /// (or simply drop the `Sender`) to release it.
    pub fn done(&self) -> Result<(), ChannelError> {
        self.pair().set_done(1)
    }

    /// Closes this descriptor.
    ///
    /// If the receive end is still open this only marks the send end closed;
    /// any receiver blocked on this pair is *not* woken (use [`Sender::done`]
    /// for that). Once both ends are closed, every queued waiter on either
    /// half is woken with `PeerClosed`. Idempotent and cannot fail.
    pub fn close(&self) {
        self.pair().close_half(0);
    }
}

impl<'a> Drop for Sender<'a> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'a> fmt::Debug for Sender<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// The future returned by `Sender::send`/`send_deadline`'s inner suspend.
pub(crate) struct SendFuture<'a, 'b> {
    sender: &'b Sender<'a>,
    val: &'b [u8],
    seq: u64,
    slot: Option<Arc<ClauseSlot>>,
}

impl<'a, 'b> SendFuture<'a, 'b> {
    pub(crate) fn new(sender: &'b Sender<'a>, val: &'b [u8]) -> Self {
        SendFuture {
            sender,
            val,
            seq: sender.pair().next_seq(),
            slot: None,
        }
    }
}

impl<'a, 'b> Future for SendFuture<'a, 'b> {
    type Output = Result<(), ChannelError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(slot) = &this.slot {
            slot.register(cx.waker());
            if let Some(outcome) = slot.take_outcome() {
                this.slot = None;
                return Poll::Ready(outcome.map(|_| ()));
            }
            return Poll::Pending;
        }

        if let Some(outcome) = this.sender.pair().try_send(1, this.val) {
            return Poll::Ready(outcome.map(|_| ()));
        }

        let slot = Arc::new(ClauseSlot::new_send(this.val));
        match this
            .sender
            .pair()
            .enqueue_send(1, this.seq, &slot, this.val, cx.waker())
        {
            Some(outcome) => Poll::Ready(outcome.map(|_| ())),
            None => {
                this.slot = Some(slot);
                Poll::Pending
            }
        }
    }
}

impl<'a, 'b> Drop for SendFuture<'a, 'b> {
    fn drop(&mut self) {
        if self.slot.is_some() {
            self.sender.pair().cancel_send(1, self.seq);
        }
    }
}
