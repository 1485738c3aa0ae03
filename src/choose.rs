//! Multi-way select over a mix of send and receive clauses.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_time::future::FutureExt as _;

use crate::deadline::Deadline;
use crate::error::{ChannelError, ChooseError};
use crate::half::{ClauseSlot, Outcome};
use crate::receiver::Receiver;
use crate::sender::Sender;

/// One arm of a [`choose`] call.
pub enum Clause<'c, 's> {
    /// Attempt to send `val` on `sender`.
    Send {
        /// The channel to send on.
        sender: &'c Sender<'s>,
        /// The payload to send.
        val: &'c [u8],
    },
    /// Attempt to receive into `buf` from `receiver`.
    Recv {
        /// The channel to receive from.
        receiver: &'c mut Receiver<'s>,
        /// The buffer to receive into.
        buf: &'c mut [u8],
    },
}

impl<'c, 's> Clause<'c, 's> {
    fn try_fast(&mut self) -> Option<Outcome> {
        match self {
            Clause::Send { sender, val } => sender.pair().try_send(1, val),
            Clause::Recv { receiver, buf } => receiver.pair().try_recv(1, buf),
        }
    }

    fn enqueue(&mut self, seq: u64, slot: &Arc<ClauseSlot>, waker: &std::task::Waker) -> Option<Outcome> {
        match self {
            Clause::Send { sender, val } => sender.pair().enqueue_send(1, seq, slot, val, waker),
            Clause::Recv { receiver, buf } => receiver.pair().enqueue_recv(1, seq, slot, buf, waker),
        }
    }

    fn cancel(&self, seq: u64) {
        match self {
            Clause::Send { sender, .. } => sender.pair().cancel_send(1, seq),
            Clause::Recv { receiver, .. } => receiver.pair().cancel_recv(1, seq),
        }
    }

    /// Draws a fresh sequence number from this clause's own pair. Each
    /// pair's counter is independent, so a seq is only ever unique among
    /// clauses enqueued on that same pair — never shared across clauses in
    /// the same `choose` call.
    fn next_seq(&self) -> u64 {
        match self {
            Clause::Send { sender, .. } => sender.pair().next_seq(),
            Clause::Recv { receiver, .. } => receiver.pair().next_seq(),
        }
    }

    fn new_slot(&mut self) -> ClauseSlot {
        match self {
            Clause::Send { val, .. } => ClauseSlot::new_send(val),
            Clause::Recv { buf, .. } => ClauseSlot::new_recv(buf),
        }
    }
}

/// Waits on several send/receive clauses at once, completing the first one
/// that becomes ready.
///
/// Mirrors spec.md §4.4: a deterministic left-to-right trial scan first (no
/// suspension, no allocation, so `Deadline::Immediate` never touches a
/// clause's queue), then, only if nothing matched, every clause is enqueued
/// and the call suspends until one fires or `deadline` elapses. On success,
/// returns the index of the satisfied clause; `val`/`buf` for the other
/// clauses are left untouched.
///
/// The source's own validation pass (null buffer, unknown op) has no
/// counterpart here: `Clause` is a two-variant enum (no "unknown op" is
/// constructible) and Rust slices can't be null, so that step of the trial
/// phase is vacuously satisfied by the type system.
pub async fn choose(clauses: &mut [Clause<'_, '_>], deadline: Deadline) -> Result<usize, ChooseError> {
    for (index, clause) in clauses.iter_mut().enumerate() {
        if let Some(outcome) = clause.try_fast() {
            return match outcome {
                Ok(_) => Ok(index),
                Err(error) => Err(ChooseError::Failed { index, error }),
            };
        }
    }

    if matches!(deadline, Deadline::Immediate) {
        return Err(ChooseError::Timeout);
    }

    let fut = ChooseFuture::new(clauses);
    match deadline {
        Deadline::Never => fut.await,
        Deadline::Immediate => unreachable!("handled above"),
        Deadline::At(_) => {
            let remaining = deadline.remaining().unwrap();
            match fut.timeout(futures_time::time::Duration::from(remaining)).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => Err(ChooseError::Timeout),
            }
        }
    }
}

struct ChooseFuture<'a, 'c, 's> {
    clauses: &'a mut [Clause<'c, 's>],
    // Each enqueued clause keeps the seq it was given by its own pair: pairs
    // have independent counters, so a seq is only meaningful paired with the
    // clause (and thus the pair) it was drawn for.
    slots: Vec<Option<(u64, Arc<ClauseSlot>)>>,
    enqueued: bool,
}

impl<'a, 'c, 's> ChooseFuture<'a, 'c, 's> {
    fn new(clauses: &'a mut [Clause<'c, 's>]) -> Self {
        let len = clauses.len();
        ChooseFuture {
            clauses,
            slots: (0..len).map(|_| None).collect(),
            enqueued: false,
        }
    }

    fn cancel_all(&self) {
        for (clause, slot) in self.clauses.iter().zip(self.slots.iter()) {
            if let Some((seq, _)) = slot {
                clause.cancel(*seq);
            }
        }
    }
}

impl<'a, 'c, 's> Future for ChooseFuture<'a, 'c, 's> {
    type Output = Result<usize, ChooseError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.enqueued {
            this.enqueued = true;

            for (index, clause) in this.clauses.iter_mut().enumerate() {
                let seq = clause.next_seq();
                let slot = Arc::new(clause.new_slot());
                match clause.enqueue(seq, &slot, cx.waker()) {
                    Some(outcome) => {
                        this.slots[index] = None;
                        // A clause matched in the gap between the trial scan
                        // and this enqueue; cancel whichever earlier clauses
                        // in this same call already got linked, each with
                        // the seq it was itself given.
                        for (earlier, earlier_slot) in
                            this.clauses[..index].iter().zip(this.slots[..index].iter())
                        {
                            if let Some((earlier_seq, _)) = earlier_slot {
                                earlier.cancel(*earlier_seq);
                            }
                        }
                        return Poll::Ready(match outcome {
                            Ok(_) => Ok(index),
                            Err(error) => Err(ChooseError::Failed { index, error }),
                        });
                    }
                    None => this.slots[index] = Some((seq, slot)),
                }
            }
        }

        for (index, slot) in this.slots.iter().enumerate() {
            if let Some((_, slot)) = slot {
                slot.register(cx.waker());
                if let Some(outcome) = slot.take_outcome() {
                    this.slots[index] = None;
                    this.cancel_all();
                    return Poll::Ready(match outcome {
                        Ok(_) => Ok(index),
                        Err(error) => Err(ChooseError::Failed { index, error }),
                    });
                }
            }
        }

        Poll::Pending
    }
}

impl<'a, 'c, 's> Drop for ChooseFuture<'a, 'c, 's> {
    fn drop(&mut self) {
        if self.enqueued {
            self.cancel_all();
        }
    }
}
