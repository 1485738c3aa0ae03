//! The twin-queue state machine shared by a `Sender`/`Receiver` pair.
//!
//! A [`Pair`] holds two [`Half`]s, indexed `0` and `1`. By convention a
//! `Sender` owns half `0` and a `Receiver` owns half `1`; send operates on
//! the sibling half (the orientation rule from the source), receive operates
//! directly on its own half. Both therefore act on half `1`'s queues, which
//! is the only half ever populated by the public API — half `0` only matters
//! for `done`/`close` bookkeeping on the send side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use diatomic_waker::primitives::DiatomicWaker;

use crate::error::ChannelError;
use crate::loom_exports::sync::Mutex;
use crate::loom_exports::debug_or_loom_assert;

/// Outcome written into a [`ClauseSlot`] once its clause is resolved.
pub(crate) type Outcome = Result<usize, ChannelError>;

/// Which end of a message transfer a queued clause represents.
#[derive(Clone, Copy)]
pub(crate) enum ClauseBuf {
    /// Read-only payload supplied by a suspended `send`.
    Send(*const u8, usize),
    /// Caller-owned buffer to be filled by a suspended `recv`.
    Recv(*mut u8, usize),
}

// Safety: the pointed-to buffer is only ever touched while the owning
// `Pair`'s mutex is held, by the single matching/teardown path that dequeues
// this clause; the suspended future that created the slot does not touch the
// buffer again until it observes `outcome` set, which only happens after
// that access has completed.
unsafe impl Send for ClauseBuf {}
unsafe impl Sync for ClauseBuf {}

impl ClauseBuf {
    fn len(&self) -> usize {
        match *self {
            ClauseBuf::Send(_, len) => len,
            ClauseBuf::Recv(_, len) => len,
        }
    }
}

/// The waiting-clause record: one per suspended `send`/`recv`/`choose`-arm.
///
/// Stands in for the source's stack-allocated clause record (§3, §9): the
/// `Arc` is kept alive by both the queue entry and the suspended `Future`,
/// and is only ever mutated while the owning `Pair`'s mutex is held.
pub(crate) struct ClauseSlot {
    waker: DiatomicWaker,
    outcome: Mutex<Option<Outcome>>,
    buf: ClauseBuf,
}

impl ClauseSlot {
    pub(crate) fn new_send(val: &[u8]) -> Self {
        ClauseSlot {
            waker: DiatomicWaker::new(),
            outcome: Mutex::new(None),
            buf: ClauseBuf::Send(val.as_ptr(), val.len()),
        }
    }

    pub(crate) fn new_recv(buf: &mut [u8]) -> Self {
        ClauseSlot {
            waker: DiatomicWaker::new(),
            outcome: Mutex::new(None),
            buf: ClauseBuf::Recv(buf.as_mut_ptr(), buf.len()),
        }
    }

    /// Registers the waker of the task currently polling this clause.
    ///
    /// # Safety
    ///
    /// Must not be called concurrently from more than one task for the same
    /// slot; this holds because each `ClauseSlot` is privately owned by
    /// exactly one suspended `Future`.
    pub(crate) fn register(&self, waker: &std::task::Waker) {
        unsafe { self.waker.register(waker) };
    }

    /// Takes the outcome if the matching/teardown path has already resolved
    /// this clause.
    pub(crate) fn take_outcome(&self) -> Option<Outcome> {
        self.outcome.lock().unwrap().take()
    }

    /// Resolves this clause and wakes whoever is polling it. Called only
    /// while the owning `Pair`'s mutex is held.
    fn resolve(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = Some(outcome);
        self.waker.notify();
    }
}

/// A clause linked into one of a [`Half`]'s queues.
pub(crate) struct QueuedClause {
    seq: u64,
    slot: Arc<ClauseSlot>,
}

/// One side of a rendezvous pair.
///
/// Field names mirror spec.md §3 directly: `in_queue`/`out_queue` are the
/// `in`/`out` FIFOs, `done` is the one-shot peer-closed flag, `closed` is
/// this half's own close-by-user flag.
#[derive(Default)]
pub(crate) struct Half {
    in_queue: VecDeque<QueuedClause>,
    out_queue: VecDeque<QueuedClause>,
    done: bool,
    closed: bool,
}

/// The contiguous two-half allocation shared by a `Sender`/`Receiver` pair.
///
/// A single mutex guards both halves' queues and flags, matching the port
/// note in spec.md §9 ("wrap each pair in a mutex... held across fast-path
/// and enqueue").
pub(crate) struct Pair {
    halves: Mutex<[Half; 2]>,
    seq: AtomicU64,
}

impl Pair {
    pub(crate) fn new() -> Self {
        Pair {
            halves: Mutex::new([Half::default(), Half::default()]),
            seq: AtomicU64::new(0),
        }
    }

    /// Allocates a fresh sequence number identifying a clause for cancel-by-id
    /// removal; unique across the lifetime of this pair.
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Fast-path send: attempts to rendezvous immediately against a queued
    /// receiver on `target`. `None` means no receiver was waiting and the
    /// caller must enqueue.
    pub(crate) fn try_send(&self, target: usize, val: &[u8]) -> Option<Outcome> {
        let mut halves = self.halves.lock().unwrap();
        try_send_locked(&mut halves, target, val)
    }

    /// Fast-path receive, symmetric to [`Pair::try_send`].
    pub(crate) fn try_recv(&self, target: usize, buf: &mut [u8]) -> Option<Outcome> {
        let mut halves = self.halves.lock().unwrap();
        try_recv_locked(&mut halves, target, buf)
    }

    /// Registers `slot`'s waker and enqueues it on `target`'s `out_queue`,
    /// re-checking the fast path under the same lock so no wakeup can be
    /// missed between the caller's own fast-path check and this enqueue.
    pub(crate) fn enqueue_send(
        &self,
        target: usize,
        seq: u64,
        slot: &Arc<ClauseSlot>,
        val: &[u8],
        waker: &std::task::Waker,
    ) -> Option<Outcome> {
        let mut halves = self.halves.lock().unwrap();
        slot.register(waker);
        if let Some(outcome) = try_send_locked(&mut halves, target, val) {
            return Some(outcome);
        }
        halves[target].out_queue.push_back(QueuedClause {
            seq,
            slot: slot.clone(),
        });
        debug_or_loom_assert!(
            halves[target].in_queue.is_empty() || halves[target].out_queue.is_empty()
        );
        None
    }

    /// Registers `slot`'s waker and enqueues it on `target`'s `in_queue`,
    /// symmetric to [`Pair::enqueue_send`].
    pub(crate) fn enqueue_recv(
        &self,
        target: usize,
        seq: u64,
        slot: &Arc<ClauseSlot>,
        buf: &mut [u8],
        waker: &std::task::Waker,
    ) -> Option<Outcome> {
        let mut halves = self.halves.lock().unwrap();
        slot.register(waker);
        if let Some(outcome) = try_recv_locked(&mut halves, target, buf) {
            return Some(outcome);
        }
        halves[target].in_queue.push_back(QueuedClause {
            seq,
            slot: slot.clone(),
        });
        debug_or_loom_assert!(
            halves[target].in_queue.is_empty() || halves[target].out_queue.is_empty()
        );
        None
    }

    /// Unlinks a previously enqueued send clause, e.g. on cancellation. A
    /// no-op if it was already dequeued by a match, `done` or `close`.
    pub(crate) fn cancel_send(&self, target: usize, seq: u64) {
        let mut halves = self.halves.lock().unwrap();
        halves[target].out_queue.retain(|q| q.seq != seq);
    }

    /// Unlinks a previously enqueued receive clause, symmetric to
    /// [`Pair::cancel_send`].
    pub(crate) fn cancel_recv(&self, target: usize, seq: u64) {
        let mut halves = self.halves.lock().unwrap();
        halves[target].in_queue.retain(|q| q.seq != seq);
    }

    /// Sets `done` on `target` and drains both of its queues with
    /// `PeerClosed`. Fails `PeerClosed` if `target` was already done.
    pub(crate) fn set_done(&self, target: usize) -> Result<(), ChannelError> {
        let mut halves = self.halves.lock().unwrap();
        if halves[target].done {
            return Err(ChannelError::PeerClosed);
        }
        halves[target].done = true;
        drain(&mut halves[target]);
        Ok(())
    }

    /// Closes `target`. If the sibling half is already closed, this is the
    /// final close: both halves' queues are drained with `PeerClosed`.
    /// Idempotent: closing an already-closed half a second time is a no-op.
    pub(crate) fn close_half(&self, target: usize) {
        let mut halves = self.halves.lock().unwrap();
        halves[target].closed = true;
        let sibling = 1 - target;
        if halves[sibling].closed {
            drain(&mut halves[0]);
            drain(&mut halves[1]);
        }
    }
}

fn drain(half: &mut Half) {
    for q in half.in_queue.drain(..) {
        q.slot.resolve(Err(ChannelError::PeerClosed));
    }
    for q in half.out_queue.drain(..) {
        q.slot.resolve(Err(ChannelError::PeerClosed));
    }
}

fn try_send_locked(halves: &mut [Half; 2], target: usize, val: &[u8]) -> Option<Outcome> {
    if halves[target].done || (halves[0].closed && halves[1].closed) {
        return Some(Err(ChannelError::PeerClosed));
    }
    let receiver = halves[target].in_queue.pop_front()?;
    let slot = receiver.slot;
    if slot.buf.len() != val.len() {
        slot.resolve(Err(ChannelError::SizeMismatch));
        return Some(Err(ChannelError::SizeMismatch));
    }
    match slot.buf {
        ClauseBuf::Recv(ptr, len) => {
            // Safety: `ptr`/`len` describe the live buffer of the suspended
            // `recv` that enqueued this clause; it has not been touched
            // since, and the lengths were just checked equal.
            unsafe { std::ptr::copy_nonoverlapping(val.as_ptr(), ptr, len) };
        }
        ClauseBuf::Send(..) => unreachable!("in_queue only holds recv clauses"),
    }
    let len = val.len();
    slot.resolve(Ok(len));
    Some(Ok(len))
}

fn try_recv_locked(halves: &mut [Half; 2], target: usize, buf: &mut [u8]) -> Option<Outcome> {
    if halves[target].done || (halves[0].closed && halves[1].closed) {
        return Some(Err(ChannelError::PeerClosed));
    }
    let sender = halves[target].out_queue.pop_front()?;
    let slot = sender.slot;
    if slot.buf.len() != buf.len() {
        slot.resolve(Err(ChannelError::SizeMismatch));
        return Some(Err(ChannelError::SizeMismatch));
    }
    match slot.buf {
        ClauseBuf::Send(ptr, len) => {
            // Safety: `ptr`/`len` describe the live payload of the suspended
            // `send` that enqueued this clause; it has not been touched
            // since, and the lengths were just checked equal.
            unsafe { std::ptr::copy_nonoverlapping(ptr, buf.as_mut_ptr(), len) };
        }
        ClauseBuf::Recv(..) => unreachable!("out_queue only holds send clauses"),
    }
    let len = buf.len();
    slot.resolve(Ok(len));
    Some(Ok(len))
}
