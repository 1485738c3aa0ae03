//! Pair construction: heap-allocated and caller-supplied storage.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ChannelError;
use crate::half::Pair;
use crate::receiver::Receiver;
use crate::sender::Sender;

/// Caller-owned storage for an in-place rendezvous pair.
///
/// Stands in for the source's "supply your own memory block" constructor
/// (spec.md §4.1): a `PairStorage` can live on the stack, in a `static`, or
/// anywhere else the caller chooses, and [`pair_in`] borrows from it rather
/// than allocating. A `PairStorage` may back at most one live pair; a second
/// [`pair_in`] call on the same storage fails with
/// [`ChannelError::InvalidArgument`] rather than silently aliasing a pair
/// that is still (or was ever) in use — channels are not reopenable
/// (spec.md §1 Non-goals), so reuse is rejected rather than given
/// unspecified behavior.
pub struct PairStorage {
    pair: Pair,
    used: AtomicBool,
}

impl Default for PairStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl PairStorage {
    /// Creates storage for one rendezvous pair, not yet bound to any
    /// `Sender`/`Receiver`.
    pub fn new() -> Self {
        PairStorage {
            pair: Pair::new(),
            used: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for PairStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairStorage").finish_non_exhaustive()
    }
}

/// Either an owned, heap-allocated pair or a borrow of caller-supplied
/// [`PairStorage`] — the two constructors of spec.md §4.1 unified behind one
/// type so `Sender`/`Receiver` don't need to be generic over it.
#[derive(Clone)]
pub(crate) enum PairHandle<'a> {
    Owned(Arc<PairStorage>),
    Borrowed(&'a PairStorage),
}

impl<'a> PairHandle<'a> {
    pub(crate) fn pair(&self) -> &Pair {
        match self {
            PairHandle::Owned(storage) => &storage.pair,
            PairHandle::Borrowed(storage) => &storage.pair,
        }
    }
}

/// Creates a rendezvous pair backed by heap-allocated storage.
///
/// The storage is released once both the `Sender` and the `Receiver` have
/// been dropped — there is no separate deallocation step to call, unlike
/// the source's `owns_storage`-gated free in `close` (spec.md §3 invariant
/// 4, §4.6): since neither handle is `Clone`, "both closed" and "both
/// dropped" coincide, so `Arc`'s own strong-count-to-zero drop glue already
/// implements that invariant.
pub fn pair() -> (Sender<'static>, Receiver<'static>) {
    let storage = Arc::new(PairStorage::new());
    storage.used.store(true, Ordering::Relaxed);
    let handle = PairHandle::Owned(storage);
    (
        Sender {
            handle: handle.clone(),
        },
        Receiver { handle },
    )
}

/// Creates a rendezvous pair borrowing `storage`.
///
/// No allocation occurs and nothing is ever freed by this library; the
/// pair's lifetime is bounded by `storage`'s. Fails with
/// [`ChannelError::InvalidArgument`] if `storage` already backs a pair.
pub fn pair_in(storage: &PairStorage) -> Result<(Sender<'_>, Receiver<'_>), ChannelError> {
    if storage.used.swap(true, Ordering::Relaxed) {
        return Err(ChannelError::InvalidArgument);
    }
    let handle = PairHandle::Borrowed(storage);
    Ok((
        Sender {
            handle: handle.clone(),
        },
        Receiver { handle },
    ))
}
