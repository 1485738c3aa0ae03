//! Note: timer-based tests are disabled for MIRI.

use std::future::Future;
use std::mem::ManuallyDrop;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use futures_executor::block_on;
use futures_task::noop_waker;
use futures_util::pin_mut;
use rendez::{choose, pair, pair_in, ChannelError, Clause, ChooseError, Deadline, PairStorage, TryRecvError, TrySendError};

fn sleep(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

// Polling a `send` future once with no receiver ready returns `Pending` and
// dropping it cleanly unlinks the clause, leaving the pair usable afterwards.
#[test]
fn polling_once_then_dropping_unlinks_the_clause() {
    let (tx, mut rx) = pair();

    {
        let fut = tx.send(b"x");
        pin_mut!(fut);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Pending);
    }

    // The dropped future's clause must be gone, or this would deliver to a
    // buffer that no longer exists instead of matching the fresh send below.
    let th_recv = thread::spawn(move || {
        let mut buf = [0u8; 1];
        block_on(rx.recv(&mut buf))
    });
    sleep(50);
    block_on(tx.send(b"y")).unwrap();
    assert_eq!(th_recv.join().unwrap(), Ok(1));
}

// S1: a receiver suspended first is matched by a sender arriving later.
#[test]
fn direct_rendezvous() {
    let (tx, mut rx) = pair();

    let th_recv = thread::spawn(move || {
        let mut buf = [0u8; 4];
        let n = block_on(rx.recv(&mut buf)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"PING");
    });

    sleep(50);
    block_on(tx.send(b"PING")).unwrap();
    th_recv.join().unwrap();
}

// S2: mismatched lengths fail both sides; no bytes are delivered.
#[test]
fn size_mismatch_is_mutual() {
    let (tx, mut rx) = pair();

    let th_recv = thread::spawn(move || {
        let mut buf = [0u8; 8];
        block_on(rx.recv(&mut buf))
    });

    sleep(50);
    let send_result = block_on(tx.send(b"HI"));

    assert_eq!(send_result, Err(ChannelError::SizeMismatch));
    assert_eq!(th_recv.join().unwrap(), Err(ChannelError::SizeMismatch));
}

// S3: a send with no receiver and a short deadline times out.
#[test]
fn send_times_out() {
    let (tx, _rx) = pair();

    let result = block_on(tx.send_deadline(b"x", Deadline::after(Duration::from_millis(20))));
    assert_eq!(result, Err(ChannelError::Timeout));
}

// S4: `done` wakes a currently-suspended peer immediately.
#[test]
fn done_wakes_waiter() {
    let (tx, mut rx) = pair();

    let th_recv = thread::spawn(move || {
        let mut buf = [0u8; 4];
        block_on(rx.recv(&mut buf))
    });

    sleep(50);
    tx.done().unwrap();

    assert_eq!(th_recv.join().unwrap(), Err(ChannelError::PeerClosed));
    assert_eq!(block_on(tx.send(b"x")), Err(ChannelError::PeerClosed));
}

// `done` called twice on the same direction fails `PeerClosed` the second
// time, matching spec.md §4.5.
#[test]
fn done_twice_fails() {
    let (tx, _rx) = pair();
    assert_eq!(tx.done(), Ok(()));
    assert_eq!(tx.done(), Err(ChannelError::PeerClosed));
}

// S5: choose over [recv(empty), recv(ready-peer), recv(empty)] picks the
// middle clause, whose sender is already waiting, during the trial scan.
#[test]
fn choose_picks_ready_clause() {
    let (_tx_a, mut rx_a) = pair();
    let (tx_b, mut rx_b) = pair();
    let (_tx_c, mut rx_c) = pair();

    let th_send = thread::spawn(move || block_on(tx_b.send(b"a")));
    sleep(50);

    let mut buf_a = [0u8; 1];
    let mut buf_c = [0u8; 1];
    let mut buf_b = [0u8; 1];

    let result = block_on(async {
        let mut clauses = [
            Clause::Recv {
                receiver: &mut rx_a,
                buf: &mut buf_a,
            },
            Clause::Recv {
                receiver: &mut rx_b,
                buf: &mut buf_b,
            },
            Clause::Recv {
                receiver: &mut rx_c,
                buf: &mut buf_c,
            },
        ];
        choose(&mut clauses, Deadline::Never).await
    });

    assert_eq!(result, Ok(1));
    assert_eq!(buf_b, *b"a");
    th_send.join().unwrap();
}

// S6: a `choose` suspended on two empty channels resolves once a peer
// arrives on one of them.
#[test]
fn choose_suspended_wake() {
    let (tx1, mut rx1) = pair();
    let (_tx2, mut rx2) = pair();

    let th_send = thread::spawn(move || {
        sleep(30);
        block_on(tx1.send(b"a"))
    });

    let mut buf1 = [0u8; 1];
    let mut buf2 = [0u8; 1];
    let result = block_on(async {
        let mut clauses = [
            Clause::Recv {
                receiver: &mut rx1,
                buf: &mut buf1,
            },
            Clause::Recv {
                receiver: &mut rx2,
                buf: &mut buf2,
            },
        ];
        choose(&mut clauses, Deadline::after(Duration::from_millis(200))).await
    });

    assert_eq!(result, Ok(0));
    th_send.join().unwrap();
}

// A `choose` with every clause blocked and a short deadline times out.
#[test]
fn choose_times_out() {
    let (_tx1, mut rx1) = pair();
    let (_tx2, mut rx2) = pair();

    let mut buf1 = [0u8; 1];
    let mut buf2 = [0u8; 1];
    let result = block_on(async {
        let mut clauses = [
            Clause::Recv {
                receiver: &mut rx1,
                buf: &mut buf1,
            },
            Clause::Recv {
                receiver: &mut rx2,
                buf: &mut buf2,
            },
        ];
        choose(&mut clauses, Deadline::after(Duration::from_millis(20))).await
    });

    assert_eq!(result, Err(ChooseError::Timeout));
}

// Closing only one descriptor is bookkeeping, not a wakeup: a queued peer on
// the still-open side keeps waiting until the second descriptor closes too.
#[test]
fn first_close_alone_does_not_wake_peer() {
    let (tx, rx) = pair();

    tx.close();
    assert_eq!(tx.try_send(b"x"), Err(TrySendError::WouldBlock));
    assert_eq!(rx.try_recv(&mut [0u8; 1]), Err(TryRecvError::WouldBlock));
}

// S7: both descriptors closed while a send is queued wakes it with
// `PeerClosed`. Keeping the queued clause alive without running its `Drop`
// (which would unlink it) needs the same forgotten-future technique as the
// teacher's leaked-future tests; it applies here because `send`'s future only
// ever borrows `&Sender`, so `tx` stays usable for the two `close()` calls
// below.
#[test]
fn second_close_wakes_queued_waiter() {
    let (tx, rx) = pair();

    let mut fut = ManuallyDrop::new(tx.send(b"x"));
    let mut fut = unsafe { Pin::new_unchecked(&mut *fut) }; // safe: the unpinned future is shadowed.
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert_eq!(fut.as_mut().poll(&mut cx), Poll::Pending);

    rx.close();
    tx.close();

    assert_eq!(
        fut.as_mut().poll(&mut cx),
        Poll::Ready(Err(ChannelError::PeerClosed))
    );
}

// Reusing storage that already backs a pair fails `InvalidArgument`.
#[test]
fn pair_in_rejects_reuse() {
    let storage = PairStorage::new();
    let _first = pair_in(&storage).unwrap();
    assert_eq!(pair_in(&storage).unwrap_err(), ChannelError::InvalidArgument);
}

// Property 6: zero-length and ordinary payloads round-trip byte-for-byte.
#[test]
fn zero_length_roundtrip() {
    let (tx, mut rx) = pair();

    let th_recv = thread::spawn(move || {
        let mut buf = [];
        block_on(rx.recv(&mut buf))
    });

    sleep(50);
    assert_eq!(block_on(tx.send(&[])), Ok(()));
    assert_eq!(th_recv.join().unwrap(), Ok(0));
}

#[test]
fn try_send_recv_without_a_peer_would_block() {
    let (tx, rx) = pair();
    assert_eq!(tx.try_send(b"x"), Err(TrySendError::WouldBlock));
    assert_eq!(rx.try_recv(&mut [0u8; 1]), Err(TryRecvError::WouldBlock));
}

// Property 3: two senders queued in order on the same pair are matched by two
// subsequent receives in that same order.
#[test]
fn fifo_ordering_among_senders() {
    let (tx, mut rx) = pair();

    std::thread::scope(|scope| {
        let tx2 = &tx;
        let th_send_a = scope.spawn(move || block_on(tx2.send(b"a")));
        sleep(30);
        let th_send_b = scope.spawn(move || block_on(tx2.send(b"b")));
        sleep(30);

        let mut buf = [0u8; 1];
        assert_eq!(block_on(rx.recv(&mut buf)), Ok(1));
        assert_eq!(&buf, b"a");
        assert_eq!(block_on(rx.recv(&mut buf)), Ok(1));
        assert_eq!(&buf, b"b");

        th_send_a.join().unwrap().unwrap();
        th_send_b.join().unwrap().unwrap();
    });
}
