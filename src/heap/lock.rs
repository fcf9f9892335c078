//! The allocator's futex-like lock.
//!
//! The lock word lives inside the shared heap bytes (offset 8, see [`super::LOCK_OFFSET`]),
//! so it cannot be a `std::sync::Mutex` — there is no local `Mutex` object to put it in.
//! `parking_lot_core::park`/`unpark_one` are the generic "park/unpark keyed by an address"
//! primitives `parking_lot` itself is built on, which is exactly the shape needed here.

use std::sync::atomic::{AtomicU32, Ordering};

const SPIN_ITERS: u32 = 100;

/// Acquires the lock word at `word`, spinning briefly before parking.
pub(super) fn lock(word: &AtomicU32) {
    for _ in 0..SPIN_ITERS {
        if try_lock(word) {
            return;
        }
        std::hint::spin_loop();
    }
    loop {
        if try_lock(word) {
            return;
        }
        let key = word as *const AtomicU32 as usize;
        // SAFETY: `validate` re-reads `word` right before parking, so we only sleep if the
        // lock is still held; `unlock` below wakes us via the same key.
        unsafe {
            parking_lot_core::park(
                key,
                || word.load(Ordering::SeqCst) == 1,
                || {},
                |_, _| {},
                parking_lot_core::ParkToken(0),
                None,
            );
        }
    }
}

fn try_lock(word: &AtomicU32) -> bool {
    word.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).is_ok()
}

/// Releases the lock word at `word` and wakes one waiter, if any.
pub(super) fn unlock(word: &AtomicU32) {
    word.store(0, Ordering::SeqCst);
    let key = word as *const AtomicU32 as usize;
    // SAFETY: `key` matches the address used in `lock`'s `park` call above.
    unsafe {
        parking_lot_core::unpark_one(key, |_| parking_lot_core::UnparkToken(0));
    }
}
