use core::sync::atomic::Ordering::*;
use core::sync::atomic::{AtomicBool, AtomicUsize};

use crossbeam_utils::Backoff;

use super::RawLock;

/// A test-and-test-and-set spin lock.
///
/// One byte of state, which makes it the default per-node lock of the fine-grained sets.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

unsafe impl RawLock for SpinLock {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();

        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Acquire, Relaxed)
                .is_ok()
            {
                return;
            }

            while self.locked.load(Relaxed) {
                backoff.snooze();
            }
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.locked.store(false, Release);
    }
}

/// A FIFO ticket lock.
#[derive(Debug, Default)]
pub struct TicketLock {
    serving: AtomicUsize,
    next: AtomicUsize,
}

unsafe impl RawLock for TicketLock {
    type Token = usize;

    fn lock(&self) -> usize {
        let ticket = self.next.fetch_add(1, Relaxed);
        let backoff = Backoff::new();

        while self.serving.load(Acquire) != ticket {
            backoff.snooze();
        }

        ticket
    }

    unsafe fn unlock(&self, ticket: usize) {
        self.serving.store(ticket.wrapping_add(1), Release);
    }
}
