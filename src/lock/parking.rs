use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::thread::{self, Thread};

use crossbeam_utils::{Backoff, CachePadded};

use super::RawLock;

struct Waiter {
    thread: Thread,
    locked: AtomicBool,
    next: AtomicPtr<CachePadded<Waiter>>,
}

/// The queue node of the holder.
#[derive(Debug)]
pub struct Token(*mut CachePadded<Waiter>);

/// An MCS queue lock whose waiters park instead of spinning.
///
/// Waiters are served in FIFO order and sleep while queued, so a long critical section (such as a
/// coarse-grained set doing inner work) does not burn the CPUs of every other thread. This is the
/// default lock of the coarse-grained sets.
#[derive(Debug)]
pub struct McsParkingLock {
    tail: AtomicPtr<CachePadded<Waiter>>,
}

impl Waiter {
    fn new() -> Self {
        Self {
            thread: thread::current(),
            locked: AtomicBool::new(true),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl Default for McsParkingLock {
    fn default() -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

unsafe impl RawLock for McsParkingLock {
    type Token = Token;

    fn lock(&self) -> Token {
        let node = Box::into_raw(Box::new(CachePadded::new(Waiter::new())));
        let prev = self.tail.swap(node, Ordering::AcqRel);

        if prev.is_null() {
            return Token(node);
        }

        // SAFETY: `prev` is owned by the thread queued before us, which frees it only after it has
        // handed the lock over through `next`.
        unsafe { (&*prev).next.store(node, Ordering::Release) };

        // SAFETY: `node` is ours until our own `unlock`.
        let waiter = unsafe { &*node };
        while waiter.locked.load(Ordering::Acquire) {
            thread::park();
        }

        Token(node)
    }

    unsafe fn unlock(&self, token: Token) {
        let node = token.0;

        // SAFETY: the token's node stays alive until it is freed below.
        let mut next = unsafe { (&*node).next.load(Ordering::Acquire) };

        if next.is_null() {
            if self
                .tail
                .compare_exchange(node, ptr::null_mut(), Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: no successor exists, so nobody else refers to `node`.
                drop(unsafe { Box::from_raw(node) });
                return;
            }

            // A successor swapped itself into `tail` but has not linked itself yet.
            let backoff = Backoff::new();
            loop {
                // SAFETY: as above.
                next = unsafe { (&*node).next.load(Ordering::Acquire) };
                if !next.is_null() {
                    break;
                }
                backoff.snooze();
            }
        }

        // SAFETY: the successor is linked, and it never touches our node again.
        drop(unsafe { Box::from_raw(node) });

        // SAFETY: the successor's node lives until it releases the lock, which it cannot do
        // before we hand it over here. Its `Thread` handle is cloned before the hand-over.
        let successor = unsafe { &*next };
        let thread = successor.thread.clone();
        successor.locked.store(false, Ordering::Release);
        thread.unpark();
    }
}

#[cfg(test)]
mod tests {
    use super::super::api;
    use super::McsParkingLock;

    #[test]
    fn smoke() {
        api::tests::smoke::<McsParkingLock>();
    }
}
