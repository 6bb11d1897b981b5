use core::cell::UnsafeCell;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

/// Raw lock interface.
///
/// # Safety
///
/// Implementations must be exclusive: `lock` may not return while another token of the same lock
/// is outstanding, and `unlock` must happen-before the `lock` that follows it.
pub unsafe trait RawLock: Default + Send + Sync {
    /// Proof of acquisition, handed back on release.
    ///
    /// Not required to be `Send`/`Sync`; [`LockGuard`] restricts itself accordingly.
    type Token;

    /// Acquires the lock, blocking or spinning until it is available.
    fn lock(&self) -> Self::Token;

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// `token` must come from a [`RawLock::lock`] call on `self` that has not been released yet.
    unsafe fn unlock(&self, token: Self::Token);
}

/// Data of type `T` protected by the raw lock `L`.
#[derive(Debug, Default)]
pub struct Lock<L: RawLock, T> {
    inner: L,
    data: UnsafeCell<T>,
}

// Send is automatically implemented for Lock.

// SAFETY: `&T` and `&mut T` are only reachable through a guard, and guards are exclusive.
unsafe impl<L: RawLock, T: Send> Sync for Lock<L, T> {}

impl<L: RawLock, T> Lock<L, T> {
    /// Creates a new, unlocked lock around `data`.
    pub fn new(data: T) -> Self {
        Self {
            inner: L::default(),
            data: UnsafeCell::new(data),
        }
    }

    /// Destroys the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns the protected value without locking; `&mut self` already proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Acquires the lock.
    pub fn lock(&self) -> LockGuard<'_, L, T> {
        let token = self.inner.lock();
        LockGuard {
            lock: self,
            token: ManuallyDrop::new(token),
        }
    }
}

/// Scoped access to the data of a [`Lock`]. The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard<'s, L: RawLock, T> {
    lock: &'s Lock<L, T>,
    token: ManuallyDrop<L::Token>,
}

// SAFETY: owning the guard means owning the token and exclusive access to `T`.
unsafe impl<L: RawLock, T: Send> Send for LockGuard<'_, L, T> where L::Token: Send {}

// SAFETY: sharing the guard only shares `&T`.
unsafe impl<L: RawLock, T: Sync> Sync for LockGuard<'_, L, T> {}

impl<L: RawLock, T> Drop for LockGuard<'_, L, T> {
    fn drop(&mut self) {
        // SAFETY: the token is taken exactly once, here, and never used afterwards.
        let token = unsafe { ManuallyDrop::take(&mut self.token) };

        // SAFETY: the token was returned by `lock()` on this very lock and is still outstanding.
        unsafe { self.lock.inner.unlock(token) };
    }
}

impl<L: RawLock, T> Deref for LockGuard<'_, L, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the lock is held for as long as the guard lives.
        unsafe { &*self.lock.data.get() }
    }
}

impl<L: RawLock, T> DerefMut for LockGuard<'_, L, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the lock is held, and `&mut self` makes this the only reference through the
        // guard.
        unsafe { &mut *self.lock.data.get() }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::thread::scope;

    use super::{Lock, RawLock};

    /// Many threads bump a shared counter and record the value they saw; every value must be
    /// observed exactly once.
    pub(crate) fn smoke<L: RawLock>() {
        const THREADS: usize = 8;
        const STEPS: usize = 512;

        let lock = Lock::<L, (usize, Vec<usize>)>::default();

        scope(|s| {
            for _ in 0..THREADS {
                let _ = s.spawn(|| {
                    for _ in 0..STEPS {
                        let mut guard = lock.lock();
                        let seen = guard.0;
                        guard.0 = seen + 1;
                        guard.1.push(seen);
                    }
                });
            }
        });

        let (count, mut seen) = lock.into_inner();
        assert_eq!(count, THREADS * STEPS);
        seen.sort_unstable();
        assert_eq!(seen, (0..THREADS * STEPS).collect::<Vec<_>>());
    }

    #[test]
    fn get_mut_bypasses_the_lock() {
        let mut lock = Lock::<crate::lock::SpinLock, _>::new(3);
        *lock.get_mut() += 1;
        assert_eq!(*lock.lock(), 4);
    }
}
