//! Lock levelling.
//!
//! Shared state is guarded by three kinds of `parking_lot` lock, always
//! acquired in the order Registry, then Client, then Channel. In debug
//! builds every acquisition records its level in a thread-local and panics
//! if a lock of the same or a lower level is taken while a higher one is
//! still held. Release builds compile the bookkeeping away.
//!
//! ```text
//! Registry ──▶ Client ──▶ Channel     (allowed)
//! Channel  ──▶ Client                 (panics in debug builds)
//! ```

use std::ops::{Deref, DerefMut};

#[cfg(debug_assertions)]
use std::cell::Cell;

/// Acquisition level of a shared-state lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LockLevel {
    Registry = 1,
    Client = 2,
    Channel = 3,
}

#[cfg(debug_assertions)]
thread_local! {
    static HELD: Cell<u8> = const { Cell::new(0) };
}

/// Marker held for as long as a levelled lock is held.
#[derive(Debug)]
pub struct LevelToken {
    #[cfg(debug_assertions)]
    previous: u8,
}

impl LevelToken {
    /// Record that a lock at `level` is about to be taken.
    ///
    /// # Panics
    ///
    /// In debug builds, if a lock at `level` or above is already held by
    /// this thread.
    #[cfg(debug_assertions)]
    pub fn acquire(level: LockLevel) -> Self {
        let previous = HELD.with(Cell::get);
        assert!(
            level as u8 > previous,
            "lock order violation: acquiring {level:?} while holding level {previous}"
        );
        HELD.with(|held| held.set(level as u8));
        Self { previous }
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    pub fn acquire(_level: LockLevel) -> Self {
        Self {}
    }
}

#[cfg(debug_assertions)]
impl Drop for LevelToken {
    fn drop(&mut self) {
        HELD.with(|held| held.set(self.previous));
    }
}

/// A lock guard paired with its [`LevelToken`].
///
/// The guard is released before the token, so the recorded level only drops
/// once the lock is actually free.
pub struct Leveled<G> {
    guard: G,
    _token: LevelToken,
}

impl<G> Leveled<G> {
    /// Check `level`, then take the lock with `lock`.
    pub fn acquire(level: LockLevel, lock: impl FnOnce() -> G) -> Self {
        let token = LevelToken::acquire(level);
        Self {
            guard: lock(),
            _token: token,
        }
    }
}

impl<G: Deref> Deref for Leveled<G> {
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<G: DerefMut> DerefMut for Leveled<G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn ascending_order_is_allowed() {
        let registry = Mutex::new(());
        let client = Mutex::new(());
        let channel = Mutex::new(());

        let _r = Leveled::acquire(LockLevel::Registry, || registry.lock());
        let _c = Leveled::acquire(LockLevel::Client, || client.lock());
        let _ch = Leveled::acquire(LockLevel::Channel, || channel.lock());
    }

    #[test]
    fn level_is_restored_after_release() {
        let channel = Mutex::new(());
        let client = Mutex::new(());
        {
            let _ch = Leveled::acquire(LockLevel::Channel, || channel.lock());
        }
        let _c = Leveled::acquire(LockLevel::Client, || client.lock());
    }

    #[test]
    fn guard_derefs_to_data() {
        let value = Mutex::new(41);
        let mut guard = Leveled::acquire(LockLevel::Client, || value.lock());
        *guard += 1;
        assert_eq!(*guard, 42);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "lock order violation")]
    fn descending_order_panics() {
        let channel = Mutex::new(());
        let client = Mutex::new(());
        let _ch = Leveled::acquire(LockLevel::Channel, || channel.lock());
        let _c = Leveled::acquire(LockLevel::Client, || client.lock());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "lock order violation")]
    fn same_level_twice_panics() {
        let a = Mutex::new(());
        let b = Mutex::new(());
        let _a = Leveled::acquire(LockLevel::Client, || a.lock());
        let _b = Leveled::acquire(LockLevel::Client, || b.lock());
    }
}
