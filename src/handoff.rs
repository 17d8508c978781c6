//! One-shot blocking handoff between two threads.
//!
//! [`one_shot`] returns a [`Replier`] that sets the value exactly once and a
//! [`Waiter`] that blocks until the value arrives, the replier is dropped, or
//! a timeout expires. Both halves are consumed by use.

use crate::util::{ImgFindError, ImgFindResult};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

enum Slot<T> {
    Empty,
    Ready(T),
    Disconnected,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Sending half: delivers one value.
pub struct Replier<T> {
    shared: Arc<Shared<T>>,
    what: &'static str,
}

/// Receiving half: waits for the value.
pub struct Waiter<T> {
    shared: Arc<Shared<T>>,
    what: &'static str,
}

/// Creates a connected replier/waiter pair.
///
/// `what` names the awaited value in timeout and disconnect errors.
pub fn one_shot<T>(what: &'static str) -> (Replier<T>, Waiter<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Empty),
        ready: Condvar::new(),
    });
    (
        Replier {
            shared: Arc::clone(&shared),
            what,
        },
        Waiter { shared, what },
    )
}

impl<T> Replier<T> {
    /// Sets the value and wakes the waiter.
    pub fn reply(self, value: T) {
        *self.shared.lock() = Slot::Ready(value);
        self.shared.ready.notify_all();
        // Drop sees `Ready` and leaves it alone.
    }

    /// Returns the name of the awaited value.
    pub fn what(&self) -> &'static str {
        self.what
    }
}

impl<T> Drop for Replier<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Disconnected;
            drop(slot);
            self.shared.ready.notify_all();
        }
    }
}

impl<T> Waiter<T> {
    /// Blocks until the value arrives or the replier is dropped.
    pub fn wait(self) -> ImgFindResult<T> {
        let mut slot = self.shared.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Empty) {
                Slot::Ready(value) => return Ok(value),
                Slot::Disconnected => return Err(ImgFindError::Disconnected(self.what)),
                Slot::Empty => {
                    slot = self
                        .shared
                        .ready
                        .wait(slot)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> ImgFindResult<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Empty) {
                Slot::Ready(value) => return Ok(value),
                Slot::Disconnected => return Err(ImgFindError::Disconnected(self.what)),
                Slot::Empty => {}
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return Err(ImgFindError::Timeout {
                    what: self.what,
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            slot = self
                .shared
                .ready
                .wait_timeout(slot, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::one_shot;
    use crate::util::ImgFindError;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn reply_from_other_thread_is_received() {
        let (replier, waiter) = one_shot::<u32>("answer");
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            replier.reply(42);
        });
        assert_eq!(waiter.wait().unwrap(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn reply_before_wait_is_kept() {
        let (replier, waiter) = one_shot::<&str>("answer");
        replier.reply("early");
        assert_eq!(waiter.wait_timeout(Duration::from_millis(1)).unwrap(), "early");
    }

    #[test]
    fn dropped_replier_disconnects() {
        let (replier, waiter) = one_shot::<u8>("permission");
        drop(replier);
        assert_eq!(
            waiter.wait().unwrap_err(),
            ImgFindError::Disconnected("permission")
        );
    }

    #[test]
    fn silent_replier_times_out() {
        let (_replier, waiter) = one_shot::<u8>("permission");
        let err = waiter.wait_timeout(Duration::from_millis(30)).unwrap_err();
        assert!(matches!(
            err,
            ImgFindError::Timeout {
                what: "permission",
                waited_ms: 30
            }
        ));
    }
}
