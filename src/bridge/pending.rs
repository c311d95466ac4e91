//! One-shot correlation between a blocking request and its outcome
//!
//! [`call`] creates a [`Responder`] that travels with the request to the GUI
//! thread and a [`PendingCall`] the requesting thread waits on. Both sides
//! share a slot holding the sender half of a `bounded(1)` channel. Whoever
//! takes the sender out of the slot first decides the outcome:
//!
//! - the GUI calls [`Responder::complete`] or [`Responder::cancel`]
//! - the waiter's timer runs out and it disarms the slot
//!
//! Later attempts find the slot empty and do nothing, so a spurious second
//! completion, or a completion racing a timeout that already fired, never
//! reaches the caller.

use super::BridgeError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

/// How a blocking call ended
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Completed(T),
    Canceled,
    TimedOut,
}

impl<T> CallOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            CallOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

enum Resolution<T> {
    Completed(T),
    Canceled,
}

type Slot<T> = Mutex<Option<Sender<Resolution<T>>>>;

fn take<T>(slot: &Slot<T>) -> Option<Sender<Resolution<T>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// GUI-side handle that resolves a pending call exactly once
pub struct Responder<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Responder<T> {
    fn resolve(&self, resolution: Resolution<T>) -> bool {
        // Send while holding the lock so a waiter that finds the slot empty
        // can rely on the value already being in the channel.
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(tx) => {
                let _ = tx.send(resolution);
                true
            }
            None => false,
        }
    }

    /// Resolve with a payload; false if the call was already resolved
    pub fn complete(&self, value: T) -> bool {
        self.resolve(Resolution::Completed(value))
    }

    /// Resolve as canceled; false if the call was already resolved
    pub fn cancel(&self) -> bool {
        self.resolve(Resolution::Canceled)
    }

    /// True until the call has been resolved or has timed out
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Caller-side half of a blocking call
pub struct PendingCall<T> {
    rx: Receiver<Resolution<T>>,
    slot: Weak<Slot<T>>,
}

impl<T> PendingCall<T> {
    /// Block until the call resolves, or until `timeout` if given
    ///
    /// Fails with [`BridgeError::Disconnected`] if the responder is dropped
    /// without resolving, which happens when the GUI side shuts down.
    pub fn wait(self, timeout: Option<Duration>) -> Result<CallOutcome<T>, BridgeError> {
        let received = match timeout {
            None => self.rx.recv().map_err(|_| BridgeError::Disconnected),
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(resolution) => Ok(resolution),
                Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Disconnected),
                Err(RecvTimeoutError::Timeout) => return Ok(self.expire()),
            },
        };
        received.map(Self::outcome)
    }

    fn expire(self) -> CallOutcome<T> {
        let disarmed = self.slot.upgrade().and_then(|slot| take(&slot));
        if disarmed.is_some() {
            return CallOutcome::TimedOut;
        }
        // The responder fired between the timer and the disarm
        match self.rx.try_recv() {
            Ok(resolution) => Self::outcome(resolution),
            Err(_) => CallOutcome::TimedOut,
        }
    }

    fn outcome(resolution: Resolution<T>) -> CallOutcome<T> {
        match resolution {
            Resolution::Completed(value) => CallOutcome::Completed(value),
            Resolution::Canceled => CallOutcome::Canceled,
        }
    }
}

/// Create a linked responder/waiter pair
pub fn call<T>() -> (Responder<T>, PendingCall<T>) {
    let (tx, rx) = bounded(1);
    let slot = Arc::new(Mutex::new(Some(tx)));
    let pending = PendingCall {
        rx,
        slot: Arc::downgrade(&slot),
    };
    (Responder { slot }, pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_complete_before_wait() {
        let (responder, pending) = call::<u32>();
        assert!(responder.complete(7));
        assert_eq!(pending.wait(None).unwrap(), CallOutcome::Completed(7));
    }

    #[test]
    fn test_second_resolution_is_ignored() {
        let (responder, pending) = call::<&str>();
        assert!(responder.complete("first"));
        assert!(!responder.complete("second"));
        assert!(!responder.cancel());
        assert!(!responder.is_armed());
        assert_eq!(pending.wait(None).unwrap(), CallOutcome::Completed("first"));
    }

    #[test]
    fn test_cancel() {
        let (responder, pending) = call::<String>();
        assert!(responder.cancel());
        assert_eq!(pending.wait(None).unwrap(), CallOutcome::Canceled);
    }

    #[test]
    fn test_timeout_disarms_responder() {
        let (responder, pending) = call::<u32>();
        let start = Instant::now();
        let outcome = pending.wait(Some(Duration::from_millis(20))).unwrap();
        assert_eq!(outcome, CallOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(20));

        assert!(!responder.is_armed());
        assert!(!responder.complete(1));
    }

    #[test]
    fn test_dropped_responder_disconnects() {
        let (responder, pending) = call::<u32>();
        drop(responder);
        assert_eq!(pending.wait(None).unwrap_err(), BridgeError::Disconnected);
    }

    #[test]
    fn test_completion_from_other_thread() {
        let (responder, pending) = call::<u32>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            responder.complete(42)
        });
        let outcome = pending.wait(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(outcome, CallOutcome::Completed(42));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_outcome_completed_accessor() {
        assert_eq!(CallOutcome::Completed(3).completed(), Some(3));
        assert_eq!(CallOutcome::<u32>::Canceled.completed(), None);
        assert_eq!(CallOutcome::<u32>::TimedOut.completed(), None);
    }
}
