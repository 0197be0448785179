//! Single-value completion channel.
//!
//! A oneshot channel carries exactly one value from a [`OneshotSender`] to a
//! [`OneshotReceiver`]. Both halves are consumed by use, so a value can be sent
//! once and received once. Dropping the sender without sending closes the
//! channel and wakes the receiver with `None`.
//!
//! State transitions:
//! - `Pending` -> `Ready(T)` when a value is sent
//! - `Pending` -> `Closed` when the sender is dropped unused
//! - `Ready(T)` -> `Closed` when the value is taken

use std::sync::{Arc, Condvar, Mutex};

/// Creates a new oneshot channel, returning the sender and receiver pair.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let cell = Arc::new(Cell {
        state: Mutex::new(State::Pending),
        condvar: Condvar::new(),
    });
    (OneshotSender(Some(cell.clone())), OneshotReceiver(cell))
}

/// The sending half of a oneshot channel.
pub struct OneshotSender<T>(Option<Arc<Cell<T>>>);

impl<T> OneshotSender<T> {
    /// Delivers `value` to the receiver.
    ///
    /// Returns `Err(value)` if the receiver is already gone.
    pub fn send(mut self, value: T) -> Result<(), T> {
        let Some(cell) = self.0.take() else {
            return Err(value);
        };
        if Arc::strong_count(&cell) == 1 {
            return Err(value);
        }
        *cell.state.lock().unwrap() = State::Ready(value);
        cell.condvar.notify_all();
        Ok(())
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.0.take() {
            let mut state = cell.state.lock().unwrap();
            if matches!(*state, State::Pending) {
                *state = State::Closed;
            }
            drop(state);
            cell.condvar.notify_all();
        }
    }
}

/// The receiving half of a oneshot channel.
pub struct OneshotReceiver<T>(Arc<Cell<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the value arrives.
    ///
    /// Returns `None` if the sender was dropped without sending.
    pub fn recv(self) -> Option<T> {
        let state = self.0.state.lock().unwrap();
        let mut state = self
            .0
            .condvar
            .wait_while(state, |state| matches!(state, State::Pending))
            .unwrap();
        match std::mem::replace(&mut *state, State::Closed) {
            State::Ready(value) => Some(value),
            State::Pending | State::Closed => None,
        }
    }

    /// Returns `true` while no value has been sent and the sender is alive.
    pub fn is_pending(&self) -> bool {
        matches!(*self.0.state.lock().unwrap(), State::Pending)
    }
}

struct Cell<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

enum State<T> {
    Pending,
    Ready(T),
    Closed,
}
