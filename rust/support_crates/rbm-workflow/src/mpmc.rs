//! Blocking multi-producer, multi-consumer queues.
//!
//! `std::sync::mpsc` only allows a single receiver, which rules it out for a
//! pool of workers pulling from one shared work queue. The queue here is a
//! `VecDeque` behind a mutex with two condition variables, plus producer and
//! consumer counts that implement disconnection:
//!
//! - once every [`Sender`] is dropped, receivers drain what is buffered and
//!   then get [`RecvError`];
//! - once every [`Receiver`] is dropped, buffered items are discarded and
//!   senders get their message back in a [`SendError`].

use std::collections::VecDeque;
use std::sync::mpsc::{RecvError, SendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Creates a queue without a capacity limit. `send` never blocks.
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared::new(None));
    (Sender(shared.clone()), Receiver(shared))
}

/// Creates a queue that holds at most `capacity` items. `send` blocks while
/// the queue is full.
///
/// # Panics
///
/// Panics if `capacity` is 0.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    assert_ne!(capacity, 0, "bounded queue requires a non-zero capacity");
    let shared = Arc::new(Shared::new(Some(capacity)));
    (Sender(shared.clone()), Receiver(shared))
}

/// The sending half of a queue. Cloning registers another producer.
pub struct Sender<T>(Arc<Shared<T>>);

impl<T> Sender<T> {
    /// Enqueues `msg`, blocking while a bounded queue is full.
    ///
    /// Fails, handing `msg` back, if all receivers are gone.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        let mut state = self.0.lock();
        loop {
            if state.consumers == 0 {
                return Err(SendError(msg));
            }
            match state.capacity {
                Some(cap) if state.items.len() >= cap => {
                    state = self.0.not_full.wait(state).unwrap();
                }
                _ => break,
            }
        }
        state.items.push_back(msg);
        drop(state);
        self.0.not_empty.notify_one();
        Ok(())
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        let mut state = self.0.lock();
        assert_ne!(state.producers, 0, "cannot clone a sender of a closed queue");
        state.producers += 1;
        drop(state);
        Sender(self.0.clone())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.producers -= 1;
        if state.producers == 0 {
            drop(state);
            self.0.not_empty.notify_all();
        }
    }
}

/// The receiving half of a queue. Cloning registers another consumer; each
/// item is delivered to exactly one of them.
pub struct Receiver<T>(Arc<Shared<T>>);

impl<T> Receiver<T> {
    /// Dequeues the next item, blocking while the queue is empty and at least
    /// one sender is alive.
    pub fn recv(&self) -> Result<T, RecvError> {
        let mut state = self.0.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.0.not_full.notify_one();
                return Ok(item);
            }
            if state.producers == 0 {
                return Err(RecvError);
            }
            state = self.0.not_empty.wait(state).unwrap();
        }
    }

    /// Returns an iterator that yields items until the queue is drained and
    /// disconnected.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter(self)
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        let mut state = self.0.lock();
        assert_ne!(state.consumers, 0, "cannot clone a receiver of a closed queue");
        state.consumers += 1;
        drop(state);
        Receiver(self.0.clone())
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.consumers -= 1;
        if state.consumers == 0 {
            state.items.clear();
            drop(state);
            self.0.not_full.notify_all();
        }
    }
}

/// Blocking iterator over a [`Receiver`], see [`Receiver::iter`].
pub struct Iter<'a, T>(&'a Receiver<T>);

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.recv().ok()
    }
}

struct State<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
    producers: usize,
    consumers: usize,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Shared<T> {
    fn new(capacity: Option<usize>) -> Shared<T> {
        Shared {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.unwrap_or(0)),
                capacity,
                producers: 1,
                consumers: 1,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_unbounded_fifo() {
        let (tx, rx) = unbounded();
        for i in 0..1000 {
            tx.send(i).unwrap();
        }
        drop(tx);
        assert_eq!(rx.iter().collect::<Vec<_>>(), (0..1000).collect::<Vec<_>>());
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_bounded_blocks_until_space() {
        let (tx, rx) = bounded(2);
        tx.send(1).unwrap();
        tx.send(2).unwrap();

        let producer = thread::spawn(move || {
            tx.send(3).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        assert_eq!(rx.recv().unwrap(), 1);
        producer.join().unwrap();
        assert_eq!(rx.recv().unwrap(), 2);
        assert_eq!(rx.recv().unwrap(), 3);
        assert!(rx.recv().is_err());
    }

    #[test]
    #[should_panic]
    fn test_bounded_zero_capacity() {
        let _ = bounded::<u32>(0);
    }

    #[test]
    fn test_send_after_receivers_dropped() {
        let (tx, rx) = bounded(4);
        tx.send(1).unwrap();
        drop(rx);
        let err = tx.send(7).unwrap_err();
        assert_eq!(err.0, 7);
    }

    #[test]
    fn test_sender_blocked_on_full_queue_wakes_on_close() {
        let (tx, rx) = bounded(1);
        tx.send(0).unwrap();
        let producer = thread::spawn(move || tx.send(1));
        thread::sleep(Duration::from_millis(20));
        drop(rx);
        assert!(producer.join().unwrap().is_err());
    }

    #[test]
    fn test_multiple_consumers_share_items() {
        let (tx, rx) = bounded(8);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || rx.iter().collect::<Vec<usize>>())
            })
            .collect();
        drop(rx);

        for i in 0..500 {
            tx.send(i).unwrap();
        }
        drop(tx);

        let mut all: Vec<usize> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_multiple_producers() {
        let (tx, rx) = unbounded();
        let producers: Vec<_> = (0..3)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        tx.send(p * 1000 + i).unwrap();
                    }
                })
            })
            .collect();
        drop(tx);
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(rx.iter().count(), 300);
    }
}
