use std::collections::VecDeque;
use std::convert::TryFrom;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Checks a signed capacity, as read from user input, for queue construction.
pub fn capacity_from(capacity: i64) -> Result<usize> {
    match usize::try_from(capacity) {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(Error::InvalidCapacity { capacity }),
    }
}

/// Counters sampled from a [`BoundedBlockingQueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub puts: u64,
    pub gets: u64,
    /// Highest occupancy ever observed, recorded under the lock.
    pub peak: usize,
}

struct State<T> {
    items: VecDeque<T>,
    stats: QueueStats,
}

impl<T> State<T> {
    fn push(&mut self, t: T) {
        self.items.push_back(t);
        self.stats.puts += 1;
        self.stats.peak = self.stats.peak.max(self.items.len());
    }

    fn pop(&mut self) -> Option<T> {
        let front = self.items.pop_front();
        if front.is_some() {
            self.stats.gets += 1;
        }
        front
    }
}

/// A fixed-capacity FIFO shared between threads.
///
/// `put` blocks while the queue is full and `get` blocks while it is empty.
/// One mutex guards the backing store; a single condition variable stands in
/// for both "not full" and "not empty", so every state change wakes all
/// waiters and each waiter re-checks its own predicate.
///
/// Cloning yields another handle to the same queue.
pub struct BoundedBlockingQueue<T> {
    pair: Arc<(Mutex<State<T>>, Condvar)>,
    capacity: usize,
}

impl<T> Clone for BoundedBlockingQueue<T> {
    fn clone(&self) -> Self {
        BoundedBlockingQueue {
            pair: Arc::clone(&self.pair),
            capacity: self.capacity,
        }
    }
}

impl<T> BoundedBlockingQueue<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity: 0 });
        }

        let state = State {
            items: VecDeque::with_capacity(capacity),
            stats: QueueStats::default(),
        };
        Ok(BoundedBlockingQueue {
            pair: Arc::new((Mutex::new(state), Condvar::new())),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        let (lock, _) = &*self.pair;
        lock.lock().expect("blocking queue mutex poisoned")
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        let (_, cvar) = &*self.pair;
        cvar.wait(guard).expect("blocking queue mutex poisoned")
    }

    /// Waits until `deadline`; returns the guard and whether the deadline passed.
    fn wait_until<'a>(
        &self,
        guard: MutexGuard<'a, State<T>>,
        deadline: Instant,
    ) -> (MutexGuard<'a, State<T>>, bool) {
        let (_, cvar) = &*self.pair;
        let now = Instant::now();
        if now >= deadline {
            return (guard, true);
        }
        let (guard, _) = cvar
            .wait_timeout(guard, deadline - now)
            .expect("blocking queue mutex poisoned");
        (guard, Instant::now() >= deadline)
    }

    fn notify(&self) {
        let (_, cvar) = &*self.pair;
        cvar.notify_all();
    }

    /// Appends `t`, blocking while the queue is full.
    pub fn put(&self, t: T) {
        let mut state = self.lock();
        while state.items.len() >= self.capacity {
            state = self.wait(state);
        }
        state.push(t);
        self.notify();
    }

    /// Removes the front item, blocking while the queue is empty.
    pub fn get(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(front) = state.pop() {
                self.notify();
                return front;
            }
            state = self.wait(state);
        }
    }

    /// Like [`put`](Self::put) but gives up after `timeout`, handing the item back.
    pub fn put_timeout(&self, t: T, timeout: Duration) -> std::result::Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.items.len() >= self.capacity {
            let (guard, expired) = self.wait_until(state, deadline);
            state = guard;
            if expired && state.items.len() >= self.capacity {
                return Err(t);
            }
        }
        state.push(t);
        self.notify();
        Ok(())
    }

    /// Like [`get`](Self::get) but returns `None` once `timeout` elapses.
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(front) = state.pop() {
                self.notify();
                return Some(front);
            }
            let (guard, expired) = self.wait_until(state, deadline);
            state = guard;
            if expired && state.items.is_empty() {
                return None;
            }
        }
    }

    /// Appends `t` only if there is room right now.
    pub fn try_put(&self, t: T) -> std::result::Result<(), T> {
        let mut state = self.lock();
        if state.items.len() >= self.capacity {
            return Err(t);
        }
        state.push(t);
        self.notify();
        Ok(())
    }

    pub fn try_get(&self) -> Option<T> {
        let mut state = self.lock();
        let front = state.pop();
        if front.is_some() {
            self.notify();
        }
        front
    }

    /// Current occupancy. Advisory: it may change as soon as the lock is released.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().items.len() >= self.capacity
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }
}
