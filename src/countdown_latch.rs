use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct CountdownLatch {
    pair: Arc<(Mutex<usize>, Condvar)>,
}

impl CountdownLatch {
    pub fn new(count: usize) -> CountdownLatch {
        CountdownLatch {
            pair: Arc::new((Mutex::new(count), Condvar::new())),
        }
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.pair;
        let mut count = lock.lock().expect("latch mutex poisoned");
        while *count > 0 {
            count = cvar.wait(count).expect("latch mutex poisoned");
        }
    }

    /// Returns `false` if the count did not reach zero within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.pair;
        let mut count = lock.lock().expect("latch mutex poisoned");
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = cvar
                .wait_timeout(count, deadline - now)
                .expect("latch mutex poisoned")
                .0;
        }
        true
    }

    /// Saturates at zero.
    pub fn countdown(&self) {
        let (lock, cvar) = &*self.pair;
        let mut count = lock.lock().expect("latch mutex poisoned");
        *count = count.saturating_sub(1);
        if *count == 0 {
            cvar.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        let (lock, _) = &*self.pair;
        *lock.lock().expect("latch mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_timeout_expires_while_counts_remain() {
        let latch = CountdownLatch::new(2);
        latch.countdown();
        assert!(!latch.wait_timeout(Duration::from_millis(20)));
        assert_eq!(latch.count(), 1);
    }

    #[test]
    fn released_by_other_thread() {
        let latch = CountdownLatch::new(2);
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.countdown())
            })
            .collect();
        assert!(latch.wait_timeout(Duration::from_secs(5)));
        for handle in handles {
            handle.join().unwrap();
        }
        latch.countdown();
        assert_eq!(latch.count(), 0);
    }
}
