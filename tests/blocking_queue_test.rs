use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use blocking_handoff::{capacity_from, BoundedBlockingQueue, Error};
use rand::Rng;

const SETTLE: Duration = Duration::from_millis(100);

#[test]
fn put_and_get_single_item() {
    let queue = BoundedBlockingQueue::new(2).unwrap();
    queue.put(42);
    assert_eq!(queue.get(), 42);
    assert_eq!(queue.len(), 0);
}

#[test]
fn filled_to_capacity() {
    let queue = BoundedBlockingQueue::new(2).unwrap();
    queue.put("a");
    queue.put("b");
    assert_eq!(queue.len(), queue.capacity());
    assert!(queue.is_full());
}

#[test]
fn invalid_capacity() {
    match BoundedBlockingQueue::<u8>::new(0) {
        Err(Error::InvalidCapacity { capacity }) => assert_eq!(capacity, 0),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("zero capacity accepted"),
    }
}

#[test]
fn signed_capacity_checked() {
    assert_eq!(capacity_from(3).unwrap(), 3);
    for bad in [-1, 0, i64::MIN] {
        match capacity_from(bad) {
            Err(Error::InvalidCapacity { capacity }) => assert_eq!(capacity, bad),
            other => panic!("capacity {} gave {:?}", bad, other),
        }
    }
}

#[test]
fn fifo_order() {
    let queue = BoundedBlockingQueue::new(5).unwrap();
    for i in 0..5 {
        queue.put(i);
    }
    let drained: Vec<i32> = (0..5).map(|_| queue.get()).collect();
    assert_eq!(drained, vec![0, 1, 2, 3, 4]);
}

#[test]
fn put_blocks_while_full() {
    let queue = BoundedBlockingQueue::new(1).unwrap();
    queue.put(1);

    let put_done = Arc::new(AtomicBool::new(false));
    let handle = {
        let queue = queue.clone();
        let put_done = put_done.clone();
        thread::spawn(move || {
            queue.put(2);
            put_done.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(SETTLE);
    assert!(!put_done.load(Ordering::SeqCst), "put returned on a full queue");
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.get(), 1);
    handle.join().unwrap();
    assert!(put_done.load(Ordering::SeqCst));
    assert_eq!(queue.get(), 2);
}

#[test]
fn get_blocks_while_empty() {
    let queue = BoundedBlockingQueue::<&str>::new(1).unwrap();

    let got = Arc::new(AtomicBool::new(false));
    let handle = {
        let queue = queue.clone();
        let got = got.clone();
        thread::spawn(move || {
            let item = queue.get();
            got.store(true, Ordering::SeqCst);
            item
        })
    };

    thread::sleep(SETTLE);
    assert!(!got.load(Ordering::SeqCst), "get returned on an empty queue");

    queue.put("late");
    assert_eq!(handle.join().unwrap(), "late");
    assert!(got.load(Ordering::SeqCst));
}

#[test]
fn timed_waits_expire() {
    let queue = BoundedBlockingQueue::new(1).unwrap();

    let start = Instant::now();
    assert_eq!(queue.get_timeout(Duration::from_millis(30)), None);
    assert!(start.elapsed() >= Duration::from_millis(30));

    queue.put('x');
    let start = Instant::now();
    assert_eq!(queue.put_timeout('y', Duration::from_millis(30)), Err('y'));
    assert!(start.elapsed() >= Duration::from_millis(30));

    assert_eq!(queue.get_timeout(Duration::from_millis(30)), Some('x'));
    assert_eq!(queue.put_timeout('z', Duration::from_millis(30)), Ok(()));
    assert_eq!(queue.len(), 1);
}

#[test]
fn timed_get_woken_by_put() {
    let queue = BoundedBlockingQueue::new(1).unwrap();
    let handle = {
        let queue = queue.clone();
        thread::spawn(move || queue.get_timeout(Duration::from_secs(5)))
    };
    thread::sleep(Duration::from_millis(20));
    queue.put(7u64);
    assert_eq!(handle.join().unwrap(), Some(7));
}

#[test]
fn occupancy_stays_within_capacity() {
    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let capacity = rng.gen_range(1..=4);
        let count = rng.gen_range(50..200);
        let queue = BoundedBlockingQueue::new(capacity).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let sampler = {
            let queue = queue.clone();
            let running = running.clone();
            let max_seen = max_seen.clone();
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    max_seen.fetch_max(queue.len(), Ordering::SeqCst);
                    thread::yield_now();
                }
            })
        };

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..count {
                    queue.put(i);
                }
            })
        };
        let received: Vec<usize> = (0..count)
            .map(|_| {
                thread::sleep(Duration::from_micros(50));
                queue.get()
            })
            .collect();
        producer.join().unwrap();
        running.store(false, Ordering::SeqCst);
        sampler.join().unwrap();

        assert_eq!(received, (0..count).collect::<Vec<_>>());
        assert!(max_seen.load(Ordering::SeqCst) <= capacity);
        let stats = queue.stats();
        assert!(stats.peak <= capacity);
        assert_eq!(stats.puts, count as u64);
        assert_eq!(stats.gets, count as u64);
    }
}
