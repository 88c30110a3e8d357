use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::aggregate::Aggregator;
use crate::blocking_queue::{BoundedBlockingQueue, QueueStats};
use crate::consumer::Consumer;
use crate::countdown_latch::CountdownLatch;
use crate::error::{Error, Result};
use crate::message::{CompletionMarker, Message};
use crate::producer::Producer;
use crate::worker::{ExitGuard, Pace, WorkerState, WorkerStatus};

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub capacity: usize,
    /// `None` waits for the workers forever.
    pub join_timeout: Option<Duration>,
    pub producer_pace: Pace,
    pub consumer_pace: Pace,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            capacity: 3,
            join_timeout: Some(Duration::from_secs(5)),
            producer_pace: Pace::default(),
            consumer_pace: Pace::default(),
        }
    }
}

impl TransferConfig {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn join_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn producer_pace(mut self, pace: Pace) -> Self {
        self.producer_pace = pace;
        self
    }

    pub fn consumer_pace(mut self, pace: Pace) -> Self {
        self.consumer_pace = pace;
        self
    }
}

#[derive(Debug)]
pub struct TransferReport<T> {
    pub destination: Vec<T>,
    pub produced: usize,
    pub stats: QueueStats,
    /// Occupancy after both workers finished.
    pub residual: usize,
    pub elapsed: Duration,
}

impl<T> TransferReport<T> {
    pub fn aggregate<A: Aggregator<T>>(&self, aggregator: &A) -> A::Summary {
        aggregator.aggregate(&self.destination)
    }
}

/// One producer and one consumer joined by a single bounded queue.
pub struct Transfer {
    config: TransferConfig,
}

impl Transfer {
    pub fn new(config: TransferConfig) -> Self {
        Transfer { config }
    }

    /// Moves `source` through the queue and checks that what comes out equals
    /// what went in.
    pub fn run<T>(&self, source: Vec<T>) -> Result<TransferReport<T>>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let queue = BoundedBlockingQueue::new(self.config.capacity)?;
        let marker = CompletionMarker::new();

        let producer = Producer::from_values(queue.clone(), marker.clone(), source.clone())
            .with_pace(self.config.producer_pace);
        let consumer = Consumer::new(queue, marker).with_pace(self.config.consumer_pace);
        self.run_workers(producer, consumer, &source)
    }

    /// Runs an already wired producer/consumer pair on their own threads.
    ///
    /// Both must share one queue and one marker. `expected` is what the
    /// consumer should end up holding.
    pub fn run_workers<T, I, E>(
        &self,
        producer: Producer<T, I>,
        consumer: Consumer<T>,
        expected: &[T],
    ) -> Result<TransferReport<T>>
    where
        T: PartialEq + Send + 'static,
        I: Iterator<Item = std::result::Result<T, E>> + Send + 'static,
        E: fmt::Display,
    {
        let queue = producer.queue().clone();
        let marker = producer.marker().clone();
        let latch = CountdownLatch::new(2);
        let start = Instant::now();
        let producer_status = producer.status();
        let consumer_status = consumer.status();

        let producer_guard = ExitGuard::new(producer_status.clone(), latch.clone()).on_panic({
            let queue = queue.clone();
            let consumer_status = consumer_status.clone();
            move || release_consumer(&queue, marker, &consumer_status)
        });
        let consumer_guard = ExitGuard::new(consumer_status.clone(), latch.clone()).on_panic({
            let queue = queue.clone();
            let producer_status = producer_status.clone();
            move || release_producer(&queue, &producer_status)
        });

        let producer_handle = spawn_worker(&producer_status, producer_guard, move || producer.run())?;
        let consumer_handle =
            match spawn_worker(&consumer_status, consumer_guard, move || consumer.run()) {
                Ok(handle) => handle,
                Err(e) => {
                    consumer_status.fail("not spawned");
                    release_producer(&queue, &producer_status);
                    return Err(e);
                }
            };
        info!(
            "transfer of {} items started, capacity {}",
            expected.len(),
            queue.capacity()
        );

        let all_done = match self.config.join_timeout {
            Some(timeout) => latch.wait_timeout(timeout) || latch.count() == 0,
            None => {
                latch.wait();
                true
            }
        };
        if !all_done {
            let statuses = [&producer_status, &consumer_status];
            if let Some(err) = first_failure(&statuses) {
                error!("{}", err);
                return Err(err);
            }
            let timeout = self.config.join_timeout.unwrap_or_default();
            let workers = unfinished(&statuses);
            error!("workers {:?} still running after {:?}", workers, timeout);
            return Err(Error::WorkerTimeout { workers, timeout });
        }

        let produced = join_worker(producer_handle, &producer_status)??;
        let destination = join_worker(consumer_handle, &consumer_status)?;
        let elapsed = start.elapsed();

        verify(expected, &destination)?;

        let report = TransferReport {
            destination,
            produced,
            stats: queue.stats(),
            residual: queue.len(),
            elapsed,
        };
        info!(
            "transfer finished in {:?}: {} items, peak occupancy {}",
            report.elapsed, report.produced, report.stats.peak
        );
        Ok(report)
    }
}

/// How long a dying worker waits on the queue before re-checking its peer.
const RELEASE_POLL: Duration = Duration::from_millis(10);

/// A panicking producer still hands the consumer its marker, as long as the
/// consumer is alive to take it.
fn release_consumer<T>(
    queue: &BoundedBlockingQueue<Message<T>>,
    marker: CompletionMarker,
    consumer: &WorkerStatus,
) {
    let mut done = Message::Done(marker);
    while let Err(back) = queue.put_timeout(done, RELEASE_POLL) {
        if consumer.state().is_terminal() {
            return;
        }
        done = back;
    }
    warn!("producer panicked, marker enqueued for {}", consumer.name());
}

/// A panicking consumer keeps draining so the producer never blocks on a
/// full queue; the drained items are discarded.
fn release_producer<T>(queue: &BoundedBlockingQueue<Message<T>>, producer: &WorkerStatus) {
    let mut discarded = 0usize;
    while !producer.state().is_terminal() {
        if queue.get_timeout(RELEASE_POLL).is_some() {
            discarded += 1;
        }
    }
    warn!(
        "consumer panicked, discarded {} items from {}",
        discarded,
        producer.name()
    );
}

fn spawn_worker<F, R>(status: &WorkerStatus, guard: ExitGuard, f: F) -> Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let handle = thread::Builder::new()
        .name(status.name().to_string())
        .spawn(move || {
            let _guard = guard;
            f()
        })?;
    Ok(handle)
}

fn join_worker<R>(handle: JoinHandle<R>, status: &WorkerStatus) -> Result<R> {
    handle.join().map_err(|_| Error::WorkerFailed {
        worker: status.name().to_string(),
        reason: "panicked".to_string(),
    })
}

fn first_failure(statuses: &[&WorkerStatus]) -> Option<Error> {
    statuses.iter().find_map(|status| match status.state() {
        WorkerState::Failed(reason) => Some(Error::WorkerFailed {
            worker: status.name().to_string(),
            reason,
        }),
        _ => None,
    })
}

/// Falls back to every worker when all of them turned terminal after the
/// wait expired but before their latch counts landed.
fn unfinished(statuses: &[&WorkerStatus]) -> Vec<String> {
    let running: Vec<String> = statuses
        .iter()
        .filter(|status| !status.state().is_terminal())
        .map(|status| status.name().to_string())
        .collect();
    if running.is_empty() {
        statuses.iter().map(|status| status.name().to_string()).collect()
    } else {
        running
    }
}

/// Exact equality: same length, same order, same values.
pub fn verify<T: PartialEq>(source: &[T], destination: &[T]) -> Result<()> {
    if source == destination {
        return Ok(());
    }

    let first_divergence = source
        .iter()
        .zip(destination.iter())
        .position(|(a, b)| a != b)
        .or_else(|| Some(source.len().min(destination.len())));
    error!(
        "sequence mismatch: {} sent, {} received, diverging at {:?}",
        source.len(),
        destination.len(),
        first_divergence
    );
    Err(Error::SequenceMismatch {
        expected: source.len(),
        actual: destination.len(),
        first_divergence,
    })
}

/// Convenience wrapper with the default configuration and the given capacity.
pub fn transfer<T>(source: Vec<T>, capacity: usize) -> Result<TransferReport<T>>
where
    T: Clone + PartialEq + Send + 'static,
{
    Transfer::new(TransferConfig::default().capacity(capacity)).run(source)
}
