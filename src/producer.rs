use std::convert::Infallible;
use std::fmt;

use tracing::{debug, info, warn};

use crate::blocking_queue::BoundedBlockingQueue;
use crate::error::{Error, Result};
use crate::message::{CompletionMarker, Message};
use crate::worker::{Pace, WorkerStatus};

pub type Values<V, T> = std::iter::Map<V, fn(T) -> std::result::Result<T, Infallible>>;

/// Drains a finite, possibly fallible source into a queue, then enqueues the
/// completion marker exactly once.
pub struct Producer<T, I> {
    queue: BoundedBlockingQueue<Message<T>>,
    marker: CompletionMarker,
    source: I,
    pace: Pace,
    status: WorkerStatus,
}

impl<T, I> Producer<T, Values<I, T>>
where
    I: Iterator<Item = T>,
{
    pub fn from_values<V>(
        queue: BoundedBlockingQueue<Message<T>>,
        marker: CompletionMarker,
        values: V,
    ) -> Self
    where
        V: IntoIterator<Item = T, IntoIter = I>,
    {
        let source = values
            .into_iter()
            .map(Ok as fn(T) -> std::result::Result<T, Infallible>);
        Producer::new(queue, marker, source)
    }
}

impl<T, I, E> Producer<T, I>
where
    I: Iterator<Item = std::result::Result<T, E>>,
    E: fmt::Display,
{
    pub fn new(queue: BoundedBlockingQueue<Message<T>>, marker: CompletionMarker, source: I) -> Self {
        Producer {
            queue,
            marker,
            source,
            pace: Pace::default(),
            status: WorkerStatus::new("producer"),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.status = WorkerStatus::new(name);
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = pace;
        self
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    pub(crate) fn queue(&self) -> &BoundedBlockingQueue<Message<T>> {
        &self.queue
    }

    pub(crate) fn marker(&self) -> &CompletionMarker {
        &self.marker
    }

    /// Returns the number of payloads enqueued.
    ///
    /// If the source yields an error, production stops there, the marker is
    /// still enqueued so the consumer terminates, and the error is returned.
    pub fn run(self) -> Result<usize> {
        let Producer {
            queue,
            marker,
            source,
            pace,
            status,
        } = self;

        status.start();
        info!("{} started, capacity {}", status.name(), queue.capacity());

        let mut produced = 0;
        let mut failure = None;
        for item in source {
            match item {
                Ok(value) => {
                    pace.pause();
                    queue.put(Message::Payload(value));
                    produced += 1;
                    debug!("{} put item #{}", status.name(), produced);
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        queue.put(Message::Done(marker));

        match failure {
            None => {
                status.finish();
                info!("{} finished, {} items", status.name(), produced);
                Ok(produced)
            }
            Some(reason) => {
                warn!(
                    "{} source failed after {} items: {}",
                    status.name(),
                    produced,
                    reason
                );
                status.fail(reason.clone());
                Err(Error::WorkerFailed {
                    worker: status.name().to_string(),
                    reason,
                })
            }
        }
    }
}
