use tracing::{debug, info, warn};

use crate::blocking_queue::BoundedBlockingQueue;
use crate::message::{CompletionMarker, Message};
use crate::worker::{Pace, WorkerStatus};

/// Drains a queue into a destination until its own completion marker arrives.
pub struct Consumer<T> {
    queue: BoundedBlockingQueue<Message<T>>,
    marker: CompletionMarker,
    destination: Vec<T>,
    pace: Pace,
    status: WorkerStatus,
}

impl<T> Consumer<T> {
    pub fn new(queue: BoundedBlockingQueue<Message<T>>, marker: CompletionMarker) -> Self {
        Consumer {
            queue,
            marker,
            destination: Vec::new(),
            pace: Pace::default(),
            status: WorkerStatus::new("consumer"),
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

    /// Received items are appended after whatever `destination` already holds.
    pub fn with_destination(mut self, destination: Vec<T>) -> Self {
        self.destination = destination;
        self
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    pub fn run(self) -> Vec<T> {
        let Consumer {
            queue,
            marker,
            mut destination,
            pace,
            status,
        } = self;

        status.start();
        info!("{} started", status.name());

        let mut received = 0usize;
        loop {
            match queue.get() {
                Message::Payload(value) => {
                    pace.pause();
                    destination.push(value);
                    received += 1;
                    debug!("{} got item #{}", status.name(), received);
                }
                Message::Done(m) if m.is(&marker) => break,
                Message::Done(m) => {
                    warn!("{} ignoring foreign marker {:?}", status.name(), m);
                }
            }
        }

        status.finish();
        info!("{} finished, {} items", status.name(), received);
        destination
    }
}
