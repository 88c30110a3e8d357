pub mod aggregate;
pub mod blocking_queue;
pub mod consumer;
pub mod countdown_latch;
pub mod error;
pub mod message;
pub mod producer;
pub mod transfer;
pub mod worker;

pub use blocking_queue::{capacity_from, BoundedBlockingQueue, QueueStats};
pub use consumer::Consumer;
pub use countdown_latch::CountdownLatch;
pub use error::{Error, Result};
pub use message::{CompletionMarker, Message};
pub use producer::Producer;
pub use transfer::{transfer, Transfer, TransferConfig, TransferReport};
pub use worker::{Pace, WorkerState, WorkerStatus};
