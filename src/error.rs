use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A specialized `Result` type for handoff operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid queue capacity {capacity}: capacity must be positive")]
    InvalidCapacity { capacity: i64 },

    #[error("worker(s) {} did not finish within {timeout:?}", Names(.workers))]
    WorkerTimeout {
        workers: Vec<String>,
        timeout: Duration,
    },

    #[error("transferred sequence mismatch: expected {expected} items, got {actual}{}", Divergence(.first_divergence))]
    SequenceMismatch {
        expected: usize,
        actual: usize,
        first_divergence: Option<usize>,
    },

    #[error("worker '{worker}' failed: {reason}")]
    WorkerFailed { worker: String, reason: String },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    /// True for the errors that point at a defect in the queue or the workers
    /// rather than at bad input.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Error::WorkerTimeout { .. }
                | Error::SequenceMismatch { .. }
                | Error::WorkerFailed { .. }
        )
    }
}

struct Names<'a>(&'a [String]);

impl fmt::Display for Names<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

struct Divergence<'a>(&'a Option<usize>);

impl fmt::Display for Divergence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, " (first divergence at index {})", index),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_lists_unfinished_workers() {
        let err = Error::WorkerTimeout {
            workers: vec!["producer".into(), "consumer".into()],
            timeout: Duration::from_millis(50),
        };
        assert_eq!(
            err.to_string(),
            "worker(s) [producer, consumer] did not finish within 50ms"
        );
        assert!(err.is_defect());
    }

    #[test]
    fn mismatch_reports_divergence() {
        let err = Error::SequenceMismatch {
            expected: 10,
            actual: 9,
            first_divergence: Some(4),
        };
        assert_eq!(
            err.to_string(),
            "transferred sequence mismatch: expected 10 items, got 9 (first divergence at index 4)"
        );

        assert!(err.is_defect());

        let err = Error::WorkerFailed {
            worker: "producer".into(),
            reason: "panicked".into(),
        };
        assert!(err.is_defect());

        let err = Error::InvalidCapacity { capacity: -1 };
        assert!(!err.is_defect());
        assert_eq!(
            err.to_string(),
            "invalid queue capacity -1: capacity must be positive"
        );
    }
}
