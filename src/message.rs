use std::fmt;
use std::sync::Arc;

/// Token that tells a consumer production has ended.
///
/// Markers compare by identity: two markers are equal only if one is a clone
/// of the other. A freshly created marker never equals any existing one, no
/// matter what it looks like.
#[derive(Clone)]
pub struct CompletionMarker {
    token: Arc<()>,
}

impl CompletionMarker {
    pub fn new() -> Self {
        CompletionMarker {
            token: Arc::new(()),
        }
    }

    pub fn is(&self, other: &CompletionMarker) -> bool {
        Arc::ptr_eq(&self.token, &other.token)
    }
}

impl Default for CompletionMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CompletionMarker {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl Eq for CompletionMarker {}

impl fmt::Debug for CompletionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompletionMarker({:p})", Arc::as_ptr(&self.token))
    }
}

/// An element travelling through the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<T> {
    Payload(T),
    Done(CompletionMarker),
}

impl<T> Message<T> {
    /// True if this is the end-of-stream signal for `marker`.
    pub fn is_done_for(&self, marker: &CompletionMarker) -> bool {
        match self {
            Message::Done(m) => m.is(marker),
            Message::Payload(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_compare_by_identity() {
        let a = CompletionMarker::new();
        let b = CompletionMarker::new();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let done: Message<CompletionMarker> = Message::Done(a.clone());
        assert!(done.is_done_for(&a));
        assert!(!done.is_done_for(&b));
        assert!(!Message::Payload(a.clone()).is_done_for(&a));
    }
}
