//! Reductions over the records a transfer delivered.
//!
//! The queue and workers know nothing about these; orchestration hands the
//! destination sequence to an [`Aggregator`] once both workers are done.

use std::collections::BTreeMap;

pub trait Aggregator<T> {
    type Summary;

    fn aggregate(&self, records: &[T]) -> Self::Summary;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Stats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Scalar summary of records mapped to a number.
pub struct Summary<F> {
    value: F,
}

impl<F> Summary<F> {
    pub fn new(value: F) -> Self {
        Summary { value }
    }
}

impl<T, F> Aggregator<T> for Summary<F>
where
    F: Fn(&T) -> f64,
{
    type Summary = Stats;

    fn aggregate(&self, records: &[T]) -> Stats {
        let mut stats = Stats::default();
        for record in records {
            stats.add((self.value)(record));
        }
        stats
    }
}

/// Per-key summary; keys come back sorted.
pub struct GroupSummary<K, V> {
    key: K,
    value: V,
}

impl<K, V> GroupSummary<K, V> {
    pub fn new(key: K, value: V) -> Self {
        GroupSummary { key, value }
    }
}

impl<T, G, K, V> Aggregator<T> for GroupSummary<K, V>
where
    K: Fn(&T) -> G,
    V: Fn(&T) -> f64,
    G: Ord,
{
    type Summary = BTreeMap<G, Stats>;

    fn aggregate(&self, records: &[T]) -> Self::Summary {
        let mut groups = BTreeMap::new();
        for record in records {
            groups
                .entry((self.key)(record))
                .or_insert_with(Stats::default)
                .add((self.value)(record));
        }
        groups
    }
}
