//! Per-performance-item metric index
//!
//! Maps a `(period start, period end, category)` key to the single
//! [`CounterMetric`] bucket recorded for that window, so renderers can look up
//! a month in O(1) instead of re-scanning every measurement.
//!
//! The decoder populates the index while walking a document; once decoding is
//! finished the index is only read. Buckets keep their insertion order.

use crate::types::{CounterMetric, MetricCategory};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Composite lookup key. Equality is exact on all three fields.
type MetricKey = (NaiveDate, NaiveDate, MetricCategory);

/// Index of measurement buckets for one performance item
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricIndex {
    /// Buckets in insertion order
    metrics: Vec<CounterMetric>,
    /// Lookup map: key → position in `metrics`
    #[serde(skip)]
    lookup: HashMap<MetricKey, usize>,
}

impl MetricIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bucket for a key, creating an empty one on first access
    pub fn get_or_create(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        category: MetricCategory,
    ) -> &mut CounterMetric {
        let idx = match self.lookup.get(&(start, end, category)) {
            Some(&idx) => idx,
            None => {
                self.metrics.push(CounterMetric::new(start, end, category));
                let idx = self.metrics.len() - 1;
                self.lookup.insert((start, end, category), idx);
                idx
            }
        };
        &mut self.metrics[idx]
    }

    /// Insert a bucket, replacing any bucket already stored under the same key
    ///
    /// The replaced bucket keeps its position; the previous contents are
    /// returned so callers can report the collision.
    pub fn insert(&mut self, metric: CounterMetric) -> Option<CounterMetric> {
        let key = (metric.start, metric.end, metric.category);
        match self.lookup.get(&key) {
            Some(&idx) => Some(std::mem::replace(&mut self.metrics[idx], metric)),
            None => {
                self.metrics.push(metric);
                self.lookup.insert(key, self.metrics.len() - 1);
                None
            }
        }
    }

    /// Pure lookup used while rendering
    pub fn try_get(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: MetricCategory,
    ) -> Option<&CounterMetric> {
        self.lookup
            .get(&(start, end, category))
            .and_then(|&idx| self.metrics.get(idx))
    }

    /// Number of distinct keys in the index
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Buckets in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CounterMetric> {
        self.metrics.iter()
    }
}
