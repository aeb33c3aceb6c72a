//! The plotted data series, as seen by the annotation engine.

use crate::geometry::nearest_index_by_timestamp;
use serde::{Deserialize, Serialize};

/// One plotted bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// A flat bar at a single price.
    pub fn flat(timestamp: i64, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }
}

/// Ordered sequence of plotted bars.
///
/// The series may be replaced at any time (new data, timeframe change);
/// shapes look up their anchors by nearest timestamp, never by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    bars: Vec<Bar>,
    #[serde(skip)]
    timestamps: Vec<i64>,
}

impl DataSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        let timestamps = bars.iter().map(|b| b.timestamp).collect();
        Self { bars, timestamps }
    }

    /// Replace all bars.
    pub fn replace(&mut self, bars: Vec<Bar>) {
        *self = Self::new(bars);
    }

    /// Append a bar, or update the last one if the timestamp matches.
    pub fn push(&mut self, bar: Bar) {
        match self.bars.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => {
                self.bars.push(bar);
                self.timestamps.push(bar.timestamp);
            }
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn timestamp_at(&self, index: usize) -> Option<i64> {
        self.timestamps.get(index).copied()
    }

    /// Index of the bar nearest to `timestamp`.
    pub fn nearest_index(&self, timestamp: i64) -> Option<usize> {
        nearest_index_by_timestamp(&self.timestamps, timestamp)
    }

    /// Rebuild the timestamp index after deserialization.
    pub(crate) fn reindex(&mut self) {
        self.timestamps = self.bars.iter().map(|b| b.timestamp).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(ts: &[i64]) -> DataSeries {
        DataSeries::new(ts.iter().map(|&t| Bar::flat(t, 1.0)).collect())
    }

    #[test]
    fn test_push_appends_and_updates_last() {
        let mut s = series(&[10, 20]);
        s.push(Bar::flat(20, 5.0));
        assert_eq!(s.len(), 2);
        assert!((s.bars()[1].close - 5.0).abs() < f64::EPSILON);
        s.push(Bar::flat(30, 2.0));
        assert_eq!(s.timestamps(), &[10, 20, 30]);
    }

    #[test]
    fn test_nearest_index_tracks_replacement() {
        let mut s = series(&[100, 200, 300]);
        assert_eq!(s.nearest_index(200), Some(1));
        s.replace((0..3).map(|i| Bar::flat(150 + i * 100, 1.0)).collect());
        assert_eq!(s.nearest_index(200), Some(0));
    }

    #[test]
    fn test_deserialized_series_reindexes() {
        let json = r#"{"bars":[{"timestamp":1,"open":1,"high":1,"low":1,"close":1}]}"#;
        let mut s: DataSeries = serde_json::from_str(json).unwrap();
        assert!(s.timestamps().is_empty());
        s.reindex();
        assert_eq!(s.timestamps(), &[1]);
    }
}
