//! Series merge engine
//!
//! Folds the `Series` messages of one store stream into one output series
//! per distinct identity label set.
//!
//! ```text
//! push(series):
//!   partition labels → sort own chunks by min_time
//!   compare identity with the LAST accumulator:
//!     greater → append            (stream ordered so far)
//!     equal   → merge chunk lists (another replica / later message)
//!     less    → append, sorted = false
//!
//! finish():
//!   if !sorted: stable sort accumulators by identity, merge adjacent equals
//!   decode every accumulator's chunks in min_time order
//! ```
//!
//! The store is expected to stream series in label order, but moving replica
//! labels out of the label set can change that order, so a single look-back
//! comparison detects disorder and the sort only happens when needed.
//!
//! Overlapping chunks are not merged sample by sample. When replica labels
//! are configured, a chunk starting before the end of an already accepted
//! chunk of the same series is dropped as a whole, even if part of it would
//! have filled a gap. Without replica labels nothing is dropped.

use std::cmp::Ordering;

use super::error::ReadResult;
use crate::chunk::decode_chunk;
use crate::labels::{compare_labels, ReplicaLabels};
use crate::proto::prompb::TimeSeries;
use crate::proto::storepb::{AggrChunk, Series};
use crate::proto::Label;

/// A store series split into identity and replica labels, with the chunks
/// gathered for that identity so far
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaSeries {
    /// Identity labels, sorted
    pub labels: Vec<Label>,
    /// Replica labels of the first series seen for this identity
    pub replica_labels: Vec<Label>,
    /// Chunks ordered by `min_time`
    pub chunks: Vec<AggrChunk>,
}

impl ReplicaSeries {
    fn absorb(&mut self, chunks: Vec<AggrChunk>) {
        self.chunks.extend(chunks);
        sort_chunks(&mut self.chunks);
    }
}

/// Counters describing one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Series messages received
    pub received: usize,
    /// Merges on the append-only path
    pub deduped_sorted: usize,
    /// Merges during the post-stream fix-up
    pub deduped_unsorted: usize,
    /// Chunks dropped because they overlap an accepted chunk
    pub dropped_chunks: usize,
    /// Samples decoded into the output
    pub samples: usize,
}

/// Output of a finished merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub timeseries: Vec<TimeSeries>,
    pub stats: MergeStats,
    /// Whether the stream arrived in identity order
    pub sorted: bool,
}

/// Accumulates the series of one store stream
#[derive(Debug)]
pub struct SeriesMerger<'a> {
    replica_labels: &'a ReplicaLabels,
    series: Vec<ReplicaSeries>,
    sorted: bool,
    stats: MergeStats,
}

impl<'a> SeriesMerger<'a> {
    pub fn new(replica_labels: &'a ReplicaLabels) -> Self {
        Self {
            replica_labels,
            series: Vec::new(),
            sorted: true,
            stats: MergeStats::default(),
        }
    }

    /// Number of distinct accumulators so far
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Whether every series so far arrived in identity order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Add one series message from the store stream
    pub fn push(&mut self, series: Series) {
        self.stats.received += 1;

        let parts = self.replica_labels.partition(series.labels);
        let mut chunks = series.chunks;
        sort_chunks(&mut chunks);

        if let Some(last) = self.series.last_mut() {
            match compare_labels(&last.labels, &parts.identity) {
                Ordering::Less => {}
                Ordering::Equal => {
                    last.absorb(chunks);
                    self.stats.deduped_sorted += 1;
                    return;
                }
                Ordering::Greater => self.sorted = false,
            }
        }

        self.series.push(ReplicaSeries {
            labels: parts.identity,
            replica_labels: parts.replica,
            chunks,
        });
    }

    /// Finish the stream and decode one time series per identity
    ///
    /// Fails on the first chunk that cannot be decoded.
    pub fn finish(self) -> ReadResult<MergeOutput> {
        let mut stats = self.stats;
        let series = if self.sorted {
            self.series
        } else {
            merge_unsorted(self.series, &mut stats)
        };

        let drop_overlaps = !self.replica_labels.is_empty();
        let timeseries = series
            .into_iter()
            .map(|s| decode_series(s, drop_overlaps, &mut stats))
            .collect::<ReadResult<Vec<_>>>()?;

        Ok(MergeOutput {
            timeseries,
            stats,
            sorted: self.sorted,
        })
    }
}

fn sort_chunks(chunks: &mut [AggrChunk]) {
    chunks.sort_by_key(|c| c.min_time);
}

/// Sort accumulators by identity and fold equal neighbours together
///
/// The sort is stable and the order total, so every duplicate identity ends
/// up adjacent and one pass is enough.
fn merge_unsorted(mut series: Vec<ReplicaSeries>, stats: &mut MergeStats) -> Vec<ReplicaSeries> {
    series.sort_by(|a, b| compare_labels(&a.labels, &b.labels));

    let mut merged: Vec<ReplicaSeries> = Vec::with_capacity(series.len());
    for s in series {
        match merged.last_mut() {
            Some(last) if compare_labels(&last.labels, &s.labels) == Ordering::Equal => {
                last.absorb(s.chunks);
                stats.deduped_unsorted += 1;
            }
            _ => merged.push(s),
        }
    }
    merged
}

fn decode_series(
    series: ReplicaSeries,
    drop_overlaps: bool,
    stats: &mut MergeStats,
) -> ReadResult<TimeSeries> {
    let mut samples = Vec::new();
    let mut last_max: Option<i64> = None;

    for chunk in &series.chunks {
        if drop_overlaps && last_max.is_some_and(|max| chunk.min_time < max) {
            stats.dropped_chunks += 1;
            continue;
        }
        last_max = Some(last_max.map_or(chunk.max_time, |max| max.max(chunk.max_time)));

        stats.samples += decode_chunk(chunk, &mut samples)?;
    }

    Ok(TimeSeries {
        labels: series.labels,
        samples,
    })
}
