use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::point::{DataPoint, is_value_na};
use crate::core::transform::{CoordinateMode, retransform_value};
use crate::error::{ChartError, ChartResult};

/// Value-extraction family of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeriesKind {
    #[default]
    Close,
    Ohlc,
    MultiValue,
    Volume,
}

/// Which edge of the loaded series a chunk merges into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Head,
    Tail,
}

/// Splice bookkeeping returned by [`TimeSeries::merge_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Items taken from the incoming chunk.
    pub added: usize,
    /// Existing items spliced out because the chunk overlapped them.
    pub removed: usize,
}

impl MergeOutcome {
    /// Net index shift seen by indices that pointed into the old series.
    #[must_use]
    pub fn net_shift(self) -> i64 {
        self.added as i64 - self.removed as i64
    }
}

/// Insertion-ordered, date-unique sequence of data points.
///
/// Dates are strictly increasing. Mutation is restricted to chunk merges at
/// either edge and streaming append/replace of the latest point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    kind: SeriesKind,
    points: Vec<DataPoint>,
}

impl TimeSeries {
    pub fn new(kind: SeriesKind, points: Vec<DataPoint>) -> ChartResult<Self> {
        validate_strictly_increasing(&points)?;
        let mut series = Self { kind, points };
        series.recompute_changes_from(0);
        Ok(series)
    }

    #[must_use]
    pub fn empty(kind: SeriesKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DataPoint> {
        self.points.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&DataPoint> {
        self.points.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    #[must_use]
    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    /// Dates of every loaded point, in order.
    pub fn dates(&self) -> impl Iterator<Item = i64> + '_ {
        self.points.iter().map(|point| point.date)
    }

    /// Index of the latest point whose date is `<= date`.
    ///
    /// Returns `None` when every loaded point is later than `date`.
    #[must_use]
    pub fn index_at_or_before(&self, date: i64) -> Option<usize> {
        let insertion = self.points.partition_point(|point| point.date <= date);
        insertion.checked_sub(1)
    }

    /// Merges a fetched chunk into one edge of the series.
    ///
    /// Existing points whose dates the chunk covers are spliced out (the
    /// chunk is the fresher copy), then the boundary item's `value_change`
    /// is recomputed against its new predecessor. The series stays
    /// strictly date-increasing.
    pub fn merge_chunk(&mut self, items: Vec<DataPoint>, side: MergeSide) -> ChartResult<MergeOutcome> {
        if items.is_empty() {
            return Ok(MergeOutcome::default());
        }
        validate_strictly_increasing(&items)?;

        let outcome = match side {
            MergeSide::Tail => {
                let chunk_start = items[0].date;
                // Everything at or past the chunk's first date is overlap.
                let keep = self.points.partition_point(|point| point.date < chunk_start);
                let removed = self.points.len() - keep;
                self.points.truncate(keep);
                let boundary = self.points.len();
                let added = items.len();
                self.points.extend(items);
                self.recompute_changes_from(boundary);
                MergeOutcome { added, removed }
            }
            MergeSide::Head => {
                let chunk_end = items[items.len() - 1].date;
                // Existing prefix covered by the chunk is overlap.
                let removed = self.points.partition_point(|point| point.date <= chunk_end);
                let added = items.len();
                self.points.splice(0..removed, items);
                // Boundary item is the first surviving original point.
                self.recompute_changes_from(added.min(self.points.len()));
                MergeOutcome { added, removed }
            }
        };

        debug_assert!(validate_strictly_increasing(&self.points).is_ok());
        debug!(
            side = ?side,
            added = outcome.added,
            removed = outcome.removed,
            len = self.points.len(),
            "merged chunk"
        );
        Ok(outcome)
    }

    /// Appends a streaming point strictly after the current tail.
    pub fn append(&mut self, mut point: DataPoint) -> ChartResult<()> {
        if let Some(last) = self.points.last() {
            match point.date.cmp(&last.date) {
                Ordering::Greater => {}
                Ordering::Equal | Ordering::Less => {
                    return Err(ChartError::InvalidData(
                        "appended point date must be after the latest date".to_owned(),
                    ));
                }
            }
            point.value_change = change_between(last.value, point.value);
            rechain_secondary_changes(last, &mut point);
        }
        trace!(date = point.date, "append streaming point");
        self.points.push(point);
        Ok(())
    }

    /// Overwrites the latest point in place, keeping its date.
    pub fn replace_last(&mut self, mut point: DataPoint) -> ChartResult<()> {
        let len = self.points.len();
        let Some(last) = self.points.last() else {
            return Err(ChartError::InvalidData(
                "cannot replace the latest point of an empty series".to_owned(),
            ));
        };
        if point.date != last.date {
            return Err(ChartError::InvalidData(
                "replacement point must keep the latest date".to_owned(),
            ));
        }

        if let Some(previous) = len.checked_sub(2).and_then(|index| self.points.get(index)) {
            point.value_change = change_between(previous.value, point.value);
            rechain_secondary_changes(previous, &mut point);
        }
        self.points[len - 1] = point;
        Ok(())
    }

    /// Rewrites every stored value from one coordinate mode to another.
    ///
    /// Volume series carry traded quantity, not prices, and only admit
    /// linear storage.
    pub fn retransform(&mut self, from: CoordinateMode, to: CoordinateMode) -> ChartResult<()> {
        if self.kind == SeriesKind::Volume
            && (from != CoordinateMode::Linear || to != CoordinateMode::Linear)
        {
            return Err(ChartError::UnsupportedTransform { from, to });
        }
        if from.stores_linear() == to.stores_linear() {
            return Ok(());
        }

        // Rewrite a scratch copy so a value that cannot transform (e.g. a
        // non-positive price under log) leaves the stored series untouched.
        let mut rewritten = self.points.clone();
        for point in &mut rewritten {
            point.value = retransform_value(point.value, from, to)?;
            match &mut point.detail {
                crate::core::point::PointDetail::Ohlc { open, high, low } => {
                    *open = retransform_value(*open, from, to)?;
                    *high = retransform_value(*high, from, to)?;
                    *low = retransform_value(*low, from, to)?;
                }
                crate::core::point::PointDetail::Multi { values, .. } => {
                    for value in values.iter_mut() {
                        *value = retransform_value(*value, from, to)?;
                    }
                }
                _ => {}
            }
        }
        self.points = rewritten;
        self.recompute_changes_from(0);
        debug!(?from, ?to, len = self.points.len(), "retransformed series");
        Ok(())
    }

    /// Recomputes `value_change` (and multi-value secondary changes) for
    /// points at `start..`, chaining from the predecessor of `start`.
    fn recompute_changes_from(&mut self, start: usize) {
        for index in start.max(1)..self.points.len() {
            let (before, after) = self.points.split_at_mut(index);
            let previous = &before[index - 1];
            let point = &mut after[0];
            point.value_change = change_between(previous.value, point.value);
            rechain_secondary_changes(previous, point);
        }
        if start == 0 {
            if let Some(first) = self.points.first_mut() {
                first.value_change = 0.0;
                if let crate::core::point::PointDetail::Multi { changes, .. } = &mut first.detail {
                    changes.fill(0.0);
                }
            }
        }
    }
}

fn change_between(previous: f64, current: f64) -> f64 {
    if is_value_na(previous) || is_value_na(current) {
        0.0
    } else {
        current - previous
    }
}

/// Chains a multi-value point's secondary changes against its predecessor,
/// slot by slot. Slots the predecessor does not carry chain to zero.
fn rechain_secondary_changes(previous: &DataPoint, point: &mut DataPoint) {
    let crate::core::point::PointDetail::Multi { values, changes } = &mut point.detail else {
        return;
    };
    let previous_values = previous.secondary_values();
    for (slot, change) in changes.iter_mut().enumerate() {
        *change = match (previous_values.get(slot), values.get(slot)) {
            (Some(previous_value), Some(value)) => change_between(*previous_value, *value),
            _ => 0.0,
        };
    }
}

fn validate_strictly_increasing(points: &[DataPoint]) -> ChartResult<()> {
    for pair in points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(ChartError::InvalidData(
                "series dates must be strictly increasing and unique".to_owned(),
            ));
        }
    }
    Ok(())
}
