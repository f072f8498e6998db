use serde::{Deserialize, Serialize};

use crate::core::series::TimeSeries;
use crate::core::viewport::SeriesViewport;
use crate::error::{ChartError, ChartResult};

/// Handle into a [`ViewportArena`] slot.
///
/// Assist viewports reference their master through a handle instead of a
/// raw back-reference, so teardown order stays explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportId(usize);

/// Slot arena owning every viewport of one chart surface.
#[derive(Debug, Default)]
pub struct ViewportArena {
    slots: Vec<Option<SeriesViewport>>,
}

impl ViewportArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, viewport: SeriesViewport) -> ViewportId {
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            self.slots[free] = Some(viewport);
            return ViewportId(free);
        }
        self.slots.push(Some(viewport));
        ViewportId(self.slots.len() - 1)
    }

    pub fn remove(&mut self, id: ViewportId) -> Option<SeriesViewport> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    #[must_use]
    pub fn get(&self, id: ViewportId) -> Option<&SeriesViewport> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: ViewportId) -> Option<&mut SeriesViewport> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Splits borrows so an assist can be mutated while its master is read.
    #[must_use]
    pub fn master_and_assist_mut(
        &mut self,
        master: ViewportId,
        assist: ViewportId,
    ) -> Option<(&SeriesViewport, &mut SeriesViewport)> {
        if master.0 == assist.0 || master.0 >= self.slots.len() || assist.0 >= self.slots.len() {
            return None;
        }

        let (low, high, master_is_low) = if master.0 < assist.0 {
            (master.0, assist.0, true)
        } else {
            (assist.0, master.0, false)
        };
        let (left, right) = self.slots.split_at_mut(high);
        let low_slot = left[low].as_mut()?;
        let high_slot = right[0].as_mut()?;
        if master_is_low {
            Some((&*low_slot, high_slot))
        } else {
            Some((&*high_slot, low_slot))
        }
    }
}

/// How an assist viewport mirrors its master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// When set, the assist computes its own window Y range instead of
    /// projecting onto the master's value axis.
    pub independent_y: bool,
}

/// Merge-join of two date-sorted series: for every master index, the
/// matching assist index or `None` for a calendar gap.
#[must_use]
pub fn align_to(master: &TimeSeries, assist: &TimeSeries) -> Vec<Option<usize>> {
    let mut alignment = Vec::with_capacity(master.len());
    let assist_points = assist.points();
    let mut cursor = 0usize;
    for master_point in master.points() {
        while cursor < assist_points.len() && assist_points[cursor].date < master_point.date {
            cursor += 1;
        }
        if cursor < assist_points.len() && assist_points[cursor].date == master_point.date {
            alignment.push(Some(cursor));
            cursor += 1;
        } else {
            alignment.push(None);
        }
    }
    alignment
}

/// Copies the master's window geometry into an assist viewport.
///
/// Spacing, window length and X positions transfer verbatim; the Y side
/// follows `options` and the optional date alignment (see
/// [`SeriesViewport::sync_from`]).
pub fn copy_from_master(
    arena: &mut ViewportArena,
    master: ViewportId,
    assist: ViewportId,
    options: SyncOptions,
    alignment: Option<&[Option<usize>]>,
) -> ChartResult<()> {
    let (master_viewport, assist_viewport) = arena
        .master_and_assist_mut(master, assist)
        .ok_or_else(|| ChartError::InvalidData("unknown master/assist viewport ids".to_owned()))?;
    assist_viewport.sync_from(master_viewport, options, alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::point::DataPoint;
    use crate::core::series::SeriesKind;

    fn closes(dates: &[i64]) -> TimeSeries {
        let points = dates
            .iter()
            .map(|date| DataPoint::close(*date, *date as f64).expect("point"))
            .collect();
        TimeSeries::new(SeriesKind::Close, points).expect("series")
    }

    #[test]
    fn alignment_marks_calendar_gaps_as_none() {
        let master = closes(&[10, 20, 30, 40]);
        let assist = closes(&[10, 30, 40]);

        let alignment = align_to(&master, &assist);
        assert_eq!(alignment, vec![Some(0), None, Some(1), Some(2)]);
    }

    #[test]
    fn alignment_ignores_assist_only_dates() {
        let master = closes(&[20, 40]);
        let assist = closes(&[10, 20, 30, 40, 50]);

        let alignment = align_to(&master, &assist);
        assert_eq!(alignment, vec![Some(1), Some(3)]);
    }

    #[test]
    fn arena_handles_survive_removal_of_other_slots() {
        let mut arena = ViewportArena::new();
        let tuning = crate::core::types::ViewportTuning::default();
        let first = arena.insert(SeriesViewport::new(closes(&[1]), tuning).unwrap());
        let second = arena.insert(SeriesViewport::new(closes(&[2]), tuning).unwrap());

        assert!(arena.remove(first).is_some());
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());

        // Freed slot is reused.
        let third = arena.insert(SeriesViewport::new(closes(&[3]), tuning).unwrap());
        assert_eq!(third, first);
    }

    #[test]
    fn master_and_assist_split_borrow_rejects_same_slot() {
        let mut arena = ViewportArena::new();
        let tuning = crate::core::types::ViewportTuning::default();
        let only = arena.insert(SeriesViewport::new(closes(&[1]), tuning).unwrap());
        assert!(arena.master_and_assist_mut(only, only).is_none());
    }
}
