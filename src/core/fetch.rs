use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::point::DataPoint;

/// Identifier of one fetch round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub u64);

/// Identifier of the series a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub u32);

/// Caller-owned id source; replaces the process-wide query counters of
/// older engines so surfaces can be created and torn down independently.
#[derive(Debug, Default)]
pub struct QueryIdAllocator {
    next: u64,
}

impl QueryIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> QueryId {
        let id = QueryId(self.next);
        self.next += 1;
        id
    }
}

/// One edge of a fetch request: items beyond `anchor_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSpan {
    pub anchor_date: i64,
    pub count: usize,
}

/// Edge demand emitted by a viewport before it is stamped with ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchPlan {
    pub head: Option<FetchSpan>,
    pub tail: Option<FetchSpan>,
}

impl FetchPlan {
    #[must_use]
    pub fn head(anchor_date: i64, count: usize) -> Self {
        Self {
            head: Some(FetchSpan { anchor_date, count }),
            tail: None,
        }
    }

    #[must_use]
    pub fn tail(anchor_date: i64, count: usize) -> Self {
        Self {
            head: None,
            tail: Some(FetchSpan { anchor_date, count }),
        }
    }
}

/// Wire form of a fetch request handed to the external loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFetch {
    pub request_id: QueryId,
    pub series_id: SeriesId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_anchor_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_anchor_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_count: Option<usize>,
}

impl PendingFetch {
    #[must_use]
    pub fn from_plan(request_id: QueryId, series_id: SeriesId, plan: FetchPlan) -> Self {
        Self {
            request_id,
            series_id,
            head_anchor_date: plan.head.map(|span| span.anchor_date),
            head_count: plan.head.map(|span| span.count),
            tail_anchor_date: plan.tail.map(|span| span.anchor_date),
            tail_count: plan.tail.map(|span| span.count),
        }
    }
}

/// Loader response for a previously emitted [`PendingFetch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub request_id: QueryId,
    pub succeeded: bool,
    #[serde(default)]
    pub head_items: Vec<DataPoint>,
    #[serde(default)]
    pub head_is_boundary: bool,
    #[serde(default)]
    pub tail_items: Vec<DataPoint>,
    #[serde(default)]
    pub tail_is_boundary: bool,
}

impl FetchResponse {
    #[must_use]
    pub fn failed(request_id: QueryId) -> Self {
        Self {
            request_id,
            succeeded: false,
            head_items: Vec::new(),
            head_is_boundary: false,
            tail_items: Vec::new(),
            tail_is_boundary: false,
        }
    }
}

/// Viewport mutation parked behind an outstanding fetch, replayed verbatim
/// once the response merges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredOp {
    Move(i64),
    Zoom { factor: f64, auto_adjust: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatchedFetch {
    pub pending: PendingFetch,
    pub deferred: DeferredOp,
}

/// Single-slot request latch.
///
/// While occupied, new pan/zoom requests are dropped rather than queued;
/// only the response matching the latched `QueryId` releases it.
#[derive(Debug, Default)]
pub struct FetchLatch {
    slot: Option<LatchedFetch>,
}

impl FetchLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_latched(&self) -> bool {
        self.slot.is_some()
    }

    #[must_use]
    pub fn outstanding(&self) -> Option<&PendingFetch> {
        self.slot.as_ref().map(|latched| &latched.pending)
    }

    /// Parks a request; fails (returning it back) when already occupied.
    pub fn latch(&mut self, pending: PendingFetch, deferred: DeferredOp) -> Result<(), PendingFetch> {
        if self.slot.is_some() {
            warn!(request_id = pending.request_id.0, "fetch latch occupied, dropping request");
            return Err(pending);
        }
        debug!(request_id = pending.request_id.0, "latched fetch request");
        self.slot = Some(LatchedFetch { pending, deferred });
        Ok(())
    }

    /// Releases the latch when `request_id` matches; stale ids leave it held.
    pub fn release_if_matching(&mut self, request_id: QueryId) -> Option<LatchedFetch> {
        match &self.slot {
            Some(latched) if latched.pending.request_id == request_id => self.slot.take(),
            Some(latched) => {
                warn!(
                    expected = latched.pending.request_id.0,
                    got = request_id.0,
                    "discarding fetch response with stale query id"
                );
                None
            }
            None => {
                warn!(got = request_id.0, "discarding fetch response with no latch held");
                None
            }
        }
    }
}
