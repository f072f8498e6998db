use tracing::{debug, warn};

use crate::core::fetch::{
    DeferredOp, FetchLatch, FetchPlan, FetchResponse, PendingFetch, QueryIdAllocator, SeriesId,
};
use crate::core::point::DataPoint;
use crate::core::series::{MergeSide, TimeSeries};
use crate::core::sync::{SyncOptions, ViewportArena, ViewportId, align_to, copy_from_master};
use crate::core::ticks::{optimized_y_ticks, x_ticks};
use crate::core::transform::CoordinateMode;
use crate::core::types::{PixelPoint, Rect, ViewportTuning};
use crate::core::viewport::{PointHit, SeriesViewport, ViewportAction};
use crate::error::{ChartError, ChartResult};
use crate::render::SeriesFrame;

/// Construction parameters for a chart surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSurfaceConfig {
    pub bounds: Rect,
    pub series_id: SeriesId,
    pub tuning: ViewportTuning,
}

impl ChartSurfaceConfig {
    #[must_use]
    pub fn new(bounds: Rect, series_id: SeriesId) -> Self {
        Self {
            bounds,
            series_id,
            tuning: ViewportTuning::default(),
        }
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: ViewportTuning) -> Self {
        self.tuning = tuning;
        self
    }
}

/// Surface-level outcome of a pan/zoom/fetch-completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceAction {
    Applied,
    NoOp,
    /// The mutation is parked behind this fetch; hand it to the loader and
    /// call `complete_fetch` with the response.
    FetchRequested(PendingFetch),
    /// Dropped: a fetch round-trip is already outstanding, or the response
    /// did not match the latched request.
    Ignored,
}

struct AssistEntry {
    id: ViewportId,
    options: SyncOptions,
    alignment: Option<Vec<Option<usize>>>,
}

/// One chart surface: a master viewport, its assist overlays, and the
/// single-outstanding-fetch latch they all move under.
///
/// All mutation is synchronous on the owning thread; the only asynchrony is
/// the fetch round-trip, during which further pan/zoom requests are dropped.
pub struct ChartSurface {
    config: ChartSurfaceConfig,
    arena: ViewportArena,
    master: ViewportId,
    assists: Vec<AssistEntry>,
    allocator: QueryIdAllocator,
    latch: FetchLatch,
}

impl ChartSurface {
    pub fn new(series: TimeSeries, config: ChartSurfaceConfig) -> ChartResult<Self> {
        let viewport = SeriesViewport::new(series, config.tuning)?;
        Self::with_master(viewport, config)
    }

    /// Builds a surface around a fixed-session ("symmetric") master.
    pub fn new_fixed_session(
        series: TimeSeries,
        fixed_count: usize,
        config: ChartSurfaceConfig,
    ) -> ChartResult<Self> {
        let viewport = SeriesViewport::fixed_session(series, fixed_count, config.tuning)?;
        Self::with_master(viewport, config)
    }

    fn with_master(mut viewport: SeriesViewport, config: ChartSurfaceConfig) -> ChartResult<Self> {
        viewport.layout(config.bounds)?;
        let mut arena = ViewportArena::new();
        let master = arena.insert(viewport);
        Ok(Self {
            config,
            arena,
            master,
            assists: Vec::new(),
            allocator: QueryIdAllocator::new(),
            latch: FetchLatch::new(),
        })
    }

    #[must_use]
    pub fn master(&self) -> &SeriesViewport {
        self.arena
            .get(self.master)
            .expect("surface always owns its master viewport")
    }

    #[must_use]
    pub fn assist(&self, id: ViewportId) -> Option<&SeriesViewport> {
        self.assists
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| self.arena.get(entry.id))
    }

    #[must_use]
    pub fn assist_count(&self) -> usize {
        self.assists.len()
    }

    #[must_use]
    pub fn has_outstanding_fetch(&self) -> bool {
        self.latch.is_latched()
    }

    /// Attaches an overlay series that mirrors the master's geometry.
    ///
    /// With `aligned`, a date-alignment pass is run so calendar gaps in the
    /// assist series project as missing points; otherwise the assist is
    /// assumed to share the master's calendar.
    pub fn attach_assist(
        &mut self,
        series: TimeSeries,
        options: SyncOptions,
        aligned: bool,
    ) -> ChartResult<ViewportId> {
        let alignment = if aligned {
            Some(align_to(self.master().series(), &series))
        } else {
            None
        };
        let viewport = SeriesViewport::new(series, self.config.tuning)?;
        let id = self.arena.insert(viewport);
        self.assists.push(AssistEntry {
            id,
            options,
            alignment,
        });
        self.sync_assists()?;
        debug!(assists = self.assists.len(), "attached assist viewport");
        Ok(id)
    }

    /// Detaches an assist. Assists must all be detached (or the surface
    /// dropped whole) before its master can go away; the arena never hands
    /// out the master slot for removal.
    pub fn detach_assist(&mut self, id: ViewportId) -> ChartResult<()> {
        let position = self
            .assists
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| ChartError::InvalidData("unknown assist viewport id".to_owned()))?;
        self.assists.remove(position);
        self.arena.remove(id);
        Ok(())
    }

    /// Re-lays the surface out into a new pixel rectangle.
    pub fn resize(&mut self, bounds: Rect) -> ChartResult<()> {
        self.config.bounds = bounds;
        self.master_mut()?.layout(bounds)?;
        self.sync_assists()
    }

    /// Pans the master window by `steps` items (positive = later data).
    pub fn pan(&mut self, steps: i64) -> ChartResult<SurfaceAction> {
        if self.latch.is_latched() {
            warn!(steps, "pan ignored: fetch outstanding");
            return Ok(SurfaceAction::Ignored);
        }
        let action = self.master_mut()?.move_by(steps)?;
        self.finish_master_action(action, DeferredOp::Move(steps))
    }

    /// Zooms the master window by `factor`.
    pub fn zoom(&mut self, factor: f64, auto_adjust: bool) -> ChartResult<SurfaceAction> {
        if self.latch.is_latched() {
            warn!(factor, "zoom ignored: fetch outstanding");
            return Ok(SurfaceAction::Ignored);
        }
        let action = self.master_mut()?.zoom(factor, auto_adjust)?;
        self.finish_master_action(
            action,
            DeferredOp::Zoom {
                factor,
                auto_adjust,
            },
        )
    }

    /// Re-windows onto the item span between two pixel positions.
    pub fn show_region(&mut self, p0: PixelPoint, p1: PixelPoint) -> ChartResult<bool> {
        let applied = self.master_mut()?.show_region(p0, p1)?;
        if applied {
            self.sync_assists()?;
        }
        Ok(applied)
    }

    pub fn locate(&mut self, pixel: PixelPoint) -> ChartResult<Option<PointHit>> {
        Ok(self.master_mut()?.locate(pixel))
    }

    pub fn locate_by_step(&mut self, delta: i64) -> ChartResult<Option<PointHit>> {
        Ok(self.master_mut()?.locate_by_step(delta))
    }

    /// Streams a new latest point into the master series.
    pub fn append_latest(&mut self, point: DataPoint) -> ChartResult<()> {
        self.master_mut()?.append_latest(point)?;
        self.sync_assists()
    }

    /// Overwrites the latest master point in place.
    pub fn replace_latest(&mut self, point: DataPoint) -> ChartResult<()> {
        self.master_mut()?.replace_latest(point)?;
        self.sync_assists()
    }

    /// Switches the coordinate mode on the master and every assist.
    pub fn set_mode(&mut self, mode: CoordinateMode) -> ChartResult<()> {
        self.master_mut()?.set_mode(mode)?;
        for position in 0..self.assists.len() {
            let id = self.assists[position].id;
            if let Some(assist) = self.arena.get_mut(id) {
                assist.set_mode(mode)?;
            }
        }
        self.sync_assists()
    }

    /// Supplies the percentage-rebase start value (prior session close).
    pub fn set_start_value(&mut self, value: f64) -> ChartResult<()> {
        self.master_mut()?.set_start_value(value)
    }

    pub fn set_boundary_flags(&mut self, at_head: bool, at_tail: bool) -> ChartResult<()> {
        self.master_mut()?.set_boundary_flags(at_head, at_tail);
        Ok(())
    }

    /// Completes an outstanding fetch: merges the response into the master
    /// series, replays the deferred pan/zoom, and re-syncs assists.
    ///
    /// Stale request ids are discarded; a failed response releases the
    /// latch and leaves the window unchanged.
    pub fn complete_fetch(&mut self, response: FetchResponse) -> ChartResult<SurfaceAction> {
        let Some(latched) = self.latch.release_if_matching(response.request_id) else {
            return Ok(SurfaceAction::Ignored);
        };
        if !response.succeeded {
            debug!(request_id = response.request_id.0, "fetch failed, dropping deferred op");
            return Ok(SurfaceAction::NoOp);
        }

        {
            let master = self.master_mut()?;
            if !response.head_items.is_empty() {
                master.merge_chunk(response.head_items, MergeSide::Head, response.head_is_boundary)?;
            } else if response.head_is_boundary {
                master.set_boundary_flags(true, master.at_tail_boundary());
            }
            if !response.tail_items.is_empty() {
                master.merge_chunk(response.tail_items, MergeSide::Tail, response.tail_is_boundary)?;
            } else if response.tail_is_boundary {
                master.set_boundary_flags(master.at_head_boundary(), true);
            }
        }
        self.refresh_alignments();

        let action = {
            let master = self.master_mut()?;
            match latched.deferred {
                DeferredOp::Move(steps) => master.move_by(steps)?,
                DeferredOp::Zoom {
                    factor,
                    auto_adjust,
                } => master.zoom(factor, auto_adjust)?,
            }
        };
        self.finish_master_action(action, latched.deferred)
    }

    /// Builds a render snapshot of the master viewport.
    pub fn frame(&self, value_columns: usize, time_columns: usize) -> ChartResult<SeriesFrame> {
        let master = self.master();
        Ok(SeriesFrame {
            bounds: master.bounds(),
            points: master.pixel_points().to_vec(),
            value_ticks: optimized_y_ticks(master, value_columns)?,
            time_ticks: x_ticks(master, time_columns),
        })
    }

    fn master_mut(&mut self) -> ChartResult<&mut SeriesViewport> {
        self.arena
            .get_mut(self.master)
            .ok_or_else(|| ChartError::InvalidData("surface lost its master viewport".to_owned()))
    }

    fn finish_master_action(
        &mut self,
        action: ViewportAction,
        deferred: DeferredOp,
    ) -> ChartResult<SurfaceAction> {
        match action {
            ViewportAction::Applied => {
                self.sync_assists()?;
                Ok(SurfaceAction::Applied)
            }
            ViewportAction::NoOp => Ok(SurfaceAction::NoOp),
            ViewportAction::NeedsFetch(plan) => Ok(SurfaceAction::FetchRequested(
                self.latch_plan(plan, deferred)?,
            )),
        }
    }

    fn latch_plan(&mut self, plan: FetchPlan, deferred: DeferredOp) -> ChartResult<PendingFetch> {
        let pending = PendingFetch::from_plan(self.allocator.next_id(), self.config.series_id, plan);
        self.latch
            .latch(pending, deferred)
            .map_err(|_| ChartError::InvalidData("fetch latch already occupied".to_owned()))?;
        Ok(pending)
    }

    /// Head merges shift master indices, so date alignments are recomputed
    /// before any deferred op replays.
    fn refresh_alignments(&mut self) {
        for position in 0..self.assists.len() {
            if self.assists[position].alignment.is_none() {
                continue;
            }
            let id = self.assists[position].id;
            let Some(assist) = self.arena.get(id) else {
                continue;
            };
            let alignment = align_to(
                self.arena
                    .get(self.master)
                    .expect("surface always owns its master viewport")
                    .series(),
                assist.series(),
            );
            self.assists[position].alignment = Some(alignment);
        }
    }

    fn sync_assists(&mut self) -> ChartResult<()> {
        for entry in &self.assists {
            copy_from_master(
                &mut self.arena,
                self.master,
                entry.id,
                entry.options,
                entry.alignment.as_deref(),
            )?;
        }
        Ok(())
    }
}
