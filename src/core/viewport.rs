use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::fetch::FetchPlan;
use crate::core::point::{DataPoint, VALUE_NA, is_value_na};
use crate::core::series::{MergeOutcome, MergeSide, TimeSeries};
use crate::core::transform::{CoordinateMode, percentage_display};
use crate::core::types::{PixelPoint, Rect, ViewportTuning};
use crate::error::{ChartError, ChartResult};

/// Outcome of a window mutation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportAction {
    /// Window fields changed and derived state was recomputed.
    Applied,
    /// Nothing to do; state is unchanged.
    NoOp,
    /// The mutation ran off loaded data; the caller must fetch, merge and
    /// re-issue the same request.
    NeedsFetch(FetchPlan),
}

/// Window fields a gesture mutates before the derived-state refresh runs.
#[derive(Debug, Clone, Copy)]
struct WindowGeometry {
    start_index: Option<usize>,
    visible_count: usize,
    item_width: f64,
    item_gap: f64,
}

/// Cursor hit produced by [`SeriesViewport::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointHit {
    /// Absolute index into the series.
    pub index: usize,
    /// Offset inside the visible window.
    pub window_offset: usize,
    pub pixel: PixelPoint,
    pub date: i64,
    pub value: f64,
}

/// Windowed view over one time series with pixel projection.
///
/// A viewport is inert until the first `layout` call with a valid pixel
/// rectangle; afterwards every pan/zoom/resize/merge keeps the invariant
/// `start_index + visible_count <= series.len()` and a point array of
/// exactly `visible_count` entries.
#[derive(Debug, Clone)]
pub struct SeriesViewport {
    series: TimeSeries,
    tuning: ViewportTuning,
    mode: CoordinateMode,
    /// Percentage-rebase base for symmetric sessions (prior close).
    start_value: Option<f64>,
    bounds: Rect,
    start_index: Option<usize>,
    visible_count: usize,
    item_width: f64,
    item_gap: f64,
    y_per_unit: f64,
    current_index: Option<usize>,
    max_index: Option<usize>,
    min_index: Option<usize>,
    at_head_boundary: bool,
    at_tail_boundary: bool,
    fixed_visible_count: Option<usize>,
    points: Vec<PixelPoint>,
}

impl SeriesViewport {
    pub fn new(series: TimeSeries, tuning: ViewportTuning) -> ChartResult<Self> {
        let tuning = tuning.validate()?;
        let mut viewport = Self {
            series,
            tuning,
            mode: CoordinateMode::Linear,
            start_value: None,
            bounds: Rect::default(),
            start_index: None,
            visible_count: 0,
            item_width: tuning.default_item_width,
            item_gap: 0.0,
            y_per_unit: 0.0,
            current_index: None,
            max_index: None,
            min_index: None,
            at_head_boundary: false,
            at_tail_boundary: false,
            fixed_visible_count: None,
            points: Vec::new(),
        };
        if let Some((body, gap)) = viewport.split_item_width(tuning.default_item_width) {
            viewport.item_width = body;
            viewport.item_gap = gap;
        }
        Ok(viewport)
    }

    /// Builds a fixed-session ("symmetric") viewport: a non-resizable item
    /// count spanning one trading session. Item width derives from the
    /// layout width and zoom is disabled.
    pub fn fixed_session(
        series: TimeSeries,
        fixed_count: usize,
        tuning: ViewportTuning,
    ) -> ChartResult<Self> {
        if fixed_count < 2 {
            return Err(ChartError::InvalidData(
                "fixed session count must be >= 2".to_owned(),
            ));
        }
        let mut viewport = Self::new(series, tuning)?;
        viewport.fixed_visible_count = Some(fixed_count);
        Ok(viewport)
    }

    #[must_use]
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    #[must_use]
    pub fn mode(&self) -> CoordinateMode {
        self.mode
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.start_index.is_some()
    }

    #[must_use]
    pub fn start_index(&self) -> Option<usize> {
        self.start_index
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    #[must_use]
    pub fn item_width(&self) -> f64 {
        self.item_width
    }

    #[must_use]
    pub fn item_gap(&self) -> f64 {
        self.item_gap
    }

    #[must_use]
    pub fn y_per_unit(&self) -> f64 {
        self.y_per_unit
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    #[must_use]
    pub fn at_head_boundary(&self) -> bool {
        self.at_head_boundary
    }

    #[must_use]
    pub fn at_tail_boundary(&self) -> bool {
        self.at_tail_boundary
    }

    #[must_use]
    pub fn fixed_visible_count(&self) -> Option<usize> {
        self.fixed_visible_count
    }

    #[must_use]
    pub fn tuning(&self) -> ViewportTuning {
        self.tuning
    }

    /// Projected pixel points, one per visible item.
    #[must_use]
    pub fn pixel_points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn set_boundary_flags(&mut self, at_head: bool, at_tail: bool) {
        self.at_head_boundary = at_head;
        self.at_tail_boundary = at_tail;
    }

    /// Supplies the percentage-rebase start value (prior session close).
    pub fn set_start_value(&mut self, value: f64) -> ChartResult<()> {
        if !value.is_finite() || value == 0.0 {
            return Err(ChartError::InvalidData(
                "start value must be finite and non-zero".to_owned(),
            ));
        }
        self.start_value = Some(value);
        Ok(())
    }

    /// Switches the coordinate mode, rewriting stored values as needed.
    pub fn set_mode(&mut self, mode: CoordinateMode) -> ChartResult<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.series.retransform(self.mode, mode)?;
        self.mode = mode;
        if self.is_initialized() {
            self.refresh_window()?;
        }
        Ok(())
    }

    /// Lays the viewport out into a pixel rectangle.
    ///
    /// The first call windows the trailing items that fit; later calls keep
    /// the window tail anchored while re-fitting the visible count.
    pub fn layout(&mut self, bounds: Rect) -> ChartResult<()> {
        if !bounds.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: bounds.width.max(0.0) as u32,
                height: bounds.height.max(0.0) as u32,
            });
        }
        self.bounds = bounds;

        if self.mode == CoordinateMode::Percentage {
            // Fails fast when no rebase value can ever be resolved.
            self.percentage_base()?;
        }

        let len = self.series.len();
        if len == 0 {
            self.points.clear();
            return Ok(());
        }

        if let Some(fixed) = self.fixed_visible_count {
            self.item_width = (bounds.width - 1.0) / (fixed - 1) as f64;
            self.item_gap = 0.0;
            self.start_index = Some(0);
            self.visible_count = len.min(fixed);
        } else if let Some(start) = self.start_index {
            // Resize: keep the tail of the window anchored.
            let tail = start + self.visible_count.max(1) - 1;
            let fit = self.items_that_fit(self.item_width, self.item_gap).max(1);
            let count = fit.min(tail + 1);
            self.start_index = Some(tail + 1 - count);
            self.visible_count = count;
        } else {
            let fit = self.items_that_fit(self.item_width, self.item_gap).max(1);
            let count = fit.min(len);
            self.start_index = Some(len - count);
            self.visible_count = count;
        }

        self.refresh_window()
    }

    /// Pans the window by `steps` items (positive = toward later data).
    pub fn move_by(&mut self, steps: i64) -> ChartResult<ViewportAction> {
        if steps == 0 || self.series.is_empty() {
            return Ok(ViewportAction::NoOp);
        }
        let Some(start) = self.start_index else {
            return Ok(ViewportAction::NoOp);
        };

        let len = self.series.len();
        let max_start = (len - self.visible_count) as i64;
        let desired = start as i64 + steps;
        let clamped = desired.clamp(0, max_start);
        let real_steps = clamped - start as i64;

        if real_steps != steps {
            let overrun = steps.abs_diff(real_steps) as usize;
            let wanted = overrun.max(self.tuning.fetch_batch_min);
            if steps < 0 && !self.at_head_boundary {
                let anchor = self.series.first().map(|point| point.date).unwrap_or(0);
                trace!(steps, overrun, "pan needs head fetch");
                return Ok(ViewportAction::NeedsFetch(FetchPlan::head(anchor, wanted)));
            }
            if steps > 0 && !self.at_tail_boundary {
                let anchor = self.series.last().map(|point| point.date).unwrap_or(0);
                trace!(steps, overrun, "pan needs tail fetch");
                return Ok(ViewportAction::NeedsFetch(FetchPlan::tail(anchor, wanted)));
            }
        }

        if real_steps == 0 {
            return Ok(ViewportAction::NoOp);
        }

        let new_start = clamped as usize;
        let fit = self.items_that_fit(self.item_width, self.item_gap).max(1);
        let previous = self.window_geometry();
        self.start_index = Some(new_start);
        self.visible_count = (self.visible_count + real_steps.unsigned_abs() as usize)
            .min(fit)
            .min(len - new_start);
        self.refresh_or_restore(previous)?;
        debug!(steps, real_steps, start = new_start, "pan applied");
        Ok(ViewportAction::Applied)
    }

    /// Rescales item width by `factor`, keeping the window tail anchored.
    ///
    /// With `auto_adjust`, a rejected or no-change fit nudges the factor by
    /// ten percent and retries a few times. A head overrun emits a fetch
    /// plan and leaves the width untouched so the zoom never partially
    /// applies.
    pub fn zoom(&mut self, factor: f64, auto_adjust: bool) -> ChartResult<ViewportAction> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ChartError::InvalidData(
                "zoom factor must be finite and > 0".to_owned(),
            ));
        }
        if factor == 1.0 || self.fixed_visible_count.is_some() || self.series.is_empty() {
            return Ok(ViewportAction::NoOp);
        }
        let Some(start) = self.start_index else {
            return Ok(ViewportAction::NoOp);
        };

        let zooming_in = factor > 1.0;
        let mut factor = factor;
        let mut accepted = None;
        for _ in 0..8 {
            let candidate = factor * (self.item_width + self.item_gap);
            match self.split_item_width(candidate) {
                Some((body, gap)) if (body, gap) != (self.item_width, self.item_gap) => {
                    accepted = Some((body, gap));
                    break;
                }
                _ if auto_adjust => {
                    factor *= if zooming_in { 1.1 } else { 0.9 };
                }
                _ => break,
            }
        }
        let Some((body, gap)) = accepted else {
            return Ok(ViewportAction::NoOp);
        };

        let len = self.series.len();
        let tail = start + self.visible_count - 1;
        let fit = self.items_that_fit(body, gap).max(1);
        let new_start = tail as i64 + 1 - fit as i64;

        if new_start < 0 && !self.at_head_boundary {
            let overrun = (-new_start) as usize;
            let anchor = self.series.first().map(|point| point.date).unwrap_or(0);
            trace!(overrun, "zoom needs head fetch, width rolled back");
            return Ok(ViewportAction::NeedsFetch(FetchPlan::head(
                anchor,
                overrun.max(self.tuning.fetch_batch_min),
            )));
        }

        let previous = self.window_geometry();
        self.item_width = body;
        self.item_gap = gap;
        if new_start < 0 {
            self.start_index = Some(0);
            self.visible_count = tail + 1;
        } else {
            let new_start = new_start as usize;
            self.start_index = Some(new_start);
            self.visible_count = fit.min(len - new_start);
        }
        self.refresh_or_restore(previous)?;
        debug!(body, gap, count = self.visible_count, "zoom applied");
        Ok(ViewportAction::Applied)
    }

    /// Re-windows onto the item span between two pixel positions.
    ///
    /// Returns `false` (leaving state untouched) when the span covers fewer
    /// than two items or the implied item width cannot be fit.
    pub fn show_region(&mut self, p0: PixelPoint, p1: PixelPoint) -> ChartResult<bool> {
        let Some(start) = self.start_index else {
            return Ok(false);
        };
        if self.points.len() < 2 {
            return Ok(false);
        }

        let mut first = self.pixel_offset_at_or_before(p0.x);
        let mut second = self.pixel_offset_at_or_before(p1.x);
        if first > second {
            std::mem::swap(&mut first, &mut second);
        }
        if second - first < 1 {
            return Ok(false);
        }

        let count = second - first + 1;
        let Some((body, gap)) = self.split_item_width(self.bounds.width / count as f64) else {
            return Ok(false);
        };

        let previous = self.window_geometry();
        self.item_width = body;
        self.item_gap = gap;
        self.start_index = Some(start + first);
        self.visible_count = count;
        self.refresh_or_restore(previous)?;
        debug!(count, "region select applied");
        Ok(true)
    }

    /// Locates the visible point nearest at-or-before a pixel X and moves
    /// the cursor there.
    ///
    /// A hit on the window's minimum-value point nudges the pixel Y one row
    /// up from the axis edge so cursor labels stay inside the drawable area.
    pub fn locate(&mut self, pixel: PixelPoint) -> Option<PointHit> {
        let start = self.start_index?;
        if self.points.is_empty() {
            return None;
        }
        let offset = self.pixel_offset_at_or_before(pixel.x);
        let hit = self.hit_at_offset(start, offset)?;
        self.current_index = Some(hit.index);
        Some(hit)
    }

    /// Steps the cursor by `delta` items, clamped to the window.
    pub fn locate_by_step(&mut self, delta: i64) -> Option<PointHit> {
        let start = self.start_index?;
        if self.visible_count == 0 {
            return None;
        }
        let last_offset = self.visible_count - 1;
        let current_offset = self
            .current_index
            .and_then(|index| index.checked_sub(start))
            .map(|offset| offset.min(last_offset))
            .unwrap_or(last_offset);
        let offset = (current_offset as i64 + delta).clamp(0, last_offset as i64) as usize;
        let hit = self.hit_at_offset(start, offset)?;
        self.current_index = Some(hit.index);
        Some(hit)
    }

    /// Streams a new latest point: grows the window while it is not yet
    /// width-full, otherwise shifts it by one to follow the live edge.
    pub fn append_latest(&mut self, point: DataPoint) -> ChartResult<()> {
        let previous_len = self.series.len();
        self.series.append(point)?;

        if let Some(start) = self.start_index {
            // Only follow the live edge when the window was showing it.
            if start + self.visible_count == previous_len {
                let fit = self.items_that_fit(self.item_width, self.item_gap).max(1);
                if self.visible_count < fit {
                    self.visible_count += 1;
                } else {
                    self.start_index = Some(start + 1);
                }
                self.refresh_window()?;
            }
        }
        Ok(())
    }

    /// Overwrites the latest point in place; no re-windowing.
    pub fn replace_latest(&mut self, point: DataPoint) -> ChartResult<()> {
        self.series.replace_last(point)?;
        if let Some(start) = self.start_index {
            if start + self.visible_count == self.series.len() {
                self.refresh_window()?;
            }
        }
        Ok(())
    }

    /// Merges a fetched chunk and re-anchors the window.
    ///
    /// Head inserts shift `start_index` and the cursor by the net inserted
    /// count; tail inserts shift neither. `is_boundary` records whether the
    /// true end of available history was reached on that side.
    pub fn merge_chunk(
        &mut self,
        items: Vec<DataPoint>,
        side: MergeSide,
        is_boundary: bool,
    ) -> ChartResult<MergeOutcome> {
        let outcome = self.series.merge_chunk(items, side)?;

        match side {
            MergeSide::Head => {
                self.at_head_boundary = is_boundary;
                let shift = outcome.net_shift();
                self.start_index = self
                    .start_index
                    .map(|start| (start as i64 + shift).max(0) as usize);
                self.current_index = self
                    .current_index
                    .map(|index| (index as i64 + shift).max(0) as usize);
            }
            MergeSide::Tail => {
                self.at_tail_boundary = is_boundary;
            }
        }

        if let Some(start) = self.start_index {
            let len = self.series.len();
            let start = start.min(len.saturating_sub(1));
            self.start_index = Some(start);
            self.visible_count = self.visible_count.clamp(1, len - start);
            self.refresh_window()?;
        }
        Ok(outcome)
    }

    /// Raw stored value range of the window as `(min, max)`.
    #[must_use]
    pub fn window_value_range(&self) -> Option<(f64, f64)> {
        let (min_index, max_index) = (self.min_index?, self.max_index?);
        Some((
            self.series.get(min_index)?.low(),
            self.series.get(max_index)?.high(),
        ))
    }

    /// Largest display value in the window.
    ///
    /// In percentage mode this resolves the rebase value first, so a
    /// symmetric series with no prior close reports `InvalidStartValue`.
    pub fn window_max_value(&self) -> ChartResult<f64> {
        self.window_display_bound(true)
    }

    /// Smallest display value in the window (see [`Self::window_max_value`]).
    pub fn window_min_value(&self) -> ChartResult<f64> {
        self.window_display_bound(false)
    }

    /// Converts a stored value into the active display representation.
    pub fn display_value(&self, value: f64) -> ChartResult<f64> {
        match self.mode {
            CoordinateMode::Linear => Ok(value),
            CoordinateMode::Log10 => {
                if is_value_na(value) {
                    return Ok(value);
                }
                Ok(10f64.powf(value))
            }
            CoordinateMode::Percentage => percentage_display(value, self.percentage_base()?),
        }
    }

    /// Maps a stored value to a pixel Y inside the current bounds.
    #[must_use]
    pub fn value_to_pixel_y(&self, value: f64) -> f64 {
        match self.window_value_range() {
            Some((min, max)) if max > min => self.bounds.top + (max - value) * self.y_per_unit,
            // Flat or empty window: everything sits on the vertical center.
            _ => self.bounds.top + (self.bounds.height - 1.0) / 2.0,
        }
    }

    /// Binary search for the visible offset whose X is nearest at-or-before
    /// `x` (ties resolve to the insertion point).
    #[must_use]
    pub fn pixel_offset_at_or_before(&self, x: f64) -> usize {
        let insertion = self.points.partition_point(|point| point.x <= x);
        insertion.saturating_sub(1).min(self.points.len().saturating_sub(1))
    }

    fn window_display_bound(&self, upper: bool) -> ChartResult<f64> {
        if self.mode == CoordinateMode::Percentage {
            // Resolve the base first: this is the documented failure for
            // symmetric sessions with no supplied start value.
            let base = self.percentage_base()?;
            let (min, max) = self.window_value_range().ok_or(ChartError::InvalidData(
                "window has no valid values".to_owned(),
            ))?;
            return percentage_display(if upper { max } else { min }, base);
        }

        let (min, max) = self.window_value_range().ok_or(ChartError::InvalidData(
            "window has no valid values".to_owned(),
        ))?;
        self.display_value(if upper { max } else { min })
    }

    fn hit_at_offset(&self, start: usize, offset: usize) -> Option<PointHit> {
        let index = start + offset;
        let point = self.series.get(index)?;
        if point.is_na() {
            return None;
        }
        let mut pixel = *self.points.get(offset)?;
        if Some(index) == self.min_index {
            pixel.y = pixel.y.min(self.bounds.bottom() - 2.0);
        }
        Some(PointHit {
            index,
            window_offset: offset,
            pixel,
            date: point.date,
            value: point.value,
        })
    }

    /// Resolves the percentage rebase base: the supplied start value, else
    /// the first valid value of the current window.
    fn percentage_base(&self) -> ChartResult<f64> {
        if let Some(value) = self.start_value {
            return Ok(value);
        }

        // Before the first layout there is no window; fall back to the
        // whole loaded series.
        let (start, count) = match self.start_index {
            Some(start) if self.visible_count > 0 => (start, self.visible_count),
            _ => (0, self.series.len()),
        };
        for offset in 0..count {
            if let Some(point) = self.series.get(start + offset) {
                if !point.is_na() && point.value != 0.0 {
                    return Ok(point.value);
                }
            }
        }
        Err(ChartError::InvalidStartValue)
    }

    /// Splits a candidate total item width into body and gap.
    ///
    /// Gap takes `total / gap_divisor`; even bodies shed one pixel into the
    /// gap so bars center crisply. Totals under four pixels use fixed
    /// small-integer splits. Out-of-bounds totals are rejected.
    fn split_item_width(&self, total: f64) -> Option<(f64, f64)> {
        if !total.is_finite() {
            return None;
        }
        let total = total.floor();
        if total < self.tuning.min_item_width || total > self.tuning.max_item_width {
            return None;
        }

        if total < 4.0 {
            return Some(match total as i64 {
                t if t < 2 => (1.0, 0.0),
                2 => (1.0, 1.0),
                _ => (3.0, 0.0),
            });
        }

        let mut gap = (total / self.tuning.gap_divisor).floor();
        let mut body = total - gap;
        if (body as i64) % 2 == 0 {
            body -= 1.0;
            gap += 1.0;
        }
        Some((body, gap))
    }

    /// Number of item slots that fit the layout width at a given spacing.
    fn items_that_fit(&self, body: f64, gap: f64) -> usize {
        let slot = body + gap;
        if slot <= 0.0 || !self.bounds.is_valid() {
            return 0;
        }
        ((self.bounds.width + gap) / slot).floor() as usize
    }

    fn window_geometry(&self) -> WindowGeometry {
        WindowGeometry {
            start_index: self.start_index,
            visible_count: self.visible_count,
            item_width: self.item_width,
            item_gap: self.item_gap,
        }
    }

    /// Refreshes derived state, restoring `previous` window fields when the
    /// refresh fails (percentage mode with no resolvable base in the new
    /// window) so an errored gesture leaves the viewport as it was.
    fn refresh_or_restore(&mut self, previous: WindowGeometry) -> ChartResult<()> {
        match self.refresh_window() {
            Ok(()) => Ok(()),
            Err(error) => {
                self.start_index = previous.start_index;
                self.visible_count = previous.visible_count;
                self.item_width = previous.item_width;
                self.item_gap = previous.item_gap;
                self.refresh_window()?;
                Err(error)
            }
        }
    }

    /// Recomputes pixel positions, window extrema and the Y scale.
    fn refresh_window(&mut self) -> ChartResult<()> {
        let Some(start) = self.start_index else {
            return Ok(());
        };
        debug_assert!(start + self.visible_count <= self.series.len());

        let (min_value, max_value) = self.scan_window_extrema(start, self.visible_count);

        if self.mode == CoordinateMode::Percentage {
            self.percentage_base()?;
        }

        let span = max_value - min_value;
        self.y_per_unit = if self.max_index.is_some() && span > 0.0 {
            (self.bounds.height - 1.0) / span
        } else {
            0.0
        };

        let slot = self.item_width + self.item_gap;
        self.points.clear();
        self.points.reserve(self.visible_count);
        for offset in 0..self.visible_count {
            let x = self.bounds.left + offset as f64 * slot;
            let y = match self.series.get(start + offset) {
                Some(point) if !point.is_na() => self.project_y(point.value, min_value, max_value),
                _ => VALUE_NA,
            };
            self.points.push(PixelPoint::new(x, y));
        }

        if let Some(current) = self.current_index {
            if current < start || current >= start + self.visible_count {
                self.current_index = None;
            }
        }

        debug_assert_eq!(self.points.len(), self.visible_count);
        Ok(())
    }

    fn project_y(&self, value: f64, min_value: f64, max_value: f64) -> f64 {
        if max_value > min_value {
            self.bounds.top + (max_value - value) * self.y_per_unit
        } else {
            self.bounds.top + (self.bounds.height - 1.0) / 2.0
        }
    }

    /// Scans the window for its extrema, records their indices and returns
    /// `(min, max)`. The first valid point wins ties; NA values are skipped.
    fn scan_window_extrema(&mut self, start: usize, count: usize) -> (f64, f64) {
        self.max_index = None;
        self.min_index = None;
        let mut max_value = f64::NEG_INFINITY;
        let mut min_value = f64::INFINITY;
        for offset in 0..count {
            let Some(point) = self.series.get(start + offset) else {
                continue;
            };
            let (high, low) = (point.high(), point.low());
            if is_value_na(high) || is_value_na(low) || point.is_na() {
                continue;
            }
            if self.max_index.is_none() || high > max_value {
                max_value = high;
                self.max_index = Some(start + offset);
            }
            if self.min_index.is_none() || low < min_value {
                min_value = low;
                self.min_index = Some(start + offset);
            }
        }
        (min_value, max_value)
    }

    /// Mirrors a master viewport's window geometry (assist role).
    ///
    /// `start_index`, window length, item spacing, bounds and X positions
    /// copy verbatim. Without an alignment the assist is assumed to share
    /// the master's calendar and its own points at the same indices supply
    /// the Y side; with an alignment (see [`crate::core::sync::align_to`])
    /// master window slots map through it and calendar gaps project as NA.
    /// `independent_y` recomputes the assist's own Y range; otherwise the
    /// master's range and scale are reused (shared value axis). Aligned
    /// assists are projection-only: pan/zoom runs through the master.
    pub fn sync_from(
        &mut self,
        master: &SeriesViewport,
        options: crate::core::sync::SyncOptions,
        alignment: Option<&[Option<usize>]>,
    ) -> ChartResult<()> {
        self.bounds = master.bounds;
        self.item_width = master.item_width;
        self.item_gap = master.item_gap;

        let master_start = match master.start_index {
            Some(start) if !self.series.is_empty() => start,
            _ => {
                self.start_index = None;
                self.visible_count = 0;
                self.points.clear();
                return Ok(());
            }
        };
        let master_count = master.visible_count;

        let Some(map) = alignment else {
            // Same-calendar assist: clamp the copied window to own length.
            let len = self.series.len();
            let start = master_start.min(len - 1);
            let count = master_count.clamp(1, len - start);
            self.start_index = Some(start);
            self.visible_count = count;

            if options.independent_y {
                return self.refresh_window();
            }

            self.scan_window_extrema(start, count);
            self.y_per_unit = master.y_per_unit;
            let range = master.window_value_range();
            self.points.clear();
            for offset in 0..count {
                let x = master
                    .points
                    .get(offset)
                    .map(|point| point.x)
                    .unwrap_or_else(|| {
                        self.bounds.left + offset as f64 * (self.item_width + self.item_gap)
                    });
                let y = match self.series.get(start + offset) {
                    Some(point) if !point.is_na() => {
                        project_onto(range, master.y_per_unit, self.bounds, point.value)
                    }
                    _ => VALUE_NA,
                };
                self.points.push(PixelPoint::new(x, y));
            }
            return Ok(());
        };

        // Aligned assist: the window lives in master index space and every
        // master slot resolves to an assist point or a calendar gap.
        self.start_index = Some(master_start);
        self.visible_count = master_count;
        self.max_index = None;
        self.min_index = None;
        let mut max_value = f64::NEG_INFINITY;
        let mut min_value = f64::INFINITY;
        let mut resolved: Vec<Option<f64>> = Vec::with_capacity(master_count);
        for offset in 0..master_count {
            let aligned = map
                .get(master_start + offset)
                .copied()
                .flatten()
                .and_then(|assist_index| {
                    self.series
                        .get(assist_index)
                        .map(|point| (assist_index, point))
                });
            match aligned {
                Some((assist_index, point)) if !point.is_na() => {
                    let (high, low) = (point.high(), point.low());
                    if !is_value_na(high) && (self.max_index.is_none() || high > max_value) {
                        max_value = high;
                        self.max_index = Some(assist_index);
                    }
                    if !is_value_na(low) && (self.min_index.is_none() || low < min_value) {
                        min_value = low;
                        self.min_index = Some(assist_index);
                    }
                    resolved.push(Some(point.value));
                }
                _ => resolved.push(None),
            }
        }

        let (range, scale) = if options.independent_y {
            let span = max_value - min_value;
            self.y_per_unit = if self.max_index.is_some() && span > 0.0 {
                (self.bounds.height - 1.0) / span
            } else {
                0.0
            };
            let range = self.max_index.map(|_| (min_value, max_value));
            (range, self.y_per_unit)
        } else {
            self.y_per_unit = master.y_per_unit;
            (master.window_value_range(), master.y_per_unit)
        };

        self.points.clear();
        for (offset, value) in resolved.iter().enumerate() {
            let x = master
                .points
                .get(offset)
                .map(|point| point.x)
                .unwrap_or(self.bounds.left);
            let y = match value {
                Some(value) => project_onto(range, scale, self.bounds, *value),
                None => VALUE_NA,
            };
            self.points.push(PixelPoint::new(x, y));
        }
        Ok(())
    }
}

fn project_onto(range: Option<(f64, f64)>, y_per_unit: f64, bounds: Rect, value: f64) -> f64 {
    match range {
        Some((min, max)) if max > min => bounds.top + (max - value) * y_per_unit,
        _ => bounds.top + (bounds.height - 1.0) / 2.0,
    }
}
