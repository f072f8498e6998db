use chart_viewport::core::{
    CoordinateMode, DataPoint, MergeSide, Rect, SeriesKind, SeriesViewport, TimeSeries,
    VALUE_NA, ViewportAction, ViewportTuning,
};

fn daily_closes_from(first_index: i64, count: usize) -> Vec<DataPoint> {
    (0..count as i64)
        .map(|offset| {
            let index = first_index + offset;
            DataPoint::close(index * 86_400_000, 100.0 + index as f64).expect("point")
        })
        .collect()
}

fn laid_out_viewport(count: usize) -> SeriesViewport {
    let series =
        TimeSeries::new(SeriesKind::Close, daily_closes_from(0, count)).expect("series");
    let mut viewport = SeriesViewport::new(series, ViewportTuning::default()).expect("viewport");
    viewport
        .layout(Rect::new(0.0, 0.0, 599.0, 200.0))
        .expect("layout");
    viewport
}

fn window_snapshot(viewport: &SeriesViewport) -> (Option<usize>, usize, f64, f64) {
    (
        viewport.start_index(),
        viewport.visible_count(),
        viewport.item_width(),
        viewport.item_gap(),
    )
}

#[test]
fn move_zero_is_always_a_noop() {
    let mut viewport = laid_out_viewport(500);
    let before = window_snapshot(&viewport);
    assert_eq!(viewport.move_by(0).expect("move"), ViewportAction::NoOp);
    assert_eq!(window_snapshot(&viewport), before);
}

#[test]
fn move_on_empty_series_is_neutral() {
    let series = TimeSeries::empty(SeriesKind::Close);
    let mut viewport = SeriesViewport::new(series, ViewportTuning::default()).expect("viewport");
    assert_eq!(viewport.move_by(-5).expect("move"), ViewportAction::NoOp);
}

#[test]
fn pan_toward_earlier_data_applies_within_loaded_range() {
    let mut viewport = laid_out_viewport(500);
    assert_eq!(viewport.move_by(-150).expect("move"), ViewportAction::Applied);
    assert_eq!(viewport.start_index(), Some(250));
    assert_eq!(viewport.visible_count(), 100);
}

#[test]
fn pan_past_the_tail_emits_a_batch_sized_fetch() {
    let mut viewport = laid_out_viewport(500);
    // Initial layout already sits at the loaded tail.
    let action = viewport.move_by(5).expect("move");
    let ViewportAction::NeedsFetch(plan) = action else {
        panic!("expected a fetch, got {action:?}");
    };
    let tail = plan.tail.expect("tail span");
    assert_eq!(tail.anchor_date, 499 * 86_400_000);
    assert!(tail.count >= 256);
    // The window is untouched while the fetch is pending.
    assert_eq!(viewport.start_index(), Some(400));
}

#[test]
fn pan_fetch_scales_with_the_overrun() {
    let mut viewport = laid_out_viewport(500);
    let ViewportAction::NeedsFetch(plan) = viewport.move_by(400).expect("move") else {
        panic!("expected a fetch");
    };
    assert!(plan.tail.expect("tail span").count >= 400);
}

#[test]
fn pan_clamps_silently_once_the_boundary_is_known() {
    let mut viewport = laid_out_viewport(500);
    viewport.set_boundary_flags(true, true);

    assert_eq!(viewport.move_by(40).expect("move"), ViewportAction::NoOp);
    assert_eq!(viewport.move_by(-450).expect("move"), ViewportAction::Applied);
    assert_eq!(viewport.start_index(), Some(0));
}

#[test]
fn head_fetch_merge_and_replay_reach_the_true_head() {
    let mut viewport = laid_out_viewport(500);

    let ViewportAction::NeedsFetch(plan) = viewport.move_by(-700).expect("move") else {
        panic!("expected a head fetch");
    };
    let head = plan.head.expect("head span");
    assert_eq!(head.anchor_date, 0);
    assert!(head.count >= 300);

    let older = daily_closes_from(-300, 300);
    viewport
        .merge_chunk(older, MergeSide::Head, true)
        .expect("merge");
    assert!(viewport.at_head_boundary());
    // The merge shifted the kept window forward by the inserted count.
    assert_eq!(viewport.start_index(), Some(700));

    assert_eq!(viewport.move_by(-700).expect("replay"), ViewportAction::Applied);
    assert_eq!(viewport.start_index(), Some(0));
    assert_eq!(viewport.visible_count(), 100);
}

#[test]
fn pan_into_an_unresolvable_percentage_window_rolls_back() {
    // Five calendar-gap points ahead of five priced ones; the 29px rect
    // fits exactly five slots, so the initial window holds the prices.
    let mut points: Vec<DataPoint> = (0..5)
        .map(|index| DataPoint::close(index * 86_400_000, VALUE_NA).expect("gap point"))
        .collect();
    points.extend(daily_closes_from(5, 5));
    let series = TimeSeries::new(SeriesKind::Close, points).expect("series");
    let mut viewport = SeriesViewport::new(series, ViewportTuning::default()).expect("viewport");
    viewport
        .layout(Rect::new(0.0, 0.0, 29.0, 200.0))
        .expect("layout");
    viewport
        .set_mode(CoordinateMode::Percentage)
        .expect("mode");

    let before = window_snapshot(&viewport);
    let pixels_before = viewport.pixel_points().to_vec();

    // No rebase value resolves in the all-gap target window; the errored
    // pan must leave the viewport exactly where it was.
    assert!(viewport.move_by(-5).is_err());
    assert_eq!(window_snapshot(&viewport), before);
    assert_eq!(viewport.pixel_points(), pixels_before.as_slice());
    viewport.window_max_value().expect("window still resolvable");
}

#[test]
fn pan_with_all_items_visible_is_a_noop() {
    let mut viewport = laid_out_viewport(60);
    viewport.set_boundary_flags(true, true);
    // All 60 items fit; panning cannot grow or shift anything.
    assert_eq!(viewport.move_by(-10).expect("move"), ViewportAction::NoOp);
    assert_eq!(viewport.visible_count(), 60);
}

#[test]
fn zoom_factor_one_is_always_a_noop() {
    let mut viewport = laid_out_viewport(500);
    let before = window_snapshot(&viewport);
    assert_eq!(viewport.zoom(1.0, true).expect("zoom"), ViewportAction::NoOp);
    assert_eq!(window_snapshot(&viewport), before);
}

#[test]
fn zoom_below_minimum_width_without_adjust_changes_nothing() {
    let mut viewport = laid_out_viewport(500);
    let before = window_snapshot(&viewport);
    let before_points = viewport.pixel_points().to_vec();

    assert_eq!(viewport.zoom(0.05, false).expect("zoom"), ViewportAction::NoOp);

    assert_eq!(window_snapshot(&viewport), before);
    assert_eq!(viewport.pixel_points(), before_points.as_slice());
}

#[test]
fn zoom_in_keeps_the_tail_anchored() {
    let mut viewport = laid_out_viewport(500);
    assert_eq!(viewport.zoom(2.0, false).expect("zoom"), ViewportAction::Applied);

    // 12px slots fit 50 items; the last visible item is unchanged.
    assert_eq!(viewport.item_width() + viewport.item_gap(), 12.0);
    assert_eq!(viewport.visible_count(), 50);
    assert_eq!(viewport.start_index(), Some(450));
}

#[test]
fn zoom_out_widens_the_window() {
    let mut viewport = laid_out_viewport(500);
    assert_eq!(viewport.zoom(0.5, false).expect("zoom"), ViewportAction::Applied);

    assert_eq!(viewport.item_width() + viewport.item_gap(), 3.0);
    assert_eq!(viewport.visible_count(), 199);
    assert_eq!(viewport.start_index(), Some(301));
}

#[test]
fn zoom_overrunning_the_head_rolls_back_entirely() {
    let mut viewport = laid_out_viewport(500);
    let before = window_snapshot(&viewport);

    let action = viewport.zoom(0.25, false).expect("zoom");
    let ViewportAction::NeedsFetch(plan) = action else {
        panic!("expected a head fetch, got {action:?}");
    };
    assert!(plan.head.expect("head span").count >= 99);
    // Width and window did not partially apply.
    assert_eq!(window_snapshot(&viewport), before);
}

#[test]
fn zoom_overrunning_a_known_head_boundary_clamps_instead() {
    let mut viewport = laid_out_viewport(500);
    viewport.set_boundary_flags(true, false);

    assert_eq!(viewport.zoom(0.25, false).expect("zoom"), ViewportAction::Applied);
    assert_eq!(viewport.start_index(), Some(0));
    assert_eq!(viewport.visible_count(), 500);
}

#[test]
fn auto_adjust_nudges_a_rejected_factor_until_it_fits() {
    let mut viewport = laid_out_viewport(500);
    // 1.05 * 6px floors back to 6px (no change); auto-adjust walks it up.
    assert_eq!(viewport.zoom(1.05, false).expect("zoom"), ViewportAction::NoOp);
    assert_eq!(viewport.zoom(1.05, true).expect("zoom"), ViewportAction::Applied);
    assert!(viewport.item_width() + viewport.item_gap() > 6.0);
}

#[test]
fn fixed_session_viewports_never_zoom() {
    let series =
        TimeSeries::new(SeriesKind::Close, daily_closes_from(0, 30)).expect("series");
    let mut viewport =
        SeriesViewport::fixed_session(series, 61, ViewportTuning::default()).expect("viewport");
    viewport
        .layout(Rect::new(0.0, 0.0, 601.0, 200.0))
        .expect("layout");

    assert_eq!(viewport.zoom(2.0, true).expect("zoom"), ViewportAction::NoOp);
    assert_eq!(viewport.item_width(), 10.0);
}
