use chart_viewport::core::{
    DataPoint, Rect, SeriesKind, SeriesViewport, TimeSeries, ViewportAction, ViewportTuning,
    optimized_value_ticks,
};
use proptest::prelude::*;

const DAY: i64 = 86_400_000;

fn viewport_of(len: usize, width: f64) -> SeriesViewport {
    let points = (0..len as i64)
        .map(|index| {
            DataPoint::close(index * DAY, 100.0 + (index as f64 * 0.7).sin() * 20.0)
                .expect("point")
        })
        .collect();
    let series = TimeSeries::new(SeriesKind::Close, points).expect("series");
    let mut viewport = SeriesViewport::new(series, ViewportTuning::default()).expect("viewport");
    viewport
        .layout(Rect::new(0.0, 0.0, width, 200.0))
        .expect("layout");
    viewport
}

fn check_window_invariants(viewport: &SeriesViewport) -> Result<(), TestCaseError> {
    let start = viewport.start_index().expect("laid-out viewport");
    prop_assert!(viewport.visible_count() >= 1);
    prop_assert!(start + viewport.visible_count() <= viewport.series().len());
    prop_assert_eq!(viewport.pixel_points().len(), viewport.visible_count());
    // X positions are strictly increasing within the window.
    for pair in viewport.pixel_points().windows(2) {
        prop_assert!(pair[1].x > pair[0].x);
    }
    Ok(())
}

proptest! {
    #[test]
    fn pan_sequences_preserve_window_invariants(
        len in 1usize..800,
        steps in proptest::collection::vec(-200i64..200, 0..12)
    ) {
        let mut viewport = viewport_of(len, 599.0);
        viewport.set_boundary_flags(true, true);

        for step in steps {
            let action = viewport.move_by(step).expect("pan");
            // With both boundaries known, panning never asks for a fetch.
            prop_assert!(!matches!(action, ViewportAction::NeedsFetch(_)));
            check_window_invariants(&viewport)?;
        }
    }

    #[test]
    fn zoom_sequences_preserve_window_invariants(
        len in 1usize..800,
        factors in proptest::collection::vec(
            prop_oneof![0.1f64..0.9, 1.1f64..8.0],
            0..8
        )
    ) {
        let mut viewport = viewport_of(len, 599.0);
        viewport.set_boundary_flags(true, true);

        for factor in factors {
            viewport.zoom(factor, true).expect("zoom");
            check_window_invariants(&viewport)?;
        }
    }

    #[test]
    fn mixed_op_sequences_keep_spacing_within_tuning_bounds(
        len in 2usize..500,
        ops in proptest::collection::vec((any::<bool>(), -50i64..50, 0.2f64..5.0), 0..10)
    ) {
        let tuning = ViewportTuning::default();
        let mut viewport = viewport_of(len, 599.0);
        viewport.set_boundary_flags(true, true);

        for (is_pan, steps, factor) in ops {
            if is_pan {
                viewport.move_by(steps).expect("pan");
            } else {
                viewport.zoom(factor, true).expect("zoom");
            }
            let slot = viewport.item_width() + viewport.item_gap();
            prop_assert!(slot >= tuning.min_item_width);
            prop_assert!(slot <= tuning.max_item_width);
            check_window_invariants(&viewport)?;
        }
    }

    #[test]
    fn repeated_layout_with_the_same_bounds_is_idempotent(
        len in 1usize..600,
        width in 30.0f64..1200.0
    ) {
        let mut viewport = viewport_of(len, width);
        let start = viewport.start_index();
        let count = viewport.visible_count();
        let points = viewport.pixel_points().to_vec();

        viewport.layout(viewport.bounds()).expect("re-layout");

        prop_assert_eq!(viewport.start_index(), start);
        prop_assert_eq!(viewport.visible_count(), count);
        prop_assert_eq!(viewport.pixel_points(), points.as_slice());
    }

    #[test]
    fn optimized_ticks_always_cover_the_bounds(
        min in -10_000.0f64..10_000.0,
        span in 0.01f64..10_000.0,
        columns in 1usize..12
    ) {
        let max = min + span;
        let epsilon = 1e-6;
        let ticks = optimized_value_ticks(max, min, columns, epsilon);

        prop_assert!(!ticks.is_empty());
        prop_assert!((ticks[0] - max).abs() <= epsilon + 1e-12);
        prop_assert!((ticks[ticks.len() - 1] - min).abs() <= epsilon + 1e-12);
        for pair in ticks.windows(2) {
            prop_assert!(pair[0] > pair[1]);
        }
        for tick in &ticks {
            prop_assert!(*tick <= max + epsilon);
            prop_assert!(*tick >= min - epsilon);
        }
    }

    #[test]
    fn locate_is_idempotent_at_the_returned_pixel(
        len in 2usize..500,
        x in 0.0f64..599.0
    ) {
        let mut viewport = viewport_of(len, 599.0);

        if let Some(first) = viewport.locate(chart_viewport::core::PixelPoint { x, y: 0.0 }) {
            let again = viewport.locate(first.pixel).expect("hit again");
            prop_assert_eq!(again.index, first.index);
        }
    }
}
