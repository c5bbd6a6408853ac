//! Property tests for the viewport controller: whatever sequence of
//! operations is applied, the window stays inside its bounds.

use proptest::prelude::*;

use whombat_viewer::interval::{Interval, Position, SpectrogramWindow, MIN_FREQ_SPAN, MIN_TIME_SPAN};
use whombat_viewer::viewport::ViewportController;

const EPS: f64 = 1e-6;

fn bounds() -> SpectrogramWindow {
    SpectrogramWindow::new(Interval::new(0.0, 120.0), Interval::new(0.0, 22_050.0))
}

fn controller() -> ViewportController {
    let initial = SpectrogramWindow::new(Interval::new(0.0, 20.0), bounds().freq);
    ViewportController::new(initial, bounds())
}

/// Containment is exact; only the minimum spans allow for rounding.
fn assert_inside(window: &SpectrogramWindow, bounds: &SpectrogramWindow) {
    assert!(window.time.min >= bounds.time.min, "{:?} outside {:?}", window, bounds);
    assert!(window.time.max <= bounds.time.max, "{:?} outside {:?}", window, bounds);
    assert!(window.freq.min >= bounds.freq.min, "{:?} outside {:?}", window, bounds);
    assert!(window.freq.max <= bounds.freq.max, "{:?} outside {:?}", window, bounds);
    assert!(window.time.span() >= MIN_TIME_SPAN - EPS);
    assert!(window.freq.span() >= MIN_FREQ_SPAN - EPS);
}

#[derive(Debug, Clone)]
enum Op {
    Zoom { factor: f64, time: f64, freq: f64 },
    Shift { time: f64, freq: f64 },
    Center { time: f64 },
    Set { t0: f64, t1: f64, f0: f64, f1: f64 },
    Back,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0.01f64..100.0, -50.0f64..200.0, -1_000.0f64..30_000.0)
            .prop_map(|(factor, time, freq)| Op::Zoom { factor, time, freq }),
        (-500.0f64..500.0, -50_000.0f64..50_000.0).prop_map(|(time, freq)| Op::Shift { time, freq }),
        (-1_000.0f64..1_000.0).prop_map(|time| Op::Center { time }),
        (-100.0f64..300.0, -100.0f64..300.0, -1e5f64..1e5, -1e5f64..1e5)
            .prop_map(|(t0, t1, f0, f1)| Op::Set { t0, t1, f0, f1 }),
        Just(Op::Back),
        Just(Op::Reset),
    ]
}

fn apply(vp: &mut ViewportController, op: &Op) {
    match *op {
        Op::Zoom { factor, time, freq } => {
            vp.zoom_by(factor, Position::new(time, freq));
        }
        Op::Shift { time, freq } => {
            vp.shift_by(time, freq);
        }
        Op::Center { time } => {
            vp.center_on(Some(time), None);
        }
        Op::Set { t0, t1, f0, f1 } => {
            vp.set(SpectrogramWindow::new(Interval::new(t0, t1), Interval::new(f0, f1)));
        }
        Op::Back => {
            vp.back();
        }
        Op::Reset => {
            vp.reset();
        }
    }
}

proptest! {
    #[test]
    fn viewport_stays_within_bounds(ops in prop::collection::vec(op(), 1..40)) {
        let mut vp = controller();
        for op in &ops {
            apply(&mut vp, op);
            assert_inside(&vp.viewport(), &vp.bounds());
        }
    }

    #[test]
    fn fractional_bounds_contain_wider_windows(
        t0 in 0.0f64..50.0,
        t_span in 0.01f64..70.0,
        f0 in 0.0f64..1_000.0,
        f_span in 10.0f64..20_000.0,
        grow in 1.0f64..5.0,
        offset in -10.0f64..10.0,
        ops in prop::collection::vec(op(), 0..10),
    ) {
        // Sums like 0.8 + 3.6 do not land on round values.
        let bounds = SpectrogramWindow::new(
            Interval::new(t0 / 3.0, t0 / 3.0 + t_span / 7.0),
            Interval::new(f0 / 3.0, f0 / 3.0 + f_span / 7.0),
        );
        let mut vp = ViewportController::new(bounds, bounds);
        let wide = SpectrogramWindow::new(
            Interval::centered_on(bounds.time.center() + offset, bounds.time.span() * grow),
            Interval::centered_on(bounds.freq.center() + offset, bounds.freq.span() * grow),
        );
        vp.set(wide);
        assert_inside(&vp.viewport(), &bounds);
        for op in &ops {
            apply(&mut vp, op);
            assert_inside(&vp.viewport(), &bounds);
        }
    }

    #[test]
    fn shift_preserves_span(time in -500.0f64..500.0, freq in -5_000.0f64..5_000.0) {
        let mut vp = controller();
        let before = vp.viewport();
        vp.shift_by(time, freq);
        let after = vp.viewport();
        prop_assert!((after.time.span() - before.time.span()).abs() < EPS);
        prop_assert!((after.freq.span() - before.freq.span()).abs() < EPS);
    }

    #[test]
    fn revision_moves_only_on_change(ops in prop::collection::vec(op(), 1..20)) {
        let mut vp = controller();
        for op in &ops {
            let (window, revision) = (vp.viewport(), vp.revision());
            apply(&mut vp, op);
            if vp.viewport() == window {
                prop_assert_eq!(vp.revision(), revision);
            } else {
                prop_assert!(vp.revision() > revision);
            }
        }
    }

    #[test]
    fn back_undoes_zoom(factor in 1.5f64..50.0, time in 1.0f64..19.0) {
        let mut vp = controller();
        let before = vp.viewport();
        prop_assume!(vp.zoom_by(factor, Position::new(time, 10_000.0)));
        prop_assert!(vp.back());
        prop_assert_eq!(vp.viewport(), before);
    }
}

#[test]
fn test_set_bounds_shrinks_frequency_axis() {
    let mut vp = controller();
    vp.set_bounds(SpectrogramWindow::new(bounds().time, Interval::new(0.0, 4_000.0)));
    assert_eq!(vp.viewport().freq, Interval::new(0.0, 4_000.0));
    assert_eq!(vp.viewport().time, Interval::new(0.0, 20.0));
}

#[test]
fn test_reset_to_new_subject_clears_history() {
    let mut vp = controller();
    vp.zoom_by(4.0, Position::new(10.0, 10_000.0));
    let bounds = SpectrogramWindow::new(Interval::new(0.0, 30.0), Interval::new(0.0, 4_000.0));
    vp.reset_to(SpectrogramWindow::new(Interval::new(0.0, 20.0), bounds.freq), bounds);
    assert!(!vp.back());
    assert_eq!(vp.viewport().time, Interval::new(0.0, 20.0));
}
