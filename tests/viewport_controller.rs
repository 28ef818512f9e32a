use mosaic_viewer::prelude::*;

fn controller() -> ViewportController {
    let mut vc = ViewportController::new();
    vc.set_container_size(Size::new(800.0, 600.0));
    vc.set_mosaic_size(Size::new(160_000.0, 16_000.0));
    vc.fit();
    vc
}

#[test]
fn reference_scale_bounds() {
    let (min, max) = compute_scale_bounds(Size::new(800.0, 600.0), Size::new(160_000.0, 16_000.0));
    assert!((min - 0.005).abs() < 1e-12);
    assert_eq!(max, 1.0);
    assert_eq!(compute_scale_bounds(Size::new(0.0, 600.0), Size::new(10.0, 10.0)), (1.0, 1.0));
}

#[test]
fn zoom_stays_within_bounds_and_keeps_anchor() {
    let mut vc = controller();
    let (min, max) = vc.scale_bounds();
    let anchors = [
        Point::new(0.0, 0.0),
        Point::new(400.0, 300.0),
        Point::new(799.0, 1.0),
        Point::new(123.4, 567.8),
    ];
    let scales = [0.0001, 0.004, 0.05, 0.37, 1.0, 8.0];

    for anchor in anchors {
        for requested in scales {
            let before = vc.transform().screen_to_world(anchor);
            vc.zoom_around(anchor, requested);
            let t = vc.transform();
            assert!(t.scale >= min && t.scale <= max, "scale {} out of range", t.scale);
            let after = t.world_to_screen(before);
            assert!(after.distance_to(&anchor) < 1.0, "anchor drifted to {after:?}");
        }
    }
}

#[test]
fn pan_is_unclamped() {
    let mut vc = controller();
    let start = vc.transform();
    vc.pan(-1.0e6, 2.5e5);
    let t = vc.transform();
    assert_eq!(t.x, start.x - 1.0e6);
    assert_eq!(t.y, start.y + 2.5e5);
    assert_eq!(t.scale, start.scale);
}

#[test]
fn fit_centres_the_mosaic() {
    let mut vc = controller();
    vc.zoom_around(Point::new(10.0, 10.0), 0.5);
    vc.pan(300.0, -40.0);
    vc.fit();
    let t = vc.transform();
    assert!((t.scale - 0.005).abs() < 1e-12);
    let top_left = t.world_to_screen(Point::new(0.0, 0.0));
    let bottom_right = t.world_to_screen(Point::new(160_000.0, 16_000.0));
    assert!((top_left.x - (800.0 - bottom_right.x)).abs() < 1e-9);
    assert!((top_left.y - (600.0 - bottom_right.y)).abs() < 1e-9);
}

#[test]
fn resize_reclamps_scale() {
    let mut vc = controller();
    vc.zoom_around(Point::new(400.0, 300.0), 0.005);
    // larger container raises the minimum scale
    vc.set_container_size(Size::new(1600.0, 1200.0));
    assert!((vc.transform().scale - 0.01).abs() < 1e-12);
}

#[test]
fn gestures_drive_the_controller() {
    let mut vc = controller();
    let mut gestures = GestureRecognizer::with_config(GestureConfig {
        drag_threshold: 2.0,
        tap_timeout: Duration::from_millis(250),
        pinch_threshold: 1.0,
        wheel_zoom_sensitivity: 0.002,
    });
    let now = Instant::now();
    let apply = |vc: &mut ViewportController, actions: Vec<GestureAction>| {
        for action in actions {
            match action {
                GestureAction::Pan { dx, dy } => vc.pan(dx, dy),
                GestureAction::ZoomAround { anchor, factor } => vc.zoom_by(anchor, factor),
                GestureAction::Tap { .. } => {}
            }
        }
    };

    let start = vc.transform();
    apply(&mut vc, gestures.process(InputEvent::PointerDown { id: 0, position: Point::new(100.0, 100.0) }, now));
    apply(&mut vc, gestures.process(InputEvent::PointerMove { id: 0, position: Point::new(150.0, 90.0) }, now));
    apply(&mut vc, gestures.process(InputEvent::PointerUp { id: 0, position: Point::new(150.0, 90.0) }, now));
    assert_eq!(vc.transform().x, start.x + 50.0);
    assert_eq!(vc.transform().y, start.y - 10.0);

    let anchor = Point::new(400.0, 300.0);
    let world = vc.transform().screen_to_world(anchor);
    apply(&mut vc, gestures.process(InputEvent::Wheel { delta_y: -300.0, position: anchor }, now));
    assert!(vc.transform().scale > start.scale);
    assert!(vc.transform().world_to_screen(world).distance_to(&anchor) < 1.0);
}
