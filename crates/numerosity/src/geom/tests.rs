use super::*;
use nalgebra::Vector2;

fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
    Segment::new(Vector2::new(x1, y1), Vector2::new(x2, y2))
}

#[test]
fn proper_crossing_detected() {
    let a = seg(-1.0, 0.0, 1.0, 0.0);
    let b = seg(0.0, -1.0, 0.0, 1.0);
    assert!(segments_cross(&a, &b, GeomTol::default()));
    // Order-insensitive.
    assert!(segments_cross(&b, &a, GeomTol::default()));
}

#[test]
fn endpoint_touching_is_not_a_crossing() {
    let a = seg(0.0, 0.0, 1.0, 0.0);
    // Shares a's end vertex.
    let b = seg(1.0, 0.0, 2.0, 1.0);
    assert!(!segments_cross(&a, &b, GeomTol::default()));
    // T-junction: c's endpoint lands on a's interior.
    let c = seg(0.5, 0.0, 0.5, 1.0);
    assert!(!segments_cross(&a, &c, GeomTol::default()));
}

#[test]
fn tightened_interval_excludes_near_endpoint_contact() {
    let a = seg(0.0, 0.0, 1.0, 0.0);
    // Crosses a at t = 0.005, inside (0, 1) but outside (0.01, 0.99).
    let near = seg(0.005, -1.0, 0.005, 1.0);
    assert!(!segments_cross(&a, &near, GeomTol::default()));
    assert!(segments_cross(
        &a,
        &near,
        GeomTol {
            t_min: 0.0,
            ..GeomTol::default()
        }
    ));
    // Well inside the interval it still counts.
    let mid = seg(0.05, -1.0, 0.05, 1.0);
    assert!(segments_cross(&a, &mid, GeomTol::default()));
}

#[test]
fn parallel_and_collinear_report_no_crossing() {
    let a = seg(0.0, 0.0, 1.0, 0.0);
    let b = seg(0.0, 1.0, 1.0, 1.0);
    assert!(!segments_cross(&a, &b, GeomTol::default()));
    // Collinear overlap is an accepted blind spot of the formulation.
    let c = seg(0.5, 0.0, 1.5, 0.0);
    assert!(!segments_cross(&a, &c, GeomTol::default()));
}

#[test]
fn distance_projects_and_clamps() {
    let s = Vector2::new(0.0, 0.0);
    let e = Vector2::new(2.0, 0.0);
    // Interior projection.
    assert!((point_segment_distance(Vector2::new(1.0, 1.0), s, e) - 1.0).abs() < 1e-12);
    // Clamped to the far endpoint.
    let d = point_segment_distance(Vector2::new(3.0, 1.0), s, e);
    assert!((d - 2.0_f64.sqrt()).abs() < 1e-12);
    // Clamped to the near endpoint.
    let d = point_segment_distance(Vector2::new(-3.0, 4.0), s, e);
    assert!((d - 5.0).abs() < 1e-12);
}

#[test]
fn degenerate_segment_degrades_to_point_distance() {
    let p = Vector2::new(4.0, 5.0);
    let q = Vector2::new(1.0, 1.0);
    assert!((point_segment_distance(p, q, q) - 5.0).abs() < 1e-12);
}

#[test]
fn segment_equality_ignores_direction() {
    let a = seg(0.0, 0.0, 1.0, 2.0);
    let b = seg(1.0, 2.0, 0.0, 0.0);
    assert_eq!(a, b);
    let c = seg(0.0, 0.0, 1.0, 2.1);
    assert_ne!(a, c);
}
