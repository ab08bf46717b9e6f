use geo_types::Coord;

use crate::{
    foundation::core::{Affine, Point, Size, Vec2},
    geo::{projection::Projection, sphere::normalize_bearing},
};

/// Steepest tilt the 2-D view transform supports, in degrees.
pub const MAX_PITCH: f64 = 60.0;

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Coord<f64> {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Coord {
            x: <f64 as Lerp>::lerp(&a.x, &b.x, t),
            y: <f64 as Lerp>::lerp(&a.y, &b.y, t),
        }
    }
}

/// Interpolate compass bearings along the shorter arc.
pub fn lerp_bearing(a: f64, b: f64, t: f64) -> f64 {
    if t >= 1.0 {
        return normalize_bearing(b);
    }
    let delta = (b - a + 540.0).rem_euclid(360.0) - 180.0;
    normalize_bearing(a + delta * t)
}

/// Virtual camera over the map.
///
/// `zoom` is a power-of-two magnification over the fitted extent (0 shows the whole route),
/// `bearing` is the compass heading that points up on screen, `pitch` tilts the ground plane
/// away from the viewer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraState {
    pub center: Coord<f64>,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl Lerp for CameraState {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if t >= 1.0 {
            return *b;
        }
        Self {
            center: <Coord<f64> as Lerp>::lerp(&a.center, &b.center, t),
            zoom: <f64 as Lerp>::lerp(&a.zoom, &b.zoom, t),
            bearing: lerp_bearing(a.bearing, b.bearing, t),
            pitch: <f64 as Lerp>::lerp(&a.pitch, &b.pitch, t),
        }
    }
}

impl CameraState {
    /// Camera whose view transform is the identity for `projection` in `viewport`.
    pub fn overview(projection: &Projection, viewport: Size) -> Self {
        Self {
            center: projection.invert(Point::new(viewport.width / 2.0, viewport.height / 2.0)),
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.center.x, self.center.y, self.zoom, self.bearing, self.pitch]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Map-layer transform placing `center` in the middle of `viewport`.
    pub fn view_transform(&self, projection: &Projection, viewport: Size) -> Affine {
        let focus = projection.project(self.center);
        let mid = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
        let scale = self.zoom.exp2();
        let tilt = self.pitch.clamp(0.0, MAX_PITCH).to_radians().cos();

        Affine::translate(mid)
            * Affine::scale_non_uniform(1.0, tilt)
            * Affine::rotate(-self.bearing.to_radians())
            * Affine::scale(scale)
            * Affine::translate(-focus.to_vec2())
    }
}

#[cfg(test)]
mod tests {
    use geo_types::{Geometry, GeometryCollection, line_string};

    use super::*;

    fn projection() -> Projection {
        let fc = GeometryCollection(vec![Geometry::LineString(
            line_string![(x: 10.0, y: 50.0), (x: 10.2, y: 50.1)],
        )]);
        Projection::fit_extent(&fc, Size::new(400.0, 400.0), 20.0).unwrap()
    }

    #[test]
    fn bearing_lerp_takes_short_arc() {
        assert!((lerp_bearing(350.0, 10.0, 0.5) - 0.0).abs() < 1e-9);
        assert!((lerp_bearing(10.0, 350.0, 0.25) - 5.0).abs() < 1e-9);
        assert!((lerp_bearing(90.0, 180.0, 0.5) - 135.0).abs() < 1e-9);
    }

    #[test]
    fn overview_camera_is_identity() {
        let p = projection();
        let viewport = Size::new(400.0, 400.0);
        let cam = CameraState::overview(&p, viewport);
        let xf = cam.view_transform(&p, viewport);
        let sample_pt = Point::new(123.0, 321.0);
        let moved = xf * sample_pt;
        assert!((moved - sample_pt).hypot() < 1e-6);
    }

    #[test]
    fn zoom_doubles_distances_from_center() {
        let p = projection();
        let viewport = Size::new(400.0, 400.0);
        let mut cam = CameraState::overview(&p, viewport);
        cam.zoom = 1.0;
        let xf = cam.view_transform(&p, viewport);
        let moved = xf * Point::new(300.0, 200.0);
        assert!((moved.x - 400.0).abs() < 1e-6);
        assert!((moved.y - 200.0).abs() < 1e-6);
    }

    #[test]
    fn bearing_turns_heading_up() {
        let p = projection();
        let viewport = Size::new(400.0, 400.0);
        let mut cam = CameraState::overview(&p, viewport);
        cam.bearing = 90.0;
        let xf = cam.view_transform(&p, viewport);
        // A point east of center ends up above it.
        let moved = xf * Point::new(300.0, 200.0);
        assert!((moved.x - 200.0).abs() < 1e-6);
        assert!((moved.y - 100.0).abs() < 1e-6);
    }
}
