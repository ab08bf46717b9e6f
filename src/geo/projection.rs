//! Geographic to screen projection.
//!
//! Coordinates go through spherical Web-Mercator and are then scaled and translated so the
//! extent of the input features fills the padded viewport. The mapping is conformal, so only
//! the limiting axis touches both padded edges; the other axis is centered.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo_types::{Coord, Geometry, GeometryCollection, LineString};

use crate::foundation::{
    core::{BezPath, Point, Rect, Size},
    error::{TopotrackError, TopotrackResult},
};

/// Web-Mercator latitude limit, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Unscaled Mercator coordinates (radians east, radians north).
fn mercator(c: Coord<f64>) -> (f64, f64) {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (c.x.to_radians(), (FRAC_PI_4 + lat / 2.0).tan().ln())
}

fn inverse_mercator(x: f64, y: f64) -> Coord<f64> {
    Coord {
        x: x.to_degrees(),
        y: (2.0 * y.exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

/// A fitted `(lng, lat) -> (x, y)` mapping. Immutable and cheap to copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Fit every coordinate in `features` into `viewport` deflated by `padding` on all sides.
    pub fn fit_extent(
        features: &GeometryCollection<f64>,
        viewport: Size,
        padding: f64,
    ) -> TopotrackResult<Self> {
        let mut coords = Vec::new();
        for g in features.iter() {
            collect_coords(g, &mut coords);
        }
        Self::fit_coords(&coords, viewport, padding)
    }

    pub fn fit_coords(
        coords: &[Coord<f64>],
        viewport: Size,
        padding: f64,
    ) -> TopotrackResult<Self> {
        if !(viewport.width > 0.0 && viewport.height > 0.0) {
            return Err(TopotrackError::validation("viewport must have a positive size"));
        }
        if !(padding >= 0.0) {
            return Err(TopotrackError::validation("padding must be >= 0"));
        }
        let inner_w = viewport.width - 2.0 * padding;
        let inner_h = viewport.height - 2.0 * padding;
        if inner_w <= 0.0 || inner_h <= 0.0 {
            return Err(TopotrackError::validation(
                "padding leaves no room inside the viewport",
            ));
        }

        let mut first: Option<Coord<f64>> = None;
        let mut distinct = false;
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &c in coords {
            if !(c.x.is_finite() && c.y.is_finite()) {
                return Err(TopotrackError::degenerate("non-finite coordinate"));
            }
            match first {
                None => first = Some(c),
                Some(f) if f != c => distinct = true,
                Some(_) => {}
            }
            let (x, y) = mercator(c);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if !distinct {
            return Err(TopotrackError::degenerate(
                "need at least two distinct points to fit a projection",
            ));
        }
        let dx = max_x - min_x;
        let dy = max_y - min_y;
        if dx <= 0.0 || dy <= 0.0 {
            return Err(TopotrackError::degenerate("bounding box has zero area"));
        }

        let scale = (inner_w / dx).min(inner_h / dy);
        Ok(Self {
            scale,
            offset_x: padding + (inner_w - dx * scale) / 2.0 - min_x * scale,
            offset_y: padding + (inner_h - dy * scale) / 2.0 + max_y * scale,
        })
    }

    /// Pixels per Mercator radian.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn project(&self, c: Coord<f64>) -> Point {
        let (x, y) = mercator(c);
        Point::new(self.offset_x + x * self.scale, self.offset_y - y * self.scale)
    }

    pub fn invert(&self, p: Point) -> Coord<f64> {
        inverse_mercator(
            (p.x - self.offset_x) / self.scale,
            (self.offset_y - p.y) / self.scale,
        )
    }

    /// Open polyline through the projected points of `line`.
    pub fn project_line(&self, line: &LineString<f64>) -> BezPath {
        let mut path = BezPath::new();
        for (i, c) in line.coords().enumerate() {
            let p = self.project(*c);
            if i == 0 {
                path.move_to(p);
            } else {
                path.line_to(p);
            }
        }
        path
    }

    /// Screen-space bounding box of the projected coordinates.
    pub fn bounds_of(&self, coords: &[Coord<f64>]) -> Rect {
        let mut it = coords.iter().map(|c| self.project(*c));
        let Some(p0) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(Rect::from_points(p0, p0), |r, p| r.union_pt(p))
    }
}

fn collect_coords(g: &Geometry<f64>, out: &mut Vec<Coord<f64>>) {
    match g {
        Geometry::Point(p) => out.push(p.0),
        Geometry::Line(l) => out.extend([l.start, l.end]),
        Geometry::LineString(ls) => out.extend(ls.coords().copied()),
        Geometry::Polygon(poly) => {
            out.extend(poly.exterior().coords().copied());
            for ring in poly.interiors() {
                out.extend(ring.coords().copied());
            }
        }
        Geometry::MultiPoint(mp) => out.extend(mp.iter().map(|p| p.0)),
        Geometry::MultiLineString(mls) => {
            for ls in mls.iter() {
                out.extend(ls.coords().copied());
            }
        }
        Geometry::MultiPolygon(mp) => {
            for poly in mp.iter() {
                collect_coords(&Geometry::Polygon(poly.clone()), out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for inner in gc.iter() {
                collect_coords(inner, out);
            }
        }
        Geometry::Rect(r) => out.extend([r.min(), r.max()]),
        Geometry::Triangle(t) => out.extend([t.v1(), t.v2(), t.v3()]),
    }
}

#[cfg(test)]
mod tests {
    use geo_types::{Point as GeoPoint, Triangle, coord, line_string};

    use super::*;

    fn features(ls: LineString<f64>) -> GeometryCollection<f64> {
        GeometryCollection(vec![Geometry::LineString(ls)])
    }

    #[test]
    fn fitted_extent_fills_limiting_axis_and_centers_the_other() {
        let ls = line_string![(x: 13.40, y: 52.50), (x: 13.45, y: 52.52), (x: 13.50, y: 52.51)];
        let coords: Vec<_> = ls.coords().copied().collect();
        let proj = Projection::fit_extent(&features(ls), Size::new(1080.0, 1080.0), 40.0).unwrap();

        let b = proj.bounds_of(&coords);
        // East-west extent is the wide one here.
        assert!((b.x0 - 40.0).abs() < 1e-6);
        assert!((b.x1 - 1040.0).abs() < 1e-6);
        assert!(((b.y0 - 40.0) - (1040.0 - b.y1)).abs() < 1e-6);
    }

    #[test]
    fn north_is_up() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        let proj = Projection::fit_extent(&features(ls), Size::new(100.0, 100.0), 0.0).unwrap();
        let south = proj.project(coord! { x: 0.0, y: 0.0 });
        let north = proj.project(coord! { x: 1.0, y: 1.0 });
        assert!(north.y < south.y);
        assert!(north.x > south.x);
    }

    #[test]
    fn invert_round_trips() {
        let ls = line_string![(x: -122.5, y: 37.7), (x: -122.3, y: 37.9)];
        let proj = Projection::fit_extent(&features(ls), Size::new(800.0, 600.0), 10.0).unwrap();
        let c = coord! { x: -122.41, y: 37.77 };
        let back = proj.invert(proj.project(c));
        assert!((back.x - c.x).abs() < 1e-9);
        assert!((back.y - c.y).abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let single = GeometryCollection(vec![Geometry::Point(GeoPoint::new(1.0, 2.0))]);
        let err = Projection::fit_extent(&single, Size::new(10.0, 10.0), 0.0).unwrap_err();
        assert!(matches!(err, TopotrackError::DegenerateGeometry(_)));

        let repeated = features(line_string![(x: 1.0, y: 2.0), (x: 1.0, y: 2.0)]);
        assert!(matches!(
            Projection::fit_extent(&repeated, Size::new(10.0, 10.0), 0.0),
            Err(TopotrackError::DegenerateGeometry(_))
        ));

        let meridian = features(line_string![(x: 1.0, y: 2.0), (x: 1.0, y: 3.0)]);
        assert!(matches!(
            Projection::fit_extent(&meridian, Size::new(10.0, 10.0), 0.0),
            Err(TopotrackError::DegenerateGeometry(_))
        ));

        let empty = GeometryCollection::<f64>(Vec::new());
        assert!(Projection::fit_extent(&empty, Size::new(10.0, 10.0), 0.0).is_err());
    }

    #[test]
    fn triangle_vertices_define_the_extent() {
        let corners = [
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 2.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        ];
        let tri = GeometryCollection(vec![Geometry::Triangle(Triangle::new(
            corners[0], corners[1], corners[2],
        ))]);
        let viewport = Size::new(100.0, 100.0);
        assert_eq!(
            Projection::fit_extent(&tri, viewport, 5.0).unwrap(),
            Projection::fit_coords(&corners, viewport, 5.0).unwrap()
        );
    }

    #[test]
    fn oversized_padding_is_a_validation_error() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(matches!(
            Projection::fit_extent(&features(ls), Size::new(100.0, 100.0), 50.0),
            Err(TopotrackError::Validation(_))
        ));
    }

    #[test]
    fn fitting_is_deterministic() {
        let ls = line_string![(x: 5.0, y: 45.0), (x: 5.2, y: 45.1)];
        let fc = features(ls.clone());
        let a = Projection::fit_extent(&fc, Size::new(320.0, 240.0), 12.0).unwrap();
        let b = Projection::fit_extent(&fc, Size::new(320.0, 240.0), 12.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.project_line(&ls), b.project_line(&ls));
    }
}
