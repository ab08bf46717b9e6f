//! Camera animation state machine.
//!
//! The sequencer owns a list of camera operations and runs them back to back. It never sleeps or
//! spawns: the host drives it by calling [`AnimationSequencer::tick`] once per frame, so
//! cancellation (via [`AnimationSequencer::reset`]) can happen at any frame boundary.
//!
//! `play()` while already playing, or after completion, rewinds to the initial camera and starts
//! over.

use geo_types::Coord;

use crate::{
    activity::model::ActivityTelemetry,
    animation::{
        camera::{CameraState, Lerp, MAX_PITCH},
        ease::Easing,
    },
    foundation::{
        core::Size,
        error::{TopotrackError, TopotrackResult},
    },
    geo::{
        projection::Projection,
        sphere::{haversine_m, initial_bearing},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    Idle,
    Playing,
    Complete,
}

/// Snapshot of the animation handed to the renderer each frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationState {
    pub camera: CameraState,
    /// Fraction of the whole program elapsed, `0..=1`.
    pub progress: f64,
    pub phase: Phase,
    /// Fraction of the followed route revealed so far. `None` while idle or when the program
    /// never follows a path.
    pub trail: Option<f64>,
}

/// Route polyline with cumulative distances, for arc-length sampling.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePath {
    points: Vec<Coord<f64>>,
    cumulative: Vec<f64>,
}

impl RoutePath {
    pub fn new(points: Vec<Coord<f64>>) -> TopotrackResult<Self> {
        if points.len() < 2 {
            return Err(TopotrackError::animation("followPath needs at least two points"));
        }
        let mut cumulative = Vec::with_capacity(points.len());
        let mut acc = 0.0;
        cumulative.push(0.0);
        for w in points.windows(2) {
            acc += haversine_m(w[0], w[1]);
            cumulative.push(acc);
        }
        if acc <= 0.0 {
            return Err(TopotrackError::animation("followPath route has zero length"));
        }
        Ok(Self { points, cumulative })
    }

    pub fn length_m(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Position and heading at fraction `t` of the route length.
    pub fn sample(&self, t: f64) -> (Coord<f64>, f64) {
        let (seg, at) = self.locate(t);
        (at, self.heading(seg))
    }

    /// The route travelled up to fraction `t`, ending exactly at `sample(t)`'s position.
    pub fn prefix(&self, t: f64) -> Vec<Coord<f64>> {
        let (seg, head) = self.locate(t);
        let mut out = self.points[..seg].to_vec();
        if out.last() != Some(&head) {
            out.push(head);
        }
        out
    }

    /// Segment (ending at `points[seg]`) containing fraction `t`, and the point there.
    fn locate(&self, t: f64) -> (usize, Coord<f64>) {
        let target = t.clamp(0.0, 1.0) * self.length_m();
        let seg = self
            .cumulative
            .partition_point(|&d| d <= target)
            .clamp(1, self.points.len() - 1);
        let (a, b) = (self.points[seg - 1], self.points[seg]);
        let span = self.cumulative[seg] - self.cumulative[seg - 1];
        if span <= 0.0 {
            return (seg, a);
        }
        let local = (target - self.cumulative[seg - 1]) / span;
        if local >= 1.0 {
            return (seg, b);
        }
        (seg, <Coord<f64> as Lerp>::lerp(&a, &b, local.max(0.0)))
    }

    /// Bearing of segment `seg`, or of the nearest segment with length when it has none.
    /// Earlier segments win, so a repeated final fix keeps the last real heading.
    fn heading(&self, seg: usize) -> f64 {
        let moving = |i: &usize| self.cumulative[*i] > self.cumulative[*i - 1];
        let found = (1..=seg)
            .rev()
            .find(moving)
            .or_else(|| (seg + 1..self.points.len()).find(moving))
            .unwrap_or(seg);
        initial_bearing(self.points[found - 1], self.points[found])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CameraOp {
    /// Interpolate every camera parameter toward `target`.
    FlyTo {
        target: CameraState,
        duration: f64,
        easing: Easing,
    },
    /// Move along `route`, heading in the direction of travel; zoom and pitch are kept.
    FollowPath {
        route: RoutePath,
        duration: f64,
        easing: Easing,
    },
}

impl CameraOp {
    pub fn fly_to(target: CameraState, duration: f64, easing: Easing) -> Self {
        Self::FlyTo {
            target,
            duration,
            easing,
        }
    }

    pub fn follow_path(
        route: Vec<Coord<f64>>,
        duration: f64,
        easing: Easing,
    ) -> TopotrackResult<Self> {
        Ok(Self::FollowPath {
            route: RoutePath::new(route)?,
            duration,
            easing,
        })
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::FlyTo { duration, .. } | Self::FollowPath { duration, .. } => *duration,
        }
    }

    pub fn validate(&self) -> TopotrackResult<()> {
        let d = self.duration();
        if !(d.is_finite() && d >= 0.0) {
            return Err(TopotrackError::animation(
                "operation duration must be finite and >= 0",
            ));
        }
        if let Self::FlyTo { target, .. } = self {
            if !target.is_finite() {
                return Err(TopotrackError::animation("flyTo target must be finite"));
            }
        }
        Ok(())
    }

    /// Camera at normalized time `t` when the operation started from `from`.
    fn sample(&self, from: &CameraState, t: f64) -> CameraState {
        match self {
            Self::FlyTo { target, easing, .. } => CameraState::lerp(from, target, easing.apply(t)),
            Self::FollowPath { route, easing, .. } => {
                let (center, bearing) = route.sample(easing.apply(t));
                CameraState {
                    center,
                    bearing,
                    ..*from
                }
            }
        }
    }

    fn reveals(&self, t: f64) -> Option<f64> {
        match self {
            Self::FlyTo { .. } => None,
            Self::FollowPath { easing, .. } => Some(easing.apply(t)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationSequencer {
    ops: Vec<CameraOp>,
    initial: CameraState,
    camera: CameraState,
    phase: Phase,
    op_index: usize,
    op_elapsed: f64,
    op_from: CameraState,
    elapsed: f64,
    total: f64,
    trail: Option<f64>,
}

impl AnimationSequencer {
    pub fn new(initial: CameraState, ops: Vec<CameraOp>) -> TopotrackResult<Self> {
        if !initial.is_finite() {
            return Err(TopotrackError::animation("initial camera must be finite"));
        }
        for op in &ops {
            op.validate()?;
        }
        let total = ops.iter().map(CameraOp::duration).sum();
        Ok(Self {
            ops,
            initial,
            camera: initial,
            phase: Phase::Idle,
            op_index: 0,
            op_elapsed: 0.0,
            op_from: initial,
            elapsed: 0.0,
            total,
            trail: None,
        })
    }

    /// Fly in to the start of the route, follow it, then pull back to `overview`.
    pub fn route_replay(
        telemetry: &ActivityTelemetry,
        overview: CameraState,
        total_secs: f64,
    ) -> TopotrackResult<Self> {
        if !(total_secs.is_finite() && total_secs > 0.0) {
            return Err(TopotrackError::animation("replay length must be > 0"));
        }
        let route = RoutePath::new(telemetry.route().0)?;
        let (start, heading) = route.sample(0.0);

        let approach = CameraState {
            center: start,
            zoom: 2.0,
            bearing: heading,
            pitch: MAX_PITCH * 0.75,
        };
        let ops = vec![
            CameraOp::fly_to(approach, total_secs * 0.15, Easing::InOutCubic),
            CameraOp::FollowPath {
                route,
                duration: total_secs * 0.7,
                easing: Easing::Linear,
            },
            CameraOp::fly_to(overview, total_secs * 0.15, Easing::InOutCubic),
        ];
        Self::new(overview, ops)
    }

    /// [`route_replay`](Self::route_replay) for a map fitted into `viewport` with `padding`; the
    /// overview is the camera that shows that fitted map unchanged.
    pub fn route_replay_in(
        telemetry: &ActivityTelemetry,
        viewport: Size,
        padding: f64,
        total_secs: f64,
    ) -> TopotrackResult<Self> {
        let coords: Vec<Coord<f64>> = telemetry.samples().iter().map(|s| s.coord()).collect();
        let projection = Projection::fit_coords(&coords, viewport, padding)?;
        Self::route_replay(
            telemetry,
            CameraState::overview(&projection, viewport),
            total_secs,
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn total_duration(&self) -> f64 {
        self.total
    }

    pub fn state(&self) -> AnimationState {
        let progress = match self.phase {
            Phase::Complete => 1.0,
            _ if self.total > 0.0 => (self.elapsed / self.total).clamp(0.0, 1.0),
            _ => 0.0,
        };
        AnimationState {
            camera: self.camera,
            progress,
            phase: self.phase,
            trail: self.trail,
        }
    }

    /// Start from the initial camera. Restarts if already playing or complete.
    pub fn play(&mut self) -> AnimationState {
        if self.phase != Phase::Idle {
            self.rewind();
        }
        self.phase = Phase::Playing;
        if self.ops.iter().any(|op| matches!(op, CameraOp::FollowPath { .. })) {
            self.trail = Some(0.0);
        }
        tracing::debug!(ops = self.ops.len(), total = self.total, "animation playing");
        // Zero-length programs finish on the spot.
        self.tick(0.0)
    }

    /// Advance by `dt` seconds of wall time. No-op unless playing.
    pub fn tick(&mut self, dt: f64) -> AnimationState {
        if self.phase != Phase::Playing {
            return self.state();
        }
        let mut remaining = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        while let Some(op) = self.ops.get(self.op_index) {
            let duration = op.duration();
            let left = duration - self.op_elapsed;
            if remaining < left {
                self.op_elapsed += remaining;
                self.elapsed += remaining;
                let t = self.op_elapsed / duration;
                self.camera = op.sample(&self.op_from, t);
                if let Some(r) = op.reveals(t) {
                    self.trail = Some(r);
                }
                return self.state();
            }

            remaining -= left;
            self.elapsed += left;
            self.camera = op.sample(&self.op_from, 1.0);
            if op.reveals(1.0).is_some() {
                self.trail = Some(1.0);
            }
            self.op_index += 1;
            self.op_elapsed = 0.0;
            self.op_from = self.camera;
        }

        self.elapsed = self.total;
        self.phase = Phase::Complete;
        tracing::debug!("animation complete");
        self.state()
    }

    /// Cancel whatever is running and snap back to the initial camera.
    pub fn reset(&mut self) -> AnimationState {
        self.rewind();
        self.state()
    }

    /// Same as [`reset`](Self::reset); the host calls `play()` afterwards to run again.
    pub fn replay(&mut self) -> AnimationState {
        self.reset()
    }

    fn rewind(&mut self) {
        self.camera = self.initial;
        self.op_from = self.initial;
        self.phase = Phase::Idle;
        self.op_index = 0;
        self.op_elapsed = 0.0;
        self.elapsed = 0.0;
        self.trail = None;
    }
}

#[cfg(test)]
mod tests {
    use geo_types::coord;

    use super::*;

    fn cam(x: f64, zoom: f64, bearing: f64) -> CameraState {
        CameraState {
            center: coord! { x: x, y: 0.0 },
            zoom,
            bearing,
            pitch: 0.0,
        }
    }

    fn two_hops() -> AnimationSequencer {
        AnimationSequencer::new(
            cam(0.0, 0.0, 0.0),
            vec![
                CameraOp::fly_to(cam(10.0, 2.0, 90.0), 1.0, Easing::Linear),
                CameraOp::fly_to(cam(20.0, 0.0, 90.0), 1.0, Easing::Linear),
            ],
        )
        .unwrap()
    }

    #[test]
    fn ops_run_sequentially() {
        let mut s = two_hops();
        assert_eq!(s.state().phase, Phase::Idle);
        assert_eq!(s.tick(0.5).phase, Phase::Idle);

        s.play();
        let st = s.tick(0.5);
        assert_eq!(st.phase, Phase::Playing);
        assert!((st.camera.center.x - 5.0).abs() < 1e-9);
        assert!((st.camera.zoom - 1.0).abs() < 1e-9);
        assert!((st.progress - 0.25).abs() < 1e-9);

        // Crossing an operation boundary carries the leftover time forward.
        let st = s.tick(1.0);
        assert!((st.camera.center.x - 15.0).abs() < 1e-9);
        assert!((st.camera.zoom - 1.0).abs() < 1e-9);

        let st = s.tick(10.0);
        assert_eq!(st.phase, Phase::Complete);
        assert_eq!(st.progress, 1.0);
        assert_eq!(st.camera, cam(20.0, 0.0, 90.0));
        assert_eq!(s.tick(1.0), st);
    }

    #[test]
    fn replay_from_any_state_restores_initial_camera() {
        let initial = cam(0.0, 0.0, 0.0);
        for advance in [None, Some(0.3), Some(1.7), Some(5.0)] {
            let mut s = two_hops();
            if let Some(dt) = advance {
                s.play();
                s.tick(dt);
            }
            let st = s.replay();
            assert_eq!(st.phase, Phase::Idle);
            assert_eq!(st.camera, initial);
            assert_eq!(st.progress, 0.0);
        }
    }

    #[test]
    fn play_while_playing_restarts() {
        let mut s = two_hops();
        s.play();
        s.tick(1.5);
        let st = s.play();
        assert_eq!(st.phase, Phase::Playing);
        assert_eq!(st.camera, cam(0.0, 0.0, 0.0));
        assert_eq!(st.progress, 0.0);
    }

    #[test]
    fn zero_duration_program_completes_immediately() {
        let mut s = AnimationSequencer::new(
            cam(0.0, 0.0, 0.0),
            vec![CameraOp::fly_to(cam(3.0, 1.0, 0.0), 0.0, Easing::Linear)],
        )
        .unwrap();
        let st = s.play();
        assert_eq!(st.phase, Phase::Complete);
        assert_eq!(st.camera, cam(3.0, 1.0, 0.0));

        let mut empty = AnimationSequencer::new(cam(0.0, 0.0, 0.0), vec![]).unwrap();
        assert_eq!(empty.play().phase, Phase::Complete);
    }

    #[test]
    fn invalid_programs_are_rejected() {
        assert!(
            AnimationSequencer::new(
                cam(0.0, 0.0, 0.0),
                vec![CameraOp::fly_to(cam(1.0, 0.0, 0.0), -1.0, Easing::Linear)]
            )
            .is_err()
        );
        let single = vec![coord! { x: 0.0, y: 0.0 }];
        assert!(CameraOp::follow_path(single, 1.0, Easing::Linear).is_err());
    }

    #[test]
    fn follow_path_tracks_route_and_heading() {
        let route = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 0.0, y: 0.01 },
            coord! { x: 0.01, y: 0.01 },
        ];
        let start = CameraState {
            center: route[0],
            zoom: 2.0,
            bearing: 0.0,
            pitch: 30.0,
        };
        let mut s = AnimationSequencer::new(
            start,
            vec![CameraOp::follow_path(route, 2.0, Easing::Linear).unwrap()],
        )
        .unwrap();
        assert_eq!(s.play().trail, Some(0.0));

        let st = s.tick(0.5);
        assert!((st.camera.center.y - 0.005).abs() < 1e-4);
        assert!(st.camera.bearing.abs() < 1e-6);
        assert_eq!(st.camera.zoom, 2.0);
        assert_eq!(st.camera.pitch, 30.0);
        assert!((st.trail.unwrap() - 0.25).abs() < 1e-9);

        let st = s.tick(1.0);
        assert!((st.camera.bearing - 90.0).abs() < 0.01);

        let st = s.tick(1.0);
        assert_eq!(st.phase, Phase::Complete);
        assert_eq!(st.trail, Some(1.0));
        assert_eq!(s.reset().trail, None);
    }

    #[test]
    fn repeated_last_fix_keeps_the_heading() {
        let route = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 0.01, y: 0.0 },
            coord! { x: 0.01, y: 0.0 },
        ];
        let path = RoutePath::new(route.clone()).unwrap();
        assert!((path.sample(0.999).1 - 90.0).abs() < 1e-6);
        let (end, heading) = path.sample(1.0);
        assert_eq!(end, route[2]);
        assert!((heading - 90.0).abs() < 1e-6);

        let mut s = AnimationSequencer::new(
            cam(0.0, 2.0, 90.0),
            vec![CameraOp::follow_path(route, 1.0, Easing::Linear).unwrap()],
        )
        .unwrap();
        s.play();
        let done = s.tick(1.0);
        assert_eq!(done.phase, Phase::Complete);
        assert!((done.camera.bearing - 90.0).abs() < 1e-6);
    }

    #[test]
    fn prefix_ends_where_the_camera_is() {
        let (_, telemetry) = crate::activity::model::fixtures::park_loop();
        let points = telemetry.route().0;
        let path = RoutePath::new(points.clone()).unwrap();

        assert_eq!(path.prefix(0.0), vec![points[0]]);
        assert_eq!(path.prefix(1.0).last(), points.last());
        let mut previous = 1;
        for f in [0.1, 0.25, 0.5, 0.75, 0.9] {
            let trail = path.prefix(f);
            let head = *trail.last().unwrap();
            let (center, _) = path.sample(f);
            assert!((head.x - center.x).abs() < 1e-12 && (head.y - center.y).abs() < 1e-12);
            assert!(trail.len() >= previous);
            previous = trail.len();
        }
    }

    #[test]
    fn route_replay_ends_on_overview() {
        let (_, telemetry) = crate::activity::model::fixtures::park_loop();
        let overview = cam(13.38, 0.0, 0.0);
        let mut s = AnimationSequencer::route_replay(&telemetry, overview, 10.0).unwrap();
        assert!((s.total_duration() - 10.0).abs() < 1e-9);
        s.play();
        let mid = s.tick(5.0);
        assert_eq!(mid.phase, Phase::Playing);
        assert!(mid.camera.zoom > 1.0);
        let end = s.tick(5.0);
        assert_eq!(end.phase, Phase::Complete);
        assert!((end.camera.center.x - overview.center.x).abs() < 1e-9);
        assert!(end.camera.bearing.abs() < 1e-9);
    }
}
