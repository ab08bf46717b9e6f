use geo_types::Coord;
use proptest::prelude::*;

use topotrack::{
    AnimationSequencer, ArtifactType, CameraOp, CameraState, Easing, Format, Phase, Projection,
    Size, artifact_filename, layout::fit::letterbox,
};

const EPS: f64 = 1e-6;

fn cluster() -> impl Strategy<Value = Vec<Coord<f64>>> {
    (
        -170.0..170.0f64,
        -70.0..70.0f64,
        0.001..3.0f64,
        0.001..3.0f64,
        prop::collection::vec((0.0..1.0f64, 0.0..1.0f64), 0..20),
    )
        .prop_map(|(lng, lat, sx, sy, inner)| {
            let mut pts = vec![
                Coord { x: lng - sx, y: lat - sy },
                Coord { x: lng + sx, y: lat + sy },
            ];
            pts.extend(inner.into_iter().map(|(u, v)| Coord {
                x: lng - sx + 2.0 * sx * u,
                y: lat - sy + 2.0 * sy * v,
            }));
            pts
        })
}

proptest! {
    #[test]
    fn projection_fills_the_padded_viewport(
        coords in cluster(),
        w in 50.0..4000.0f64,
        h in 50.0..4000.0f64,
        pad_frac in 0.0..0.2f64,
    ) {
        let pad = pad_frac * w.min(h);
        let p = Projection::fit_coords(&coords, Size::new(w, h), pad).unwrap();
        let b = p.bounds_of(&coords);
        let tol = EPS * w.max(h);

        prop_assert!(b.x0 >= pad - tol && b.x1 <= w - pad + tol);
        prop_assert!(b.y0 >= pad - tol && b.y1 <= h - pad + tol);

        let fills_x = (b.x0 - pad).abs() < tol && (b.x1 - (w - pad)).abs() < tol;
        let fills_y = (b.y0 - pad).abs() < tol && (b.y1 - (h - pad)).abs() < tol;
        prop_assert!(fills_x || fills_y, "{b:?} in {w}x{h} pad {pad}");

        prop_assert!(((b.x0 + b.x1) / 2.0 - w / 2.0).abs() < tol);
        prop_assert!(((b.y0 + b.y1) / 2.0 - h / 2.0).abs() < tol);
    }

    #[test]
    fn letterbox_keeps_the_format_aspect(
        fw in 1u32..8000,
        fh in 1u32..8000,
        cw in 1.0..5000.0f64,
        ch in 1.0..5000.0f64,
    ) {
        let format = Format::new("Any", fw, fh).unwrap();
        let r = letterbox(&format, Size::new(cw, ch));
        let want = f64::from(fw) / f64::from(fh);
        prop_assert!((r.width() / r.height() - want).abs() <= 1e-9 * want.max(1.0));
        prop_assert!(r.x0 >= -EPS && r.y0 >= -EPS);
        prop_assert!(r.x1 <= cw + EPS && r.y1 <= ch + EPS);
        // Touches the container on at least one axis.
        prop_assert!((r.width() - cw).abs() < EPS || (r.height() - ch).abs() < EPS);
    }

    #[test]
    fn filenames_are_deterministic(
        y in 2000i32..2099,
        m in 1u32..=12,
        d in 1u32..=28,
        name in "[ -~À-ÿ]{0,24}",
    ) {
        let date = format!("{y:04}-{m:02}-{d:02}T10:00:00Z");
        let a = artifact_filename(&date, &name, "Landscape", ArtifactType::Mp4).unwrap();
        let b = artifact_filename(&date, &name, "Landscape", ArtifactType::Mp4).unwrap();
        prop_assert_eq!(&a, &b);

        let stamp = format!("topotrack-{:02}{m:02}{d:02}-", y % 100);
        prop_assert!(a.starts_with(&stamp), "{}", a);
        prop_assert!(a.ends_with("-landscape.mp4"));
        prop_assert!(!a.contains("--"));
    }

    #[test]
    fn replay_from_any_point_restores_the_initial_camera(
        steps in prop::collection::vec(0.0..0.7f64, 0..12),
        play_again in any::<bool>(),
    ) {
        let initial = CameraState {
            center: Coord { x: 13.4, y: 52.5 },
            zoom: 0.5,
            bearing: 350.0,
            pitch: 10.0,
        };
        let target = CameraState {
            center: Coord { x: 13.5, y: 52.6 },
            zoom: 2.0,
            bearing: 20.0,
            pitch: 45.0,
        };
        let mut seq = AnimationSequencer::new(
            initial,
            vec![
                CameraOp::fly_to(target, 1.0, Easing::InOutSine),
                CameraOp::fly_to(initial, 1.0, Easing::OutCubic),
            ],
        )
        .unwrap();

        seq.play();
        for dt in steps {
            seq.tick(dt);
        }
        if play_again {
            seq.play();
        }
        let s = seq.replay();
        prop_assert_eq!(s.phase, Phase::Idle);
        prop_assert_eq!(s.camera, initial);
        prop_assert_eq!(s.progress, 0.0);
    }
}
