#![cfg(feature = "media-ffmpeg")]

use std::{path::PathBuf, sync::Arc};

use topotrack::{
    CaptureConfig, ComposerStore, ExportPipeline, Format, JsonActivitySource, MemorySink, Phase,
    Rasterizer, Renderer, Rgba8, Size, Surface, TelemetryState, TemplateRegistry,
    export::capture::ffmpeg_version, record_playthrough,
};

#[tokio::test(flavor = "multi_thread")]
async fn playthrough_records_and_exports_mp4() {
    if ffmpeg_version().is_none() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }

    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/morning_run.json");
    let (source, activity) = JsonActivitySource::open(fixture).unwrap();
    let telemetry = TelemetryState::pull(&source, &activity.id);
    let data = telemetry.ready().unwrap().clone();

    let registry = TemplateRegistry::with_builtins();
    let format = Format::new("Clip", 160, 120).unwrap();
    let mut store =
        ComposerStore::new(&registry, "route", format.clone(), Size::new(160.0, 120.0)).unwrap();
    store.prepare_replay(&registry, &activity, &data, 1.0).unwrap();

    let out = PathBuf::from("target").join("media_capture").join("clip.mp4");
    let renderer = Renderer::new(&registry);
    let frames = record_playthrough(
        &renderer,
        &mut store,
        &activity,
        &telemetry,
        &Rasterizer::new(),
        CaptureConfig {
            width: 160,
            height: 120,
            fps: 12,
            background: Rgba8::BLACK,
            out_path: out.clone(),
        },
    )
    .unwrap();
    assert!((12..=14).contains(&frames), "{frames}");
    assert_eq!(store.animation().phase(), Phase::Complete);

    let surface = Surface::new(renderer.render(&store, &activity, &telemetry));
    let sink = Arc::new(MemorySink::new());
    let file = tokio::fs::File::open(&out).await.unwrap();
    ExportPipeline::new(sink.clone())
        .to_mp4(&surface, file, "clip.mp4")
        .await
        .unwrap();
    assert!(sink.get("clip.mp4").unwrap().len() > 100);
}
