//! Recording an animation playthrough to MP4 through the system `ffmpeg` binary.

use std::{
    ffi::OsString,
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    activity::{model::Activity, source::TelemetryState},
    animation::sequencer::Phase,
    export::raster::{Rasterizer, RgbaFrame},
    foundation::{
        core::Rgba8,
        error::{TopotrackError, TopotrackResult},
    },
    render::renderer::Renderer,
    store::ComposerStore,
};

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Transparent pixels are flattened over this color.
    pub background: Rgba8,
    pub out_path: PathBuf,
}

impl CaptureConfig {
    pub fn validate(&self) -> TopotrackResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TopotrackError::validation(
                "capture width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(TopotrackError::validation("capture fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p subsamples chroma 2x2.
            return Err(TopotrackError::validation(
                "capture width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// First line of `ffmpeg -version`, or `None` when no runnable `ffmpeg` is on `PATH`.
pub fn ffmpeg_version() -> Option<String> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-version"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}

/// Command line for raw RGBA on stdin in, H.264 in an MP4 container out.
fn encoder_args(cfg: &CaptureConfig) -> Vec<OsString> {
    let size = format!("{}x{}", cfg.width, cfg.height);
    let rate = cfg.fps.to_string();
    let input = [
        ("-f", "rawvideo"),
        ("-pixel_format", "rgba"),
        ("-video_size", size.as_str()),
        ("-framerate", rate.as_str()),
        ("-i", "-"),
    ];
    // yuv420p keeps the file playable in browsers; faststart moves the index to the front.
    let output = [
        ("-c:v", "libx264"),
        ("-pix_fmt", "yuv420p"),
        ("-movflags", "+faststart"),
    ];

    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect();
    for (flag, value) in input {
        args.extend([OsString::from(flag), OsString::from(value)]);
    }
    args.push(OsString::from("-an"));
    for (flag, value) in output {
        args.extend([OsString::from(flag), OsString::from(value)]);
    }
    args.push(cfg.out_path.clone().into_os_string());
    args
}

/// Streams opaque RGBA frames into an `ffmpeg` child writing H.264 MP4.
pub struct FfmpegEncoder {
    cfg: CaptureConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    frames: u64,
}

impl FfmpegEncoder {
    pub fn new(cfg: CaptureConfig) -> TopotrackResult<Self> {
        cfg.validate()?;
        if let Some(parent) = cfg.out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create capture directory '{}'", parent.display()))?;
        }
        let Some(version) = ffmpeg_version() else {
            return Err(TopotrackError::export(
                "MP4 capture needs an ffmpeg executable on PATH",
            ));
        };
        tracing::debug!(%version, path = %cfg.out_path.display(), "starting ffmpeg");

        let mut cmd = Command::new("ffmpeg");
        cmd.args(encoder_args(&cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TopotrackError::export(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TopotrackError::export("failed to open ffmpeg stdin"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            child,
            stdin: Some(stdin),
            frames: 0,
        })
    }

    pub fn encode_frame(&mut self, frame: &RgbaFrame) -> TopotrackResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(TopotrackError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        flatten_over(&mut self.scratch, &frame.data, self.cfg.background)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TopotrackError::export("ffmpeg encoder is already finished"));
        };
        stdin
            .write_all(&self.scratch)
            .map_err(|e| TopotrackError::export(format!("failed to write frame to ffmpeg: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    /// Close the stream and wait for ffmpeg. Returns the number of frames written.
    pub fn finish(mut self) -> TopotrackResult<u64> {
        // EOF on stdin is what makes ffmpeg flush and write the moov box.
        self.stdin = None;

        let mut diagnostics = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            stderr
                .read_to_string(&mut diagnostics)
                .map_err(|e| TopotrackError::export(format!("read ffmpeg stderr: {e}")))?;
        }
        let status = self
            .child
            .wait()
            .map_err(|e| TopotrackError::export(format!("wait for ffmpeg: {e}")))?;

        if status.success() {
            return Ok(self.frames);
        }
        let reason = diagnostics
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no diagnostics");
        Err(TopotrackError::export(format!(
            "ffmpeg {status} after {} frames: {reason}",
            self.frames
        )))
    }
}

/// Composite straight-alpha `src` over an opaque background into `dst`.
fn flatten_over(dst: &mut [u8], src: &[u8], bg: Rgba8) -> TopotrackResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(TopotrackError::validation(
            "flatten expects equal-length rgba8 buffers",
        ));
    }
    let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        let inv = 255 - a;
        for i in 0..3 {
            d[i] = (mul_div255(u16::from(s[i]), a) + mul_div255(bg[i], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

/// Play the store's animation from the start and encode every frame until it completes.
///
/// Blocking: call from a worker thread (`spawn_blocking`) inside async code. The store's
/// animation is left in `Complete`.
pub fn record_playthrough(
    renderer: &Renderer<'_>,
    store: &mut ComposerStore,
    activity: &Activity,
    telemetry: &TelemetryState,
    rasterizer: &Rasterizer,
    cfg: CaptureConfig,
) -> TopotrackResult<u64> {
    cfg.validate()?;
    let dt = 1.0 / f64::from(cfg.fps);
    // One frame per tick plus the opening and closing frames.
    let max_frames = (store.animation().total_duration() * f64::from(cfg.fps)).ceil() as u64 + 2;
    let (width, height) = (cfg.width, cfg.height);
    let out = cfg.out_path.clone();

    let mut encoder = FfmpegEncoder::new(cfg)?;
    store.animation_mut().play();
    tracing::info!(path = %out.display(), max_frames, "recording playthrough");

    for _ in 0..max_frames {
        let tree = renderer.render(store, activity, telemetry);
        let frame = rasterizer.rasterize(&tree, width, height)?;
        encoder.encode_frame(&frame)?;
        if store.animation().phase() == Phase::Complete {
            break;
        }
        store.animation_mut().tick(dt);
    }

    let frames = encoder.finish()?;
    tracing::info!(frames, "playthrough recorded");
    Ok(frames)
}

/// Default location for a capture of `filename` before it is exported.
pub fn scratch_path(filename: &str) -> PathBuf {
    std::env::temp_dir().join(format!("topotrack-{}-{filename}", std::process::id()))
}

pub fn remove_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "scratch capture not removed");
    }
}
