//! Asynchronous PNG/SVG/MP4 export with one in-flight job per surface.
//!
//! Every export call does two things before it returns:
//! 1. takes the surface's busy lease, failing with `ExportBusy` if another job holds it;
//! 2. snapshots the committed tree, rejecting it with `Validation` unless it has the format's
//!    aspect ratio.
//!
//! The returned [`ExportTask`] then does the slow part (rasterize, encode, deliver). The lease
//! travels inside the task and is released when the task finishes, fails or is dropped.

use std::{
    collections::HashSet,
    fmt,
    future::Future,
    path::PathBuf,
    pin::Pin,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Context as _;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    export::{filename::ArtifactType, raster::Rasterizer},
    foundation::{
        core::Size,
        error::{TopotrackError, TopotrackResult},
    },
    layout::{fit::export_canvas, format::Format},
    render::tree::VisualTree,
};

const ASPECT_EPSILON: f64 = 1e-6;

/// Stable identity of a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// The committed visual tree of one rendered figure.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    tree: RwLock<Arc<VisualTree>>,
}

impl Surface {
    pub fn new(tree: VisualTree) -> Self {
        Self {
            id: SurfaceId(NEXT_SURFACE.fetch_add(1, Ordering::Relaxed)),
            tree: RwLock::new(Arc::new(tree)),
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Swap in a freshly rendered tree. Snapshots already taken are unaffected.
    pub fn commit(&self, tree: VisualTree) {
        *self.tree.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(tree);
    }

    pub fn snapshot(&self) -> Arc<VisualTree> {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A delivered export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub kind: ArtifactType,
    pub bytes: usize,
    /// Where the sink put it, when that is a place on disk.
    pub location: Option<PathBuf>,
}

pub type SinkFuture<'a> =
    Pin<Box<dyn Future<Output = TopotrackResult<Option<PathBuf>>> + Send + 'a>>;

/// Final destination of exported bytes ("trigger a download").
pub trait DownloadSink: Send + Sync {
    fn deliver<'a>(&'a self, filename: &'a str, bytes: Vec<u8>) -> SinkFuture<'a>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver<'a>(&'a self, filename: &'a str, bytes: Vec<u8>) -> SinkFuture<'a> {
        Box::pin(async move {
            check_filename(filename)?;
            tokio::fs::create_dir_all(&self.dir)
                .await
                .with_context(|| format!("create output directory '{}'", self.dir.display()))?;
            let path = self.dir.join(filename);
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("write '{}'", path.display()))?;
            Ok(Some(path))
        })
    }
}

/// Keeps delivered artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered `(filename, bytes)` pairs in delivery order.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(n, _)| n == filename)
            .map(|(_, b)| b.clone())
    }
}

impl DownloadSink for MemorySink {
    fn deliver<'a>(&'a self, filename: &'a str, bytes: Vec<u8>) -> SinkFuture<'a> {
        Box::pin(async move {
            check_filename(filename)?;
            self.files
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((filename.to_string(), bytes));
            Ok(None)
        })
    }
}

fn check_filename(name: &str) -> TopotrackResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(TopotrackError::validation(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(())
}

/// A pending export. Await it to get the delivered artifact.
pub type ExportTask = Pin<Box<dyn Future<Output = TopotrackResult<Artifact>> + Send + 'static>>;

/// Held by an in-flight job; dropping it frees the surface.
struct ExportLease {
    surface: SurfaceId,
    active: Arc<Mutex<HashSet<SurfaceId>>>,
}

impl ExportLease {
    fn acquire(
        active: &Arc<Mutex<HashSet<SurfaceId>>>,
        surface: SurfaceId,
    ) -> TopotrackResult<Self> {
        let mut set = active.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(surface) {
            return Err(TopotrackError::ExportBusy(surface.0));
        }
        Ok(Self {
            surface,
            active: Arc::clone(active),
        })
    }
}

impl Drop for ExportLease {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.surface);
    }
}

/// Exports surfaces to a [`DownloadSink`].
#[derive(Clone)]
pub struct ExportPipeline {
    sink: Arc<dyn DownloadSink>,
    rasterizer: Rasterizer,
    active: Arc<Mutex<HashSet<SurfaceId>>>,
}

impl fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("rasterizer", &self.rasterizer)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl ExportPipeline {
    pub fn new(sink: Arc<dyn DownloadSink>) -> Self {
        Self::with_rasterizer(sink, Rasterizer::new())
    }

    pub fn with_rasterizer(sink: Arc<dyn DownloadSink>, rasterizer: Rasterizer) -> Self {
        Self {
            sink,
            rasterizer,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a job currently holds `surface`.
    pub fn is_busy(&self, surface: SurfaceId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&surface)
    }

    /// Rasterize at 2× the format's pixel size and deliver as PNG.
    pub fn to_png(
        &self,
        surface: &Surface,
        filename: impl Into<String>,
        format: &Format,
    ) -> ExportTask {
        let filename = filename.into();
        let (lease, tree) = match self.begin(surface, format) {
            Ok(v) => v,
            Err(e) => return failed(ArtifactType::Png, &filename, e),
        };
        let (width, height) = export_canvas(format);
        let rasterizer = self.rasterizer.clone();
        let sink = Arc::clone(&self.sink);

        Box::pin(async move {
            let lease = lease;
            tracing::info!(
                surface = %lease.surface,
                %filename,
                width,
                height,
                "png export started"
            );
            let result = async {
                let png = tokio::task::spawn_blocking(move || {
                    rasterizer.render_png(&tree, width, height)
                })
                .await
                .map_err(|e| TopotrackError::export(format!("png encoder task failed: {e}")))??;
                deliver(sink.as_ref(), filename.clone(), ArtifactType::Png, png).await
            }
            .await;
            report(&filename, result)
        })
    }

    /// Serialize as an SVG document sized to the format.
    pub fn to_svg(
        &self,
        surface: &Surface,
        filename: impl Into<String>,
        format: &Format,
    ) -> ExportTask {
        let filename = filename.into();
        let (lease, tree) = match self.begin(surface, format) {
            Ok(v) => v,
            Err(e) => return failed(ArtifactType::Svg, &filename, e),
        };
        let size = Size::new(f64::from(format.width), f64::from(format.height));
        let sink = Arc::clone(&self.sink);

        Box::pin(async move {
            let lease = lease;
            tracing::info!(surface = %lease.surface, %filename, "svg export started");
            let bytes = tree.to_svg_sized(size).into_bytes();
            let result = deliver(sink.as_ref(), filename.clone(), ArtifactType::Svg, bytes).await;
            report(&filename, result)
        })
    }

    /// Deliver a video recorded during a playthrough of `surface`.
    ///
    /// The stream must hold an MP4 (ISO base media) file; anything else fails the export.
    pub fn to_mp4<R>(
        &self,
        surface: &Surface,
        capture: R,
        filename: impl Into<String>,
    ) -> ExportTask
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let filename = filename.into();
        let lease = match ExportLease::acquire(&self.active, surface.id()) {
            Ok(l) => l,
            Err(e) => return failed(ArtifactType::Mp4, &filename, e),
        };
        let sink = Arc::clone(&self.sink);

        Box::pin(async move {
            let lease = lease;
            tracing::info!(surface = %lease.surface, %filename, "mp4 export started");
            let result = async {
                let mut capture = capture;
                let mut bytes = Vec::new();
                capture
                    .read_to_end(&mut bytes)
                    .await
                    .context("read capture stream")?;
                if !looks_like_mp4(&bytes) {
                    return Err(TopotrackError::export(
                        "capture stream is empty or not an mp4 file",
                    ));
                }
                deliver(sink.as_ref(), filename.clone(), ArtifactType::Mp4, bytes).await
            }
            .await;
            report(&filename, result)
        })
    }

    fn begin(
        &self,
        surface: &Surface,
        format: &Format,
    ) -> TopotrackResult<(ExportLease, Arc<VisualTree>)> {
        format.validate()?;
        let lease = ExportLease::acquire(&self.active, surface.id())?;
        let tree = surface.snapshot();
        check_aspect(&tree, format)?;
        Ok((lease, tree))
    }
}

/// The committed tree must have the format's shape, or PNG and SVG would disagree.
fn check_aspect(tree: &VisualTree, format: &Format) -> TopotrackResult<()> {
    let Size { width, height } = tree.size;
    if !(width > 0.0 && height > 0.0) {
        return Err(TopotrackError::validation(format!(
            "surface has an empty {width}x{height} tree"
        )));
    }
    let want = format.aspect_ratio();
    if ((width / height) - want).abs() > want * ASPECT_EPSILON {
        return Err(TopotrackError::validation(format!(
            "surface is {width}x{height} but format '{}' is {}x{}",
            format.name, format.width, format.height
        )));
    }
    Ok(())
}

fn failed(kind: ArtifactType, filename: &str, err: TopotrackError) -> ExportTask {
    tracing::warn!(%kind, %filename, error = %err, "export rejected");
    Box::pin(std::future::ready(Err(err)))
}

async fn deliver(
    sink: &dyn DownloadSink,
    filename: String,
    kind: ArtifactType,
    bytes: Vec<u8>,
) -> TopotrackResult<Artifact> {
    let len = bytes.len();
    let location = sink.deliver(&filename, bytes).await?;
    Ok(Artifact {
        filename,
        kind,
        bytes: len,
        location,
    })
}

fn report(filename: &str, result: TopotrackResult<Artifact>) -> TopotrackResult<Artifact> {
    match &result {
        Ok(a) => tracing::info!(filename, bytes = a.bytes, "export delivered"),
        Err(e) => tracing::warn!(filename, error = %e, "export failed"),
    }
    result
}

/// ISO base media files open with a box whose type is `ftyp`.
fn looks_like_mp4(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp"
}
