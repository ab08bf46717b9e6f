//! Topotrack turns recorded GPS activities into shareable images and route-replay videos.
//!
//! The pipeline is:
//!
//! - pick a [`Template`] from the [`TemplateRegistry`] and resolve its variables
//! - fit the chosen [`Format`] into the preview container ([`LayoutEngine`])
//! - project the track with a [`Projection`] and drive the camera with an [`AnimationSequencer`]
//! - render a [`VisualTree`] through the [`Renderer`] and commit it to a [`Surface`]
//! - export the surface as PNG, SVG or MP4 with the [`ExportPipeline`]
#![forbid(unsafe_code)]

pub mod activity;
pub mod animation;
pub mod export;
pub mod foundation;
pub mod geo;
pub mod layout;
pub mod render;
pub mod store;
pub mod template;

pub use crate::activity::model::{Activity, ActivityTelemetry, TelemetrySample};
pub use crate::activity::source::{JsonActivitySource, TelemetrySource, TelemetryState};
pub use crate::animation::camera::CameraState;
pub use crate::animation::ease::Easing;
pub use crate::animation::sequencer::{AnimationSequencer, AnimationState, CameraOp, Phase};
pub use crate::export::capture::{CaptureConfig, record_playthrough};
pub use crate::export::filename::{ArtifactType, artifact_filename};
pub use crate::export::pipeline::{
    Artifact, DirectorySink, DownloadSink, ExportPipeline, ExportTask, MemorySink, Surface,
    SurfaceId,
};
pub use crate::export::raster::Rasterizer;
pub use crate::foundation::config::AppConfig;
pub use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba8, Size, Vec2};
pub use crate::foundation::error::{LookupKind, TopotrackError, TopotrackResult};
pub use crate::geo::projection::Projection;
pub use crate::layout::fit::LayoutEngine;
pub use crate::layout::format::{Format, FormatCatalog};
pub use crate::render::renderer::Renderer;
pub use crate::render::tree::{Node, TreeKind, VisualTree};
pub use crate::store::ComposerStore;
pub use crate::template::contract::{RenderContext, Template};
pub use crate::template::registry::TemplateRegistry;
pub use crate::template::variables::{
    Preset, ResolvedVariables, VarValue, VariableKind, VariableSpec,
};
