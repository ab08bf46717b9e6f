use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use topotrack::{
    AppConfig, ArtifactType, CaptureConfig, ComposerStore, DirectorySink, ExportPipeline, Format,
    JsonActivitySource, Rasterizer, Renderer, Rgba8, Size, Surface, TelemetryState,
    TemplateRegistry, VarValue, VariableKind, artifact_filename,
    export::capture::{remove_scratch, scratch_path},
    foundation::logging::init_logging,
    record_playthrough,
};

#[derive(Parser, Debug)]
#[command(name = "topotrack", version)]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered templates with their variables and presets.
    Templates,
    /// List export formats.
    Formats,
    /// Render an activity and export it as PNG, SVG or MP4 (MP4 requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Activity document (JSON with `activity` and `samples`).
    #[arg(long)]
    activity: PathBuf,

    #[arg(long, default_value = "route")]
    template: String,

    /// Format name; the config's default format when omitted.
    #[arg(long)]
    format: Option<String>,

    /// Preset applied before any `--var`.
    #[arg(long)]
    preset: Option<String>,

    /// Variable override, `name=value`. Repeatable.
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    #[arg(long = "type", value_enum, default_value_t = KindChoice::Png)]
    kind: KindChoice,

    /// Output directory; the config's `output_dir` when omitted.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Png,
    Svg,
    Mp4,
}

impl From<KindChoice> for ArtifactType {
    fn from(k: KindChoice) -> Self {
        match k {
            KindChoice::Png => Self::Png,
            KindChoice::Svg => Self::Svg,
            KindChoice::Mp4 => Self::Mp4,
        }
    }
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    init_logging(&config.logging);

    match cli.cmd {
        Command::Templates => cmd_templates(),
        Command::Formats => cmd_formats(&config),
        Command::Export(args) => cmd_export(&config, args).await,
    }
}

fn cmd_templates() -> anyhow::Result<()> {
    let registry = TemplateRegistry::with_builtins();
    for t in registry.list() {
        println!("{}", t.name());
        for v in t.variables() {
            let kind = match &v.kind {
                VariableKind::Text => "text".to_string(),
                VariableKind::Number => "number".to_string(),
                VariableKind::Toggle => "toggle".to_string(),
                VariableKind::Choice { options } => options.join("|"),
            };
            println!("  var    {:<12} {kind}", v.name);
        }
        for p in t.presets() {
            println!("  preset {}", p.name);
        }
    }
    Ok(())
}

fn cmd_formats(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = config.catalog()?;
    for f in catalog.iter() {
        println!("{:<12} {}x{}", f.name, f.width, f.height);
    }
    Ok(())
}

async fn cmd_export(config: &AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let catalog = config.catalog()?;
    let format: Format = catalog
        .get(args.format.as_deref().unwrap_or(&config.default_format))?
        .clone();
    let kind = ArtifactType::from(args.kind);

    let (source, activity) = JsonActivitySource::open(&args.activity)?;
    let telemetry = TelemetryState::pull(&source, &activity.id);
    if let TelemetryState::Failed(msg) = &telemetry {
        anyhow::bail!("activity '{}' has no usable telemetry: {msg}", activity.id);
    }

    let registry = TemplateRegistry::with_builtins();
    let canvas = Size::new(f64::from(format.width), f64::from(format.height));
    let mut store = ComposerStore::new(&registry, &args.template, format.clone(), canvas)?;
    if let Some(preset) = &args.preset {
        store.apply_preset(&registry, preset)?;
    }
    for (name, value) in &args.vars {
        store
            .set_variable(&registry, name, VarValue::text(value.clone()))
            .with_context(|| format!("set variable '{name}'"))?;
    }

    let renderer = Renderer::new(&registry);
    let surface = Surface::new(renderer.render(&store, &activity, &telemetry));

    let out_dir = args.out_dir.unwrap_or_else(|| config.output_dir.clone());
    let rasterizer = Rasterizer::new();
    let pipeline =
        ExportPipeline::with_rasterizer(Arc::new(DirectorySink::new(out_dir)), rasterizer.clone());
    let filename = artifact_filename(&activity.start_date, &activity.name, &format.name, kind)?;

    let artifact = match kind {
        ArtifactType::Png => pipeline.to_png(&surface, filename, &format).await?,
        ArtifactType::Svg => pipeline.to_svg(&surface, filename, &format).await?,
        ArtifactType::Mp4 => {
            let Some(data) = telemetry.ready() else {
                anyhow::bail!("activity '{}' telemetry is not loaded", activity.id);
            };
            store.prepare_replay(&registry, &activity, data, config.video.replay_secs)?;

            let scratch = scratch_path(&filename);
            let capture = CaptureConfig {
                width: format.width,
                height: format.height,
                fps: config.video.fps,
                background: Rgba8::parse_hex(&config.video.background)?,
                out_path: scratch.clone(),
            };
            let recorded = tokio::task::block_in_place(|| {
                record_playthrough(
                    &renderer,
                    &mut store,
                    &activity,
                    &telemetry,
                    &rasterizer,
                    capture,
                )
            });
            let result = match recorded {
                Ok(_) => {
                    let file = tokio::fs::File::open(&scratch)
                        .await
                        .with_context(|| format!("open capture '{}'", scratch.display()))?;
                    pipeline.to_mp4(&surface, file, filename).await
                }
                Err(e) => Err(e),
            };
            remove_scratch(&scratch);
            result?
        }
    };

    match &artifact.location {
        Some(path) => eprintln!("wrote {}", path.display()),
        None => eprintln!("delivered {}", artifact.filename),
    }
    Ok(())
}
