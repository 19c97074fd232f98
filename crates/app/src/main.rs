use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use crossbeam::channel;
use landmark_overlay_core::{
    AppConfig, AudioBackend, AudioEnvelopeTracker, Autosaver, Catalog, ModeMailbox,
    NoAudioBackend, OverlayError, PersistenceStore, RenderCycle, SettingsController,
    SharedConfig, StopReason, ToneBackend,
};
use tracing_subscriber::EnvFilter;

mod console;
mod replay;
mod surface;

use replay::ReplayDetector;
use surface::HeadlessSurface;

fn main() -> landmark_overlay_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let app = load_app_config(&cli)?;

    match cli.command {
        Commands::Run(args) => run(&app, args),
        Commands::List { catalog } => {
            let store = PersistenceStore::open(&app.storage_root)?;
            for name in store.list(catalog)? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Delete { catalog, name } => {
            PersistenceStore::open(&app.storage_root)?.delete(catalog, &name)
        }
        Commands::Show { catalog, name } => show(&app, catalog, &name),
    }
}

fn load_app_config(cli: &Cli) -> landmark_overlay_core::Result<AppConfig> {
    let mut app = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(storage) = &cli.storage {
        app.storage_root = storage.clone();
    }
    Ok(app)
}

fn run(app: &AppConfig, args: RunArgs) -> landmark_overlay_core::Result<()> {
    tracing::info!(storage = %app.storage_root.display(), "starting landmark overlay");

    let store = PersistenceStore::open(&app.storage_root)?;
    let shared = SharedConfig::default();
    let mailbox = ModeMailbox::new();
    let backend: Box<dyn AudioBackend> = if args.audio_tone {
        Box::new(ToneBackend::new(&app.audio))
    } else {
        Box::new(NoAudioBackend)
    };
    let controller = Arc::new(SettingsController::new(
        shared.clone(),
        store.clone(),
        AudioEnvelopeTracker::new(&app.audio),
        backend,
        mailbox.clone(),
    ));

    if let Err(err) = controller.restore_autosave() {
        tracing::warn!(%err, "could not restore autosave, using defaults");
    }
    // Subscribe after restoring so the restored record is not written back.
    let autosaver = Autosaver::spawn(store, shared.subscribe(), app.autosave_quiet())?;
    controller.sync_audio();

    let detector = match &args.replay {
        Some(path) => ReplayDetector::open(path)?,
        None => ReplayDetector::synthetic(),
    };
    if detector.is_empty() {
        tracing::warn!("landmark recording is empty, nothing will be drawn");
    }

    let (key_tx, key_rx) = channel::unbounded();
    let script = match &args.keys {
        Some(script) => surface::parse_keys(script)?,
        None => Vec::new(),
    };
    let surface = HeadlessSurface::new(
        app.frame_width,
        app.frame_height,
        args.frames,
        script,
        key_rx,
    );
    if args.console {
        console::spawn(controller.clone(), key_tx.clone())?;
    }

    let mut cycle = RenderCycle::new(
        detector,
        surface,
        shared,
        controller.audio_level(),
        mailbox,
    )
    .with_refresh_wait(app.frame_interval());
    let summary = cycle.run();
    tracing::info!(
        primitives = cycle.surface().last_frame().len(),
        "last frame composed"
    );

    let report = landmark_overlay_core::shutdown(&controller, autosaver, &mut cycle);
    if !report.is_clean() {
        tracing::warn!(failed = ?report.failed().collect::<Vec<_>>(), "shutdown was not clean");
    }
    drop(key_tx);

    println!(
        "{} frames, {:.1} fps, stopped: {:?}",
        summary.frames, summary.fps, summary.reason
    );
    match summary.reason {
        StopReason::DetectorFailed(reason) => Err(OverlayError::Detector(reason)),
        StopReason::Quit | StopReason::EndOfStream => Ok(()),
    }
}

fn show(app: &AppConfig, catalog: Catalog, name: &str) -> landmark_overlay_core::Result<()> {
    let store = PersistenceStore::open(&app.storage_root)?;
    let json = match catalog {
        Catalog::ColorPresets => serde_json::to_string_pretty(&store.load_preset(name)?)?,
        Catalog::Saves | Catalog::Autosave => {
            serde_json::to_string_pretty(&store.load(catalog, name)?)?
        }
    };
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_catalog(name: &str) -> Result<Catalog, String> {
    Catalog::from_name(name)
        .ok_or_else(|| format!("unknown catalog `{name}` (saves, presets, autosave)"))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Stylized face and hand landmark overlays", long_about = None)]
struct Cli {
    /// JSON file with process-level settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding saves, presets and the autosave slot.
    #[arg(long, global = true)]
    storage: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the overlay render loop.
    Run(RunArgs),
    /// List the entries of a catalog.
    List {
        #[arg(value_parser = parse_catalog)]
        catalog: Catalog,
    },
    /// Delete one catalog entry.
    Delete {
        #[arg(value_parser = parse_catalog)]
        catalog: Catalog,
        name: String,
    },
    /// Print one catalog entry as JSON.
    Show {
        #[arg(value_parser = parse_catalog)]
        catalog: Catalog,
        name: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON-lines landmark recording to play back. A synthetic face is used
    /// when omitted.
    #[arg(short, long)]
    replay: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(short, long)]
    frames: Option<u64>,
    /// Per-frame key script: `.` none, `m` cycle mode, `q` quit.
    #[arg(short, long)]
    keys: Option<String>,
    /// Feed the audio visualizer from a synthetic tone.
    #[arg(long)]
    audio_tone: bool,
    /// Read settings commands from stdin.
    #[arg(long)]
    console: bool,
}
