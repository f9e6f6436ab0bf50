use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use opencv::core::Vector;
use opencv::imgcodecs::imwrite;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;

use plate_gate::plate_detection::Verdict;
use plate_gate::storage::reference_store::AddOutcome;
use plate_gate::{AppConfig, Detection, PreviewState, Session};

#[derive(Parser)]
#[command(name = "plate_gate")]
#[command(about = "Read a licence plate from an image and check it against an allow list")]
#[command(version)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, default_value = "plate_gate.json")]
    config: PathBuf,

    /// Overrides the reference list file.
    #[arg(long)]
    references: Option<PathBuf>,

    /// Overrides the history file.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Overrides the camera index.
    #[arg(long)]
    camera: Option<i32>,

    /// Serial port of the actuator, e.g. /dev/ttyACM0.
    #[arg(long)]
    actuator: Option<PathBuf>,

    /// Print pipeline metrics after the command.
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the plate in an image file.
    DetectFile {
        path: PathBuf,

        /// Where to write the annotated image.
        #[arg(long)]
        annotated: Option<PathBuf>,
    },

    /// Grab one camera frame and detect the plate in it.
    DetectCamera {
        #[arg(long)]
        annotated: Option<PathBuf>,
    },

    /// Run the live camera preview for a while and keep the last frame.
    Preview {
        #[arg(long, default_value = "5")]
        seconds: u64,

        #[arg(long, default_value = "preview.jpg")]
        out: PathBuf,
    },

    /// Print the reference plates with their 1-based index.
    ListReferences,

    /// Print every recognized plate, matches marked with '*'.
    ListHistory,

    /// Add a plate to the reference list.
    AddReference { plate: String },

    /// Remove a plate from the reference list by its 1-based index.
    RemoveReference { index: usize },

    /// Forget every recognized plate.
    ClearHistory,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(references) = &cli.references {
        config.reference_path = references.clone();
    }
    if let Some(history) = &cli.history {
        config.history_path = history.clone();
    }
    if let Some(camera) = cli.camera {
        config.camera_index = camera;
    }
    if let Some(actuator) = &cli.actuator {
        config.actuator_port = Some(actuator.clone());
    }
    Ok(config)
}

fn write_image(path: &Path, image: &Mat) -> anyhow::Result<()> {
    let name = path
        .to_str()
        .with_context(|| format!("invalid output path {}", path.display()))?;
    if !imwrite(name, image, &Vector::new())? {
        bail!("cannot write {}", path.display());
    }
    Ok(())
}

fn report(detection: &Detection, annotated: Option<&Path>) -> anyhow::Result<()> {
    match detection.verdict {
        Verdict::Match => println!("Plate '{}' is on the list", detection.plate),
        Verdict::NoMatch => println!("Plate '{}' is not on the list", detection.plate),
    }
    for warning in &detection.warnings {
        println!("Warning: {}", warning);
    }
    if let Some(path) = annotated {
        write_image(path, &detection.annotated)?;
        info!("Annotated image written to {}", path.display());
    }
    Ok(())
}

fn preview(session: &mut Session, seconds: u64, out: &Path) -> anyhow::Result<()> {
    let latest = Arc::new(Mutex::new(Mat::default()));
    let frames = Arc::new(AtomicUsize::new(0));

    let sink_latest = latest.clone();
    let sink_frames = frames.clone();
    let sink = move |frame: &Mat| {
        if let Ok(mut latest) = sink_latest.lock() {
            if frame.copy_to(&mut *latest).is_ok() {
                sink_frames.fetch_add(1, Ordering::Relaxed);
            }
        }
    };

    if session.toggle_preview(Box::new(sink))? != PreviewState::Started {
        bail!("preview was already running");
    }
    println!("Previewing for {} seconds", seconds);
    thread::sleep(Duration::from_secs(seconds));
    if !session.stop_preview() {
        println!("Preview ended early");
    }

    println!("{} frames shown", frames.load(Ordering::Relaxed));
    let latest = latest
        .lock()
        .map_err(|_| anyhow::anyhow!("preview frame lock poisoned"))?;
    if latest.empty() {
        bail!("no frame was captured");
    }
    write_image(out, &latest)
}

fn run(session: &mut Session, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::DetectFile { path, annotated } => {
            let detection = session.detect_from_file(path)?;
            report(&detection, annotated.as_deref())
        }
        Commands::DetectCamera { annotated } => {
            let detection = session.detect_from_camera()?;
            report(&detection, annotated.as_deref())
        }
        Commands::Preview { seconds, out } => preview(session, *seconds, out),
        Commands::ListReferences => {
            for (i, plate) in session.list_references().iter().enumerate() {
                println!("{}. {}", i + 1, plate);
            }
            Ok(())
        }
        Commands::ListHistory => {
            for entry in session.list_history() {
                let star = if entry.matched { "*" } else { "" };
                println!("{} {}", entry.plate, star);
            }
            Ok(())
        }
        Commands::AddReference { plate } => {
            match session.add_reference(plate)? {
                AddOutcome::Added => println!("Plate added"),
                AddOutcome::AlreadyPresent => println!("Plate is already on the list"),
            }
            Ok(())
        }
        Commands::RemoveReference { index } => {
            let removed = session.remove_reference(*index)?;
            println!("Plate '{}' removed", removed);
            Ok(())
        }
        Commands::ClearHistory => {
            session.clear_history()?;
            println!("History cleared");
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let mut session = Session::open(config).context("cannot start plate_gate")?;
    for warning in session.startup_warnings() {
        println!("Warning: {}", warning);
    }

    let result = run(&mut session, &cli.command);
    if cli.metrics {
        print!("{}", session.metrics_text()?);
    }
    session.close()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
