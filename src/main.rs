//! Ovation - Simulated Audience
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ovation::{
    catalog::{InterruptionCatalog, ManifestSource, StaticSource},
    config::Config,
    input::{LoudnessSource, ScriptedLoudness, SyntheticPerformer},
    output::{SimClock, SimulatedRig, TracingLights},
    Stage, StageEvent,
};

/// Ovation - a simulated audience that reacts to a performer
#[derive(Parser, Debug)]
#[command(name = "ovation", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Number of audience members (overrides config)
    #[arg(short, long)]
    members: Option<usize>,

    /// Random seed for a reproducible run (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Loudness trace to replay instead of the synthetic performer
    #[arg(long)]
    script: Option<PathBuf>,

    /// Stop after this many simulated seconds
    #[arg(short, long)]
    duration: Option<f32>,

    /// Tick as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,

    /// Start with automatic ending off (performance only ends on `end`)
    #[arg(long)]
    no_auto_end: bool,

    /// Wait for a `start` command instead of starting right away
    #[arg(long)]
    manual_start: bool,
}

/// Operator commands, read one per line from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    End,
    Toggle,
    Status,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "end" | "e" => Some(Self::End),
            "toggle" | "t" => Some(Self::Toggle),
            "status" | "?" => Some(Self::Status),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", ovation::NAME, ovation::VERSION);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));

    // The stdin reader sits on a blocking thread; don't wait for it
    runtime.shutdown_timeout(Duration::from_millis(500));

    info!("Ovation stopped");
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(members) = args.members {
        config.audience.members = members;
    }
    if let Some(seed) = args.seed {
        config.audience.seed = Some(seed);
    }
    if let Some(ref script) = args.script {
        config.simulation.script = Some(script.clone());
    }
    if let Some(duration) = args.duration {
        config.simulation.duration_secs = Some(duration);
    }
    if args.fast {
        config.simulation.realtime = false;
    }

    // Validate configuration
    config.validate()?;

    let catalog = match config.catalog.manifest {
        Some(ref path) => InterruptionCatalog::load(&ManifestSource::open(path)?)?,
        None => {
            info!("No catalog manifest configured, using built-in set");
            InterruptionCatalog::load(&StaticSource::demo())?
        }
    };

    let loudness: Box<dyn LoudnessSource> = match config.simulation.script {
        Some(ref path) => {
            info!("Replaying loudness from {}", path.display());
            Box::new(ScriptedLoudness::from_file(path)?)
        }
        None => {
            info!(
                "Synthetic performer: {}s on, {}s off at level {}",
                config.simulation.play_secs, config.simulation.pause_secs, config.simulation.level
            );
            Box::new(SyntheticPerformer::from_config(
                &config.simulation,
                config.audience.seed,
            ))
        }
    };

    let clock = SimClock::new();
    let rig_clock = clock.clone();
    let animation_secs = config.simulation.animation_secs;
    let idle_state = config.audience.idle_animation_state.clone();

    let mut stage = Stage::builder(&config)
        .catalog(catalog)
        .lighting(TracingLights::new())
        .boxed_loudness(loudness)
        .rig_factory(move |seat| {
            Box::new(SimulatedRig::new(
                format!("seat-{}", seat),
                rig_clock.clone(),
                animation_secs,
                idle_state.clone(),
            ))
        })
        .build()?;

    let observer = tokio::spawn(log_events(stage.observe()));

    // Commands from stdin and the shutdown signal share one channel
    let (command_tx, mut commands) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(command_tx.clone()));
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = command_tx.send(Command::Quit);
    });

    if args.no_auto_end {
        stage.toggle_automatic_ending();
    }
    if args.manual_start {
        info!("Waiting for `start` on stdin");
    } else {
        stage.start_performance();
    }

    let sim = config.simulation.clone();
    let dt = 1.0 / sim.tick_rate_hz;
    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_status = f64::from(sim.status_secs);

    info!(
        "Running at {} Hz ({})",
        sim.tick_rate_hz,
        if sim.realtime { "real time" } else { "fast" }
    );

    'run: loop {
        if let Some(limit) = sim.duration_secs {
            if stage.elapsed() >= f64::from(limit) {
                info!("Reached {}s of simulated time", limit);
                break;
            }
        }

        if sim.realtime {
            tokio::select! {
                _ = interval.tick() => {}
                command = commands.recv() => {
                    match command {
                        Some(command) if handle_command(&mut stage, command) => continue,
                        _ => break 'run,
                    }
                }
            }
        } else {
            while let Ok(command) = commands.try_recv() {
                if !handle_command(&mut stage, command) {
                    break 'run;
                }
            }
            if stage.ticks() % 1024 == 0 {
                tokio::task::yield_now().await;
            }
        }

        clock.advance(dt);
        stage.tick(dt);

        if sim.status_secs > 0.0 && stage.elapsed() >= next_status {
            log_status(&stage);
            next_status += f64::from(sim.status_secs);
        }
    }

    log_status(&stage);

    // Dropping the stage closes the event tap, which ends the observer
    drop(stage);
    if let Err(e) = observer.await {
        error!("Event observer failed: {}", e);
    }

    Ok(())
}

/// Apply one operator command. Returns false when the run should stop.
fn handle_command(stage: &mut Stage, command: Command) -> bool {
    match command {
        Command::Start => {
            if !stage.start_performance() {
                info!("A performance is already running");
            }
        }
        Command::End => {
            if !stage.end_performance() {
                info!("No performance to end");
            }
        }
        Command::Toggle => {
            stage.toggle_automatic_ending();
        }
        Command::Status => log_status(stage),
        Command::Quit => return false,
    }
    true
}

fn log_status(stage: &Stage) {
    let snapshot = stage.snapshot();
    info!(
        "t={:.1}s {} lights {:.2} ({:?}) | idle {} interrupting {} clapping {}",
        snapshot.elapsed,
        snapshot.phase,
        snapshot.state.light_intensity,
        snapshot.light_phase,
        snapshot.behaviors.idle,
        snapshot.behaviors.interrupting,
        snapshot.behaviors.clapping
    );

    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::debug!("Snapshot: {}", json),
        Err(e) => warn!("Failed to serialize snapshot: {}", e),
    }
}

async fn log_events(mut events: broadcast::Receiver<StageEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "Stage event: {}", event),
                Err(e) => warn!("Failed to serialize event {}: {}", event, e),
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Event observer lagged, missed {} events", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_commands(commands: mpsc::UnboundedSender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match Command::parse(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => warn!(
                    "Unknown command '{}' (try start, end, toggle, status, quit)",
                    line.trim()
                ),
            },
            // stdin closed: keep running until the duration or a signal
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
