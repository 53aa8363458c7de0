//! palette-pins entrypoint: drives the engine against a simulated host.
use anyhow::Result;
use clap::Parser;
use core_config::{Config, load_from};
use core_events::{
    EVENT_CHANNEL_CAP, Event, EventSourceRegistry, FrameTickSource, SCRIPT_LINES,
    SCRIPT_REJECTED, ScriptLineSource,
};
use core_prefs::{JsonFileSettings, settings_panel};
use palette_pins::Simulator;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "palette-pins",
    version,
    about = "Command palette pin/sort engine, driven by a host simulator"
)]
struct Args {
    /// Script to run (one command per line). Reads stdin when omitted.
    pub script: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `palette-pins.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Settings JSON file (overrides `[storage] settings_path`).
    #[arg(long = "settings")]
    pub settings: Option<PathBuf>,
    /// Print the settings panel descriptor as JSON and exit.
    #[arg(long = "print-settings-panel")]
    pub print_settings_panel: bool,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("palette-pins.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "palette-pins.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_ansi(false)
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    ScriptFinished,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::ScriptFinished => "script_finished",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

struct SimRuntime {
    sim: Simulator<JsonFileSettings>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl SimRuntime {
    async fn run(&mut self) -> Result<()> {
        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        let mut reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            match event {
                Event::Frame => {
                    self.sim.frame();
                }
                Event::Script { line, command } => {
                    trace!(target: "runtime", line, "script_event");
                    let out = self.sim.apply(command);
                    print_lines(&out)?;
                }
                Event::Shutdown => {
                    reason = ShutdownReason::ScriptFinished;
                    break;
                }
            }
        }

        self.rx.close();
        self.sim.settle();
        self.finalize_shutdown(reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        let metrics = self.sim.engine().scheduler_metrics();
        info!(
            target: "runtime.shutdown",
            reason = reason.as_str(),
            frames = self.sim.frames(),
            passes = metrics.passes,
            coalesced = metrics.coalesced,
            deferred = metrics.deferred,
            script_lines = SCRIPT_LINES.load(Ordering::Relaxed),
            script_rejected = SCRIPT_REJECTED.load(Ordering::Relaxed),
            "run_summary"
        );
        log_shutdown_stage(reason, "complete");
    }
}

fn print_lines(lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn settings_path(args: &Args, config: &Config) -> PathBuf {
    args.settings.clone().unwrap_or_else(|| config.settings_path())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.print_settings_panel {
        println!("{}", serde_json::to_string_pretty(&settings_panel())?);
        return Ok(());
    }

    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let config = load_from(args.config.clone())?;
    let settings = settings_path(&args, &config);
    info!(
        target: "runtime.startup",
        config = ?config.source,
        settings = %settings.display(),
        frame_interval_ms = config.runtime().frame_interval_ms,
        max_settle_frames = config.runtime().max_settle_frames,
        "bootstrap_complete"
    );
    let sim = Simulator::new(
        JsonFileSettings::open(settings),
        config.runtime().max_settle_frames,
    );

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(FrameTickSource::new(config.runtime().frame_interval()));
    match args.script.as_deref() {
        Some(path) => registry.register(ScriptLineSource::open(path).await?),
        None => registry.register(ScriptLineSource::stdin()),
    }
    let source_handles = registry.spawn_all(&tx);

    let mut runtime = SimRuntime {
        sim,
        rx,
        tx: Some(tx),
        source_handles,
    };
    let result = runtime.run().await;
    drop(startup.log_guard.take());
    result
}
