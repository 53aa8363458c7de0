//! Runtime events and async event sources for the palette simulator.
//!
//! Two producers feed one bounded channel: a frame tick (the host's display
//! refresh) and a script reader (user and host actions, one per line). The
//! consumer owns the host tree and the engine; producers never touch either.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub use core_dom::NavKey;

mod script;

pub use script::{ScriptCommand, ScriptError};

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// Bounded channel sized by `EVENT_CHANNEL_CAP`. Producers `send().await`, so a slow consumer parks
// the script reader instead of dropping commands; frame ticks simply queue behind it.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 256;

pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static FRAME_TICKS: AtomicU64 = AtomicU64::new(0);
pub static SCRIPT_LINES: AtomicU64 = AtomicU64::new(0);
pub static SCRIPT_REJECTED: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One parsed script command, with its 1-based line number.
    Script { line: usize, command: ScriptCommand },
    /// Display frame boundary.
    Frame,
    /// Script exhausted (or the reader failed); the loop should drain and exit.
    Shutdown,
}

/// Trait implemented by any async event producer. Implementors hold their
/// configuration and spawn one background task that pushes `Event`s into the
/// shared channel, stopping once the channel is closed.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together once the runtime channel exists.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, each with its own `Sender` clone. The
    /// registry is drained so a second call spawns nothing. During shutdown
    /// the caller drops its last `Sender` before awaiting the handles.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Emits `Event::Frame` every interval (the host's animation frame).
pub struct FrameTickSource {
    interval: Duration,
}

impl FrameTickSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

impl AsyncEventSource for FrameTickSource {
    fn name(&self) -> &'static str {
        "frame_tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(Event::Frame).await.is_err() {
                    break;
                }
                FRAME_TICKS.fetch_add(1, Ordering::Relaxed);
            }
        })
    }
}

/// Reads script lines from any async buffered reader. Blank lines and `#`
/// comments are skipped; malformed lines are logged and skipped. Sends
/// `Event::Shutdown` at end of input.
pub struct ScriptLineSource<R> {
    reader: R,
}

impl<R> ScriptLineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl ScriptLineSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl ScriptLineSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R> AsyncEventSource for ScriptLineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "script"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let mut lines = self.reader.lines();
        tokio::spawn(async move {
            let mut number = 0usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(target: "runtime.events", error = %e, "script_read_failed");
                        break;
                    }
                };
                number += 1;
                let command = match ScriptCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        SCRIPT_REJECTED.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(target: "runtime.events", line = number, error = %e, "script_line_rejected");
                        continue;
                    }
                };
                SCRIPT_LINES.fetch_add(1, Ordering::Relaxed);
                if tx.send(Event::Script { line: number, command }).await.is_err() {
                    CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
            if tx.send(Event::Shutdown).await.is_err() {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            }
        })
    }
}
