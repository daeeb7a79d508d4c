//! Run progress reporting and cooperative cancellation.
//!
//! A [`ProgressSink`] receives stage and percentage updates from an
//! autotile run and is polled for cancellation between units of work.
//!
//! # Example
//!
//! ```ignore
//! use tileforge::progress::{ConsoleProgress, ProgressEvent, ProgressSink, Stage};
//!
//! let sink = ConsoleProgress::new();
//! sink.report(ProgressEvent::StageStarted { stage: Stage::Matching });
//! sink.report(ProgressEvent::Percent { stage: Stage::Matching, percent: 42 });
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

/// Phases of a run that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Palettizing,
    Matching,
    Recoloring,
    Compositing,
}

impl Stage {
    /// Share of the overall 0-100 scale covered by this stage.
    pub fn span(self) -> (u8, u8) {
        match self {
            Stage::Palettizing => (0, 10),
            Stage::Matching => (10, 80),
            Stage::Recoloring => (80, 95),
            Stage::Compositing => (95, 100),
        }
    }

    /// Overall percentage after `done` of `total` units of this stage.
    pub fn percent(self, done: usize, total: usize) -> u8 {
        let (start, end) = self.span();
        if total == 0 {
            return end;
        }
        let done = done.min(total);
        let width = (end - start) as usize;
        start + (width * done / total) as u8
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Palettizing => write!(f, "palettizing"),
            Stage::Matching => write!(f, "matching"),
            Stage::Recoloring => write!(f, "recoloring"),
            Stage::Compositing => write!(f, "compositing"),
        }
    }
}

/// Events that can be reported during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A stage started
    StageStarted { stage: Stage },
    /// Overall progress, 0-100
    Percent { stage: Stage, percent: u8 },
    /// A non-fatal problem, e.g. a template that failed to load
    Warning { message: String },
    /// The run ended
    Finished {
        /// Number of recognized series placed in the atlas
        columns: usize,
        cancelled: bool,
    },
}

/// Receives progress and answers cancellation queries.
pub trait ProgressSink: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Whether the run should stop at the next checkpoint.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A progress sink that discards all events and never cancels.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter.
pub struct ConsoleProgress {
    /// Last percentage written, to avoid repeating lines
    last_percent: AtomicU8,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress").field("last_percent", &self.last_percent).finish()
    }
}

impl ConsoleProgress {
    /// Create a console progress reporter writing to stderr.
    pub fn new() -> Self {
        Self::with_output(std::io::stderr())
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { last_percent: AtomicU8::new(u8::MAX), output: Mutex::new(Box::new(output)) }
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage } => {
                self.writeln(&format!("[{}] started", stage));
            }
            ProgressEvent::Percent { stage, percent } => {
                // Only print in 10% steps
                let step = percent / 10 * 10;
                if self.last_percent.swap(step, Ordering::SeqCst) != step {
                    self.writeln(&format!("[{}] {:>3}%", stage, step));
                }
            }
            ProgressEvent::Warning { message } => {
                self.writeln(&format!("[warn] {}", message));
            }
            ProgressEvent::Finished { columns, cancelled } => {
                if cancelled {
                    self.writeln("[done] cancelled");
                } else {
                    self.writeln(&format!(
                        "[done] {} autotile{} detected",
                        columns,
                        if columns == 1 { "" } else { "s" }
                    ));
                }
            }
        }
    }
}

/// Wraps another sink with a cancellation flag.
///
/// The flag can be raised from any thread with [`cancel`](Self::cancel), or
/// automatically once reported progress reaches a given percentage.
#[derive(Debug)]
pub struct CancelFlag<S: ProgressSink> {
    inner: S,
    cancelled: AtomicBool,
    cancel_at: Option<u8>,
}

impl<S: ProgressSink> CancelFlag<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cancelled: AtomicBool::new(false), cancel_at: None }
    }

    /// Cancel as soon as a percentage of at least `percent` is reported.
    pub fn cancel_at(mut self, percent: u8) -> Self {
        self.cancel_at = Some(percent);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ProgressSink> ProgressSink for CancelFlag<S> {
    fn report(&self, event: ProgressEvent) {
        if let (ProgressEvent::Percent { percent, .. }, Some(limit)) = (&event, self.cancel_at) {
            if *percent >= limit {
                self.cancel();
            }
        }
        self.inner.report(event);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.inner.is_cancelled()
    }
}

/// Sink that records every event, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
