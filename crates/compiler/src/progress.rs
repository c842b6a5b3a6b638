// Progress reporting and cancellation
//
// Observers receive progress, warnings and info messages. Observer calls are isolated:
// a panicking observer is logged and ignored, it never fails the compile.

use crate::error::{CompileError, Result};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receiver of compile progress and diagnostics
pub trait ProgressReporter {
    fn report_progress(&self, percent: u8, message: &str);
    fn report_warn(&self, message: &str);
    fn report_info(&self, message: &str);
}

/// Forwards everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report_progress(&self, percent: u8, message: &str) {
        tracing::info!("[{:3}%] {}", percent, message);
    }

    fn report_warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn report_info(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

#[derive(Debug, Default, Clone)]
pub struct CollectedReport {
    pub progress: Vec<(u8, String)>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    inner: Mutex<CollectedReport>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        CollectingReporter::default()
    }

    pub fn snapshot(&self) -> CollectedReport {
        self.inner.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.inner.lock().warnings.clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report_progress(&self, percent: u8, message: &str) {
        self.inner.lock().progress.push((percent, message.to_string()));
    }

    fn report_warn(&self, message: &str) {
        self.inner.lock().warnings.push(message.to_string());
    }

    fn report_info(&self, message: &str) {
        self.inner.lock().infos.push(message.to_string());
    }
}

/// Shared cancellation flag, polled by the compiler between units of work
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CompileError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The compiler's view of an observer: isolated calls plus a warning counter
pub(crate) struct Diagnostics<'a> {
    observer: &'a dyn ProgressReporter,
    warnings: AtomicUsize,
}

impl<'a> Diagnostics<'a> {
    pub fn new(observer: &'a dyn ProgressReporter) -> Self {
        Diagnostics {
            observer,
            warnings: AtomicUsize::new(0),
        }
    }

    fn isolated(&self, what: &str, call: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(call)).is_err() {
            tracing::error!("Progress observer panicked while handling {}; ignored", what);
        }
    }

    pub fn progress(&self, percent: u8, message: &str) {
        self.isolated("progress", || self.observer.report_progress(percent.min(100), message));
    }

    pub fn warn(&self, message: &str) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
        self.isolated("warning", || self.observer.report_warn(message));
    }

    pub fn info(&self, message: &str) {
        self.isolated("info", || self.observer.report_info(message));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }
}
