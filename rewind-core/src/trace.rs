//! Low-overhead performance event tracer
//!
//! One tracer is opened by the job driver and shared by reference with
//! every worker thread. Each emission point formats a single line
//!
//! ```text
//! <elapsed-seconds>: <role>[<ids>]: <message>
//! ```
//!
//! and hands it to a [`BufferedAppender`]. Formatting happens before the
//! appender's lock is taken. When tracing is disabled every emission point
//! returns after a single boolean check and no file is created.
//!
//! # Example
//!
//! ```rust,no_run
//! use rewind_core::config::TraceConfig;
//! use rewind_core::trace::EventTracer;
//!
//! # fn main() -> rewind_core::error::Result<()> {
//! let tracer = EventTracer::open(&TraceConfig::default())?;
//! tracer.worker(0, "started");
//! tracer.map(0, 17, "begin");
//! tracer.reduce(0, &"checkout", "begin");
//! tracer.close()?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{Display, Write as _};
use std::fs::File;
use std::io::Write;
use std::time::Instant;

use crate::appender::BufferedAppender;
use crate::config::TraceConfig;
use crate::error::{Result, RewindError};

/// Message emitted by [`EventTracer::open`]
pub const PROGRAM_BEGIN: &str = "program_begin";
/// Message emitted by [`EventTracer::close`]
pub const PROGRAM_END: &str = "program_end";

/// Buffered, thread-safe performance tracer
pub struct EventTracer<W: Write = File> {
    appender: Option<BufferedAppender<W>>,
    started_at: Instant,
    closed: bool,
}

impl EventTracer<File> {
    /// Open the trace file named by `config` and emit `program_begin`.
    ///
    /// With `config.enabled == false` this returns a disabled tracer and
    /// touches no file.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::OpenTrace`] if the trace file cannot be created.
    pub fn open(config: &TraceConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let file = File::create(&config.path).map_err(|source| RewindError::OpenTrace {
            path: config.path.clone(),
            source,
        })?;
        tracing::info!(path = %config.path.display(), "performance trace opened");

        Ok(Self::with_appender(BufferedAppender::with_high_water_mark(
            file,
            config.high_water_mark,
        )))
    }
}

impl<W: Write> EventTracer<W> {
    /// A tracer whose emission points do nothing
    pub fn disabled() -> Self {
        Self {
            appender: None,
            started_at: Instant::now(),
            closed: true,
        }
    }

    /// Trace into an existing appender. Emits `program_begin`.
    pub fn with_appender(appender: BufferedAppender<W>) -> Self {
        let tracer = Self {
            appender: Some(appender),
            started_at: Instant::now(),
            closed: false,
        };
        tracer.master(PROGRAM_BEGIN);
        tracer
    }

    /// Whether emission points produce output
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.appender.is_some()
    }

    /// Seconds since the tracer was opened
    pub fn elapsed(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Event on the master thread
    #[inline]
    pub fn master(&self, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(format_args!("master_thread: {message}"));
    }

    /// Event on a worker thread outside any task
    #[inline]
    pub fn worker(&self, worker_id: usize, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(format_args!("worker_thread[{worker_id}]: {message}"));
    }

    /// Event inside a map task
    #[inline]
    pub fn map(&self, worker_id: usize, map_id: usize, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(format_args!("worker[{worker_id}]: map[{map_id}]: {message}"));
    }

    /// Event inside the reduction of `key`
    #[inline]
    pub fn reduce<K: Display + ?Sized>(&self, worker_id: usize, key: &K, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(format_args!("worker[{worker_id}]: reduce[{key}]: {message}"));
    }

    /// Event inside a merge task
    #[inline]
    pub fn merge(&self, worker_id: usize, merge_id: usize, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(format_args!("worker[{worker_id}]: merge[{merge_id}]: {message}"));
    }

    /// Emit `program_end` and flush everything to the trace file
    pub fn close(mut self) -> Result<()> {
        self.finish()?;
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.master(PROGRAM_END);
        match self.appender.as_ref() {
            Some(appender) => appender.flush(),
            None => Ok(()),
        }
    }

    fn emit(&self, event: std::fmt::Arguments<'_>) {
        let Some(appender) = self.appender.as_ref() else {
            return;
        };
        let mut line = String::with_capacity(96);
        let _ = write!(line, "{:.6}: {}", self.elapsed(), event);
        // One event per line, whatever the message or key contains
        if line.contains(['\n', '\r']) {
            line = line.replace('\n', "\\n").replace('\r', "\\r");
        }
        line.push('\n');
        if let Err(e) = appender.append_str(&line) {
            tracing::warn!(error = %e, "failed to append performance trace line");
        }
    }

    #[cfg(test)]
    fn into_sink(mut self) -> std::io::Result<Option<W>> {
        self.finish()?;
        self.appender.take().map(BufferedAppender::into_inner).transpose()
    }
}

impl<W: Write> Drop for EventTracer<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!(error = %e, "failed to flush performance trace");
        }
    }
}
