//! # Rewind - deterministic replay for the reduce phase
//!
//! Parallel reduce execution is non-deterministic: which worker gets which
//! key, and the order intermediate values arrive in, change from run to
//! run. Rewind makes reduce-function bugs reproducible by recording the
//! exact value sequence every reduce call observed and replaying it on a
//! later run without re-running map and shuffle. It also provides a cheap,
//! always-on event tracer for timing worker activity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rewind_core::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = RewindConfig::load()?;
//!     let tracer = EventTracer::open(&config.trace)?;
//!     let recorder = ReduceRecorder::<String, u64>::open(&config.recorder)?;
//!
//!     let mut live = vec![3u64, 4].into_iter();
//!     tracer.reduce(0, "clicks", "begin");
//!     let total: u64 = recorder.get_sequence(&"clicks".to_string(), &mut live).sum();
//!     tracer.reduce(0, "clicks", "end");
//!     assert_eq!(total, 7);
//!
//!     recorder.finish()?;
//!     tracer.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Codec**: native-format binary encoding for log keys and values, plus
//!   a line-oriented text codec for diagnostics
//! - **BufferedAppender**: locked, buffered, append-only sink with a
//!   size-triggered flush
//! - **EventTracer**: timestamped trace lines for master, worker, map,
//!   reduce and merge events
//! - **ValueView**: the iterator a reduce function folds over, either
//!   borrowing the live iterator or owning a replayed copy
//! - **ReduceRecorder**: passthrough, record or replay, fixed at construction

pub mod appender;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod log;
pub mod recorder;
pub mod trace;
pub mod view;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target triple this crate was built for
pub const BUILD_TARGET: &str = env!("REWIND_BUILD_TARGET");

/// Byte order and pointer width baked into replay logs written by this build
pub const LOG_LAYOUT: &str = env!("REWIND_LOG_LAYOUT");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::appender::{BufferedAppender, DEFAULT_HIGH_WATER_MARK};
    pub use crate::codec::{Codec, TextCodec};
    pub use crate::config::{ConfigBuilder, RecorderConfig, RewindConfig, TraceConfig};
    pub use crate::cursor::SequenceCursor;
    pub use crate::error::{Result, RewindError};
    pub use crate::log::{LogReader, LogRecord, LogWriter};
    pub use crate::recorder::{RecorderMode, ReduceRecorder, ReplayTable};
    pub use crate::trace::EventTracer;
    pub use crate::view::ValueView;
}
