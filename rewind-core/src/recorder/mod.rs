//! Record and replay of reduce-phase inputs
//!
//! The reduce driver asks a [`ReduceRecorder`] for the values of every key
//! it reduces. What comes back depends on the mode the recorder was
//! built with:
//!
//! - **Passthrough**: a view over the driver's own live iterator. No lock,
//!   no I/O, no allocation.
//! - **Record**: the live iterator is cloned and the clone drained into the
//!   replay log as one record; the view still borrows the untouched
//!   original, so the reduction runs on live data.
//! - **Replay**: the live iterator is ignored and the view owns a copy of
//!   the group recorded in an earlier run.
//!
//! The mode is fixed at construction. One recorder is shared by all
//! worker threads of a job.
//!
//! # Example
//!
//! ```rust,no_run
//! use rewind_core::recorder::ReduceRecorder;
//!
//! # fn main() -> rewind_core::error::Result<()> {
//! let recorder = ReduceRecorder::<String, u64>::record("groups.rlog")?;
//!
//! let mut live = vec![1u64, 2, 3].into_iter();
//! let total: u64 = recorder.get_sequence(&"A".to_string(), &mut live).sum();
//! assert_eq!(total, 6);
//!
//! recorder.finish()?;
//!
//! let replayer = ReduceRecorder::<String, u64>::replay("groups.rlog")?;
//! let mut unused = Vec::<u64>::new().into_iter();
//! let values: Vec<u64> = replayer.get_sequence(&"A".to_string(), &mut unused).collect();
//! assert_eq!(values, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

mod replay;

pub use replay::ReplayTable;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::path::Path;

use crate::codec::Codec;
use crate::config::RecorderConfig;
use crate::error::{Result, RewindError};
use crate::log::LogWriter;
use crate::view::ValueView;

/// How a [`ReduceRecorder`] serves reduce groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecorderMode {
    /// Hand back the live iterator untouched
    #[default]
    Passthrough,

    /// Log every group while reducing live data
    Record,

    /// Serve groups from a previously recorded log
    Replay,
}

impl fmt::Display for RecorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecorderMode::Passthrough => "passthrough",
            RecorderMode::Record => "record",
            RecorderMode::Replay => "replay",
        })
    }
}

enum Backend<K, V> {
    Passthrough,
    Record(LogWriter<K, V>),
    Replay(ReplayTable<K, V>),
}

impl<K, V> Backend<K, V> {
    fn mode(&self) -> RecorderMode {
        match self {
            Backend::Passthrough => RecorderMode::Passthrough,
            Backend::Record(_) => RecorderMode::Record,
            Backend::Replay(_) => RecorderMode::Replay,
        }
    }
}

/// Mode-selected source of reduce group values
pub struct ReduceRecorder<K, V> {
    backend: Backend<K, V>,
}

impl<K, V> ReduceRecorder<K, V>
where
    K: Codec + Eq + Hash + Debug,
    V: Codec + Clone,
{
    /// Recorder that only passes live iterators through
    pub fn passthrough() -> Self {
        Self {
            backend: Backend::Passthrough,
        }
    }

    /// Record every requested group to a new log at `path`.
    ///
    /// # Errors
    ///
    /// [`RewindError::OpenLog`] if the log cannot be created.
    pub fn record(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            backend: Backend::Record(LogWriter::create(path)?),
        })
    }

    /// Load the log at `path` and serve groups from it.
    ///
    /// # Errors
    ///
    /// [`RewindError::OpenLog`] if the log cannot be opened,
    /// [`RewindError::DuplicateKey`] if it holds the same key twice, and
    /// any decoding error.
    pub fn replay(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_table(ReplayTable::load(path)?))
    }

    /// Serve groups from an already loaded table
    pub fn from_table(table: ReplayTable<K, V>) -> Self {
        Self {
            backend: Backend::Replay(table),
        }
    }

    /// Build the recorder described by `config`
    pub fn open(config: &RecorderConfig) -> Result<Self> {
        match config.mode {
            RecorderMode::Passthrough => Ok(Self::passthrough()),
            RecorderMode::Record => Self::record(config.require_log_path()?),
            RecorderMode::Replay => Self::replay(config.require_log_path()?),
        }
    }

    /// Mode chosen at construction
    pub fn mode(&self) -> RecorderMode {
        self.backend.mode()
    }

    /// Values to reduce for `key`.
    ///
    /// # Panics
    ///
    /// In replay mode, if `key` was not recorded. In record mode, if the
    /// log cannot be written or `live` yields a different number of values
    /// than its `len()`. Either way the run can no longer be trusted; use
    /// [`ReduceRecorder::try_get_sequence`] to handle these as errors.
    #[inline]
    pub fn get_sequence<'a, I>(&self, key: &K, live: &'a mut I) -> ValueView<'a, I>
    where
        I: ExactSizeIterator<Item = V> + Clone,
    {
        if let Backend::Passthrough = self.backend {
            return ValueView::borrowed(live);
        }
        match self.try_get_sequence(key, live) {
            Ok(view) => view,
            Err(e) => panic!("reduce recorder ({} mode): {}", self.mode(), e),
        }
    }

    /// Fallible form of [`ReduceRecorder::get_sequence`].
    ///
    /// # Errors
    ///
    /// [`RewindError::MissingKey`] in replay mode for an unrecorded key;
    /// [`RewindError::CountMismatch`] or an I/O error in record mode.
    pub fn try_get_sequence<'a, I>(&self, key: &K, live: &'a mut I) -> Result<ValueView<'a, I>>
    where
        I: ExactSizeIterator<Item = V> + Clone,
    {
        match &self.backend {
            Backend::Passthrough => Ok(ValueView::borrowed(live)),
            Backend::Record(writer) => {
                let count = live.len();
                writer.append(key, count, live.clone())?;
                Ok(ValueView::borrowed(live))
            }
            Backend::Replay(table) => {
                let values = table
                    .get(key)
                    .ok_or_else(|| RewindError::MissingKey(format!("{:?}", key)))?;
                Ok(ValueView::owned(values.to_vec()))
            }
        }
    }

    /// Groups written so far in record mode
    pub fn recorded_groups(&self) -> u64 {
        match &self.backend {
            Backend::Record(writer) => writer.record_count(),
            _ => 0,
        }
    }

    /// The loaded table in replay mode
    pub fn replay_table(&self) -> Option<&ReplayTable<K, V>> {
        match &self.backend {
            Backend::Replay(table) => Some(table),
            _ => None,
        }
    }

    /// Flush and close the record log. A no-op in the other modes.
    pub fn finish(self) -> Result<()> {
        if let Backend::Record(writer) = self.backend {
            let groups = writer.record_count();
            writer.close()?;
            tracing::info!(groups, "reduce recording finished");
        }
        Ok(())
    }
}

impl<K, V> Debug for ReduceRecorder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReduceRecorder")
            .field("mode", &self.backend.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests;
