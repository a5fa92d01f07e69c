//! Binary replay log
//!
//! The log is a bare concatenation of records with no header, version tag
//! or global length:
//!
//! ```text
//! record := key-bytes count value-bytes{count}
//! ```
//!
//! Keys and values use their [`Codec`] encoding; `count` is a native
//! `usize`. Records appear in the order reduce groups were requested.
//! Because scalars are stored as native byte images, a log is only
//! guaranteed readable by a build for the same target
//! (see [`crate::LOG_LAYOUT`]).

use std::borrow::Borrow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::appender::BufferedAppender;
use crate::codec::Codec;
use crate::error::{Result, RewindError};

/// Upper bound on values preallocated from a record's count field.
const MAX_PREALLOCATED_VALUES: usize = 4096;

/// One reduce group as stored in the log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<K, V> {
    /// Group key
    pub key: K,
    /// Values in the order the reduce function observed them
    pub values: Vec<V>,
}

impl<K: Codec, V: Codec> LogRecord<K, V> {
    /// Create a record
    pub fn new(key: K, values: Vec<V>) -> Self {
        Self { key, values }
    }

    /// Write this record in log format
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.key.encode(w)?;
        self.values.len().encode(w)?;
        for value in &self.values {
            value.encode(w)?;
        }
        Ok(())
    }
}

/// Appends records to a replay log.
///
/// Each record is encoded into a private buffer first and then appended
/// in one piece, so concurrent writers never interleave inside a record.
pub struct LogWriter<K, V, W: Write = File> {
    appender: BufferedAppender<W>,
    records: AtomicU64,
    path: Option<PathBuf>,
    _marker: PhantomData<fn(&K, &V)>,
}

impl<K: Codec, V: Codec> LogWriter<K, V, File> {
    /// Create (or truncate) the log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::OpenLog`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RewindError::OpenLog {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "replay log opened for recording");

        let mut writer = Self::from_appender(BufferedAppender::new(file));
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<K: Codec, V: Codec, W: Write> LogWriter<K, V, W> {
    /// Write records through an existing appender
    pub fn from_appender(appender: BufferedAppender<W>) -> Self {
        Self {
            appender,
            records: AtomicU64::new(0),
            path: None,
            _marker: PhantomData,
        }
    }

    /// Append one record whose values are produced by `values`.
    ///
    /// `count` is written before the values are drained.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::CountMismatch`] (and appends nothing) if
    /// `values` does not yield exactly `count` items, or an I/O error if
    /// a triggered flush fails. In the latter case the record is still
    /// queued and counted, and the next successful flush writes it.
    pub fn append<I>(&self, key: &K, count: usize, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<V>,
    {
        let mut scratch = Vec::new();
        key.encode(&mut scratch)?;
        count.encode(&mut scratch)?;

        let mut observed = 0usize;
        for value in values {
            value.borrow().encode(&mut scratch)?;
            observed += 1;
        }
        if observed != count {
            return Err(RewindError::CountMismatch {
                declared: count,
                observed,
            });
        }

        // Once appended the record is queued even if the flush it triggers
        // fails, so it is counted either way.
        let appended = self.appender.append(&scratch);
        self.records.fetch_add(1, Ordering::Relaxed);
        appended?;
        Ok(())
    }

    /// Append a materialized record
    pub fn append_record(&self, record: &LogRecord<K, V>) -> Result<()> {
        self.append(&record.key, record.values.len(), &record.values)
    }

    /// Records appended so far
    pub fn record_count(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Path of the log, when writing to a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush everything written so far
    pub fn flush(&self) -> Result<()> {
        self.appender.flush()?;
        Ok(())
    }

    /// Flush and close the log
    pub fn close(self) -> Result<W> {
        let records = self.record_count();
        let sink = self.appender.into_inner()?;
        tracing::debug!(records, "replay log closed");
        Ok(sink)
    }
}

/// Byte-counting reader so errors can point at the failing record
struct Positioned<R> {
    inner: BufReader<R>,
    offset: u64,
}

impl<R: Read> Positioned<R> {
    fn at_eof(&mut self) -> io::Result<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }
}

impl<R: Read> Read for Positioned<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

/// Streams records out of a replay log.
///
/// Iteration ends cleanly at end of input on a record boundary. Input that
/// ends inside a record yields [`RewindError::TruncatedLog`], after which
/// the reader is finished.
pub struct LogReader<K, V, R = File> {
    reader: Positioned<R>,
    finished: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K: Codec, V: Codec> LogReader<K, V, File> {
    /// Open the log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::OpenLog`] if the file cannot be opened; a
    /// missing log is an error, not an empty replay.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RewindError::OpenLog {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file))
    }
}

impl<K: Codec, V: Codec, R: Read> LogReader<K, V, R> {
    /// Read records from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader: Positioned {
                inner: BufReader::new(reader),
                offset: 0,
            },
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.reader.offset
    }

    fn read_record(&mut self) -> io::Result<LogRecord<K, V>> {
        let r = &mut self.reader;
        let key = K::decode(r)?;
        let count = usize::decode(r)?;
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOCATED_VALUES));
        for _ in 0..count {
            values.push(V::decode(r)?);
        }
        Ok(LogRecord { key, values })
    }
}

impl<K: Codec, V: Codec, R: Read> Iterator for LogReader<K, V, R> {
    type Item = Result<LogRecord<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.at_eof() {
            Ok(true) => {
                self.finished = true;
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                self.finished = true;
                return Some(Err(e.into()));
            }
        }

        let start = self.reader.offset;
        match self.read_record() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.finished = true;
                Some(Err(match e.kind() {
                    io::ErrorKind::UnexpectedEof => RewindError::TruncatedLog { offset: start },
                    io::ErrorKind::InvalidData => RewindError::InvalidData(format!(
                        "record at byte {start}: {e}"
                    )),
                    _ => RewindError::Io(e),
                }))
            }
        }
    }
}
