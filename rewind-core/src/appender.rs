//! Thread-safe buffered append-only sink
//!
//! Every append takes the appender's lock, copies the bytes into an
//! in-memory buffer and returns. The buffer is written to the underlying
//! sink only when it grows past the high water mark, on an explicit
//! [`BufferedAppender::flush`], or when the appender is dropped. Data
//! appended since the last flush is lost if the process dies abnormally.
//!
//! Appends are atomic with respect to each other: two threads never
//! interleave inside one append. Ordering across threads is whatever
//! order they win the lock in.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// 10 MiB minus a 1 KiB safety margin
pub const DEFAULT_HIGH_WATER_MARK: usize = 10 * 1024 * 1024 - 1024;

struct AppenderInner<W> {
    buf: Vec<u8>,
    /// `None` once the sink has been handed back by `into_inner`
    sink: Option<W>,
}

impl<W: Write> AppenderInner<W> {
    /// Writes the buffer out. Bytes the sink accepted are dropped from the
    /// buffer even when a later write fails, so a retry never repeats them.
    fn flush(&mut self) -> io::Result<bool> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };
        if self.buf.is_empty() {
            return Ok(false);
        }

        let mut written = 0;
        let result = loop {
            if written == self.buf.len() {
                break sink.flush();
            }
            match sink.write(&self.buf[written..]) {
                Ok(0) => break Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.buf.drain(..written);
        result.map(|()| true)
    }
}

/// Buffered append-only sink shared between threads
pub struct BufferedAppender<W: Write> {
    inner: Mutex<AppenderInner<W>>,
    high_water_mark: usize,
    flushes: AtomicU64,
}

impl<W: Write> BufferedAppender<W> {
    /// Wrap `sink` with the default high water mark
    pub fn new(sink: W) -> Self {
        Self::with_high_water_mark(sink, DEFAULT_HIGH_WATER_MARK)
    }

    /// Wrap `sink`, flushing whenever more than `high_water_mark` bytes are buffered
    pub fn with_high_water_mark(sink: W, high_water_mark: usize) -> Self {
        Self {
            inner: Mutex::new(AppenderInner {
                buf: Vec::with_capacity(high_water_mark.min(DEFAULT_HIGH_WATER_MARK) + 1),
                sink: Some(sink),
            }),
            high_water_mark,
            flushes: AtomicU64::new(0),
        }
    }

    /// Append raw bytes.
    ///
    /// The bytes are buffered before any flush is attempted, so an error
    /// here means only that the triggered flush failed; the data stays
    /// queued for the next one.
    pub fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.buf.extend_from_slice(bytes);
        if inner.buf.len() > self.high_water_mark {
            self.flush_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Append text
    pub fn append_str(&self, text: &str) -> io::Result<()> {
        self.append(text.as_bytes())
    }

    /// Write out everything buffered so far
    pub fn flush(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        self.flush_locked(&mut inner)
    }

    /// Flush and hand back the underlying sink
    pub fn into_inner(self) -> io::Result<W> {
        let mut inner = self.inner.lock();
        self.flush_locked(&mut inner)?;
        inner
            .sink
            .take()
            .ok_or_else(|| io::Error::other("appender sink already taken"))
    }

    /// Number of flushes that reached the sink
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Bytes currently held in memory
    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Configured flush threshold
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    fn flush_locked(&self, inner: &mut AppenderInner<W>) -> io::Result<()> {
        let len = inner.buf.len();
        if inner.flush()? {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(bytes = len, "flushed appender buffer");
        }
        Ok(())
    }
}

impl<W: Write> Drop for BufferedAppender<W> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        let pending = inner.buf.len();
        if let Err(e) = inner.flush() {
            tracing::warn!(error = %e, bytes = pending, "failed to flush appender on drop");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// In-memory sink that records each write so tests can observe flushes.
    #[derive(Clone, Default)]
    pub(crate) struct SharedSink {
        pub(crate) bytes: Arc<Mutex<Vec<u8>>>,
        pub(crate) writes: Arc<AtomicU64>,
    }

    impl SharedSink {
        pub(crate) fn contents(&self) -> Vec<u8> {
            self.bytes.lock().clone()
        }

        pub(crate) fn write_calls(&self) -> u64 {
            self.writes.load(Ordering::Relaxed)
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.lock().extend_from_slice(buf);
            self.writes.fetch_add(1, Ordering::Relaxed);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_no_flush_below_high_water_mark() {
        let sink = SharedSink::default();
        let appender = BufferedAppender::with_high_water_mark(sink.clone(), 64);

        appender.append_str("hello ").unwrap();
        appender.append_str("world").unwrap();

        assert_eq!(appender.flush_count(), 0);
        assert_eq!(appender.buffered_len(), 11);
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_crossing_mark_flushes_once() {
        let sink = SharedSink::default();
        let appender = BufferedAppender::with_high_water_mark(sink.clone(), 100);
        let chunk = [b'x'; 30];

        // 30, 60, 90: still under the mark
        for _ in 0..3 {
            appender.append(&chunk).unwrap();
        }
        assert_eq!(appender.flush_count(), 0);

        // 120 > 100: flushed, and never more than one append past the mark
        appender.append(&chunk).unwrap();
        assert_eq!(appender.flush_count(), 1);
        assert_eq!(appender.buffered_len(), 0);
        assert_eq!(sink.contents().len(), 120);

        appender.append(&chunk).unwrap();
        assert_eq!(appender.flush_count(), 1);
        assert_eq!(appender.buffered_len(), 30);
    }

    #[test]
    fn test_exactly_at_mark_does_not_flush() {
        let sink = SharedSink::default();
        let appender = BufferedAppender::with_high_water_mark(sink.clone(), 10);
        appender.append(&[0u8; 10]).unwrap();
        assert_eq!(appender.flush_count(), 0);
        appender.append(&[0u8; 1]).unwrap();
        assert_eq!(appender.flush_count(), 1);
    }

    #[test]
    fn test_drop_flushes_remaining() {
        let sink = SharedSink::default();
        {
            let appender = BufferedAppender::with_high_water_mark(sink.clone(), 1 << 20);
            appender.append_str("program_begin\n").unwrap();
            appender.append_str("program_end\n").unwrap();
            assert!(sink.contents().is_empty());
        }
        assert_eq!(sink.contents(), b"program_begin\nprogram_end\n");
    }

    #[test]
    fn test_explicit_flush_and_into_inner() {
        let sink = SharedSink::default();
        let appender = BufferedAppender::new(sink.clone());
        appender.append(b"abc").unwrap();
        appender.flush().unwrap();
        assert_eq!(sink.contents(), b"abc");
        assert_eq!(appender.flush_count(), 1);

        // Empty flushes never reach the sink
        appender.flush().unwrap();
        assert_eq!(appender.flush_count(), 1);

        appender.append(b"def").unwrap();
        let returned = appender.into_inner().unwrap();
        assert_eq!(returned.contents(), b"abcdef");
        assert_eq!(sink.write_calls(), 2);
    }

    /// Accepts a few bytes, then fails once, then behaves.
    pub(crate) struct StutteringSink {
        pub(crate) bytes: Vec<u8>,
        accept_then_fail: Option<usize>,
    }

    impl StutteringSink {
        pub(crate) fn failing_after(accepted: usize) -> Self {
            Self {
                bytes: Vec::new(),
                accept_then_fail: Some(accepted),
            }
        }
    }

    impl Write for StutteringSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.accept_then_fail {
                Some(0) => {
                    self.accept_then_fail = None;
                    Err(io::Error::other("disk hiccup"))
                }
                Some(n) => {
                    let n = n.min(buf.len());
                    self.bytes.extend_from_slice(&buf[..n]);
                    self.accept_then_fail = Some(0);
                    Ok(n)
                }
                None => {
                    self.bytes.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_flush_never_repeats_written_bytes() {
        let sink = StutteringSink::failing_after(4);
        let appender = BufferedAppender::with_high_water_mark(sink, 8);

        assert!(appender.append(b"line-one\n").is_err());
        assert_eq!(appender.buffered_len(), 5);
        assert_eq!(appender.flush_count(), 0);

        appender.append(b"line-two\n").unwrap();
        assert_eq!(appender.flush_count(), 1);

        let sink = appender.into_inner().unwrap();
        assert_eq!(sink.bytes, b"line-one\nline-two\n");
    }

    #[test]
    fn test_concurrent_appends_are_atomic() {
        let sink = SharedSink::default();
        let appender = Arc::new(BufferedAppender::with_high_water_mark(sink.clone(), 256));

        std::thread::scope(|s| {
            for worker in 0..8u8 {
                let appender = Arc::clone(&appender);
                s.spawn(move || {
                    let line = format!("{}{}\n", char::from(b'a' + worker), "#".repeat(15));
                    for _ in 0..200 {
                        appender.append_str(&line).unwrap();
                    }
                });
            }
        });
        drop(appender);

        let text = String::from_utf8(sink.contents()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            assert_eq!(line.len(), 16);
            assert!(line[1..].chars().all(|c| c == '#'), "torn line: {line}");
        }
    }
}
