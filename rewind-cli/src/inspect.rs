//! Replay log inspection

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rewind_core::codec::{Codec, TextCodec};
use rewind_core::log::LogReader;
use serde::Serialize;

/// Key type a log was recorded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyType {
    U64,
    I64,
    String,
}

/// Value type a log was recorded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    U64,
    I64,
    F64,
    String,
}

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Print keys without their values
    pub keys_only: bool,
    /// Print a JSON summary instead of the text listing
    pub json: bool,
    /// Stop after this many records
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
}

/// What an inspection saw
#[derive(Debug, Serialize, PartialEq)]
pub struct LogSummary {
    pub path: String,
    pub layout: &'static str,
    pub records: usize,
    pub values: usize,
    pub groups: Vec<GroupSummary>,
}

/// Decode the log at `path` with the given key and value types.
pub fn run<W: Write>(
    path: &Path,
    key_type: KeyType,
    value_type: ValueType,
    options: &InspectOptions,
    out: &mut W,
) -> Result<LogSummary> {
    macro_rules! with_value {
        ($k:ty) => {
            match value_type {
                ValueType::U64 => inspect::<$k, u64, W>(path, options, out),
                ValueType::I64 => inspect::<$k, i64, W>(path, options, out),
                ValueType::F64 => inspect::<$k, f64, W>(path, options, out),
                ValueType::String => inspect::<$k, String, W>(path, options, out),
            }
        };
    }

    match key_type {
        KeyType::U64 => with_value!(u64),
        KeyType::I64 => with_value!(i64),
        KeyType::String => with_value!(String),
    }
}

/// Print every record as text lines (key, count, then one value per line)
/// unless `options.json` asks for a summary.
pub fn inspect<K, V, W>(path: &Path, options: &InspectOptions, out: &mut W) -> Result<LogSummary>
where
    K: Codec + TextCodec + Display,
    V: Codec + TextCodec,
    W: Write,
{
    let reader = LogReader::<K, V>::open(path)?;
    let limit = options.limit.unwrap_or(usize::MAX);

    let mut summary = LogSummary {
        path: path.display().to_string(),
        layout: rewind_core::LOG_LAYOUT,
        records: 0,
        values: 0,
        groups: Vec::new(),
    };

    for record in reader.take(limit) {
        let record = record.with_context(|| format!("reading {}", path.display()))?;

        if !options.json {
            record.key.write_text(out)?;
            if !options.keys_only {
                record.values.len().write_text(out)?;
                for value in &record.values {
                    value.write_text(out)?;
                }
            }
        }

        summary.records += 1;
        summary.values += record.values.len();
        summary.groups.push(GroupSummary {
            key: record.key.to_string(),
            count: record.values.len(),
        });
    }

    if options.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    }

    tracing::debug!(
        records = summary.records,
        values = summary.values,
        "log inspected"
    );
    Ok(summary)
}
