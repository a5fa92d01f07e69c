//! In-memory table of recorded reduce groups

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::Read;
use std::path::Path;

use crate::codec::Codec;
use crate::error::{Result, RewindError};
use crate::log::{LogReader, LogRecord};

/// Recorded value sequences keyed by reduce key.
///
/// Built once by scanning a whole log. A key may appear only once: a
/// second occurrence means the log is corrupt or the recording job
/// requested the same group twice, and loading fails.
#[derive(Debug, Clone)]
pub struct ReplayTable<K, V> {
    groups: HashMap<K, Vec<V>>,
}

impl<K, V> ReplayTable<K, V>
where
    K: Codec + Eq + Hash + Debug,
    V: Codec,
{
    /// Load every record from the log at `path`.
    ///
    /// # Errors
    ///
    /// [`RewindError::OpenLog`] if the log cannot be opened,
    /// [`RewindError::DuplicateKey`] if a key occurs twice, and any
    /// decoding error from [`LogReader`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::from_records(LogReader::open(path)?)?;
        tracing::info!(
            path = %path.display(),
            groups = table.len(),
            values = table.value_count(),
            "replay table loaded"
        );
        Ok(table)
    }

    /// Load every record from `reader`
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_records(LogReader::<K, V, R>::new(reader))
    }

    /// Build a table from decoded records, rejecting duplicate keys
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<LogRecord<K, V>>>,
    {
        let mut groups = HashMap::new();
        for record in records {
            let LogRecord { key, values } = record?;
            match groups.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(RewindError::DuplicateKey(format!("{:?}", entry.key())));
                }
                Entry::Vacant(entry) => {
                    entry.insert(values);
                }
            }
        }
        Ok(Self { groups })
    }
}

impl<K: Eq + Hash, V> ReplayTable<K, V> {
    /// Recorded values for `key`
    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Whether `key` was recorded
    pub fn contains_key(&self, key: &K) -> bool {
        self.groups.contains_key(key)
    }

    /// Number of recorded groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the log held no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Recorded keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.keys()
    }

    /// Total number of values across all groups
    pub fn value_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
