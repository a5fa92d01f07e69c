//! Value codecs for the replay log and for diagnostics
//!
//! Two traits live here:
//!
//! - [`Codec`] is the binary, native-format encoding used by the replay
//!   log. Fixed-layout scalars are written as their in-memory byte image
//!   (no byte-order or padding normalization), text and byte strings as a
//!   native `usize` length prefix followed by the raw bytes.
//! - [`TextCodec`] is a line-oriented human-readable encoding, one value
//!   per line, used by inspection tooling. The binary log never uses it.
//!
//! A type with no impl cannot be recorded at all: the recorder's bounds
//! reject it at compile time. Composite records implement [`Codec`] by
//! encoding their fields in a fixed order:
//!
//! ```rust
//! use rewind_core::codec::Codec;
//! use std::io::{self, Read, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Visit {
//!     page: String,
//!     hits: u64,
//! }
//!
//! impl Codec for Visit {
//!     fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
//!         self.page.encode(w)?;
//!         self.hits.encode(w)
//!     }
//!
//!     fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
//!         Ok(Visit {
//!             page: String::decode(r)?,
//!             hits: u64::decode(r)?,
//!         })
//!     }
//! }
//!
//! let visit = Visit { page: "/home".into(), hits: 3 };
//! let mut bytes = Vec::new();
//! visit.encode(&mut bytes).unwrap();
//! assert_eq!(Visit::decode(&mut bytes.as_slice()).unwrap(), visit);
//! ```

mod binary;
mod text;

pub use binary::Codec;
pub use text::TextCodec;

/// Width in bytes of the length prefix and of a record's count field
pub const LENGTH_FIELD_WIDTH: usize = std::mem::size_of::<usize>();

pub(crate) fn invalid_data(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}
