//! Native-format binary codec

use std::io::{self, Read, Write};

use super::invalid_data;

/// Binary encoding used by the replay log.
///
/// `decode` must consume exactly the bytes `encode` produced. Running out
/// of input mid-value surfaces as [`io::ErrorKind::UnexpectedEof`].
pub trait Codec: Sized {
    /// Write the encoded value to `w`
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;

    /// Read one value from `r`
    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self>;
}

macro_rules! impl_native_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Codec for $ty {
                #[inline]
                fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                    w.write_all(&self.to_ne_bytes())
                }

                #[inline]
                fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    r.read_exact(&mut buf)?;
                    Ok(<$ty>::from_ne_bytes(buf))
                }
            }
        )*
    };
}

impl_native_codec!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64
);

impl Codec for bool {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        (*self as u8).encode(w)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        match u8::decode(r)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(invalid_data(format!("invalid bool byte {other:#04x}"))),
        }
    }
}

impl Codec for char {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        u32::from(*self).encode(w)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let raw = u32::decode(r)?;
        char::from_u32(raw).ok_or_else(|| invalid_data(format!("invalid char {raw:#x}")))
    }
}

/// Reads a `usize` length prefix and then exactly that many bytes.
///
/// The payload is pulled through `take` so a corrupt prefix cannot force
/// a huge up-front allocation.
fn read_prefixed<R: Read + ?Sized>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = usize::decode(r)?;
    let mut bytes = Vec::new();
    let read = (&mut *r).take(len as u64).read_to_end(&mut bytes)?;
    if read != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} payload bytes, found {read}"),
        ));
    }
    Ok(bytes)
}

impl Codec for Vec<u8> {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.len().encode(w)?;
        w.write_all(self)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        read_prefixed(r)
    }
}

impl Codec for String {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.len().encode(w)?;
        w.write_all(self.as_bytes())
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        String::from_utf8(read_prefixed(r)?)
            .map_err(|e| invalid_data(format!("string payload is not UTF-8: {e}")))
    }
}

impl<A: Codec, B: Codec> Codec for (A, B) {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.0.encode(w)?;
        self.1.encode(w)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok((A::decode(r)?, B::decode(r)?))
    }
}

impl<A: Codec, B: Codec, C: Codec> Codec for (A, B, C) {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.0.encode(w)?;
        self.1.encode(w)?;
        self.2.encode(w)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok((A::decode(r)?, B::decode(r)?, C::decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LENGTH_FIELD_WIDTH;

    fn encoded<T: Codec>(value: &T) -> Vec<u8> {
        let mut buf = Vec::new();
        value.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_scalars_use_native_byte_image() {
        assert_eq!(encoded(&0x0102_0304u32), 0x0102_0304u32.to_ne_bytes().to_vec());
        assert_eq!(encoded(&-7i64).len(), 8);
        assert_eq!(encoded(&1.5f64), 1.5f64.to_ne_bytes().to_vec());
        assert_eq!(encoded(&42usize).len(), LENGTH_FIELD_WIDTH);
    }

    #[test]
    fn test_string_is_length_prefixed() {
        let bytes = encoded(&"abc".to_string());
        assert_eq!(bytes.len(), LENGTH_FIELD_WIDTH + 3);
        assert_eq!(&bytes[..LENGTH_FIELD_WIDTH], &3usize.to_ne_bytes());
        assert_eq!(&bytes[LENGTH_FIELD_WIDTH..], b"abc");

        let empty = encoded(&String::new());
        assert_eq!(empty, 0usize.to_ne_bytes().to_vec());
        assert_eq!(String::decode(&mut empty.as_slice()).unwrap(), "");
    }

    #[test]
    fn test_decode_consumes_exactly_one_value() {
        let mut bytes = encoded(&"key".to_string());
        bytes.extend(encoded(&9u16));
        let mut cursor = bytes.as_slice();

        assert_eq!(String::decode(&mut cursor).unwrap(), "key");
        assert_eq!(u16::decode(&mut cursor).unwrap(), 9);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_truncated_string_is_eof() {
        let mut bytes = encoded(&"truncated".to_string());
        bytes.truncate(bytes.len() - 2);
        let err = String::decode(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut bytes = encoded(&2usize);
        bytes.extend([0xff, 0xfe]);
        let err = String::decode(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_bool_rejects_garbage() {
        assert!(bool::decode(&mut [1u8].as_slice()).unwrap());
        assert!(!bool::decode(&mut [0u8].as_slice()).unwrap());
        let err = bool::decode(&mut [2u8].as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_char_rejects_surrogates() {
        let bytes = encoded(&0xD800u32);
        assert!(char::decode(&mut bytes.as_slice()).is_err());
        let bytes = encoded(&'λ');
        assert_eq!(char::decode(&mut bytes.as_slice()).unwrap(), 'λ');
    }

    #[test]
    fn test_tuple_composes_fields_in_order() {
        let value = ("view-1".to_string(), 12u64, 0.25f64);
        let bytes = encoded(&value);

        let mut expected = encoded(&value.0);
        expected.extend(encoded(&value.1));
        expected.extend(encoded(&value.2));
        assert_eq!(bytes, expected);

        let decoded = <(String, u64, f64)>::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, value);
    }
}
