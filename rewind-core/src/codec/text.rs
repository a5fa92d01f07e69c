//! Line-oriented text codec for diagnostics

use std::io::{self, BufRead, Write};

use super::invalid_data;

/// Human-readable encoding: one value per line.
pub trait TextCodec: Sized {
    /// Write the value followed by a newline
    fn write_text<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;

    /// Read one line and parse it back into a value
    fn read_text<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Self>;
}

fn read_line<R: BufRead + ?Sized>(r: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if r.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more lines"));
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

macro_rules! impl_display_text_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TextCodec for $ty {
                fn write_text<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                    writeln!(w, "{}", self)
                }

                fn read_text<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Self> {
                    let line = read_line(r)?;
                    line.trim().parse::<$ty>().map_err(|e| {
                        invalid_data(format!(
                            "cannot parse {:?} as {}: {}",
                            line,
                            stringify!($ty),
                            e
                        ))
                    })
                }
            }
        )*
    };
}

impl_display_text_codec!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char
);

impl TextCodec for String {
    fn write_text<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        if self.contains('\n') {
            return Err(invalid_data("text codec cannot encode embedded newlines"));
        }
        writeln!(w, "{}", self)
    }

    fn read_text<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Self> {
        read_line(r)
    }
}
