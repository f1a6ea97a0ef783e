//! Little-endian field access over `std::io` streams.

use std::io::{self, Read, Write};

use crate::endian::{ByteOrder, FixedWidth};
use crate::{EasyError, Result};

/// Fill `buf` as far as the reader allows, returning the number of bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub trait ReadBinaryExt: Read {
    /// Read exactly `N` bytes or fail with [`EasyError::TruncatedInput`].
    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        let got = read_full(self, &mut buf)?;
        if got < N {
            return Err(EasyError::TruncatedInput {
                needed: N,
                available: got,
            });
        }
        Ok(buf)
    }

    fn read_le<T: FixedWidth>(&mut self) -> Result<T> {
        let mut buf = [0u8; 8];
        let field = &mut buf[..T::WIDTH];
        let got = read_full(self, field)?;
        if got < T::WIDTH {
            return Err(EasyError::TruncatedInput {
                needed: T::WIDTH,
                available: got,
            });
        }
        T::get(field, ByteOrder::LittleEndian)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_fixed::<1>()?;
        Ok(b)
    }

    /// Read a length-prefixed blob without trusting the length for allocation.
    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        self.by_ref().take(len).read_to_end(&mut out)?;
        if (out.len() as u64) < len {
            return Err(EasyError::TruncatedInput {
                needed: usize::try_from(len).unwrap_or(usize::MAX),
                available: out.len(),
            });
        }
        Ok(out)
    }
}

impl<R: Read + ?Sized> ReadBinaryExt for R {}

pub trait WriteBinaryExt: Write {
    fn write_le<T: FixedWidth>(&mut self, value: T) -> io::Result<()> {
        let mut buf = Vec::with_capacity(T::WIDTH);
        value.put(ByteOrder::LittleEndian, &mut buf);
        self.write_all(&buf)
    }
}

impl<W: Write + ?Sized> WriteBinaryExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_mixed_fields() {
        let mut cur = Cursor::new(vec![0x34, 0x12, 0xFF, 1, 0, 0, 0, b'h', b'i']);
        assert_eq!(cur.read_le::<u16>().unwrap(), 0x1234);
        assert_eq!(cur.read_u8().unwrap(), 0xFF);
        assert_eq!(cur.read_le::<u32>().unwrap(), 1);
        assert_eq!(cur.read_bytes(2).unwrap(), b"hi");
    }

    #[test]
    fn short_blob_reports_truncation() {
        let mut cur = Cursor::new(vec![1, 2, 3]);
        let err = cur.read_bytes(1 << 40).unwrap_err();
        assert!(matches!(err, EasyError::TruncatedInput { available: 3, .. }));
    }

    #[test]
    fn writes_little_endian() {
        let mut out = Vec::new();
        out.write_le(0x0102_0304u32).unwrap();
        out.write_le(-1i64).unwrap();
        assert_eq!(&out[..4], &[4, 3, 2, 1]);
        assert_eq!(&out[4..], &[0xFF; 8]);
    }
}
