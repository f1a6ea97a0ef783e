//! Fixed-width integer codec with an explicit byte order.
//!
//! Archive metadata is little endian while the LZ frame header stores its
//! length big endian, so every call site names the order it needs instead of
//! relying on the host.

use crate::{EasyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Integer types with a fixed on-disk width.
pub trait FixedWidth: Sized + Copy {
    const WIDTH: usize;

    /// Append the encoded value to `out`.
    fn put(self, order: ByteOrder, out: &mut Vec<u8>);

    /// Parse a value from the front of `bytes`.
    fn get(bytes: &[u8], order: ByteOrder) -> Result<Self>;
}

macro_rules! fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn put(self, order: ByteOrder, out: &mut Vec<u8>) {
                    match order {
                        ByteOrder::LittleEndian => out.extend_from_slice(&self.to_le_bytes()),
                        ByteOrder::BigEndian => out.extend_from_slice(&self.to_be_bytes()),
                    }
                }

                fn get(bytes: &[u8], order: ByteOrder) -> Result<Self> {
                    let raw: [u8; std::mem::size_of::<$ty>()] = bytes
                        .get(..Self::WIDTH)
                        .and_then(|b| b.try_into().ok())
                        .ok_or(EasyError::TruncatedInput {
                            needed: Self::WIDTH,
                            available: bytes.len(),
                        })?;
                    Ok(match order {
                        ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                        ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                    })
                }
            }
        )*
    };
}

fixed_width!(u16, i16, u32, i32, u64, i64);

/// Append `value` to `out` in the given byte order.
pub fn write<T: FixedWidth>(out: &mut Vec<u8>, value: T, order: ByteOrder) {
    value.put(order, out);
}

/// Read a `T` from the front of `bytes`.
pub fn read<T: FixedWidth>(bytes: &[u8], order: ByteOrder) -> Result<T> {
    T::get(bytes, order)
}

/// Encode `value` into a fresh buffer.
pub fn to_bytes<T: FixedWidth>(value: T, order: ByteOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::WIDTH);
    value.put(order, &mut out);
    out
}
