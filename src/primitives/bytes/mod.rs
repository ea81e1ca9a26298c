#![forbid(unsafe_code)]
//! Encoding and buffer utilities shared by records, trackers and blobs.

pub mod fixed {
    //! Big-endian accessors at fixed offsets inside a record buffer.

    use core::convert::TryInto;

    /// Writes `v` big-endian at `off`.
    pub fn put_i64(dst: &mut [u8], off: usize, v: i64) {
        dst[off..off + 8].copy_from_slice(&v.to_be_bytes());
    }

    /// Reads a big-endian i64 at `off`.
    pub fn get_i64(src: &[u8], off: usize) -> i64 {
        let bytes: [u8; 8] = src[off..off + 8]
            .try_into()
            .unwrap_or_else(|_| panic!("i64 field at {off} outside record"));
        i64::from_be_bytes(bytes)
    }

    /// Writes `v` big-endian at `off`.
    pub fn put_i32(dst: &mut [u8], off: usize, v: i32) {
        dst[off..off + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Reads a big-endian i32 at `off`.
    pub fn get_i32(src: &[u8], off: usize) -> i32 {
        let bytes: [u8; 4] = src[off..off + 4]
            .try_into()
            .unwrap_or_else(|_| panic!("i32 field at {off} outside record"));
        i32::from_be_bytes(bytes)
    }

    /// Writes `v` big-endian at `off`.
    pub fn put_u32(dst: &mut [u8], off: usize, v: u32) {
        dst[off..off + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Reads a big-endian u32 at `off`.
    pub fn get_u32(src: &[u8], off: usize) -> u32 {
        get_i32(src, off) as u32
    }
}

pub mod buf {
    //! A slice-backed cursor that reports truncation instead of panicking.

    use crate::types::{GraphError, Result};

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        buf: &'a [u8],
        off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Bytes left to read.
        pub fn remaining(&self) -> usize {
            self.buf.len() - self.off
        }

        /// Current read offset.
        pub fn offset(&self) -> usize {
            self.off
        }

        /// Takes the next `n` bytes, advancing the offset.
        pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
            if n > self.remaining() {
                return Err(GraphError::Corruption("blob truncated"));
            }
            let out = &self.buf[self.off..self.off + n];
            self.off += n;
            Ok(out)
        }

        /// Reads one byte.
        pub fn u8(&mut self) -> Result<u8> {
            Ok(self.take(1)?[0])
        }

        /// Reads a big-endian u32.
        pub fn u32(&mut self) -> Result<u32> {
            let mut arr = [0u8; 4];
            arr.copy_from_slice(self.take(4)?);
            Ok(u32::from_be_bytes(arr))
        }

        /// Reads a big-endian i32.
        pub fn i32(&mut self) -> Result<i32> {
            Ok(self.u32()? as i32)
        }

        /// Reads a big-endian i64.
        pub fn i64(&mut self) -> Result<i64> {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(self.take(8)?);
            Ok(i64::from_be_bytes(arr))
        }

        /// Reads a big-endian IEEE-754 double.
        pub fn f64(&mut self) -> Result<f64> {
            Ok(f64::from_bits(self.i64()? as u64))
        }

        /// Reads a u32-length-prefixed UTF-8 string.
        pub fn str(&mut self) -> Result<&'a str> {
            let len = self.u32()? as usize;
            let body = self.take(len)?;
            core::str::from_utf8(body).map_err(|_| GraphError::Corruption("string not UTF-8"))
        }
    }
}
