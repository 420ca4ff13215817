//! Bounds-checked big-endian cursor over a byte slice.
//!
//! Every read either returns a value and advances, or fails with
//! [`UnexpectedEof`] and leaves the cursor untouched. Decoders map the EOF into
//! the error kind that fits their layer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnexpectedEof {
    pub offset: usize,
    pub wanted: usize,
    pub available: usize,
}

impl fmt::Display for UnexpectedEof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "needed {} bytes at offset {}, only {} available",
            self.wanted, self.offset, self.available
        )
    }
}

pub type ReadResult<T> = std::result::Result<T, UnexpectedEof>;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(UnexpectedEof {
                offset: self.pos,
                wanted: len,
                available: self.remaining(),
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> ReadResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> ReadResult<u8> {
        self.read_array::<1>().map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> ReadResult<u16> {
        self.read_array::<2>().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> ReadResult<u32> {
        self.read_array::<4>().map(u32::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> ReadResult<i32> {
        self.read_array::<4>().map(i32::from_be_bytes)
    }

    /// Skips padding so the cursor lands on a multiple of four, measured from
    /// the start of the slice.
    pub fn align4(&mut self) -> ReadResult<()> {
        let pad = (4 - self.pos % 4) % 4;
        self.skip(pad)
    }
}
