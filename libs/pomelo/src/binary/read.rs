//! Byte sources for the binary deserializer.
//!
//! Every source tracks its position so decode errors can report the byte
//! offset at which they were detected.

use std::io;

use crate::error::{Error, Result, WireFormatKind};

/// A positioned source of bytes.
pub(crate) trait Source {
    /// Fills `buf` completely or fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// The number of bytes consumed so far.
    fn position(&self) -> u64;
}

/// Reads a fixed number of bytes as an array.
pub(crate) fn read_array<const N: usize>(src: &mut dyn Source) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    src.read_exact(&mut buf)?;
    Ok(buf)
}

/// A source over an in-memory slice.
pub(crate) struct SliceSource<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The number of unread bytes.
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl Source for SliceSource<'_> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let Some(data) = self.buf[self.pos..].get(..buf.len()) else {
            return Err(Error::wire(WireFormatKind::Truncated, self.position()));
        };
        buf.copy_from_slice(data);
        self.pos += buf.len();
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }
}

/// A source over an [`io::Read`].
pub(crate) struct IoSource<'a> {
    inner: &'a mut dyn io::Read,
    pos: u64,
}

impl<'a> IoSource<'a> {
    pub(crate) fn new(inner: &'a mut dyn io::Read) -> Self {
        Self { inner, pos: 0 }
    }
}

impl Source for IoSource<'_> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::wire(WireFormatKind::Truncated, self.pos))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn position(&self) -> u64 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reports_offset() {
        let mut src = SliceSource::new(&[1, 2, 3]);
        let _: [u8; 2] = read_array(&mut src).expect("enough bytes");
        let err = read_array::<2>(&mut src).expect_err("past the end");
        match err {
            Error::WireFormat {
                kind: WireFormatKind::Truncated,
                offset,
            } => assert_eq!(offset, 2, "offset of the failed read"),
            other => panic!("incorrect error kind: {other:?}"),
        }
    }
}
