//! Unsigned LEB128 length prefixes.
//!
//! Strings and type names carry their byte length in this encoding. Only
//! the unsigned coding is needed; every fixed-width integer in the format
//! is written as-is.
//!
//! See also: <https://en.wikipedia.org/wiki/LEB128>

use std::io;

use crate::binary::read::{Source, read_array};
use crate::error::{Error, Result, WireFormatKind};

// ceil(64 / 7) bytes at most
const MAX_BYTES: usize = 10;

pub(crate) fn write(out: &mut dyn io::Write, mut value: u64) -> Result<()> {
    let mut buf = [0u8; MAX_BYTES];
    let mut i = 0usize;
    while value >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        {
            buf[i] = (value as u8) | 0x80;
        }
        value >>= 7;
        i += 1;
    }

    #[allow(clippy::cast_possible_truncation)]
    {
        buf[i] = value as u8;
    }
    i += 1;

    Ok(out.write_all(&buf[..i])?)
}

pub(crate) fn read(src: &mut dyn Source) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0usize;
    loop {
        let [b] = read_array(src)?;
        if shift >= u64::BITS as usize {
            return Err(Error::wire(WireFormatKind::LengthOverflow, src.position()));
        }

        let part = u64::from(b & 0x7F);
        let shifted = part << shift;
        if shifted >> shift != part {
            return Err(Error::wire(WireFormatKind::LengthOverflow, src.position()));
        }

        value |= shifted;
        shift += 7;

        if b < 0x80 {
            return Ok(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::SliceSource;

    #[test]
    fn round_trip() {
        const VALUES: &[u64] = &[0, 1, 0x7F, 0x80, 500, 5000, 500_000_000, u64::MAX];
        let mut buf = Vec::new();
        for &v in VALUES {
            buf.clear();
            write(&mut buf, v).expect("encoding worked");

            let mut src = SliceSource::new(&buf);
            let r = read(&mut src).expect("decoding worked");
            assert_eq!(v, r, "must be equal");
            assert_eq!(src.remaining(), 0, "must consume the whole prefix");
        }
    }

    #[test]
    fn overflow_is_detected() {
        // 11 continuation bytes cannot fit a u64
        let buf = [0xFFu8; 11];
        let mut src = SliceSource::new(&buf);
        let err = read(&mut src).expect_err("must overflow");
        assert!(
            matches!(
                err,
                Error::WireFormat {
                    kind: WireFormatKind::LengthOverflow,
                    ..
                }
            ),
            "incorrect error kind: {err:?}"
        );
    }
}
