//! Growable byte buffer backend.

use super::{Device, ReadOutcome, Reader, Writer, read_slice};
use crate::error::{TreeError, TreeResult};

/// A read-write backend over an owned, growable byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes {
    data: Vec<u8>,
}

impl Bytes {
    /// Create a buffer holding `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Current contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Current length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Device for Bytes {
    fn size(&self) -> TreeResult<u64> {
        Ok(self.data.len() as u64)
    }
}

impl Reader for Bytes {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> TreeResult<ReadOutcome> {
        read_slice(&self.data, buf, offset)
    }
}

impl Writer for Bytes {
    /// Everything from `offset` on is replaced by `data`. Writing past the
    /// end leaves a zero-filled gap.
    fn write_at(&mut self, data: &[u8], offset: i64) -> TreeResult<usize> {
        if offset < 0 {
            return Err(TreeError::invalid_input(format!("negative offset {offset}")));
        }
        let wanted = offset.saturating_add_unsigned(data.len() as u64);
        let too_large = || TreeError::FileTooLarge(wanted);
        let offset = usize::try_from(offset).map_err(|_| too_large())?;
        let end = offset.checked_add(data.len()).ok_or_else(too_large)?;

        self.data.truncate(offset);
        self.data
            .try_reserve(end - self.data.len())
            .map_err(|_| too_large())?;
        self.data.resize(offset, 0);
        self.data.extend_from_slice(data);
        Ok(data.len())
    }

    /// Shrink to `size` bytes. The discarded tail is zeroed first.
    fn truncate(&mut self, size: i64) -> TreeResult<()> {
        if size < 0 || size as u64 > self.data.len() as u64 {
            return Err(TreeError::invalid_input(format!(
                "truncate to {size} of {} byte buffer",
                self.data.len()
            )));
        }
        let size = size as usize;
        self.data[size..].fill(0);
        self.data.truncate(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(b: &Bytes) -> Vec<u8> {
        let mut buf = vec![0u8; b.len() + 16];
        match b.read_at(&mut buf, 0) {
            Ok(out) => buf[..out.n].to_vec(),
            Err(TreeError::EndOfData) => Vec::new(),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_partial_read_reports_eof_at_end() {
        let b = Bytes::new("hello world");
        let mut buf = [0u8; 5];

        let out = b.read_at(&mut buf, 0).unwrap();
        assert_eq!(out, ReadOutcome { n: 5, eof: false });
        assert_eq!(&buf, b"hello");

        let out = b.read_at(&mut buf, 6).unwrap();
        assert_eq!(out, ReadOutcome { n: 5, eof: true });
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_read_at_or_past_end() {
        let b = Bytes::new("abc");
        let mut buf = [0u8; 4];
        assert!(matches!(b.read_at(&mut buf, 3), Err(TreeError::EndOfData)));
        assert!(matches!(b.read_at(&mut buf, 10), Err(TreeError::EndOfData)));
        assert_eq!(b.read_at(&mut [], 10).unwrap().n, 0);
    }

    #[test]
    fn test_append_at_end() {
        let mut b = Bytes::new("with data already here");
        let n = b.write_at(b"... more\n", b.len() as i64).unwrap();
        assert_eq!(n, 9);
        assert_eq!(read_all(&b), b"with data already here... more\n");
    }

    #[test]
    fn test_write_replaces_tail() {
        let mut b = Bytes::new("hello world");
        b.write_at(b"J", 0).unwrap();
        assert_eq!(b.as_slice(), b"J");
    }

    #[test]
    fn test_write_past_end_zero_fills_gap() {
        let mut b = Bytes::new("ab");
        b.write_at(b"xy", 5).unwrap();
        assert_eq!(read_all(&b), b"ab\0\0\0xy");
    }

    #[test]
    fn test_write_at_huge_offset_fails() {
        let mut b = Bytes::new("abc");
        let err = b.write_at(b"x", 1 << 62).unwrap_err();
        assert!(matches!(err, TreeError::FileTooLarge(_)));
        assert_eq!(err.errno(), libc::EFBIG);
        assert_eq!(b.as_slice(), b"abc");

        assert!(b.write_at(b"x", i64::MAX).is_err());
        assert_eq!(b.as_slice(), b"abc");
    }

    #[test]
    fn test_truncate_then_regrow_has_no_stale_data() {
        let mut b = Bytes::new("secret!!");
        b.truncate(2).unwrap();
        assert_eq!(b.as_slice(), b"se");

        b.write_at(b"!", 7).unwrap();
        assert_eq!(read_all(&b), b"se\0\0\0\0\0!");
    }

    #[test]
    fn test_truncate_bounds() {
        let mut b = Bytes::new("abc");
        assert!(matches!(b.truncate(-1), Err(TreeError::InvalidInput(_))));
        assert!(matches!(b.truncate(4), Err(TreeError::InvalidInput(_))));
        b.truncate(3).unwrap();
        b.truncate(0).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn test_negative_offsets_rejected() {
        let mut b = Bytes::new("abc");
        assert!(b.write_at(b"x", -1).is_err());
        assert!(b.read_at(&mut [0u8; 1], -1).is_err());
    }
}
