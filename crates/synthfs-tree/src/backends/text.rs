//! Immutable string backend.

use std::borrow::Cow;

use super::{Device, ReadOutcome, Reader, read_slice};
use crate::error::TreeResult;

/// A read-only backend over a fixed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(Cow<'static, str>);

impl Text {
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Device for Text {
    fn size(&self) -> TreeResult<u64> {
        Ok(self.0.len() as u64)
    }
}

impl Reader for Text {
    fn read_at(&self, buf: &mut [u8], offset: i64) -> TreeResult<ReadOutcome> {
        read_slice(self.0.as_bytes(), buf, offset)
    }
}
