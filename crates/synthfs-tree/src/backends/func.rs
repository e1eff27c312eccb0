//! Callback backend for command files.

use std::fmt;

use super::{Device, Writer};
use crate::error::{TreeError, TreeResult};

/// Function receiving every write as `(data, offset)`.
pub type WriteFn = Box<dyn FnMut(&[u8], i64) -> TreeResult<usize> + Send>;

/// A write-only backend that forwards writes to a user function.
///
/// It has no length: size is always zero and truncate does nothing, so a
/// shell `echo start > command` works without special casing.
#[derive(Default)]
pub struct Func {
    f: Option<WriteFn>,
}

impl Func {
    pub fn new(f: impl FnMut(&[u8], i64) -> TreeResult<usize> + Send + 'static) -> Self {
        Self {
            f: Some(Box::new(f)),
        }
    }

    /// A backend with no function attached. Writes fail until replaced.
    pub fn none() -> Self {
        Self { f: None }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("f", &self.f.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Device for Func {
    fn size(&self) -> TreeResult<u64> {
        Ok(0)
    }
}

impl Writer for Func {
    fn write_at(&mut self, data: &[u8], offset: i64) -> TreeResult<usize> {
        match self.f.as_mut() {
            Some(f) => f(data, offset),
            None => Err(TreeError::device(TreeError::other("device not ready"))),
        }
    }

    fn truncate(&mut self, _size: i64) -> TreeResult<()> {
        Ok(())
    }
}
