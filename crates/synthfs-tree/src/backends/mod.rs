//! Data backends.
//!
//! A file node delegates its content to exactly one backend. Backends
//! implement the capability traits their node variant needs:
//!
//! - [`Reader`] for read-only files
//! - [`Writer`] for write-only files
//! - [`ReadWriter`] (both) for read-write files
//!
//! Offsets and truncate lengths are signed so that malformed requests can be
//! rejected with `InvalidInput` rather than wrapping.

mod bytes;
mod func;
mod text;

pub use bytes::Bytes;
pub use func::{Func, WriteFn};
pub use text::Text;

use crate::error::TreeResult;

/// Result of a positioned read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the buffer.
    pub n: usize,
    /// The read reached the end of the backing data.
    pub eof: bool,
}

/// Capabilities shared by every backend.
pub trait Device: Send {
    /// Current length of the backing data.
    fn size(&self) -> TreeResult<u64>;

    /// Make written data durable. Called on flush.
    fn sync(&mut self) -> TreeResult<()> {
        Ok(())
    }

    /// Release resources. Called when the kernel releases the handle.
    fn close(&mut self) -> TreeResult<()> {
        Ok(())
    }
}

/// A backend that can be read at an offset.
pub trait Reader: Device {
    /// Read into `buf` starting at `offset`.
    ///
    /// Returns `Err(TreeError::EndOfData)` when `offset` is at or past the
    /// end. A read that stops at the end reports `eof` alongside its bytes.
    fn read_at(&self, buf: &mut [u8], offset: i64) -> TreeResult<ReadOutcome>;
}

/// A backend that can be written at an offset.
pub trait Writer: Device {
    /// Write `data` at `offset`, returning the number of bytes accepted.
    fn write_at(&mut self, data: &[u8], offset: i64) -> TreeResult<usize>;

    /// Change the length of the backing data.
    fn truncate(&mut self, size: i64) -> TreeResult<()>;
}

/// A backend that is both [`Reader`] and [`Writer`].
pub trait ReadWriter: Reader + Writer {}

impl<T: Reader + Writer + ?Sized> ReadWriter for T {}

/// Shared read path for in-memory backends.
fn read_slice(src: &[u8], buf: &mut [u8], offset: i64) -> TreeResult<ReadOutcome> {
    if offset < 0 {
        return Err(crate::error::TreeError::invalid_input(format!(
            "negative offset {offset}"
        )));
    }
    if buf.is_empty() {
        return Ok(ReadOutcome { n: 0, eof: false });
    }
    let offset = offset as usize;
    if offset >= src.len() {
        return Err(crate::error::TreeError::EndOfData);
    }
    let n = buf.len().min(src.len() - offset);
    buf[..n].copy_from_slice(&src[offset..offset + n]);
    Ok(ReadOutcome {
        n,
        eof: offset + n == src.len(),
    })
}
