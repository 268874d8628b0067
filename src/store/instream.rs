//! Read-side stream over an immutable file region.

use std::fmt;
use std::io;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{IndexError, Result};
use crate::util::varint;

/// Shared, immutable file content (a memory map or an owned buffer).
pub type FileBytes = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// A cursor over a window of file content.
///
/// Cloning is cheap: clones share the underlying bytes but keep independent
/// positions, so every reader component can own its own stream.
#[derive(Clone)]
pub struct InStream {
    filename: String,
    data: FileBytes,
    offset: usize,
    len: usize,
    pos: usize,
}

impl fmt::Debug for InStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InStream")
            .field("filename", &self.filename)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}

impl InStream {
    /// Wrap the whole of `data`.
    pub fn new<S: Into<String>>(filename: S, data: FileBytes) -> Self {
        let len = (*data).as_ref().len();
        InStream {
            filename: filename.into(),
            data,
            offset: 0,
            len,
            pos: 0,
        }
    }

    /// Wrap an owned buffer.
    pub fn from_vec<S: Into<String>>(filename: S, bytes: Vec<u8>) -> Self {
        InStream::new(filename, Arc::new(bytes))
    }

    /// Open a sub-window of this stream as a new stream positioned at 0.
    pub fn reopen<S: Into<String>>(&self, filename: S, offset: u64, len: u64) -> Result<InStream> {
        let filename = filename.into();
        let end = offset.checked_add(len);
        if end.is_none_or(|end| end > self.len as u64) {
            return Err(IndexError::format(format!(
                "Can't reopen '{filename}' at {offset} with length {len}: parent '{}' has length {}",
                self.filename, self.len
            )));
        }
        Ok(InStream {
            filename,
            data: Arc::clone(&self.data),
            offset: self.offset + offset as usize,
            len: len as usize,
            pos: 0,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn length(&self) -> u64 {
        self.len as u64
    }

    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    pub fn bytes_remaining(&self) -> u64 {
        (self.len - self.pos) as u64
    }

    pub fn seek(&mut self, target: u64) -> Result<()> {
        if target > self.len as u64 {
            return Err(self.eof_error(target as usize));
        }
        self.pos = target as usize;
        Ok(())
    }

    /// The whole window as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &(*self.data).as_ref()[self.offset..self.offset + self.len]
    }

    fn eof_error(&self, wanted: usize) -> IndexError {
        IndexError::io_at(
            self.filename.clone(),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Read past EOF ({wanted} > {})", self.len),
            ),
        )
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.pos + n;
        if end > self.len {
            return Err(self.eof_error(end));
        }
        let start = self.offset + self.pos;
        self.pos = end;
        Ok(&(*self.data).as_ref()[start..start + n])
    }

    fn remaining_slice(&self) -> &[u8] {
        &(*self.data).as_ref()[self.offset + self.pos..self.offset + self.len]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// Read a compressed u32.
    pub fn read_c32(&mut self) -> Result<u32> {
        let (value, read) = varint::decode_u32(self.remaining_slice())
            .map_err(|e| IndexError::format(format!("{e} in '{}'", self.filename)))?;
        self.pos += read;
        Ok(value)
    }

    /// Read a compressed u64.
    pub fn read_c64(&mut self) -> Result<u64> {
        let (value, read) = varint::decode_u64(self.remaining_slice())
            .map_err(|e| IndexError::format(format!("{e} in '{}'", self.filename)))?;
        self.pos += read;
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let src = self.take(buf.len())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    /// Read a c32 length followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_c32()? as usize;
        let filename = self.filename.clone();
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| IndexError::format(format!("Malformed UTF-8 in '{filename}'")))
    }

    /// Read a c32 length followed by that many raw bytes.
    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.read_c32()? as usize;
        self.read_bytes(len)
    }
}
