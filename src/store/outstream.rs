//! Write-side stream with position tracking.

use std::fmt;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{IndexError, Result};
use crate::store::instream::InStream;
use crate::util::varint;

/// Destination of an [`OutStream`].
pub trait FileSink: Write + Send + fmt::Debug {
    /// Push written bytes to durable storage.
    fn sync(&mut self) -> io::Result<()>;
}

/// Sequential binary writer.
pub struct OutStream {
    path: String,
    sink: Box<dyn FileSink>,
    pos: u64,
    closed: bool,
}

impl fmt::Debug for OutStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutStream")
            .field("path", &self.path)
            .field("pos", &self.pos)
            .field("closed", &self.closed)
            .finish()
    }
}

impl OutStream {
    pub fn new<S: Into<String>>(path: S, sink: Box<dyn FileSink>) -> Self {
        OutStream {
            path: path.into(),
            sink,
            pos: 0,
            closed: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current file position.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            return Err(IndexError::contract(format!(
                "Write to closed stream '{}'",
                self.path
            )));
        }
        Ok(())
    }

    fn io_err(&self, e: io::Error) -> IndexError {
        IndexError::io_at(self.path.clone(), e)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_closed()?;
        self.sink.write_all(bytes).map_err(|e| self.io_err(e))?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.check_closed()?;
        self.sink
            .write_i64::<BigEndian>(value)
            .map_err(|e| self.io_err(e))?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a compressed u32.
    pub fn write_c32(&mut self, value: u32) -> Result<()> {
        self.write_c64(value as u64)
    }

    /// Write a compressed u64.
    pub fn write_c64(&mut self, value: u64) -> Result<()> {
        let mut buf = Vec::with_capacity(varint::MAX_C64_BYTES);
        varint::encode_into(value, &mut buf);
        self.write_bytes(&buf)
    }

    /// Write a c32 length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.write_blob(text.as_bytes())
    }

    /// Write a c32 length followed by the raw bytes.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            IndexError::invalid_argument(format!("Blob of {} bytes is too large", bytes.len()))
        })?;
        self.write_c32(len)?;
        self.write_bytes(bytes)
    }

    /// Copy the whole content of `instream` into this stream.
    pub fn absorb(&mut self, instream: &InStream) -> Result<()> {
        self.write_bytes(instream.as_slice())
    }

    /// Pad with zero bytes until the position is a multiple of `modulus`.
    pub fn align(&mut self, modulus: u64) -> Result<u64> {
        if modulus == 0 {
            return Err(IndexError::invalid_argument("Alignment modulus must be non-zero"));
        }
        let rem = self.pos % modulus;
        if rem != 0 {
            let pad = vec![0u8; (modulus - rem) as usize];
            self.write_bytes(&pad)?;
        }
        Ok(self.pos)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(|e| self.io_err(e))
    }

    /// Flush, sync and close the stream. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.sink.flush().map_err(|e| self.io_err(e))?;
        self.sink.sync().map_err(|e| self.io_err(e))?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for OutStream {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!("Failed to close '{}' on drop: {e}", self.path);
            }
        }
    }
}
