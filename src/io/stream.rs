//! Framed message container used for graph files and binary k-mer output.
//!
//! A stream is gzip-compressed and holds a sequence of frames:
//!
//! ```text
//! [u64 LE payload length][bincode payload] [u64 LE payload length][bincode payload] ...
//! ```
//!
//! End of input on a frame boundary ends the stream; anywhere else it is an
//! error. Concatenated gzip members are accepted, so streams can be joined
//! with `cat`.

use std::io::{self, BufReader, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::defaults::MAX_FRAME_LEN;
use crate::error::{GraphSetError, Result};

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;

const STREAM_BUFFER_SIZE: usize = 1 << 20;

/// Decode every frame of `reader` and hand each message to `handle`, in order.
///
/// Returns the number of messages decoded. Decoding stops at the first error,
/// whether it comes from the stream or from `handle`.
pub fn for_each_message<T, R, F>(reader: R, mut handle: F) -> Result<usize>
where
    T: DeserializeOwned,
    R: Read,
    F: FnMut(T) -> Result<()>,
{
    let mut input = BufReader::with_capacity(STREAM_BUFFER_SIZE, MultiGzDecoder::new(reader));
    let mut len_buf = [0u8; 8];
    let mut payload = Vec::new();
    let mut count = 0usize;

    while read_frame_len(&mut input, &mut len_buf)? {
        let len = u64::from_le_bytes(len_buf);
        if len > MAX_FRAME_LEN {
            return Err(GraphSetError::FrameTooLarge(len));
        }
        payload.resize(len as usize, 0);
        input.read_exact(&mut payload)?;
        let message: T = bincode::deserialize(&payload)?;
        handle(message)?;
        count += 1;
    }

    log::trace!("decoded {} stream frames", count);
    Ok(count)
}

// Fill `buf` with the next frame header. Ok(false) on a clean end of stream.
fn read_frame_len<R: Read>(input: &mut R, buf: &mut [u8; 8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Writes messages as frames into a gzip stream.
///
/// [`MessageWriter::finish`] must be called to terminate the gzip member;
/// dropping the writer finishes it on a best-effort basis.
pub struct MessageWriter<W: Write> {
    encoder: GzEncoder<W>,
    written: usize,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            encoder: GzEncoder::new(inner, Compression::default()),
            written: 0,
        }
    }

    pub fn write_message<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let payload = bincode::serialize(message)?;
        self.encoder
            .write_all(&(payload.len() as u64).to_le_bytes())?;
        self.encoder.write_all(&payload)?;
        self.written += 1;
        Ok(())
    }

    /// Number of messages written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.encoder.finish()?)
    }
}

/// Write every message of `messages` to `writer` as one complete stream.
pub fn write_messages<'a, T, W, I>(writer: W, messages: I) -> Result<W>
where
    T: Serialize + 'a,
    W: Write,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = MessageWriter::new(writer);
    for message in messages {
        out.write_message(message)?;
    }
    out.finish()
}
