//! WAV container assembly with backpatched size fields.
//!
//! The header is written with placeholder lengths before any sample is known;
//! [`finish_wav`] seeks back and overwrites the two size fields once the final
//! length is known. That requires a buffer that can overwrite already-written bytes
//! in place without truncating what follows, which is what [`SeekBuffer`]
//! provides.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Seek, SeekFrom, Write};

/// Canonical PCM WAV header size.
pub const HEADER_SIZE: u64 = 44;

const RIFF_LENGTH_OFFSET: u64 = 4;
const DATA_LENGTH_OFFSET: u64 = 40;

/// Growable byte buffer with a movable write cursor.
///
/// Writing at a position inside the buffer overwrites in place; writing past
/// the end extends it. Seeking past the end is allowed and zero-fills the gap
/// on the next write, matching file semantics.
#[derive(Default)]
pub struct SeekBuffer {
    buf: Vec<u8>,
    pos: usize,
}

impl SeekBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Copy the whole buffer, regardless of cursor position, into a writer.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<u64> {
        w.write_all(&self.buf)?;
        Ok(self.buf.len() as u64)
    }
}

impl Write for SeekBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.pos > self.buf.len() {
            self.buf.resize(self.pos, 0);
        }

        let end = self.pos + data.len();
        if end <= self.buf.len() {
            self.buf[self.pos..end].copy_from_slice(data);
        } else {
            let overlap = self.buf.len() - self.pos;
            self.buf[self.pos..].copy_from_slice(&data[..overlap]);
            self.buf.extend_from_slice(&data[overlap..]);
        }

        self.pos = end;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SeekBuffer {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let pos = match target {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => self.buf.len() as i64 + offset,
        };

        if pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }

        self.pos = pos as usize;
        Ok(self.pos as u64)
    }
}

/// Write the 44-byte PCM header for 16-bit mono audio at `sample_rate`.
///
/// The total-length and data-length fields are placeholders until
/// [`finish_wav`] backpatches them.
pub fn start_wav<W: Write>(w: &mut W, sample_rate: u32) -> io::Result<()> {
    // "RIFF", placeholder total length, "WAVEfmt ", format chunk size 16,
    // format tag 1 (PCM), 1 channel.
    w.write_all(b"RIFF\x24\xf0\xff\x7fWAVEfmt \x10\x00\x00\x00\x01\x00\x01\x00")?;

    w.write_u32::<LittleEndian>(sample_rate)?;
    // Byte rate: two bytes per sample, mono.
    w.write_u32::<LittleEndian>(sample_rate * 2)?;

    // Block align 2, 16 bits per sample, "data", placeholder data length.
    w.write_all(b"\x02\x00\x10\x00data\x00\xf0\xff\x7f")?;

    Ok(())
}

/// Append raw samples as little-endian 16-bit PCM.
pub fn append_samples<W: Write>(w: &mut W, samples: &[i16]) -> io::Result<()> {
    for &sample in samples {
        w.write_i16::<LittleEndian>(sample)?;
    }

    Ok(())
}

/// Backpatch both length fields from the final buffer size.
///
/// Leaves the cursor at the end, so further appends followed by another
/// finalize still produce a consistent container.
pub fn finish_wav<W: Write + Seek>(w: &mut W) -> io::Result<()> {
    let len = w.seek(SeekFrom::End(0))?;

    w.seek(SeekFrom::Start(RIFF_LENGTH_OFFSET))?;
    w.write_i32::<LittleEndian>(len as i32 - 8)?;

    w.seek(SeekFrom::Start(DATA_LENGTH_OFFSET))?;
    w.write_i32::<LittleEndian>(len as i32 - HEADER_SIZE as i32)?;

    w.seek(SeekFrom::End(0))?;
    Ok(())
}
