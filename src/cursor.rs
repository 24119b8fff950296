use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use binrw::prelude::*;
use binrw::Endian;

/// Run a closure at a remote offset and restore the stream position afterwards.
pub trait SeekTask: Seek {
    fn seek_task<R, F: FnOnce(&mut Self) -> BinResult<R>>(
        &mut self,
        seekto: SeekFrom,
        func: F,
    ) -> BinResult<R> {
        let pos = self.stream_position()?;
        self.seek(seekto)?;
        let res = func(self);
        self.seek(SeekFrom::Start(pos))?;
        res
    }
}

impl<S: Seek> SeekTask for S {}

/// A recorded placeholder position. Consumed by [`BundleCursor::patch_u32`],
/// so every mark is resolved exactly once.
#[derive(Debug)]
pub struct Mark(u64);

/// Seekable cursor over an owned byte buffer with a switchable byte order.
///
/// Reads past the end fail; writes grow the buffer. The cursor also counts
/// outstanding [`Mark`]s so a forgotten back-patch trips a debug assertion
/// instead of producing a silently broken archive.
#[derive(Debug)]
pub struct BundleCursor {
    stream: Cursor<Vec<u8>>,
    endian: Endian,
    open_marks: usize,
}

impl BundleCursor {
    pub fn new(endian: Endian) -> Self {
        Self {
            stream: Cursor::new(Vec::new()),
            endian,
            open_marks: 0,
        }
    }

    pub fn from_vec(data: Vec<u8>, endian: Endian) -> Self {
        Self {
            stream: Cursor::new(data),
            endian,
            open_marks: 0,
        }
    }

    pub const fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.stream.position()
    }

    pub fn skip(&mut self, count: i64) -> BinResult<u64> {
        Ok(self.stream.seek(SeekFrom::Current(count))?)
    }

    pub fn seek_to(&mut self, pos: u64) -> BinResult<u64> {
        Ok(self.stream.seek(SeekFrom::Start(pos))?)
    }

    pub fn read_u8(&mut self) -> BinResult<u8> {
        self.stream.read_ne()
    }

    pub fn read_u16(&mut self) -> BinResult<u16> {
        let endian = self.endian;
        self.stream.read_type(endian)
    }

    pub fn read_u32(&mut self) -> BinResult<u32> {
        let endian = self.endian;
        self.stream.read_type(endian)
    }

    pub fn read_u64(&mut self) -> BinResult<u64> {
        let endian = self.endian;
        self.stream.read_type(endian)
    }

    pub fn read_bytes(&mut self, count: usize) -> BinResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Bytes up to (not including) the next NUL terminator.
    pub fn read_cstring(&mut self) -> BinResult<String> {
        let mut bytes = vec![];
        loop {
            let byte: u8 = self.stream.read_ne()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(String::from(String::from_utf8_lossy(&bytes)))
    }

    pub fn write_u8(&mut self, value: u8) -> BinResult<()> {
        self.stream.write_ne(&value)
    }

    pub fn write_u16(&mut self, value: u16) -> BinResult<()> {
        let endian = self.endian;
        self.stream.write_type(&value, endian)
    }

    pub fn write_u32(&mut self, value: u32) -> BinResult<()> {
        let endian = self.endian;
        self.stream.write_type(&value, endian)
    }

    pub fn write_u64(&mut self, value: u64) -> BinResult<()> {
        let endian = self.endian;
        self.stream.write_type(&value, endian)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> BinResult<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    /// Zero-pad to the next multiple of `n`.
    pub fn align(&mut self, n: u64) -> BinResult<()> {
        while self.position() % n != 0 {
            self.write_u8(0)?;
        }
        Ok(())
    }

    /// Write a 32-bit zero placeholder and remember where it went.
    pub fn mark_u32(&mut self) -> BinResult<Mark> {
        let pos = self.position();
        self.write_u32(0)?;
        self.open_marks += 1;
        Ok(Mark(pos))
    }

    /// Resolve a placeholder without disturbing the current position.
    pub fn patch_u32(&mut self, mark: Mark, value: u32) -> BinResult<()> {
        let endian = self.endian;
        self.seek_task(SeekFrom::Start(mark.0), |cur| {
            cur.stream.write_type(&value, endian)
        })?;
        self.open_marks -= 1;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        debug_assert_eq!(self.open_marks, 0, "unresolved back-patch marks");
        self.stream.into_inner()
    }
}

impl Read for BundleCursor {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for BundleCursor {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl Seek for BundleCursor {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.stream.seek(pos)
    }
}
