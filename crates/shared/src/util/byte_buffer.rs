// ByteBuffer - Binary level data serialization
// Little-endian writer used by every level layout, with a read cursor for inspection

use byteorder::{ByteOrder, LittleEndian};
use std::io;

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "ByteBuffer read past end")
}

/// A growable byte buffer for building binary level files.
/// All multi-byte values are little-endian.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl ByteBuffer {
    /// Create a new empty ByteBuffer
    pub fn new() -> Self {
        ByteBuffer {
            data: Vec::new(),
            read_pos: 0,
        }
    }

    /// Wrap existing bytes for reading
    pub fn from_bytes(data: Vec<u8>) -> Self {
        ByteBuffer { data, read_pos: 0 }
    }

    /// Get the current size of the buffer
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the raw contents
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return the bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    // ---- Write operations (append) ----

    /// Append raw bytes
    pub fn append(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Append `count` zero bytes
    pub fn append_zeros(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Write a four character tag such as `b"TEX\0"`
    pub fn write_tag(&mut self, tag: &[u8; 4]) {
        self.data.extend_from_slice(tag);
    }

    pub fn write_u8(&mut self, val: u8) {
        self.data.push(val);
    }

    pub fn write_i8(&mut self, val: i8) {
        self.data.push(val as u8);
    }

    pub fn write_bool(&mut self, val: bool) {
        self.data.push(val as u8);
    }

    pub fn write_u16(&mut self, val: u16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_u16(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_i16(&mut self, val: i16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_i16(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_u32(&mut self, val: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_i32(&mut self, val: i32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_f32(&mut self, val: f32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_f32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    /// Write a u32 byte length followed by the UTF-8 bytes (no terminator)
    pub fn write_sized_string(&mut self, val: &str) {
        self.write_u32(val.len() as u32);
        self.data.extend_from_slice(val.as_bytes());
    }

    /// Overwrite a previously written u32, e.g. a size prefix reserved with `write_u32(0)`
    pub fn patch_u32(&mut self, at: usize, val: u32) -> io::Result<()> {
        let slot = self.data.get_mut(at..at + 4).ok_or_else(eof)?;
        LittleEndian::write_u32(slot, val);
        Ok(())
    }

    // ---- Read operations ----

    fn take(&mut self, count: usize) -> io::Result<&[u8]> {
        let end = self.read_pos.checked_add(count).ok_or_else(eof)?;
        if end > self.data.len() {
            return Err(eof());
        }
        let slice = &self.data[self.read_pos..end];
        self.read_pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read N bytes
    pub fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    /// Skip N bytes in the read position
    pub fn read_skip(&mut self, count: usize) {
        self.read_pos = (self.read_pos + count).min(self.data.len());
    }
}

impl std::fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ByteBuffer(size={}, rpos={})", self.size(), self.read_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut buf = ByteBuffer::new();
        buf.write_u16(0x1234);
        buf.write_i32(-2);
        assert_eq!(buf.contents(), &[0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_read_mixed() {
        let mut buf = ByteBuffer::new();
        buf.write_tag(b"TEX\0");
        buf.write_i16(-1024);
        buf.write_f32(0.5);
        assert_eq!(buf.read_bytes(4).unwrap(), b"TEX\0");
        assert_eq!(buf.read_i16().unwrap(), -1024);
        assert_eq!(buf.read_f32().unwrap(), 0.5);
        assert!(buf.read_u8().is_err());
    }

    #[test]
    fn test_patch_size_prefix() {
        let mut buf = ByteBuffer::new();
        let at = buf.size();
        buf.write_u32(0);
        buf.append(&[1, 2, 3]);
        buf.patch_u32(at, 3).unwrap();
        assert_eq!(buf.read_u32().unwrap(), 3);
        assert!(buf.patch_u32(5, 0).is_err());
    }

    #[test]
    fn test_sized_string_and_zeros() {
        let mut buf = ByteBuffer::new();
        buf.write_sized_string("Lara");
        buf.append_zeros(3);
        assert_eq!(buf.size(), 4 + 4 + 3);
        assert_eq!(buf.read_u32().unwrap(), 4);
        assert_eq!(buf.read_bytes(4).unwrap(), b"Lara");
    }
}
