//! Big-endian TraCI storage encoding and command framing.
//!
//! A message is a `u32` total length (including itself) followed by
//! commands. A command starts with a one-byte length covering the whole
//! command, or a zero byte plus a `u32` length when it exceeds 255 bytes,
//! then the command id and its content.

use super::TraciError;
use super::constants::{TYPE_DOUBLE, TYPE_INTEGER, TYPE_STRING, TYPE_STRINGLIST};

/// Growable write buffer.
#[derive(Debug, Default, Clone)]
pub struct Storage {
    buf: Vec<u8>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_string(&mut self, s: &str) -> &mut Self {
        self.write_len(s.len());
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn write_string_list<T: AsRef<str>>(&mut self, items: &[T]) -> &mut Self {
        self.write_len(items.len());
        for item in items {
            self.write_string(item.as_ref());
        }
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    fn write_len(&mut self, len: usize) {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a received message body.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TraciError> {
        if self.remaining() < n {
            return Err(TraciError::Protocol(format!(
                "need {n} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, TraciError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32, TraciError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(b))
    }

    fn read_len(&mut self) -> Result<usize, TraciError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(b) as usize)
    }

    pub fn read_f64(&mut self) -> Result<f64, TraciError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(f64::from_be_bytes(b))
    }

    pub fn read_string(&mut self) -> Result<String, TraciError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, TraciError> {
        let n = self.read_len()?;
        let mut items = Vec::with_capacity(n.min(self.remaining() / 4));
        for _ in 0..n {
            items.push(self.read_string()?);
        }
        Ok(items)
    }

    /// Reads a type tag and fails unless it equals `expected`.
    pub fn expect_type(&mut self, expected: u8) -> Result<(), TraciError> {
        let actual = self.read_u8()?;
        if actual != expected {
            return Err(TraciError::UnexpectedType { expected, actual });
        }
        Ok(())
    }

    pub fn read_typed_f64(&mut self) -> Result<f64, TraciError> {
        self.expect_type(TYPE_DOUBLE)?;
        self.read_f64()
    }

    pub fn read_typed_i32(&mut self) -> Result<i32, TraciError> {
        self.expect_type(TYPE_INTEGER)?;
        self.read_i32()
    }

    pub fn read_typed_string(&mut self) -> Result<String, TraciError> {
        self.expect_type(TYPE_STRING)?;
        self.read_string()
    }

    pub fn read_typed_string_list(&mut self) -> Result<Vec<String>, TraciError> {
        self.expect_type(TYPE_STRINGLIST)?;
        self.read_string_list()
    }

    /// Reads one command header and returns `(command_id, content)`.
    pub fn read_command(&mut self) -> Result<(u8, Reader<'a>), TraciError> {
        let short = self.read_u8()?;
        let content_len = if short == 0 {
            let total = self.read_len()?;
            total.checked_sub(6).ok_or_else(|| {
                TraciError::Protocol(format!("extended command length {total} too short"))
            })?
        } else {
            usize::from(short).checked_sub(2).ok_or_else(|| {
                TraciError::Protocol(format!("command length {short} too short"))
            })?
        };
        let id = self.read_u8()?;
        let content = self.take(content_len)?;
        Ok((id, Reader::new(content)))
    }
}

/// Frames `content` as a single command with id `command`.
pub fn encode_command(command: u8, content: &[u8]) -> Vec<u8> {
    let short_len = 2 + content.len();
    let mut out = Storage::new();
    if let Ok(len) = u8::try_from(short_len) {
        out.write_u8(len);
    } else {
        let total = i32::try_from(short_len + 4).unwrap_or(i32::MAX);
        out.write_u8(0).write_i32(total);
    }
    out.write_u8(command).write_bytes(content);
    out.into_bytes()
}

/// Prefixes a sequence of framed commands with the message length.
pub fn encode_message(commands: &[Vec<u8>]) -> Vec<u8> {
    let body: usize = commands.iter().map(Vec::len).sum();
    let total = i32::try_from(body + 4).unwrap_or(i32::MAX);
    let mut out = Storage::new();
    out.write_i32(total);
    for cmd in commands {
        out.write_bytes(cmd);
    }
    out.into_bytes()
}
