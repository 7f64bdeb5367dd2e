// ABOUTME: Length-prefixed binary codec shared by SSH key blobs and protocol messages.
// ABOUTME: ByteWriter appends to a growable buffer; ByteReader consumes with underflow checks.

use crate::error::{ProtoError, Result};
use rsa::BigUint;

/// Writer for the length-prefixed wire format.
///
/// Every variable-length field is written as a 32-bit big-endian length
/// followed by the raw bytes. Strings are UTF-8. An absent string and an
/// empty string both encode as length zero; the distinction is lost on the
/// wire, which matches the deployed protocol.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a 32-bit unsigned integer, big-endian, no length prefix.
    pub fn write_int(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a UTF-8 string with a length prefix.
    pub fn write_string(&mut self, value: &str) {
        self.write_binary_string(value.as_bytes());
    }

    /// Write raw bytes with a length prefix.
    pub fn write_binary_string(&mut self, data: &[u8]) {
        self.write_int(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    /// Write an unsigned big integer with a length prefix.
    ///
    /// The magnitude is big-endian with a leading zero byte added when the
    /// top bit is set, so the bytes also parse as a non-negative
    /// two's-complement number.
    pub fn write_big_integer(&mut self, value: &BigUint) {
        let mut bytes = value.to_bytes_be();
        if bytes[0] & 0x80 != 0 {
            bytes.insert(0, 0);
        }
        self.write_binary_string(&bytes);
    }

    /// Write a boolean as a single byte, 1 for true and 0 for false.
    pub fn write_boolean(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Append raw bytes with no length prefix.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential reader over a fixed buffer in the length-prefixed wire format.
///
/// Every read checks the declared length against the bytes remaining and
/// fails with [`ProtoError::Underflow`] before consuming anything, so a
/// truncated buffer never yields partial data.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(ProtoError::Underflow {
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a 32-bit unsigned integer, big-endian.
    pub fn read_int(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().expect("4 bytes")))
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected, matching
    /// the lenient decoding of other SDKs for this protocol.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_int()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-prefixed byte string.
    pub fn read_binary_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_int()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a length-prefixed unsigned big integer.
    ///
    /// The on-wire values this protocol carries (RSA exponents and moduli)
    /// are always positive, so the bytes are interpreted as a plain
    /// big-endian magnitude; a sign-padding zero byte is harmless.
    pub fn read_big_integer(&mut self) -> Result<BigUint> {
        let len = self.read_int()? as usize;
        Ok(BigUint::from_bytes_be(self.take(len)?))
    }

    /// Read a boolean; byte value 1 is true, anything else is false.
    pub fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] == 1)
    }
}
