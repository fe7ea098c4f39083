// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet parsing traits

use std::num::NonZero;

/// A header which can be parsed from the front of a buffer.
pub trait Parse: Sized {
    /// The error returned when the buffer holds an invalid header.
    type Error: core::error::Error;
    /// Parse from a buffer.
    ///
    /// Returns the parsed value and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns an error in the event that parsing fails.
    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>>;
}

/// A header which can be written to the front of a buffer.
pub trait DeParse {
    /// The error returned when serialization fails for reasons other than length.
    type Error;

    /// The number of bytes [`DeParse::deparse`] will write.
    fn size(&self) -> NonZero<usize>;
    /// Write a data structure (e.g., a packet header) to a buffer.
    ///
    /// Returns the number of bytes written in the event of success.
    ///
    /// # Errors
    ///
    /// Will return an error if there is not enough space in the buffer
    /// or if serialization fails from some other (implementation-dependent) reason.
    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>>;
}

/// The buffer was shorter than the header requires.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("expected at least {expected} bytes, got {actual}")]
pub struct LengthError {
    pub(crate) expected: NonZero<usize>,
    pub(crate) actual: usize,
}

impl LengthError {
    /// Check that `buf` holds at least `expected` bytes.
    pub(crate) fn check(expected: NonZero<usize>, buf: &[u8]) -> Result<(), LengthError> {
        if buf.len() < expected.get() {
            return Err(LengthError {
                expected,
                actual: buf.len(),
            });
        }
        Ok(())
    }

    /// Minimum number of bytes which were required.
    #[must_use]
    pub fn expected(&self) -> NonZero<usize> {
        self.expected
    }
}

/// Sequential reader over a frame, consuming one header at a time.
#[derive(Debug)]
pub(crate) struct Reader<'buf> {
    inner: &'buf [u8],
    consumed: usize,
}

impl<'buf> Reader<'buf> {
    pub(crate) fn new(buf: &'buf [u8]) -> Reader<'buf> {
        Reader {
            inner: buf,
            consumed: 0,
        }
    }

    pub(crate) fn parse<T: Parse>(&mut self) -> Result<T, ParseError<T::Error>> {
        let (value, len) = T::parse(&self.inner[self.consumed..])?;
        self.consumed += len.get();
        Ok(value)
    }

    /// Restrict the unread part of the buffer to at most `len` bytes.
    ///
    /// Used to strip link layer padding once the network header tells us the real length.
    pub(crate) fn truncate(&mut self, len: usize) {
        let end = self.consumed.saturating_add(len).min(self.inner.len());
        self.inner = &self.inner[..end];
    }

    pub(crate) fn remaining(&self) -> &'buf [u8] {
        &self.inner[self.consumed..]
    }
}

/// Sequential writer into a pre-sized buffer.
#[derive(Debug)]
pub(crate) struct Writer<'buf> {
    inner: &'buf mut [u8],
    written: usize,
}

impl<'buf> Writer<'buf> {
    pub(crate) fn new(buf: &'buf mut [u8]) -> Writer<'buf> {
        Writer {
            inner: buf,
            written: 0,
        }
    }

    pub(crate) fn write<T: DeParse>(&mut self, val: &T) -> Result<(), DeParseError<T::Error>> {
        let len = val.deparse(&mut self.inner[self.written..])?;
        self.written += len.get();
        Ok(())
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LengthError> {
        let remaining = self.inner.len() - self.written;
        if let Some(expected) = NonZero::new(bytes.len())
            && remaining < expected.get()
        {
            return Err(LengthError {
                expected,
                actual: remaining,
            });
        }
        self.inner[self.written..self.written + bytes.len()].copy_from_slice(bytes);
        self.written += bytes.len();
        Ok(())
    }
}

/// Errors which may occur while parsing a header.
#[derive(thiserror::Error, Debug)]
pub enum ParseError<E: core::error::Error> {
    /// Buffer too short.
    #[error(transparent)]
    Length(LengthError),
    /// Buffer long enough but contents are not a legal header.
    #[error(transparent)]
    Invalid(E),
}

/// Errors which may occur while writing a header.
#[derive(thiserror::Error, Debug)]
pub enum DeParseError<E> {
    /// Buffer too short.
    #[error(transparent)]
    Length(LengthError),
    /// The header cannot be represented on the wire.
    #[error("header can not be serialized")]
    Invalid(E),
}

/// Write `bytes` as a header's wire form, checking length first.
pub(crate) fn deparse_bytes<E>(
    bytes: &[u8],
    buf: &mut [u8],
) -> Result<NonZero<usize>, DeParseError<E>> {
    let size = NonZero::new(bytes.len()).unwrap_or_else(|| unreachable!());
    LengthError::check(size, buf).map_err(DeParseError::Length)?;
    buf[..size.get()].copy_from_slice(bytes);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_truncate_strips_padding() {
        let buf = [1u8, 2, 3, 4, 0, 0];
        let mut reader = Reader::new(&buf);
        reader.truncate(4);
        assert_eq!(reader.remaining(), &[1, 2, 3, 4]);
    }

    #[test]
    fn writer_rejects_overflow() {
        let mut buf = [0u8; 2];
        let mut writer = Writer::new(&mut buf);
        assert!(writer.write_bytes(&[1]).is_ok());
        let err = writer.write_bytes(&[2, 3]).unwrap_err();
        assert_eq!(err.expected().get(), 2);
        assert_eq!(err.actual, 1);
    }
}
