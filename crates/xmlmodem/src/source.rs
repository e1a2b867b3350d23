//! Buffered, forward-only byte source backing the reader.
//!
//! The reader never touches the underlying `Read` directly; it asks this
//! adapter to guarantee that a window of bytes is buffered (`request`), scans
//! the window for terminator bytes (`index_of`, `index_of_element`, `find`),
//! and then consumes it (`skip`, `read_utf8`). All offsets are relative to
//! the current read position.

use std::io::{self, Read};

use memchr::memchr;

/// Refill granularity for the underlying reader.
const CHUNK: usize = 8 * 1024;

/// A 256-entry membership table for terminator byte sets, buildable in a
/// `const` context.
#[derive(Debug)]
pub(crate) struct ByteSet([bool; 256]);

impl ByteSet {
    pub const fn new(bytes: &[u8]) -> Self {
        let mut table = [false; 256];
        let mut i = 0;
        while i < bytes.len() {
            table[bytes[i] as usize] = true;
            i += 1;
        }
        Self(table)
    }

    #[inline]
    pub const fn contains(&self, byte: u8) -> bool {
        self.0[byte as usize]
    }
}

#[derive(Debug)]
pub(crate) struct ByteSource<R> {
    inner: R,
    buf: Vec<u8>,
    /// Start of the unread window within `buf`.
    pos: usize,
    eof: bool,
}

impl<R: Read> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(CHUNK),
            pos: 0,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Number of unread bytes currently buffered.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The byte at relative offset `i`; the caller must have `request`ed at
    /// least `i + 1` bytes.
    #[inline]
    pub fn byte_at(&self, i: usize) -> u8 {
        debug_assert!(i < self.available());
        self.buf[self.pos + i]
    }

    /// Reads one more chunk from the inner reader, compacting the consumed
    /// prefix first. Returns the number of bytes read; 0 means end of input.
    fn fill_more(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        if self.pos >= CHUNK {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + CHUNK, 0);
        let n = loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            }
        };
        self.buf.truncate(start + n);
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    /// Returns true once at least `n` unread bytes are buffered; false if the
    /// input is exhausted before that many bytes are available.
    pub fn request(&mut self, n: usize) -> io::Result<bool> {
        while self.available() < n {
            if self.fill_more()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Relative offset of the first occurrence of `byte` at or after `from`,
    /// buffering as much input as the scan needs. `None` at end of input.
    pub fn index_of(&mut self, byte: u8, from: usize) -> io::Result<Option<usize>> {
        let mut scanned = from;
        loop {
            if scanned < self.available() {
                if let Some(i) = memchr(byte, &self.buf[self.pos + scanned..]) {
                    return Ok(Some(scanned + i));
                }
                scanned = self.available();
            }
            if self.fill_more()? == 0 {
                return Ok(None);
            }
        }
    }

    /// Relative offset of the first byte in `set` at or after `from`.
    pub fn index_of_element(&mut self, set: &ByteSet, from: usize) -> io::Result<Option<usize>> {
        let mut i = from;
        loop {
            while i < self.available() {
                if set.contains(self.buf[self.pos + i]) {
                    return Ok(Some(i));
                }
                i += 1;
            }
            if self.fill_more()? == 0 {
                return Ok(None);
            }
        }
    }

    /// Relative offset of the first occurrence of `pattern` at or after
    /// `from`.
    pub fn find(&mut self, pattern: &[u8], from: usize) -> io::Result<Option<usize>> {
        debug_assert!(!pattern.is_empty());
        let mut at = from;
        loop {
            let Some(i) = self.index_of(pattern[0], at)? else {
                return Ok(None);
            };
            if !self.request(i + pattern.len())? {
                return Ok(None);
            }
            if &self.buf[self.pos + i..self.pos + i + pattern.len()] == pattern {
                return Ok(Some(i));
            }
            at = i + 1;
        }
    }

    /// Scans only the already-buffered window `[from, to)` for `byte`.
    pub fn index_of_buffered(&self, byte: u8, from: usize, to: usize) -> Option<usize> {
        let to = to.min(self.available());
        if from >= to {
            return None;
        }
        memchr(byte, &self.buf[self.pos + from..self.pos + to]).map(|i| from + i)
    }

    /// Discards `n` bytes, buffering more as needed.
    pub fn skip(&mut self, n: usize) -> io::Result<()> {
        if !self.request(n)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "skip past end of input",
            ));
        }
        self.pos += n;
        Ok(())
    }

    /// Consumes `n` bytes and returns them as strict UTF-8.
    pub fn read_utf8(&mut self, n: usize) -> io::Result<String> {
        if !self.request(n)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of input",
            ));
        }
        let bytes = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        String::from_utf8(bytes)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-8"))
    }

    /// True when the buffered window starts with `pattern`, buffering enough
    /// to decide. False at end of input.
    pub fn starts_with(&mut self, pattern: &[u8]) -> io::Result<bool> {
        if !self.request(pattern.len())? {
            return Ok(false);
        }
        Ok(&self.buf[self.pos..self.pos + pattern.len()] == pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields input one byte per `read` call to exercise refill boundaries.
    struct Trickle<'a> {
        data: &'a [u8],
        at: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.at == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.at];
            self.at += 1;
            Ok(1)
        }
    }

    fn trickle(data: &[u8]) -> ByteSource<Trickle<'_>> {
        ByteSource::new(Trickle { data, at: 0 })
    }

    #[test]
    fn request_reports_exhaustion() {
        let mut s = trickle(b"abc");
        assert!(s.request(3).unwrap());
        assert!(!s.request(4).unwrap());
        assert_eq!(s.available(), 3);
    }

    #[test]
    fn index_of_scans_across_refills() {
        let mut s = trickle(b"hello<world");
        assert_eq!(s.index_of(b'<', 0).unwrap(), Some(5));
        assert_eq!(s.index_of(b'!', 0).unwrap(), None);
    }

    #[test]
    fn index_of_element_honors_from_offset() {
        let mut s = trickle(b"a=b=c");
        const EQ: ByteSet = ByteSet::new(b"=");
        assert_eq!(s.index_of_element(&EQ, 0).unwrap(), Some(1));
        assert_eq!(s.index_of_element(&EQ, 2).unwrap(), Some(3));
        assert_eq!(s.index_of_element(&EQ, 4).unwrap(), None);
    }

    #[test]
    fn find_matches_patterns_spanning_refills() {
        let mut s = trickle(b"xx-->rest");
        assert_eq!(s.find(b"-->", 0).unwrap(), Some(2));
        s.skip(5).unwrap();
        assert_eq!(s.read_utf8(4).unwrap(), "rest");
    }

    #[test]
    fn find_rejects_prefix_only_match_at_eof() {
        let mut s = trickle(b"ab--");
        assert_eq!(s.find(b"-->", 0).unwrap(), None);
    }

    #[test]
    fn read_utf8_rejects_invalid_sequences() {
        let mut s = trickle(b"\xff\xfe");
        let err = s.read_utf8(2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_utf8_accepts_multibyte() {
        let mut s = trickle("héllo".as_bytes());
        assert_eq!(s.read_utf8(6).unwrap(), "héllo");
    }

    #[test]
    fn skip_past_end_is_unexpected_eof() {
        let mut s = trickle(b"ab");
        let err = s.skip(3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn starts_with_checks_window() {
        let mut s = trickle(b"\xef\xbb\xbf<a/>");
        assert!(s.starts_with(b"\xef\xbb\xbf").unwrap());
        s.skip(3).unwrap();
        assert!(s.starts_with(b"<a").unwrap());
        assert!(!s.starts_with(b"<b").unwrap());
    }
}
