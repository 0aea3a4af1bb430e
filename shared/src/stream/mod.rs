//! Sequential byte cursors over backing stores that hand out bounded windows.
//!
//! A stream only ever sees one window of its backing store at a time. Once the
//! window is used up, [`InputStream::advance`] / [`OutputStream::advance`] is
//! asked for the next one. Multi-byte operations cross as many windows as they
//! need and fail with [`EndOfStream`] as soon as no further window is available.
//! Bytes already copied before such a failure stay copied.

mod blob;
mod chunked;
mod counting;
mod nested;
mod slice;

pub use blob::BlobOutputStream;
pub use chunked::ChunkedInputStream;
pub use counting::{COUNTING_SCRATCH_LEN, CountingOutputStream};
pub use nested::NestedInputStream;
pub use slice::{SliceInputStream, SliceOutputStream};

/// The backing store could not supply another non-empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stream exhausted")]
pub struct EndOfStream;

/// Read side of a windowed byte stream.
pub trait InputStream {
    /// Unread bytes of the current window.
    fn chunk(&self) -> &[u8];

    /// Mark `len` bytes at the front of [`chunk`](Self::chunk) as read.
    fn consume(&mut self, len: usize);

    /// Move to the next window. Returns `false` once the backing store is exhausted.
    fn advance(&mut self) -> bool {
        false
    }

    /// Copy exactly `data.len()` bytes out of the stream.
    fn read(&mut self, mut data: &mut [u8]) -> Result<(), EndOfStream> {
        while !data.is_empty() {
            if !self.fill() {
                return Err(EndOfStream);
            }

            let chunk = self.chunk();
            let len = chunk.len().min(data.len());
            let (head, tail) = core::mem::take(&mut data).split_at_mut(len);
            head.copy_from_slice(&chunk[..len]);
            self.consume(len);
            data = tail;
        }

        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, EndOfStream> {
        if !self.fill() {
            return Err(EndOfStream);
        }

        let byte = self.chunk()[0];
        self.consume(1);
        Ok(byte)
    }

    /// Discard `len` bytes without copying them anywhere.
    fn skip(&mut self, mut len: usize) -> Result<(), EndOfStream> {
        while len > 0 {
            if !self.fill() {
                return Err(EndOfStream);
            }

            let step = self.chunk().len().min(len);
            self.consume(step);
            len -= step;
        }

        Ok(())
    }

    /// `true` when the current window is used up and no further window exists.
    fn done(&mut self) -> bool {
        !self.fill()
    }

    /// Make sure the current window holds at least one byte.
    #[doc(hidden)]
    fn fill(&mut self) -> bool {
        !self.chunk().is_empty() || (self.advance() && !self.chunk().is_empty())
    }
}

/// Write side of a windowed byte stream.
pub trait OutputStream {
    /// Writable space left in the current window.
    fn chunk_mut(&mut self) -> &mut [u8];

    /// Mark `len` bytes at the front of [`chunk_mut`](Self::chunk_mut) as written.
    fn commit(&mut self, len: usize);

    /// Move to the next window. Returns `false` once no more space can be provided.
    fn advance(&mut self) -> bool {
        false
    }

    fn write(&mut self, mut data: &[u8]) -> Result<(), EndOfStream> {
        while !data.is_empty() {
            if !self.fill() {
                return Err(EndOfStream);
            }

            let chunk = self.chunk_mut();
            let len = chunk.len().min(data.len());
            chunk[..len].copy_from_slice(&data[..len]);
            self.commit(len);
            data = &data[len..];
        }

        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EndOfStream> {
        if !self.fill() {
            return Err(EndOfStream);
        }

        self.chunk_mut()[0] = byte;
        self.commit(1);
        Ok(())
    }

    #[doc(hidden)]
    fn fill(&mut self) -> bool {
        !self.chunk_mut().is_empty() || (self.advance() && !self.chunk_mut().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out a fixed list of windows, one per `advance`.
    struct Windows<'a> {
        windows: &'a [&'a [u8]],
        current: &'a [u8],
        advances: usize,
    }

    impl<'a> Windows<'a> {
        fn new(windows: &'a [&'a [u8]]) -> Self {
            Self {
                windows,
                current: &[],
                advances: 0,
            }
        }
    }

    impl InputStream for Windows<'_> {
        fn chunk(&self) -> &[u8] {
            self.current
        }

        fn consume(&mut self, len: usize) {
            self.current = &self.current[len..];
        }

        fn advance(&mut self) -> bool {
            self.advances += 1;
            match self.windows.split_first() {
                Some((first, rest)) => {
                    self.current = first;
                    self.windows = rest;
                    true
                }
                None => false,
            }
        }
    }

    #[test]
    fn read_spans_windows() {
        let mut stream = Windows::new(&[b"ab", b"c", b"def"]);
        let mut out = [0u8; 5];
        stream.read(&mut out).expect("read across windows");
        assert_eq!(&out, b"abcde");
        assert_eq!(stream.read_byte(), Ok(b'f'));
        assert!(stream.done());
    }

    #[test]
    fn failed_read_keeps_partial_progress() {
        let mut stream = Windows::new(&[b"xy"]);
        let mut out = [0u8; 4];
        assert_eq!(stream.read(&mut out), Err(EndOfStream));
        assert_eq!(&out, b"xy\0\0");
    }

    #[test]
    fn empty_window_counts_as_exhaustion() {
        let mut stream = Windows::new(&[b"", b"late"]);
        assert_eq!(stream.read_byte(), Err(EndOfStream));
        assert_eq!(stream.advances, 1);
    }

    #[test]
    fn skip_crosses_windows() {
        let mut stream = Windows::new(&[b"12", b"345", b"6"]);
        stream.skip(4).expect("skip");
        assert_eq!(stream.read_byte(), Ok(b'5'));
        assert_eq!(stream.skip(2), Err(EndOfStream));
    }
}
