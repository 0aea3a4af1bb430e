use super::InputStream;

/// Clamps a parent stream to exactly `size` bytes.
///
/// The limit holds no matter how the parent chunks its windows: every window
/// the delegate hands out is cut down to the bytes still remaining.
pub struct NestedInputStream<'a> {
    delegate: &'a mut dyn InputStream,
    remaining: usize,
}

impl<'a> NestedInputStream<'a> {
    pub fn new(delegate: &'a mut dyn InputStream, size: usize) -> Self {
        Self {
            delegate,
            remaining: size,
        }
    }

    /// Bytes of the clamped region that have not been consumed yet.
    pub const fn remaining(&self) -> usize {
        self.remaining
    }
}

impl InputStream for NestedInputStream<'_> {
    fn chunk(&self) -> &[u8] {
        let chunk = self.delegate.chunk();
        &chunk[..chunk.len().min(self.remaining)]
    }

    fn consume(&mut self, len: usize) {
        self.delegate.consume(len);
        self.remaining -= len;
    }

    fn advance(&mut self) -> bool {
        self.remaining > 0 && self.delegate.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{ChunkedInputStream, EndOfStream, SliceInputStream};

    #[test]
    fn never_reads_past_size_with_large_windows() {
        let mut parent = SliceInputStream::new(b"0123456789");
        let mut nested = NestedInputStream::new(&mut parent, 4);
        let mut out = [0u8; 4];
        nested.read(&mut out).expect("read clamped");
        assert_eq!(&out, b"0123");
        assert!(nested.done());
        assert_eq!(nested.read_byte(), Err(EndOfStream));
        assert_eq!(parent.read_byte(), Ok(b'4'));
    }

    #[test]
    fn never_reads_past_size_with_small_windows() {
        for window in 1..=8 {
            let mut parent = ChunkedInputStream::new(b"abcdefghij", window);
            let mut nested = NestedInputStream::new(&mut parent, 6);
            let mut seen = alloc::vec::Vec::new();
            while let Ok(byte) = nested.read_byte() {
                seen.push(byte);
            }
            assert_eq!(seen.as_slice(), b"abcdef", "window length {window}");
            assert_eq!(nested.remaining(), 0);
            assert_eq!(parent.read_byte(), Ok(b'g'));
        }
    }

    #[test]
    fn short_delegate_leaves_remaining() {
        let mut parent = SliceInputStream::new(b"abc");
        let mut nested = NestedInputStream::new(&mut parent, 5);
        nested.skip(3).expect("skip available");
        assert!(nested.done());
        assert_eq!(nested.remaining(), 2);
    }
}
