use super::InputStream;

/// Exposes a borrowed buffer through windows of at most `window_len` bytes.
///
/// Models backing stores that only map a bounded region at a time, such as a
/// flash page cache.
#[derive(Debug)]
pub struct ChunkedInputStream<'a> {
    data: &'a [u8],
    window_len: usize,
    pos: usize,
    end: usize,
}

impl<'a> ChunkedInputStream<'a> {
    pub fn new(data: &'a [u8], window_len: usize) -> Self {
        let window_len = window_len.max(1);
        Self {
            data,
            window_len,
            pos: 0,
            end: window_len.min(data.len()),
        }
    }
}

impl InputStream for ChunkedInputStream<'_> {
    fn chunk(&self) -> &[u8] {
        &self.data[self.pos..self.end]
    }

    fn consume(&mut self, len: usize) {
        self.pos += len;
    }

    fn advance(&mut self) -> bool {
        if self.end == self.data.len() {
            return false;
        }

        self.pos = self.end;
        self.end = self.end.saturating_add(self.window_len).min(self.data.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_bounded() {
        let mut stream = ChunkedInputStream::new(b"abcdefg", 3);
        assert_eq!(stream.chunk(), b"abc");
        stream.consume(3);
        assert!(stream.advance());
        assert_eq!(stream.chunk(), b"def");

        let mut rest = [0u8; 4];
        stream.read(&mut rest).expect("read rest");
        assert_eq!(&rest, b"defg");
        assert!(stream.done());
    }
}
