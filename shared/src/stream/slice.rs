use super::{InputStream, OutputStream};

/// Reads from a single borrowed buffer. There is no second window.
#[derive(Debug)]
pub struct SliceInputStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceInputStream<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }
}

impl InputStream for SliceInputStream<'_> {
    fn chunk(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn consume(&mut self, len: usize) {
        self.pos += len;
    }
}

/// Writes into a fixed caller-provided buffer and fails once it is full.
#[derive(Debug)]
pub struct SliceOutputStream<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceOutputStream<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub const fn bytes_written(&self) -> usize {
        self.pos
    }
}

impl OutputStream for SliceOutputStream<'_> {
    fn chunk_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.pos..]
    }

    fn commit(&mut self, len: usize) {
        self.pos += len;
    }
}
