use super::OutputStream;

/// Size of the scratch window a [`CountingOutputStream`] writes through.
pub const COUNTING_SCRATCH_LEN: usize = 64;

/// Measures an encoding without keeping it.
///
/// Bytes land in a small owned scratch window that is recycled on every
/// advance; only the running total survives.
#[derive(Debug)]
pub struct CountingOutputStream {
    scratch: [u8; COUNTING_SCRATCH_LEN],
    pos: usize,
    flushed: usize,
}

impl CountingOutputStream {
    pub const fn new() -> Self {
        Self {
            scratch: [0; COUNTING_SCRATCH_LEN],
            pos: 0,
            flushed: 0,
        }
    }

    pub const fn bytes_written(&self) -> usize {
        self.flushed + self.pos
    }
}

impl Default for CountingOutputStream {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStream for CountingOutputStream {
    fn chunk_mut(&mut self) -> &mut [u8] {
        &mut self.scratch[self.pos..]
    }

    fn commit(&mut self, len: usize) {
        self.pos += len;
    }

    fn advance(&mut self) -> bool {
        self.flushed += self.pos;
        self.pos = 0;
        true
    }
}
