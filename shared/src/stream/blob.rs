use super::OutputStream;
use crate::blob::Blob;

/// Smallest size the backing blob grows to once the first window is used up.
const MIN_GROWTH: usize = 32;

/// Writes into a [`Blob`], doubling its size whenever the current window is full.
///
/// Writing starts at offset zero and overwrites existing contents. Call
/// [`truncate`](Self::truncate) when done to drop the unused tail.
#[derive(Debug)]
pub struct BlobOutputStream<'a> {
    blob: &'a mut Blob,
    pos: usize,
}

impl<'a> BlobOutputStream<'a> {
    pub fn new(blob: &'a mut Blob) -> Self {
        Self { blob, pos: 0 }
    }

    pub const fn bytes_written(&self) -> usize {
        self.pos
    }

    /// Shrink the blob to exactly the bytes written so far.
    pub fn truncate(&mut self) {
        self.blob.resize(self.pos);
    }
}

impl OutputStream for BlobOutputStream<'_> {
    fn chunk_mut(&mut self) -> &mut [u8] {
        &mut self.blob.as_mut_slice()[self.pos..]
    }

    fn commit(&mut self, len: usize) {
        self.pos += len;
    }

    fn advance(&mut self) -> bool {
        let Some(doubled) = self.blob.len().checked_mul(2) else {
            return false;
        };
        self.blob.resize(doubled.max(MIN_GROWTH));
        true
    }
}
