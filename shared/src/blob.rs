use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use zeroize::Zeroize;

/// Owning, resizable byte buffer used for encoded records and secret material.
///
/// The bytes are wiped when the blob is dropped and whenever a resize moves the
/// contents to a new allocation, so authorization values never linger in freed
/// heap memory.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Resize to exactly `len` bytes, keeping the common prefix and zero-filling any growth.
    pub fn resize(&mut self, len: usize) {
        if len <= self.bytes.len() {
            self.bytes[len..].zeroize();
            self.bytes.truncate(len);
            return;
        }

        self.reserve_exact_total(len);
        self.bytes.resize(len, 0);
    }

    /// Append `data`, growing the allocation geometrically.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        let needed = self.bytes.len() + data.len();
        if needed > self.bytes.capacity() {
            self.reserve_exact_total(needed.max(self.bytes.capacity().saturating_mul(2)));
        }
        self.bytes.extend_from_slice(data);
    }

    /// Move into an allocation of at least `capacity` bytes, wiping the old one.
    fn reserve_exact_total(&mut self, capacity: usize) {
        if capacity <= self.bytes.capacity() {
            return;
        }

        let mut grown = Vec::with_capacity(capacity);
        grown.extend_from_slice(&self.bytes);
        self.bytes.zeroize();
        self.bytes = grown;
    }

    /// Replace the contents with a copy of `data`.
    pub fn assign(&mut self, data: &[u8]) {
        self.bytes.zeroize();
        self.resize(data.len());
        self.bytes.copy_from_slice(data);
    }
}

impl Drop for Blob {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl From<&[u8]> for Blob {
    fn from(value: &[u8]) -> Self {
        Self {
            bytes: value.to_vec(),
        }
    }
}

impl<const N: usize> From<&[u8; N]> for Blob {
    fn from(value: &[u8; N]) -> Self {
        Self::from(&value[..])
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for Blob {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.bytes.len())
    }
}
