//! Blob-level key/value backends for the header record and space records.
//!
//! A backend only moves opaque bytes. Each individual call is expected to be
//! atomic: after a crash a record holds either its previous or its new bytes.

mod flash;
mod memory;

pub use flash::{FlashStorage, FlashStorageConfig, HEADER_KEY};
pub use memory::MemoryStorage;

use nvram_shared::Blob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("storage failure")]
    Failure,
}

pub trait Storage {
    fn load_header(&mut self) -> Result<Blob, StorageError>;

    fn store_header(&mut self, blob: &Blob) -> Result<(), StorageError>;

    fn load_space(&mut self, index: u32) -> Result<Blob, StorageError>;

    fn store_space(&mut self, index: u32, blob: &Blob) -> Result<(), StorageError>;

    /// Remove the record of space `index`, failing with [`StorageError::NotFound`]
    /// if there is none.
    fn delete_space(&mut self, index: u32) -> Result<(), StorageError>;
}

impl<S> Storage for &mut S
where
    S: Storage + ?Sized,
{
    fn load_header(&mut self) -> Result<Blob, StorageError> {
        (**self).load_header()
    }

    fn store_header(&mut self, blob: &Blob) -> Result<(), StorageError> {
        (**self).store_header(blob)
    }

    fn load_space(&mut self, index: u32) -> Result<Blob, StorageError> {
        (**self).load_space(index)
    }

    fn store_space(&mut self, index: u32, blob: &Blob) -> Result<(), StorageError> {
        (**self).store_space(index, blob)
    }

    fn delete_space(&mut self, index: u32) -> Result<(), StorageError> {
        (**self).delete_space(index)
    }
}
