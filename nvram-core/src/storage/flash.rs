use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use embassy_futures::block_on;
use embedded_storage_async::nor_flash::MultiwriteNorFlash;
use log::{error, info};
use nvram_shared::Blob;
use sequential_storage::{cache::NoCache, erase_all, map};
use zeroize::Zeroizing;

use super::{Storage, StorageError};

/// Map key of the header record. Space records use their index as key.
pub const HEADER_KEY: u64 = 1 << 32;

const DATA_BUFFER_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashStorageConfig {
    /// Scratch buffer size; bounds the largest record that can be stored or read.
    pub data_buffer_len: usize,
}

impl Default for FlashStorageConfig {
    fn default() -> Self {
        Self {
            data_buffer_len: DATA_BUFFER_LEN,
        }
    }
}

/// Storage on a NOR flash partition managed as a `sequential-storage` map.
///
/// The async flash API is driven to completion on every call.
pub struct FlashStorage<F> {
    flash: F,
    range: Range<u32>,
    scratch: Zeroizing<Vec<u8>>,
}

impl<F> FlashStorage<F>
where
    F: MultiwriteNorFlash,
{
    pub fn new(flash: F, range: Range<u32>, config: FlashStorageConfig) -> Self {
        Self {
            flash,
            range,
            scratch: Zeroizing::new(vec![0u8; config.data_buffer_len]),
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Erase the whole partition, dropping every record.
    pub fn erase(&mut self) -> Result<(), StorageError> {
        info!("erasing NVRAM flash range {:?}", self.range);
        block_on(erase_all(&mut self.flash, self.range.clone())).map_err(|err| {
            error!("failed to erase NVRAM flash: {err:?}");
            StorageError::Failure
        })
    }

    fn fetch(&mut self, key: u64) -> Result<Blob, StorageError> {
        let mut cache = NoCache::new();
        let item = block_on(map::fetch_item::<u64, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut cache,
            self.scratch.as_mut_slice(),
            &key,
        ))
        .map_err(|err| {
            error!("failed to fetch NVRAM record {key:#x}: {err:?}");
            StorageError::Failure
        })?;

        item.map(Blob::from).ok_or(StorageError::NotFound)
    }

    fn store(&mut self, key: u64, blob: &Blob) -> Result<(), StorageError> {
        let mut cache = NoCache::new();
        block_on(map::store_item::<u64, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut cache,
            self.scratch.as_mut_slice(),
            &key,
            &blob.as_slice(),
        ))
        .map_err(|err| {
            error!("failed to store NVRAM record {key:#x}: {err:?}");
            StorageError::Failure
        })
    }

    fn remove(&mut self, key: u64) -> Result<(), StorageError> {
        self.fetch(key)?;

        let mut cache = NoCache::new();
        block_on(map::remove_item(
            &mut self.flash,
            self.range.clone(),
            &mut cache,
            self.scratch.as_mut_slice(),
            &key,
        ))
        .map_err(|err| {
            error!("failed to remove NVRAM record {key:#x}: {err:?}");
            StorageError::Failure
        })
    }
}

impl<F> Storage for FlashStorage<F>
where
    F: MultiwriteNorFlash,
{
    fn load_header(&mut self) -> Result<Blob, StorageError> {
        self.fetch(HEADER_KEY)
    }

    fn store_header(&mut self, blob: &Blob) -> Result<(), StorageError> {
        self.store(HEADER_KEY, blob)
    }

    fn load_space(&mut self, index: u32) -> Result<Blob, StorageError> {
        self.fetch(u64::from(index))
    }

    fn store_space(&mut self, index: u32, blob: &Blob) -> Result<(), StorageError> {
        self.store(u64::from(index), blob)
    }

    fn delete_space(&mut self, index: u32) -> Result<(), StorageError> {
        self.remove(u64::from(index))
    }
}
