use alloc::collections::{BTreeMap, BTreeSet};

use log::debug;
use nvram_shared::Blob;

use super::{Storage, StorageError};

/// Heap-backed storage for hosts and tests.
///
/// Faults can be injected to emulate power loss between two writes: after
/// [`fail_mutations_after`](Self::fail_mutations_after) every further store or
/// delete fails without touching the stored records.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    header: Option<Blob>,
    spaces: BTreeMap<u32, Blob>,
    mutations_left: Option<usize>,
    failing_loads: BTreeSet<u32>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `count` more mutations succeed, then fail all of them.
    pub fn fail_mutations_after(&mut self, count: usize) {
        self.mutations_left = Some(count);
    }

    /// Make every load of space `index` fail with [`StorageError::Failure`].
    pub fn fail_space_loads(&mut self, index: u32) {
        self.failing_loads.insert(index);
    }

    pub fn clear_faults(&mut self) {
        self.mutations_left = None;
        self.failing_loads.clear();
    }

    pub fn header_record(&self) -> Option<&Blob> {
        self.header.as_ref()
    }

    pub fn space_record(&self, index: u32) -> Option<&Blob> {
        self.spaces.get(&index)
    }

    /// Indices that currently have a stored record, in ascending order.
    pub fn space_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.spaces.keys().copied()
    }

    fn begin_mutation(&mut self) -> Result<(), StorageError> {
        match self.mutations_left.as_mut() {
            Some(0) => {
                debug!("injected storage failure");
                Err(StorageError::Failure)
            }
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Storage for MemoryStorage {
    fn load_header(&mut self) -> Result<Blob, StorageError> {
        self.header.clone().ok_or(StorageError::NotFound)
    }

    fn store_header(&mut self, blob: &Blob) -> Result<(), StorageError> {
        self.begin_mutation()?;
        self.header = Some(blob.clone());
        Ok(())
    }

    fn load_space(&mut self, index: u32) -> Result<Blob, StorageError> {
        if self.failing_loads.contains(&index) {
            return Err(StorageError::Failure);
        }
        self.spaces.get(&index).cloned().ok_or(StorageError::NotFound)
    }

    fn store_space(&mut self, index: u32, blob: &Blob) -> Result<(), StorageError> {
        self.begin_mutation()?;
        self.spaces.insert(index, blob.clone());
        Ok(())
    }

    fn delete_space(&mut self, index: u32) -> Result<(), StorageError> {
        if !self.spaces.contains_key(&index) {
            return Err(StorageError::NotFound);
        }
        self.begin_mutation()?;
        self.spaces.remove(&index);
        Ok(())
    }
}
