//! Crash-safe bookkeeping of allocated spaces.
//!
//! Creating or deleting a space touches two records. The header is always
//! written first with `provisional_index` naming the space in flight:
//!
//! * create: header listing the new index, then the space record;
//! * delete: header without the index, then removal of the space record.
//!
//! A follow-up header write clears `provisional_index` again. When a crash hits
//! between the writes, [`SpaceTable::open`] finds the provisional index and
//! either commits the operation or rolls it back, so the set of indices in the
//! header always covers every space record in storage.

use log::{debug, error, info, warn};

use crate::persistence::{self, NvramHeader, NvramSpace};
use crate::storage::{Storage, StorageError};

const MAX_SPACES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceTableConfig {
    /// Upper bound on allocated spaces. Opening a header listing more fails.
    pub max_spaces: usize,
    /// Newest header version accepted by [`SpaceTable::open`].
    pub max_header_version: u32,
}

impl Default for SpaceTableConfig {
    fn default() -> Self {
        Self {
            max_spaces: MAX_SPACES,
            max_header_version: NvramHeader::VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpaceTableError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("header version {0} is newer than supported")]
    UnsupportedVersion(u32),
    #[error("more than {0} spaces")]
    TooManySpaces(usize),
    #[error("space creation is disabled")]
    CreateDisabled,
    #[error("space {0:#x} already exists")]
    SpaceExists(u32),
    #[error("space {0:#x} does not exist")]
    SpaceDoesNotExist(u32),
    #[error("space {0:#x} is allocated but has no stored data")]
    MissingSpaceData(u32),
}

/// Allocated spaces of one storage backend.
///
/// Operations must not be interleaved; callers serialize access.
#[derive(Debug)]
pub struct SpaceTable<S> {
    storage: S,
    header: NvramHeader,
    config: SpaceTableConfig,
}

impl<S: Storage> SpaceTable<S> {
    /// Load the header and finish any lifecycle operation a crash interrupted.
    ///
    /// A missing header means fresh storage; nothing is written until the first
    /// mutation.
    pub fn open(mut storage: S, config: SpaceTableConfig) -> Result<Self, SpaceTableError> {
        let mut header = match persistence::load_header(&mut storage) {
            Ok(header) => header,
            Err(StorageError::NotFound) => {
                info!("no NVRAM header in storage, starting empty");
                NvramHeader::default()
            }
            Err(err) => {
                error!("failed to load NVRAM header: {err}");
                return Err(err.into());
            }
        };

        if header.version > config.max_header_version {
            error!(
                "NVRAM header version {} is newer than {}",
                header.version, config.max_header_version
            );
            return Err(SpaceTableError::UnsupportedVersion(header.version));
        }

        header.allocated_indices.sort_unstable();
        header.allocated_indices.dedup();
        if header.allocated_indices.len() > config.max_spaces {
            error!(
                "NVRAM header lists {} spaces, limit is {}",
                header.allocated_indices.len(),
                config.max_spaces
            );
            return Err(SpaceTableError::TooManySpaces(config.max_spaces));
        }

        let mut table = Self {
            storage,
            header,
            config,
        };
        table.recover()?;
        Ok(table)
    }

    fn recover(&mut self) -> Result<(), SpaceTableError> {
        let Some(index) = self.header.provisional_index.take() else {
            return Ok(());
        };

        let in_storage = match persistence::load_space(&mut self.storage, index) {
            Ok(_) => true,
            Err(StorageError::NotFound) => false,
            Err(StorageError::Failure) => {
                // Keep the index so a transient read error cannot free it for reuse.
                error!("failed to load provisional space {index:#x}");
                true
            }
        };

        if self.contains(index) && in_storage {
            info!("committing interrupted creation of space {index:#x}");
        } else {
            if self.contains(index) {
                warn!("rolling back interrupted creation of space {index:#x}");
                self.remove_index(index);
            } else {
                info!("finishing interrupted deletion of space {index:#x}");
            }

            match persistence::delete_space(&mut self.storage, index) {
                Ok(()) | Err(StorageError::NotFound) => {}
                Err(err) => {
                    error!("failed to delete provisional space {index:#x}: {err}");
                    return Err(err.into());
                }
            }
        }

        // The recovered state is consistent either way; this only saves
        // repeating the recovery on the next open.
        if let Err(err) = self.write_header(None) {
            warn!("failed to clear provisional index {index:#x}: {err}");
        }
        Ok(())
    }

    /// Current header. `provisional_index` is always `None` between operations.
    pub fn header(&self) -> &NvramHeader {
        &self.header
    }

    pub fn config(&self) -> &SpaceTableConfig {
        &self.config
    }

    pub fn allocated_indices(&self) -> &[u32] {
        &self.header.allocated_indices
    }

    pub fn contains(&self, index: u32) -> bool {
        self.header.allocated_indices.contains(&index)
    }

    pub fn create_disabled(&self) -> bool {
        self.header.has_flag(NvramHeader::FLAG_DISABLE_CREATE)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn create_space(&mut self, index: u32, space: &NvramSpace) -> Result<(), SpaceTableError> {
        info!("creating space {index:#x}");
        if self.create_disabled() {
            return Err(SpaceTableError::CreateDisabled);
        }
        if self.contains(index) {
            return Err(SpaceTableError::SpaceExists(index));
        }
        if self.header.allocated_indices.len() >= self.config.max_spaces {
            return Err(SpaceTableError::TooManySpaces(self.config.max_spaces));
        }

        self.header.allocated_indices.push(index);
        if let Err(err) = self.write_header(Some(index)) {
            self.header.allocated_indices.pop();
            return Err(err.into());
        }

        if let Err(err) = persistence::store_space(&mut self.storage, index, space) {
            // The stored header still marks the index provisional; the next
            // open rolls the creation back.
            error!("failed to store space {index:#x}: {err}");
            self.remove_index(index);
            return Err(err.into());
        }

        self.commit(index);
        Ok(())
    }

    pub fn delete_space(&mut self, index: u32) -> Result<(), SpaceTableError> {
        info!("deleting space {index:#x}");
        if !self.contains(index) {
            return Err(SpaceTableError::SpaceDoesNotExist(index));
        }

        self.remove_index(index);
        if let Err(err) = self.write_header(Some(index)) {
            self.header.allocated_indices.push(index);
            return Err(err.into());
        }

        match persistence::delete_space(&mut self.storage, index) {
            Ok(()) => {}
            Err(StorageError::NotFound) => {
                warn!("space {index:#x} data already missing on deletion");
            }
            Err(err) => {
                // The next open finishes the deletion.
                error!("failed to delete space {index:#x} data: {err}");
                self.header.allocated_indices.push(index);
                return Err(err.into());
            }
        }

        self.commit(index);
        Ok(())
    }

    pub fn load_space(&mut self, index: u32) -> Result<NvramSpace, SpaceTableError> {
        if !self.contains(index) {
            return Err(SpaceTableError::SpaceDoesNotExist(index));
        }

        persistence::load_space(&mut self.storage, index).map_err(|err| match err {
            StorageError::NotFound => {
                error!("space {index:#x} is allocated but missing from storage");
                SpaceTableError::MissingSpaceData(index)
            }
            StorageError::Failure => SpaceTableError::Storage(err),
        })
    }

    /// Overwrite the record of an allocated space, e.g. after a write or lock.
    pub fn store_space(&mut self, index: u32, space: &NvramSpace) -> Result<(), SpaceTableError> {
        if !self.contains(index) {
            return Err(SpaceTableError::SpaceDoesNotExist(index));
        }

        persistence::store_space(&mut self.storage, index, space)?;
        Ok(())
    }

    /// Persistently refuse further [`create_space`](Self::create_space) calls.
    pub fn disable_create(&mut self) -> Result<(), SpaceTableError> {
        info!("disabling space creation");
        let previous = self.header.flags;
        self.header.set_flag(NvramHeader::FLAG_DISABLE_CREATE);
        if let Err(err) = self.write_header(None) {
            self.header.flags = previous;
            return Err(err.into());
        }
        Ok(())
    }

    /// Delete every space.
    ///
    /// Space data goes first and the header is cleared last, so a crash half-way
    /// leaves spaces that are listed but missing rather than unlisted data.
    pub fn wipe(&mut self) -> Result<(), SpaceTableError> {
        info!("wiping {} spaces", self.header.allocated_indices.len());
        for &index in &self.header.allocated_indices {
            match persistence::delete_space(&mut self.storage, index) {
                Ok(()) => {}
                Err(StorageError::NotFound) => {
                    warn!("space {index:#x} data missing on wipe");
                }
                Err(err) => {
                    error!("failed to wipe space {index:#x} data: {err}");
                    return Err(err.into());
                }
            }
        }

        let previous = core::mem::take(&mut self.header.allocated_indices);
        if let Err(err) = self.write_header(None) {
            self.header.allocated_indices = previous;
            return Err(err.into());
        }
        Ok(())
    }

    fn remove_index(&mut self, index: u32) {
        self.header.allocated_indices.retain(|&allocated| allocated != index);
    }

    fn write_header(&mut self, provisional_index: Option<u32>) -> Result<(), StorageError> {
        let header = NvramHeader {
            provisional_index,
            ..self.header.clone()
        };
        persistence::store_header(&mut self.storage, &header)
    }

    /// Clear the provisional marker left by a completed create or delete.
    fn commit(&mut self, index: u32) {
        match self.write_header(None) {
            Ok(()) => debug!("committed space {index:#x}"),
            Err(err) => warn!("space {index:#x} left provisional: {err}"),
        }
    }
}
