#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod lifecycle;
pub mod persistence;
pub mod storage;

pub use lifecycle::{SpaceTable, SpaceTableConfig, SpaceTableError};
pub use persistence::{HEADER_MAGIC, NvramHeader, NvramSpace, SPACE_MAGIC};
pub use storage::{FlashStorage, FlashStorageConfig, MemoryStorage, Storage, StorageError};
