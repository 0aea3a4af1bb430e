//! Persisted NVRAM records and their magic-tagged framing.
//!
//! Every stored object is a single length-delimited record whose field number
//! is a per-type magic value, so a header blob cannot be decoded as a space and
//! vice versa.

use alloc::vec::Vec;

use log::error;
use nvram_shared::codec::{self, Field, Message};
use nvram_shared::stream::{BlobOutputStream, SliceInputStream};
use nvram_shared::wire::{ProtoReader, ProtoWriter, WireType};
use nvram_shared::{Blob, CodecError, field};

use crate::storage::{Storage, StorageError};

/// Field number wrapping an encoded [`NvramHeader`] ("NVH").
pub const HEADER_MAGIC: u32 = 0x4E5648;
/// Field number wrapping an encoded [`NvramSpace`] ("NVS").
pub const SPACE_MAGIC: u32 = 0x4E5653;

/// Bookkeeping record listing the allocated spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvramHeader {
    pub version: u32,
    pub flags: u32,
    /// Unique, in no particular order.
    pub allocated_indices: Vec<u32>,
    /// Set only while a create or delete of this index is in flight.
    pub provisional_index: Option<u32>,
}

impl NvramHeader {
    /// Newest header format this build reads and writes.
    pub const VERSION: u32 = 1;
    pub const FLAG_DISABLE_CREATE: u32 = 1 << 0;

    pub const fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }
}

impl Default for NvramHeader {
    fn default() -> Self {
        Self {
            version: Self::VERSION,
            flags: 0,
            allocated_indices: Vec::new(),
            provisional_index: None,
        }
    }
}

impl Message for NvramHeader {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, version),
        field!(2, flags),
        field!(3, allocated_indices),
        field!(4, provisional_index),
    ];
}

/// Stored state of one space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NvramSpace {
    pub flags: u32,
    /// Bitmask of [`controls`](nvram_shared::schema::controls) bits, fixed at creation.
    pub controls: u32,
    pub authorization_value: Blob,
    pub contents: Blob,
}

impl NvramSpace {
    pub const FLAG_WRITE_LOCKED: u32 = 1 << 0;

    pub const fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    /// Whether control bit number `control` is set. Out-of-range bits are never set.
    pub const fn has_control(&self, control: u32) -> bool {
        match 1u32.checked_shl(control) {
            Some(mask) => self.controls & mask != 0,
            None => false,
        }
    }
}

impl Message for NvramSpace {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, flags),
        field!(2, controls),
        field!(3, authorization_value),
        field!(4, contents),
    ];
}

/// Encode `object` as a single record numbered `magic`, replacing the contents of `blob`.
pub fn encode_object<M: Message>(magic: u32, object: &M, blob: &mut Blob) -> Result<(), CodecError> {
    let mut stream = BlobOutputStream::new(blob);
    let mut writer = ProtoWriter::new(&mut stream);
    codec::encode_message_field(object, magic, &mut writer)?;
    stream.truncate();
    Ok(())
}

/// Decode a record produced by [`encode_object`] with the same `magic`.
///
/// The framing is checked before any of the body is looked at.
pub fn decode_object<M: Message>(magic: u32, data: &[u8], object: &mut M) -> Result<(), CodecError> {
    let mut stream = SliceInputStream::new(data);
    let mut reader = ProtoReader::new(&mut stream);
    reader.read_wire_tag()?;
    if reader.field_number() != magic || reader.wire_type() != WireType::LengthDelimited {
        return Err(CodecError::MagicMismatch {
            expected: magic,
            found: reader.field_number(),
            wire_type: reader.wire_type(),
        });
    }

    codec::decode_message_field(object, &mut reader)?;
    if !reader.done() {
        return Err(CodecError::TrailingData);
    }
    Ok(())
}

pub fn load_header<S: Storage + ?Sized>(storage: &mut S) -> Result<NvramHeader, StorageError> {
    let blob = storage.load_header()?;
    let mut header = NvramHeader::default();
    decode_object(HEADER_MAGIC, &blob, &mut header).map_err(|err| {
        error!("failed to decode NVRAM header: {err}");
        StorageError::Failure
    })?;
    Ok(header)
}

pub fn store_header<S: Storage + ?Sized>(
    storage: &mut S,
    header: &NvramHeader,
) -> Result<(), StorageError> {
    let mut blob = Blob::new();
    encode_object(HEADER_MAGIC, header, &mut blob).map_err(|err| {
        error!("failed to encode NVRAM header: {err}");
        StorageError::Failure
    })?;
    storage.store_header(&blob)
}

pub fn load_space<S: Storage + ?Sized>(
    storage: &mut S,
    index: u32,
) -> Result<NvramSpace, StorageError> {
    let blob = storage.load_space(index)?;
    let mut space = NvramSpace::default();
    decode_object(SPACE_MAGIC, &blob, &mut space).map_err(|err| {
        error!("failed to decode space {index:#x}: {err}");
        StorageError::Failure
    })?;
    Ok(space)
}

pub fn store_space<S: Storage + ?Sized>(
    storage: &mut S,
    index: u32,
    space: &NvramSpace,
) -> Result<(), StorageError> {
    let mut blob = Blob::new();
    encode_object(SPACE_MAGIC, space, &mut blob).map_err(|err| {
        error!("failed to encode space {index:#x}: {err}");
        StorageError::Failure
    })?;
    storage.store_space(index, &blob)
}

pub fn delete_space<S: Storage + ?Sized>(storage: &mut S, index: u32) -> Result<(), StorageError> {
    storage.delete_space(index)
}
