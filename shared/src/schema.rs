//! Request and response messages exchanged with the NVRAM service.

use alloc::vec::Vec;

use crate::blob::Blob;
use crate::codec::{Field, FieldCodec, Message};
use crate::error::CodecError;
use crate::wire::{ProtoReader, ProtoWriter};
use crate::{field, oneof, tagged_union};

/// Access-control bit numbers a space can be created with.
pub mod controls {
    pub const PERSISTENT_WRITE_LOCK: u32 = 0;
    pub const BOOT_WRITE_LOCK: u32 = 1;
    pub const BOOT_READ_LOCK: u32 = 2;
    pub const WRITE_AUTHORIZATION: u32 = 3;
    pub const READ_AUTHORIZATION: u32 = 4;
    pub const WRITE_EXTEND: u32 = 5;
}

/// Operation carried by a request and echoed by its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetInfo,
    CreateSpace,
    GetSpaceInfo,
    DeleteSpace,
    DisableCreate,
    WriteSpace,
    ReadSpace,
    LockSpaceWrite,
    LockSpaceRead,
    WipeStorage,
    DisableWipe,
}

/// Outcome reported in every [`Response`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResultCode {
    #[default]
    Success = 0,
    InternalError = 1,
    AccessDenied = 2,
    InvalidParameter = 3,
    SpaceDoesNotExist = 4,
    SpaceAlreadyExists = 5,
    OperationDisabled = 6,
}

impl TryFrom<u64> for ResultCode {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ResultCode::Success,
            1 => ResultCode::InternalError,
            2 => ResultCode::AccessDenied,
            3 => ResultCode::InvalidParameter,
            4 => ResultCode::SpaceDoesNotExist,
            5 => ResultCode::SpaceAlreadyExists,
            6 => ResultCode::OperationDisabled,
            other => return Err(other),
        })
    }
}

impl FieldCodec for ResultCode {
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        writer.write_varint(number, *self as u64)
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        let value = reader.read_varint()?;
        *self = ResultCode::try_from(value).map_err(|value| CodecError::InvalidEnumValue {
            field: reader.field_number(),
            value,
        })?;
        Ok(())
    }
}

macro_rules! empty_message {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Default, PartialEq, Eq)]
            pub struct $name;

            impl Message for $name {
                const FIELDS: &'static [Field<Self>] = &[];
            }
        )*
    };
}

empty_message!(
    GetInfoRequest,
    CreateSpaceResponse,
    DeleteSpaceResponse,
    DisableCreateRequest,
    DisableCreateResponse,
    WriteSpaceResponse,
    LockSpaceWriteResponse,
    LockSpaceReadResponse,
    WipeStorageRequest,
    WipeStorageResponse,
    DisableWipeRequest,
    DisableWipeResponse,
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetInfoResponse {
    pub total_size: u64,
    pub available_size: u64,
    pub max_spaces: u32,
    pub space_list: Vec<u32>,
    pub max_space_size: u64,
    pub wipe_disabled: bool,
}

impl Message for GetInfoResponse {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, total_size),
        field!(2, available_size),
        field!(3, max_spaces),
        field!(4, space_list),
        field!(5, max_space_size),
        field!(6, wipe_disabled),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSpaceRequest {
    pub index: u32,
    pub size: u64,
    /// Control bit numbers from [`controls`].
    pub controls: Vec<u32>,
    pub authorization_value: Blob,
}

impl Message for CreateSpaceRequest {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, index),
        field!(2, size),
        field!(3, controls),
        field!(4, authorization_value),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetSpaceInfoRequest {
    pub index: u32,
}

impl Message for GetSpaceInfoRequest {
    const FIELDS: &'static [Field<Self>] = &[field!(1, index)];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetSpaceInfoResponse {
    pub size: u64,
    pub controls: Vec<u32>,
    pub read_locked: bool,
    pub write_locked: bool,
}

impl Message for GetSpaceInfoResponse {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, size),
        field!(2, controls),
        field!(3, read_locked),
        field!(4, write_locked),
    ];
}

/// Requests that name a space and prove access to it.
macro_rules! authorized_request {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Default, PartialEq, Eq)]
            pub struct $name {
                pub index: u32,
                pub authorization_value: Blob,
            }

            impl Message for $name {
                const FIELDS: &'static [Field<Self>] =
                    &[field!(1, index), field!(2, authorization_value)];
            }
        )*
    };
}

authorized_request!(
    DeleteSpaceRequest,
    ReadSpaceRequest,
    LockSpaceWriteRequest,
    LockSpaceReadRequest,
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSpaceRequest {
    pub index: u32,
    pub buffer: Blob,
    pub authorization_value: Blob,
}

impl Message for WriteSpaceRequest {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, index),
        field!(2, buffer),
        field!(3, authorization_value),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSpaceResponse {
    pub buffer: Blob,
}

impl Message for ReadSpaceResponse {
    const FIELDS: &'static [Field<Self>] = &[field!(1, buffer)];
}

tagged_union! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RequestPayload: Command {
        GetInfo(GetInfoRequest),
        CreateSpace(CreateSpaceRequest),
        GetSpaceInfo(GetSpaceInfoRequest),
        DeleteSpace(DeleteSpaceRequest),
        DisableCreate(DisableCreateRequest),
        WriteSpace(WriteSpaceRequest),
        ReadSpace(ReadSpaceRequest),
        LockSpaceWrite(LockSpaceWriteRequest),
        LockSpaceRead(LockSpaceReadRequest),
        WipeStorage(WipeStorageRequest),
        DisableWipe(DisableWipeRequest),
    }
}

tagged_union! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ResponsePayload: Command {
        GetInfo(GetInfoResponse),
        CreateSpace(CreateSpaceResponse),
        GetSpaceInfo(GetSpaceInfoResponse),
        DeleteSpace(DeleteSpaceResponse),
        DisableCreate(DisableCreateResponse),
        WriteSpace(WriteSpaceResponse),
        ReadSpace(ReadSpaceResponse),
        LockSpaceWrite(LockSpaceWriteResponse),
        LockSpaceRead(LockSpaceReadResponse),
        WipeStorage(WipeStorageResponse),
        DisableWipe(DisableWipeResponse),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub payload: RequestPayload,
}

impl Message for Request {
    const FIELDS: &'static [Field<Self>] = &[
        oneof!(1, payload, Command::GetInfo),
        oneof!(2, payload, Command::CreateSpace),
        oneof!(3, payload, Command::GetSpaceInfo),
        oneof!(4, payload, Command::DeleteSpace),
        oneof!(5, payload, Command::DisableCreate),
        oneof!(6, payload, Command::WriteSpace),
        oneof!(7, payload, Command::ReadSpace),
        oneof!(8, payload, Command::LockSpaceWrite),
        oneof!(9, payload, Command::LockSpaceRead),
        oneof!(10, payload, Command::WipeStorage),
        oneof!(11, payload, Command::DisableWipe),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub result: ResultCode,
    pub payload: ResponsePayload,
}

impl Response {
    /// Response carrying only a status, with the payload matching `command`.
    pub fn status(command: Command, result: ResultCode) -> Self {
        let mut payload = ResponsePayload::default();
        crate::union::TaggedUnion::activate_tag(&mut payload, command);
        Self { result, payload }
    }
}

impl Message for Response {
    const FIELDS: &'static [Field<Self>] = &[
        field!(1, result),
        oneof!(2, payload, Command::GetInfo),
        oneof!(3, payload, Command::CreateSpace),
        oneof!(4, payload, Command::GetSpaceInfo),
        oneof!(5, payload, Command::DeleteSpace),
        oneof!(6, payload, Command::DisableCreate),
        oneof!(7, payload, Command::WriteSpace),
        oneof!(8, payload, Command::ReadSpace),
        oneof!(9, payload, Command::LockSpaceWrite),
        oneof!(10, payload, Command::LockSpaceRead),
        oneof!(11, payload, Command::WipeStorage),
        oneof!(12, payload, Command::DisableWipe),
    ];
}
