//! Table-driven encoding of message structs.
//!
//! A type opts in by implementing [`Message`] with a static list of [`Field`]s,
//! usually built with the [`field!`](crate::field) and [`oneof!`](crate::oneof)
//! macros:
//!
//! ```ignore
//! impl Message for NvramSpace {
//!     const FIELDS: &'static [Field<Self>] = &[
//!         field!(1, flags),
//!         field!(2, controls),
//!         field!(3, authorization_value),
//!         field!(4, contents),
//!     ];
//! }
//! ```
//!
//! Encoding walks the table in declared order. Decoding dispatches each wire
//! record to the entry with the same field number and skips records no entry
//! claims, so older readers accept newer writers.

use alloc::vec::Vec;

use log::trace;

use crate::blob::Blob;
pub use crate::error::CodecError;
use crate::stream::{
    BlobOutputStream, CountingOutputStream, InputStream, OutputStream, SliceInputStream,
    SliceOutputStream,
};
use crate::union::TaggedUnion;
use crate::wire::{ProtoReader, ProtoWriter};

/// A struct with a field table.
pub trait Message: Default + 'static {
    /// Field table. Numbers must be unique and are never reused across versions.
    const FIELDS: &'static [Field<Self>];
}

/// One entry of a message's field table.
pub struct Field<M> {
    pub number: u32,
    pub encode: fn(&M, u32, &mut ProtoWriter<'_>) -> Result<(), CodecError>,
    pub decode: fn(&mut M, &mut ProtoReader<'_>) -> Result<(), CodecError>,
}

/// Wire representation of a single member value.
pub trait FieldCodec {
    /// Emit zero or more records for `self` under `number`.
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError>;

    /// Merge the record the reader is positioned on into `self`.
    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError>;
}

impl FieldCodec for u64 {
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        writer.write_varint(number, *self)
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        *self = reader.read_varint()?;
        Ok(())
    }
}

impl FieldCodec for u32 {
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        writer.write_varint(number, u64::from(*self))
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        let value = reader.read_varint()?;
        *self = u32::try_from(value).map_err(|_| CodecError::IntegerOverflow {
            field: reader.field_number(),
        })?;
        Ok(())
    }
}

impl FieldCodec for bool {
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        writer.write_varint(number, u64::from(*self))
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        *self = reader.read_varint()? != 0;
        Ok(())
    }
}

impl FieldCodec for Blob {
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        writer.write_length_delimited(number, self.as_slice())
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        reader.read_length_delimited(self)
    }
}

/// Repeated field: one record per element, decoded records are appended.
impl<T> FieldCodec for Vec<T>
where
    T: FieldCodec + Default,
{
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        self.iter()
            .try_for_each(|item| item.encode_field(number, writer))
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        let mut item = T::default();
        item.decode_field(reader)?;
        self.push(item);
        Ok(())
    }
}

/// Optional field: nothing is written when empty.
impl<T> FieldCodec for Option<T>
where
    T: FieldCodec + Default,
{
    fn encode_field(&self, number: u32, writer: &mut ProtoWriter<'_>) -> Result<(), CodecError> {
        match self {
            Some(value) => value.encode_field(number, writer),
            None => Ok(()),
        }
    }

    fn decode_field(&mut self, reader: &mut ProtoReader<'_>) -> Result<(), CodecError> {
        self.get_or_insert_with(T::default).decode_field(reader)
    }
}

/// A [`TaggedUnion`] whose members can be addressed by oneof field entries.
pub trait OneOf: TaggedUnion {
    /// Write the active member under `number`, but only if it is the `tag` member.
    fn encode_member(
        &self,
        tag: Self::Tag,
        number: u32,
        writer: &mut ProtoWriter<'_>,
    ) -> Result<(), CodecError>;

    /// Activate the `tag` member and decode the current record into it.
    fn decode_member(
        &mut self,
        tag: Self::Tag,
        reader: &mut ProtoReader<'_>,
    ) -> Result<(), CodecError>;
}

/// Field table entry for a plain member implementing [`FieldCodec`].
#[macro_export]
macro_rules! field {
    ($number:expr, $member:ident) => {
        $crate::codec::Field {
            number: $number,
            encode: |message, number, writer| {
                $crate::codec::FieldCodec::encode_field(&message.$member, number, writer)
            },
            decode: |message, reader| {
                $crate::codec::FieldCodec::decode_field(&mut message.$member, reader)
            },
        }
    };
}

/// Field table entry binding `number` to the `tag` member of a oneof union.
#[macro_export]
macro_rules! oneof {
    ($number:expr, $member:ident, $tag:expr) => {
        $crate::codec::Field {
            number: $number,
            encode: |message, number, writer| {
                $crate::codec::OneOf::encode_member(&message.$member, $tag, number, writer)
            },
            decode: |message, reader| {
                $crate::codec::OneOf::decode_member(&mut message.$member, $tag, reader)
            },
        }
    };
}

pub fn encode<M: Message>(message: &M, stream: &mut dyn OutputStream) -> Result<(), CodecError> {
    let mut writer = ProtoWriter::new(stream);
    for field in M::FIELDS {
        (field.encode)(message, field.number, &mut writer)?;
    }
    Ok(())
}

/// Decode records until the stream is exhausted.
///
/// On failure `message` may hold a mix of old and decoded values.
pub fn decode<M: Message>(message: &mut M, stream: &mut dyn InputStream) -> Result<(), CodecError> {
    let mut reader = ProtoReader::new(stream);
    while !reader.done() {
        reader.read_wire_tag()?;
        let number = reader.field_number();
        match M::FIELDS.iter().find(|field| field.number == number) {
            Some(field) => (field.decode)(message, &mut reader)?,
            None => {
                trace!("skipping unknown field {number}");
                reader.skip_field()?;
            }
        }
    }
    Ok(())
}

/// Size of the encoding of `message`, measured without buffering it.
pub fn encoded_size<M: Message>(message: &M) -> Result<usize, CodecError> {
    let mut counter = CountingOutputStream::new();
    encode(message, &mut counter)?;
    Ok(counter.bytes_written())
}

/// Encode into `blob`, resizing it to exactly the encoded length.
pub fn encode_to_blob<M: Message>(message: &M, blob: &mut Blob) -> Result<(), CodecError> {
    let mut stream = BlobOutputStream::new(blob);
    encode(message, &mut stream)?;
    stream.truncate();
    Ok(())
}

/// Encode into a caller buffer and return the number of bytes used.
pub fn encode_to_slice<M: Message>(message: &M, buffer: &mut [u8]) -> Result<usize, CodecError> {
    let mut stream = SliceOutputStream::new(buffer);
    encode(message, &mut stream)?;
    Ok(stream.bytes_written())
}

/// Decode a message that must occupy all of `data`.
pub fn decode_from_slice<M: Message>(data: &[u8], message: &mut M) -> Result<(), CodecError> {
    let mut stream = SliceInputStream::new(data);
    decode(message, &mut stream)?;
    if !stream.done() {
        return Err(CodecError::TrailingData);
    }
    Ok(())
}

pub fn decode_from_blob<M: Message>(blob: &Blob, message: &mut M) -> Result<(), CodecError> {
    decode_from_slice(blob.as_slice(), message)
}

/// Write `message` as a length-delimited sub-record, streaming the body after its size.
pub fn encode_message_field<M: Message>(
    message: &M,
    number: u32,
    writer: &mut ProtoWriter<'_>,
) -> Result<(), CodecError> {
    let size = encoded_size(message)?;
    writer.write_length_header(number, size)?;
    encode(message, writer.stream())
}

/// Decode the current length-delimited record as a sub-message.
pub fn decode_message_field<M: Message>(
    message: &mut M,
    reader: &mut ProtoReader<'_>,
) -> Result<(), CodecError> {
    let field = reader.field_number();
    let mut nested = reader.nested()?;
    decode(message, &mut nested)?;
    if nested.remaining() != 0 {
        return Err(CodecError::Truncated { field });
    }
    Ok(())
}
