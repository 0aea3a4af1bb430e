//! Protobuf-compatible low-level wire format: varints, wire tags and
//! length-delimited framing.

use crate::blob::Blob;
use crate::error::CodecError;
use crate::stream::{EndOfStream, InputStream, NestedInputStream, OutputStream};

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encoding of the value that follows a wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(CodecError::InvalidWireType(other)),
        }
    }
}

impl From<WireType> for u8 {
    fn from(value: WireType) -> Self {
        value as u8
    }
}

/// Combine a field number and wire type into a tag value.
pub const fn make_tag(field_number: u32, wire_type: WireType) -> u64 {
    ((field_number as u64) << 3) | wire_type as u64
}

pub fn encode_varint<S>(stream: &mut S, mut value: u64) -> Result<(), EndOfStream>
where
    S: OutputStream + ?Sized,
{
    while value >= 0x80 {
        stream.write_byte((value as u8) | 0x80)?;
        value >>= 7;
    }
    stream.write_byte(value as u8)
}

pub fn decode_varint<S>(stream: &mut S) -> Result<u64, CodecError>
where
    S: InputStream + ?Sized,
{
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = stream.read_byte()?;
        let payload = u64::from(byte & 0x7F);
        // The tenth byte only has room for the top bit of a u64.
        if shift == 63 && payload > 1 {
            return Err(CodecError::VarintOverflow);
        }

        value |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(CodecError::VarintOverflow)
}

/// Number of bytes [`encode_varint`] emits for `value`.
pub const fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Pulls wire records off an [`InputStream`] one tag at a time.
pub struct ProtoReader<'a> {
    stream: &'a mut dyn InputStream,
    field_number: u32,
    wire_type: WireType,
    field_size: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(stream: &'a mut dyn InputStream) -> Self {
        Self {
            stream,
            field_number: 0,
            wire_type: WireType::Varint,
            field_size: 0,
        }
    }

    /// Field number of the tag most recently read.
    pub const fn field_number(&self) -> u32 {
        self.field_number
    }

    pub const fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Payload size for length-delimited and fixed-width records, zero otherwise.
    pub const fn field_size(&self) -> usize {
        self.field_size
    }

    pub fn done(&mut self) -> bool {
        self.stream.done()
    }

    /// Decode the next tag. For length-delimited records this also consumes the size prefix.
    pub fn read_wire_tag(&mut self) -> Result<(), CodecError> {
        let tag = decode_varint(&mut *self.stream)?;
        let wire_type = WireType::try_from((tag & 0x7) as u8)?;
        let field_number =
            u32::try_from(tag >> 3).map_err(|_| CodecError::FieldNumberOverflow(tag >> 3))?;

        let field_size = match wire_type {
            WireType::LengthDelimited => {
                let size = decode_varint(&mut *self.stream)?;
                usize::try_from(size).map_err(|_| CodecError::SizeOverflow(size))?
            }
            WireType::Fixed64 => 8,
            WireType::Fixed32 => 4,
            WireType::Varint | WireType::StartGroup | WireType::EndGroup => 0,
        };

        self.field_number = field_number;
        self.wire_type = wire_type;
        self.field_size = field_size;
        Ok(())
    }

    /// Fail unless the current record has `expected` wire type.
    pub fn expect_wire_type(&self, expected: WireType) -> Result<(), CodecError> {
        if self.wire_type != expected {
            return Err(CodecError::WireTypeMismatch {
                field: self.field_number,
                expected,
                found: self.wire_type,
            });
        }
        Ok(())
    }

    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        self.expect_wire_type(WireType::Varint)?;
        decode_varint(&mut *self.stream)
    }

    /// Read the payload of a length-delimited record into `blob`, replacing its contents.
    ///
    /// The blob grows with the bytes actually present, so a forged size cannot force a
    /// large allocation up front.
    pub fn read_length_delimited(&mut self, blob: &mut Blob) -> Result<(), CodecError> {
        self.expect_wire_type(WireType::LengthDelimited)?;
        blob.resize(0);

        let mut remaining = self.field_size;
        while remaining > 0 {
            if !self.stream.fill() {
                return Err(CodecError::Truncated {
                    field: self.field_number,
                });
            }

            let chunk = self.stream.chunk();
            let len = chunk.len().min(remaining);
            blob.extend_from_slice(&chunk[..len]);
            self.stream.consume(len);
            remaining -= len;
        }

        Ok(())
    }

    /// Stream over the payload of the current length-delimited record.
    pub fn nested(&mut self) -> Result<NestedInputStream<'_>, CodecError> {
        self.expect_wire_type(WireType::LengthDelimited)?;
        Ok(NestedInputStream::new(&mut *self.stream, self.field_size))
    }

    /// Consume the current record's value without interpreting it.
    pub fn skip_field(&mut self) -> Result<(), CodecError> {
        match self.wire_type {
            WireType::Varint => decode_varint(&mut *self.stream).map(drop),
            WireType::StartGroup | WireType::EndGroup => Ok(()),
            WireType::Fixed64 | WireType::Fixed32 | WireType::LengthDelimited => self
                .stream
                .skip(self.field_size)
                .map_err(|_| CodecError::Truncated {
                    field: self.field_number,
                }),
        }
    }
}

/// Emits wire records into an [`OutputStream`].
pub struct ProtoWriter<'a> {
    stream: &'a mut dyn OutputStream,
}

impl<'a> ProtoWriter<'a> {
    pub fn new(stream: &'a mut dyn OutputStream) -> Self {
        Self { stream }
    }

    /// Raw access for payload bytes following a [`write_length_header`](Self::write_length_header).
    pub fn stream(&mut self) -> &mut dyn OutputStream {
        &mut *self.stream
    }

    pub fn write_wire_tag(
        &mut self,
        field_number: u32,
        wire_type: WireType,
    ) -> Result<(), CodecError> {
        encode_varint(&mut *self.stream, make_tag(field_number, wire_type))?;
        Ok(())
    }

    pub fn write_varint(&mut self, field_number: u32, value: u64) -> Result<(), CodecError> {
        self.write_wire_tag(field_number, WireType::Varint)?;
        encode_varint(&mut *self.stream, value)?;
        Ok(())
    }

    pub fn write_length_delimited(
        &mut self,
        field_number: u32,
        data: &[u8],
    ) -> Result<(), CodecError> {
        self.write_length_header(field_number, data.len())?;
        self.stream.write(data)?;
        Ok(())
    }

    /// Write only the tag and size of a length-delimited record; the caller streams the payload.
    pub fn write_length_header(
        &mut self,
        field_number: u32,
        size: usize,
    ) -> Result<(), CodecError> {
        self.write_wire_tag(field_number, WireType::LengthDelimited)?;
        encode_varint(&mut *self.stream, size as u64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{BlobOutputStream, ChunkedInputStream, SliceInputStream};
    use alloc::vec::Vec;

    fn encode(value: u64) -> Vec<u8> {
        let mut blob = Blob::new();
        let mut stream = BlobOutputStream::new(&mut blob);
        encode_varint(&mut stream, value).expect("encode varint");
        stream.truncate();
        blob.to_vec()
    }

    #[test]
    fn varint_round_trips() {
        for value in [0, 1, 127, 128, 300, 16_383, 16_384, (1 << 63) - 1, u64::MAX] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), varint_len(value), "length of {value}");
            let mut stream = SliceInputStream::new(&bytes);
            assert_eq!(decode_varint(&mut stream), Ok(value));
            assert!(stream.done());
        }
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(127), [0x7F]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(300), [0xAC, 0x02]);
        assert_eq!(encode(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn varint_rejects_overlong_input() {
        let eleven = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x81, 0x00];
        let mut stream = SliceInputStream::new(&eleven);
        assert_eq!(decode_varint(&mut stream), Err(CodecError::VarintOverflow));

        let too_wide = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        let mut stream = SliceInputStream::new(&too_wide);
        assert_eq!(decode_varint(&mut stream), Err(CodecError::VarintOverflow));
    }

    #[test]
    fn varint_reports_truncation() {
        let mut stream = SliceInputStream::new(&[0x80, 0x80]);
        assert_eq!(decode_varint(&mut stream), Err(CodecError::EndOfStream));
    }

    #[test]
    fn tag_and_payload_across_small_windows() {
        let mut blob = Blob::new();
        let mut out = BlobOutputStream::new(&mut blob);
        let mut writer = ProtoWriter::new(&mut out);
        writer.write_varint(3, 300).expect("varint");
        writer
            .write_length_delimited(0x4E5648, b"payload")
            .expect("bytes");
        out.truncate();

        let mut input = ChunkedInputStream::new(&blob, 1);
        let mut reader = ProtoReader::new(&mut input);
        reader.read_wire_tag().expect("first tag");
        assert_eq!(reader.field_number(), 3);
        assert_eq!(reader.read_varint(), Ok(300));

        reader.read_wire_tag().expect("second tag");
        assert_eq!(reader.field_number(), 0x4E5648);
        assert_eq!(reader.wire_type(), WireType::LengthDelimited);
        assert_eq!(reader.field_size(), 7);
        let mut payload = Blob::new();
        reader.read_length_delimited(&mut payload).expect("payload");
        assert_eq!(payload.as_slice(), b"payload");
        assert!(reader.done());
    }

    #[test]
    fn accessor_checks_wire_type() {
        let mut input = SliceInputStream::new(&[0x0A, 0x01, 0x00]);
        let mut reader = ProtoReader::new(&mut input);
        reader.read_wire_tag().expect("tag");
        assert_eq!(
            reader.read_varint(),
            Err(CodecError::WireTypeMismatch {
                field: 1,
                expected: WireType::Varint,
                found: WireType::LengthDelimited,
            })
        );
    }

    #[test]
    fn rejects_reserved_wire_types() {
        let mut input = SliceInputStream::new(&[0x0E]);
        let mut reader = ProtoReader::new(&mut input);
        assert_eq!(reader.read_wire_tag(), Err(CodecError::InvalidWireType(6)));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_length_is_not_preallocated() {
        // Field 1, length-delimited, declared size 2^40 followed by two bytes.
        let mut bytes = Vec::from([0x0A]);
        bytes.extend(encode(1 << 40));
        bytes.extend_from_slice(b"hi");

        let mut input = SliceInputStream::new(&bytes);
        let mut reader = ProtoReader::new(&mut input);
        reader.read_wire_tag().expect("tag fits in a 64-bit usize");
        let mut payload = Blob::new();
        assert_eq!(
            reader.read_length_delimited(&mut payload),
            Err(CodecError::Truncated { field: 1 })
        );
        assert_eq!(payload.as_slice(), b"hi");
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn size_beyond_usize_is_rejected() {
        let mut bytes = Vec::from([0x0A]);
        bytes.extend(encode(u64::from(u32::MAX) + 1));
        let mut input = SliceInputStream::new(&bytes);
        let mut reader = ProtoReader::new(&mut input);
        assert_eq!(
            reader.read_wire_tag(),
            Err(CodecError::SizeOverflow(u64::from(u32::MAX) + 1))
        );
    }

    #[test]
    fn skips_every_wire_type() {
        let mut bytes = Vec::new();
        bytes.extend(encode(make_tag(1, WireType::Varint)));
        bytes.extend(encode(u64::MAX));
        bytes.extend(encode(make_tag(2, WireType::Fixed64)));
        bytes.extend_from_slice(&[1; 8]);
        bytes.extend(encode(make_tag(3, WireType::Fixed32)));
        bytes.extend_from_slice(&[2; 4]);
        bytes.extend(encode(make_tag(4, WireType::StartGroup)));
        bytes.extend(encode(make_tag(4, WireType::EndGroup)));
        bytes.extend(encode(make_tag(5, WireType::LengthDelimited)));
        bytes.extend(encode(3));
        bytes.extend_from_slice(b"abc");

        let mut input = SliceInputStream::new(&bytes);
        let mut reader = ProtoReader::new(&mut input);
        let mut seen = Vec::new();
        while !reader.done() {
            reader.read_wire_tag().expect("tag");
            seen.push(reader.field_number());
            reader.skip_field().expect("skip");
        }
        assert_eq!(seen, [1, 2, 3, 4, 4, 5]);
    }

    #[test]
    fn skip_reports_truncated_payload() {
        let mut input = SliceInputStream::new(&[0x0D, 0x01, 0x02]);
        let mut reader = ProtoReader::new(&mut input);
        reader.read_wire_tag().expect("fixed32 tag");
        assert_eq!(reader.skip_field(), Err(CodecError::Truncated { field: 1 }));
    }
}
