#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod blob;
pub mod codec;
pub mod error;
pub mod schema;
pub mod stream;
pub mod union;
pub mod wire;

pub use blob::Blob;
pub use codec::{Field, FieldCodec, Message, OneOf};
pub use error::CodecError;
pub use union::{TaggedUnion, Variant};
