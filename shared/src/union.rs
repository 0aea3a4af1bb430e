//! Closed unions of message types with a tag per member.
//!
//! [`tagged_union!`](crate::tagged_union) declares an enum whose variants each
//! wrap a distinct message type and whose tag enum names the variants. Members
//! are addressed by type:
//!
//! ```ignore
//! let mut payload = RequestPayload::default();
//! payload.activate::<ReadSpaceRequest>().index = 3;
//! assert_eq!(payload.which(), Command::ReadSpace);
//! assert!(payload.get::<WriteSpaceRequest>().is_none());
//! ```
//!
//! Every union also implements [`OneOf`](crate::codec::OneOf), so a message
//! can map a run of field numbers onto it with [`oneof!`](crate::oneof).

/// Tag and activation access shared by every generated union.
pub trait TaggedUnion: Default {
    type Tag: Copy + Eq + core::fmt::Debug;

    /// Tag of the active member.
    fn which(&self) -> Self::Tag;

    /// Replace the active member with a default-constructed `tag` member.
    fn activate_tag(&mut self, tag: Self::Tag);
}

/// Typed access to member `M` of a union.
pub trait Variant<M>: TaggedUnion {
    const TAG: Self::Tag;

    fn member(&self) -> Option<&M>;

    fn member_mut(&mut self) -> Option<&mut M>;

    /// Drop the active member and make a fresh default `M` active.
    fn activate_member(&mut self) -> &mut M;
}

/// Declare a tagged union over message types.
///
/// The tag enum must already exist and have exactly one variant per union
/// member, with matching names. The first member is active by default.
#[macro_export]
macro_rules! tagged_union {
    (@variant $name:ident, $tag:ident, $variant:ident, $ty:ty) => {
        impl $crate::union::Variant<$ty> for $name {
            const TAG: $tag = $tag::$variant;

            fn member(&self) -> Option<&$ty> {
                match self {
                    Self::$variant(value) => Some(value),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            fn member_mut(&mut self) -> Option<&mut $ty> {
                match self {
                    Self::$variant(value) => Some(value),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            fn activate_member(&mut self) -> &mut $ty {
                *self = Self::$variant(<$ty as Default>::default());
                match self {
                    Self::$variant(value) => value,
                    #[allow(unreachable_patterns)]
                    _ => unreachable!("member was just activated"),
                }
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $tag:ident {
            $first:ident($first_ty:ty)
            $(, $variant:ident($variant_ty:ty))* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $first($first_ty),
            $($variant($variant_ty),)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$first(<$first_ty as Default>::default())
            }
        }

        impl $name {
            pub fn which(&self) -> $tag {
                match self {
                    Self::$first(_) => $tag::$first,
                    $(Self::$variant(_) => $tag::$variant,)*
                }
            }

            pub fn get<M>(&self) -> Option<&M>
            where
                Self: $crate::union::Variant<M>,
            {
                <Self as $crate::union::Variant<M>>::member(self)
            }

            pub fn get_mut<M>(&mut self) -> Option<&mut M>
            where
                Self: $crate::union::Variant<M>,
            {
                <Self as $crate::union::Variant<M>>::member_mut(self)
            }

            /// Make a default `M` the active member, discarding the previous one
            /// even if it already was an `M`.
            pub fn activate<M>(&mut self) -> &mut M
            where
                Self: $crate::union::Variant<M>,
            {
                <Self as $crate::union::Variant<M>>::activate_member(self)
            }
        }

        impl $crate::union::TaggedUnion for $name {
            type Tag = $tag;

            fn which(&self) -> $tag {
                $name::which(self)
            }

            fn activate_tag(&mut self, tag: $tag) {
                *self = match tag {
                    $tag::$first => Self::$first(<$first_ty as Default>::default()),
                    $($tag::$variant => Self::$variant(<$variant_ty as Default>::default()),)*
                };
            }
        }

        $crate::tagged_union!(@variant $name, $tag, $first, $first_ty);
        $($crate::tagged_union!(@variant $name, $tag, $variant, $variant_ty);)*

        impl $crate::codec::OneOf for $name {
            fn encode_member(
                &self,
                tag: $tag,
                number: u32,
                writer: &mut $crate::wire::ProtoWriter<'_>,
            ) -> Result<(), $crate::error::CodecError> {
                if $name::which(self) != tag {
                    return Ok(());
                }
                match self {
                    Self::$first(value) => {
                        $crate::codec::encode_message_field(value, number, writer)
                    }
                    $(Self::$variant(value) => {
                        $crate::codec::encode_message_field(value, number, writer)
                    })*
                }
            }

            fn decode_member(
                &mut self,
                tag: $tag,
                reader: &mut $crate::wire::ProtoReader<'_>,
            ) -> Result<(), $crate::error::CodecError> {
                $crate::union::TaggedUnion::activate_tag(self, tag);
                match self {
                    Self::$first(value) => {
                        $crate::codec::decode_message_field(value, reader)
                    }
                    $(Self::$variant(value) => {
                        $crate::codec::decode_message_field(value, reader)
                    })*
                }
            }
        }
    };
}
