//! # Body marshaller
//!
//! Type-directed JSON ⇄ typed-value codec. The shape of every payload is
//! described once, at handler registration, as a [`MarshalTarget`] tagged
//! union; both directions of the codec walk that target instead of
//! discovering types per call. Decoding produces a [`Decoded`] value tree
//! whose record fields can carry [`crate::presence::Presence`] wrappers, so a
//! decoded-then-re-encoded patch object round-trips field omission exactly.
//!
//! Decode failures are request-scoped: a representation mismatch maps to
//! 400, an unsupported target shape to 500; neither touches other in-flight
//! requests. Encoding never fails.

mod decode;
mod encode;
mod target;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use target::{FieldTarget, MarshalTarget, ScalarKind};
pub use value::Decoded;
