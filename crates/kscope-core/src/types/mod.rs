//! # Types
//!
//! Target-agnostic value types used throughout kscope: addresses, the target
//! architecture and byte order, and the C type model objects are typed with.

pub mod address;
pub mod arch;
pub mod ctype;

pub use address::Address;
pub use arch::{Architecture, ByteOrder};
pub use ctype::{CPrimitive, Member, PrimitiveTypes, Qualifiers, Type, TypeCatalog, TypeKind, TypeMap};
