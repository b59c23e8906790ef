//! C type model shared by objects and catalogs.
//!
//! The debug-info parser that produces these types lives outside this crate;
//! the core only needs enough structure to size values, convert scalars, and
//! walk struct members. Types are shared through `Arc` so an [`Object`] can
//! point into a catalog without owning it.
//!
//! [`Object`]: crate::object::Object

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// C type qualifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 0b01;
        const VOLATILE = 0b10;
    }
}

/// A named member of a struct or union at a byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Member
{
    pub name: String,
    pub ty: Arc<Type>,
    pub offset: u64,
}

impl Member
{
    pub fn new(name: impl Into<String>, ty: Arc<Type>, offset: u64) -> Self
    {
        Self {
            name: name.into(),
            ty,
            offset,
        }
    }
}

/// Structural kind of a type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind
{
    Void,
    Bool,
    Int
    {
        signed: bool,
    },
    Float,
    Pointer
    {
        referent: Arc<Type>,
    },
    Array
    {
        element: Arc<Type>,
        length: Option<u64>,
    },
    Struct
    {
        members: Vec<Member>,
    },
    Union
    {
        members: Vec<Member>,
    },
    Function,
}

/// A (possibly qualified) C type
///
/// `size` is `None` for incomplete types (`void`, forward-declared structs,
/// functions, flexible arrays).
#[derive(Debug, Clone, PartialEq)]
pub struct Type
{
    name: Option<String>,
    size: Option<u64>,
    kind: TypeKind,
    qualifiers: Qualifiers,
}

impl Type
{
    fn with(name: Option<String>, size: Option<u64>, kind: TypeKind) -> Self
    {
        Self {
            name,
            size,
            kind,
            qualifiers: Qualifiers::empty(),
        }
    }

    pub fn void() -> Self
    {
        Self::with(Some("void".into()), None, TypeKind::Void)
    }

    pub fn bool(name: impl Into<String>, size: u64) -> Self
    {
        Self::with(Some(name.into()), Some(size), TypeKind::Bool)
    }

    pub fn int(name: impl Into<String>, size: u64, signed: bool) -> Self
    {
        Self::with(Some(name.into()), Some(size), TypeKind::Int { signed })
    }

    pub fn float(name: impl Into<String>, size: u64) -> Self
    {
        Self::with(Some(name.into()), Some(size), TypeKind::Float)
    }

    pub fn pointer(referent: Arc<Type>, word_size: u8) -> Self
    {
        Self::with(None, Some(u64::from(word_size)), TypeKind::Pointer { referent })
    }

    /// Array of `length` elements; `None` is a flexible/incomplete array
    pub fn array(element: Arc<Type>, length: Option<u64>) -> Self
    {
        let size = match (element.size, length) {
            (Some(elem), Some(len)) => elem.checked_mul(len),
            _ => None,
        };
        Self::with(None, size, TypeKind::Array { element, length })
    }

    /// `struct tag` with a known layout
    pub fn structure(tag: impl Into<String>, size: u64, members: Vec<Member>) -> Self
    {
        Self::with(Some(tag.into()), Some(size), TypeKind::Struct { members })
    }

    /// Forward-declared `struct tag` with no layout
    pub fn incomplete_struct(tag: impl Into<String>) -> Self
    {
        Self::with(Some(tag.into()), None, TypeKind::Struct { members: Vec::new() })
    }

    pub fn union(tag: impl Into<String>, size: u64, members: Vec<Member>) -> Self
    {
        Self::with(Some(tag.into()), Some(size), TypeKind::Union { members })
    }

    pub fn function(name: impl Into<String>) -> Self
    {
        Self::with(Some(name.into()), None, TypeKind::Function)
    }

    /// Copy of this type with additional qualifiers
    #[must_use]
    pub fn qualified(&self, qualifiers: Qualifiers) -> Self
    {
        let mut ty = self.clone();
        ty.qualifiers |= qualifiers;
        ty
    }

    pub fn kind(&self) -> &TypeKind
    {
        &self.kind
    }

    pub fn qualifiers(&self) -> Qualifiers
    {
        self.qualifiers
    }

    /// Size in bytes, if the type is complete
    pub fn byte_size(&self) -> Option<u64>
    {
        self.size
    }

    /// Tag or base name without qualifiers or `struct` keyword
    pub fn tag(&self) -> Option<&str>
    {
        self.name.as_deref()
    }

    /// Integers, booleans, floats and pointers
    pub fn is_scalar(&self) -> bool
    {
        matches!(
            self.kind,
            TypeKind::Bool | TypeKind::Int { .. } | TypeKind::Float | TypeKind::Pointer { .. }
        )
    }

    /// Scalars that convert through integer rules
    pub fn is_integer_like(&self) -> bool
    {
        matches!(self.kind, TypeKind::Bool | TypeKind::Int { .. } | TypeKind::Pointer { .. })
    }

    pub fn is_signed(&self) -> bool
    {
        matches!(self.kind, TypeKind::Int { signed: true })
    }

    pub fn is_pointer(&self) -> bool
    {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    /// Look up a direct member of a struct or union
    pub fn member(&self, name: &str) -> Option<&Member>
    {
        match &self.kind {
            TypeKind::Struct { members } | TypeKind::Union { members } => members.iter().find(|m| m.name == name),
            _ => None,
        }
    }

    /// Whether two types have the same structure, ignoring qualifiers
    pub fn same_shape(&self, other: &Type) -> bool
    {
        self.name == other.name && self.size == other.size && self.kind == other.kind
    }
}

impl fmt::Display for Type
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.qualifiers.contains(Qualifiers::CONST) {
            f.write_str("const ")?;
        }
        if self.qualifiers.contains(Qualifiers::VOLATILE) {
            f.write_str("volatile ")?;
        }
        let name = self.name.as_deref().unwrap_or("<anonymous>");
        match &self.kind {
            TypeKind::Struct { .. } => write!(f, "struct {name}"),
            TypeKind::Union { .. } => write!(f, "union {name}"),
            TypeKind::Pointer { referent } => write!(f, "{referent} *"),
            TypeKind::Array { element, length } => match length {
                Some(len) => write!(f, "{element} [{len}]"),
                None => write!(f, "{element} []"),
            },
            _ => f.write_str(name),
        }
    }
}

/// C primitive types whose sizes depend only on the platform word size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CPrimitive
{
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Bool,
    Float,
    Double,
    Void,
}

impl CPrimitive
{
    const COUNT: usize = 15;

    /// Every primitive, in declaration order
    const ALL: [CPrimitive; Self::COUNT] = [
        CPrimitive::Char,
        CPrimitive::SignedChar,
        CPrimitive::UnsignedChar,
        CPrimitive::Short,
        CPrimitive::UnsignedShort,
        CPrimitive::Int,
        CPrimitive::UnsignedInt,
        CPrimitive::Long,
        CPrimitive::UnsignedLong,
        CPrimitive::LongLong,
        CPrimitive::UnsignedLongLong,
        CPrimitive::Bool,
        CPrimitive::Float,
        CPrimitive::Double,
        CPrimitive::Void,
    ];

    pub const fn spelling(self) -> &'static str
    {
        match self {
            CPrimitive::Char => "char",
            CPrimitive::SignedChar => "signed char",
            CPrimitive::UnsignedChar => "unsigned char",
            CPrimitive::Short => "short",
            CPrimitive::UnsignedShort => "unsigned short",
            CPrimitive::Int => "int",
            CPrimitive::UnsignedInt => "unsigned int",
            CPrimitive::Long => "long",
            CPrimitive::UnsignedLong => "unsigned long",
            CPrimitive::LongLong => "long long",
            CPrimitive::UnsignedLongLong => "unsigned long long",
            CPrimitive::Bool => "_Bool",
            CPrimitive::Float => "float",
            CPrimitive::Double => "double",
            CPrimitive::Void => "void",
        }
    }

    /// Build the type for a target with the given word size (LP64 / ILP32)
    pub fn build(self, word_size: u8) -> Type
    {
        let long = u64::from(word_size);
        let name = self.spelling();
        match self {
            CPrimitive::Char | CPrimitive::SignedChar => Type::int(name, 1, true),
            CPrimitive::UnsignedChar => Type::int(name, 1, false),
            CPrimitive::Short => Type::int(name, 2, true),
            CPrimitive::UnsignedShort => Type::int(name, 2, false),
            CPrimitive::Int => Type::int(name, 4, true),
            CPrimitive::UnsignedInt => Type::int(name, 4, false),
            CPrimitive::Long => Type::int(name, long, true),
            CPrimitive::UnsignedLong => Type::int(name, long, false),
            CPrimitive::LongLong => Type::int(name, 8, true),
            CPrimitive::UnsignedLongLong => Type::int(name, 8, false),
            CPrimitive::Bool => Type::bool(name, 1),
            CPrimitive::Float => Type::float(name, 4),
            CPrimitive::Double => Type::float(name, 8),
            CPrimitive::Void => Type::void(),
        }
    }
}

/// Lookup of types by their C spelling (`"unsigned long"`, `"struct page"`)
///
/// Implemented by the external debug-info catalog. The core only reads from
/// it, so implementations must be shareable across threads.
pub trait TypeCatalog: Send + Sync
{
    fn find_type(&self, name: &str) -> Option<Arc<Type>>;
}

/// Catalog of the C primitive types for one word size
#[derive(Debug, Clone)]
pub struct PrimitiveTypes
{
    /// Indexed by `CPrimitive` discriminant
    types: [Arc<Type>; CPrimitive::COUNT],
}

impl PrimitiveTypes
{
    #[must_use]
    pub fn new(word_size: u8) -> Self
    {
        Self {
            types: CPrimitive::ALL.map(|primitive| Arc::new(primitive.build(word_size))),
        }
    }

    /// The shared instance of a primitive
    pub fn get(&self, primitive: CPrimitive) -> Arc<Type>
    {
        Arc::clone(&self.types[primitive as usize])
    }
}

impl TypeCatalog for PrimitiveTypes
{
    fn find_type(&self, name: &str) -> Option<Arc<Type>>
    {
        CPrimitive::ALL
            .iter()
            .find(|p| p.spelling() == name)
            .map(|p| self.get(*p))
    }
}

/// Simple name-keyed type catalog
///
/// Useful for embedding a handful of known layouts (for example
/// `struct page`) without a full debug-info parser.
#[derive(Debug, Clone, Default)]
pub struct TypeMap
{
    types: HashMap<String, Arc<Type>>,
}

impl TypeMap
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register a type under its display name (e.g. `struct page`)
    pub fn insert(&mut self, ty: Type) -> Arc<Type>
    {
        let ty = Arc::new(ty);
        self.types.insert(ty.to_string(), Arc::clone(&ty));
        ty
    }
}

impl TypeCatalog for TypeMap
{
    fn find_type(&self, name: &str) -> Option<Arc<Type>>
    {
        self.types.get(name).cloned()
    }
}
