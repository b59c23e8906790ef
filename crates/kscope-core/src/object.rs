//! # Objects
//!
//! A typed value produced by resolution. An [`Object`] is one of:
//!
//! - **Value**: an immediate byte buffer (with optional bit-field geometry)
//! - **Reference**: a memory address or register to be read on demand
//! - **Absent**: exists conceptually but has no value (optimized out)
//!
//! Objects never hold the memory backend. Reading a reference goes through
//! the [`MemoryReader`] passed to [`Object::materialize`], and every call reads
//! the target again; use [`Object::snapshot`] to freeze a reference into a
//! value. A reference is only meaningful against the backend of the program
//! that produced it.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kscope_core::memory::SegmentMemory;
//! use kscope_core::object::Object;
//! use kscope_core::types::{ByteOrder, CPrimitive};
//!
//! let int = Arc::new(CPrimitive::Int.build(8));
//! let object = Object::from_signed(int, -2, ByteOrder::Little)?;
//! assert_eq!(object.read_signed(&SegmentMemory::new())?, -2);
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{KscopeError, Result};
use crate::memory::{Location, MemoryReader, RegisterId};
use crate::types::{Address, ByteOrder, Type, TypeKind};

/// Which representation an object has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind
{
    Value,
    Reference,
    Absent,
}

/// Geometry of a bit-field: `size` bits starting `offset` bits into the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField
{
    pub offset: u8,
    pub size: u64,
}

impl BitField
{
    fn byte_len(self) -> usize
    {
        usize::try_from((u64::from(self.offset) + self.size).div_ceil(8)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Repr
{
    Value(SmallVec<[u8; 16]>),
    Reference(Location),
    Absent,
}

/// A typed, located value
#[derive(Debug, Clone, PartialEq)]
pub struct Object
{
    ty: Arc<Type>,
    byte_order: ByteOrder,
    bit_field: Option<BitField>,
    repr: Repr,
}

fn type_size(ty: &Type) -> Result<usize>
{
    ty.byte_size()
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| KscopeError::InvalidArgument(format!("cannot take the size of incomplete type {ty}")))
}

fn integer_width(ty: &Type) -> Result<usize>
{
    let size = type_size(ty)?;
    if size == 0 || size > 8 {
        return Err(KscopeError::InvalidArgument(format!("unsupported integer size {size} for {ty}")));
    }
    Ok(size)
}

fn truncate(value: u64, bits: u64) -> u64
{
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn sign_extend(value: u64, bits: u64) -> i64
{
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

fn extract_bits(bytes: &[u8], order: ByteOrder, field: BitField) -> u64
{
    let raw = match order {
        ByteOrder::Little => bytes.iter().rev().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)),
        ByteOrder::Big => bytes.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)),
    };
    let shift = match order {
        ByteOrder::Little => u64::from(field.offset),
        // big-endian bit offsets count from the most significant bit
        ByteOrder::Big => (bytes.len() as u64 * 8).saturating_sub(u64::from(field.offset) + field.size),
    };
    truncate((raw >> shift) as u64, field.size)
}

impl Object
{
    /// Value object from raw bytes
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the buffer length differs from the type size.
    pub fn from_bytes(ty: Arc<Type>, bytes: &[u8], byte_order: ByteOrder) -> Result<Self>
    {
        let size = type_size(&ty)?;
        if bytes.len() != size {
            return Err(KscopeError::InvalidArgument(format!(
                "{} bytes given for {ty} of size {size}",
                bytes.len()
            )));
        }
        Ok(Self {
            ty,
            byte_order,
            bit_field: None,
            repr: Repr::Value(SmallVec::from_slice(bytes)),
        })
    }

    /// Value object for an integer-like type, truncating `value` to its width
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the type is not an integer, boolean or pointer.
    pub fn from_unsigned(ty: Arc<Type>, value: u64, byte_order: ByteOrder) -> Result<Self>
    {
        if !ty.is_integer_like() {
            return Err(KscopeError::InvalidArgument(format!("{ty} is not an integer type")));
        }
        let size = integer_width(&ty)?;
        let bytes = byte_order.encode(value, size);
        Self::from_bytes(ty, &bytes, byte_order)
    }

    /// Value object for a signed integer, in two's complement
    ///
    /// ## Errors
    ///
    /// Same as [`Object::from_unsigned`].
    pub fn from_signed(ty: Arc<Type>, value: i64, byte_order: ByteOrder) -> Result<Self>
    {
        Self::from_unsigned(ty, value as u64, byte_order)
    }

    /// Value object for a bit-field of an integer type
    ///
    /// The buffer must be exactly `ceil((bit_offset + bit_size) / 8)` bytes.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for a non-integer type, a bit size wider than the
    /// type, a bit offset of 8 or more, or a mis-sized buffer.
    pub fn bit_field(ty: Arc<Type>, bytes: &[u8], bit_offset: u8, bit_size: u64, byte_order: ByteOrder) -> Result<Self>
    {
        let field = Self::check_bit_field(&ty, bit_offset, bit_size)?;
        if bytes.len() != field.byte_len() {
            return Err(KscopeError::InvalidArgument(format!(
                "bit-field of {bit_size} bits at offset {bit_offset} needs {} bytes, got {}",
                field.byte_len(),
                bytes.len()
            )));
        }
        Ok(Self {
            ty,
            byte_order,
            bit_field: Some(field),
            repr: Repr::Value(SmallVec::from_slice(bytes)),
        })
    }

    fn check_bit_field(ty: &Type, bit_offset: u8, bit_size: u64) -> Result<BitField>
    {
        if !ty.is_integer_like() {
            return Err(KscopeError::InvalidArgument(format!("bit-field of non-integer type {ty}")));
        }
        let width = integer_width(ty)? as u64 * 8;
        if bit_size == 0 || bit_size > width || bit_offset >= 8 {
            return Err(KscopeError::InvalidArgument(format!(
                "invalid bit-field geometry {bit_offset}+{bit_size} for {ty}"
            )));
        }
        Ok(BitField {
            offset: bit_offset,
            size: bit_size,
        })
    }

    /// Reference to memory at `address`
    pub fn reference(ty: Arc<Type>, address: Address, byte_order: ByteOrder) -> Self
    {
        Self {
            ty,
            byte_order,
            bit_field: None,
            repr: Repr::Reference(Location::Memory(address)),
        }
    }

    /// Reference to a bit-field in memory
    ///
    /// ## Errors
    ///
    /// Same geometry checks as [`Object::bit_field`].
    pub fn reference_bits(
        ty: Arc<Type>,
        address: Address,
        bit_offset: u8,
        bit_size: u64,
        byte_order: ByteOrder,
    ) -> Result<Self>
    {
        let field = Self::check_bit_field(&ty, bit_offset, bit_size)?;
        Ok(Self {
            ty,
            byte_order,
            bit_field: Some(field),
            repr: Repr::Reference(Location::Memory(address)),
        })
    }

    /// Reference to a register-resident value
    pub fn register(ty: Arc<Type>, register: RegisterId, byte_order: ByteOrder) -> Self
    {
        Self {
            ty,
            byte_order,
            bit_field: None,
            repr: Repr::Reference(Location::Register(register)),
        }
    }

    /// Object without a value (optimized out)
    pub fn absent(ty: Arc<Type>) -> Self
    {
        Self {
            ty,
            byte_order: ByteOrder::Little,
            bit_field: None,
            repr: Repr::Absent,
        }
    }

    pub fn ty(&self) -> &Arc<Type>
    {
        &self.ty
    }

    pub fn kind(&self) -> ObjectKind
    {
        match self.repr {
            Repr::Value(_) => ObjectKind::Value,
            Repr::Reference(_) => ObjectKind::Reference,
            Repr::Absent => ObjectKind::Absent,
        }
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        self.byte_order
    }

    pub fn bit_field_geometry(&self) -> Option<BitField>
    {
        self.bit_field
    }

    pub fn location(&self) -> Option<Location>
    {
        match self.repr {
            Repr::Reference(location) => Some(location),
            _ => None,
        }
    }

    /// Memory address of a reference object
    pub fn address(&self) -> Option<Address>
    {
        match self.repr {
            Repr::Reference(Location::Memory(address)) => Some(address),
            _ => None,
        }
    }

    fn storage_len(&self) -> Result<usize>
    {
        match self.bit_field {
            Some(field) => Ok(field.byte_len()),
            None => type_size(&self.ty),
        }
    }

    /// The object's bytes
    ///
    /// Values return their buffer; references perform exactly one read of
    /// the type's size at their location (nothing is cached).
    ///
    /// ## Errors
    ///
    /// - `NoValue` for absent objects
    /// - `Fault`/`Io` from the memory backend, unchanged
    /// - `InvalidArgument` when referencing an incomplete type
    pub fn materialize<'a>(&'a self, memory: &dyn MemoryReader) -> Result<Cow<'a, [u8]>>
    {
        match &self.repr {
            Repr::Value(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            Repr::Reference(location) => {
                let length = self.storage_len()?;
                tracing::trace!(%location, length, ty = %self.ty, "materializing reference");
                memory.read(*location, length).map(Cow::Owned)
            }
            Repr::Absent => Err(KscopeError::NoValue),
        }
    }

    /// Read a reference once and return it as a value object
    ///
    /// ## Errors
    ///
    /// Same as [`Object::materialize`], except that absent objects are
    /// returned unchanged.
    pub fn snapshot(&self, memory: &dyn MemoryReader) -> Result<Self>
    {
        match &self.repr {
            Repr::Reference(_) => {
                let bytes = self.materialize(memory)?;
                Ok(Self {
                    ty: Arc::clone(&self.ty),
                    byte_order: self.byte_order,
                    bit_field: self.bit_field,
                    repr: Repr::Value(SmallVec::from_slice(&bytes)),
                })
            }
            _ => Ok(self.clone()),
        }
    }

    fn raw_integer(&self, memory: &dyn MemoryReader) -> Result<(u64, u64)>
    {
        if !self.ty.is_integer_like() {
            return Err(KscopeError::InvalidCast {
                from: self.ty.to_string(),
                to: "integer".to_string(),
            });
        }
        let bytes = self.materialize(memory)?;
        match self.bit_field {
            Some(field) => Ok((extract_bits(&bytes, self.byte_order, field), field.size)),
            None => {
                let width = integer_width(&self.ty)?;
                Ok((self.byte_order.decode(&bytes), width as u64 * 8))
            }
        }
    }

    /// Integer value, zero-extended
    ///
    /// ## Errors
    ///
    /// `InvalidCast` for non-integer types, plus everything
    /// [`Object::materialize`] can return.
    pub fn read_unsigned(&self, memory: &dyn MemoryReader) -> Result<u64>
    {
        self.raw_integer(memory).map(|(value, _)| value)
    }

    /// Integer value, sign-extended from the type (or bit-field) width
    ///
    /// ## Errors
    ///
    /// Same as [`Object::read_unsigned`].
    pub fn read_signed(&self, memory: &dyn MemoryReader) -> Result<i64>
    {
        self.raw_integer(memory).map(|(value, bits)| sign_extend(value, bits))
    }

    /// Floating-point value of a `float` or `double`
    ///
    /// ## Errors
    ///
    /// `InvalidCast` for non-float types.
    pub fn read_float(&self, memory: &dyn MemoryReader) -> Result<f64>
    {
        if !matches!(self.ty.kind(), TypeKind::Float) {
            return Err(KscopeError::InvalidCast {
                from: self.ty.to_string(),
                to: "double".to_string(),
            });
        }
        let bytes = self.materialize(memory)?;
        let raw = self.byte_order.decode(&bytes);
        match bytes.len() {
            4 => Ok(f64::from(f32::from_bits(raw as u32))),
            8 => Ok(f64::from_bits(raw)),
            size => Err(KscopeError::InvalidArgument(format!("unsupported float size {size}"))),
        }
    }

    /// Convert to another type with C cast semantics
    ///
    /// - integer/bool/pointer → integer/bool/pointer: sign- or zero-extend
    ///   from the source, truncate to the target (`_Bool` becomes 0 or 1)
    /// - float → float: precision change
    /// - identical compound layouts: reinterpretation (references stay
    ///   references)
    /// - anything else (including integer ↔ float): `InvalidCast`
    ///
    /// ## Errors
    ///
    /// `InvalidCast`, `NoValue` for absent objects, and memory errors.
    pub fn cast(&self, memory: &dyn MemoryReader, target: Arc<Type>) -> Result<Self>
    {
        if matches!(self.repr, Repr::Absent) {
            return Err(KscopeError::NoValue);
        }
        let invalid = || KscopeError::InvalidCast {
            from: self.ty.to_string(),
            to: target.to_string(),
        };

        if self.ty.is_integer_like() && target.is_integer_like() {
            let value = if self.ty.is_signed() {
                self.read_signed(memory)? as u64
            } else {
                self.read_unsigned(memory)?
            };
            let value = if matches!(target.kind(), TypeKind::Bool) {
                u64::from(value != 0)
            } else {
                value
            };
            return Self::from_unsigned(target, value, self.byte_order);
        }

        if matches!(self.ty.kind(), TypeKind::Float) && matches!(target.kind(), TypeKind::Float) {
            let value = self.read_float(memory)?;
            let bytes = match type_size(&target)? {
                4 => self.byte_order.encode(u64::from((value as f32).to_bits()), 4),
                8 => self.byte_order.encode(value.to_bits(), 8),
                _ => return Err(invalid()),
            };
            return Self::from_bytes(target, &bytes, self.byte_order);
        }

        if !self.ty.is_scalar() && !target.is_scalar() && self.ty.same_shape(&target) {
            let mut object = self.clone();
            object.ty = target;
            return Ok(object);
        }

        Err(invalid())
    }

    /// Access a struct or union member
    ///
    /// References yield references at the member's address; values yield the
    /// member's slice of the buffer; absent objects yield absent members.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the type has no such member or the object lives
    /// in a register.
    pub fn member(&self, name: &str) -> Result<Self>
    {
        let member = self
            .ty
            .member(name)
            .ok_or_else(|| KscopeError::InvalidArgument(format!("{} has no member {name}", self.ty)))?;
        let ty = Arc::clone(&member.ty);
        match &self.repr {
            Repr::Reference(Location::Memory(address)) => {
                Ok(Self::reference(ty, *address + member.offset, self.byte_order))
            }
            Repr::Reference(Location::Register(_)) => Err(KscopeError::InvalidArgument(format!(
                "cannot access member {name} of a register value"
            ))),
            Repr::Value(bytes) => {
                let size = type_size(&ty)?;
                let start = usize::try_from(member.offset)
                    .map_err(|_| KscopeError::InvalidArgument(format!("member {name} out of range")))?;
                let slice = bytes
                    .get(start..start + size)
                    .ok_or_else(|| KscopeError::InvalidArgument(format!("member {name} out of range")))?;
                Self::from_bytes(ty, slice, self.byte_order)
            }
            Repr::Absent => Ok(Self::absent(ty)),
        }
    }

    /// Pointer to a memory reference
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` unless the object references memory.
    pub fn address_of(&self, word_size: u8) -> Result<Self>
    {
        match (&self.repr, self.bit_field) {
            (Repr::Reference(Location::Memory(address)), None) => {
                let pointer = Arc::new(Type::pointer(Arc::clone(&self.ty), word_size));
                Self::from_unsigned(pointer, address.value(), self.byte_order)
            }
            _ => Err(KscopeError::InvalidArgument("cannot take the address of this object".to_string())),
        }
    }

    fn pointee(&self) -> Result<&Arc<Type>>
    {
        match self.ty.kind() {
            TypeKind::Pointer { referent } => Ok(referent),
            _ => Err(KscopeError::InvalidArgument(format!("{} is not a pointer", self.ty))),
        }
    }

    /// Pointer arithmetic: `self + index`, scaled by the referent size
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for non-pointers or pointers to incomplete types.
    pub fn pointer_add(&self, memory: &dyn MemoryReader, index: i64) -> Result<Self>
    {
        let stride = type_size(self.pointee()?)? as i64;
        let base = Address::from(self.read_unsigned(memory)?);
        let width = integer_width(&self.ty)? as u8;
        let address = base.wrapping_offset(index.wrapping_mul(stride)).truncate(width);
        Self::from_unsigned(Arc::clone(&self.ty), address.value(), self.byte_order)
    }

    /// Element distance `self - other` between two pointers of the same type
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for non-pointers or zero-sized referents.
    pub fn pointer_diff(&self, memory: &dyn MemoryReader, other: &Object) -> Result<i64>
    {
        let stride = type_size(self.pointee()?)? as i64;
        if stride == 0 {
            return Err(KscopeError::InvalidArgument("pointer difference of zero-sized type".to_string()));
        }
        let lhs = self.read_unsigned(memory)?;
        let rhs = other.read_unsigned(memory)?;
        Ok((lhs.wrapping_sub(rhs) as i64) / stride)
    }

    /// The object a pointer points to, as a reference
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for non-pointers, plus memory errors reading the
    /// pointer itself.
    pub fn deref(&self, memory: &dyn MemoryReader) -> Result<Self>
    {
        let referent = Arc::clone(self.pointee()?);
        let address = self.read_unsigned(memory)?;
        Ok(Self::reference(referent, Address::from(address), self.byte_order))
    }

    /// Bytes of a character array up to (not including) the first NUL
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` unless the type is an array of 1-byte integers.
    pub fn read_c_string(&self, memory: &dyn MemoryReader) -> Result<Vec<u8>>
    {
        match self.ty.kind() {
            TypeKind::Array { element, .. } if element.is_integer_like() && element.byte_size() == Some(1) => {
                let bytes = self.materialize(memory)?;
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                Ok(bytes[..end].to_vec())
            }
            _ => Err(KscopeError::InvalidArgument(format!("{} is not a character array", self.ty))),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::memory::SegmentMemory;
    use crate::types::{CPrimitive, Member};

    fn prim(p: CPrimitive) -> Arc<Type>
    {
        Arc::new(p.build(8))
    }

    #[test]
    fn test_value_length_must_match_type()
    {
        let int = prim(CPrimitive::Int);
        assert!(Object::from_bytes(Arc::clone(&int), &[0; 4], ByteOrder::Little).is_ok());
        assert!(Object::from_bytes(int, &[0; 8], ByteOrder::Little).is_err());
    }

    #[test]
    fn test_absent_has_no_value()
    {
        let memory = SegmentMemory::new();
        let object = Object::absent(prim(CPrimitive::Long));
        assert!(matches!(object.materialize(&memory), Err(KscopeError::NoValue)));
        assert!(matches!(object.cast(&memory, prim(CPrimitive::Int)), Err(KscopeError::NoValue)));
        assert_eq!(object.kind(), ObjectKind::Absent);
    }

    #[test]
    fn test_reference_reads_live_memory()
    {
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x1000), vec![0x2a, 0, 0, 0]).unwrap();
        let object = Object::reference(prim(CPrimitive::UnsignedInt), Address::from(0x1000), ByteOrder::Little);
        assert_eq!(object.read_unsigned(&memory).unwrap(), 42);
        let frozen = object.snapshot(&memory).unwrap();
        assert_eq!(frozen.kind(), ObjectKind::Value);
        assert_eq!(frozen.read_unsigned(&SegmentMemory::new()).unwrap(), 42);
    }

    #[test]
    fn test_big_endian_integer()
    {
        let memory = SegmentMemory::new();
        let object = Object::from_bytes(prim(CPrimitive::UnsignedShort), &[0x12, 0x34], ByteOrder::Big).unwrap();
        assert_eq!(object.read_unsigned(&memory).unwrap(), 0x1234);
    }

    #[test]
    fn test_cast_sign_extension_and_truncation()
    {
        let memory = SegmentMemory::new();
        let minus_one = Object::from_signed(prim(CPrimitive::Int), -1, ByteOrder::Little).unwrap();
        let widened = minus_one.cast(&memory, prim(CPrimitive::UnsignedLong)).unwrap();
        assert_eq!(widened.read_unsigned(&memory).unwrap(), u64::MAX);

        let big = Object::from_unsigned(prim(CPrimitive::UnsignedLong), 0x1_0000_0102, ByteOrder::Little).unwrap();
        let narrowed = big.cast(&memory, prim(CPrimitive::UnsignedChar)).unwrap();
        assert_eq!(narrowed.read_unsigned(&memory).unwrap(), 2);

        let as_bool = big.cast(&memory, prim(CPrimitive::Bool)).unwrap();
        assert_eq!(as_bool.read_unsigned(&memory).unwrap(), 1);
    }

    #[test]
    fn test_cast_pointer_to_integer()
    {
        let memory = SegmentMemory::new();
        let pointer_ty = Arc::new(Type::pointer(prim(CPrimitive::Void), 8));
        let pointer = Object::from_unsigned(pointer_ty, 0xffff_8880_0000_1000, ByteOrder::Little).unwrap();
        let value = pointer.cast(&memory, prim(CPrimitive::UnsignedLong)).unwrap();
        assert_eq!(value.read_unsigned(&memory).unwrap(), 0xffff_8880_0000_1000);
    }

    #[test]
    fn test_cast_compound_to_scalar_is_invalid()
    {
        let memory = SegmentMemory::new();
        let list_head = Arc::new(Type::structure("list_head", 16, Vec::new()));
        let object = Object::from_bytes(list_head, &[0; 16], ByteOrder::Little).unwrap();
        let err = object.cast(&memory, prim(CPrimitive::UnsignedLong)).unwrap_err();
        assert!(matches!(err, KscopeError::InvalidCast { .. }));
        assert!(err.to_string().contains("struct list_head"));
    }

    #[test]
    fn test_cast_integer_to_float_is_invalid()
    {
        let memory = SegmentMemory::new();
        let int = Object::from_signed(prim(CPrimitive::Int), 3, ByteOrder::Little).unwrap();
        assert!(matches!(
            int.cast(&memory, prim(CPrimitive::Double)),
            Err(KscopeError::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_float_promotion()
    {
        let memory = SegmentMemory::new();
        let bytes = 1.5f32.to_bits().to_le_bytes();
        let float = Object::from_bytes(prim(CPrimitive::Float), &bytes, ByteOrder::Little).unwrap();
        let double = float.cast(&memory, prim(CPrimitive::Double)).unwrap();
        assert!((double.read_float(&memory).unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bit_fields()
    {
        let memory = SegmentMemory::new();
        let uint = prim(CPrimitive::UnsignedInt);
        // 5 bits starting at bit 3 of 0b1011_1000 => 0b10111
        let le = Object::bit_field(Arc::clone(&uint), &[0b1011_1000], 3, 5, ByteOrder::Little).unwrap();
        assert_eq!(le.read_unsigned(&memory).unwrap(), 0b10111);
        assert_eq!(le.read_signed(&memory).unwrap(), -9);

        // big-endian: 4 bits starting at the second most significant bit
        let be = Object::bit_field(Arc::clone(&uint), &[0b0110_1000], 1, 4, ByteOrder::Big).unwrap();
        assert_eq!(be.read_unsigned(&memory).unwrap(), 0b1101);

        assert!(Object::bit_field(Arc::clone(&uint), &[0, 0], 3, 5, ByteOrder::Little).is_err());
        assert!(Object::bit_field(uint, &[0; 5], 0, 33, ByteOrder::Little).is_err());
    }

    #[test]
    fn test_member_of_reference_and_value()
    {
        let ulong = prim(CPrimitive::UnsignedLong);
        let atomic = Arc::new(Type::structure(
            "atomic_long_t",
            8,
            vec![Member::new("counter", Arc::clone(&ulong), 0)],
        ));
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x2000), 7u64.to_le_bytes().to_vec()).unwrap();

        let reference = Object::reference(Arc::clone(&atomic), Address::from(0x2000), ByteOrder::Little);
        let counter = reference.member("counter").unwrap();
        assert_eq!(counter.address(), Some(Address::from(0x2000)));
        assert_eq!(counter.read_unsigned(&memory).unwrap(), 7);

        let value = reference.snapshot(&memory).unwrap();
        assert_eq!(value.member("counter").unwrap().read_unsigned(&memory).unwrap(), 7);
        assert!(value.member("missing").is_err());
    }

    #[test]
    fn test_pointer_arithmetic()
    {
        let memory = SegmentMemory::new();
        let page = Arc::new(Type::structure("page", 64, Vec::new()));
        let pointer_ty = Arc::new(Type::pointer(page, 8));
        let base = Object::from_unsigned(pointer_ty, 0xffffea0000000000, ByteOrder::Little).unwrap();
        let third = base.pointer_add(&memory, 3).unwrap();
        assert_eq!(third.read_unsigned(&memory).unwrap(), 0xffffea0000000000 + 3 * 64);
        assert_eq!(third.pointer_diff(&memory, &base).unwrap(), 3);
        let back = third.pointer_add(&memory, -3).unwrap();
        assert_eq!(back, base);
    }

    #[test]
    fn test_pointer_to_incomplete_type_cannot_be_indexed()
    {
        let memory = SegmentMemory::new();
        let pointer_ty = Arc::new(Type::pointer(Arc::new(Type::incomplete_struct("page")), 8));
        let pointer = Object::from_unsigned(pointer_ty, 0x1000, ByteOrder::Little).unwrap();
        assert!(pointer.pointer_add(&memory, 1).is_err());
    }

    #[test]
    fn test_address_of_and_deref()
    {
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x3000), vec![9, 0, 0, 0]).unwrap();
        let int = prim(CPrimitive::Int);
        let reference = Object::reference(int, Address::from(0x3000), ByteOrder::Little);
        let pointer = reference.address_of(8).unwrap();
        assert_eq!(pointer.read_unsigned(&memory).unwrap(), 0x3000);
        assert_eq!(pointer.deref(&memory).unwrap().read_signed(&memory).unwrap(), 9);
    }

    #[test]
    fn test_register_reference()
    {
        let mut memory = SegmentMemory::new();
        memory.set_register(RegisterId(0), 5u64.to_le_bytes().to_vec());
        let object = Object::register(prim(CPrimitive::Long), RegisterId(0), ByteOrder::Little);
        assert_eq!(object.read_signed(&memory).unwrap(), 5);
        assert!(object.address().is_none());
    }

    #[test]
    fn test_c_string()
    {
        let memory = SegmentMemory::new();
        let array = Arc::new(Type::array(prim(CPrimitive::Char), Some(6)));
        let object = Object::from_bytes(array, b"6.1.0\0", ByteOrder::Little).unwrap();
        assert_eq!(object.read_c_string(&memory).unwrap(), b"6.1.0");
    }
}
