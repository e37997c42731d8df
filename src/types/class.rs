use std::sync::atomic::{AtomicU32, Ordering};

/// Stable identifier for a marshallable type class.
///
/// Ids are dense: both mapping directions index dispatch tables directly by
/// `ClassId`, growing the table on demand. Builtin classes occupy a fixed
/// prefix; host-defined classes are allocated past it with
/// [`ClassId::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

static NEXT_CLASS: AtomicU32 = AtomicU32::new(ClassId::BUILTIN_COUNT);

impl ClassId {
    /// UTF-8 text.
    pub const TEXT: ClassId = ClassId(0);
    /// Boolean.
    pub const BOOL: ClassId = ClassId(1);
    /// Signed 8-bit integer.
    pub const INT8: ClassId = ClassId(2);
    /// Unsigned 8-bit integer.
    pub const UINT8: ClassId = ClassId(3);
    /// Signed 16-bit integer.
    pub const INT16: ClassId = ClassId(4);
    /// Unsigned 16-bit integer.
    pub const UINT16: ClassId = ClassId(5);
    /// Signed 32-bit integer.
    pub const INT32: ClassId = ClassId(6);
    /// Unsigned 32-bit integer.
    pub const UINT32: ClassId = ClassId(7);
    /// Signed 64-bit integer.
    pub const INT64: ClassId = ClassId(8);
    /// Unsigned 64-bit integer.
    pub const UINT64: ClassId = ClassId(9);
    /// 32-bit float.
    pub const FLOAT32: ClassId = ClassId(10);
    /// 64-bit float.
    pub const FLOAT64: ClassId = ClassId(11);
    /// Type-erased "any" value; concrete type inferred from the wire tag.
    pub const ANY: ClassId = ClassId(12);
    /// Enumeration with a declared interpretation type.
    pub const ENUM: ClassId = ClassId(13);
    /// Object with declared fields.
    pub const OBJECT: ClassId = ClassId(14);
    /// Growable ordered sequence.
    pub const VECTOR: ClassId = ClassId(15);
    /// Ordered sequence.
    pub const LIST: ClassId = ClassId(16);
    /// Unordered set.
    pub const SET: ClassId = ClassId(17);
    /// Ordered string-keyed map.
    pub const PAIR_LIST: ClassId = ClassId(18);
    /// Unordered string-keyed map.
    pub const UNORDERED_MAP: ClassId = ClassId(19);

    /// Number of builtin classes; custom ids start here.
    pub const BUILTIN_COUNT: u32 = 20;

    /// Allocates a fresh class id for a host-defined type.
    pub fn register() -> ClassId {
        ClassId(NEXT_CLASS.fetch_add(1, Ordering::Relaxed))
    }

    /// Table index for this id.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether the id is one of the builtin classes.
    pub fn is_builtin(self) -> bool {
        self.0 < Self::BUILTIN_COUNT
    }
}
