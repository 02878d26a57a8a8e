//! SQL type system and the type-definition registry capability.
//!
//! Column types in the schema graph are opaque [`TypeDefinition`] handles
//! minted by a [`TypeRegistry`]. A definition carries two identities: the
//! logical [`DataType`] and the underlying [`StorageClass`]. The graph
//! uses the storage class to decide whether a type change invalidates a
//! column default and whether two foreign-key column types are compatible.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// SQL data types understood by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Small integer (16-bit).
    SmallInt,
    /// Unbounded text.
    Text,
    /// Variable-length character string.
    Varchar(u32),
    /// Fixed-length character string.
    Char(u32),
    /// Boolean.
    Boolean,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Decimal with precision and scale.
    Decimal(u8, u8),
    /// Binary large object.
    Blob,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
}

impl DataType {
    /// Returns the underlying storage class of the type.
    #[must_use]
    pub const fn storage_class(&self) -> StorageClass {
        match self {
            Self::Integer | Self::BigInt | Self::SmallInt | Self::Boolean => StorageClass::Integer,
            Self::Text
            | Self::Varchar(_)
            | Self::Char(_)
            | Self::DateTime
            | Self::Date
            | Self::Time
            | Self::Json
            | Self::Uuid => StorageClass::Text,
            Self::Real | Self::Double => StorageClass::Real,
            Self::Decimal(_, _) => StorageClass::Numeric,
            Self::Blob => StorageClass::Blob,
        }
    }
}

impl fmt::Display for DataType {
    /// Renders the dialect-agnostic canonical spelling of the type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Text => write!(f, "TEXT"),
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::Char(len) => write!(f, "CHAR({len})"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::DateTime => write!(f, "TIMESTAMP"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Real => write!(f, "REAL"),
            Self::Double => write!(f, "DOUBLE PRECISION"),
            Self::Decimal(p, s) => write!(f, "DECIMAL({p}, {s})"),
            Self::Blob => write!(f, "BLOB"),
            Self::Json => write!(f, "JSON"),
            Self::Uuid => write!(f, "UUID"),
        }
    }
}

/// Underlying storage classes shared by several logical types.
///
/// Two logical types with the same storage class hold their values
/// identically on disk, so a change between them preserves column
/// defaults; a change across classes does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Integral storage.
    Integer,
    /// Character storage.
    Text,
    /// Floating-point storage.
    Real,
    /// Exact-numeric storage.
    Numeric,
    /// Binary storage.
    Blob,
}

/// Identity of a registry instance.
///
/// Every registry mints definitions stamped with its own id; the graph
/// root rejects definitions minted by a registry other than the one it
/// was constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    /// Allocates a fresh process-unique registry id.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// An opaque, registry-minted column type handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDefinition {
    data_type: DataType,
    registry: RegistryId,
}

impl TypeDefinition {
    /// Mints a definition. Registries call this; the schema graph never
    /// constructs definitions itself.
    #[must_use]
    pub const fn new(data_type: DataType, registry: RegistryId) -> Self {
        Self {
            data_type,
            registry,
        }
    }

    /// Returns the logical data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the underlying storage class.
    #[must_use]
    pub const fn storage_class(&self) -> StorageClass {
        self.data_type.storage_class()
    }

    /// Returns the id of the registry that minted this definition.
    #[must_use]
    pub const fn registry(&self) -> RegistryId {
        self.registry
    }
}

/// The type-definition registry capability consumed by the schema graph.
pub trait TypeRegistry {
    /// Returns this registry's identity.
    fn id(&self) -> RegistryId;

    /// Returns the registry's default column type.
    fn default_type(&self) -> TypeDefinition;

    /// Resolves a logical data type to a definition, if the registry
    /// supports it.
    fn by_data_type(&self, data_type: &DataType) -> Option<TypeDefinition>;

    /// Returns whether an origin foreign-key column of type `origin` may
    /// reference a column of type `referenced`.
    fn compatible(&self, origin: &TypeDefinition, referenced: &TypeDefinition) -> bool {
        origin.storage_class() == referenced.storage_class()
    }
}

/// Rust types with a canonical SQL data type.
pub trait SqlTyped {
    /// The SQL data type this Rust type maps to.
    const DATA_TYPE: DataType;
}

impl SqlTyped for i16 {
    const DATA_TYPE: DataType = DataType::SmallInt;
}
impl SqlTyped for i32 {
    const DATA_TYPE: DataType = DataType::Integer;
}
impl SqlTyped for i64 {
    const DATA_TYPE: DataType = DataType::BigInt;
}
impl SqlTyped for bool {
    const DATA_TYPE: DataType = DataType::Boolean;
}
impl SqlTyped for f32 {
    const DATA_TYPE: DataType = DataType::Real;
}
impl SqlTyped for f64 {
    const DATA_TYPE: DataType = DataType::Double;
}
impl SqlTyped for String {
    const DATA_TYPE: DataType = DataType::Text;
}
impl SqlTyped for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Blob;
}

/// Generic lookups over any registry.
pub trait TypeRegistryExt: TypeRegistry {
    /// Resolves the definition for a Rust type.
    fn by_rust<T: SqlTyped>(&self) -> Option<TypeDefinition> {
        self.by_data_type(&T::DATA_TYPE)
    }
}

impl<R: TypeRegistry + ?Sized> TypeRegistryExt for R {}

/// The stock registry: supports every [`DataType`], defaults to
/// [`DataType::BigInt`], and treats types as foreign-key compatible when
/// their storage classes match.
#[derive(Debug)]
pub struct StandardTypeRegistry {
    id: RegistryId,
}

impl StandardTypeRegistry {
    /// Creates a registry with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: RegistryId::next(),
        }
    }
}

impl Default for StandardTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for StandardTypeRegistry {
    fn id(&self) -> RegistryId {
        self.id
    }

    fn default_type(&self) -> TypeDefinition {
        TypeDefinition::new(DataType::BigInt, self.id)
    }

    fn by_data_type(&self, data_type: &DataType) -> Option<TypeDefinition> {
        Some(TypeDefinition::new(data_type.clone(), self.id))
    }
}
