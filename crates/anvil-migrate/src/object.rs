//! Schema object representation.
//!
//! Every schema object lives in a single arena on the [`Database`] root
//! and is addressed by a stable [`ObjectId`]. Typed wrapper ids give
//! compile-time kind safety at the public API; ownership and dependency
//! edges are id sets, never embedded pointers, so back-references and
//! reference cycles (e.g. a self-referencing foreign key) need no
//! special treatment.
//!
//! [`Database`]: crate::Database

use anvil_sql_core::expr::{SqlExpr, ViewQuery};
use anvil_sql_core::types::TypeDefinition;
use indexmap::IndexMap;
use serde::Serialize;

/// Stable arena handle of a schema object. Slots are never reused;
/// removed objects stay in the arena flagged as removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) ObjectId);

        impl $name {
            /// Returns the untyped arena handle.
            #[must_use]
            pub const fn id(self) -> ObjectId {
                self.0
            }
        }

        impl From<$name> for ObjectId {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(
    /// Handle of a schema.
    SchemaId
);
typed_id!(
    /// Handle of a table.
    TableId
);
typed_id!(
    /// Handle of a column.
    ColumnId
);
typed_id!(
    /// Handle of an index.
    IndexId
);
typed_id!(
    /// Handle of a primary key.
    PrimaryKeyId
);
typed_id!(
    /// Handle of a foreign key.
    ForeignKeyId
);
typed_id!(
    /// Handle of a check constraint.
    CheckId
);
typed_id!(
    /// Handle of a view.
    ViewId
);

/// The kind tag of a schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Schema,
    Table,
    Column,
    PrimaryKey,
    Index,
    ForeignKey,
    Check,
    View,
}

impl ObjectKind {
    /// Returns the display name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Column => "column",
            Self::PrimaryKey => "primary key",
            Self::Index => "index",
            Self::ForeignKey => "foreign key",
            Self::Check => "check",
            Self::View => "view",
        }
    }
}

/// Property identity, used both as the tag on dependency edges ("X uses
/// Y via property P") and as the change descriptor in the tracker.
///
/// Declaration order is the stable descriptor index that orders alter
/// sub-actions inside a finalized batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PropertyTag {
    Name,
    ColumnType,
    Nullable,
    DefaultValue,
    Computation,
    Unique,
    Virtual,
    Filter,
    OnDelete,
    OnUpdate,
    Source,
    OriginIndex,
    ReferencedIndex,
}

impl PropertyTag {
    /// Returns the display name of the property.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::ColumnType => "ColumnType",
            Self::Nullable => "Nullable",
            Self::DefaultValue => "DefaultValue",
            Self::Computation => "Computation",
            Self::Unique => "Unique",
            Self::Virtual => "Virtual",
            Self::Filter => "Filter",
            Self::OnDelete => "OnDelete",
            Self::OnUpdate => "OnUpdate",
            Self::Source => "Source",
            Self::OriginIndex => "OriginIndex",
            Self::ReferencedIndex => "ReferencedIndex",
        }
    }
}

/// Sort direction of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Returns the default-name token suffix for this direction.
    #[must_use]
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Ascending => "A",
            Self::Descending => "D",
        }
    }
}

/// What an index column indexes: a plain column or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexExpr {
    /// A plain column of the table.
    Column(ColumnId),
    /// An arbitrary expression over the table's columns.
    Expression(SqlExpr),
}

/// One ordered entry of an index's column list.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    /// The indexed column or expression.
    pub expr: IndexExpr,
    /// Sort direction.
    pub order: SortOrder,
}

impl IndexColumn {
    /// An ascending plain-column entry.
    #[must_use]
    pub const fn asc(column: ColumnId) -> Self {
        Self {
            expr: IndexExpr::Column(column),
            order: SortOrder::Ascending,
        }
    }

    /// A descending plain-column entry.
    #[must_use]
    pub const fn desc(column: ColumnId) -> Self {
        Self {
            expr: IndexExpr::Column(column),
            order: SortOrder::Descending,
        }
    }

    /// An expression entry.
    #[must_use]
    pub const fn expression(expr: SqlExpr, order: SortOrder) -> Self {
        Self {
            expr: IndexExpr::Expression(expr),
            order,
        }
    }

    /// Returns the plain column, if this entry is one.
    #[must_use]
    pub const fn column(&self) -> Option<ColumnId> {
        match self.expr {
            IndexExpr::Column(c) => Some(c),
            IndexExpr::Expression(_) => None,
        }
    }
}

/// How a generated column stores its computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationStorage {
    /// Computed on read.
    Virtual,
    /// Computed on write and stored.
    Stored,
}

/// A generated-column computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    /// The generating expression.
    pub expression: SqlExpr,
    /// Storage strategy.
    pub storage: ComputationStorage,
}

impl Computation {
    /// Creates a virtual (computed-on-read) computation.
    #[must_use]
    pub const fn virtual_(expression: SqlExpr) -> Self {
        Self {
            expression,
            storage: ComputationStorage::Virtual,
        }
    }

    /// Creates a stored computation.
    #[must_use]
    pub const fn stored(expression: SqlExpr) -> Self {
        Self {
            expression,
            storage: ComputationStorage::Stored,
        }
    }
}

/// Referential action of a foreign key (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ForeignKeyAction {
    /// Error if a referenced row is deleted/updated.
    #[default]
    NoAction,
    /// Same as `NoAction`, checked immediately.
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing columns to NULL.
    SetNull,
    /// Set the referencing columns to their default values.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL keyword for this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Kind-specific object payload.
#[derive(Debug, Clone)]
pub(crate) enum ObjectData {
    Schema(SchemaData),
    Table(TableData),
    Column(ColumnData),
    Index(IndexData),
    PrimaryKey(PrimaryKeyData),
    ForeignKey(ForeignKeyData),
    Check(CheckData),
    View(ViewData),
}

impl ObjectData {
    pub(crate) const fn kind(&self) -> ObjectKind {
        match self {
            Self::Schema(_) => ObjectKind::Schema,
            Self::Table(_) => ObjectKind::Table,
            Self::Column(_) => ObjectKind::Column,
            Self::Index(_) => ObjectKind::Index,
            Self::PrimaryKey(_) => ObjectKind::PrimaryKey,
            Self::ForeignKey(_) => ObjectKind::ForeignKey,
            Self::Check(_) => ObjectKind::Check,
            Self::View(_) => ObjectKind::View,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SchemaData {
    /// Flat schema-global namespace: tables, views, and every table's
    /// constraints, keyed by name. Constraint names share the schema's
    /// identifier space even though constraints are owned by tables.
    pub objects: IndexMap<String, ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct TableData {
    pub schema: ObjectId,
    /// Table-local column namespace.
    pub columns: IndexMap<String, ObjectId>,
    /// Table-local view over the constraints registered in the schema
    /// namespace, in creation order.
    pub constraints: Vec<ObjectId>,
    pub primary_key: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnData {
    pub table: ObjectId,
    pub type_def: TypeDefinition,
    pub nullable: bool,
    pub default_value: Option<SqlExpr>,
    pub computation: Option<Computation>,
}

#[derive(Debug, Clone)]
pub(crate) struct IndexData {
    pub table: ObjectId,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub virtual_: bool,
    pub filter: Option<SqlExpr>,
    /// Back-link to the primary key this index backs, if any.
    pub primary_key: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct PrimaryKeyData {
    pub table: ObjectId,
    pub index: ObjectId,
}

#[derive(Debug, Clone)]
pub(crate) struct ForeignKeyData {
    pub table: ObjectId,
    pub origin_index: ObjectId,
    pub referenced_index: ObjectId,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

#[derive(Debug, Clone)]
pub(crate) struct CheckData {
    pub table: ObjectId,
    pub condition: SqlExpr,
}

#[derive(Debug, Clone)]
pub(crate) struct ViewData {
    pub schema: ObjectId,
    pub source: ViewQuery,
}

/// One arena slot.
#[derive(Debug, Clone)]
pub(crate) struct ObjectSlot {
    pub name: String,
    pub removed: bool,
    pub data: ObjectData,
}

impl ObjectSlot {
    pub(crate) fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            removed: false,
            data,
        }
    }

    pub(crate) const fn kind(&self) -> ObjectKind {
        self.data.kind()
    }
}
