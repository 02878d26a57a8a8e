//! Error types for the schema graph.
//!
//! Every mutating operation validates all of its preconditions before
//! touching the graph, collecting the complete list of violated rules
//! into one [`ValidationErrors`] value rather than stopping at the first.
//! A failed operation leaves the graph, the reference edges, and the
//! change tracker exactly as they were.

use std::fmt;

/// Errors raised by schema graph operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// One or more validation rules were violated; carries the full list.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The caller broke an API contract (wrong capability wiring, stale
    /// or foreign handle). Reported separately from validation errors
    /// because it indicates a programming error, not a data problem.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

/// Result type for schema graph operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// The complete set of rules an operation violated, with the operation
/// context the violations were collected under.
#[derive(Debug)]
pub struct ValidationErrors {
    /// Operation context, e.g. `set_type on column "users"."id"`.
    pub context: String,
    /// The violated rules, in check order. Never empty.
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Creates an aggregate from a non-empty violation list.
    ///
    /// # Panics
    ///
    /// Panics if `violations` is empty; an operation with no violations
    /// must succeed instead of raising.
    #[must_use]
    pub fn new(context: impl Into<String>, violations: Vec<Violation>) -> Self {
        assert!(!violations.is_empty(), "empty violation list");
        Self {
            context: context.into(),
            violations,
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} rule(s) violated in {}:",
            self.violations.len(),
            self.context
        )?;
        for v in &self.violations {
            writeln!(f, "  - {v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Caller contract violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContractViolation {
    /// A type definition minted by a different registry than the one the
    /// database was constructed with.
    #[error("type definition was minted by a foreign type registry")]
    ForeignTypeDefinition,

    /// An object handle that does not belong to this database.
    #[error("object handle does not belong to this database")]
    UnknownObject,
}

/// A single violated validation rule.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Violation {
    #[error("name '{name}' is already in use in {namespace}")]
    DuplicateName { name: String, namespace: String },

    #[error("'{name}' is not a valid SQL identifier")]
    InvalidIdentifier { name: String },

    #[error("'{name}' has been removed")]
    ObjectRemoved { name: String },

    #[error("the default schema cannot be renamed or removed")]
    DefaultSchemaImmutable,

    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn { column: String, table: String },

    #[error("column '{column}' is used by index '{index}'")]
    ColumnUsedByIndex { column: String, index: String },

    #[error("column '{column}' is used by view '{view}'")]
    ColumnUsedByView { column: String, view: String },

    #[error("column '{column}' is generated and cannot have a default value")]
    DefaultOnGeneratedColumn { column: String },

    #[error("window functions are not allowed in this expression")]
    WindowFunctionNotAllowed,

    #[error("column references are not allowed in this expression ('{column}')")]
    ColumnReferenceNotAllowed { column: String },

    #[error("computation of column '{column}' references the column itself")]
    SelfReferencingComputation { column: String },

    #[error("computation of column '{column}' cannot be added or dropped while other objects reference the column")]
    ComputationToggleWithReferences { column: String },

    #[error("index '{index}' backs a primary key and must stay unique")]
    PrimaryKeyIndexMustStayUnique { index: String },

    #[error("index '{index}' backs a primary key and must stay virtual")]
    PrimaryKeyIndexMustStayVirtual { index: String },

    #[error("index '{index}' contains expressions and cannot be unique")]
    ExpressionIndexCannotBeUnique { index: String },

    #[error("index '{index}' is unique and cannot be made virtual")]
    UniqueIndexCannotBeVirtual { index: String },

    #[error("index '{index}' is filtered and cannot be made virtual")]
    FilteredIndexCannotBeVirtual { index: String },

    #[error("index '{index}' does not back a primary key and cannot be made virtual")]
    OnlyPrimaryKeyIndexCanBeVirtual { index: String },

    #[error("index '{index}' is referenced by foreign key '{foreign_key}'")]
    IndexReferencedByForeignKey {
        index: String,
        foreign_key: String,
    },

    #[error("index '{index}' backs a primary key and cannot be filtered")]
    FilterOnPrimaryKeyIndex { index: String },

    #[error("index '{index}' is virtual and cannot be filtered")]
    FilterOnVirtualIndex { index: String },

    #[error("an index requires at least one column")]
    IndexWithoutColumns,

    #[error("a primary key requires at least one column")]
    PrimaryKeyWithoutColumns,

    #[error("key column '{column}' is nullable")]
    NullableKeyColumn { column: String },

    #[error("key column '{column}' is generated")]
    GeneratedKeyColumn { column: String },

    #[error("index '{index}' must be unique to be referenced by a foreign key")]
    ReferencedIndexNotUnique { index: String },

    #[error("index '{index}' must be filterless to be referenced by a foreign key")]
    ReferencedIndexHasFilter { index: String },

    #[error("index '{index}' contains expressions and cannot participate in a foreign key")]
    IndexHasExpressions { index: String },

    #[error("origin index has {origin} column(s) but referenced index has {referenced}")]
    ForeignKeyColumnCountMismatch { origin: usize, referenced: usize },

    #[error("origin column '{origin_column}' is not type-compatible with referenced column '{referenced_column}'")]
    IncompatibleColumnTypes {
        origin_column: String,
        referenced_column: String,
    },

    #[error("a foreign key requires two distinct indexes")]
    IndexesMustDiffer,

    #[error("'{object}' is referenced by '{referrer}' and cannot be removed")]
    RemoveBlockedByReference { object: String, referrer: String },

    #[error("referenced object '{name}' does not exist")]
    UnknownReferencedObject { name: String },

    #[error("parameter '@{name}' appears in the statement but is not declared")]
    UndeclaredParameter { name: String },

    #[error("parameter '@{name}' is declared but never used in the statement")]
    UnusedParameter { name: String },

    #[error("parameter '@{name}' is declared more than once")]
    DuplicateParameter { name: String },
}
