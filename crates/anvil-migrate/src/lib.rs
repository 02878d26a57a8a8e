//! In-memory SQL schema graph with change tracking.
//!
//! `anvil-migrate` models a target database shape — schemas, tables,
//! columns, constraints — as a mutable, dialect-agnostic object graph,
//! and compiles every mutation into the minimal ordered sequence of
//! DDL-equivalent actions needed to move a database from its
//! last-committed shape to the new one.
//!
//! # Architecture
//!
//! - **Object graph** — an arena of schema objects on the [`Database`]
//!   root, addressed by typed handles, with two-tier naming (table-local
//!   columns, schema-global constraint names)
//! - **Reference tracker** — non-owning dependency edges ("index I uses
//!   column C", "view V reads table T"), kept exact on every mutation
//! - **Mutation engine** — per-operation validation that collects every
//!   violated rule into one aggregate error before touching anything
//! - **Change tracker** — existence states and first-original-value
//!   records per object, batched composite actions per active object,
//!   and cancellation of any mutation sequence that nets to no change
//! - **Cascading removal** — ordered teardown of owned descendants with
//!   a single emitted action for the root
//!
//! # Example
//!
//! ```rust
//! use anvil_migrate::{Database, SortOrder};
//!
//! let mut db = Database::new();
//! let schema = db.default_schema();
//! let table = db.create_table(schema, "T")?;
//! let c1 = db.create_column(table, "C1")?;
//!
//! let pk = db.set_primary_key(table, None, &[(c1, SortOrder::Ascending)])?;
//! assert_eq!(db.name(pk), "PK_T");
//! assert_eq!(db.name(db.primary_key_index(pk)), "UIX_T_C1A");
//!
//! // One composite action: create the index, create the primary key.
//! assert_eq!(db.pending_action_count(), 1);
//! # Ok::<(), anvil_migrate::SchemaError>(())
//! ```

mod changes;
mod database;
mod error;
mod foreign_key;
mod ident;
mod index;
mod naming;
mod object;
mod refs;
mod remove;
mod table;
mod view;

pub use changes::{
    AlterAction, ChangeBatch, CommandSetup, CreateAction, CustomAction, ExistenceState, ObjectRef,
    ParameterValue, ParameterizedStatement, PendingAction, PropertyValue, RawStatement,
    RemoveAction, SqlCommand, SqlParameter, TrackerMode, DEFAULT_ACTION_TIMEOUT,
};
pub use database::Database;
pub use error::{ContractViolation, Result, SchemaError, ValidationErrors, Violation};
pub use object::{
    CheckId, ColumnId, Computation, ComputationStorage, ForeignKeyAction, ForeignKeyId,
    IndexColumn, IndexExpr, IndexId, ObjectId, ObjectKind, PrimaryKeyId, PropertyTag, SchemaId,
    SortOrder, TableId, ViewId,
};
pub use refs::{Reference, ReferenceTracker};

// Re-export the consumed leaf crate so callers build expressions and
// resolve types without a separate dependency.
pub use anvil_sql_core as core;
