//! Dialect-agnostic SQL building blocks for the anvil schema builder.
//!
//! This crate is the leaf of the workspace: it defines the opaque SQL
//! expression tree that the schema graph consumes ([`SqlExpr`], [`ViewQuery`])
//! together with the analysis capabilities the mutation engine needs
//! (referenced-column enumeration, disallowed-node scanning, deterministic
//! rendering), and the type system ([`DataType`], [`TypeDefinition`],
//! [`TypeRegistry`]) that resolves column types and decides foreign-key
//! type compatibility.
//!
//! Nothing in here validates schema semantics — expressions are plain
//! values, and registries are capability objects injected into the graph
//! root by the caller.
//!
//! # Example
//!
//! ```rust
//! use anvil_sql_core::expr::SqlExpr;
//!
//! let condition = SqlExpr::column("quantity").gt(SqlExpr::integer(0));
//! assert_eq!(condition.referenced_columns(), vec!["quantity"]);
//! assert_eq!(condition.to_string(), "(quantity > 0)");
//! ```

pub mod expr;
pub mod types;

pub use expr::{BinaryOp, ExprKind, Literal, QueryRef, SqlExpr, UnaryOp, ViewQuery};
pub use types::{
    DataType, RegistryId, SqlTyped, StandardTypeRegistry, StorageClass, TypeDefinition,
    TypeRegistry, TypeRegistryExt,
};
