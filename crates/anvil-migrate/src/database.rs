//! The database root.
//!
//! [`Database`] owns the object arena, the schema namespace, the
//! reference tracker, the change tracker, and the injected type
//! registry. All mutation goes through `&mut self` methods, which makes
//! the single-writer model of this layer a compile-time property.

use std::sync::Arc;

use anvil_sql_core::expr::{ExprKind, SqlExpr, ViewQuery};
use anvil_sql_core::types::{StandardTypeRegistry, TypeDefinition, TypeRegistry};
use indexmap::IndexMap;
use tracing::info;

use crate::changes::{
    ChangeTracker, CustomAction, ExistenceState, ParameterizedStatement, PendingAction,
    PropertyValue, RawStatement, SqlParameter, TrackerMode, DEFAULT_ACTION_TIMEOUT,
};
use crate::error::{ContractViolation, Result, SchemaError, ValidationErrors, Violation};
use crate::ident::is_valid_identifier;
use crate::object::{
    CheckId, ColumnId, Computation, ForeignKeyAction, ForeignKeyId, IndexColumn, IndexId,
    ObjectData, ObjectId, ObjectKind, ObjectSlot, PrimaryKeyId, PropertyTag, SchemaData, SchemaId,
    TableId, ViewId,
};
use crate::refs::{Reference, ReferenceTracker};

/// The root of a schema object graph.
pub struct Database {
    pub(crate) objects: Vec<ObjectSlot>,
    pub(crate) schemas: IndexMap<String, ObjectId>,
    default_schema: ObjectId,
    pub(crate) refs: ReferenceTracker,
    registry: Arc<dyn TypeRegistry>,
    pub(crate) tracker: ChangeTracker,
}

impl Database {
    /// Creates a database with the stock type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(StandardTypeRegistry::new()))
    }

    /// Creates a database wired to the given type registry. Every type
    /// definition later passed into the graph must have been minted by
    /// this registry.
    #[must_use]
    pub fn with_registry(registry: Arc<dyn TypeRegistry>) -> Self {
        let mut db = Self {
            objects: Vec::new(),
            schemas: IndexMap::new(),
            default_schema: ObjectId(0),
            refs: ReferenceTracker::new(),
            registry,
            tracker: ChangeTracker::new(),
        };
        // The default (unnamed) schema always exists and never shows up
        // in the action log.
        let id = db.alloc(ObjectSlot::new("", ObjectData::Schema(SchemaData::default())));
        db.schemas.insert(String::new(), id);
        db.default_schema = id;
        db
    }

    /// Returns the injected type registry.
    #[must_use]
    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    /// Returns the default (unnamed) schema.
    #[must_use]
    pub const fn default_schema(&self) -> SchemaId {
        SchemaId(self.default_schema)
    }

    // ---- arena ----------------------------------------------------

    pub(crate) fn alloc(&mut self, slot: ObjectSlot) -> ObjectId {
        let id = ObjectId(u32::try_from(self.objects.len()).expect("arena capacity"));
        self.objects.push(slot);
        id
    }

    pub(crate) fn slot(&self, id: ObjectId) -> &ObjectSlot {
        &self.objects[id.0 as usize]
    }

    pub(crate) fn slot_mut(&mut self, id: ObjectId) -> &mut ObjectSlot {
        &mut self.objects[id.0 as usize]
    }

    pub(crate) fn try_slot(&self, id: ObjectId) -> Result<&ObjectSlot> {
        self.objects
            .get(id.0 as usize)
            .ok_or(SchemaError::Contract(ContractViolation::UnknownObject))
    }

    /// Rejects type definitions minted by a registry other than the one
    /// this database was constructed with.
    pub(crate) fn check_type_definition(&self, def: &TypeDefinition) -> Result<()> {
        if def.registry() == self.registry.id() {
            Ok(())
        } else {
            Err(SchemaError::Contract(
                ContractViolation::ForeignTypeDefinition,
            ))
        }
    }

    /// Returns the active object a mutation of `id` batches under: the
    /// owning table for table-owned objects, the object itself
    /// otherwise.
    pub(crate) fn owner_of(&self, id: ObjectId) -> ObjectId {
        match &self.slot(id).data {
            ObjectData::Column(c) => c.table,
            ObjectData::Index(i) => i.table,
            ObjectData::PrimaryKey(p) => p.table,
            ObjectData::ForeignKey(f) => f.table,
            ObjectData::Check(c) => c.table,
            ObjectData::Schema(_) | ObjectData::Table(_) | ObjectData::View(_) => id,
        }
    }

    // ---- base object surface --------------------------------------

    /// Returns the object's name.
    #[must_use]
    pub fn name(&self, id: impl Into<ObjectId>) -> &str {
        &self.slot(id.into()).name
    }

    /// Returns the object's kind tag.
    #[must_use]
    pub fn kind(&self, id: impl Into<ObjectId>) -> ObjectKind {
        self.slot(id.into()).kind()
    }

    /// Returns whether the object has been removed. Monotonic: once
    /// true, never false again.
    #[must_use]
    pub fn is_removed(&self, id: impl Into<ObjectId>) -> bool {
        self.slot(id.into()).removed
    }

    /// Returns the incoming dependency edges of the object, in
    /// insertion order.
    #[must_use]
    pub fn referencing_objects(&self, id: impl Into<ObjectId>) -> &[Reference] {
        self.refs.incoming(id.into())
    }

    // ---- schemas --------------------------------------------------

    /// Creates a named schema.
    pub fn create_schema(&mut self, name: &str) -> Result<SchemaId> {
        let mut violations = Vec::new();
        if !is_valid_identifier(name) {
            violations.push(Violation::InvalidIdentifier { name: name.into() });
        }
        if self.schemas.contains_key(name) {
            violations.push(Violation::DuplicateName {
                name: name.into(),
                namespace: "database".into(),
            });
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(format!("create_schema '{name}'"), violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            name,
            ObjectData::Schema(SchemaData::default()),
        ));
        self.schemas.insert(name.to_string(), id);
        self.tracker.note_created(&self.objects, id, id);
        Ok(SchemaId(id))
    }

    /// Looks up a schema by name. Removed schemas are not found.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<SchemaId> {
        self.schemas
            .get(name)
            .filter(|id| !self.slot(**id).removed)
            .map(|id| SchemaId(*id))
    }

    /// Looks up any object registered in a schema's flat namespace
    /// (tables, views, and constraints). Removed objects are not found.
    #[must_use]
    pub fn schema_object(&self, schema: SchemaId, name: &str) -> Option<ObjectId> {
        let ObjectData::Schema(data) = &self.slot(schema.0).data else {
            return None;
        };
        data.objects
            .get(name)
            .filter(|id| !self.slot(**id).removed)
            .copied()
    }

    fn schema_object_of_kind(&self, schema: SchemaId, name: &str, kind: ObjectKind) -> Option<ObjectId> {
        self.schema_object(schema, name)
            .filter(|id| self.slot(*id).kind() == kind)
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, schema: SchemaId, name: &str) -> Option<TableId> {
        self.schema_object_of_kind(schema, name, ObjectKind::Table)
            .map(TableId)
    }

    /// Looks up a view by name.
    #[must_use]
    pub fn view(&self, schema: SchemaId, name: &str) -> Option<ViewId> {
        self.schema_object_of_kind(schema, name, ObjectKind::View)
            .map(ViewId)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, schema: SchemaId, name: &str) -> Option<IndexId> {
        self.schema_object_of_kind(schema, name, ObjectKind::Index)
            .map(IndexId)
    }

    /// Looks up a primary key by name.
    #[must_use]
    pub fn primary_key(&self, schema: SchemaId, name: &str) -> Option<PrimaryKeyId> {
        self.schema_object_of_kind(schema, name, ObjectKind::PrimaryKey)
            .map(PrimaryKeyId)
    }

    /// Looks up a foreign key by name.
    #[must_use]
    pub fn foreign_key(&self, schema: SchemaId, name: &str) -> Option<ForeignKeyId> {
        self.schema_object_of_kind(schema, name, ObjectKind::ForeignKey)
            .map(ForeignKeyId)
    }

    /// Looks up a check constraint by name.
    #[must_use]
    pub fn check(&self, schema: SchemaId, name: &str) -> Option<CheckId> {
        self.schema_object_of_kind(schema, name, ObjectKind::Check)
            .map(CheckId)
    }

    /// Looks up a column by name within a table.
    #[must_use]
    pub fn column(&self, table: TableId, name: &str) -> Option<ColumnId> {
        let data = self.table_data(table);
        data.columns
            .get(name)
            .filter(|id| !self.slot(**id).removed)
            .map(|id| ColumnId(*id))
    }

    // ---- rename ---------------------------------------------------

    /// Renames any schema object. A rename to the current name is a
    /// no-op that touches neither the tracker nor the reference graph;
    /// otherwise the object is physically rekeyed in every collection
    /// that indexes it by name.
    pub fn set_name(&mut self, id: impl Into<ObjectId>, new_name: &str) -> Result<()> {
        let id = id.into();
        let slot = self.try_slot(id)?;
        if slot.name == new_name {
            return Ok(());
        }
        let kind = slot.kind();
        let old_name = slot.name.clone();
        let context = format!("set_name '{old_name}' -> '{new_name}'");

        let mut violations = Vec::new();
        if slot.removed {
            violations.push(Violation::ObjectRemoved {
                name: old_name.clone(),
            });
        }
        if id == self.default_schema {
            violations.push(Violation::DefaultSchemaImmutable);
        }
        if !is_valid_identifier(new_name) {
            violations.push(Violation::InvalidIdentifier {
                name: new_name.into(),
            });
        }
        if let Some(duplicate) = self.rename_conflict(id, kind, new_name) {
            violations.push(duplicate);
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        self.rekey(id, kind, &old_name, new_name);
        self.slot_mut(id).name = new_name.to_string();

        let owner = self.owner_of(id);
        self.tracker.note_changed(
            &self.objects,
            owner,
            id,
            PropertyTag::Name,
            PropertyValue::Name(old_name),
            &PropertyValue::Name(new_name.to_string()),
        );
        Ok(())
    }

    fn rename_conflict(&self, id: ObjectId, kind: ObjectKind, new_name: &str) -> Option<Violation> {
        let (taken, namespace) = match kind {
            ObjectKind::Schema => (self.schemas.contains_key(new_name), "database".to_string()),
            ObjectKind::Column => {
                let table = self.owner_of(id);
                let ObjectData::Table(t) = &self.slot(table).data else {
                    return None;
                };
                (
                    t.columns.contains_key(new_name),
                    format!("table '{}'", self.slot(table).name),
                )
            }
            _ => {
                let schema = self.owning_schema(id);
                let ObjectData::Schema(s) = &self.slot(schema).data else {
                    return None;
                };
                (
                    s.objects.contains_key(new_name),
                    format!("schema '{}'", self.slot(schema).name),
                )
            }
        };
        taken.then(|| Violation::DuplicateName {
            name: new_name.into(),
            namespace,
        })
    }

    /// Returns the schema whose flat namespace indexes `id`.
    pub(crate) fn owning_schema(&self, id: ObjectId) -> ObjectId {
        match &self.slot(id).data {
            ObjectData::Schema(_) => id,
            ObjectData::Table(t) => t.schema,
            ObjectData::View(v) => v.schema,
            ObjectData::Column(c) => self.owning_schema(c.table),
            ObjectData::Index(i) => self.owning_schema(i.table),
            ObjectData::PrimaryKey(p) => self.owning_schema(p.table),
            ObjectData::ForeignKey(f) => self.owning_schema(f.table),
            ObjectData::Check(c) => self.owning_schema(c.table),
        }
    }

    fn rekey(&mut self, id: ObjectId, kind: ObjectKind, old_name: &str, new_name: &str) {
        match kind {
            ObjectKind::Schema => {
                self.schemas.shift_remove(old_name);
                self.schemas.insert(new_name.to_string(), id);
            }
            ObjectKind::Column => {
                let table = self.owner_of(id);
                if let ObjectData::Table(t) = &mut self.slot_mut(table).data {
                    t.columns.shift_remove(old_name);
                    t.columns.insert(new_name.to_string(), id);
                }
            }
            _ => {
                let schema = self.owning_schema(id);
                if let ObjectData::Schema(s) = &mut self.slot_mut(schema).data {
                    s.objects.shift_remove(old_name);
                    s.objects.insert(new_name.to_string(), id);
                }
            }
        }
    }

    // ---- typed data accessors -------------------------------------

    pub(crate) fn table_data(&self, id: TableId) -> &crate::object::TableData {
        match &self.slot(id.0).data {
            ObjectData::Table(t) => t,
            _ => panic!("handle is not a table"),
        }
    }

    pub(crate) fn column_data(&self, id: ColumnId) -> &crate::object::ColumnData {
        match &self.slot(id.0).data {
            ObjectData::Column(c) => c,
            _ => panic!("handle is not a column"),
        }
    }

    pub(crate) fn index_data(&self, id: IndexId) -> &crate::object::IndexData {
        match &self.slot(id.0).data {
            ObjectData::Index(i) => i,
            _ => panic!("handle is not an index"),
        }
    }

    pub(crate) fn foreign_key_data(&self, id: ForeignKeyId) -> &crate::object::ForeignKeyData {
        match &self.slot(id.0).data {
            ObjectData::ForeignKey(f) => f,
            _ => panic!("handle is not a foreign key"),
        }
    }

    /// Returns the live columns of a table, in declaration order.
    #[must_use]
    pub fn columns(&self, table: TableId) -> Vec<ColumnId> {
        self.table_data(table)
            .columns
            .values()
            .filter(|id| !self.slot(**id).removed)
            .map(|id| ColumnId(*id))
            .collect()
    }

    /// Returns the live constraints of a table, in creation order.
    #[must_use]
    pub fn constraints(&self, table: TableId) -> Vec<ObjectId> {
        self.table_data(table)
            .constraints
            .iter()
            .filter(|id| !self.slot(**id).removed)
            .copied()
            .collect()
    }

    /// Returns the table's primary key, if any.
    #[must_use]
    pub fn primary_key_of(&self, table: TableId) -> Option<PrimaryKeyId> {
        self.table_data(table).primary_key.map(PrimaryKeyId)
    }

    /// Returns the index backing a primary key.
    #[must_use]
    pub fn primary_key_index(&self, pk: PrimaryKeyId) -> IndexId {
        match &self.slot(pk.0).data {
            ObjectData::PrimaryKey(p) => IndexId(p.index),
            _ => panic!("handle is not a primary key"),
        }
    }

    /// Returns a column's resolved type definition.
    #[must_use]
    pub fn column_type(&self, column: ColumnId) -> &TypeDefinition {
        &self.column_data(column).type_def
    }

    /// Returns whether a column is nullable.
    #[must_use]
    pub fn is_nullable(&self, column: ColumnId) -> bool {
        self.column_data(column).nullable
    }

    /// Returns a column's default value expression.
    #[must_use]
    pub fn default_value(&self, column: ColumnId) -> Option<&SqlExpr> {
        self.column_data(column).default_value.as_ref()
    }

    /// Returns a column's generated-column computation.
    #[must_use]
    pub fn computation(&self, column: ColumnId) -> Option<&Computation> {
        self.column_data(column).computation.as_ref()
    }

    /// Returns the ordered column list of an index.
    #[must_use]
    pub fn index_columns(&self, index: IndexId) -> &[IndexColumn] {
        &self.index_data(index).columns
    }

    /// Returns the distinct plain columns of an index, in order.
    #[must_use]
    pub fn referenced_columns(&self, index: IndexId) -> Vec<ColumnId> {
        let mut out: Vec<ColumnId> = Vec::new();
        for entry in &self.index_data(index).columns {
            if let Some(column) = entry.column() {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        out
    }

    /// Returns whether an index is unique.
    #[must_use]
    pub fn is_unique(&self, index: IndexId) -> bool {
        self.index_data(index).unique
    }

    /// Returns whether an index is virtual (implicitly maintained as
    /// primary key backing, with no physical identity of its own).
    #[must_use]
    pub fn is_virtual(&self, index: IndexId) -> bool {
        self.index_data(index).virtual_
    }

    /// Returns an index's filter condition.
    #[must_use]
    pub fn filter(&self, index: IndexId) -> Option<&SqlExpr> {
        self.index_data(index).filter.as_ref()
    }

    /// Returns the origin index of a foreign key.
    #[must_use]
    pub fn origin_index(&self, fk: ForeignKeyId) -> IndexId {
        IndexId(self.foreign_key_data(fk).origin_index)
    }

    /// Returns the referenced index of a foreign key.
    #[must_use]
    pub fn referenced_index(&self, fk: ForeignKeyId) -> IndexId {
        IndexId(self.foreign_key_data(fk).referenced_index)
    }

    /// Returns a foreign key's ON DELETE action.
    #[must_use]
    pub fn on_delete(&self, fk: ForeignKeyId) -> ForeignKeyAction {
        self.foreign_key_data(fk).on_delete
    }

    /// Returns a foreign key's ON UPDATE action.
    #[must_use]
    pub fn on_update(&self, fk: ForeignKeyId) -> ForeignKeyAction {
        self.foreign_key_data(fk).on_update
    }

    /// Returns a check constraint's condition.
    #[must_use]
    pub fn check_condition(&self, check: CheckId) -> &SqlExpr {
        match &self.slot(check.0).data {
            ObjectData::Check(c) => &c.condition,
            _ => panic!("handle is not a check"),
        }
    }

    /// Returns a view's source query.
    #[must_use]
    pub fn view_source(&self, view: ViewId) -> &ViewQuery {
        match &self.slot(view.0).data {
            ObjectData::View(v) => &v.source,
            _ => panic!("handle is not a view"),
        }
    }

    // ---- shared expression validation -----------------------------

    /// Validates a condition evaluated against a table's rows: no
    /// window functions, and every referenced column must exist in the
    /// table.
    pub(crate) fn validate_table_expression(
        &self,
        table: TableId,
        expr: &SqlExpr,
        violations: &mut Vec<Violation>,
    ) {
        if expr.contains_kind(ExprKind::WindowCall) {
            violations.push(Violation::WindowFunctionNotAllowed);
        }
        let table_name = self.slot(table.0).name.clone();
        for column in expr.referenced_columns() {
            if self.column(table, &column).is_none() {
                violations.push(Violation::UnknownColumn {
                    column,
                    table: table_name.clone(),
                });
            }
        }
    }

    /// Validates a standalone value expression: no window functions and
    /// no free column references.
    pub(crate) fn validate_value_expression(expr: &SqlExpr, violations: &mut Vec<Violation>) {
        if expr.contains_kind(ExprKind::WindowCall) {
            violations.push(Violation::WindowFunctionNotAllowed);
        }
        for column in expr.referenced_columns() {
            violations.push(Violation::ColumnReferenceNotAllowed { column });
        }
    }

    // ---- tracker notification helpers -----------------------------

    pub(crate) fn notify_created(&mut self, id: ObjectId) {
        let owner = self.owner_of(id);
        self.tracker.note_created(&self.objects, owner, id);
    }

    pub(crate) fn notify_changed(
        &mut self,
        id: ObjectId,
        tag: PropertyTag,
        old: PropertyValue,
        new: &PropertyValue,
    ) {
        let owner = self.owner_of(id);
        self.tracker
            .note_changed(&self.objects, owner, id, tag, old, new);
    }

    // ---- change tracker facade ------------------------------------

    /// Returns the tracker's emission mode.
    #[must_use]
    pub fn tracker_mode(&self) -> TrackerMode {
        self.tracker.mode()
    }

    /// Switches the tracker's emission mode, finalizing the active
    /// batch first.
    pub fn set_tracker_mode(&mut self, mode: TrackerMode) {
        self.tracker.set_mode(mode, &self.objects);
    }

    /// Returns whether emission is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.tracker.is_attached()
    }

    /// Attaches or detaches action emission. Detaching force-flushes
    /// the active batch, then stops all further emission while graph
    /// mutation stays possible; re-attaching resumes emission for
    /// subsequent mutations only.
    pub fn attach(&mut self, attached: bool) {
        self.tracker.attach(attached, &self.objects);
    }

    /// Appends a raw SQL statement to the log, chronologically.
    pub fn add_statement(&mut self, sql: impl Into<String>) {
        self.tracker.add_statement(RawStatement {
            sql: sql.into(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        });
    }

    /// Appends a raw SQL statement with an explicit timeout.
    pub fn add_statement_with_timeout(&mut self, sql: impl Into<String>, timeout: std::time::Duration) {
        self.tracker.add_statement(RawStatement {
            sql: sql.into(),
            timeout,
        });
    }

    /// Validates and appends a parameterized statement. Every `@name`
    /// placeholder must be declared and every declared parameter used;
    /// declarations must be unique.
    pub fn add_parameterized_statement(
        &mut self,
        sql: impl Into<String>,
        parameters: Vec<SqlParameter>,
    ) -> Result<()> {
        let sql = sql.into();
        let mut violations = Vec::new();

        let placeholders = crate::changes::placeholder_names(&sql);
        for name in &placeholders {
            if !parameters.iter().any(|p| &p.name == name) {
                violations.push(Violation::UndeclaredParameter { name: name.clone() });
            }
        }
        for (i, parameter) in parameters.iter().enumerate() {
            if parameters[..i].iter().any(|p| p.name == parameter.name) {
                violations.push(Violation::DuplicateParameter {
                    name: parameter.name.clone(),
                });
            } else if !placeholders.contains(&parameter.name) {
                violations.push(Violation::UnusedParameter {
                    name: parameter.name.clone(),
                });
            }
        }
        if !violations.is_empty() {
            return Err(
                ValidationErrors::new("add_parameterized_statement", violations).into(),
            );
        }

        self.tracker.add_parameterized(ParameterizedStatement {
            sql,
            parameters,
            timeout: DEFAULT_ACTION_TIMEOUT,
        });
        Ok(())
    }

    /// Appends a programmatic action to the log, chronologically.
    pub fn add_action(&mut self, action: CustomAction) {
        self.tracker.add_custom(action);
    }

    /// Returns the number of pending actions, finalizing the active
    /// batch first.
    pub fn pending_action_count(&mut self) -> usize {
        self.tracker.pending_count(&self.objects)
    }

    /// Finalizes the active batch and returns the full pending log.
    pub fn pending_actions(&mut self) -> &[PendingAction] {
        self.tracker.pending(&self.objects)
    }

    /// Finalizes the active batch and returns the actions appended
    /// after the first `since` entries.
    pub fn last_pending_actions(&mut self, since: usize) -> &[PendingAction] {
        self.tracker.pending_since(&self.objects, since)
    }

    /// Exports the pending log as JSON.
    pub fn pending_actions_json(&mut self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self.tracker.pending(&self.objects))
    }

    /// Returns the object's existence state relative to the last
    /// committed baseline.
    #[must_use]
    pub fn existence_state(&self, id: impl Into<ObjectId>) -> ExistenceState {
        let id = id.into();
        self.tracker.existence(id).unwrap_or(if self.slot(id).removed {
            ExistenceState::Removed
        } else {
            ExistenceState::Unchanged
        })
    }

    /// Returns whether the object has an uncommitted change record for
    /// the property.
    #[must_use]
    pub fn contains_change(&self, id: impl Into<ObjectId>, tag: PropertyTag) -> bool {
        self.tracker.contains_change(id.into(), tag)
    }

    /// Returns the captured original value of a changed property.
    #[must_use]
    pub fn original_value(&self, id: impl Into<ObjectId>, tag: PropertyTag) -> Option<&PropertyValue> {
        self.tracker.original_value(id.into(), tag)
    }

    /// Finalizes and drains the pending log, resetting every existence
    /// state to a fresh baseline.
    pub fn commit(&mut self) -> Vec<PendingAction> {
        let actions = self.tracker.commit(&self.objects);
        info!(actions = actions.len(), "committed schema change log");
        actions
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("objects", &self.objects.len())
            .field("schemas", &self.schemas.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_exists() {
        let db = Database::new();
        let schema = db.default_schema();
        assert_eq!(db.name(schema), "");
        assert!(!db.is_removed(schema));
    }

    #[test]
    fn test_create_schema_and_lookup() {
        let mut db = Database::new();
        let auth = db.create_schema("auth").unwrap();
        assert_eq!(db.schema("auth"), Some(auth));
        assert_eq!(db.name(auth), "auth");
    }

    #[test]
    fn test_duplicate_schema_name_rejected() {
        let mut db = Database::new();
        db.create_schema("auth").unwrap();
        let err = db.create_schema("auth").unwrap_err();
        let SchemaError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.violations.len(), 1);
        assert!(matches!(
            errors.violations[0],
            Violation::DuplicateName { .. }
        ));
    }

    #[test]
    fn test_invalid_schema_identifier_rejected() {
        let mut db = Database::new();
        let err = db.create_schema("1bad name").unwrap_err();
        assert!(err.to_string().contains("not a valid SQL identifier"));
    }

    #[test]
    fn test_default_schema_cannot_be_renamed() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let err = db.set_name(schema, "dbo").unwrap_err();
        assert!(err.to_string().contains("default schema"));
    }

    #[test]
    fn test_schema_rename_rekeys_lookup() {
        let mut db = Database::new();
        let auth = db.create_schema("auth").unwrap();
        db.set_name(auth, "identity").unwrap();

        assert!(db.schema("auth").is_none());
        assert_eq!(db.schema("identity"), Some(auth));
    }

    #[test]
    fn test_rename_to_current_name_is_noop() {
        let mut db = Database::new();
        let auth = db.create_schema("auth").unwrap();
        db.commit();

        db.set_name(auth, "auth").unwrap();
        assert_eq!(db.pending_action_count(), 0);
        assert!(!db.contains_change(auth, PropertyTag::Name));
    }
}
