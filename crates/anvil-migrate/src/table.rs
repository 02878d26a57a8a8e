//! Table, column, and check constraint operations.
//!
//! Every operation follows the same shape: validate all preconditions
//! into one aggregate, apply the change, update dependency edges, then
//! forward the semantic delta to the change tracker. Failed operations
//! touch nothing.

use anvil_sql_core::expr::{ExprKind, SqlExpr};
use anvil_sql_core::types::TypeDefinition;

use crate::changes::PropertyValue;
use crate::database::Database;
use crate::error::{Result, ValidationErrors, Violation};
use crate::ident::is_valid_identifier;
use crate::naming;
use crate::object::{
    CheckData, CheckId, ColumnData, ColumnId, Computation, ObjectData, ObjectId, ObjectKind,
    ObjectSlot, PropertyTag, SchemaId, TableData, TableId,
};

impl Database {
    /// Creates a table in the given schema.
    pub fn create_table(&mut self, schema: SchemaId, name: &str) -> Result<TableId> {
        let schema_slot = self.try_slot(schema.id())?;
        let context = format!("create_table '{name}'");

        let mut violations = Vec::new();
        if schema_slot.removed {
            violations.push(Violation::ObjectRemoved {
                name: schema_slot.name.clone(),
            });
        }
        if !is_valid_identifier(name) {
            violations.push(Violation::InvalidIdentifier { name: name.into() });
        }
        self.check_schema_namespace(schema, name, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            name,
            ObjectData::Table(TableData {
                schema: schema.id(),
                columns: indexmap::IndexMap::new(),
                constraints: Vec::new(),
                primary_key: None,
            }),
        ));
        self.register_in_schema(schema.id(), name, id);
        self.notify_created(id);
        Ok(TableId(id))
    }

    /// Creates a column with the registry's default type. Columns start
    /// non-nullable, with no default and no computation.
    pub fn create_column(&mut self, table: TableId, name: &str) -> Result<ColumnId> {
        let type_def = self.registry().default_type();
        self.create_column_with_type(table, name, type_def)
    }

    /// Creates a column with an explicit type definition.
    pub fn create_column_with_type(
        &mut self,
        table: TableId,
        name: &str,
        type_def: TypeDefinition,
    ) -> Result<ColumnId> {
        self.check_type_definition(&type_def)?;
        let table_slot = self.try_slot(table.id())?;
        let context = format!("create_column '{name}' on table '{}'", table_slot.name);

        let mut violations = Vec::new();
        if table_slot.removed {
            violations.push(Violation::ObjectRemoved {
                name: table_slot.name.clone(),
            });
        }
        if !is_valid_identifier(name) {
            violations.push(Violation::InvalidIdentifier { name: name.into() });
        }
        if self.table_data(table).columns.contains_key(name) {
            violations.push(Violation::DuplicateName {
                name: name.into(),
                namespace: format!("table '{}'", self.name(table)),
            });
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            name,
            ObjectData::Column(ColumnData {
                table: table.id(),
                type_def,
                nullable: false,
                default_value: None,
                computation: None,
            }),
        ));
        if let ObjectData::Table(t) = &mut self.slot_mut(table.id()).data {
            t.columns.insert(name.to_string(), id);
        }
        self.notify_created(id);
        Ok(ColumnId(id))
    }

    /// Changes a column's type. Forbidden while any index (including as
    /// a filter operand) or view uses the column. When the change
    /// crosses storage classes the column's default value is reset to
    /// null; otherwise the default is preserved.
    pub fn set_type(&mut self, column: ColumnId, type_def: TypeDefinition) -> Result<()> {
        self.check_type_definition(&type_def)?;
        self.try_slot(column.id())?;
        if self.column_data(column).type_def == type_def {
            return Ok(());
        }
        let context = format!("set_type on column '{}'", self.name(column));

        let mut violations = Vec::new();
        self.ensure_live(column.id(), &mut violations);
        self.column_usage_violations(column, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let old = self.column_data(column).type_def.clone();
        let crosses_storage = old.storage_class() != type_def.storage_class();
        let new_value = PropertyValue::ColumnType(type_def.clone());

        let old_default = {
            let ObjectData::Column(data) = &mut self.slot_mut(column.id()).data else {
                unreachable!("handle is not a column");
            };
            data.type_def = type_def;
            if crosses_storage {
                data.default_value.take()
            } else {
                None
            }
        };

        if let Some(default) = old_default {
            self.notify_changed(
                column.id(),
                PropertyTag::DefaultValue,
                PropertyValue::DefaultValue(Some(default)),
                &PropertyValue::DefaultValue(None),
            );
        }
        self.notify_changed(
            column.id(),
            PropertyTag::ColumnType,
            PropertyValue::ColumnType(old),
            &new_value,
        );
        Ok(())
    }

    /// Changes a column's nullability. Forbidden under the same
    /// "used by index or view" condition as a type change.
    pub fn set_nullable(&mut self, column: ColumnId, nullable: bool) -> Result<()> {
        self.try_slot(column.id())?;
        if self.column_data(column).nullable == nullable {
            return Ok(());
        }
        let context = format!("set_nullable on column '{}'", self.name(column));

        let mut violations = Vec::new();
        self.ensure_live(column.id(), &mut violations);
        self.column_usage_violations(column, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        if let ObjectData::Column(data) = &mut self.slot_mut(column.id()).data {
            data.nullable = nullable;
        }
        self.notify_changed(
            column.id(),
            PropertyTag::Nullable,
            PropertyValue::Nullable(!nullable),
            &PropertyValue::Nullable(nullable),
        );
        Ok(())
    }

    /// Sets or clears a column's default value. Forbidden on a
    /// generated column. The expression may not contain window
    /// functions or column references.
    pub fn set_default_value(&mut self, column: ColumnId, value: Option<SqlExpr>) -> Result<()> {
        self.try_slot(column.id())?;
        if self.column_data(column).default_value == value {
            return Ok(());
        }
        let context = format!("set_default_value on column '{}'", self.name(column));

        let mut violations = Vec::new();
        self.ensure_live(column.id(), &mut violations);
        if self.column_data(column).computation.is_some() {
            violations.push(Violation::DefaultOnGeneratedColumn {
                column: self.name(column).to_string(),
            });
        }
        if let Some(expr) = &value {
            Self::validate_value_expression(expr, &mut violations);
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let old = {
            let ObjectData::Column(data) = &mut self.slot_mut(column.id()).data else {
                unreachable!("handle is not a column");
            };
            std::mem::replace(&mut data.default_value, value.clone())
        };
        self.notify_changed(
            column.id(),
            PropertyTag::DefaultValue,
            PropertyValue::DefaultValue(old),
            &PropertyValue::DefaultValue(value),
        );
        Ok(())
    }

    /// Sets or clears a column's generated-column computation.
    ///
    /// The expression must be valid against the table and must not
    /// reference the column itself. Adding a computation to a plain
    /// column or dropping it entirely is forbidden while other objects
    /// reference the column (changing the expression or the storage
    /// strategy of an existing computation is not). Setting a
    /// computation implicitly clears the column's default value.
    pub fn set_computation(&mut self, column: ColumnId, computation: Option<Computation>) -> Result<()> {
        self.try_slot(column.id())?;
        if self.column_data(column).computation == computation {
            return Ok(());
        }
        let column_name = self.name(column).to_string();
        let context = format!("set_computation on column '{column_name}'");
        let table = TableId(self.column_data(column).table);

        let mut violations = Vec::new();
        self.ensure_live(column.id(), &mut violations);
        if let Some(new) = &computation {
            if new.expression.contains_kind(ExprKind::WindowCall) {
                violations.push(Violation::WindowFunctionNotAllowed);
            }
            for referenced in new.expression.referenced_columns() {
                if referenced == column_name {
                    violations.push(Violation::SelfReferencingComputation {
                        column: column_name.clone(),
                    });
                } else if self.column(table, &referenced).is_none() {
                    violations.push(Violation::UnknownColumn {
                        column: referenced,
                        table: self.name(table).to_string(),
                    });
                }
            }
        }
        let toggles = self.column_data(column).computation.is_some() != computation.is_some();
        if toggles && !self.referencing_objects(column.id()).is_empty() {
            violations.push(Violation::ComputationToggleWithReferences {
                column: column_name.clone(),
            });
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        // Re-point the computation's dependency edges.
        let old_targets: Vec<ObjectId> = self
            .computation(column)
            .map(|c| c.expression.referenced_columns())
            .unwrap_or_default()
            .iter()
            .filter_map(|name| self.column(table, name))
            .map(ColumnId::id)
            .collect();
        for target in old_targets {
            self.refs
                .remove(column.id(), Some(PropertyTag::Computation), target);
        }
        if let Some(new) = &computation {
            let new_targets: Vec<ObjectId> = new
                .expression
                .referenced_columns()
                .iter()
                .filter_map(|name| self.column(table, name))
                .map(ColumnId::id)
                .collect();
            for target in new_targets {
                self.refs
                    .add(column.id(), Some(PropertyTag::Computation), target);
            }
        }

        let (old, old_default) = {
            let ObjectData::Column(data) = &mut self.slot_mut(column.id()).data else {
                unreachable!("handle is not a column");
            };
            let old = std::mem::replace(&mut data.computation, computation.clone());
            let old_default = if data.computation.is_some() {
                data.default_value.take()
            } else {
                None
            };
            (old, old_default)
        };

        if let Some(default) = old_default {
            self.notify_changed(
                column.id(),
                PropertyTag::DefaultValue,
                PropertyValue::DefaultValue(Some(default)),
                &PropertyValue::DefaultValue(None),
            );
        }
        self.notify_changed(
            column.id(),
            PropertyTag::Computation,
            PropertyValue::Computation(old),
            &PropertyValue::Computation(computation),
        );
        Ok(())
    }

    /// Creates a check constraint. Without an explicit name the
    /// constraint is named `CHK_{table}_{content hash}`.
    pub fn create_check(
        &mut self,
        table: TableId,
        name: Option<&str>,
        condition: SqlExpr,
    ) -> Result<CheckId> {
        let table_slot = self.try_slot(table.id())?;
        let table_name = table_slot.name.clone();
        let context = format!("create_check on table '{table_name}'");

        let mut violations = Vec::new();
        if table_slot.removed {
            violations.push(Violation::ObjectRemoved { name: table_name.clone() });
        }
        self.validate_table_expression(table, &condition, &mut violations);

        let name = match name {
            Some(given) => {
                if !is_valid_identifier(given) {
                    violations.push(Violation::InvalidIdentifier { name: given.into() });
                }
                given.to_string()
            }
            None => naming::check_name(&table_name, &condition.to_string()),
        };
        let schema = SchemaId(self.owning_schema(table.id()));
        self.check_schema_namespace(schema, &name, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let targets: Vec<ObjectId> = condition
            .referenced_columns()
            .iter()
            .filter_map(|c| self.column(table, c))
            .map(ColumnId::id)
            .collect();
        let id = self.alloc(ObjectSlot::new(
            &name,
            ObjectData::Check(CheckData {
                table: table.id(),
                condition,
            }),
        ));
        self.register_in_schema(schema.id(), &name, id);
        self.register_constraint(table.id(), id);
        for target in targets {
            self.refs.add(id, None, target);
        }
        self.notify_created(id);
        Ok(CheckId(id))
    }

    // ---- shared helpers -------------------------------------------

    pub(crate) fn ensure_live(&self, id: ObjectId, violations: &mut Vec<Violation>) {
        let slot = self.slot(id);
        if slot.removed {
            violations.push(Violation::ObjectRemoved {
                name: slot.name.clone(),
            });
        }
    }

    pub(crate) fn check_schema_namespace(
        &self,
        schema: SchemaId,
        name: &str,
        violations: &mut Vec<Violation>,
    ) {
        let ObjectData::Schema(data) = &self.slot(schema.id()).data else {
            return;
        };
        if data.objects.contains_key(name) {
            let schema_name = if self.slot(schema.id()).name.is_empty() {
                "the default schema".to_string()
            } else {
                format!("schema '{}'", self.slot(schema.id()).name)
            };
            violations.push(Violation::DuplicateName {
                name: name.into(),
                namespace: schema_name,
            });
        }
    }

    pub(crate) fn register_in_schema(&mut self, schema: ObjectId, name: &str, id: ObjectId) {
        if let ObjectData::Schema(data) = &mut self.slot_mut(schema).data {
            data.objects.insert(name.to_string(), id);
        }
    }

    pub(crate) fn register_constraint(&mut self, table: ObjectId, id: ObjectId) {
        if let ObjectData::Table(data) = &mut self.slot_mut(table).data {
            data.constraints.push(id);
        }
    }

    /// Collects one violation per index or view currently using the
    /// column (directly or as a filter operand).
    fn column_usage_violations(&self, column: ColumnId, violations: &mut Vec<Violation>) {
        let mut seen: Vec<ObjectId> = Vec::new();
        for reference in self.referencing_objects(column.id()) {
            if seen.contains(&reference.source) {
                continue;
            }
            seen.push(reference.source);
            let source = self.slot(reference.source);
            match source.kind() {
                ObjectKind::Index => violations.push(Violation::ColumnUsedByIndex {
                    column: self.name(column).to_string(),
                    index: source.name.clone(),
                }),
                ObjectKind::View => violations.push(Violation::ColumnUsedByView {
                    column: self.name(column).to_string(),
                    view: source.name.clone(),
                }),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ExistenceState;

    fn db_with_table() -> (Database, TableId) {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "users").unwrap();
        (db, table)
    }

    #[test]
    fn test_create_table_and_column() {
        let (mut db, table) = db_with_table();
        let id = db.create_column(table, "id").unwrap();

        assert_eq!(db.column(table, "id"), Some(id));
        assert!(!db.is_nullable(id));
        assert!(db.default_value(id).is_none());
        assert_eq!(db.existence_state(id), ExistenceState::Created);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let (mut db, table) = db_with_table();
        db.create_column(table, "id").unwrap();
        let err = db.create_column(table, "id").unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }

    #[test]
    fn test_column_rename_rekeys_table_namespace() {
        let (mut db, table) = db_with_table();
        let id = db.create_column(table, "C1").unwrap();
        db.set_name(id, "C2").unwrap();

        assert!(db.column(table, "C1").is_none());
        assert_eq!(db.column(table, "C2"), Some(id));
    }

    #[test]
    fn test_set_default_value_rejects_column_references() {
        let (mut db, table) = db_with_table();
        let id = db.create_column(table, "total").unwrap();

        let err = db
            .set_default_value(id, Some(SqlExpr::column("other")))
            .unwrap_err();
        assert!(err.to_string().contains("column references"));
    }

    #[test]
    fn test_set_default_value_rejects_window_functions() {
        let (mut db, table) = db_with_table();
        let id = db.create_column(table, "rank").unwrap();

        let windowed = SqlExpr::window_call("row_number", vec![], vec![]);
        let err = db.set_default_value(id, Some(windowed)).unwrap_err();
        assert!(err.to_string().contains("window functions"));
    }

    #[test]
    fn test_default_forbidden_on_generated_column() {
        let (mut db, table) = db_with_table();
        db.create_column(table, "a").unwrap();
        let b = db.create_column(table, "b").unwrap();
        db.set_computation(b, Some(Computation::stored(SqlExpr::column("a"))))
            .unwrap();

        let err = db
            .set_default_value(b, Some(SqlExpr::integer(1)))
            .unwrap_err();
        assert!(err.to_string().contains("generated"));
    }

    #[test]
    fn test_computation_clears_default() {
        let (mut db, table) = db_with_table();
        db.create_column(table, "a").unwrap();
        let b = db.create_column(table, "b").unwrap();
        db.set_default_value(b, Some(SqlExpr::integer(0))).unwrap();

        db.set_computation(b, Some(Computation::virtual_(SqlExpr::column("a"))))
            .unwrap();
        assert!(db.default_value(b).is_none());
        assert!(db.computation(b).is_some());
    }

    #[test]
    fn test_self_referencing_computation_rejected() {
        let (mut db, table) = db_with_table();
        let a = db.create_column(table, "a").unwrap();

        let err = db
            .set_computation(a, Some(Computation::stored(SqlExpr::column("a"))))
            .unwrap_err();
        assert!(err.to_string().contains("references the column itself"));
    }

    #[test]
    fn test_computation_tracks_referenced_columns() {
        let (mut db, table) = db_with_table();
        let a = db.create_column(table, "a").unwrap();
        let b = db.create_column(table, "b").unwrap();

        db.set_computation(b, Some(Computation::stored(SqlExpr::column("a"))))
            .unwrap();
        let incoming = db.referencing_objects(a);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, b.id());
        assert_eq!(incoming[0].property, Some(PropertyTag::Computation));

        db.set_computation(b, None).unwrap();
        assert!(db.referencing_objects(a).is_empty());
    }

    #[test]
    fn test_check_gets_content_hashed_default_name() {
        let (mut db, table) = db_with_table();
        db.create_column(table, "quantity").unwrap();
        let condition = SqlExpr::column("quantity").gt(SqlExpr::integer(0));
        let check = db.create_check(table, None, condition.clone()).unwrap();

        let name = db.name(check).to_string();
        assert!(name.starts_with("CHK_users_"));
        assert_eq!(name.len(), "CHK_users_".len() + 32);
        assert_eq!(
            name,
            crate::naming::check_name("users", &condition.to_string())
        );
    }

    #[test]
    fn test_check_condition_must_resolve_columns() {
        let (mut db, table) = db_with_table();
        let err = db
            .create_check(table, None, SqlExpr::column("ghost").gt(SqlExpr::integer(0)))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_foreign_registry_definition_is_contract_error() {
        use anvil_sql_core::types::{DataType, StandardTypeRegistry, TypeRegistry};

        let (mut db, table) = db_with_table();
        let foreign = StandardTypeRegistry::new();
        let def = foreign.by_data_type(&DataType::Integer).unwrap();

        let err = db.create_column_with_type(table, "x", def).unwrap_err();
        assert!(matches!(err, crate::error::SchemaError::Contract(_)));
    }
}
