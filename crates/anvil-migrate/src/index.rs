//! Index and primary key operations.

use anvil_sql_core::expr::SqlExpr;

use crate::changes::PropertyValue;
use crate::database::Database;
use crate::error::{Result, ValidationErrors, Violation};
use crate::ident::is_valid_identifier;
use crate::naming;
use crate::object::{
    ColumnId, IndexColumn, IndexData, IndexExpr, IndexId, ObjectData, ObjectId, ObjectKind,
    ObjectSlot, PrimaryKeyData, PrimaryKeyId, PropertyTag, SchemaId, SortOrder, TableId,
};

impl Database {
    /// Creates an index on a table. Without an explicit name the index
    /// is named `{U?}IX_{table}_{tokens}` from its column list.
    pub fn create_index(
        &mut self,
        table: TableId,
        name: Option<&str>,
        columns: Vec<IndexColumn>,
    ) -> Result<IndexId> {
        let table_slot = self.try_slot(table.id())?;
        let table_name = table_slot.name.clone();
        let table_removed = table_slot.removed;
        let context = format!("create_index on table '{table_name}'");

        let mut violations = Vec::new();
        if table_removed {
            violations.push(Violation::ObjectRemoved {
                name: table_name.clone(),
            });
        }
        if columns.is_empty() {
            violations.push(Violation::IndexWithoutColumns);
        }
        for entry in &columns {
            match &entry.expr {
                IndexExpr::Column(column) => {
                    self.check_key_column_membership(table, *column, &mut violations);
                }
                IndexExpr::Expression(expr) => {
                    self.validate_table_expression(table, expr, &mut violations);
                }
            }
        }

        let name = match name {
            Some(given) => {
                if !is_valid_identifier(given) {
                    violations.push(Violation::InvalidIdentifier { name: given.into() });
                }
                given.to_string()
            }
            None => naming::index_name(&table_name, &self.index_tokens(&columns), false),
        };
        let schema = SchemaId(self.owning_schema(table.id()));
        self.check_schema_namespace(schema, &name, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            &name,
            ObjectData::Index(IndexData {
                table: table.id(),
                columns,
                unique: false,
                virtual_: false,
                filter: None,
                primary_key: None,
            }),
        ));
        self.register_in_schema(schema.id(), &name, id);
        self.register_constraint(table.id(), id);
        let index = IndexId(id);
        for column in self.referenced_columns(index) {
            self.refs.add(id, None, column.id());
        }
        self.notify_created(id);
        Ok(index)
    }

    /// Toggles index uniqueness.
    ///
    /// A primary-key backing index must stay unique; an index with
    /// expression columns cannot become unique; uniqueness cannot be
    /// dropped while a foreign key references the index. Violated rules
    /// accumulate.
    pub fn set_unique(&mut self, index: IndexId, unique: bool) -> Result<()> {
        self.try_slot(index.id())?;
        if self.index_data(index).unique == unique {
            return Ok(());
        }
        let index_name = self.name(index).to_string();
        let context = format!("set_unique on index '{index_name}'");

        let mut violations = Vec::new();
        self.ensure_live(index.id(), &mut violations);
        if unique {
            if self.has_expression_columns(index) {
                violations.push(Violation::ExpressionIndexCannotBeUnique {
                    index: index_name.clone(),
                });
            }
        } else {
            if self.index_data(index).primary_key.is_some() {
                violations.push(Violation::PrimaryKeyIndexMustStayUnique {
                    index: index_name.clone(),
                });
            }
            if let Some(fk) = self.referencing_foreign_key(index.id()) {
                violations.push(Violation::IndexReferencedByForeignKey {
                    index: index_name.clone(),
                    foreign_key: fk,
                });
            }
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        if let ObjectData::Index(data) = &mut self.slot_mut(index.id()).data {
            data.unique = unique;
        }
        self.notify_changed(
            index.id(),
            PropertyTag::Unique,
            PropertyValue::Unique(!unique),
            &PropertyValue::Unique(unique),
        );
        Ok(())
    }

    /// Toggles index virtuality.
    ///
    /// Only the index backing a table's primary key can be virtual (an
    /// implicitly maintained index with no physical identity); a
    /// primary-key backing index that is virtual stays virtual.
    pub fn set_virtual(&mut self, index: IndexId, virtual_: bool) -> Result<()> {
        self.try_slot(index.id())?;
        if self.index_data(index).virtual_ == virtual_ {
            return Ok(());
        }
        let index_name = self.name(index).to_string();
        let context = format!("set_virtual on index '{index_name}'");

        let mut violations = Vec::new();
        self.ensure_live(index.id(), &mut violations);
        let backs_primary_key = self.index_data(index).primary_key.is_some();
        if virtual_ {
            if !backs_primary_key {
                let data = self.index_data(index);
                if data.unique {
                    violations.push(Violation::UniqueIndexCannotBeVirtual {
                        index: index_name.clone(),
                    });
                }
                if data.filter.is_some() {
                    violations.push(Violation::FilteredIndexCannotBeVirtual {
                        index: index_name.clone(),
                    });
                }
                if !data.unique && data.filter.is_none() {
                    violations.push(Violation::OnlyPrimaryKeyIndexCanBeVirtual {
                        index: index_name.clone(),
                    });
                }
            }
        } else if backs_primary_key {
            violations.push(Violation::PrimaryKeyIndexMustStayVirtual {
                index: index_name.clone(),
            });
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        if let ObjectData::Index(data) = &mut self.slot_mut(index.id()).data {
            data.virtual_ = virtual_;
        }
        self.notify_changed(
            index.id(),
            PropertyTag::Virtual,
            PropertyValue::Virtual(!virtual_),
            &PropertyValue::Virtual(virtual_),
        );
        Ok(())
    }

    /// Sets or clears an index's filter condition (partial index).
    ///
    /// Forbidden on a primary-key backing index, on a virtual index,
    /// and on an index referenced by a foreign key. Filter column
    /// references are tracked under the `Filter` property tag, distinct
    /// from the index's own key-column edges.
    pub fn set_filter(&mut self, index: IndexId, filter: Option<SqlExpr>) -> Result<()> {
        self.try_slot(index.id())?;
        if self.index_data(index).filter == filter {
            return Ok(());
        }
        let index_name = self.name(index).to_string();
        let context = format!("set_filter on index '{index_name}'");
        let table = TableId(self.index_data(index).table);

        let mut violations = Vec::new();
        self.ensure_live(index.id(), &mut violations);
        if self.index_data(index).primary_key.is_some() {
            violations.push(Violation::FilterOnPrimaryKeyIndex {
                index: index_name.clone(),
            });
        }
        if self.index_data(index).virtual_ {
            violations.push(Violation::FilterOnVirtualIndex {
                index: index_name.clone(),
            });
        }
        if let Some(fk) = self.referencing_foreign_key(index.id()) {
            violations.push(Violation::IndexReferencedByForeignKey {
                index: index_name.clone(),
                foreign_key: fk,
            });
        }
        if let Some(expr) = &filter {
            self.validate_table_expression(table, expr, &mut violations);
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let old_targets = self.filter_targets(index, table);
        for target in old_targets {
            self.refs
                .remove(index.id(), Some(PropertyTag::Filter), target);
        }

        let old = {
            let ObjectData::Index(data) = &mut self.slot_mut(index.id()).data else {
                unreachable!("handle is not an index");
            };
            std::mem::replace(&mut data.filter, filter.clone())
        };

        let new_targets = self.filter_targets(index, table);
        for target in new_targets {
            self.refs.add(index.id(), Some(PropertyTag::Filter), target);
        }

        self.notify_changed(
            index.id(),
            PropertyTag::Filter,
            PropertyValue::Filter(old),
            &PropertyValue::Filter(filter),
        );
        Ok(())
    }

    /// Sets the table's primary key, creating a unique backing index
    /// over the given columns and removing the previous primary key
    /// (and its backing index) if any.
    ///
    /// A no-op when the current primary key already covers exactly the
    /// requested columns under the resulting name. The previous primary
    /// key must satisfy ordinary removal preconditions (no foreign key
    /// may reference its backing index), so the call can fail even
    /// though the new key itself is valid.
    pub fn set_primary_key(
        &mut self,
        table: TableId,
        name: Option<&str>,
        columns: &[(ColumnId, SortOrder)],
    ) -> Result<PrimaryKeyId> {
        let table_slot = self.try_slot(table.id())?;
        let table_name = table_slot.name.clone();
        let table_removed = table_slot.removed;
        let context = format!("set_primary_key on table '{table_name}'");
        let pk_name = name.map_or_else(|| naming::primary_key_name(&table_name), String::from);

        // No-op when both the backing index and the resulting name
        // already match.
        if let Some(existing) = self.primary_key_of(table) {
            let backing = self.primary_key_index(existing);
            if self.name(existing) == pk_name && self.index_matches(backing, columns) {
                return Ok(existing);
            }
        }

        let mut violations = Vec::new();
        if table_removed {
            violations.push(Violation::ObjectRemoved {
                name: table_name.clone(),
            });
        }
        if columns.is_empty() {
            violations.push(Violation::PrimaryKeyWithoutColumns);
        }
        for (column, _) in columns {
            self.check_key_column_membership(table, *column, &mut violations);
            let data = self.column_data(*column);
            if data.table == table.id() && !self.slot(column.id()).removed {
                if data.nullable {
                    violations.push(Violation::NullableKeyColumn {
                        column: self.name(*column).to_string(),
                    });
                }
                if data.computation.is_some() {
                    violations.push(Violation::GeneratedKeyColumn {
                        column: self.name(*column).to_string(),
                    });
                }
            }
        }
        if let Some(given) = name {
            if !is_valid_identifier(given) {
                violations.push(Violation::InvalidIdentifier { name: given.into() });
            }
        }

        // The previous key is removed as part of the swap and must
        // satisfy ordinary removal preconditions.
        let outgoing = self.primary_key_of(table);
        if let Some(old_pk) = outgoing {
            let old_index = self.primary_key_index(old_pk);
            if let Some(fk) = self.referencing_foreign_key_excluding(old_index.id(), old_pk.id()) {
                violations.push(Violation::IndexReferencedByForeignKey {
                    index: self.name(old_index).to_string(),
                    foreign_key: fk,
                });
            }
        }

        let entries: Vec<IndexColumn> = columns
            .iter()
            .map(|(column, order)| IndexColumn {
                expr: IndexExpr::Column(*column),
                order: *order,
            })
            .collect();
        let index_name = naming::index_name(&table_name, &self.index_tokens(&entries), true);
        let schema = SchemaId(self.owning_schema(table.id()));
        let excluded: Vec<ObjectId> = outgoing
            .map(|pk| vec![pk.id(), self.primary_key_index(pk).id()])
            .unwrap_or_default();
        self.check_namespace_excluding(schema, &pk_name, &excluded, &mut violations);
        self.check_namespace_excluding(schema, &index_name, &excluded, &mut violations);
        if pk_name == index_name {
            violations.push(Violation::DuplicateName {
                name: pk_name.clone(),
                namespace: format!("table '{table_name}'"),
            });
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        // Swap: drop the previous pair, then build the new one.
        if let Some(old_pk) = outgoing {
            self.drop_primary_key_pair(table.id(), old_pk.id());
        }

        let index_id = self.alloc(ObjectSlot::new(
            &index_name,
            ObjectData::Index(IndexData {
                table: table.id(),
                columns: entries,
                unique: true,
                virtual_: false,
                filter: None,
                primary_key: None,
            }),
        ));
        self.register_in_schema(schema.id(), &index_name, index_id);
        self.register_constraint(table.id(), index_id);
        for (column, _) in columns {
            self.refs.add(index_id, None, column.id());
        }
        self.notify_created(index_id);

        let pk_id = self.alloc(ObjectSlot::new(
            &pk_name,
            ObjectData::PrimaryKey(PrimaryKeyData {
                table: table.id(),
                index: index_id,
            }),
        ));
        self.register_in_schema(schema.id(), &pk_name, pk_id);
        self.register_constraint(table.id(), pk_id);
        self.refs.add(pk_id, None, index_id);
        if let ObjectData::Index(data) = &mut self.slot_mut(index_id).data {
            data.primary_key = Some(pk_id);
        }
        if let ObjectData::Table(data) = &mut self.slot_mut(table.id()).data {
            data.primary_key = Some(pk_id);
        }
        self.notify_created(pk_id);
        Ok(PrimaryKeyId(pk_id))
    }

    // ---- helpers --------------------------------------------------

    /// Builds the default-name tokens of an index column list: plain
    /// columns render as `{Column}{A|D}`, expression columns as
    /// `E{n}{A|D}` numbered among expression columns only.
    pub(crate) fn index_tokens(&self, columns: &[IndexColumn]) -> Vec<String> {
        let mut expression_ordinal = 0usize;
        columns
            .iter()
            .map(|entry| match &entry.expr {
                IndexExpr::Column(column) => {
                    format!("{}{}", self.name(*column), entry.order.token())
                }
                IndexExpr::Expression(_) => {
                    expression_ordinal += 1;
                    format!("E{expression_ordinal}{}", entry.order.token())
                }
            })
            .collect()
    }

    fn has_expression_columns(&self, index: IndexId) -> bool {
        self.index_data(index)
            .columns
            .iter()
            .any(|entry| matches!(entry.expr, IndexExpr::Expression(_)))
    }

    /// Returns the name of a foreign key referencing the index (as
    /// origin or target), if any.
    pub(crate) fn referencing_foreign_key(&self, index: ObjectId) -> Option<String> {
        self.referencing_foreign_key_excluding(index, index)
    }

    fn referencing_foreign_key_excluding(&self, index: ObjectId, except: ObjectId) -> Option<String> {
        self.refs
            .incoming(index)
            .iter()
            .filter(|r| r.source != except)
            .find(|r| self.slot(r.source).kind() == ObjectKind::ForeignKey)
            .map(|r| self.slot(r.source).name.clone())
    }

    fn check_key_column_membership(
        &self,
        table: TableId,
        column: ColumnId,
        violations: &mut Vec<Violation>,
    ) {
        let slot = self.slot(column.id());
        let belongs = match &slot.data {
            ObjectData::Column(c) => c.table == table.id() && !slot.removed,
            _ => false,
        };
        if !belongs {
            violations.push(Violation::UnknownColumn {
                column: slot.name.clone(),
                table: self.name(table).to_string(),
            });
        }
    }

    fn check_namespace_excluding(
        &self,
        schema: SchemaId,
        name: &str,
        excluded: &[ObjectId],
        violations: &mut Vec<Violation>,
    ) {
        let ObjectData::Schema(data) = &self.slot(schema.id()).data else {
            return;
        };
        if let Some(existing) = data.objects.get(name) {
            if !excluded.contains(existing) {
                violations.push(Violation::DuplicateName {
                    name: name.into(),
                    namespace: format!("schema '{}'", self.slot(schema.id()).name),
                });
            }
        }
    }

    fn index_matches(&self, index: IndexId, columns: &[(ColumnId, SortOrder)]) -> bool {
        let data = self.index_data(index);
        data.columns.len() == columns.len()
            && data
                .columns
                .iter()
                .zip(columns)
                .all(|(entry, (column, order))| {
                    entry.column() == Some(*column) && entry.order == *order
                })
    }

    fn filter_targets(&self, index: IndexId, table: TableId) -> Vec<ObjectId> {
        self.index_data(index)
            .filter
            .as_ref()
            .map(|f| f.referenced_columns())
            .unwrap_or_default()
            .iter()
            .filter_map(|name| self.column(table, name))
            .map(ColumnId::id)
            .collect()
    }

    /// Tears down an outgoing primary key and its backing index as part
    /// of a primary key swap, notifying the tracker of both removals.
    fn drop_primary_key_pair(&mut self, table: ObjectId, pk: ObjectId) {
        let ObjectData::PrimaryKey(data) = &self.slot(pk).data else {
            unreachable!("handle is not a primary key");
        };
        let index = data.index;

        self.unlink_constraint(table, pk);
        self.refs.clear_from(pk);
        self.refs.clear_into(pk);
        self.slot_mut(pk).removed = true;
        let owner = table;
        self.tracker.note_removed(&self.objects, owner, pk);

        self.unlink_constraint(table, index);
        self.refs.clear_from(index);
        self.refs.clear_into(index);
        if let ObjectData::Index(data) = &mut self.slot_mut(index).data {
            data.primary_key = None;
        }
        self.slot_mut(index).removed = true;
        self.tracker.note_removed(&self.objects, owner, index);

        if let ObjectData::Table(data) = &mut self.slot_mut(table).data {
            data.primary_key = None;
        }
    }

    /// Unregisters a constraint from its table and schema collections.
    pub(crate) fn unlink_constraint(&mut self, table: ObjectId, constraint: ObjectId) {
        let name = self.slot(constraint).name.clone();
        let schema = self.owning_schema(table);
        if let ObjectData::Schema(data) = &mut self.slot_mut(schema).data {
            if data.objects.get(&name) == Some(&constraint) {
                data.objects.shift_remove(&name);
            }
        }
        if let ObjectData::Table(data) = &mut self.slot_mut(table).data {
            data.constraints.retain(|c| *c != constraint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    fn db_with_columns() -> (Database, TableId, ColumnId, ColumnId) {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "T").unwrap();
        let c1 = db.create_column(table, "C1").unwrap();
        let c2 = db.create_column(table, "C2").unwrap();
        (db, table, c1, c2)
    }

    fn violations(err: &SchemaError) -> &[Violation] {
        match err {
            SchemaError::Validation(v) => &v.violations,
            SchemaError::Contract(_) => panic!("expected validation error"),
        }
    }

    #[test]
    fn test_create_index_default_name() {
        let (mut db, table, c1, c2) = db_with_columns();
        let index = db
            .create_index(table, None, vec![IndexColumn::asc(c1), IndexColumn::desc(c2)])
            .unwrap();
        assert_eq!(db.name(index), "IX_T_C1A_C2D");
        assert_eq!(db.referenced_columns(index), vec![c1, c2]);
    }

    #[test]
    fn test_expression_tokens_count_expressions_only() {
        let (mut db, table, c1, _) = db_with_columns();
        let index = db
            .create_index(
                table,
                None,
                vec![
                    IndexColumn::expression(
                        SqlExpr::call("lower", vec![SqlExpr::column("C1")]),
                        SortOrder::Ascending,
                    ),
                    IndexColumn::asc(c1),
                    IndexColumn::expression(
                        SqlExpr::call("upper", vec![SqlExpr::column("C2")]),
                        SortOrder::Descending,
                    ),
                ],
            )
            .unwrap();
        assert_eq!(db.name(index), "IX_T_E1A_C1A_E2D");
    }

    #[test]
    fn test_index_tracks_key_columns() {
        let (mut db, table, c1, _) = db_with_columns();
        let index = db
            .create_index(table, None, vec![IndexColumn::asc(c1)])
            .unwrap();

        let incoming = db.referencing_objects(c1);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, index.id());
        assert_eq!(incoming[0].property, None);
    }

    #[test]
    fn test_filter_adds_tagged_edges() {
        let (mut db, table, c1, _) = db_with_columns();
        let index = db
            .create_index(table, None, vec![IndexColumn::asc(c1)])
            .unwrap();

        db.set_filter(index, Some(SqlExpr::column("C1").is_not_null()))
            .unwrap();
        // Key edge and filter edge from the same index, distinguished
        // by property tag.
        let incoming = db.referencing_objects(c1);
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].property, None);
        assert_eq!(incoming[1].property, Some(PropertyTag::Filter));

        db.set_filter(index, None).unwrap();
        assert_eq!(db.referencing_objects(c1).len(), 1);
    }

    #[test]
    fn test_expression_index_cannot_be_unique() {
        let (mut db, table, _, _) = db_with_columns();
        let index = db
            .create_index(
                table,
                None,
                vec![IndexColumn::expression(
                    SqlExpr::call("lower", vec![SqlExpr::column("C1")]),
                    SortOrder::Ascending,
                )],
            )
            .unwrap();

        let err = db.set_unique(index, true).unwrap_err();
        assert!(matches!(
            violations(&err)[0],
            Violation::ExpressionIndexCannotBeUnique { .. }
        ));
    }

    #[test]
    fn test_unique_filtered_index_reports_both_virtual_violations() {
        let (mut db, table, c1, _) = db_with_columns();
        let index = db
            .create_index(table, None, vec![IndexColumn::asc(c1)])
            .unwrap();
        db.set_unique(index, true).unwrap();
        db.set_filter(index, Some(SqlExpr::column("C1").is_not_null()))
            .unwrap();

        let err = db.set_virtual(index, true).unwrap_err();
        let violations = violations(&err);
        assert_eq!(violations.len(), 2);
        assert!(matches!(
            violations[0],
            Violation::UniqueIndexCannotBeVirtual { .. }
        ));
        assert!(matches!(
            violations[1],
            Violation::FilteredIndexCannotBeVirtual { .. }
        ));
    }

    #[test]
    fn test_plain_index_cannot_be_virtual() {
        let (mut db, table, c1, _) = db_with_columns();
        let index = db
            .create_index(table, None, vec![IndexColumn::asc(c1)])
            .unwrap();

        let err = db.set_virtual(index, true).unwrap_err();
        assert!(matches!(
            violations(&err)[0],
            Violation::OnlyPrimaryKeyIndexCanBeVirtual { .. }
        ));
    }

    #[test]
    fn test_primary_key_backing_index_can_become_virtual() {
        let (mut db, table, c1, _) = db_with_columns();
        let pk = db
            .set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();
        let backing = db.primary_key_index(pk);

        db.set_virtual(backing, true).unwrap();
        assert!(db.is_virtual(backing));

        let err = db.set_virtual(backing, false).unwrap_err();
        assert!(matches!(
            violations(&err)[0],
            Violation::PrimaryKeyIndexMustStayVirtual { .. }
        ));
    }

    #[test]
    fn test_primary_key_default_names() {
        let (mut db, table, c1, _) = db_with_columns();
        let pk = db
            .set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();

        assert_eq!(db.name(pk), "PK_T");
        assert_eq!(db.name(db.primary_key_index(pk)), "UIX_T_C1A");
        assert!(db.is_unique(db.primary_key_index(pk)));
        assert_eq!(db.primary_key_of(table), Some(pk));
    }

    #[test]
    fn test_primary_key_requires_non_nullable_plain_columns() {
        let (mut db, table, c1, c2) = db_with_columns();
        db.set_nullable(c1, true).unwrap();
        db.set_computation(
            c2,
            Some(crate::object::Computation::stored(SqlExpr::integer(1))),
        )
        .unwrap();

        let err = db
            .set_primary_key(
                table,
                None,
                &[(c1, SortOrder::Ascending), (c2, SortOrder::Ascending)],
            )
            .unwrap_err();
        let violations = violations(&err);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::NullableKeyColumn { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::GeneratedKeyColumn { .. })));
    }

    #[test]
    fn test_set_primary_key_is_noop_when_unchanged() {
        let (mut db, table, c1, _) = db_with_columns();
        let pk = db
            .set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();
        db.commit();

        let again = db
            .set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();
        assert_eq!(pk, again);
        assert_eq!(db.pending_action_count(), 0);
    }

    #[test]
    fn test_set_primary_key_replaces_previous_pair() {
        let (mut db, table, c1, c2) = db_with_columns();
        let first = db
            .set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();
        let first_index = db.primary_key_index(first);

        let second = db
            .set_primary_key(table, None, &[(c2, SortOrder::Ascending)])
            .unwrap();

        assert!(db.is_removed(first));
        assert!(db.is_removed(first_index));
        assert_eq!(db.primary_key_of(table), Some(second));
        // The replacement reuses the default name freed by the removal.
        assert_eq!(db.name(second), "PK_T");
        assert_eq!(db.name(db.primary_key_index(second)), "UIX_T_C2A");
    }

    #[test]
    fn test_unique_toggle_blocked_by_foreign_key() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let users = db.create_table(schema, "users").unwrap();
        let user_id = db.create_column(users, "id").unwrap();
        let pk = db
            .set_primary_key(users, None, &[(user_id, SortOrder::Ascending)])
            .unwrap();
        let target = db.primary_key_index(pk);

        let orders = db.create_table(schema, "orders").unwrap();
        let owner = db.create_column(orders, "owner_id").unwrap();
        let origin = db
            .create_index(orders, None, vec![IndexColumn::asc(owner)])
            .unwrap();
        db.create_foreign_key(None, origin, target).unwrap();

        let err = db.set_unique(target, false).unwrap_err();
        let violations = violations(&err);
        assert_eq!(violations.len(), 2);
        assert!(matches!(
            violations[0],
            Violation::PrimaryKeyIndexMustStayUnique { .. }
        ));
        assert!(matches!(
            violations[1],
            Violation::IndexReferencedByForeignKey { .. }
        ));
    }
}
