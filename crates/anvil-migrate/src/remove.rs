//! Cascading removal.
//!
//! `remove` validates that tearing the object out of the graph breaks
//! no outside dependent, then removes owned descendants in order before
//! the object itself. Descendants go through `quick_remove`, the
//! unchecked non-emitting teardown primitive — it exists only as the
//! cascade's internal step and is not reachable from outside this
//! module, so the validated path is the only public way to remove
//! anything.

use tracing::debug;

use crate::database::Database;
use crate::error::{Result, ValidationErrors, Violation};
use crate::object::{ObjectData, ObjectId, ObjectKind};

impl Database {
    /// Removes an object and everything it owns. A no-op when the
    /// object is already removed.
    ///
    /// Fails when a still-existing object outside the removal set
    /// depends on any member of it: an external foreign key targeting a
    /// removed index, a view reading a removed table or column, an
    /// index or check using a removed column. All such dependents are
    /// reported together.
    pub fn remove(&mut self, id: impl Into<ObjectId>) -> Result<()> {
        let id = id.into();
        let slot = self.try_slot(id)?;
        if slot.removed {
            return Ok(());
        }
        let root_name = slot.name.clone();
        let context = format!("remove '{root_name}'");

        let mut violations = Vec::new();
        if id == self.default_schema().id() {
            violations.push(Violation::DefaultSchemaImmutable);
        }

        let members = self.cascade_members(id);
        let mut reported: Vec<(ObjectId, ObjectId)> = Vec::new();
        for member in &members {
            for reference in self.refs.incoming(*member) {
                if members.contains(&reference.source) || self.slot(reference.source).removed {
                    continue;
                }
                if reported.contains(&(reference.source, *member)) {
                    continue;
                }
                reported.push((reference.source, *member));
                violations.push(Violation::RemoveBlockedByReference {
                    object: self.slot(*member).name.clone(),
                    referrer: self.slot(reference.source).name.clone(),
                });
            }
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        debug!(object = %root_name, members = members.len(), "cascading removal");

        let owner = self.owner_of(id);
        for member in &members {
            self.quick_remove(*member);
            if *member == id {
                self.tracker.note_removed(&self.objects, owner, id);
            } else {
                self.tracker.note_absorbed(*member);
            }
        }
        Ok(())
    }

    /// Returns the full removal set of `root` in teardown order, the
    /// root last. For a table: checks, foreign keys, plain indexes, the
    /// primary key, the primary key's backing index last among the
    /// indexes, then columns, then the table. For a schema: every owned
    /// table's cascade, then views, then the schema.
    fn cascade_members(&self, root: ObjectId) -> Vec<ObjectId> {
        match &self.slot(root).data {
            ObjectData::PrimaryKey(data) => vec![root, data.index],
            ObjectData::Table(_) => self.table_cascade(root),
            ObjectData::Schema(data) => {
                let mut members = Vec::new();
                let owned: Vec<ObjectId> = data.objects.values().copied().collect();
                for object in &owned {
                    if self.slot(*object).kind() == ObjectKind::Table && !self.slot(*object).removed
                    {
                        members.extend(self.table_cascade(*object));
                    }
                }
                for object in &owned {
                    if self.slot(*object).kind() == ObjectKind::View && !self.slot(*object).removed {
                        members.push(*object);
                    }
                }
                members.push(root);
                members
            }
            _ => vec![root],
        }
    }

    fn table_cascade(&self, table: ObjectId) -> Vec<ObjectId> {
        let ObjectData::Table(data) = &self.slot(table).data else {
            return vec![table];
        };
        let backing_index = data.primary_key.and_then(|pk| match &self.slot(pk).data {
            ObjectData::PrimaryKey(p) => Some(p.index),
            _ => None,
        });

        let mut members = Vec::new();
        for kind in [ObjectKind::Check, ObjectKind::ForeignKey] {
            for constraint in &data.constraints {
                if !self.slot(*constraint).removed && self.slot(*constraint).kind() == kind {
                    members.push(*constraint);
                }
            }
        }
        for constraint in &data.constraints {
            if !self.slot(*constraint).removed
                && self.slot(*constraint).kind() == ObjectKind::Index
                && Some(*constraint) != backing_index
            {
                members.push(*constraint);
            }
        }
        if let Some(pk) = data.primary_key {
            if !self.slot(pk).removed {
                members.push(pk);
            }
        }
        if let Some(index) = backing_index {
            if !self.slot(index).removed {
                members.push(index);
            }
        }
        for column in data.columns.values() {
            if !self.slot(*column).removed {
                members.push(*column);
            }
        }
        members.push(table);
        members
    }

    /// Unchecked teardown of a single object: clears its dependency
    /// edges in both directions, empties owned collections, nulls
    /// cross-links, unlinks it from every collection indexing it, and
    /// marks it removed. No validation, no emitted action.
    fn quick_remove(&mut self, id: ObjectId) {
        self.refs.clear_from(id);
        self.refs.clear_into(id);

        enum Owner {
            Database,
            Schema(ObjectId),
            TableColumns(ObjectId),
            Constraint(ObjectId),
            PrimaryKey(ObjectId, ObjectId),
        }

        let name = self.slot(id).name.clone();
        let owner = match &self.slot(id).data {
            ObjectData::Schema(_) => Owner::Database,
            ObjectData::Table(data) => Owner::Schema(data.schema),
            ObjectData::View(data) => Owner::Schema(data.schema),
            ObjectData::Column(data) => Owner::TableColumns(data.table),
            ObjectData::Index(data) => Owner::Constraint(data.table),
            ObjectData::ForeignKey(data) => Owner::Constraint(data.table),
            ObjectData::Check(data) => Owner::Constraint(data.table),
            ObjectData::PrimaryKey(data) => Owner::PrimaryKey(data.table, data.index),
        };

        // Unlink from every collection indexing the object by name.
        match owner {
            Owner::Database => {
                if self.schemas.get(&name) == Some(&id) {
                    self.schemas.shift_remove(&name);
                }
            }
            Owner::Schema(schema) => self.unregister_from_schema(schema, &name, id),
            Owner::TableColumns(table) => {
                if let ObjectData::Table(t) = &mut self.slot_mut(table).data {
                    if t.columns.get(&name) == Some(&id) {
                        t.columns.shift_remove(&name);
                    }
                }
            }
            Owner::Constraint(table) => self.unlink_constraint(table, id),
            Owner::PrimaryKey(table, index) => {
                self.unlink_constraint(table, id);
                if let ObjectData::Index(i) = &mut self.slot_mut(index).data {
                    i.primary_key = None;
                }
                if let ObjectData::Table(t) = &mut self.slot_mut(table).data {
                    if t.primary_key == Some(id) {
                        t.primary_key = None;
                    }
                }
            }
        }

        // Empty owned collections and null cross-links.
        match &mut self.slot_mut(id).data {
            ObjectData::Schema(data) => data.objects.clear(),
            ObjectData::Table(data) => {
                data.columns.clear();
                data.constraints.clear();
                data.primary_key = None;
            }
            ObjectData::Index(data) => data.primary_key = None,
            _ => {}
        }
        self.slot_mut(id).removed = true;
    }

    fn unregister_from_schema(&mut self, schema: ObjectId, name: &str, id: ObjectId) {
        if let ObjectData::Schema(data) = &mut self.slot_mut(schema).data {
            if data.objects.get(name) == Some(&id) {
                data.objects.shift_remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ExistenceState;
    use crate::object::{IndexColumn, SortOrder, TableId};

    fn table_with_pk(db: &mut Database, name: &str) -> TableId {
        let table = db.create_table(db.default_schema(), name).unwrap();
        let id = db.create_column(table, "id").unwrap();
        db.set_primary_key(table, None, &[(id, SortOrder::Ascending)])
            .unwrap();
        table
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "t").unwrap();
        db.remove(table).unwrap();
        db.remove(table).unwrap();
        assert!(db.is_removed(table));
    }

    #[test]
    fn test_table_cascade_removes_everything() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let table = table_with_pk(&mut db, "T");
        let column = db.column(table, "id").unwrap();
        let pk = db.primary_key_of(table).unwrap();
        let index = db.primary_key_index(pk);
        db.commit();

        db.remove(table).unwrap();

        for id in [table.id(), column.id(), pk.id(), index.id()] {
            assert!(db.is_removed(id));
            assert!(db.referencing_objects(id).is_empty());
        }
        assert!(db.table(schema, "T").is_none());
        assert!(db.primary_key(schema, "PK_T").is_none());
        assert!(db.index(schema, "UIX_T_idA").is_none());
    }

    #[test]
    fn test_table_removal_emits_single_remove_action() {
        let mut db = Database::new();
        let table = table_with_pk(&mut db, "T");
        db.commit();

        db.remove(table).unwrap();
        let actions = db.pending_actions();
        assert_eq!(actions.len(), 1);
        let batch = actions[0].as_batch().unwrap();
        assert!(batch.creates.is_empty());
        assert!(batch.alters.is_empty());
        assert_eq!(batch.removes.len(), 1);
        assert_eq!(batch.removes[0].object.name, "T");
    }

    #[test]
    fn test_column_remove_blocked_by_index() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "t").unwrap();
        let column = db.create_column(table, "a").unwrap();
        db.create_index(table, None, vec![IndexColumn::asc(column)])
            .unwrap();

        let err = db.remove(column).unwrap_err();
        assert!(err.to_string().contains("referenced by 'IX_t_aA'"));
        assert!(!db.is_removed(column));
    }

    #[test]
    fn test_table_remove_blocked_by_external_foreign_key() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let users = table_with_pk(&mut db, "users");
        let target = db.primary_key_index(db.primary_key_of(users).unwrap());

        let orders = db.create_table(schema, "orders").unwrap();
        let owner = db.create_column(orders, "owner_id").unwrap();
        let origin = db
            .create_index(orders, None, vec![IndexColumn::asc(owner)])
            .unwrap();
        let fk = db.create_foreign_key(None, origin, target).unwrap();

        let err = db.remove(users).unwrap_err();
        assert!(err
            .to_string()
            .contains("FK_orders_owner_idA_REF_users"));

        // Removing the dependent first unblocks the table and clears
        // the incoming edge on the referenced index.
        db.remove(fk).unwrap();
        assert!(db
            .referencing_objects(target)
            .iter()
            .all(|r| r.source != fk.id()));
        db.remove(users).unwrap();
        assert!(db.is_removed(users));
    }

    #[test]
    fn test_self_referencing_foreign_key_does_not_block() {
        let mut db = Database::new();
        let nodes = table_with_pk(&mut db, "nodes");
        let parent = db.create_column(nodes, "parent_id").unwrap();
        let origin = db
            .create_index(nodes, None, vec![IndexColumn::asc(parent)])
            .unwrap();
        let target = db.primary_key_index(db.primary_key_of(nodes).unwrap());
        db.create_foreign_key(None, origin, target).unwrap();

        db.remove(nodes).unwrap();
        assert!(db.is_removed(nodes));
    }

    #[test]
    fn test_table_remove_blocked_by_view() {
        use anvil_sql_core::expr::{QueryRef, ViewQuery};

        let mut db = Database::new();
        let schema = db.default_schema();
        let users = db.create_table(schema, "users").unwrap();
        db.create_column(users, "id").unwrap();
        let view = db
            .create_view(
                schema,
                "v_users",
                ViewQuery::new("SELECT id FROM users")
                    .with_reference(QueryRef::new("users", vec!["id".into()])),
            )
            .unwrap();

        let err = db.remove(users).unwrap_err();
        assert!(err.to_string().contains("v_users"));

        db.remove(view).unwrap();
        db.remove(users).unwrap();
    }

    #[test]
    fn test_schema_cascade_removes_tables_and_views() {
        use anvil_sql_core::expr::{QueryRef, ViewQuery};

        let mut db = Database::new();
        let reporting = db.create_schema("reporting").unwrap();
        let facts = db.create_table(reporting, "facts").unwrap();
        db.create_column(facts, "id").unwrap();
        let view = db
            .create_view(
                reporting,
                "v_facts",
                ViewQuery::new("SELECT id FROM facts")
                    .with_reference(QueryRef::new("facts", vec!["id".into()])),
            )
            .unwrap();

        db.remove(reporting).unwrap();
        assert!(db.is_removed(reporting));
        assert!(db.is_removed(facts));
        assert!(db.is_removed(view));
        assert!(db.schema("reporting").is_none());
    }

    #[test]
    fn test_default_schema_cannot_be_removed() {
        let mut db = Database::new();
        let err = db.remove(db.default_schema()).unwrap_err();
        assert!(err.to_string().contains("default schema"));
    }

    #[test]
    fn test_created_table_removal_collapses_to_nothing() {
        let mut db = Database::new();
        db.commit();
        let table = table_with_pk(&mut db, "T");

        db.remove(table).unwrap();
        assert_eq!(db.pending_action_count(), 0);

        // The name is immediately reusable.
        let again = db.create_table(db.default_schema(), "T").unwrap();
        assert_eq!(db.existence_state(again), ExistenceState::Created);
    }

    #[test]
    fn test_removed_name_is_reusable_after_commit() {
        let mut db = Database::new();
        let table = table_with_pk(&mut db, "T");
        db.commit();

        db.remove(table).unwrap();
        let replacement = db.create_table(db.default_schema(), "T").unwrap();
        assert_ne!(replacement.id(), table.id());
        assert_eq!(db.table(db.default_schema(), "T"), Some(replacement));
    }
}
