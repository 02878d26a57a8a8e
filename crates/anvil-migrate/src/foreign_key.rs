//! Foreign key operations.

use crate::changes::PropertyValue;
use crate::database::Database;
use crate::error::{Result, ValidationErrors, Violation};
use crate::ident::is_valid_identifier;
use crate::naming;
use crate::object::{
    ColumnId, ForeignKeyAction, ForeignKeyData, ForeignKeyId, IndexExpr, IndexId, ObjectData,
    ObjectSlot, PropertyTag, SchemaId,
};

impl Database {
    /// Creates a foreign key from an origin index to a referenced
    /// index.
    ///
    /// The referenced index must be unique, filterless, and
    /// non-expression, with non-nullable, non-generated columns; the
    /// origin index must be non-expression; column counts must match
    /// and every corresponding column pair must be type-compatible per
    /// the registry. Violations accumulate — an invalid origin and an
    /// invalid referenced index are reported together.
    ///
    /// Without an explicit name the key is named
    /// `FK_{origin table}_{origin tokens}_REF_{[schema_]table}`.
    pub fn create_foreign_key(
        &mut self,
        name: Option<&str>,
        origin: IndexId,
        referenced: IndexId,
    ) -> Result<ForeignKeyId> {
        self.try_slot(origin.id())?;
        self.try_slot(referenced.id())?;
        let origin_name = self.name(origin).to_string();
        let referenced_name = self.name(referenced).to_string();
        let context = format!("create_foreign_key '{origin_name}' -> '{referenced_name}'");

        let mut violations = Vec::new();
        self.ensure_live(origin.id(), &mut violations);
        self.ensure_live(referenced.id(), &mut violations);
        if origin.id() == referenced.id() {
            violations.push(Violation::IndexesMustDiffer);
        }

        let origin_columns = self.plain_columns(origin);
        let referenced_columns = self.plain_columns(referenced);
        if origin_columns.is_none() {
            violations.push(Violation::IndexHasExpressions {
                index: origin_name.clone(),
            });
        }
        if referenced_columns.is_none() {
            violations.push(Violation::IndexHasExpressions {
                index: referenced_name.clone(),
            });
        }
        if !self.is_unique(referenced) {
            violations.push(Violation::ReferencedIndexNotUnique {
                index: referenced_name.clone(),
            });
        }
        if self.filter(referenced).is_some() {
            violations.push(Violation::ReferencedIndexHasFilter {
                index: referenced_name.clone(),
            });
        }
        if let Some(columns) = &referenced_columns {
            for column in columns {
                let data = self.column_data(*column);
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
        if let (Some(origin_columns), Some(referenced_columns)) =
            (&origin_columns, &referenced_columns)
        {
            if origin_columns.len() == referenced_columns.len() {
                for (o, r) in origin_columns.iter().zip(referenced_columns) {
                    let compatible = self
                        .registry()
                        .compatible(self.column_type(*o), self.column_type(*r));
                    if !compatible {
                        violations.push(Violation::IncompatibleColumnTypes {
                            origin_column: self.name(*o).to_string(),
                            referenced_column: self.name(*r).to_string(),
                        });
                    }
                }
            } else {
                violations.push(Violation::ForeignKeyColumnCountMismatch {
                    origin: origin_columns.len(),
                    referenced: referenced_columns.len(),
                });
            }
        }

        let origin_table = self.index_data(origin).table;
        let name = match name {
            Some(given) => {
                if !is_valid_identifier(given) {
                    violations.push(Violation::InvalidIdentifier { name: given.into() });
                }
                given.to_string()
            }
            None => self.default_foreign_key_name(origin, referenced),
        };
        let schema = SchemaId(self.owning_schema(origin_table));
        self.check_schema_namespace(schema, &name, &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            &name,
            ObjectData::ForeignKey(ForeignKeyData {
                table: origin_table,
                origin_index: origin.id(),
                referenced_index: referenced.id(),
                on_delete: ForeignKeyAction::default(),
                on_update: ForeignKeyAction::default(),
            }),
        ));
        self.register_in_schema(schema.id(), &name, id);
        self.register_constraint(origin_table, id);
        self.refs
            .add(id, Some(PropertyTag::OriginIndex), origin.id());
        self.refs
            .add(id, Some(PropertyTag::ReferencedIndex), referenced.id());
        self.notify_created(id);
        Ok(ForeignKeyId(id))
    }

    /// Sets the ON DELETE referential action.
    pub fn set_on_delete(&mut self, fk: ForeignKeyId, action: ForeignKeyAction) -> Result<()> {
        self.try_slot(fk.id())?;
        if self.foreign_key_data(fk).on_delete == action {
            return Ok(());
        }
        let context = format!("set_on_delete on foreign key '{}'", self.name(fk));

        let mut violations = Vec::new();
        self.ensure_live(fk.id(), &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let old = self.foreign_key_data(fk).on_delete;
        if let ObjectData::ForeignKey(data) = &mut self.slot_mut(fk.id()).data {
            data.on_delete = action;
        }
        self.notify_changed(
            fk.id(),
            PropertyTag::OnDelete,
            PropertyValue::OnDelete(old),
            &PropertyValue::OnDelete(action),
        );
        Ok(())
    }

    /// Sets the ON UPDATE referential action.
    pub fn set_on_update(&mut self, fk: ForeignKeyId, action: ForeignKeyAction) -> Result<()> {
        self.try_slot(fk.id())?;
        if self.foreign_key_data(fk).on_update == action {
            return Ok(());
        }
        let context = format!("set_on_update on foreign key '{}'", self.name(fk));

        let mut violations = Vec::new();
        self.ensure_live(fk.id(), &mut violations);
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let old = self.foreign_key_data(fk).on_update;
        if let ObjectData::ForeignKey(data) = &mut self.slot_mut(fk.id()).data {
            data.on_update = action;
        }
        self.notify_changed(
            fk.id(),
            PropertyTag::OnUpdate,
            PropertyValue::OnUpdate(old),
            &PropertyValue::OnUpdate(action),
        );
        Ok(())
    }

    // ---- helpers --------------------------------------------------

    /// Returns the index's column list when every entry is a plain
    /// column, `None` when any entry is an expression.
    fn plain_columns(&self, index: IndexId) -> Option<Vec<ColumnId>> {
        self.index_data(index)
            .columns
            .iter()
            .map(|entry| match entry.expr {
                IndexExpr::Column(column) => Some(column),
                IndexExpr::Expression(_) => None,
            })
            .collect()
    }

    fn default_foreign_key_name(&self, origin: IndexId, referenced: IndexId) -> String {
        let origin_table = self.index_data(origin).table;
        let referenced_table = self.index_data(referenced).table;
        let origin_schema = self.owning_schema(origin_table);
        let referenced_schema = self.owning_schema(referenced_table);

        let tokens = self.index_tokens(&self.index_data(origin).columns);
        let schema_segment = if origin_schema == referenced_schema {
            None
        } else {
            Some(self.slot(referenced_schema).name.as_str())
        };
        naming::foreign_key_name(
            &self.slot(origin_table).name,
            &tokens,
            schema_segment,
            &self.slot(referenced_table).name,
        )
    }
}
