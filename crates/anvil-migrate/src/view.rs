//! View operations.
//!
//! Views consume their source query opaquely: the caller declares the
//! query text together with the objects it depends on, and the graph
//! resolves those declarations and tracks them as `Source`-tagged
//! edges. A view can therefore block type changes, nullability changes,
//! and removals of anything it reads.

use crate::database::Database;
use crate::error::{Result, ValidationErrors, Violation};
use crate::ident::is_valid_identifier;
use crate::object::{
    ObjectData, ObjectId, ObjectSlot, PropertyTag, SchemaId, ViewData, ViewId,
};
use anvil_sql_core::expr::ViewQuery;

impl Database {
    /// Creates a view over the declared source query.
    pub fn create_view(
        &mut self,
        schema: SchemaId,
        name: &str,
        source: ViewQuery,
    ) -> Result<ViewId> {
        let schema_slot = self.try_slot(schema.id())?;
        let context = format!("create_view '{name}'");

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

        // Resolve the declared dependencies up front; edges are only
        // written once the whole operation is known to be valid.
        let mut edges: Vec<(Option<PropertyTag>, ObjectId)> = Vec::new();
        for reference in source.references() {
            let target_schema = match &reference.schema {
                None => Some(schema),
                Some(schema_name) => {
                    let resolved = self.schema(schema_name);
                    if resolved.is_none() {
                        violations.push(Violation::UnknownReferencedObject {
                            name: schema_name.clone(),
                        });
                    } else if let Some(resolved) = resolved {
                        edges.push((Some(PropertyTag::Source), resolved.id()));
                    }
                    resolved
                }
            };
            let Some(target_schema) = target_schema else {
                continue;
            };
            let Some(object) = self.schema_object(target_schema, &reference.object) else {
                violations.push(Violation::UnknownReferencedObject {
                    name: reference.object.clone(),
                });
                continue;
            };
            edges.push((Some(PropertyTag::Source), object));

            match &self.slot(object).data {
                ObjectData::Table(_) => {
                    let table = crate::object::TableId(object);
                    for column in &reference.columns {
                        match self.column(table, column) {
                            Some(resolved) => {
                                edges.push((Some(PropertyTag::Source), resolved.id()));
                            }
                            None => violations.push(Violation::UnknownColumn {
                                column: column.clone(),
                                table: reference.object.clone(),
                            }),
                        }
                    }
                }
                ObjectData::View(_) => {}
                _ => violations.push(Violation::UnknownReferencedObject {
                    name: reference.object.clone(),
                }),
            }
        }
        if !violations.is_empty() {
            return Err(ValidationErrors::new(context, violations).into());
        }

        let id = self.alloc(ObjectSlot::new(
            name,
            ObjectData::View(ViewData {
                schema: schema.id(),
                source,
            }),
        ));
        self.register_in_schema(schema.id(), name, id);
        for (property, target) in edges {
            self.refs.add(id, property, target);
        }
        self.notify_created(id);
        Ok(ViewId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_sql_core::expr::QueryRef;

    #[test]
    fn test_view_tracks_tables_and_columns() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let users = db.create_table(schema, "users").unwrap();
        let id = db.create_column(users, "id").unwrap();
        let name = db.create_column(users, "name").unwrap();

        let view = db
            .create_view(
                schema,
                "active_users",
                ViewQuery::new("SELECT id, name FROM users")
                    .with_reference(QueryRef::new("users", vec!["id".into(), "name".into()])),
            )
            .unwrap();

        assert!(db
            .referencing_objects(users)
            .iter()
            .any(|r| r.source == view.id() && r.property == Some(PropertyTag::Source)));
        assert!(db
            .referencing_objects(id)
            .iter()
            .any(|r| r.source == view.id()));
        assert!(db
            .referencing_objects(name)
            .iter()
            .any(|r| r.source == view.id()));
    }

    #[test]
    fn test_view_over_view_is_allowed() {
        let mut db = Database::new();
        let schema = db.default_schema();
        let users = db.create_table(schema, "users").unwrap();
        db.create_column(users, "id").unwrap();

        let inner = db
            .create_view(
                schema,
                "v_inner",
                ViewQuery::new("SELECT id FROM users")
                    .with_reference(QueryRef::new("users", vec!["id".into()])),
            )
            .unwrap();
        let outer = db
            .create_view(
                schema,
                "v_outer",
                ViewQuery::new("SELECT * FROM v_inner")
                    .with_reference(QueryRef::new("v_inner", vec![])),
            )
            .unwrap();

        assert!(db
            .referencing_objects(inner)
            .iter()
            .any(|r| r.source == outer.id()));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut db = Database::new();
        let schema = db.default_schema();

        let err = db
            .create_view(
                schema,
                "broken",
                ViewQuery::new("SELECT * FROM ghost")
                    .with_reference(QueryRef::new("ghost", vec![])),
            )
            .unwrap_err();
        assert!(err.to_string().contains("'ghost' does not exist"));
    }

    #[test]
    fn test_view_blocks_column_type_change() {
        use anvil_sql_core::types::DataType;

        let mut db = Database::new();
        let schema = db.default_schema();
        let users = db.create_table(schema, "users").unwrap();
        let id = db.create_column(users, "id").unwrap();
        db.create_view(
            schema,
            "v_users",
            ViewQuery::new("SELECT id FROM users")
                .with_reference(QueryRef::new("users", vec!["id".into()])),
        )
        .unwrap();

        let text = db.registry().by_data_type(&DataType::Text).unwrap();
        let err = db.set_type(id, text).unwrap_err();
        assert!(err.to_string().contains("used by view 'v_users'"));
    }
}
