//! Change tracking and diff compilation.
//!
//! The tracker observes every successful graph mutation and compiles
//! the net effect into the pending action log. Per object it keeps an
//! existence state relative to the last committed baseline and, for
//! altered objects, the *first* original value of each changed
//! property. Mutation sequences that net to "no observable change"
//! therefore emit nothing:
//!
//! - restoring a property to its original value deletes that property's
//!   change record (and its logged alter entries);
//! - an object created and removed inside the same uncommitted window
//!   collapses to "never existed" — its entries are scrubbed from the
//!   pending batch and the uncommitted log, and its name is reusable.
//!
//! Structural changes batch by **active object** (the owning table for
//! columns and constraints): consecutive mutations against the same
//! object accumulate into one composite action, finalized when the
//! active object switches, in the fixed order creates → alters (by
//! property descriptor) → removes. Injected raw, parameterized, and
//! callback actions append chronologically and never batch.

mod action;

pub use action::{
    ChangeBatch, CommandSetup, CreateAction, CustomAction, AlterAction, ObjectRef,
    ParameterValue, ParameterizedStatement, PendingAction, RawStatement, RemoveAction,
    SqlCommand, SqlParameter, DEFAULT_ACTION_TIMEOUT,
};

use std::collections::HashMap;
use std::sync::OnceLock;

use anvil_sql_core::expr::SqlExpr;
use anvil_sql_core::types::TypeDefinition;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::object::{
    Computation, ComputationStorage, ForeignKeyAction, ObjectData, ObjectId, ObjectSlot,
    PropertyTag,
};

/// Emission mode of the tracker.
///
/// `Commit` and `DryRun` both fully populate the action log — they are
/// distinguished only by the execution layer outside this crate.
/// `NoChanges` suppresses all emission, including injected statements,
/// while existence bookkeeping keeps running (validation-only passes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerMode {
    #[default]
    Commit,
    DryRun,
    NoChanges,
}

/// Existence of an object relative to the last committed baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExistenceState {
    /// Present at the baseline and (so far) observably unchanged.
    Unchanged,
    /// Created since the baseline.
    Created,
    /// Present at the baseline, removed since.
    Removed,
}

/// A captured original property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Name(String),
    ColumnType(TypeDefinition),
    Nullable(bool),
    DefaultValue(Option<SqlExpr>),
    Computation(Option<Computation>),
    Unique(bool),
    Virtual(bool),
    Filter(Option<SqlExpr>),
    OnDelete(ForeignKeyAction),
    OnUpdate(ForeignKeyAction),
}

#[derive(Debug, Default)]
struct TrackedState {
    existence: Option<ExistenceState>,
    originals: IndexMap<PropertyTag, PropertyValue>,
}

/// The active-object batching state. Modeled as an explicit machine so
/// batch-flush transitions are total and testable.
#[derive(Debug, Default)]
enum BatchState {
    #[default]
    Idle,
    Batching {
        owner: ObjectId,
        created: Vec<ObjectId>,
        altered: Vec<(ObjectId, PropertyTag)>,
        removed: Vec<ObjectId>,
    },
}

/// The diff compiler. Owned by the database root; every method that can
/// finalize a batch takes the arena so sub-actions snapshot current
/// names and values at flush time.
#[derive(Debug)]
pub(crate) struct ChangeTracker {
    mode: TrackerMode,
    attached: bool,
    states: HashMap<ObjectId, TrackedState>,
    batch: BatchState,
    log: Vec<PendingAction>,
}

impl ChangeTracker {
    pub(crate) fn new() -> Self {
        Self {
            mode: TrackerMode::default(),
            attached: true,
            states: HashMap::new(),
            batch: BatchState::Idle,
            log: Vec::new(),
        }
    }

    pub(crate) const fn mode(&self) -> TrackerMode {
        self.mode
    }

    pub(crate) const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Switches the emission mode, finalizing the active batch first.
    pub(crate) fn set_mode(&mut self, mode: TrackerMode, objects: &[ObjectSlot]) {
        self.flush(objects);
        self.mode = mode;
    }

    /// Attaches or detaches emission. Detaching force-flushes the
    /// active batch; attaching resumes emission for subsequent
    /// mutations only.
    pub(crate) fn attach(&mut self, attached: bool, objects: &[ObjectSlot]) {
        if !attached {
            self.flush(objects);
        }
        self.attached = attached;
    }

    const fn emitting(&self) -> bool {
        self.attached && !matches!(self.mode, TrackerMode::NoChanges)
    }

    // ---- mutation notifications --------------------------------

    pub(crate) fn note_created(&mut self, objects: &[ObjectSlot], owner: ObjectId, id: ObjectId) {
        self.states.entry(id).or_default().existence = Some(ExistenceState::Created);
        if !self.emitting() {
            return;
        }
        let BatchState::Batching { created, .. } = self.batch_for(owner, objects) else {
            unreachable!("batch_for always yields a batching state");
        };
        created.push(id);
    }

    pub(crate) fn note_changed(
        &mut self,
        objects: &[ObjectSlot],
        owner: ObjectId,
        id: ObjectId,
        tag: PropertyTag,
        old: PropertyValue,
        new: &PropertyValue,
    ) {
        let state = self.states.entry(id).or_default();
        let cancelled = match state.originals.get(&tag) {
            Some(original) if original == new => {
                state.originals.shift_remove(&tag);
                true
            }
            Some(_) => false,
            None => {
                state.originals.insert(tag, old);
                false
            }
        };

        if cancelled {
            self.scrub_alter(id, tag);
            return;
        }
        if !self.emitting() {
            return;
        }
        let BatchState::Batching { altered, .. } = self.batch_for(owner, objects) else {
            unreachable!("batch_for always yields a batching state");
        };
        if !altered.contains(&(id, tag)) {
            altered.push((id, tag));
        }
    }

    /// Records the removal of the root object of a (possibly cascading)
    /// remove operation.
    pub(crate) fn note_removed(&mut self, objects: &[ObjectSlot], owner: ObjectId, id: ObjectId) {
        if self.collapse_or_mark_removed(id) {
            return;
        }
        if !self.emitting() {
            return;
        }
        let BatchState::Batching { removed, .. } = self.batch_for(owner, objects) else {
            unreachable!("batch_for always yields a batching state");
        };
        removed.push(id);
    }

    /// Records the removal of a cascade descendant: existence
    /// bookkeeping and scrubbing only, no emitted sub-action (the
    /// ancestor's removal subsumes it).
    pub(crate) fn note_absorbed(&mut self, id: ObjectId) {
        let _ = self.collapse_or_mark_removed(id);
    }

    /// Shared removal bookkeeping. Returns `true` when the object was
    /// created in this uncommitted window and has been collapsed to
    /// "never existed".
    fn collapse_or_mark_removed(&mut self, id: ObjectId) -> bool {
        let created = self
            .states
            .get(&id)
            .is_some_and(|s| s.existence == Some(ExistenceState::Created));
        if created {
            self.states.remove(&id);
            self.scrub_object(id);
            return true;
        }
        let state = self.states.entry(id).or_default();
        state.existence = Some(ExistenceState::Removed);
        state.originals.clear();
        // Alter entries for the object are subsumed by its removal.
        self.scrub_alters_of(id);
        false
    }

    // ---- injected actions --------------------------------------

    pub(crate) fn add_statement(&mut self, statement: RawStatement) {
        if self.emitting() {
            self.log.push(PendingAction::Statement(statement));
        }
    }

    pub(crate) fn add_parameterized(&mut self, statement: ParameterizedStatement) {
        if self.emitting() {
            self.log.push(PendingAction::Parameterized(statement));
        }
    }

    pub(crate) fn add_custom(&mut self, action: CustomAction) {
        if self.emitting() {
            self.log.push(PendingAction::Custom(action));
        }
    }

    // ---- batching ----------------------------------------------

    /// Returns the active batch for `owner`, finalizing the previous
    /// batch when the active object switches.
    fn batch_for(&mut self, owner: ObjectId, objects: &[ObjectSlot]) -> &mut BatchState {
        let switch = match &self.batch {
            BatchState::Idle => true,
            BatchState::Batching { owner: current, .. } => *current != owner,
        };
        if switch {
            self.flush(objects);
            self.batch = BatchState::Batching {
                owner,
                created: Vec::new(),
                altered: Vec::new(),
                removed: Vec::new(),
            };
        }
        &mut self.batch
    }

    /// Finalizes the active batch into the log.
    pub(crate) fn flush(&mut self, objects: &[ObjectSlot]) {
        let BatchState::Batching {
            owner,
            created,
            mut altered,
            removed,
        } = std::mem::take(&mut self.batch)
        else {
            return;
        };

        // Alters of objects created in this same batch are already part
        // of the create snapshot.
        altered.retain(|(id, _)| !created.contains(id));
        // Stable by property descriptor; insertion order breaks ties.
        altered.sort_by_key(|(_, tag)| *tag);

        let batch = ChangeBatch {
            target_id: owner,
            target: object_ref(objects, owner),
            creates: created
                .into_iter()
                .map(|id| CreateAction {
                    id,
                    object: object_ref(objects, id),
                })
                .collect(),
            alters: altered
                .into_iter()
                .map(|(id, tag)| AlterAction {
                    id,
                    object: object_ref(objects, id),
                    property: tag,
                    value: render_property(objects, id, tag),
                })
                .collect(),
            removes: removed
                .into_iter()
                .map(|id| RemoveAction {
                    id,
                    object: object_ref(objects, id),
                })
                .collect(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        };
        if !batch.is_empty() {
            debug!(
                target = %batch.target,
                creates = batch.creates.len(),
                alters = batch.alters.len(),
                removes = batch.removes.len(),
                "finalized change batch"
            );
            self.log.push(PendingAction::Batch(batch));
        }
    }

    // ---- cancellation scrubbing --------------------------------

    /// Drops every trace of `id` from the pending batch and the
    /// uncommitted log (create/remove collapse).
    fn scrub_object(&mut self, id: ObjectId) {
        if let BatchState::Batching {
            created,
            altered,
            removed,
            ..
        } = &mut self.batch
        {
            created.retain(|c| *c != id);
            altered.retain(|(a, _)| *a != id);
            removed.retain(|r| *r != id);
        }
        for action in &mut self.log {
            if let PendingAction::Batch(batch) = action {
                batch.creates.retain(|c| c.id != id);
                batch.alters.retain(|a| a.id != id);
                batch.removes.retain(|r| r.id != id);
            }
        }
        self.drop_empty_batches();
    }

    /// Drops one property's alter entries for `id` (round-trip
    /// cancellation).
    fn scrub_alter(&mut self, id: ObjectId, tag: PropertyTag) {
        if let BatchState::Batching { altered, .. } = &mut self.batch {
            altered.retain(|(a, t)| !(*a == id && *t == tag));
        }
        for action in &mut self.log {
            if let PendingAction::Batch(batch) = action {
                batch
                    .alters
                    .retain(|a| !(a.id == id && a.property == tag));
            }
        }
        self.drop_empty_batches();
    }

    /// Drops all alter entries for `id` (subsumed by its removal).
    fn scrub_alters_of(&mut self, id: ObjectId) {
        if let BatchState::Batching { altered, .. } = &mut self.batch {
            altered.retain(|(a, _)| *a != id);
        }
        for action in &mut self.log {
            if let PendingAction::Batch(batch) = action {
                batch.alters.retain(|a| a.id != id);
            }
        }
        self.drop_empty_batches();
    }

    fn drop_empty_batches(&mut self) {
        self.log.retain(|action| match action {
            PendingAction::Batch(batch) => !batch.is_empty(),
            _ => true,
        });
    }

    // ---- inspection --------------------------------------------

    pub(crate) fn pending_count(&mut self, objects: &[ObjectSlot]) -> usize {
        self.flush(objects);
        self.log.len()
    }

    pub(crate) fn pending(&mut self, objects: &[ObjectSlot]) -> &[PendingAction] {
        self.flush(objects);
        &self.log
    }

    pub(crate) fn pending_since(&mut self, objects: &[ObjectSlot], since: usize) -> &[PendingAction] {
        self.flush(objects);
        &self.log[since.min(self.log.len())..]
    }

    pub(crate) fn existence(&self, id: ObjectId) -> Option<ExistenceState> {
        self.states.get(&id).and_then(|s| s.existence)
    }

    pub(crate) fn contains_change(&self, id: ObjectId, tag: PropertyTag) -> bool {
        self.states
            .get(&id)
            .is_some_and(|s| s.originals.contains_key(&tag))
    }

    pub(crate) fn original_value(&self, id: ObjectId, tag: PropertyTag) -> Option<&PropertyValue> {
        self.states.get(&id).and_then(|s| s.originals.get(&tag))
    }

    /// Finalizes, drains the log, and resets every existence state to a
    /// fresh baseline.
    pub(crate) fn commit(&mut self, objects: &[ObjectSlot]) -> Vec<PendingAction> {
        self.flush(objects);
        self.states.clear();
        std::mem::take(&mut self.log)
    }
}

/// Returns the distinct `@name` placeholders of a statement, in
/// appearance order.
pub(crate) fn placeholder_names(sql: &str) -> Vec<String> {
    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| {
        regex::Regex::new("@([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern")
    });
    let mut out: Vec<String> = Vec::new();
    for capture in re.captures_iter(sql) {
        let name = &capture[1];
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

// ---- arena snapshots -----------------------------------------------

/// Resolves an object to its rendered reference, walking ownership
/// links for schema/table context.
pub(crate) fn object_ref(objects: &[ObjectSlot], id: ObjectId) -> ObjectRef {
    let slot = &objects[id.0 as usize];
    let (schema, table) = match &slot.data {
        ObjectData::Schema(_) => (None, None),
        ObjectData::Table(t) => (schema_name(objects, t.schema), None),
        ObjectData::View(v) => (schema_name(objects, v.schema), None),
        ObjectData::Column(c) => owner_table_context(objects, c.table),
        ObjectData::Index(i) => owner_table_context(objects, i.table),
        ObjectData::PrimaryKey(p) => owner_table_context(objects, p.table),
        ObjectData::ForeignKey(f) => owner_table_context(objects, f.table),
        ObjectData::Check(c) => owner_table_context(objects, c.table),
    };
    ObjectRef {
        kind: slot.kind(),
        schema,
        table,
        name: slot.name.clone(),
    }
}

fn schema_name(objects: &[ObjectSlot], schema: ObjectId) -> Option<String> {
    let name = &objects[schema.0 as usize].name;
    if name.is_empty() {
        None
    } else {
        Some(name.clone())
    }
}

fn owner_table_context(objects: &[ObjectSlot], table: ObjectId) -> (Option<String>, Option<String>) {
    let slot = &objects[table.0 as usize];
    let schema = match &slot.data {
        ObjectData::Table(t) => schema_name(objects, t.schema),
        _ => None,
    };
    (schema, Some(slot.name.clone()))
}

/// Renders the current value of a property for the action log.
pub(crate) fn render_property(objects: &[ObjectSlot], id: ObjectId, tag: PropertyTag) -> String {
    let slot = &objects[id.0 as usize];
    match (tag, &slot.data) {
        (PropertyTag::Name, _) => slot.name.clone(),
        (PropertyTag::ColumnType, ObjectData::Column(c)) => c.type_def.data_type().to_string(),
        (PropertyTag::Nullable, ObjectData::Column(c)) => {
            let rendered = if c.nullable { "NULL" } else { "NOT NULL" };
            rendered.to_string()
        }
        (PropertyTag::DefaultValue, ObjectData::Column(c)) => c
            .default_value
            .as_ref()
            .map_or_else(|| "NONE".to_string(), ToString::to_string),
        (PropertyTag::Computation, ObjectData::Column(c)) => {
            c.computation.as_ref().map_or_else(
                || "NONE".to_string(),
                |comp| {
                    let storage = match comp.storage {
                        ComputationStorage::Virtual => "VIRTUAL",
                        ComputationStorage::Stored => "STORED",
                    };
                    format!("{} {storage}", comp.expression)
                },
            )
        }
        (PropertyTag::Unique, ObjectData::Index(i)) => i.unique.to_string(),
        (PropertyTag::Virtual, ObjectData::Index(i)) => i.virtual_.to_string(),
        (PropertyTag::Filter, ObjectData::Index(i)) => i
            .filter
            .as_ref()
            .map_or_else(|| "NONE".to_string(), ToString::to_string),
        (PropertyTag::OnDelete, ObjectData::ForeignKey(f)) => f.on_delete.as_sql().to_string(),
        (PropertyTag::OnUpdate, ObjectData::ForeignKey(f)) => f.on_update.as_sql().to_string(),
        (PropertyTag::Source, ObjectData::View(v)) => v.source.text().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::object::{ObjectKind, SortOrder};
    use crate::{ColumnId, Database, TableId};

    fn committed_table(db: &mut Database, name: &str) -> (TableId, ColumnId) {
        let table = db.create_table(db.default_schema(), name).unwrap();
        let column = db.create_column(table, "C1").unwrap();
        db.commit();
        (table, column)
    }

    #[test]
    fn test_table_with_primary_key_is_one_composite_action() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "T").unwrap();
        let c1 = db.create_column(table, "C1").unwrap();
        db.set_primary_key(table, None, &[(c1, SortOrder::Ascending)])
            .unwrap();

        assert_eq!(db.pending_action_count(), 1);
        let actions = db.pending_actions().to_vec();
        let batch = actions[0].as_batch().unwrap();
        assert_eq!(batch.target.name, "T");
        let created: Vec<(ObjectKind, &str)> = batch
            .creates
            .iter()
            .map(|c| (c.object.kind, c.object.name.as_str()))
            .collect();
        assert_eq!(
            created,
            vec![
                (ObjectKind::Table, "T"),
                (ObjectKind::Column, "C1"),
                (ObjectKind::Index, "UIX_T_C1A"),
                (ObjectKind::PrimaryKey, "PK_T"),
            ]
        );
        assert!(batch.alters.is_empty());
        assert!(batch.removes.is_empty());
    }

    #[test]
    fn test_rename_round_trip_cancels() {
        let mut db = Database::new();
        let (_, c1) = committed_table(&mut db, "T");

        db.set_name(c1, "C2").unwrap();
        assert!(db.contains_change(c1, PropertyTag::Name));

        db.set_name(c1, "C1").unwrap();
        assert!(!db.contains_change(c1, PropertyTag::Name));
        assert_eq!(db.existence_state(c1), ExistenceState::Unchanged);
        assert_eq!(db.pending_action_count(), 0);
    }

    #[test]
    fn test_round_trip_cancels_across_batch_flush() {
        let mut db = Database::new();
        let (_, c1) = committed_table(&mut db, "T");

        db.set_name(c1, "C2").unwrap();
        // Mutating another table finalizes T's batch into the log.
        db.create_table(db.default_schema(), "U").unwrap();

        db.set_name(c1, "C1").unwrap();
        let actions = db.pending_actions().to_vec();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].as_batch().unwrap().target.name, "U");
    }

    #[test]
    fn test_first_original_value_only() {
        let mut db = Database::new();
        let (_, c1) = committed_table(&mut db, "T");

        db.set_name(c1, "b").unwrap();
        db.set_name(c1, "c").unwrap();
        assert_eq!(
            db.original_value(c1, PropertyTag::Name),
            Some(&PropertyValue::Name("C1".into()))
        );

        // Restoring through an intermediate value still cancels.
        db.set_name(c1, "C1").unwrap();
        assert!(db.original_value(c1, PropertyTag::Name).is_none());
        assert_eq!(db.pending_action_count(), 0);
    }

    #[test]
    fn test_alters_ordered_by_property_descriptor() {
        let mut db = Database::new();
        let (_, c1) = committed_table(&mut db, "T");

        // Nullable changes first, then the rename; the finalized batch
        // orders by property descriptor, Name before Nullable.
        db.set_nullable(c1, true).unwrap();
        db.set_name(c1, "renamed").unwrap();

        let actions = db.pending_actions().to_vec();
        let batch = actions[0].as_batch().unwrap();
        let properties: Vec<PropertyTag> = batch.alters.iter().map(|a| a.property).collect();
        assert_eq!(properties, vec![PropertyTag::Name, PropertyTag::Nullable]);
        assert_eq!(batch.alters[0].value, "renamed");
        assert_eq!(batch.alters[1].value, "NULL");
    }

    #[test]
    fn test_batches_split_per_active_object() {
        let mut db = Database::new();
        let (_, t_col) = committed_table(&mut db, "T");
        let u = db.create_table(db.default_schema(), "U").unwrap();
        let u_col = db.create_column(u, "C1").unwrap();
        db.commit();

        db.set_nullable(t_col, true).unwrap();
        db.set_nullable(u_col, true).unwrap();
        db.set_name(t_col, "again").unwrap();

        let actions = db.pending_actions().to_vec();
        let targets: Vec<&str> = actions
            .iter()
            .map(|a| a.as_batch().unwrap().target.name.as_str())
            .collect();
        assert_eq!(targets, vec!["T", "U", "T"]);
    }

    #[test]
    fn test_statements_interleave_chronologically() {
        let mut db = Database::new();
        committed_table(&mut db, "T");

        db.add_statement("PRAGMA foreign_keys = ON");
        let u = db.create_table(db.default_schema(), "U").unwrap();
        db.add_statement("ANALYZE");
        db.create_column(u, "x").unwrap();

        let actions = db.pending_actions().to_vec();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].sql(), Some("PRAGMA foreign_keys = ON"));
        assert_eq!(actions[1].sql(), Some("ANALYZE"));
        assert!(actions[2].as_batch().is_some());
    }

    #[test]
    fn test_no_changes_mode_suppresses_all_emission() {
        let mut db = Database::new();
        db.set_tracker_mode(TrackerMode::NoChanges);

        let table = db.create_table(db.default_schema(), "T").unwrap();
        db.add_statement("ANALYZE");
        db.add_action(CustomAction::new(|_| {}));

        assert_eq!(db.pending_action_count(), 0);
        // Bookkeeping still runs for validation-only passes.
        assert_eq!(db.existence_state(table), ExistenceState::Created);
    }

    #[test]
    fn test_dry_run_populates_the_log() {
        let mut db = Database::new();
        db.set_tracker_mode(TrackerMode::DryRun);
        db.create_table(db.default_schema(), "T").unwrap();
        assert_eq!(db.pending_action_count(), 1);
    }

    #[test]
    fn test_detach_flushes_then_suppresses() {
        let mut db = Database::new();
        db.create_table(db.default_schema(), "T").unwrap();

        db.attach(false);
        assert_eq!(db.pending_action_count(), 1);

        // Graph mutation stays possible, but nothing new is emitted.
        db.create_table(db.default_schema(), "U").unwrap();
        assert_eq!(db.pending_action_count(), 1);

        db.attach(true);
        db.create_table(db.default_schema(), "V").unwrap();
        assert_eq!(db.pending_action_count(), 2);
    }

    #[test]
    fn test_parameterized_statement_validation_accumulates() {
        let mut db = Database::new();
        let err = db
            .add_parameterized_statement(
                "UPDATE t SET a = @a WHERE b = @missing",
                vec![
                    SqlParameter::new("a", ParameterValue::Integer(1)),
                    SqlParameter::new("a", ParameterValue::Integer(2)),
                    SqlParameter::new("unused", ParameterValue::Null),
                ],
            )
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("@missing"));
        assert!(text.contains("declared more than once"));
        assert!(text.contains("@unused"));
        assert_eq!(db.pending_action_count(), 0);
    }

    #[test]
    fn test_valid_parameterized_statement_is_queued() {
        let mut db = Database::new();
        db.add_parameterized_statement(
            "DELETE FROM audit WHERE age > @days",
            vec![SqlParameter::new("days", ParameterValue::Integer(90))],
        )
        .unwrap();

        let actions = db.pending_actions().to_vec();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].sql(), Some("DELETE FROM audit WHERE age > @days"));
    }

    #[test]
    fn test_commit_drains_and_resets_baseline() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "T").unwrap();

        let actions = db.commit();
        assert_eq!(actions.len(), 1);
        assert_eq!(db.pending_action_count(), 0);
        assert_eq!(db.existence_state(table), ExistenceState::Unchanged);
        assert!(db.commit().is_empty());
    }

    #[test]
    fn test_created_object_altered_after_flush_emits_alter() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "T").unwrap();
        let column = db.create_column(table, "C1").unwrap();
        // Force the create batch into the log.
        assert_eq!(db.pending_action_count(), 1);

        db.set_name(column, "C2").unwrap();
        let actions = db.pending_actions().to_vec();
        assert_eq!(actions.len(), 2);
        let batch = actions[1].as_batch().unwrap();
        assert_eq!(batch.alters.len(), 1);
        assert_eq!(batch.alters[0].property, PropertyTag::Name);
        assert_eq!(batch.alters[0].value, "C2");
    }

    #[test]
    fn test_created_then_removed_after_flush_scrubs_the_log() {
        let mut db = Database::new();
        committed_table(&mut db, "T");

        let u = db.create_table(db.default_schema(), "U").unwrap();
        db.create_column(u, "x").unwrap();
        assert_eq!(db.pending_action_count(), 1);

        db.remove(u).unwrap();
        assert_eq!(db.pending_action_count(), 0);
    }

    #[test]
    fn test_create_snapshot_uses_final_name() {
        let mut db = Database::new();
        let table = db.create_table(db.default_schema(), "T").unwrap();
        let column = db.create_column(table, "draft").unwrap();
        db.set_name(column, "final").unwrap();

        let actions = db.pending_actions().to_vec();
        let batch = actions[0].as_batch().unwrap();
        assert!(batch
            .creates
            .iter()
            .any(|c| c.object.name == "final"));
        // No redundant alter for an object created in the same batch.
        assert!(batch.alters.is_empty());
    }

    #[test]
    fn test_last_pending_actions_since_count() {
        let mut db = Database::new();
        db.add_statement("A");
        db.add_statement("B");
        let before = db.pending_action_count();
        db.add_statement("C");

        let recent = db.last_pending_actions(before).to_vec();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].sql(), Some("C"));
    }

    #[test]
    fn test_json_export() {
        let mut db = Database::new();
        db.create_table(db.default_schema(), "T").unwrap();
        db.add_statement("ANALYZE");

        let json = db.pending_actions_json().unwrap();
        assert!(json.contains("\"kind\": \"batch\""));
        assert!(json.contains("\"kind\": \"statement\""));
        assert!(json.contains("ANALYZE"));
    }

    #[test]
    fn test_placeholder_scan_is_distinct_in_order() {
        let names = placeholder_names("SET a = @x, b = @y WHERE c = @x");
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
    }
}
