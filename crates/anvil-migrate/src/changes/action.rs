//! Emitted action records.
//!
//! The change tracker's output is an ordered log of [`PendingAction`]s:
//! structural [`ChangeBatch`]es (one composite record per active
//! object), raw and parameterized SQL statements, and programmatic
//! callback actions with no textual form. Dialect rendering and
//! execution happen outside this crate; the log is the hand-off point,
//! and serializes to JSON for tooling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::object::{ObjectId, ObjectKind, PropertyTag};

/// Default execution timeout stamped on emitted actions.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// A rendered reference to a schema object, snapshotted when the batch
/// holding it is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    /// Object kind.
    pub kind: ObjectKind,
    /// Owning schema name, `None` for the default schema.
    pub schema: Option<String>,
    /// Owning table name, for table-owned objects.
    pub table: Option<String>,
    /// Object name.
    pub name: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// A create sub-action inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAction {
    #[serde(skip)]
    pub(crate) id: ObjectId,
    /// The created object.
    pub object: ObjectRef,
}

/// An alter sub-action inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterAction {
    #[serde(skip)]
    pub(crate) id: ObjectId,
    /// The altered object.
    pub object: ObjectRef,
    /// The property that changed.
    pub property: PropertyTag,
    /// The property's value as of batch finalization.
    pub value: String,
}

/// A remove sub-action inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveAction {
    #[serde(skip)]
    pub(crate) id: ObjectId,
    /// The removed object.
    pub object: ObjectRef,
}

/// A finalized composite action: every structural change accumulated
/// against one active object, in the fixed sub-action order creates →
/// alters → removes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeBatch {
    #[serde(skip)]
    pub(crate) target_id: ObjectId,
    /// The active object the batch accumulated against.
    pub target: ObjectRef,
    /// Created objects, in creation order.
    pub creates: Vec<CreateAction>,
    /// Altered properties, ordered by property descriptor.
    pub alters: Vec<AlterAction>,
    /// Removed objects, in removal order.
    pub removes: Vec<RemoveAction>,
    /// Execution timeout.
    pub timeout: Duration,
}

impl ChangeBatch {
    /// Returns whether the batch carries no sub-actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.alters.is_empty() && self.removes.is_empty()
    }
}

/// A parameter value for a parameterized statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParameterValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// A named parameter declared alongside a parameterized statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlParameter {
    /// Parameter name, referenced in the statement as `@name`.
    pub name: String,
    /// Bound value.
    pub value: ParameterValue,
}

impl SqlParameter {
    /// Creates a named parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A raw SQL statement injected into the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawStatement {
    /// Statement text.
    pub sql: String,
    /// Execution timeout.
    pub timeout: Duration,
}

/// A parameterized SQL statement injected into the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterizedStatement {
    /// Statement text with `@name` placeholders.
    pub sql: String,
    /// Declared parameters.
    pub parameters: Vec<SqlParameter>,
    /// Execution timeout.
    pub timeout: Duration,
}

/// The mutable command handed to a custom action's setup callback at
/// execution time.
#[derive(Debug, Clone, Default)]
pub struct SqlCommand {
    /// Statement text, if the action produced one.
    pub sql: Option<String>,
    /// Bound parameters.
    pub parameters: Vec<SqlParameter>,
    /// Execution timeout override.
    pub timeout: Option<Duration>,
}

/// Setup callback of a custom action.
pub type CommandSetup = Arc<dyn Fn(&mut SqlCommand) + Send + Sync>;

/// A programmatic action with no textual form: the execution layer
/// invokes `setup` against a fresh [`SqlCommand`].
#[derive(Clone)]
pub struct CustomAction {
    /// Human-readable label for logs and JSON export.
    pub description: Option<String>,
    /// The setup callback.
    pub setup: CommandSetup,
    /// Execution timeout.
    pub timeout: Duration,
}

impl CustomAction {
    /// Creates a custom action from a setup callback.
    #[must_use]
    pub fn new(setup: impl Fn(&mut SqlCommand) + Send + Sync + 'static) -> Self {
        Self {
            description: None,
            setup: Arc::new(setup),
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAction")
            .field("description", &self.description)
            .field("setup", &"<callback>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Serialize for CustomAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CustomAction", 2)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("timeout", &self.timeout)?;
        s.end()
    }
}

/// One entry of the pending action log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
    /// A finalized structural batch.
    Batch(ChangeBatch),
    /// A raw SQL statement.
    Statement(RawStatement),
    /// A parameterized SQL statement.
    Parameterized(ParameterizedStatement),
    /// A programmatic action (`sql()` is `None`).
    Custom(CustomAction),
}

impl PendingAction {
    /// Returns the statement text, `None` for structural batches (which
    /// a dialect renders later) and programmatic actions.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Batch(_) | Self::Custom(_) => None,
            Self::Statement(s) => Some(&s.sql),
            Self::Parameterized(p) => Some(&p.sql),
        }
    }

    /// Returns the execution timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match self {
            Self::Batch(b) => b.timeout,
            Self::Statement(s) => s.timeout,
            Self::Parameterized(p) => p.timeout,
            Self::Custom(c) => c.timeout,
        }
    }

    /// Returns the batch, if this entry is one.
    #[must_use]
    pub const fn as_batch(&self) -> Option<&ChangeBatch> {
        match self {
            Self::Batch(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_accessor() {
        let stmt = PendingAction::Statement(RawStatement {
            sql: "DROP TABLE legacy".into(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        });
        assert_eq!(stmt.sql(), Some("DROP TABLE legacy"));

        let custom = PendingAction::Custom(CustomAction::new(|cmd| {
            cmd.sql = Some("SELECT 1".into());
        }));
        assert_eq!(custom.sql(), None);
    }

    #[test]
    fn test_custom_action_setup_runs() {
        let action = CustomAction::new(|cmd| {
            cmd.sql = Some("VACUUM".into());
        });
        let mut cmd = SqlCommand::default();
        (action.setup)(&mut cmd);
        assert_eq!(cmd.sql.as_deref(), Some("VACUUM"));
    }

    #[test]
    fn test_actions_serialize_to_json() {
        let stmt = PendingAction::Statement(RawStatement {
            sql: "DROP TABLE legacy".into(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        });
        let json = serde_json::to_string(&stmt).unwrap();
        assert!(json.contains("\"kind\":\"statement\""));
        assert!(json.contains("DROP TABLE legacy"));

        let custom = PendingAction::Custom(
            CustomAction::new(|_| {}).with_description("rebuild stats"),
        );
        let json = serde_json::to_string(&custom).unwrap();
        assert!(json.contains("rebuild stats"));
        assert!(!json.contains("callback"));
    }
}
