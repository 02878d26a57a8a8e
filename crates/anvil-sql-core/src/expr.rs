//! SQL expression tree.
//!
//! Expressions are consumed by the schema graph as opaque values: default
//! values, generated-column computations, check conditions, and index
//! filters are all [`SqlExpr`] trees, and view sources are [`ViewQuery`]
//! values. The graph only ever uses three capabilities: enumerating the
//! plain column references inside an expression, scanning for disallowed
//! node kinds, and rendering the expression to a deterministic string
//! (used for content-hashed constraint names).

use std::fmt;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Boolean literal.
    Boolean(bool),
    /// NULL literal.
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Null => write!(f, "NULL"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Concat,
    Like,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
            Self::Like => "LIKE",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "NOT",
        }
    }
}

/// Expression node kinds, used for disallowed-kind scanning.
///
/// Validation rules are phrased as "no node of kind X anywhere in the
/// tree" (e.g. no window functions inside a default value), so the graph
/// asks expressions whether they contain a given kind rather than walking
/// the tree itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// A plain column reference.
    Column,
    /// A literal value.
    Literal,
    /// A binary operator application.
    Binary,
    /// A unary operator application.
    Unary,
    /// An IS NULL / IS NOT NULL test.
    IsNull,
    /// An ordinary function call.
    Call,
    /// A window function call (aggregate OVER a window).
    WindowCall,
}

/// An SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// A literal value.
    Literal(Literal),
    /// A plain (unqualified) column reference.
    Column(String),
    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<SqlExpr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<SqlExpr>,
    },
    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<SqlExpr>,
    },
    /// IS NULL / IS NOT NULL.
    IsNull {
        /// The expression to test.
        expr: Box<SqlExpr>,
        /// Whether this is IS NOT NULL.
        negated: bool,
    },
    /// An ordinary function call.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<SqlExpr>,
    },
    /// A window function call.
    WindowCall {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<SqlExpr>,
        /// PARTITION BY expressions.
        partition_by: Vec<SqlExpr>,
    },
}

impl SqlExpr {
    /// Creates a plain column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Creates a float literal.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// Creates a boolean literal.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }

    /// Creates a NULL literal.
    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Creates a function call.
    #[must_use]
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }

    /// Creates a window function call.
    #[must_use]
    pub fn window_call(name: impl Into<String>, args: Vec<Self>, partition_by: Vec<Self>) -> Self {
        Self::WindowCall {
            name: name.into(),
            args,
            partition_by,
        }
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq(self, right: Self) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn not_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::NotEq, right)
    }

    /// Creates a less-than expression.
    #[must_use]
    pub fn lt(self, right: Self) -> Self {
        self.binary(BinaryOp::Lt, right)
    }

    /// Creates a greater-than expression.
    #[must_use]
    pub fn gt(self, right: Self) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    /// Creates a greater-than-or-equal expression.
    #[must_use]
    pub fn gt_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::GtEq, right)
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        self.binary(BinaryOp::And, right)
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    /// Creates a NOT expression.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    /// Creates a negation expression.
    #[must_use]
    pub fn neg(self) -> Self {
        Self::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Returns the kind of this node.
    #[must_use]
    pub const fn kind(&self) -> ExprKind {
        match self {
            Self::Literal(_) => ExprKind::Literal,
            Self::Column(_) => ExprKind::Column,
            Self::Binary { .. } => ExprKind::Binary,
            Self::Unary { .. } => ExprKind::Unary,
            Self::IsNull { .. } => ExprKind::IsNull,
            Self::Call { .. } => ExprKind::Call,
            Self::WindowCall { .. } => ExprKind::WindowCall,
        }
    }

    /// Returns whether any node in the tree has the given kind.
    #[must_use]
    pub fn contains_kind(&self, kind: ExprKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match self {
            Self::Literal(_) | Self::Column(_) => false,
            Self::Binary { left, right, .. } => {
                left.contains_kind(kind) || right.contains_kind(kind)
            }
            Self::Unary { operand, .. } => operand.contains_kind(kind),
            Self::IsNull { expr, .. } => expr.contains_kind(kind),
            Self::Call { args, .. } => args.iter().any(|a| a.contains_kind(kind)),
            Self::WindowCall {
                args, partition_by, ..
            } => {
                args.iter().any(|a| a.contains_kind(kind))
                    || partition_by.iter().any(|a| a.contains_kind(kind))
            }
        }
    }

    /// Returns whether any node in the tree has one of the given kinds.
    #[must_use]
    pub fn contains_any_kind(&self, kinds: &[ExprKind]) -> bool {
        kinds.iter().any(|k| self.contains_kind(*k))
    }

    /// Returns the distinct plain column references in the tree, in
    /// first-appearance order.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => {
                if !out.iter().any(|c| c == name) {
                    out.push(name.clone());
                }
            }
            Self::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Self::Unary { operand, .. } => operand.collect_columns(out),
            Self::IsNull { expr, .. } => expr.collect_columns(out),
            Self::Call { args, .. } => {
                for a in args {
                    a.collect_columns(out);
                }
            }
            Self::WindowCall {
                args, partition_by, ..
            } => {
                for a in args.iter().chain(partition_by) {
                    a.collect_columns(out);
                }
            }
        }
    }
}

impl fmt::Display for SqlExpr {
    /// Renders the expression deterministically. Binary expressions are
    /// fully parenthesized so the rendering is unambiguous without
    /// precedence rules; the graph relies on this string being a stable
    /// function of the tree (content-hashed constraint names).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column(name) => write!(f, "{name}"),
            Self::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-({operand})"),
                UnaryOp::Not => write!(f, "NOT ({operand})"),
            },
            Self::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "({expr} IS NOT NULL)")
                } else {
                    write!(f, "({expr} IS NULL)")
                }
            }
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Self::WindowCall {
                name,
                args,
                partition_by,
            } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ") OVER (")?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY ")?;
                    for (i, a) in partition_by.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// A single object dependency declared by a view source.
///
/// `object` names a table or a view; an empty `columns` list means the
/// view depends on the object as a whole (e.g. `SELECT *`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRef {
    /// Schema name, `None` for the default schema.
    pub schema: Option<String>,
    /// Referenced table or view name.
    pub object: String,
    /// Referenced column names within the object.
    pub columns: Vec<String>,
}

impl QueryRef {
    /// Creates a reference to an object in the default schema.
    #[must_use]
    pub fn new(object: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            schema: None,
            object: object.into(),
            columns,
        }
    }

    /// Creates a reference to an object in a named schema.
    #[must_use]
    pub fn in_schema(
        schema: impl Into<String>,
        object: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            schema: Some(schema.into()),
            object: object.into(),
            columns,
        }
    }
}

/// A view source query, consumed opaquely by the schema graph.
///
/// The graph never parses the query text; the caller declares the
/// dependencies alongside it, and the graph resolves and tracks them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    text: String,
    refs: Vec<QueryRef>,
}

impl ViewQuery {
    /// Creates a view query from its rendered text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            refs: Vec::new(),
        }
    }

    /// Declares an object dependency.
    #[must_use]
    pub fn with_reference(mut self, reference: QueryRef) -> Self {
        self.refs.push(reference);
        self
    }

    /// Returns the query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the declared object dependencies.
    #[must_use]
    pub fn references(&self) -> &[QueryRef] {
        &self.refs
    }
}

impl fmt::Display for ViewQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_builders() {
        let col = SqlExpr::column("name");
        assert!(matches!(col, SqlExpr::Column(name) if name == "name"));

        let lit = SqlExpr::integer(42);
        assert!(matches!(lit, SqlExpr::Literal(Literal::Integer(42))));
    }

    #[test]
    fn test_referenced_columns_distinct_in_order() {
        let expr = SqlExpr::column("b")
            .gt(SqlExpr::column("a"))
            .and(SqlExpr::column("b").is_not_null());

        assert_eq!(expr.referenced_columns(), vec!["b", "a"]);
    }

    #[test]
    fn test_contains_kind() {
        let plain = SqlExpr::column("x").gt(SqlExpr::integer(1));
        assert!(plain.contains_kind(ExprKind::Column));
        assert!(!plain.contains_kind(ExprKind::WindowCall));

        let windowed = SqlExpr::window_call("row_number", vec![], vec![SqlExpr::column("x")]);
        assert!(windowed.contains_kind(ExprKind::WindowCall));
        assert!(windowed.contains_kind(ExprKind::Column));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = SqlExpr::column("quantity").gt(SqlExpr::integer(0));
        let b = SqlExpr::column("quantity").gt(SqlExpr::integer(0));
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "(quantity > 0)");
    }

    #[test]
    fn test_string_literal_escaping() {
        let expr = SqlExpr::column("name").eq(SqlExpr::string("O'Brien"));
        assert_eq!(expr.to_string(), "(name = 'O''Brien')");
    }

    #[test]
    fn test_view_query_references() {
        let query = ViewQuery::new("SELECT id, name FROM users")
            .with_reference(QueryRef::new("users", vec!["id".into(), "name".into()]));

        assert_eq!(query.references().len(), 1);
        assert_eq!(query.references()[0].object, "users");
        assert_eq!(query.text(), "SELECT id, name FROM users");
    }
}
