//! Default constraint and index naming.
//!
//! Default names are pure functions of current structural state — table
//! name, column tokens, uniqueness, condition content — computed on
//! demand when an object is created without an explicit name, and never
//! cached beyond the name they produce.

/// Default primary key name: `PK_{table}`.
#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("PK_{table}")
}

/// Default index name: `{U?}IX_{table}_{tok…}`, `U` prefix iff unique.
///
/// Tokens are `{Column}{A|D}` for plain columns and `E{n}{A|D}` for
/// expression columns, where `n` is the 1-based ordinal among the
/// expression columns only.
#[must_use]
pub fn index_name(table: &str, tokens: &[String], unique: bool) -> String {
    let prefix = if unique { "UIX" } else { "IX" };
    let mut name = format!("{prefix}_{table}");
    for token in tokens {
        name.push('_');
        name.push_str(token);
    }
    name
}

/// Default foreign key name:
/// `FK_{origin table}_{origin tokens}_REF_{[ref schema_]ref table}`.
///
/// The schema segment appears only when the referenced table lives in a
/// different schema than the origin table.
#[must_use]
pub fn foreign_key_name(
    origin_table: &str,
    origin_tokens: &[String],
    referenced_schema: Option<&str>,
    referenced_table: &str,
) -> String {
    let mut name = format!("FK_{origin_table}");
    for token in origin_tokens {
        name.push('_');
        name.push_str(token);
    }
    name.push_str("_REF_");
    if let Some(schema) = referenced_schema {
        name.push_str(schema);
        name.push('_');
    }
    name.push_str(referenced_table);
    name
}

/// Default check name: `CHK_{table}_{hash}` where the hash is the
/// 32-hex-digit digest of the rendered condition. Content-derived, so
/// recreating the same condition yields the same name and there is no
/// counter to drift.
#[must_use]
pub fn check_name(table: &str, condition: &str) -> String {
    let digest = md5::compute(condition.as_bytes());
    format!("CHK_{table}_{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_name() {
        assert_eq!(primary_key_name("T"), "PK_T");
    }

    #[test]
    fn test_index_name_tokens_and_unique_prefix() {
        let tokens = vec!["C1A".to_string(), "E1D".to_string()];
        assert_eq!(index_name("T", &tokens, false), "IX_T_C1A_E1D");
        assert_eq!(index_name("T", &tokens, true), "UIX_T_C1A_E1D");
    }

    #[test]
    fn test_foreign_key_name_same_schema() {
        let tokens = vec!["OwnerIdA".to_string()];
        assert_eq!(
            foreign_key_name("orders", &tokens, None, "users"),
            "FK_orders_OwnerIdA_REF_users"
        );
    }

    #[test]
    fn test_foreign_key_name_cross_schema() {
        let tokens = vec!["OwnerIdA".to_string()];
        assert_eq!(
            foreign_key_name("orders", &tokens, Some("auth"), "users"),
            "FK_orders_OwnerIdA_REF_auth_users"
        );
    }

    #[test]
    fn test_check_name_is_stable_and_content_derived() {
        let a = check_name("T", "(quantity > 0)");
        let b = check_name("T", "(quantity > 0)");
        let c = check_name("T", "(quantity > 1)");

        assert_eq!(a, b);
        assert_ne!(a, c);
        let hash = a.strip_prefix("CHK_T_").unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
