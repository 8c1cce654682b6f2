//! # Filter compilation
//!
//! Folds the filter fields of a [`Parameters`] descriptor into a parametrized
//! `WHERE` fragment. Field names come from a caller supplied allow-list and
//! every value is bound through a `?` placeholder, so nothing from the query
//! string is ever spliced into the SQL text except identifiers the caller
//! already knows about.
//!
//! ## Key grammar
//!
//! A filter key is parsed once into a [`FilterKey`], in this precedence:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `age__goadmin_index__1` | one of several values for `age` |
//! | `age_end__goadmin` | `age <= ?` |
//! | `age_start__goadmin` | `age >= ?` |
//! | `name__goadmin_operator__` | operator selector for `name`, never compiled itself |
//! | `name` | `name <op> ?`, op taken from the selector, default `=` |
//!
//! A key that is not a known column but contains `_goadmin_join_` targets the
//! column after the infix on the table returned by the [`JoinResolver`].
//!
//! ```rust,ignore
//! let context = FilterContext::new(["name", "age"]);
//! let clause = params.statement(&context, WhereClause::new());
//! let users = users::Entity::find().filter(clause.into_condition()).all(db).await?;
//! ```

use sea_orm::{Condition, DatabaseBackend, Statement, Value, sea_query::Expr};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use crate::dialect::{Delimiter, placeholders_for};
use crate::keys::{
    INDEX_INFIX, JOIN_INFIX, OPERATOR_SUFFIX, Operator, RANGE_END_SUFFIX, RANGE_START_SUFFIX,
};
use crate::models::{FilterFields, Parameters, field_operator};

/// Every compiled term ends with this; the last one is trimmed.
const TERM_SEPARATOR: &str = " AND ";

/// How a filter key participates in the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `_end__goadmin`: upper bound, `<=`
    RangeEnd,
    /// `_start__goadmin`: lower bound, `>=`
    RangeStart,
    /// `__goadmin_operator__`: chooses the operator of another key
    OperatorSelector,
    /// A field compared with its selected operator
    Plain,
}

/// A raw filter key split into its grammar parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey<'a> {
    /// The key as it appeared in the query string.
    pub raw: &'a str,
    /// The key without its index suffix; the unit of deduplication.
    pub base: &'a str,
    /// The column being filtered: `base` without any range suffix.
    pub field: Cow<'a, str>,
    /// `__goadmin_index__<n>`, or empty.
    pub index_suffix: &'a str,
    pub kind: KeyKind,
}

impl<'a> FilterKey<'a> {
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        let (base, index_suffix) = match raw.find(INDEX_INFIX) {
            Some(pos) => {
                let index = &raw[pos + INDEX_INFIX.len()..];
                let index_len = index.find(INDEX_INFIX).unwrap_or(index.len());
                (&raw[..pos], &raw[pos..pos + INDEX_INFIX.len() + index_len])
            }
            None => (raw, ""),
        };

        let (kind, field) = if base.contains(RANGE_END_SUFFIX) {
            (KeyKind::RangeEnd, Cow::Owned(base.replace(RANGE_END_SUFFIX, "")))
        } else if base.contains(RANGE_START_SUFFIX) {
            (
                KeyKind::RangeStart,
                Cow::Owned(base.replace(RANGE_START_SUFFIX, "")),
            )
        } else if base.contains(OPERATOR_SUFFIX) {
            (KeyKind::OperatorSelector, Cow::Borrowed(base))
        } else {
            (KeyKind::Plain, Cow::Borrowed(base))
        };

        Self {
            raw,
            base,
            field,
            index_suffix,
            kind,
        }
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.index_suffix.is_empty()
    }
}

/// Rewrites a filter value before it is bound.
///
/// Receives the field (join keys in full), the raw value and the index
/// suffix of the key. Implemented for any `Fn(&str, &str, &str) -> String`.
pub trait ValueSanitizer {
    fn sanitize(&self, field: &str, value: &str, index_suffix: &str) -> String;
}

impl<F> ValueSanitizer for F
where
    F: Fn(&str, &str, &str) -> String,
{
    fn sanitize(&self, field: &str, value: &str, index_suffix: &str) -> String {
        self(field, value, index_suffix)
    }
}

/// Leaves values untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSanitize;

impl ValueSanitizer for NoSanitize {
    fn sanitize(&self, _field: &str, value: &str, _index_suffix: &str) -> String {
        value.to_string()
    }
}

/// Maps the remote half of a join key to the table that holds it.
///
/// `None` (or an empty name) means the key is not joinable and is dropped.
/// Implemented for any `Fn(&str) -> Option<String>`.
pub trait JoinResolver {
    fn join_table(&self, field: &str) -> Option<String>;
}

impl<F> JoinResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn join_table(&self, field: &str) -> Option<String> {
        self(field)
    }
}

/// Resolves nothing; join keys are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJoins;

impl JoinResolver for NoJoins {
    fn join_table(&self, _field: &str) -> Option<String> {
        None
    }
}

/// Parametrized `WHERE` fragment built up by [`FilterContext::compile`].
///
/// Also the input of a compile pass: `sql` is the prefix new terms are
/// appended to (verbatim), `args` the arguments already bound, and
/// `seen_keys` the filter keys an earlier pass has compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub args: Vec<Value>,
    pub seen_keys: Vec<String>,
}

impl WhereClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing SQL and arguments.
    #[must_use]
    pub fn with_prefix(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
            seen_keys: Vec::new(),
        }
    }

    /// Carry the keys compiled by an earlier pass.
    #[must_use]
    pub fn with_seen_keys(mut self, seen_keys: Vec<String>) -> Self {
        self.seen_keys = seen_keys;
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Condition for sea-orm's `QueryFilter::filter`. An empty clause matches
    /// everything.
    #[must_use]
    pub fn into_condition(self) -> Condition {
        if self.sql.is_empty() {
            return Condition::all();
        }
        Condition::all().add(Expr::cust_with_values(self.sql, self.args))
    }

    /// Raw statement `"<select> WHERE <sql>"` with placeholders in the style
    /// `backend` expects.
    #[must_use]
    pub fn into_statement(self, backend: DatabaseBackend, select: &str) -> Statement {
        let sql = if self.sql.is_empty() {
            select.to_string()
        } else {
            format!("{select} WHERE {}", self.sql)
        };
        Statement::from_sql_and_values(backend, placeholders_for(backend, &sql), self.args)
    }
}

/// Everything the compiler needs to know about the queried table.
pub struct FilterContext<S = NoSanitize, J = NoJoins> {
    columns: HashSet<String>,
    delimiter: Delimiter,
    sanitizer: S,
    joins: J,
}

impl FilterContext {
    /// Context over the given filterable columns, with bare identifiers, no
    /// sanitizing and no joins.
    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            delimiter: Delimiter::NONE,
            sanitizer: NoSanitize,
            joins: NoJoins,
        }
    }
}

impl<S, J> FilterContext<S, J> {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<Delimiter>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_sanitizer<S2: ValueSanitizer>(self, sanitizer: S2) -> FilterContext<S2, J> {
        FilterContext {
            columns: self.columns,
            delimiter: self.delimiter,
            sanitizer,
            joins: self.joins,
        }
    }

    #[must_use]
    pub fn with_join_resolver<J2: JoinResolver>(self, joins: J2) -> FilterContext<S, J2> {
        FilterContext {
            columns: self.columns,
            delimiter: self.delimiter,
            sanitizer: self.sanitizer,
            joins,
        }
    }

    #[must_use]
    pub fn is_column(&self, field: &str) -> bool {
        self.columns.contains(field)
    }
}

impl<S, J> fmt::Debug for FilterContext<S, J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterContext")
            .field("columns", &self.columns)
            .field("delimiter", &self.delimiter)
            .finish_non_exhaustive()
    }
}

impl<S: ValueSanitizer, J: JoinResolver> FilterContext<S, J> {
    /// Append one `<field> <op> ?` term per usable filter field to `prior`.
    ///
    /// Keys whose base is already in `prior.seen_keys` are skipped unless some
    /// key with that base carries an index suffix. Unknown columns, unresolved
    /// joins, operator selectors and unusable operators are dropped. Every
    /// visited base key is recorded in the returned `seen_keys`.
    #[must_use]
    pub fn compile(&self, fields: &FilterFields, prior: WhereClause) -> WhereClause {
        let WhereClause {
            mut sql,
            mut args,
            mut seen_keys,
        } = prior;

        let indexed: HashSet<&str> = fields
            .keys()
            .map(|raw| FilterKey::parse(raw))
            .filter(FilterKey::is_indexed)
            .map(|key| key.base)
            .collect();

        let mut appended = false;
        for (raw, value) in fields {
            let key = FilterKey::parse(raw);
            if !indexed.contains(key.base) && seen_keys.iter().any(|seen| seen == key.base) {
                tracing::trace!(key = %raw, "Filter already compiled, skipping");
                continue;
            }

            if let Some((term, arg)) = self.term(fields, &key, value) {
                sql.push_str(&term);
                args.push(arg);
                appended = true;
            }

            seen_keys.push(key.base.to_string());
        }

        if appended {
            sql.truncate(sql.len() - TERM_SEPARATOR.len());
        }

        WhereClause {
            sql,
            args,
            seen_keys,
        }
    }

    fn term(
        &self,
        fields: &FilterFields,
        key: &FilterKey<'_>,
        value: &str,
    ) -> Option<(String, Value)> {
        let operator = match key.kind {
            KeyKind::RangeEnd => Operator::Lq,
            KeyKind::RangeStart => Operator::Gq,
            KeyKind::OperatorSelector => return None,
            KeyKind::Plain => {
                let Some(operator) = field_operator(fields, &key.field, key.index_suffix) else {
                    tracing::debug!(key = %key.raw, "Unrecognized filter operator, dropping filter");
                    return None;
                };
                operator
            }
        };
        let Some(op_sql) = operator.as_sql() else {
            tracing::debug!(key = %key.raw, operator = %operator, "Operator has no SQL form, dropping filter");
            return None;
        };
        let field = key.field.as_ref();
        let like = operator == Operator::Like;

        if self.is_column(field) {
            let arg = if like && !value.contains('%') {
                format!("%{}%", self.sanitizer.sanitize(field, value, key.index_suffix))
            } else {
                value.to_string()
            };
            let term = format!("{} {op_sql} ?{TERM_SEPARATOR}", self.delimiter.quote(field));
            return Some((term, Value::from(arg)));
        }

        let Some(remote) = field.split(JOIN_INFIX).nth(1) else {
            tracing::debug!(key = %key.raw, "Not a filterable column, dropping filter");
            return None;
        };
        let Some(table) = self
            .joins
            .join_table(remote)
            .filter(|table| !table.is_empty())
        else {
            tracing::debug!(key = %key.raw, remote = %remote, "No join table for filter, dropping filter");
            return None;
        };

        let sanitized = self.sanitizer.sanitize(field, value, key.index_suffix);
        let arg = if like && !sanitized.contains('%') {
            format!("%{sanitized}%")
        } else {
            sanitized
        };
        let term = format!(
            "{table}.{} {op_sql} ?{TERM_SEPARATOR}",
            self.delimiter.quote(remote)
        );
        Some((term, Value::from(arg)))
    }
}

impl Parameters {
    /// Compile this descriptor's filter fields onto `prior`.
    #[must_use]
    pub fn statement<S, J>(&self, context: &FilterContext<S, J>, prior: WhereClause) -> WhereClause
    where
        S: ValueSanitizer,
        J: JoinResolver,
    {
        context.compile(self.fields(), prior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FilterFields {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    fn text(value: &str) -> Value {
        Value::from(value.to_string())
    }

    #[test]
    fn test_parse_plain_key() {
        let key = FilterKey::parse("name");
        assert_eq!(key.base, "name");
        assert_eq!(key.field, "name");
        assert_eq!(key.index_suffix, "");
        assert_eq!(key.kind, KeyKind::Plain);
        assert!(!key.is_indexed());
    }

    #[test]
    fn test_parse_range_keys() {
        let key = FilterKey::parse("age_start__goadmin");
        assert_eq!(key.kind, KeyKind::RangeStart);
        assert_eq!(key.field, "age");
        assert_eq!(key.base, "age_start__goadmin");

        let key = FilterKey::parse("age_end__goadmin");
        assert_eq!(key.kind, KeyKind::RangeEnd);
        assert_eq!(key.field, "age");
    }

    #[test]
    fn test_parse_indexed_range_key() {
        let key = FilterKey::parse("age_start__goadmin__goadmin_index__2");
        assert_eq!(key.base, "age_start__goadmin");
        assert_eq!(key.index_suffix, "__goadmin_index__2");
        assert_eq!(key.field, "age");
        assert_eq!(key.kind, KeyKind::RangeStart);
        assert!(key.is_indexed());
    }

    #[test]
    fn test_parse_keeps_only_first_index() {
        let key = FilterKey::parse("age__goadmin_index__1__goadmin_index__2");
        assert_eq!(key.base, "age");
        assert_eq!(key.index_suffix, "__goadmin_index__1");
    }

    #[test]
    fn test_parse_operator_selector() {
        let key = FilterKey::parse("name__goadmin_operator____goadmin_index__1");
        assert_eq!(key.kind, KeyKind::OperatorSelector);
        assert_eq!(key.base, "name__goadmin_operator__");
        assert_eq!(key.index_suffix, "__goadmin_index__1");
    }

    #[test]
    fn test_range_end_wins_over_range_start() {
        let key = FilterKey::parse("x_start__goadmin_end__goadmin");
        assert_eq!(key.kind, KeyKind::RangeEnd);
        assert_eq!(key.field, "x_start__goadmin");
    }

    #[test]
    fn test_plain_equality() {
        let context = FilterContext::new(["status"]);
        let clause = context.compile(&fields(&[("status", "active")]), WhereClause::new());
        assert_eq!(clause.sql, "status = ?");
        assert_eq!(clause.args, vec![text("active")]);
        assert_eq!(clause.seen_keys, vec!["status"]);
    }

    #[test]
    fn test_each_operator() {
        let context = FilterContext::new(["n"]);
        for (token, sql) in [
            ("gr", "n > ?"),
            ("gq", "n >= ?"),
            ("eq", "n = ?"),
            ("ne", "n != ?"),
            ("le", "n < ?"),
            ("lq", "n <= ?"),
        ] {
            let clause = context.compile(
                &fields(&[("n", "5"), ("n__goadmin_operator__", token)]),
                WhereClause::new(),
            );
            assert_eq!(clause.sql, sql, "operator {token}");
            assert_eq!(clause.args, vec![text("5")]);
        }
    }

    #[test]
    fn test_free_and_unknown_operators_are_dropped() {
        let context = FilterContext::new(["n"]);
        for token in ["free", "between"] {
            let clause = context.compile(
                &fields(&[("n", "5"), ("n__goadmin_operator__", token)]),
                WhereClause::new(),
            );
            assert!(clause.sql.is_empty(), "operator {token}");
            assert!(clause.args.is_empty());
            assert!(clause.seen_keys.contains(&"n".to_string()));
        }
    }

    #[test]
    fn test_like_sanitizes_only_when_wrapping() {
        let context = FilterContext::new(["name"])
            .with_sanitizer(|_field: &str, value: &str, _index: &str| value.to_uppercase());

        let clause = context.compile(
            &fields(&[("name", "al"), ("name__goadmin_operator__", "like")]),
            WhereClause::new(),
        );
        assert_eq!(clause.sql, "name LIKE ?");
        assert_eq!(clause.args, vec![text("%AL%")]);

        let clause = context.compile(
            &fields(&[("name", "al%"), ("name__goadmin_operator__", "like")]),
            WhereClause::new(),
        );
        assert_eq!(clause.args, vec![text("al%")]);

        let clause = context.compile(&fields(&[("name", "al")]), WhereClause::new());
        assert_eq!(clause.args, vec![text("al")]);
    }

    #[test]
    fn test_join_always_sanitizes() {
        let context = FilterContext::new(["id"])
            .with_sanitizer(|field: &str, value: &str, _index: &str| format!("{field}:{value}"))
            .with_join_resolver(|remote: &str| (remote == "name").then(|| "roles".to_string()));

        let clause = context.compile(&fields(&[("role_goadmin_join_name", "admin")]), WhereClause::new());
        assert_eq!(clause.sql, "roles.name = ?");
        assert_eq!(clause.args, vec![text("role_goadmin_join_name:admin")]);
    }

    #[test]
    fn test_join_like_checks_sanitized_value() {
        let context = FilterContext::new(Vec::<String>::new())
            .with_sanitizer(|_field: &str, value: &str, _index: &str| format!("{value}%"))
            .with_join_resolver(|_remote: &str| Some("roles".to_string()));

        let clause = context.compile(
            &fields(&[
                ("role_goadmin_join_name", "adm"),
                ("role_goadmin_join_name__goadmin_operator__", "like"),
            ]),
            WhereClause::new(),
        );
        assert_eq!(clause.sql, "roles.name LIKE ?");
        assert_eq!(clause.args, vec![text("adm%")]);
    }

    #[test]
    fn test_unresolved_join_and_unknown_column_are_dropped() {
        let context = FilterContext::new(["id"])
            .with_join_resolver(|_remote: &str| Some(String::new()));
        let clause = context.compile(
            &fields(&[("role_goadmin_join_name", "admin"), ("password", "x")]),
            WhereClause::new(),
        );
        assert!(clause.is_empty());
        assert!(clause.args.is_empty());
        assert_eq!(clause.seen_keys, vec!["role_goadmin_join_name", "password"]);
    }

    #[test]
    fn test_delimiter_quotes_columns_and_join_targets() {
        let context = FilterContext::new(["name"])
            .with_delimiter(DatabaseBackend::MySql)
            .with_join_resolver(|_remote: &str| Some("roles".to_string()));
        let clause = context.compile(
            &fields(&[("name", "al"), ("role_goadmin_join_title", "boss")]),
            WhereClause::new(),
        );
        assert_eq!(clause.sql, "`name` = ? AND roles.`title` = ?");
    }

    #[test]
    fn test_prefix_and_existing_args_are_kept() {
        let context = FilterContext::new(["name"]);
        let prior = WhereClause::with_prefix("deleted_at IS NULL AND ", vec![]);
        let clause = context.compile(&fields(&[("name", "al")]), prior);
        assert_eq!(clause.sql, "deleted_at IS NULL AND name = ?");

        let prior = WhereClause::with_prefix("tenant = ?", vec![Value::from(7)]);
        let clause = context.compile(&fields(&[("unknown", "x")]), prior);
        assert_eq!(clause.sql, "tenant = ?");
        assert_eq!(clause.args, vec![Value::from(7)]);
    }

    #[test]
    fn test_seen_keys_skip_plain_fields() {
        let context = FilterContext::new(["name", "age"]);
        let filter = fields(&[("name", "al"), ("age", "3")]);
        let prior = WhereClause::new().with_seen_keys(vec!["name".to_string()]);
        let clause = context.compile(&filter, prior);
        assert_eq!(clause.sql, "age = ?");
        assert_eq!(clause.seen_keys, vec!["name", "age"]);
    }

    #[test]
    fn test_indexed_keys_ignore_seen_keys() {
        let context = FilterContext::new(["age"]);
        let filter = fields(&[
            ("age", "1"),
            ("age__goadmin_index__1", "2"),
        ]);
        let prior = WhereClause::new().with_seen_keys(vec!["age".to_string()]);
        let clause = context.compile(&filter, prior);
        assert_eq!(clause.sql, "age = ? AND age = ?");
        assert_eq!(clause.args, vec![text("1"), text("2")]);
    }

    #[test]
    fn test_indexed_operator_lookup() {
        let context = FilterContext::new(["age"]);
        let filter = fields(&[
            ("age__goadmin_index__1", "2"),
            ("age__goadmin_operator____goadmin_index__1", "gr"),
            ("age__goadmin_index__2", "9"),
            ("age__goadmin_operator____goadmin_index__2", "le"),
        ]);
        let clause = context.compile(&filter, WhereClause::new());
        assert_eq!(clause.sql, "age > ? AND age < ?");
        assert_eq!(clause.args, vec![text("2"), text("9")]);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shared_types_are_send_and_sync() {
        assert_send_sync::<Parameters>();
        assert_send_sync::<WhereClause>();
        assert_send_sync::<FilterContext>();
        assert_send_sync::<FilterContext<fn(&str, &str, &str) -> String, fn(&str) -> Option<String>>>();

        let context = FilterContext::new(["name"])
            .with_sanitizer(|_field: &str, value: &str, _index: &str| value.to_string())
            .with_join_resolver(|_remote: &str| None::<String>);
        assert_shares(&context);
    }

    fn assert_shares<T: Send + Sync>(_: &T) {}

    #[test]
    fn test_into_condition_empty_matches_all() {
        let condition = WhereClause::new().into_condition();
        assert!(condition.is_empty());
    }

    #[test]
    fn test_into_statement() {
        let context = FilterContext::new(["name", "age"]).with_delimiter(DatabaseBackend::Postgres);
        let clause = context.compile(
            &fields(&[("name", "al"), ("age_start__goadmin", "18")]),
            WhereClause::new(),
        );
        let statement = clause.into_statement(DatabaseBackend::Postgres, "SELECT * FROM users");
        assert_eq!(
            statement.sql,
            "SELECT * FROM users WHERE \"name\" = $1 AND \"age\" >= $2"
        );
        assert_eq!(statement.values.map(|values| values.0.len()), Some(2));

        let statement =
            WhereClause::new().into_statement(DatabaseBackend::Sqlite, "SELECT * FROM users");
        assert_eq!(statement.sql, "SELECT * FROM users");
    }
}
