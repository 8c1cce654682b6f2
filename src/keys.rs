//! Reserved query-parameter vocabulary and the filter operator table.
//!
//! These names are part of the wire format shared with the admin front end and
//! must not change.

use std::fmt;

/// Current page number.
pub const PAGE: &str = "__page";
/// Rows per page.
pub const PAGE_SIZE: &str = "__pageSize";
/// Sort column.
pub const SORT: &str = "__sort";
/// Sort direction (`asc` / `desc`).
pub const SORT_TYPE: &str = "__sort_type";
/// Comma separated list of visible columns.
pub const COLUMNS: &str = "__columns";
/// Route prefix of the table being listed.
pub const PREFIX: &str = "__prefix";
/// Set by pjax navigation requests.
pub const PJAX: &str = "_pjax";
/// Disables page transition animation when equal to `"true"`.
pub const NO_ANIMATION: &str = "__go_admin_no_animation_";

/// Primary key selection written by [`Parameters::with_pk`](crate::Parameters::with_pk).
pub const PRIMARY_KEY: &str = "pk";
/// "Select all" flag written by [`Parameters::with_is_all`](crate::Parameters::with_is_all).
pub const IS_ALL: &str = "is_all";
/// Primary key of the row being edited; never carried into pagination links.
pub const EDIT_PK: &str = "__goadmin_edit_pk";
/// Primary key of the row being shown; never carried into pagination links.
pub const DETAIL_PK: &str = "__goadmin_detail_pk";

pub const TRUE: &str = "true";
pub const FALSE: &str = "false";

/// Lower bound of a range filter: `age_start__goadmin=18`.
pub const RANGE_START_SUFFIX: &str = "_start__goadmin";
/// Upper bound of a range filter: `age_end__goadmin=30`.
pub const RANGE_END_SUFFIX: &str = "_end__goadmin";
/// Separates the local and remote halves of a joined filter key.
pub const JOIN_INFIX: &str = "_goadmin_join_";
/// Operator selector for a field: `name__goadmin_operator__=like`.
pub const OPERATOR_SUFFIX: &str = "__goadmin_operator__";
/// Marks one of several values for the same field: `age__goadmin_index__1`.
pub const INDEX_INFIX: &str = "__goadmin_index__";

/// Control keys that are never treated as filter fields.
pub const RESERVED_KEYS: [&str; 8] = [
    PAGE,
    PAGE_SIZE,
    SORT,
    SORT_TYPE,
    COLUMNS,
    PREFIX,
    PJAX,
    NO_ANIMATION,
];

#[must_use]
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Comparison operators selectable through [`OPERATOR_SUFFIX`] keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `like` → `LIKE`
    Like,
    /// `gr` → `>`
    Gr,
    /// `gq` → `>=`
    Gq,
    /// `eq` → `=`
    #[default]
    Eq,
    /// `ne` → `!=`
    Ne,
    /// `le` → `<`
    Le,
    /// `lq` → `<=`
    Lq,
    /// `free`: the value is handled by the caller, no SQL operator
    Free,
}

impl Operator {
    pub const ALL: [Self; 8] = [
        Self::Like,
        Self::Gr,
        Self::Gq,
        Self::Eq,
        Self::Ne,
        Self::Le,
        Self::Lq,
        Self::Free,
    ];

    /// Parse an operator selector value (`like`, `gr`, ...).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    /// The wire token for this operator
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Gr => "gr",
            Self::Gq => "gq",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Le => "le",
            Self::Lq => "lq",
            Self::Free => "free",
        }
    }

    /// SQL comparison for this operator, `None` for [`Operator::Free`].
    #[must_use]
    pub const fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::Like => Some("LIKE"),
            Self::Gr => Some(">"),
            Self::Gq => Some(">="),
            Self::Eq => Some("="),
            Self::Ne => Some("!="),
            Self::Le => Some("<"),
            Self::Lq => Some("<="),
            Self::Free => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
