//! Backend specific SQL details: identifier quoting and placeholder style.

use sea_orm::DatabaseBackend;
use std::borrow::Cow;

/// Identifier quoting used when a filter field is written into SQL.
///
/// The default delimiter is empty, which writes identifiers bare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delimiter {
    open: &'static str,
    close: &'static str,
}

impl Delimiter {
    pub const NONE: Self = Self::new("", "");
    pub const DOUBLE_QUOTE: Self = Self::new("\"", "\"");
    pub const BACKTICK: Self = Self::new("`", "`");
    pub const BRACKET: Self = Self::new("[", "]");

    #[must_use]
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self { open, close }
    }

    #[must_use]
    pub const fn for_backend(backend: DatabaseBackend) -> Self {
        match backend {
            DatabaseBackend::MySql => Self::BACKTICK,
            DatabaseBackend::Postgres | DatabaseBackend::Sqlite => Self::DOUBLE_QUOTE,
        }
    }

    /// Wrap `ident` in the delimiter. A closing delimiter inside the
    /// identifier is doubled so it cannot terminate the quoted name.
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        if self.close.is_empty() {
            return format!("{}{ident}", self.open);
        }
        let escaped = ident.replace(self.close, &self.close.repeat(2));
        format!("{}{escaped}{}", self.open, self.close)
    }
}

impl From<DatabaseBackend> for Delimiter {
    fn from(backend: DatabaseBackend) -> Self {
        Self::for_backend(backend)
    }
}

/// Rewrite `?` placeholders into the style `backend` expects.
///
/// PostgreSQL gets `$1, $2, ...`; `?` inside quoted literals or identifiers
/// is left alone. Other backends use `?` as is.
#[must_use]
pub fn placeholders_for(backend: DatabaseBackend, sql: &str) -> Cow<'_, str> {
    match backend {
        DatabaseBackend::Postgres if sql.contains('?') => Cow::Owned(numbered_placeholders(sql)),
        _ => Cow::Borrowed(sql),
    }
}

fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut index = 0usize;

    for ch in sql.chars() {
        match (quote, ch) {
            (Some(open), c) if c == open => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                out.push(ch);
            }
            (None, '?') => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            (None, c) => out.push(c),
        }
    }

    out
}
