use sea_orm::sea_query::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction of a list request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

impl SortType {
    /// Parse the wire form. Only the exact lowercase tokens are accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SortType> for Order {
    fn from(sort_type: SortType) -> Self {
        match sort_type {
            SortType::Asc => Order::Asc,
            SortType::Desc => Order::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_tokens() {
        assert_eq!(SortType::parse("asc"), Some(SortType::Asc));
        assert_eq!(SortType::parse("desc"), Some(SortType::Desc));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(SortType::parse("ASC"), None);
        assert_eq!(SortType::parse("Desc"), None);
        assert_eq!(SortType::parse(""), None);
    }

    #[test]
    fn test_into_order() {
        assert_eq!(Order::from(SortType::Asc), Order::Asc);
        assert_eq!(Order::from(SortType::Desc), Order::Desc);
    }

    #[test]
    fn test_display_matches_wire_form() {
        assert_eq!(SortType::Asc.to_string(), "asc");
        assert_eq!(SortType::Desc.to_string(), "desc");
    }
}
