pub mod admin;
pub mod auth;
pub mod error;
pub mod lookup;
pub mod store;
#[cfg(feature = "web")]
pub mod web;

pub use admin::WordAdmin;
pub use auth::{Identity, SessionUser};
pub use error::AppError;
pub use lookup::{LookupOutcome, Resolver, Translation};
pub use store::{Store, StoreError, Suggestion, WordPair, WordStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language tag carried by example sentences and lookup results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Tr,
    En,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Tr => "tr",
            Lang::En => "en",
        }
    }

    /// The language a translation is rendered into.
    pub fn opposite(self) -> Self {
        match self {
            Lang::Tr => Lang::En,
            Lang::En => Lang::Tr,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tr" => Ok(Lang::Tr),
            "en" => Ok(Lang::En),
            other => Err(format!("unknown language {other:?} (expected `tr` or `en`)")),
        }
    }
}

/// Trims and lower-cases a dictionary field the way it is stored.
pub fn normalize_field(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_parses_case_insensitively() {
        assert_eq!("TR".parse::<Lang>(), Ok(Lang::Tr));
        assert_eq!(" en ".parse::<Lang>(), Ok(Lang::En));
        assert!("de".parse::<Lang>().is_err());
    }

    #[test]
    fn normalize_field_trims_and_lowers() {
        assert_eq!(normalize_field("  Kitap "), "kitap");
        assert_eq!(normalize_field("ÇİÇEK"), "\u{e7}i\u{307}\u{e7}ek");
    }
}
