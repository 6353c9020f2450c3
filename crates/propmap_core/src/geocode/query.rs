//! Structured address search input.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default prefix prepended to every searched address.
pub const DEFAULT_ADDRESS_PREFIX: &str = "東京都町田市";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Town name is required.
    EmptyTown,
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTown => write!(f, "town name is required"),
        }
    }
}

impl Error for QueryError {}

/// Address search form: town plus optional chome/banchi/go numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQuery {
    pub town: String,
    pub chome: Option<String>,
    pub banchi: Option<String>,
    pub go: Option<String>,
}

impl AddressQuery {
    pub fn new(town: impl Into<String>) -> Self {
        Self {
            town: town.into(),
            ..Self::default()
        }
    }

    /// Builds `<prefix><town>[<chome>丁目][<banchi>番地][<go>号]`.
    ///
    /// Parts are trimmed; blank optional parts are skipped.
    pub fn compose(&self, prefix: &str) -> Result<String, QueryError> {
        let town = self.town.trim();
        if town.is_empty() {
            return Err(QueryError::EmptyTown);
        }

        let mut address = format!("{prefix}{town}");
        for (part, suffix) in [
            (&self.chome, "丁目"),
            (&self.banchi, "番地"),
            (&self.go, "号"),
        ] {
            if let Some(value) = part.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                address.push_str(value);
                address.push_str(suffix);
            }
        }
        Ok(address)
    }
}
