//! SQL identifiers. Only names that passed through here are ever interpolated
//! into statement text; record values always travel as bound parameters.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

pub fn is_valid_identifier(raw: &str) -> bool {
    raw.len() <= 64 && IDENT_RE.is_match(raw)
}

/// A validated table or column name. Displays double-quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SQL identifier: {0:?}")]
pub struct InvalidIdent(pub String);

impl Ident {
    pub fn new(raw: &str) -> Result<Self, InvalidIdent> {
        if is_valid_identifier(raw) {
            Ok(Ident(raw.to_string()))
        } else {
            Err(InvalidIdent(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["assets", "building_rooms", "_tmp", "Room2"] {
            assert!(is_valid_identifier(name), "{name}");
        }
    }

    #[test]
    fn rejects_anything_that_could_break_out() {
        for name in ["", "1assets", "assets;", "a b", "a\"b", "assets--", "x'y"] {
            assert!(Ident::new(name).is_err(), "{name}");
        }
    }

    #[test]
    fn displays_quoted() {
        assert_eq!(Ident::new("pou_points").unwrap().to_string(), "\"pou_points\"");
    }
}
