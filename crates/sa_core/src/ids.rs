//! crates/sa_core/src/ids.rs
//! Survey unit identifier. Any non-empty, trimmed, printable string up to
//! 128 bytes; ordering is plain lexicographic (byte order), which is the
//! canonical row order of every table the engine emits.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const UNIT_ID_MAX_LEN: usize = 128;

/// Non-empty, no surrounding whitespace, no control characters.
#[inline]
pub fn is_valid_unit_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= UNIT_ID_MAX_LEN
        && s.trim() == s
        && !s.chars().any(char::is_control)
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct UnitId(String);

impl UnitId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UnitId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_unit_id(s) {
            Ok(UnitId(s.to_owned()))
        } else {
            Err(CoreError::InvalidId(s.to_owned()))
        }
    }
}

impl TryFrom<&str> for UnitId {
    type Error = CoreError;
    #[inline]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for UnitId {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_unit_id(&value) {
            Ok(UnitId(value))
        } else {
            Err(CoreError::InvalidId(value))
        }
    }
}

impl From<UnitId> for String {
    #[inline]
    fn from(id: UnitId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_free_form_labels() {
        assert!("A".parse::<UnitId>().is_ok());
        assert!("Polygon 12".parse::<UnitId>().is_ok());
        assert!("zone-3/north".parse::<UnitId>().is_ok());
    }

    #[test]
    fn rejects_blank_padded_and_control() {
        assert!("".parse::<UnitId>().is_err());
        assert!(" A".parse::<UnitId>().is_err());
        assert!("A\t".parse::<UnitId>().is_err());
        assert!("A\nB".parse::<UnitId>().is_err());
        assert!("x".repeat(129).parse::<UnitId>().is_err());
    }

    #[test]
    fn orders_lexicographically() {
        let mut ids: Vec<UnitId> = ["b", "A", "10", "2"].iter().map(|s| s.parse().unwrap()).collect();
        ids.sort();
        let got: Vec<&str> = ids.iter().map(UnitId::as_str).collect();
        assert_eq!(got, vec!["10", "2", "A", "b"]);
    }
}
