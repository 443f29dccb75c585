#![forbid(unsafe_code)]

//! Pane identifiers.
//!
//! Every overlay pane is addressed by a three-digit zero-padded numeric ID
//! (`"001"`..`"999"`). The fragment protocol and the configuration layer both
//! speak this format; [`PaneId`] is the typed form.

use std::fmt;
use std::str::FromStr;

/// A three-digit pane identifier.
///
/// [`PaneId::parse`] is a shape check: exactly three ASCII digits. Fragment
/// tokens are accepted on shape alone (so `"000"` parses), while the
/// configuration layer additionally calls [`PaneId::validate`] to restrict
/// values to `001..=999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(u16);

impl PaneId {
    /// Parse a strict three-digit identifier.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()) {
            // Three ASCII digits always fit in u16.
            let value = s.parse::<u16>().map_err(|_| IdError::malformed(s))?;
            Ok(Self(value))
        } else {
            Err(IdError::malformed(s))
        }
    }

    /// Parse a lenient identifier: one to three digits, zero-padded.
    ///
    /// Menu button targets historically allowed short numeric forms
    /// (`1` meaning `001`); everything else stays strict.
    pub fn parse_padded(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if (1..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
            let value = s.parse::<u16>().map_err(|_| IdError::malformed(s))?;
            Ok(Self(value))
        } else {
            Err(IdError::malformed(s))
        }
    }

    /// Restrict to the configurable range `001..=999`.
    pub fn validate(self) -> Result<Self, IdError> {
        if (1..=999).contains(&self.0) {
            Ok(self)
        } else {
            Err(IdError::OutOfRange(self.0))
        }
    }

    /// The numeric value (`0..=999`).
    pub fn value(self) -> u16 {
        self.0
    }

    /// Lowest ID in `001..=999` not present in `used`.
    ///
    /// Returns `None` when all 999 identifiers are taken.
    pub fn first_unused(used: impl IntoIterator<Item = PaneId>) -> Option<PaneId> {
        let mut taken = [false; 1000];
        for id in used {
            taken[id.0 as usize] = true;
        }
        (1..=999u16).find(|n| !taken[*n as usize]).map(PaneId)
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl FromStr for PaneId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors from identifier parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Not a three-digit numeric string.
    Malformed(String),
    /// Parsed but outside `001..=999`.
    OutOfRange(u16),
}

impl IdError {
    fn malformed(s: &str) -> Self {
        Self::Malformed(s.to_string())
    }
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(s) => write!(f, "pane id must be a 3-digit number (001-999), got {s:?}"),
            Self::OutOfRange(n) => write!(f, "pane id must be between 001 and 999, got {n:03}"),
        }
    }
}

impl std::error::Error for IdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strict_three_digits() {
        assert_eq!(PaneId::parse("001").unwrap().value(), 1);
        assert_eq!(PaneId::parse("999").unwrap().value(), 999);
        assert_eq!(PaneId::parse("000").unwrap().value(), 0);
    }

    #[test]
    fn parse_rejects_other_shapes() {
        for bad in ["", "1", "12", "1234", "0a1", " 01", "１２３"] {
            assert!(PaneId::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(PaneId::parse(" 002 ").unwrap().value(), 2);
    }

    #[test]
    fn parse_padded_pads_short_forms() {
        assert_eq!(PaneId::parse_padded("1").unwrap().to_string(), "001");
        assert_eq!(PaneId::parse_padded("42").unwrap().to_string(), "042");
        assert_eq!(PaneId::parse_padded("042").unwrap().to_string(), "042");
        assert!(PaneId::parse_padded("1000").is_err());
        assert!(PaneId::parse_padded("x").is_err());
    }

    #[test]
    fn validate_rejects_zero() {
        assert_eq!(
            PaneId::parse("000").unwrap().validate(),
            Err(IdError::OutOfRange(0))
        );
        assert!(PaneId::parse("001").unwrap().validate().is_ok());
    }

    #[test]
    fn display_zero_pads() {
        assert_eq!(PaneId::parse_padded("7").unwrap().to_string(), "007");
    }

    #[test]
    fn first_unused_skips_taken() {
        let used = ["001", "002", "004"].map(|s| PaneId::parse(s).unwrap());
        assert_eq!(PaneId::first_unused(used).unwrap().to_string(), "003");
    }

    #[test]
    fn first_unused_exhausted() {
        let used = (1..=999u16).map(|n| PaneId::parse(&format!("{n:03}")).unwrap());
        assert_eq!(PaneId::first_unused(used), None);
    }
}
