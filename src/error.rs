//! The error taxonomy of the synthesis core.
//!
//! Each local failure mode of the core surfaces as its own type implementing
//! [`std::error::Error`], following the same manual `Display` style used
//! throughout this crate instead of a derive-macro error crate.

use std::fmt;

/// The upstream DPA factory returned an acceptance condition that cannot be
/// translated to a total parity automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedAcceptanceError {
    condition: String,
}

impl UnsupportedAcceptanceError {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
        }
    }
}

impl fmt::Display for UnsupportedAcceptanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported acceptance condition for parity translation: {}",
            self.condition
        )
    }
}

impl std::error::Error for UnsupportedAcceptanceError {}

/// A letter was looked up outside `[0, 2^alphabet_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLetterError {
    letter: u64,
    alphabet_size: u32,
}

impl InvalidLetterError {
    pub fn new(letter: u64, alphabet_size: u32) -> Self {
        Self {
            letter,
            alphabet_size,
        }
    }
}

impl fmt::Display for InvalidLetterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "letter {} out of range for alphabet of size {} (2^{})",
            self.letter, self.alphabet_size, self.alphabet_size
        )
    }
}

impl std::error::Error for InvalidLetterError {}

/// `L_x`, `L_u` or `posts` was called with an out-of-range index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    what: String,
    index: usize,
    bound: usize,
}

impl DomainError {
    pub fn new(what: impl Into<String>, index: usize, bound: usize) -> Self {
        Self {
            what: what.into(),
            index,
            bound,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} index {} out of range [0, {})",
            self.what, self.index, self.bound
        )
    }
}

impl std::error::Error for DomainError {}

/// The DPA returned a color outside `[0, max_color]`, or an otherwise
/// inconsistent edge, while building the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpaInvariantViolation {
    color: u32,
    max_color: u32,
}

impl DpaInvariantViolation {
    pub fn new(color: u32, max_color: u32) -> Self {
        Self { color, max_color }
    }
}

impl fmt::Display for DpaInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dpa returned color {} outside [0, {}]",
            self.color, self.max_color
        )
    }
}

impl std::error::Error for DpaInvariantViolation {}

/// Either failure mode of [`crate::dpa::TotalDpa::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DpaBuildError {
    UnsupportedAcceptance(UnsupportedAcceptanceError),
    DpaInvariantViolation(DpaInvariantViolation),
}

impl From<UnsupportedAcceptanceError> for DpaBuildError {
    fn from(e: UnsupportedAcceptanceError) -> Self {
        DpaBuildError::UnsupportedAcceptance(e)
    }
}

impl From<DpaInvariantViolation> for DpaBuildError {
    fn from(e: DpaInvariantViolation) -> Self {
        DpaBuildError::DpaInvariantViolation(e)
    }
}

impl fmt::Display for DpaBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DpaBuildError::UnsupportedAcceptance(e) => write!(f, "{}", e),
            DpaBuildError::DpaInvariantViolation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DpaBuildError {}

/// Either failure mode of building the product arena end to end: the total
/// DPA enumeration ([`DpaBuildError`]) or a letter rejected by
/// [`crate::dpa::TotalDpa::successor`] during exploration ([`InvalidLetterError`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    Dpa(DpaBuildError),
    InvalidLetter(InvalidLetterError),
}

impl From<DpaBuildError> for SynthesisError {
    fn from(e: DpaBuildError) -> Self {
        SynthesisError::Dpa(e)
    }
}

impl From<InvalidLetterError> for SynthesisError {
    fn from(e: InvalidLetterError) -> Self {
        SynthesisError::InvalidLetter(e)
    }
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::Dpa(e) => write!(f, "{}", e),
            SynthesisError::InvalidLetter(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// The persistent text format (§6) was missing or malformed a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFileError {
    reason: String,
}

impl InvalidFileError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn missing_section(name: &str) -> Self {
        Self::new(format!("missing section header '{}:'", name))
    }
}

impl fmt::Display for InvalidFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid dpa file: {}", self.reason)
    }
}

impl std::error::Error for InvalidFileError {}
