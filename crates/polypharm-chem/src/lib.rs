//! SMILES parsing and structural fingerprints for the polypharmacy pipeline.
//!
//! Builds a molecular graph from SMILES line notation and derives a
//! Morgan-style circular fingerprint from it, entirely in Rust. Parsing and
//! hashing are deterministic: the same structure string always yields a
//! bit-identical fingerprint, across runs and across platforms.

pub mod fingerprint;
pub mod molecule;
pub mod smiles;

pub use fingerprint::{FingerprintConfig, MorganFingerprinter};
pub use molecule::{Atom, Bond, BondOrder, Molecule};
pub use smiles::parse_smiles;

pub type Result<T> = std::result::Result<T, ChemError>;

/// Failures while interpreting a SMILES string.
///
/// Every variant means the input cannot be turned into a usable molecular
/// graph; callers surface these as invalid-structure conditions for the
/// offending drug rather than aborting a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChemError {
    #[error("empty structure string")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unknown element symbol '{symbol}' at position {pos}")]
    UnknownElement { symbol: String, pos: usize },

    #[error("element '{symbol}' at position {pos} must be written in brackets")]
    ElementRequiresBrackets { symbol: String, pos: usize },

    #[error("bracket atom opened at position {pos} is never closed")]
    UnclosedBracket { pos: usize },

    #[error("branch opened with '(' is never closed")]
    UnclosedBranch,

    #[error("unmatched ')' at position {pos}")]
    UnmatchedBranchClose { pos: usize },

    #[error("ring closure {digit} is never matched")]
    UnclosedRingBond { digit: u16 },

    #[error("ring closure {digit} connects an atom to itself")]
    RingBondToSelf { digit: u16 },

    #[error("ring closure {digit} conflicts with an existing bond")]
    ConflictingRingBond { digit: u16 },

    #[error("bond symbol at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },

    #[error("bond symbol at position {pos} has no preceding atom")]
    BondWithoutAtom { pos: usize },

    #[error("valence of {total} exceeds what element '{symbol}' supports")]
    ValenceExceeded { symbol: String, total: u32 },
}
