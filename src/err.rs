//! Errors raised while reading the input files.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("line {line}: expected at least {expected} fields but found {found}")]
    TooFewFields {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {column} value {value:?}")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("invalid nucleotide {0:?}, expected one of A, C, G, T")]
    InvalidNucleotide(String),
}
