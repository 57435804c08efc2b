//! Common functionality.

use byte_unit::{Byte, UnitType};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::err::InputError;

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!(
            "RSS now: {:.2}",
            Byte::from_u64(rss).get_appropriate_unit(UnitType::Binary)
        ),
        Err(e) => tracing::trace!("could not determine RSS: {}", e),
    }
}

/// Expand `~` in a path given on the command line.
pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Remove the `"chr"` prefix from a chromosome name.
///
/// Everything up to and including the last occurrence of `"chr"` is removed,
/// so the result never contains `"chr"`.  Names without `"chr"` are returned
/// unchanged.
pub fn strip_chr(chrom: &str) -> &str {
    match chrom.rfind("chr") {
        Some(idx) => &chrom[idx + "chr".len()..],
        None => chrom,
    }
}

/// Synthetic key of a locus in the output tables.
pub fn locus_key(chrom: &str, pos: i32) -> String {
    format!("{}_{}", chrom, pos)
}

/// The four nucleotides counted by alleleCounter.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl std::str::FromStr for Nucleotide {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "A" | "a" => Nucleotide::A,
            "C" | "c" => Nucleotide::C,
            "G" | "g" => Nucleotide::G,
            "T" | "t" => Nucleotide::T,
            _ => return Err(InputError::InvalidNucleotide(s.to_owned())),
        })
    }
}
