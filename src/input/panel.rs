//! Reading of the reference SNP panel.

use std::{io::Read, path::Path, time::Instant};

use multimap::MultiMap;
use serde::{Deserialize, Deserializer};
use thousands::Separable;

use crate::common::{io::open_read_maybe_gz, Nucleotide};

/// One SNP of the reference panel (e.g., 1000 Genomes loci).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefSnp {
    /// chromosome name
    #[serde(rename = "chr")]
    pub chrom: String,
    /// 1-based position
    pub pos: i32,
    /// reference allele
    #[serde(rename = "ref", deserialize_with = "from_allele_symbol")]
    pub ref_allele: Nucleotide,
    /// alternate allele
    #[serde(rename = "alt", deserialize_with = "from_allele_symbol")]
    pub alt_allele: Nucleotide,
}

impl RefSnp {
    /// The `(chrom, pos)` key used for joining.
    pub fn locus(&self) -> (&str, i32) {
        (self.chrom.as_str(), self.pos)
    }
}

/// Deserialize a single-letter allele into a `Nucleotide`.
fn from_allele_symbol<'de, D>(deserializer: D) -> Result<Nucleotide, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

/// Read the panel from CSV with a `chr,pos,ref,alt` header.
pub fn read_ref_snps<R: Read>(reader: R) -> Result<Vec<RefSnp>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut result = Vec::new();
    for record in reader.deserialize() {
        let record: RefSnp = record?;
        result.push(record);
    }

    Ok(result)
}

/// Load the panel from the file at `path` (optionally gzip-compressed).
pub fn load_ref_snps<P>(path: P) -> Result<Vec<RefSnp>, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::debug!("Loading reference SNPs from {:?}", path.as_ref());
    let before_loading = Instant::now();

    let records = read_ref_snps(open_read_maybe_gz(path.as_ref())?).map_err(|e| {
        anyhow::anyhow!(
            "problem reading reference SNPs from {:?}: {}",
            path.as_ref(),
            e
        )
    })?;

    tracing::debug!(
        "read {} reference SNPs in {:?}",
        records.len().separate_with_commas(),
        before_loading.elapsed()
    );

    Ok(records)
}

/// Index panel entries by locus; duplicate loci keep their file order.
pub fn by_locus(panel: &[RefSnp]) -> MultiMap<(&str, i32), &RefSnp> {
    panel.iter().map(|snp| (snp.locus(), snp)).collect()
}
