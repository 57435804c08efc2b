//! Reading of alleleCounter output files.

use std::{io::Read, path::Path, str::FromStr, time::Instant};

use enum_map::EnumMap;
use thousands::Separable;

use crate::{
    common::{io::open_read_maybe_gz, Nucleotide},
    err::InputError,
};

/// Number of leading columns used from each row.
const NUM_FIELDS: usize = 7;

/// Count values that are read as missing rather than rejected.
const MISSING_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "<NA>", "NaN", "nan", "-nan", "NULL", "null", "None", ".",
];

/// Per-locus read counts as written by alleleCounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleCounts {
    /// chromosome name, as in the input file
    pub chrom: String,
    /// 1-based position
    pub pos: i32,
    /// read count per nucleotide, `None` if missing in the input
    pub counts: EnumMap<Nucleotide, Option<u32>>,
    /// total depth, `None` if missing in the input
    pub depth: Option<u32>,
}

impl AlleleCounts {
    /// The `(chrom, pos)` key used for joining.
    pub fn locus(&self) -> (&str, i32) {
        (self.chrom.as_str(), self.pos)
    }

    /// Convert a raw TSV row; columns are taken by position.
    fn from_record(record: &csv::StringRecord) -> Result<Self, InputError> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() < NUM_FIELDS {
            return Err(InputError::TooFewFields {
                line,
                expected: NUM_FIELDS,
                found: record.len(),
            });
        }

        let counts = EnumMap::from_array([
            parse_count(record, 2, "A", line)?,
            parse_count(record, 3, "C", line)?,
            parse_count(record, 4, "G", line)?,
            parse_count(record, 5, "T", line)?,
        ]);

        Ok(Self {
            chrom: record[0].to_owned(),
            pos: parse_field(record, 1, "pos", line)?,
            counts,
            depth: parse_count(record, 6, "DP", line)?,
        })
    }
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    line: u64,
) -> Result<T, InputError> {
    record[idx].parse().map_err(|_| InputError::InvalidField {
        line,
        column,
        value: record[idx].to_owned(),
    })
}

/// Parse a count column; NA-style values yield `None`.
fn parse_count(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    line: u64,
) -> Result<Option<u32>, InputError> {
    if MISSING_VALUES.contains(&&record[idx]) {
        Ok(None)
    } else {
        parse_field(record, idx, column, line).map(Some)
    }
}

/// Read alleleCounter records from `reader`.
///
/// The first line is skipped without looking at it.
pub fn read_allele_counts<R: Read>(reader: R) -> Result<Vec<AlleleCounts>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut result = Vec::new();
    for record in reader.records() {
        result.push(AlleleCounts::from_record(&record?)?);
    }

    Ok(result)
}

/// Load alleleCounter records from the file at `path` (optionally gzip-compressed).
pub fn load_allele_counts<P>(path: P) -> Result<Vec<AlleleCounts>, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::debug!("Loading allele counts from {:?}", path.as_ref());
    let before_loading = Instant::now();

    let records = read_allele_counts(open_read_maybe_gz(path.as_ref())?).map_err(|e| {
        anyhow::anyhow!(
            "problem reading allele counts from {:?}: {}",
            path.as_ref(),
            e
        )
    })?;

    tracing::debug!(
        "read {} allele count records in {:?}",
        records.len().separate_with_commas(),
        before_loading.elapsed()
    );

    Ok(records)
}
