//! Code for the ASCAT input tables written by both pipelines.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indexmap::IndexMap;

use crate::common::{locus_key, strip_chr};

/// One row of an output table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// chromosome name
    pub chrom: String,
    /// 1-based position
    pub pos: i32,
    /// BAF or logR value
    pub value: f64,
}

impl Row {
    /// Ordering by `(chrom, pos, value)`; chromosomes compare as strings.
    fn sort_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then(self.pos.cmp(&other.pos))
            .then(self.value.total_cmp(&other.value))
    }
}

/// Table with one value column for one sample, keyed by `"{chrom}_{pos}"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// name of the value column
    sample: String,
    /// rows by key, in output order
    rows: IndexMap<String, Row>,
}

impl Table {
    /// Build table from derived rows.
    ///
    /// Strips the `"chr"` prefix, sorts, and keeps only the last row of each
    /// key.  Rows must only carry finite values.
    pub fn from_rows(sample: &str, rows: Vec<Row>) -> Self {
        let mut rows = rows
            .into_iter()
            .map(|row| Row {
                chrom: strip_chr(&row.chrom).to_owned(),
                ..row
            })
            .collect::<Vec<_>>();
        rows.sort_by(Row::sort_cmp);

        // Rows with the same key are adjacent after sorting, so overwriting
        // keeps the last one in place.
        let mut by_key = IndexMap::with_capacity(rows.len());
        for row in rows {
            by_key.insert(locus_key(&row.chrom, row.pos), row);
        }

        Self {
            sample: sample.to_owned(),
            rows: by_key,
        }
    }

    /// Copy of this table with every value replaced by `value`.
    pub fn with_constant_value(&self, value: f64) -> Self {
        Self {
            sample: self.sample.clone(),
            rows: self
                .rows
                .iter()
                .map(|(key, row)| (key.clone(), Row { value, ..row.clone() }))
                .collect(),
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate `(key, row)` in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows.iter().map(|(key, row)| (key.as_str(), row))
    }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Write the table as TSV; the first column holds the key and has an
    /// empty header.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), anyhow::Error> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(writer);

        writer.write_record(["", "chrs", "pos", self.sample.as_str()])?;
        for (key, row) in &self.rows {
            writer.write_record([
                key.as_str(),
                row.chrom.as_str(),
                row.pos.to_string().as_str(),
                row.value.to_string().as_str(),
            ])?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the table as plain text to `path`.
    pub fn write_to_path<P>(&self, path: P) -> Result<(), anyhow::Error>
    where
        P: AsRef<Path>,
    {
        tracing::debug!("Writing table for {} to {:?}", &self.sample, path.as_ref());
        let file = File::create(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e)
        })?;
        let mut writer = BufWriter::new(file);
        self.write_tsv(&mut writer)
            .and_then(|()| writer.flush().map_err(anyhow::Error::from))
            .map_err(|e| anyhow::anyhow!("problem writing {:?}: {}", path.as_ref(), e))
    }
}
