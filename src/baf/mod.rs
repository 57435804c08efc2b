//! Implementation of the `baf` sub command.

use std::{path::PathBuf, time::Instant};

use clap::Parser;
use thousands::Separable;

use crate::{
    common::{expand_path, trace_rss_now},
    input::{
        counts::{load_allele_counts, AlleleCounts},
        panel::{self, load_ref_snps, RefSnp},
    },
    output::{Row, Table},
};

/// Command line arguments for `baf` sub command.
#[derive(Parser, Debug)]
#[command(about = "Convert alleleCounter output to an ASCAT BAF table", long_about = None)]
pub struct Args {
    /// Path to the reference SNP panel CSV (`chr,pos,ref,alt`).
    #[arg(short = 'r', long = "ref_snp_csv")]
    pub ref_snp_csv: String,
    /// Path to the alleleCounter output of the sample.
    #[arg(short = 'a', long = "allele_count")]
    pub allele_count: String,
    /// Directory to write the BAF table to.
    #[arg(short = 'o', long = "out_dir")]
    pub out_dir: PathBuf,
    /// Sample name, used for the value column and the file name.
    #[arg(short = 's', long = "sample")]
    pub sample: String,
    /// Sample type, e.g., `Tumor` or `Normal`.
    #[arg(short = 't', long = "type")]
    pub sample_type: String,
}

impl Args {
    /// Path of the output BAF table.
    pub fn path_output(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_{}_BAF.txt", &self.sample, &self.sample_type))
    }
}

/// Fraction of the alternate allele; `None` without any ref/alt reads.
pub fn b_allele_frequency(ref_count: u32, alt_count: u32) -> Option<f64> {
    let total = u64::from(ref_count) + u64::from(alt_count);
    if total == 0 {
        None
    } else {
        Some(alt_count as f64 / total as f64)
    }
}

/// Compute the BAF table of one sample at the panel loci.
pub fn derive_baf(counts: &[AlleleCounts], panel: &[RefSnp], sample: &str) -> Table {
    let panel_by_locus = panel::by_locus(panel);

    let mut rows = Vec::new();
    for record in counts {
        let Some(snps) = panel_by_locus.get_vec(&record.locus()) else {
            continue;
        };
        for snp in snps {
            let (Some(ref_count), Some(alt_count)) =
                (record.counts[snp.ref_allele], record.counts[snp.alt_allele])
            else {
                continue;
            };
            if let Some(baf) = b_allele_frequency(ref_count, alt_count) {
                rows.push(Row {
                    chrom: record.chrom.clone(),
                    pos: record.pos,
                    value: baf,
                });
            }
        }
    }
    tracing::debug!(
        "{} panel loci with defined BAF from {} allele count records",
        rows.len().separate_with_commas(),
        counts.len().separate_with_commas()
    );

    Table::from_rows(sample, rows)
}

/// Main entry point for the `baf` sub command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("Starting `baf`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    tracing::info!("Loading input files...");
    let panel = load_ref_snps(expand_path(&args.ref_snp_csv))?;
    let counts = load_allele_counts(expand_path(&args.allele_count))?;
    tracing::info!(
        "... done loading {} panel SNPs and {} allele count records",
        panel.len().separate_with_commas(),
        counts.len().separate_with_commas()
    );
    trace_rss_now();

    let table = derive_baf(&counts, &panel, &args.sample);

    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        anyhow::anyhow!("could not create output directory {:?}: {}", &args.out_dir, e)
    })?;
    let path_output = args.path_output();
    table.write_to_path(&path_output)?;
    tracing::info!(
        "wrote {} BAF values for {} to {:?}",
        table.len().separate_with_commas(),
        table.sample(),
        &path_output
    );

    tracing::info!(
        "All of `baf` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
