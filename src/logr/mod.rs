//! Implementation of the `logr` sub command.
//!
//! The tumor logR is computed as
//!
//! ```text
//! tumor_R    = DP_tumor / DP_normal
//! tumor_logR = log2(tumor_R / mean(tumor_R))
//! ```
//!
//! while the normal logR is always zero.

use std::{path::PathBuf, time::Instant};

use clap::Parser;
use multimap::MultiMap;
use thousands::Separable;

use crate::{
    common::{expand_path, trace_rss_now},
    input::{
        counts::{load_allele_counts, AlleleCounts},
        panel::{self, load_ref_snps, RefSnp},
    },
    output::{Row, Table},
};

/// Command line arguments for `logr` sub command.
#[derive(Parser, Debug)]
#[command(about = "Convert tumor/normal alleleCounter output to ASCAT LogR tables", long_about = None)]
pub struct Args {
    /// Path to the alleleCounter output of the tumor sample.
    #[arg(short = 't', long = "tumor")]
    pub tumor: String,
    /// Path to the alleleCounter output of the normal sample.
    #[arg(short = 'n', long = "normal")]
    pub normal: String,
    /// Optional reference SNP panel CSV to restrict the loci to.
    #[arg(short = 'r', long = "ref_snp_csv")]
    pub ref_snp_csv: Option<String>,
    /// Directory to write the LogR tables to.
    #[arg(short = 'o', long = "out_dir")]
    pub out_dir: PathBuf,
    /// Sample name, used for the value column and the file names.
    #[arg(short = 's', long = "sample")]
    pub sample: String,
}

impl Args {
    /// Path of the tumor LogR table.
    pub fn path_output_tumor(&self) -> PathBuf {
        self.out_dir.join(format!("{}_Tumor_LogR.txt", &self.sample))
    }

    /// Path of the normal LogR table.
    pub fn path_output_normal(&self) -> PathBuf {
        self.out_dir.join(format!("{}_Normal_LogR.txt", &self.sample))
    }
}

/// Tumor and normal LogR tables of one patient; both have the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRTables {
    pub tumor: Table,
    pub normal: Table,
}

/// Depth ratio of tumor and normal; non-finite for zero normal depth.
pub fn depth_ratio(tumor_depth: u32, normal_depth: u32) -> f64 {
    tumor_depth as f64 / normal_depth as f64
}

/// Arithmetic mean, `None` for no values.
///
/// Values are summed in sorted order so the result does not depend on the
/// input order.
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted.iter().sum::<f64>() / sorted.len() as f64)
}

/// Compute tumor and normal LogR tables of one patient.
///
/// With `panel`, only loci present in the panel are used.
pub fn derive_logr(
    tumor: &[AlleleCounts],
    normal: &[AlleleCounts],
    panel: Option<&[RefSnp]>,
    sample: &str,
) -> LogRTables {
    let normal_by_locus: MultiMap<(&str, i32), &AlleleCounts> =
        normal.iter().map(|record| (record.locus(), record)).collect();
    let panel_by_locus = panel.map(panel::by_locus);

    // (tumor record, tumor_R) for all joined loci with both depths and finite tumor_R
    let mut joined = Vec::new();
    for tumor_record in tumor {
        let Some(normal_records) = normal_by_locus.get_vec(&tumor_record.locus()) else {
            continue;
        };
        let panel_hits = match &panel_by_locus {
            Some(panel_by_locus) => panel_by_locus
                .get_vec(&tumor_record.locus())
                .map(Vec::len)
                .unwrap_or_default(),
            None => 1,
        };
        for normal_record in normal_records {
            let (Some(tumor_depth), Some(normal_depth)) =
                (tumor_record.depth, normal_record.depth)
            else {
                continue;
            };
            let tumor_r = depth_ratio(tumor_depth, normal_depth);
            if !tumor_r.is_finite() {
                continue;
            }
            for _ in 0..panel_hits {
                joined.push((tumor_record, tumor_r));
            }
        }
    }

    // The mean includes rows that are later dropped as duplicates.
    let tumor_ratios = joined.iter().map(|(_, r)| *r).collect::<Vec<_>>();
    let rows = match mean(&tumor_ratios) {
        Some(mean_r) => {
            tracing::debug!(
                "mean tumor_R over {} loci is {}",
                tumor_ratios.len().separate_with_commas(),
                mean_r
            );
            joined
                .iter()
                .filter_map(|(record, tumor_r)| {
                    let tumor_logr = (tumor_r / mean_r).log2();
                    tumor_logr.is_finite().then(|| Row {
                        chrom: record.chrom.clone(),
                        pos: record.pos,
                        value: tumor_logr,
                    })
                })
                .collect()
        }
        None => Vec::new(),
    };

    let tumor = Table::from_rows(sample, rows);
    let normal = tumor.with_constant_value(0.0);
    LogRTables { tumor, normal }
}

/// Main entry point for the `logr` sub command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("Starting `logr`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    tracing::info!("Loading input files...");
    let tumor = load_allele_counts(expand_path(&args.tumor))?;
    let normal = load_allele_counts(expand_path(&args.normal))?;
    let panel = args
        .ref_snp_csv
        .as_ref()
        .map(|path| load_ref_snps(expand_path(path)))
        .transpose()?;
    tracing::info!(
        "... done loading {} tumor and {} normal allele count records",
        tumor.len().separate_with_commas(),
        normal.len().separate_with_commas()
    );
    if let Some(panel) = &panel {
        tracing::info!(
            "restricting to {} panel SNPs",
            panel.len().separate_with_commas()
        );
    }
    trace_rss_now();

    let tables = derive_logr(&tumor, &normal, panel.as_deref(), &args.sample);

    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        anyhow::anyhow!("could not create output directory {:?}: {}", &args.out_dir, e)
    })?;
    let path_output_tumor = args.path_output_tumor();
    tables.tumor.write_to_path(&path_output_tumor)?;
    let path_output_normal = args.path_output_normal();
    tables.normal.write_to_path(&path_output_normal)?;
    tracing::info!(
        "wrote {} logR values for {} to {:?} and {:?}",
        tables.tumor.len().separate_with_commas(),
        tables.tumor.sample(),
        &path_output_tumor,
        &path_output_normal
    );

    tracing::info!(
        "All of `logr` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use enum_map::EnumMap;
    use pretty_assertions::assert_eq;

    use crate::{
        common::{self, Nucleotide},
        input::{counts::AlleleCounts, panel::RefSnp},
    };

    use super::Args;

    fn counts(chrom: &str, pos: i32, depth: u32) -> AlleleCounts {
        AlleleCounts {
            chrom: chrom.to_owned(),
            pos,
            counts: EnumMap::from_array([Some(depth), Some(0), Some(0), Some(0)]),
            depth: Some(depth),
        }
    }

    fn snp(chrom: &str, pos: i32) -> RefSnp {
        RefSnp {
            chrom: chrom.to_owned(),
            pos,
            ref_allele: Nucleotide::A,
            alt_allele: Nucleotide::C,
        }
    }

    fn values(table: &crate::output::Table) -> Vec<(&str, f64)> {
        table.iter().map(|(key, row)| (key, row.value)).collect()
    }

    #[rstest::rstest]
    #[case(5, 10, 0.5)]
    #[case(10, 5, 2.0)]
    #[case(0, 10, 0.0)]
    fn depth_ratio(#[case] tumor: u32, #[case] normal: u32, #[case] expected: f64) {
        let actual = super::depth_ratio(tumor, normal);
        assert!(float_cmp::approx_eq!(f64, expected, actual, ulps = 2));
    }

    #[rstest::rstest]
    #[case(5, 0)]
    #[case(0, 0)]
    fn depth_ratio_zero_normal(#[case] tumor: u32, #[case] normal: u32) {
        assert!(!super::depth_ratio(tumor, normal).is_finite());
    }

    #[test]
    fn mean() {
        assert_eq!(None, super::mean(&[]));
        assert_eq!(Some(2.0), super::mean(&[4.0, 0.0, 1.0, 1.0, 2.0, 4.0]));
    }

    #[test]
    fn derive_logr_single_locus() {
        let tables = super::derive_logr(
            &[counts("chr1", 100, 5)],
            &[counts("chr1", 100, 10)],
            None,
            "P1",
        );

        assert_eq!(vec![("1_100", 0.0)], values(&tables.tumor));
        assert_eq!(vec![("1_100", 0.0)], values(&tables.normal));
    }

    #[test]
    fn derive_logr_normalizes_by_mean() {
        let tables = super::derive_logr(
            &[
                counts("chr1", 1, 10),
                counts("chr1", 2, 20),
                counts("chr1", 3, 40),
            ],
            &[
                counts("chr1", 1, 10),
                counts("chr1", 2, 10),
                counts("chr1", 3, 10),
                counts("chr1", 4, 10),
            ],
            None,
            "P1",
        );

        // tumor_R = 1, 2, 4 with mean 7/3
        let expected = [1.0f64, 2.0, 4.0]
            .iter()
            .map(|r| (r / (7.0 / 3.0)).log2())
            .collect::<Vec<_>>();
        let actual = values(&tables.tumor);
        assert_eq!(3, actual.len());
        for ((_, actual), expected) in actual.iter().zip(expected.iter()) {
            assert!(float_cmp::approx_eq!(f64, *expected, *actual, ulps = 4));
        }
    }

    #[test]
    fn derive_logr_drops_zero_normal_depth_before_mean() {
        let tables = super::derive_logr(
            &[counts("chr1", 1, 10), counts("chr1", 2, 20), counts("chr1", 3, 30)],
            &[counts("chr1", 1, 10), counts("chr1", 2, 10), counts("chr1", 3, 0)],
            None,
            "P1",
        );

        // tumor_R = 1, 2 with mean 1.5; chr1:3 is dropped
        let actual = values(&tables.tumor);
        assert_eq!(
            vec!["1_1", "1_2"],
            actual.iter().map(|(key, _)| *key).collect::<Vec<_>>()
        );
        assert!(float_cmp::approx_eq!(
            f64,
            (1.0f64 / 1.5).log2(),
            actual[0].1,
            ulps = 4
        ));
    }

    #[test]
    fn derive_logr_missing_count_column_keeps_rows() {
        let tumor = [counts("chr1", 1, 10), counts("chr1", 2, 40)];
        let normal = [counts("chr1", 1, 10), counts("chr1", 2, 10)];
        let complete = super::derive_logr(&tumor, &normal, None, "P1");

        let mut tumor_missing = tumor.clone();
        tumor_missing[0].counts[Nucleotide::A] = None;
        tumor_missing[1].counts[Nucleotide::G] = None;
        let mut normal_missing = normal.clone();
        normal_missing[1].counts[Nucleotide::T] = None;
        let tables = super::derive_logr(&tumor_missing, &normal_missing, None, "P1");

        assert_eq!(complete, tables);
        assert_eq!(2, tables.tumor.len());
    }

    #[rstest::rstest]
    #[case(true)]
    #[case(false)]
    fn derive_logr_missing_depth_drops_row_before_mean(#[case] missing_in_tumor: bool) {
        let mut tumor = vec![
            counts("chr1", 1, 10),
            counts("chr1", 2, 40),
            counts("chr1", 3, 70),
        ];
        let mut normal = vec![
            counts("chr1", 1, 10),
            counts("chr1", 2, 10),
            counts("chr1", 3, 10),
        ];
        if missing_in_tumor {
            tumor[2].depth = None;
        } else {
            normal[2].depth = None;
        }

        let tables = super::derive_logr(&tumor, &normal, None, "P1");

        // tumor_R = 1, 4 with mean 2.5; chr1:3 takes no part
        let actual = values(&tables.tumor);
        assert_eq!(
            vec!["1_1", "1_2"],
            actual.iter().map(|(key, _)| *key).collect::<Vec<_>>()
        );
        assert!(float_cmp::approx_eq!(f64, (1.0f64 / 2.5).log2(), actual[0].1, ulps = 4));
        assert!(float_cmp::approx_eq!(f64, (4.0f64 / 2.5).log2(), actual[1].1, ulps = 4));
        assert_eq!(2, tables.normal.len());
    }

    #[test]
    fn derive_logr_zero_tumor_depth_counts_for_mean() {
        let tables = super::derive_logr(
            &[counts("chr1", 1, 0), counts("chr1", 2, 20)],
            &[counts("chr1", 1, 10), counts("chr1", 2, 10)],
            None,
            "P1",
        );

        // tumor_R = 0, 2 with mean 1; log2(0) is dropped
        assert_eq!(vec![("1_2", 1.0)], values(&tables.tumor));
    }

    #[test]
    fn derive_logr_duplicates_count_for_mean() {
        let tables = super::derive_logr(
            &[
                counts("chr1", 1, 10),
                counts("1", 1, 40),
                counts("chr1", 2, 10),
            ],
            &[
                counts("chr1", 1, 10),
                counts("1", 1, 10),
                counts("chr1", 2, 10),
            ],
            None,
            "P1",
        );

        // tumor_R = 1, 4, 1 with mean 2; "1_1" keeps the larger logR
        assert_eq!(vec![("1_1", 1.0), ("1_2", -1.0)], values(&tables.tumor));
        assert_eq!(vec![("1_1", 0.0), ("1_2", 0.0)], values(&tables.normal));
    }

    #[test]
    fn derive_logr_restricted_to_panel() {
        let tumor = [counts("chr1", 1, 10), counts("chr1", 2, 40)];
        let normal = [counts("chr1", 1, 10), counts("chr1", 2, 10)];
        let panel = [snp("chr1", 2), snp("chr1", 99)];

        let tables = super::derive_logr(&tumor, &normal, Some(&panel[..]), "P1");

        // only tumor_R = 4 remains, so the mean is 4 as well
        assert_eq!(vec![("1_2", 0.0)], values(&tables.tumor));
    }

    #[test]
    fn derive_logr_empty_join() {
        let tables = super::derive_logr(
            &[counts("chr1", 1, 10)],
            &[counts("chr2", 1, 10)],
            None,
            "P1",
        );

        assert!(tables.tumor.is_empty());
        assert!(tables.normal.is_empty());
    }

    #[test]
    fn derive_logr_normal_shares_rows_with_tumor() {
        let tables = super::derive_logr(
            &[counts("chr2", 7, 3), counts("chrX", 1, 9), counts("chr10", 4, 6)],
            &[counts("chr2", 7, 3), counts("chrX", 1, 3), counts("chr10", 4, 2)],
            None,
            "P1",
        );

        let tumor_keys = tables.tumor.iter().map(|(key, _)| key).collect::<Vec<_>>();
        let normal_keys = tables.normal.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(vec!["10_4", "2_7", "X_1"], tumor_keys);
        assert_eq!(tumor_keys, normal_keys);
        assert!(tables.normal.iter().all(|(_, row)| row.value == 0.0));
    }

    fn args(out_dir: std::path::PathBuf, ref_snp_csv: Option<&str>) -> Args {
        Args {
            tumor: String::from("tests/data/logr/P1.tumor.alleleCounts.tsv"),
            normal: String::from("tests/data/logr/P1.normal.alleleCounts.tsv"),
            ref_snp_csv: ref_snp_csv.map(String::from),
            out_dir,
            sample: String::from("P1"),
        }
    }

    #[test]
    fn path_output() {
        let args = args("/tmp/out".into(), None);

        assert_eq!(
            std::path::PathBuf::from("/tmp/out/P1_Tumor_LogR.txt"),
            args.path_output_tumor()
        );
        assert_eq!(
            std::path::PathBuf::from("/tmp/out/P1_Normal_LogR.txt"),
            args.path_output_normal()
        );
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = args(tmp_dir.join("out"), None);

        super::run(&common::Args::default(), &args)?;

        assert!(file_diff::diff(
            args.path_output_tumor().to_str().expect("valid path"),
            "tests/data/logr/P1_Tumor_LogR.txt",
        ));
        assert!(file_diff::diff(
            args.path_output_normal().to_str().expect("valid path"),
            "tests/data/logr/P1_Normal_LogR.txt",
        ));

        Ok(())
    }

    #[test]
    fn run_with_panel() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = args(tmp_dir.to_path_buf(), Some("tests/data/logr/ref_snps.csv"));

        super::run(&common::Args::default(), &args)?;

        assert_eq!(
            std::fs::read_to_string("tests/data/logr/P1_Tumor_LogR.panel.txt")?,
            std::fs::read_to_string(args.path_output_tumor())?
        );
        assert_eq!(
            std::fs::read_to_string("tests/data/logr/P1_Normal_LogR.panel.txt")?,
            std::fs::read_to_string(args.path_output_normal())?
        );

        Ok(())
    }
}
