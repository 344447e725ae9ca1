use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use couplings::class_filter::ClassFilterType;
use couplings::classifier::ClassifierType;
use couplings::config::{CouplingConfig, DEFAULT_SEED_FUNCTION};
use couplings::engine::{CouplingEngine, RunStats};
use couplings::genome::Genome;
use couplings::genome_io::GenomeDirectory;
use couplings::logging::{init_logger, level_for};
use couplings::neighbors::FinderType;
use couplings::pair_filter::PairFilterType;
use couplings::report::ReportFormat;

/// Parse a number that may have metric suffix (k/K=1000, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty string".to_string());
    }

    let (num_part, multiplier) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let multiplier = match c {
                'k' | 'K' => 1_000.0,
                'm' | 'M' => 1_000_000.0,
                'g' | 'G' => 1_000_000_000.0,
                _ => {
                    return Err(format!(
                        "Unknown suffix '{c}'. Use k/K (1000), m/M (1e6), or g/G (1e9)"
                    ))
                }
            };
            (&s[..s.len() - c.len_utf8()], multiplier)
        }
        _ => (s, 1.0),
    };

    let base: f64 = num_part
        .parse()
        .map_err(|e| format!("Invalid number: {e}"))?;
    let value = base * multiplier;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("Invalid distance {s}"));
    }
    if value > u64::MAX as f64 {
        return Err(format!("Value {value} too large"));
    }
    Ok(value.round() as u64)
}

/// couplings - functional coupling of gene classes across genomes
///
/// Counts how often two classes of genes sit close together on the same
/// strand, across every genome table in a directory, and reports the pairs
/// that recur often enough to suggest a functional link.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory of genome tables (.tsv or .tsv.gz)
    genomes: PathBuf,

    /// Output file (default: stdout)
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// How features are assigned to classes
    #[clap(short = 'c', long = "classifier", value_enum, default_value_t = ClassifierType::Families)]
    classifier: ClassifierType,

    /// Which nearby features count as neighbors
    #[clap(short = 'f', long = "finder", value_enum, default_value_t = FinderType::Close)]
    finder: FinderType,

    /// Maximum base-pair gap between neighbors (e.g. 5000, 5k)
    #[clap(short = 'g', long = "gap", default_value = "5k", value_parser = parse_metric_number)]
    gap: u64,

    /// Per-genome class filter
    #[clap(long = "class-filter", value_enum, default_value_t = ClassFilterType::None)]
    class_filter: ClassFilterType,

    /// Class IDs to drop, one per line (blacklist class filter)
    #[clap(long = "blacklist")]
    blacklist: Option<PathBuf>,

    /// Drop classes occurring more than this many times in a genome (limited class filter)
    #[clap(long = "max-count", default_value = "10")]
    max_count: usize,

    /// Significance test for aggregated pairs
    #[clap(short = 'p', long = "pair-filter", value_enum, default_value_t = PairFilterType::Size)]
    pair_filter: PairFilterType,

    /// Minimum group size (size filter) or weight (weight filter)
    #[clap(short = 'm', long = "min", default_value = "2")]
    min: f64,

    /// Class IDs of interest, one per line (whitelist pair filter)
    #[clap(long = "whitelist")]
    whitelist: Option<PathBuf>,

    /// Protein MD5 to class table (file classifier)
    #[clap(long = "class-table")]
    class_table: Option<PathBuf>,

    /// Class ID to name table for report names
    #[clap(long = "names")]
    names: Option<PathBuf>,

    /// Random seed for the random classifier
    #[clap(long = "seed", default_value = "0")]
    seed: u64,

    /// Skip genomes lacking the marker protein (Phenylalanyl-tRNA synthetase alpha chain)
    #[clap(long = "require-seed")]
    require_seed: bool,

    /// Marker function text for --require-seed
    #[clap(long = "seed-function")]
    seed_function: Option<String>,

    /// Report layout
    #[clap(long = "format", value_enum, default_value_t = ReportFormat::Verbose)]
    format: ReportFormat,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,

    /// Genomes scanned in parallel per batch
    #[clap(long = "batch-size", default_value = "64")]
    batch_size: usize,

    /// Process genomes one at a time without batching
    #[clap(long = "sequential")]
    sequential: bool,

    /// Debug-level logging
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,

    /// Quiet mode (warnings only, no progress output)
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

impl Args {
    fn config(&self) -> CouplingConfig {
        let seed_function = match (&self.seed_function, self.require_seed) {
            (Some(text), _) => Some(text.clone()),
            (None, true) => Some(DEFAULT_SEED_FUNCTION.to_string()),
            (None, false) => None,
        };
        CouplingConfig {
            classifier: self.classifier,
            finder: self.finder,
            max_gap: self.gap,
            class_filter: self.class_filter,
            blacklist: self.blacklist.clone(),
            max_class_count: self.max_count,
            pair_filter: self.pair_filter,
            min_value: self.min,
            whitelist: self.whitelist.clone(),
            class_table: self.class_table.clone(),
            names_file: self.names.clone(),
            seed: self.seed,
            seed_function,
            batch_size: self.batch_size,
            format: self.format,
        }
    }
}

fn log_stats(stats: &RunStats) {
    log::info!(
        "Genomes: {} processed, {} skipped; features: {} ({} classified)",
        stats.genomes,
        stats.skipped,
        stats.features,
        stats.classified
    );
    log::info!(
        "Classes removed by filter: {}; pairs: {} total, {} kept, {} rejected",
        stats.classes_removed,
        stats.pairs_total,
        stats.pairs_kept,
        stats.pairs_rejected
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(level_for(args.verbose, args.quiet));

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    // Every strategy is built up front so bad settings fail before any genome is read
    let config = args.config();
    let mut engine = CouplingEngine::from_config(&config)?;
    let pair_filter = config.build_pair_filter()?;

    let directory = GenomeDirectory::open(&args.genomes)?;
    log::info!(
        "{} genome tables in {}",
        directory.len(),
        args.genomes.display()
    );

    let progress = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message("Scanning genomes...");
        Some(pb)
    } else {
        None
    };

    let mut batch: Vec<Genome> = Vec::with_capacity(config.batch_size);
    for genome in directory.iter() {
        let genome = genome?;
        if args.sequential {
            engine.process_genome(&genome)?;
        } else {
            batch.push(genome);
            if batch.len() >= config.batch_size {
                engine.process_batch(&batch)?;
                batch.clear();
            }
        }
        if let Some(pb) = &progress {
            let stats = engine.stats();
            pb.set_message(format!(
                "{} genomes, {} pairs",
                stats.genomes + stats.skipped + batch.len(),
                engine.map().len()
            ));
            pb.tick();
        }
    }
    if !batch.is_empty() {
        engine.process_batch(&batch)?;
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let stats = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let stats = engine.write_report(pair_filter.as_ref(), &mut out, config.format)?;
            out.flush()?;
            stats
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let stats = engine.write_report(pair_filter.as_ref(), &mut out, config.format)?;
            out.flush()?;
            stats
        }
    };
    log_stats(&stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_number() {
        assert_eq!(parse_metric_number("5000"), Ok(5000));
        assert_eq!(parse_metric_number("5k"), Ok(5000));
        assert_eq!(parse_metric_number("1.5K"), Ok(1500));
        assert_eq!(parse_metric_number("2m"), Ok(2_000_000));
        assert!(parse_metric_number("").is_err());
        assert!(parse_metric_number("5x").is_err());
        assert!(parse_metric_number("-3").is_err());
    }

    #[test]
    fn test_require_seed_uses_default_marker() {
        let args = Args::parse_from(["couplings", "genomes", "--require-seed"]);
        assert_eq!(
            args.config().seed_function.as_deref(),
            Some(DEFAULT_SEED_FUNCTION)
        );
        let args = Args::parse_from(["couplings", "genomes", "-g", "10k", "-f", "adjacent"]);
        let config = args.config();
        assert_eq!(config.max_gap, 10_000);
        assert_eq!(config.finder, FinderType::Adjacent);
        assert!(config.seed_function.is_none());
    }
}
