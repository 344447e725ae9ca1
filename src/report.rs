//! Coupling report writers and the matching reader
//!
//! Every format starts with a heading line and puts the two class columns
//! first, so any report can be read back with the classifier that wrote it.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::classifier::Classifier;
use crate::coupling::PairAggregate;
use crate::pair::ClassPair;

/// Output layout selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Class columns plus size, weight and subsystem counts
    Verbose,
    /// Class IDs only
    Pairs,
    /// Verbose plus the list of genomes containing each pair
    Groups,
}

/// Streaming sink for the significant pairs of a run
pub trait CouplingReporter {
    /// Note a genome that was part of the corpus
    fn register_genome(&mut self, genome_id: &str, name: &str);

    /// Write one significant pair
    fn write_pair(&mut self, pair: &ClassPair, aggregate: &PairAggregate) -> Result<()>;

    /// Flush everything
    fn finish(&mut self) -> Result<()>;
}

/// Tab-delimited report writer
pub struct TabReporter<'a, W: Write> {
    out: W,
    classifier: &'a dyn Classifier,
    format: ReportFormat,
    header_written: bool,
    genomes: usize,
    pairs: usize,
}

impl<'a, W: Write> TabReporter<'a, W> {
    pub fn new(out: W, classifier: &'a dyn Classifier, format: ReportFormat) -> Self {
        TabReporter {
            out,
            classifier,
            format,
            header_written: false,
            genomes: 0,
            pairs: 0,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let heading = match self.format {
            ReportFormat::Pairs => {
                let label = self.classifier.label();
                format!("{label}1\t{label}2")
            }
            ReportFormat::Verbose => format!(
                "{}\tsize\tweight\tss_match\tss_mismatch",
                self.classifier.heading()
            ),
            ReportFormat::Groups => format!(
                "{}\tsize\tweight\tss_match\tss_mismatch\tgenomes",
                self.classifier.heading()
            ),
        };
        writeln!(self.out, "{heading}")?;
        self.header_written = true;
        Ok(())
    }

    pub fn pairs_written(&self) -> usize {
        self.pairs
    }

    pub fn genomes_registered(&self) -> usize {
        self.genomes
    }
}

impl<W: Write> CouplingReporter for TabReporter<'_, W> {
    fn register_genome(&mut self, genome_id: &str, name: &str) {
        log::debug!("Reporting on genome {genome_id} ({name})");
        self.genomes += 1;
    }

    fn write_pair(&mut self, pair: &ClassPair, aggregate: &PairAggregate) -> Result<()> {
        self.write_header()?;
        match self.format {
            ReportFormat::Pairs => writeln!(self.out, "{pair}")?,
            ReportFormat::Verbose => writeln!(
                self.out,
                "{}\t{}\t{:.4}\t{}\t{}",
                self.classifier.format_pair(pair),
                aggregate.size(),
                aggregate.weight(),
                aggregate.ss_match(),
                aggregate.ss_mismatch()
            )?,
            ReportFormat::Groups => {
                let genomes: Vec<&str> = aggregate.genomes().iter().map(|g| g.as_str()).collect();
                writeln!(
                    self.out,
                    "{}\t{}\t{:.4}\t{}\t{}\t{}",
                    self.classifier.format_pair(pair),
                    aggregate.size(),
                    aggregate.weight(),
                    aggregate.ss_match(),
                    aggregate.ss_mismatch(),
                    genomes.join(",")
                )?
            }
        }
        self.pairs += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.out.flush().context("Failed to flush coupling report")?;
        log::info!(
            "Wrote {} pairs from {} genomes",
            self.pairs,
            self.genomes
        );
        Ok(())
    }
}

/// Read the pairs of a report written with `classifier`.
///
/// `format` tells whether the class columns carry names; the heading line and
/// `#` comment lines are skipped.
pub fn read_pairs<R: BufRead>(
    reader: R,
    classifier: &dyn Classifier,
    format: ReportFormat,
) -> Result<Vec<ClassPair>> {
    let mut pairs = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read coupling report")?;
        if line_no == 0 || line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let pair = match format {
            ReportFormat::Pairs => ClassPair::from_columns(&line, 0, 1),
            _ => classifier.read_pair(&line),
        };
        match pair {
            Some(pair) => pairs.push(pair),
            None => log::warn!("Skipping malformed report line {}", line_no + 1),
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FamilyClassifier, FileClassifier};
    use crate::coupling::Contribution;
    use crate::names::NameTable;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn aggregate() -> PairAggregate {
        let mut agg = PairAggregate::new();
        agg.add_contribution("g2", Contribution { weight: 1.0, same_subsystem: Some(true) });
        agg.add_contribution("g1", Contribution { weight: 0.5, same_subsystem: None });
        agg
    }

    fn named_classifier() -> FamilyClassifier {
        let mut table = NameTable::default();
        table.insert("PF1", "Alpha");
        table.insert("PF2", "Beta");
        let mut classifier = FamilyClassifier::new(Box::new(table));
        classifier.prepare_names(&["PF1", "PF2"]);
        classifier
    }

    #[test]
    fn test_verbose_report() {
        let classifier = named_classifier();
        let mut buf = Vec::new();
        {
            let mut reporter = TabReporter::new(&mut buf, &classifier, ReportFormat::Verbose);
            reporter.register_genome("g1", "First genome");
            reporter.register_genome("g2", "Second genome");
            reporter.write_pair(&ClassPair::new("PF2", "PF1"), &aggregate()).unwrap();
            reporter.finish().unwrap();
            assert_eq!(reporter.pairs_written(), 1);
            assert_eq!(reporter.genomes_registered(), 2);
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "family1\tname1\tfamily2\tname2\tsize\tweight\tss_match\tss_mismatch\n\
             PF1\tAlpha\tPF2\tBeta\t2\t1.5000\t1\t0\n"
        );
    }

    #[test]
    fn test_groups_report_round_trip() {
        let classifier = named_classifier();
        let mut buf = Vec::new();
        {
            let mut reporter = TabReporter::new(&mut buf, &classifier, ReportFormat::Groups);
            reporter.write_pair(&ClassPair::new("PF2", "PF1"), &aggregate()).unwrap();
            reporter.write_pair(&ClassPair::new("PF3", "PF1"), &aggregate()).unwrap();
            reporter.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("\tg1,g2"));

        let pairs = read_pairs(Cursor::new(text), &classifier, ReportFormat::Groups).unwrap();
        assert_eq!(pairs, vec![ClassPair::new("PF1", "PF2"), ClassPair::new("PF1", "PF3")]);
    }

    #[test]
    fn test_pairs_report_round_trip_unnamed() {
        let classifier = FileClassifier::from_table(HashMap::new());
        let mut buf = Vec::new();
        {
            let mut reporter = TabReporter::new(&mut buf, &classifier, ReportFormat::Verbose);
            reporter.write_pair(&ClassPair::new("K2", "K1"), &aggregate()).unwrap();
            reporter.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("class1\tclass2\tsize"));
        let pairs = read_pairs(Cursor::new(text), &classifier, ReportFormat::Verbose).unwrap();
        assert_eq!(pairs, vec![ClassPair::new("K1", "K2")]);
    }

    #[test]
    fn test_empty_report_has_heading() {
        let classifier = named_classifier();
        let mut buf = Vec::new();
        {
            let mut reporter = TabReporter::new(&mut buf, &classifier, ReportFormat::Pairs);
            reporter.finish().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "family1\tfamily2\n");
    }
}
