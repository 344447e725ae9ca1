//! Pre-aggregation class filters
//!
//! Applied to each genome's results before pairing. Filters remove class IDs
//! from results in place; a result may end up with no classes, which simply
//! means it contributes no pairs.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use crate::class_result::{count_classes, GenomeResults};
use crate::genome_io::open_input;

/// Class filter selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClassFilterType {
    None,
    Blacklist,
    Limited,
}

pub trait ClassFilter: Send + Sync {
    /// Remove disallowed classes from the genome's results; returns the number removed
    fn apply(&self, genome: &mut GenomeResults) -> usize;
}

/// Leaves every class in place
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClassFilter;

impl ClassFilter for NoClassFilter {
    fn apply(&self, _genome: &mut GenomeResults) -> usize {
        0
    }
}

/// Removes a fixed set of class IDs
#[derive(Debug, Clone)]
pub struct BlacklistClassFilter {
    blacklist: HashSet<String>,
}

impl BlacklistClassFilter {
    /// Load one class ID per line (first tab-separated column); fails if the file cannot be read
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let blacklist = read_class_set(path)?;
        log::info!(
            "{} classes blacklisted from {}",
            blacklist.len(),
            path.display()
        );
        Ok(BlacklistClassFilter { blacklist })
    }

    pub fn from_set(blacklist: HashSet<String>) -> Self {
        BlacklistClassFilter { blacklist }
    }
}

impl ClassFilter for BlacklistClassFilter {
    fn apply(&self, genome: &mut GenomeResults) -> usize {
        genome
            .results_mut()
            .iter_mut()
            .map(|r| r.retain_classes(|c| !self.blacklist.contains(c)))
            .sum()
    }
}

/// Removes classes that occur on more than `max_count` features of the genome
#[derive(Debug, Clone, Copy)]
pub struct LimitedClassFilter {
    max_count: usize,
}

impl LimitedClassFilter {
    pub fn new(max_count: usize) -> Result<Self> {
        if max_count < 1 {
            bail!("Class occurrence limit must be at least 1, got {max_count}");
        }
        Ok(LimitedClassFilter { max_count })
    }
}

impl ClassFilter for LimitedClassFilter {
    fn apply(&self, genome: &mut GenomeResults) -> usize {
        let counts = count_classes(genome.results());
        let over: HashSet<&String> = counts
            .iter()
            .filter(|(_, n)| **n > self.max_count)
            .map(|(class_id, _)| class_id)
            .collect();
        if over.is_empty() {
            return 0;
        }
        genome
            .results_mut()
            .iter_mut()
            .map(|r| r.retain_classes(|c| !over.contains(c)))
            .sum()
    }
}

/// Read a set of class IDs, one per line, first column only
pub fn read_class_set(path: &Path) -> Result<HashSet<String>> {
    if !path.is_file() {
        bail!("Class list {} not found", path.display());
    }
    let reader = open_input(path)?;
    let mut set = HashSet::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.starts_with('#') {
            continue;
        }
        let id = line.split('\t').next().unwrap_or("").trim();
        if !id.is_empty() {
            set.insert(id.to_string());
        }
    }
    Ok(set)
}

/// Build the class filter for a type
pub fn create_class_filter(
    filter: ClassFilterType,
    blacklist: Option<&Path>,
    max_count: usize,
) -> Result<Box<dyn ClassFilter>> {
    Ok(match filter {
        ClassFilterType::None => Box::new(NoClassFilter),
        ClassFilterType::Blacklist => match blacklist {
            Some(path) => Box::new(BlacklistClassFilter::load(path)?),
            None => bail!("Blacklist class filter requires a blacklist file"),
        },
        ClassFilterType::Limited => Box::new(LimitedClassFilter::new(max_count)?),
    })
}
