//! Post-aggregation significance filters for class pairs

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::class_filter::read_class_set;
use crate::coupling::PairAggregate;
use crate::pair::ClassPair;

/// Pair filter selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PairFilterType {
    Size,
    Weight,
    Whitelist,
}

pub trait PairFilter: Send + Sync {
    /// True if the pair should be reported
    fn is_significant(&self, pair: &ClassPair, aggregate: &PairAggregate) -> bool;
}

/// Keeps pairs found in at least `min_size` genomes
#[derive(Debug, Clone, Copy)]
pub struct SizePairFilter {
    min_size: usize,
}

impl SizePairFilter {
    /// A fractional minimum is rounded up; the result must be at least 2
    pub fn new(min_size: f64) -> Result<Self> {
        let rounded = min_size.ceil();
        if !rounded.is_finite() || rounded <= 1.0 {
            bail!("Minimum group size must be greater than 1, got {min_size}");
        }
        Ok(SizePairFilter {
            min_size: rounded as usize,
        })
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }
}

impl PairFilter for SizePairFilter {
    fn is_significant(&self, _pair: &ClassPair, aggregate: &PairAggregate) -> bool {
        aggregate.size() >= self.min_size
    }
}

/// Keeps pairs whose weighted genome count reaches `min_weight`
#[derive(Debug, Clone, Copy)]
pub struct WeightPairFilter {
    min_weight: f64,
}

impl WeightPairFilter {
    pub fn new(min_weight: f64) -> Result<Self> {
        if !min_weight.is_finite() || min_weight < 0.0 {
            bail!("Minimum group weight must be a non-negative number, got {min_weight}");
        }
        Ok(WeightPairFilter { min_weight })
    }
}

impl PairFilter for WeightPairFilter {
    fn is_significant(&self, _pair: &ClassPair, aggregate: &PairAggregate) -> bool {
        aggregate.weight() >= self.min_weight
    }
}

/// Keeps pairs with at least one class in an allowed set
#[derive(Debug, Clone)]
pub struct WhitelistPairFilter {
    allowed: HashSet<String>,
}

impl WhitelistPairFilter {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let allowed = read_class_set(path)?;
        log::info!("{} whitelisted classes from {}", allowed.len(), path.display());
        Ok(WhitelistPairFilter { allowed })
    }

    pub fn from_set(allowed: HashSet<String>) -> Self {
        WhitelistPairFilter { allowed }
    }
}

impl PairFilter for WhitelistPairFilter {
    fn is_significant(&self, pair: &ClassPair, _aggregate: &PairAggregate) -> bool {
        self.allowed.contains(pair.class1()) || self.allowed.contains(pair.class2())
    }
}

/// Build the pair filter for a type. `min_value` is the group size or weight threshold.
pub fn create_pair_filter(
    filter: PairFilterType,
    min_value: f64,
    whitelist: Option<&Path>,
) -> Result<Box<dyn PairFilter>> {
    Ok(match filter {
        PairFilterType::Size => Box::new(SizePairFilter::new(min_value)?),
        PairFilterType::Weight => Box::new(WeightPairFilter::new(min_value)?),
        PairFilterType::Whitelist => match whitelist {
            Some(path) => Box::new(WhitelistPairFilter::load(path)?),
            None => bail!("Whitelist pair filter requires a whitelist file"),
        },
    })
}
