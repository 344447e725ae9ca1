//! Run configuration and the factories that turn it into strategy objects

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::class_filter::{create_class_filter, ClassFilter, ClassFilterType};
use crate::classifier::{
    Classifier, ClassifierType, FamilyClassifier, FileClassifier, RandomClassifier,
    RoleClassifier,
};
use crate::names::{NameResolver, NameTable, NoNames};
use crate::neighbors::{create_finder, FinderType, NeighborFinder};
use crate::pair_filter::{create_pair_filter, PairFilter, PairFilterType};
use crate::report::ReportFormat;

/// Default marker function for the seed-protein genome check
pub const DEFAULT_SEED_FUNCTION: &str = "Phenylalanyl-tRNA synthetase alpha chain";

/// Coupling run configuration
#[derive(Debug, Clone)]
pub struct CouplingConfig {
    pub classifier: ClassifierType,
    pub finder: FinderType,
    pub max_gap: u64, // --gap

    // Class filter (applied to each genome before pairing)
    pub class_filter: ClassFilterType,
    pub blacklist: Option<PathBuf>,
    pub max_class_count: usize, // --max-count, for the limited filter

    // Pair filter (applied to the aggregated pairs)
    pub pair_filter: PairFilterType,
    pub min_value: f64, // --min: group size or weight threshold
    pub whitelist: Option<PathBuf>,

    pub class_table: Option<PathBuf>, // md5 -> class table for the file classifier
    pub names_file: Option<PathBuf>,
    pub seed: u64, // RNG seed for the random classifier
    pub seed_function: Option<String>,
    pub batch_size: usize, // genomes scanned in parallel per batch
    pub format: ReportFormat,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        CouplingConfig {
            classifier: ClassifierType::Families,
            finder: FinderType::Close,
            max_gap: 5000,
            class_filter: ClassFilterType::None,
            blacklist: None,
            max_class_count: 10,
            pair_filter: PairFilterType::Size,
            min_value: 2.0,
            whitelist: None,
            class_table: None,
            names_file: None,
            seed: 0,
            seed_function: None,
            batch_size: 64,
            format: ReportFormat::Verbose,
        }
    }
}

impl CouplingConfig {
    /// Check the settings that can be checked without building anything
    pub fn validate(&self) -> Result<()> {
        if self.max_gap < 1 {
            bail!("Gap distance must be at least 1");
        }
        if self.batch_size < 1 {
            bail!("Batch size must be at least 1");
        }
        if self.class_filter == ClassFilterType::Limited && self.max_class_count < 1 {
            bail!("Class count limit must be at least 1");
        }
        if self.class_filter == ClassFilterType::Blacklist {
            check_file("blacklist", &self.blacklist)?;
        }
        if self.pair_filter == PairFilterType::Whitelist {
            check_file("whitelist", &self.whitelist)?;
        }
        if self.classifier == ClassifierType::File {
            check_file("class table", &self.class_table)?;
        }
        if let Some(path) = &self.names_file {
            if !path.is_file() {
                bail!("Names file {} not found", path.display());
            }
        }
        Ok(())
    }

    fn name_resolver(&self) -> Result<Box<dyn NameResolver>> {
        Ok(match &self.names_file {
            Some(path) => Box::new(NameTable::load(path)?),
            None => Box::new(NoNames),
        })
    }

    pub fn build_classifier(&self) -> Result<Box<dyn Classifier>> {
        Ok(match self.classifier {
            ClassifierType::Families => Box::new(FamilyClassifier::new(self.name_resolver()?)),
            ClassifierType::Roles => Box::new(RoleClassifier::new()),
            ClassifierType::File => match &self.class_table {
                Some(path) => Box::new(FileClassifier::load(path)?),
                None => bail!("File classifier requires a class table"),
            },
            ClassifierType::Random => {
                Box::new(RandomClassifier::new(self.name_resolver()?, self.seed))
            }
        })
    }

    pub fn build_finder(&self) -> Result<Box<dyn NeighborFinder>> {
        create_finder(self.finder, self.max_gap)
    }

    pub fn build_class_filter(&self) -> Result<Box<dyn ClassFilter>> {
        create_class_filter(
            self.class_filter,
            self.blacklist.as_deref(),
            self.max_class_count,
        )
    }

    pub fn build_pair_filter(&self) -> Result<Box<dyn PairFilter>> {
        create_pair_filter(self.pair_filter, self.min_value, self.whitelist.as_deref())
    }
}

fn check_file(what: &str, path: &Option<PathBuf>) -> Result<()> {
    match path {
        None => bail!("A {what} file is required"),
        Some(p) if !p.is_file() => bail!("The {what} file {} was not found", p.display()),
        Some(_) => Ok(()),
    }
}
