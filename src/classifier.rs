//! Feature classifiers: turn each feature of a genome into a set of class IDs
//!
//! Four strategies share the `Classifier` trait:
//! - `FamilyClassifier`: the feature's precomputed protein family
//! - `RoleClassifier`: functional roles parsed from the annotation text
//! - `FileClassifier`: an external protein-MD5 to class table
//! - `RandomClassifier`: the genome's own families, shuffled (null-model baseline)

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::class_result::{ClassResult, GenomeResults};
use crate::genome::{Feature, Genome};
use crate::genome_io::open_input;
use crate::names::{NameCache, NameResolver};
use crate::pair::ClassPair;
use crate::roles::{parse_roles, RoleMap};

/// Classification strategy selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClassifierType {
    Families,
    Roles,
    File,
    Random,
}

/// Common capability of every classifier: classify features and name classes
pub trait Classifier: Send {
    /// Class IDs of a single feature; empty if the feature is not classifiable
    fn classify_feature(&mut self, feature: &Feature) -> ClassResult;

    /// Classify every feature of a genome, sorted by location, with class counts attached
    fn classify_genome(&mut self, genome: &Genome) -> GenomeResults {
        let results = genome
            .features()
            .iter()
            .map(|f| self.classify_feature(f))
            .collect();
        GenomeResults::new(&genome.id, results)
    }

    /// Human-readable name of a class, "" if unknown
    fn name(&self, class_id: &str) -> String;

    /// Resolve names for a batch of classes ahead of reporting
    fn prepare_names(&mut self, _class_ids: &[&str]) {}

    /// Label for one class column in report headings, e.g. "family"
    fn label(&self) -> &'static str;

    /// True if reports carry a name column after each class ID
    fn has_names(&self) -> bool {
        true
    }

    /// Heading for the two pair columns of a report
    fn heading(&self) -> String {
        let label = self.label();
        if self.has_names() {
            format!("{label}1\tname1\t{label}2\tname2")
        } else {
            format!("{label}1\t{label}2")
        }
    }

    /// Format the two pair columns of a report line
    fn format_pair(&self, pair: &ClassPair) -> String {
        if self.has_names() {
            format!(
                "{}\t{}\t{}\t{}",
                pair.class1(),
                self.name(pair.class1()),
                pair.class2(),
                self.name(pair.class2())
            )
        } else {
            pair.to_string()
        }
    }

    /// Parse a pair back out of a report line written by this classifier
    fn read_pair(&self, line: &str) -> Option<ClassPair> {
        if self.has_names() {
            ClassPair::from_columns(line, 0, 2)
        } else {
            ClassPair::from_columns(line, 0, 1)
        }
    }
}

/// Classify by precomputed protein family
pub struct FamilyClassifier {
    names: NameCache,
}

impl FamilyClassifier {
    pub fn new(resolver: Box<dyn NameResolver>) -> Self {
        FamilyClassifier {
            names: NameCache::new(resolver),
        }
    }
}

impl Classifier for FamilyClassifier {
    fn classify_feature(&mut self, feature: &Feature) -> ClassResult {
        let result = ClassResult::new(&feature.id, feature.location.clone());
        match &feature.family {
            Some(family) => result.with_classes([family.as_str()]),
            None => result,
        }
    }

    fn name(&self, class_id: &str) -> String {
        self.names.get(class_id).to_string()
    }

    fn prepare_names(&mut self, class_ids: &[&str]) {
        self.names.prefetch(class_ids.iter().copied());
    }

    fn label(&self) -> &'static str {
        "family"
    }
}

/// Classify by functional roles parsed from the annotation
#[derive(Default)]
pub struct RoleClassifier {
    roles: RoleMap,
}

impl RoleClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }
}

impl Classifier for RoleClassifier {
    fn classify_feature(&mut self, feature: &Feature) -> ClassResult {
        let mut result = ClassResult::new(&feature.id, feature.location.clone());
        for role in parse_roles(&feature.function) {
            let id = self.roles.get_or_assign(&role);
            result.add_class(&id);
        }
        result
    }

    fn name(&self, class_id: &str) -> String {
        self.roles.name(class_id).unwrap_or("").to_string()
    }

    fn label(&self) -> &'static str {
        "role"
    }
}

/// Classify by looking up each protein's MD5 in an external table
///
/// Table format: `md5<TAB>class_id[<TAB>class_name]`.
pub struct FileClassifier {
    classes: HashMap<String, String>,
    names: HashMap<String, String>,
}

impl FileClassifier {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_input(path)?;
        let mut classes = HashMap::new();
        let mut names = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 || fields[1].is_empty() {
                bail!(
                    "{}: line {}: expected 'md5<TAB>class' columns",
                    path.display(),
                    line_no + 1
                );
            }
            classes.insert(fields[0].to_string(), fields[1].to_string());
            if let Some(name) = fields.get(2).filter(|n| !n.is_empty()) {
                names.insert(fields[1].to_string(), name.to_string());
            }
        }
        log::info!(
            "Loaded {} protein classes from {}",
            classes.len(),
            path.display()
        );
        Ok(FileClassifier { classes, names })
    }

    pub fn from_table(classes: HashMap<String, String>) -> Self {
        FileClassifier {
            classes,
            names: HashMap::new(),
        }
    }
}

impl Classifier for FileClassifier {
    fn classify_feature(&mut self, feature: &Feature) -> ClassResult {
        let result = ClassResult::new(&feature.id, feature.location.clone());
        match feature
            .protein_md5
            .as_ref()
            .and_then(|md5| self.classes.get(md5))
        {
            Some(class_id) => result.with_classes([class_id.as_str()]),
            None => result,
        }
    }

    fn name(&self, class_id: &str) -> String {
        self.names.get(class_id).cloned().unwrap_or_default()
    }

    fn label(&self) -> &'static str {
        "class"
    }

    fn has_names(&self) -> bool {
        false
    }
}

/// Baseline classifier: each family-bearing feature gets a family drawn
/// without replacement from the shuffled families of its own genome.
pub struct RandomClassifier {
    families: FamilyClassifier,
    rng: StdRng,
}

impl RandomClassifier {
    pub fn new(resolver: Box<dyn NameResolver>, seed: u64) -> Self {
        RandomClassifier {
            families: FamilyClassifier::new(resolver),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Classifier for RandomClassifier {
    fn classify_feature(&mut self, feature: &Feature) -> ClassResult {
        self.families.classify_feature(feature)
    }

    fn classify_genome(&mut self, genome: &Genome) -> GenomeResults {
        let mut pool: Vec<&str> = genome
            .features()
            .iter()
            .filter_map(|f| f.family.as_deref())
            .collect();
        pool.shuffle(&mut self.rng);

        let mut draws = pool.into_iter();
        let results = genome
            .features()
            .iter()
            .map(|f| {
                let result = ClassResult::new(&f.id, f.location.clone());
                if f.family.is_none() {
                    return result;
                }
                match draws.next() {
                    Some(family) => result.with_classes([family]),
                    None => result,
                }
            })
            .collect();
        GenomeResults::new(&genome.id, results)
    }

    fn name(&self, class_id: &str) -> String {
        self.families.name(class_id)
    }

    fn prepare_names(&mut self, class_ids: &[&str]) {
        self.families.prepare_names(class_ids);
    }

    fn label(&self) -> &'static str {
        "family"
    }
}
