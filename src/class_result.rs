//! Per-feature classification results for one genome

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use crate::genome::Location;

/// Classes assigned to one feature, with the feature's location
///
/// Identity is the feature ID alone; location and classes do not take part in equality.
#[derive(Debug, Clone)]
pub struct ClassResult {
    pub feature_id: String,
    pub location: Location,
    classes: BTreeSet<String>,
}

impl ClassResult {
    pub fn new(feature_id: &str, location: Location) -> Self {
        ClassResult {
            feature_id: feature_id.to_string(),
            location,
            classes: BTreeSet::new(),
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn add_class(&mut self, class_id: &str) {
        self.classes.insert(class_id.to_string());
    }

    pub fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }

    pub fn has_class(&self, class_id: &str) -> bool {
        self.classes.contains(class_id)
    }

    /// Remove a class, returning true if it was present
    pub fn remove_class(&mut self, class_id: &str) -> bool {
        self.classes.remove(class_id)
    }

    /// Keep only the classes for which `keep` returns true; returns the number removed
    pub fn retain_classes<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&String) -> bool,
    {
        let before = self.classes.len();
        self.classes.retain(keep);
        before - self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Sort order: contig, strand, begin, then feature ID
    pub fn location_cmp(&self, other: &ClassResult) -> Ordering {
        self.location
            .contig
            .cmp(&other.location.contig)
            .then_with(|| self.location.strand.cmp(&other.location.strand))
            .then_with(|| self.location.begin.cmp(&other.location.begin))
            .then_with(|| self.feature_id.cmp(&other.feature_id))
    }

    /// Gap to another result; `None` across contigs or strands
    pub fn distance(&self, other: &ClassResult) -> Option<u64> {
        self.location.distance(&other.location)
    }
}

impl PartialEq for ClassResult {
    fn eq(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id
    }
}

impl Eq for ClassResult {}

impl Hash for ClassResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.feature_id.hash(state);
    }
}

/// All classification results of one genome, sorted by location, plus the
/// in-genome class occurrence counts that drive pair weights.
#[derive(Debug, Clone)]
pub struct GenomeResults {
    pub genome_id: String,
    results: Vec<ClassResult>,
    counts: HashMap<String, usize>,
}

impl GenomeResults {
    /// Sort the results and count, for each class, how many features carry it
    pub fn new(genome_id: &str, mut results: Vec<ClassResult>) -> Self {
        results.sort_by(|a, b| a.location_cmp(b));
        let counts = count_classes(&results);
        GenomeResults {
            genome_id: genome_id.to_string(),
            results,
            counts,
        }
    }

    pub fn results(&self) -> &[ClassResult] {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut [ClassResult] {
        &mut self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of features in the genome carrying `class_id` at classification time
    pub fn count(&self, class_id: &str) -> usize {
        self.counts.get(class_id).copied().unwrap_or(0)
    }

    /// Weight of a class in this genome: 1 / (features carrying it)
    pub fn weight(&self, class_id: &str) -> f64 {
        match self.count(class_id) {
            0 => 0.0,
            n => 1.0 / n as f64,
        }
    }

    /// Number of results with at least one class
    pub fn classified(&self) -> usize {
        self.results.iter().filter(|r| !r.is_empty()).count()
    }
}

/// Count class occurrences over a list of results
pub fn count_classes(results: &[ClassResult]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for result in results {
        for class_id in result.classes() {
            *counts.entry(class_id.clone()).or_default() += 1;
        }
    }
    counts
}
