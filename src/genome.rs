//! Genome and feature model consumed by the coupling engine
//!
//! A genome is a flat list of features with an ID index. Everything the
//! classifiers and the aggregator need (location, annotation, family,
//! subsystem membership) lives on `Feature`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use anyhow::{bail, Result};

/// Strand of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            other => bail!("Invalid strand '{other}', expected '+' or '-'"),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

/// Location of a feature on a contig (1-based, inclusive, `begin <= end`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub contig: String,
    pub strand: Strand,
    pub begin: u64,
    pub end: u64,
}

impl Location {
    /// Coordinates may be given in either order; they are stored left to right.
    pub fn new(contig: &str, strand: Strand, begin: u64, end: u64) -> Self {
        Location {
            contig: contig.to_string(),
            strand,
            begin: begin.min(end),
            end: begin.max(end),
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.begin + 1
    }

    /// Gap between two locations, `None` if they are on different contigs or strands.
    ///
    /// Overlapping locations have distance 0.
    pub fn distance(&self, other: &Location) -> Option<u64> {
        if self.contig != other.contig || self.strand != other.strand {
            return None;
        }
        let gap = if self.end < other.begin {
            other.begin - self.end
        } else if other.end < self.begin {
            self.begin - other.end
        } else {
            0
        };
        Some(gap)
    }
}

/// One annotated feature (usually a protein-coding gene)
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: String,
    pub location: Location,
    pub function: String,
    pub family: Option<String>,
    pub subsystems: BTreeSet<String>,
    pub protein_md5: Option<String>,
}

impl Feature {
    pub fn new(id: &str, location: Location, function: &str) -> Self {
        Feature {
            id: id.to_string(),
            location,
            function: function.to_string(),
            family: None,
            subsystems: BTreeSet::new(),
            protein_md5: None,
        }
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn with_subsystems<I, S>(mut self, subsystems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subsystems = subsystems.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_protein_md5(mut self, md5: &str) -> Self {
        self.protein_md5 = Some(md5.to_string());
        self
    }

    /// True if both features share at least one subsystem
    pub fn shares_subsystem(&self, other: &Feature) -> bool {
        self.subsystems
            .iter()
            .any(|ss| other.subsystems.contains(ss))
    }
}

/// An annotated genome with a feature-ID index
#[derive(Debug, Clone)]
pub struct Genome {
    pub id: String,
    pub name: String,
    features: Vec<Feature>,
    by_id: HashMap<String, usize>,
}

impl Genome {
    pub fn new(id: &str, name: &str, features: Vec<Feature>) -> Self {
        let by_id = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.clone(), i))
            .collect();
        Genome {
            id: id.to_string(),
            name: name.to_string(),
            features,
            by_id,
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.by_id.get(id).map(|&i| &self.features[i])
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// True if any feature's function contains `text`
    pub fn has_function(&self, text: &str) -> bool {
        self.features.iter().any(|f| f.function.contains(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_strand() {
        let a = Location::new("c1", Strand::Plus, 100, 200);
        let b = Location::new("c1", Strand::Plus, 300, 400);
        assert_eq!(a.distance(&b), Some(100));
        assert_eq!(b.distance(&a), Some(100));
    }

    #[test]
    fn test_distance_overlap_is_zero() {
        let a = Location::new("c1", Strand::Minus, 400, 100);
        let b = Location::new("c1", Strand::Minus, 350, 300);
        assert_eq!(a.distance(&b), Some(0));
        assert_eq!(a.begin, 100);
        assert_eq!(a.len(), 301);
    }

    #[test]
    fn test_distance_undefined_across_strand_and_contig() {
        let a = Location::new("c1", Strand::Plus, 100, 200);
        let b = Location::new("c1", Strand::Minus, 210, 300);
        let c = Location::new("c2", Strand::Plus, 210, 300);
        assert_eq!(a.distance(&b), None);
        assert_eq!(a.distance(&c), None);
    }

    #[test]
    fn test_feature_lookup_and_subsystems() {
        let f1 = Feature::new("fig|1.1.peg.1", Location::new("c", Strand::Plus, 1, 90), "Alpha")
            .with_subsystems(["Glycolysis", "TCA"]);
        let f2 = Feature::new("fig|1.1.peg.2", Location::new("c", Strand::Plus, 95, 200), "Beta")
            .with_subsystems(["TCA"]);
        let f3 = Feature::new("fig|1.1.peg.3", Location::new("c", Strand::Plus, 300, 400), "Gamma");
        assert!(f1.shares_subsystem(&f2));
        assert!(!f1.shares_subsystem(&f3));

        let genome = Genome::new("1.1", "Test genome", vec![f1, f2, f3]);
        assert_eq!(genome.len(), 3);
        assert_eq!(genome.feature("fig|1.1.peg.2").map(|f| f.function.as_str()), Some("Beta"));
        assert!(genome.feature("fig|1.1.peg.9").is_none());
        assert!(genome.has_function("Gam"));
        assert!(!genome.has_function("Delta"));
    }

    #[test]
    fn test_strand_parse() {
        assert_eq!(Strand::parse("+").unwrap(), Strand::Plus);
        assert_eq!(Strand::parse("-").unwrap(), Strand::Minus);
        assert!(Strand::parse("x").is_err());
    }
}
