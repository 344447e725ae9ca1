//! Coupling aggregation across a genome corpus
//!
//! Every class of a feature is paired with every class of each of its
//! neighbors. A pair counts each genome once: the weight and subsystem
//! statistics of a genome come from the first feature pair that produced the
//! class pair in that genome's scan, later occurrences in the same genome are
//! ignored.

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;

use crate::class_result::GenomeResults;
use crate::genome::Genome;
use crate::neighbors::NeighborFinder;
use crate::pair::ClassPair;

/// One genome's first contribution to a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub weight: f64,
    /// `None` if neither feature is in a subsystem, else whether they share one
    pub same_subsystem: Option<bool>,
}

impl Contribution {
    /// Look up both features and compare their subsystems
    pub fn new(genome: &Genome, weight: f64, fid1: &str, fid2: &str) -> Result<Self> {
        let f1 = genome.feature(fid1).ok_or_else(|| missing_feature(genome, fid1))?;
        let f2 = genome.feature(fid2).ok_or_else(|| missing_feature(genome, fid2))?;
        let same_subsystem = if f1.subsystems.is_empty() && f2.subsystems.is_empty() {
            None
        } else {
            Some(f1.shares_subsystem(f2))
        };
        Ok(Contribution {
            weight,
            same_subsystem,
        })
    }
}

fn missing_feature(genome: &Genome, fid: &str) -> anyhow::Error {
    anyhow!(
        "Feature {} is not in genome {}; classification and genome are out of sync",
        fid,
        genome.id
    )
}

/// Corpus-wide statistics for one class pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairAggregate {
    genomes: BTreeSet<String>,
    weight: f64,
    ss_match: u32,
    ss_mismatch: u32,
}

impl PairAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a genome's contribution. Only the first contribution of a genome
    /// counts; returns false if the genome was already recorded.
    pub fn add_contribution(&mut self, genome_id: &str, contribution: Contribution) -> bool {
        if self.genomes.contains(genome_id) {
            return false;
        }
        self.genomes.insert(genome_id.to_string());
        self.weight += contribution.weight;
        match contribution.same_subsystem {
            Some(true) => self.ss_match += 1,
            Some(false) => self.ss_mismatch += 1,
            None => {}
        }
        true
    }

    /// Record the pairing of features `fid1` and `fid2` in `genome` with the given weight
    pub fn add_genome(&mut self, genome: &Genome, weight: f64, fid1: &str, fid2: &str) -> Result<bool> {
        if self.genomes.contains(&genome.id) {
            return Ok(false);
        }
        let contribution = Contribution::new(genome, weight, fid1, fid2)?;
        Ok(self.add_contribution(&genome.id, contribution))
    }

    /// Number of genomes containing the pair
    pub fn size(&self) -> usize {
        self.genomes.len()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn genomes(&self) -> &BTreeSet<String> {
        &self.genomes
    }

    pub fn ss_match(&self) -> u32 {
        self.ss_match
    }

    pub fn ss_mismatch(&self) -> u32 {
        self.ss_mismatch
    }
}

/// Invoke `visit(class1, class2, weight, fid1, fid2)` for every neighboring class pairing of a genome
fn for_each_pairing<F>(results: &GenomeResults, finder: &dyn NeighborFinder, mut visit: F) -> Result<()>
where
    F: FnMut(ClassPair, f64, &str, &str) -> Result<()>,
{
    let list = results.results();
    for (i, result) in list.iter().enumerate() {
        if result.is_empty() {
            continue;
        }
        let neighbors = finder.neighbors(list, i);
        for c1 in result.classes() {
            let w1 = results.weight(c1);
            for neighbor in neighbors {
                for c2 in neighbor.classes() {
                    if c1 == c2 {
                        continue;
                    }
                    let weight = w1 * results.weight(c2);
                    visit(
                        ClassPair::new(c1, c2),
                        weight,
                        result.feature_id.as_str(),
                        neighbor.feature_id.as_str(),
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// The pairs one genome contributes, with their first-occurrence statistics
#[derive(Debug, Clone)]
pub struct GenomeCouplings {
    pub genome_id: String,
    pairs: IndexMap<ClassPair, Contribution>,
}

impl GenomeCouplings {
    /// Scan one genome; independent of every other genome
    pub fn scan(genome: &Genome, results: &GenomeResults, finder: &dyn NeighborFinder) -> Result<Self> {
        let mut pairs: IndexMap<ClassPair, Contribution> = IndexMap::new();
        for_each_pairing(results, finder, |pair, weight, fid1, fid2| {
            if !pairs.contains_key(&pair) {
                let contribution = Contribution::new(genome, weight, fid1, fid2)?;
                pairs.insert(pair, contribution);
            }
            Ok(())
        })?;
        Ok(GenomeCouplings {
            genome_id: genome.id.clone(),
            pairs,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, pair: &ClassPair) -> Option<&Contribution> {
        self.pairs.get(pair)
    }
}

/// Global class-pair map for one corpus run
#[derive(Debug, Clone, Default)]
pub struct CouplingMap {
    pairs: IndexMap<ClassPair, PairAggregate>,
    genomes: usize,
}

impl CouplingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up the neighboring classes of one genome directly into the map
    pub fn add_genome_results(
        &mut self,
        genome: &Genome,
        results: &GenomeResults,
        finder: &dyn NeighborFinder,
    ) -> Result<()> {
        let pairs = &mut self.pairs;
        for_each_pairing(results, finder, |pair, weight, fid1, fid2| {
            pairs
                .entry(pair)
                .or_default()
                .add_genome(genome, weight, fid1, fid2)?;
            Ok(())
        })?;
        self.genomes += 1;
        Ok(())
    }

    /// Fold in a genome scanned by `GenomeCouplings::scan`
    pub fn merge_genome(&mut self, couplings: GenomeCouplings) {
        for (pair, contribution) in couplings.pairs {
            self.pairs
                .entry(pair)
                .or_default()
                .add_contribution(&couplings.genome_id, contribution);
        }
        self.genomes += 1;
    }

    /// Number of genomes folded into the map
    pub fn genome_count(&self) -> usize {
        self.genomes
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, pair: &ClassPair) -> Option<&PairAggregate> {
        self.pairs.get(pair)
    }

    /// Pairs in first-encounter order
    pub fn iter(&self) -> impl Iterator<Item = (&ClassPair, &PairAggregate)> {
        self.pairs.iter()
    }

    /// Pairs by descending genome count, then descending weight, then class IDs
    pub fn sorted_pairs(&self) -> Vec<(&ClassPair, &PairAggregate)> {
        let mut sorted: Vec<_> = self.pairs.iter().collect();
        sorted.sort_by(|(p1, a1), (p2, a2)| {
            a2.size()
                .cmp(&a1.size())
                .then_with(|| OrderedFloat(a2.weight()).cmp(&OrderedFloat(a1.weight())))
                .then_with(|| p1.cmp(p2))
        });
        sorted
    }

    /// All distinct class IDs appearing in any pair
    pub fn class_ids(&self) -> BTreeSet<&str> {
        self.pairs
            .keys()
            .flat_map(|p| [p.class1(), p.class2()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_result::ClassResult;
    use crate::genome::{Feature, Location, Strand};
    use crate::neighbors::{AdjacentFinder, CloseFinder};

    fn feature(id: &str, begin: u64, family: &str, subsystems: &[&str]) -> Feature {
        Feature::new(id, Location::new("c1", Strand::Plus, begin, begin + 99), "")
            .with_family(family)
            .with_subsystems(subsystems.iter().copied())
    }

    fn classify(genome: &Genome) -> GenomeResults {
        let results = genome
            .features()
            .iter()
            .map(|f| {
                ClassResult::new(&f.id, f.location.clone())
                    .with_classes(f.family.iter().flat_map(|fam| fam.split(',')))
            })
            .collect();
        GenomeResults::new(&genome.id, results)
    }

    #[test]
    fn test_first_contribution_only() {
        // A B ... A B: the pair (A,B) occurs twice in the same genome
        let genome = Genome::new(
            "g1",
            "",
            vec![
                feature("p1", 100, "A", &["S1"]),
                feature("p2", 250, "B", &["S1"]),
                feature("p3", 10_000, "A", &[]),
                feature("p4", 10_150, "B", &["S2"]),
            ],
        );
        let results = classify(&genome);
        let finder = CloseFinder::new(100).unwrap();

        let mut map = CouplingMap::new();
        map.add_genome_results(&genome, &results, &finder).unwrap();

        let agg = map.get(&ClassPair::new("B", "A")).unwrap();
        assert_eq!(agg.size(), 1);
        // each class occurs twice, so the weight is 1/2 * 1/2
        assert!((agg.weight() - 0.25).abs() < 1e-12);
        // only the first pairing (same subsystem) is counted
        assert_eq!(agg.ss_match(), 1);
        assert_eq!(agg.ss_mismatch(), 0);
    }

    #[test]
    fn test_self_pairs_skipped() {
        let genome = Genome::new(
            "g1",
            "",
            vec![feature("p1", 100, "A", &[]), feature("p2", 250, "A", &[])],
        );
        let results = classify(&genome);
        let mut map = CouplingMap::new();
        map.add_genome_results(&genome, &results, &CloseFinder::new(500).unwrap())
            .unwrap();
        assert!(map.is_empty());
        assert_eq!(map.genome_count(), 1);
    }

    #[test]
    fn test_multi_class_features() {
        let genome = Genome::new(
            "g1",
            "",
            vec![feature("p1", 100, "A,B", &[]), feature("p2", 250, "C", &[])],
        );
        let results = classify(&genome);
        let mut map = CouplingMap::new();
        map.add_genome_results(&genome, &results, &AdjacentFinder::new(500).unwrap())
            .unwrap();
        // classes of the same feature are not paired with each other
        assert_eq!(map.len(), 2);
        assert!(map.get(&ClassPair::new("A", "C")).is_some());
        assert!(map.get(&ClassPair::new("B", "C")).is_some());
        assert!(map.get(&ClassPair::new("A", "B")).is_none());
    }

    #[test]
    fn test_subsystem_counters() {
        let g1 = Genome::new(
            "g1",
            "",
            vec![feature("p1", 100, "A", &["S1"]), feature("p2", 250, "B", &["S2"])],
        );
        let g2 = Genome::new(
            "g2",
            "",
            vec![feature("p1", 100, "A", &["S1", "S3"]), feature("p2", 250, "B", &["S3"])],
        );
        let g3 = Genome::new(
            "g3",
            "",
            vec![feature("p1", 100, "A", &[]), feature("p2", 250, "B", &[])],
        );
        let finder = CloseFinder::new(500).unwrap();
        let mut map = CouplingMap::new();
        for genome in [&g1, &g2, &g3] {
            map.add_genome_results(genome, &classify(genome), &finder).unwrap();
        }
        let agg = map.get(&ClassPair::new("A", "B")).unwrap();
        assert_eq!(agg.size(), 3);
        assert_eq!(agg.ss_match(), 1);
        assert_eq!(agg.ss_mismatch(), 1);
        assert!((agg.weight() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_feature_is_fatal() {
        let genome = Genome::new(
            "g1",
            "",
            vec![feature("p1", 100, "A", &[]), feature("p2", 250, "B", &[])],
        );
        let mut results = classify(&genome);
        results.results_mut()[1].feature_id = "ghost".to_string();
        let mut map = CouplingMap::new();
        let err = map
            .add_genome_results(&genome, &results, &CloseFinder::new(500).unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_scan_and_merge_matches_direct() {
        let g1 = Genome::new(
            "g1",
            "",
            vec![
                feature("p1", 100, "A", &["S1"]),
                feature("p2", 250, "B", &["S1"]),
                feature("p3", 400, "C", &[]),
                feature("p4", 550, "A", &["S2"]),
            ],
        );
        let g2 = Genome::new(
            "g2",
            "",
            vec![feature("p1", 100, "C", &[]), feature("p2", 250, "A", &["S9"])],
        );
        let finder = CloseFinder::new(400).unwrap();

        let mut direct = CouplingMap::new();
        let mut merged = CouplingMap::new();
        for genome in [&g1, &g2] {
            let results = classify(genome);
            direct.add_genome_results(genome, &results, &finder).unwrap();
            merged.merge_genome(GenomeCouplings::scan(genome, &results, &finder).unwrap());
        }

        assert_eq!(direct.len(), merged.len());
        for ((p1, a1), (p2, a2)) in direct.iter().zip(merged.iter()) {
            assert_eq!(p1, p2);
            assert_eq!(a1, a2);
        }
    }

    #[test]
    fn test_sorted_pairs() {
        let mut map = CouplingMap::new();
        let c = |w| Contribution {
            weight: w,
            same_subsystem: None,
        };
        let mut g1 = GenomeCouplings {
            genome_id: "g1".to_string(),
            pairs: IndexMap::new(),
        };
        g1.pairs.insert(ClassPair::new("X", "Y"), c(0.5));
        g1.pairs.insert(ClassPair::new("A", "B"), c(1.0));
        g1.pairs.insert(ClassPair::new("C", "D"), c(0.5));
        let mut g2 = GenomeCouplings {
            genome_id: "g2".to_string(),
            pairs: IndexMap::new(),
        };
        g2.pairs.insert(ClassPair::new("X", "Y"), c(0.25));
        map.merge_genome(g1);
        map.merge_genome(g2);

        let order: Vec<String> = map
            .sorted_pairs()
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(order, vec!["X\tY", "A\tB", "C\tD"]);
        assert_eq!(map.class_ids().len(), 6);
    }
}
