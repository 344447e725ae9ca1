//! Coupling engine: drives classification, class filtering, neighbor scanning
//! and aggregation over a genome corpus, then filters and reports the pairs.

use anyhow::Result;
use rayon::prelude::*;
use std::io::Write;

use crate::class_filter::ClassFilter;
use crate::class_result::GenomeResults;
use crate::classifier::Classifier;
use crate::config::CouplingConfig;
use crate::coupling::{CouplingMap, GenomeCouplings};
use crate::genome::Genome;
use crate::neighbors::NeighborFinder;
use crate::pair_filter::PairFilter;
use crate::report::{CouplingReporter, ReportFormat, TabReporter};

/// Counters surfaced in progress logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub genomes: usize,
    pub skipped: usize,
    pub features: usize,
    pub classified: usize,
    pub classes_removed: usize,
    pub pairs_total: usize,
    pub pairs_kept: usize,
    pub pairs_rejected: usize,
}

pub struct CouplingEngine {
    classifier: Box<dyn Classifier>,
    finder: Box<dyn NeighborFinder>,
    class_filter: Box<dyn ClassFilter>,
    seed_function: Option<String>,
    map: CouplingMap,
    genomes: Vec<(String, String)>,
    stats: RunStats,
}

impl CouplingEngine {
    pub fn new(
        classifier: Box<dyn Classifier>,
        finder: Box<dyn NeighborFinder>,
        class_filter: Box<dyn ClassFilter>,
    ) -> Self {
        CouplingEngine {
            classifier,
            finder,
            class_filter,
            seed_function: None,
            map: CouplingMap::new(),
            genomes: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Validate the configuration and build every strategy it names
    pub fn from_config(config: &CouplingConfig) -> Result<Self> {
        config.validate()?;
        let engine = CouplingEngine::new(
            config.build_classifier()?,
            config.build_finder()?,
            config.build_class_filter()?,
        );
        Ok(engine.with_seed_function(config.seed_function.clone()))
    }

    /// Skip genomes with no feature whose function contains `seed_function`
    pub fn with_seed_function(mut self, seed_function: Option<String>) -> Self {
        self.seed_function = seed_function;
        self
    }

    fn accept(&mut self, genome: &Genome) -> bool {
        if let Some(seed) = &self.seed_function {
            if !genome.has_function(seed) {
                log::warn!("Skipping genome {}: no {} found", genome.id, seed);
                self.stats.skipped += 1;
                return false;
            }
        }
        true
    }

    fn classify(&mut self, genome: &Genome) -> GenomeResults {
        let results = self.classifier.classify_genome(genome);
        self.stats.features += results.len();
        self.stats.classified += results.classified();
        self.genomes.push((genome.id.clone(), genome.name.clone()));
        self.stats.genomes += 1;
        results
    }

    /// Process one genome directly against the coupling map. Returns false if the genome was skipped.
    pub fn process_genome(&mut self, genome: &Genome) -> Result<bool> {
        if !self.accept(genome) {
            return Ok(false);
        }
        let mut results = self.classify(genome);
        self.stats.classes_removed += self.class_filter.apply(&mut results);
        self.map
            .add_genome_results(genome, &results, self.finder.as_ref())?;
        log::debug!(
            "Genome {}: {} features, {} pairs in map",
            genome.id,
            results.len(),
            self.map.len()
        );
        Ok(true)
    }

    /// Process a batch of genomes: classification runs in order, filtering and
    /// neighbor scans run in parallel, and the scans are merged in batch order.
    pub fn process_batch(&mut self, genomes: &[Genome]) -> Result<usize> {
        let mut accepted = Vec::with_capacity(genomes.len());
        let mut classified = Vec::with_capacity(genomes.len());
        for genome in genomes {
            if self.accept(genome) {
                classified.push(self.classify(genome));
                accepted.push(genome);
            }
        }

        let finder = self.finder.as_ref();
        let class_filter = self.class_filter.as_ref();
        let scans: Vec<(usize, GenomeCouplings)> = accepted
            .par_iter()
            .zip(classified.into_par_iter())
            .map(|(genome, mut results)| -> Result<(usize, GenomeCouplings)> {
                let removed = class_filter.apply(&mut results);
                let couplings = GenomeCouplings::scan(genome, &results, finder)?;
                Ok((removed, couplings))
            })
            .collect::<Result<Vec<_>>>()?;

        let processed = scans.len();
        for (removed, couplings) in scans {
            self.stats.classes_removed += removed;
            self.map.merge_genome(couplings);
        }
        log::debug!(
            "Batch of {} genomes merged, {} pairs in map",
            processed,
            self.map.len()
        );
        Ok(processed)
    }

    pub fn map(&self) -> &CouplingMap {
        &self.map
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Filter the aggregated pairs and send the significant ones to `reporter`,
    /// ordered by `CouplingMap::sorted_pairs`.
    pub fn report_to(
        &mut self,
        pair_filter: &dyn PairFilter,
        reporter: &mut dyn CouplingReporter,
    ) -> Result<RunStats> {
        let (kept, rejected) = emit_pairs(&self.map, &self.genomes, pair_filter, reporter)?;
        self.record_pairs(kept, rejected);
        Ok(self.stats)
    }

    /// Resolve names for the significant pairs, then write a tab-delimited report
    pub fn write_report<W: Write>(
        &mut self,
        pair_filter: &dyn PairFilter,
        out: W,
        format: ReportFormat,
    ) -> Result<RunStats> {
        {
            let class_ids: Vec<&str> = self
                .map
                .iter()
                .filter(|(pair, aggregate)| pair_filter.is_significant(pair, aggregate))
                .flat_map(|(pair, _)| [pair.class1(), pair.class2()])
                .collect();
            self.classifier.prepare_names(&class_ids);
        }

        let (kept, rejected) = {
            let mut reporter = TabReporter::new(out, self.classifier.as_ref(), format);
            emit_pairs(&self.map, &self.genomes, pair_filter, &mut reporter)?
        };
        self.record_pairs(kept, rejected);
        Ok(self.stats)
    }

    fn record_pairs(&mut self, kept: usize, rejected: usize) {
        self.stats.pairs_total = self.map.len();
        self.stats.pairs_kept = kept;
        self.stats.pairs_rejected = rejected;
        log::info!(
            "{} of {} pairs significant, {} rejected",
            kept,
            self.map.len(),
            rejected
        );
    }
}

fn emit_pairs(
    map: &CouplingMap,
    genomes: &[(String, String)],
    pair_filter: &dyn PairFilter,
    reporter: &mut dyn CouplingReporter,
) -> Result<(usize, usize)> {
    for (id, name) in genomes {
        reporter.register_genome(id, name);
    }
    let mut kept = 0;
    let mut rejected = 0;
    for (pair, aggregate) in map.sorted_pairs() {
        if pair_filter.is_significant(pair, aggregate) {
            reporter.write_pair(pair, aggregate)?;
            kept += 1;
        } else {
            rejected += 1;
        }
    }
    reporter.finish()?;
    Ok((kept, rejected))
}
