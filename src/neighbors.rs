//! Neighbor finders: which later results count as neighbors of a given result
//!
//! Both policies only look forward in a location-sorted result list, so each
//! unordered pair of features is visited once.

use anyhow::{bail, Result};

use crate::class_result::ClassResult;

/// Neighbor-finding policy selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FinderType {
    /// Only the next result, if it is within the gap
    Adjacent,
    /// Every following result within the gap
    Close,
}

pub trait NeighborFinder: Send + Sync {
    /// Results after position `i` that are neighbors of `results[i]`
    fn neighbors<'a>(&self, results: &'a [ClassResult], i: usize) -> &'a [ClassResult];

    /// Maximum gap between neighbors
    fn max_gap(&self) -> u64;
}

fn within(max_gap: u64, a: &ClassResult, b: &ClassResult) -> bool {
    matches!(a.distance(b), Some(d) if d <= max_gap)
}

/// Returns at most the immediately following result
#[derive(Debug, Clone, Copy)]
pub struct AdjacentFinder {
    max_gap: u64,
}

impl AdjacentFinder {
    pub fn new(max_gap: u64) -> Result<Self> {
        validate_gap(max_gap)?;
        Ok(AdjacentFinder { max_gap })
    }
}

impl NeighborFinder for AdjacentFinder {
    fn neighbors<'a>(&self, results: &'a [ClassResult], i: usize) -> &'a [ClassResult] {
        let next = i + 1;
        if next < results.len() && within(self.max_gap, &results[i], &results[next]) {
            &results[next..=next]
        } else {
            &[]
        }
    }

    fn max_gap(&self) -> u64 {
        self.max_gap
    }
}

/// Scans forward while results stay within the gap
#[derive(Debug, Clone, Copy)]
pub struct CloseFinder {
    max_gap: u64,
}

impl CloseFinder {
    pub fn new(max_gap: u64) -> Result<Self> {
        validate_gap(max_gap)?;
        Ok(CloseFinder { max_gap })
    }
}

impl NeighborFinder for CloseFinder {
    fn neighbors<'a>(&self, results: &'a [ClassResult], i: usize) -> &'a [ClassResult] {
        if i >= results.len() {
            return &[];
        }
        let start = i + 1;
        let mut end = start;
        while end < results.len() && within(self.max_gap, &results[i], &results[end]) {
            end += 1;
        }
        &results[start..end]
    }

    fn max_gap(&self) -> u64 {
        self.max_gap
    }
}

fn validate_gap(max_gap: u64) -> Result<()> {
    if max_gap == 0 {
        bail!("Maximum gap must be at least 1, got {max_gap}");
    }
    Ok(())
}

/// Build the finder for a policy
pub fn create_finder(finder: FinderType, max_gap: u64) -> Result<Box<dyn NeighborFinder>> {
    Ok(match finder {
        FinderType::Adjacent => Box::new(AdjacentFinder::new(max_gap)?),
        FinderType::Close => Box::new(CloseFinder::new(max_gap)?),
    })
}
