//! Class-name resolution
//!
//! Names are cosmetic: anything that cannot be resolved is rendered as an
//! empty string and never fails the run.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::genome_io::open_input;

/// Source of human-readable names for class IDs
pub trait NameResolver: Send {
    /// Resolve a batch of IDs. Missing IDs may be left out of the result.
    fn resolve(&mut self, ids: &[String]) -> HashMap<String, String>;
}

/// Resolver that knows no names
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNames;

impl NameResolver for NoNames {
    fn resolve(&mut self, _ids: &[String]) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Two-column `id<TAB>name` table loaded from a file
#[derive(Debug, Default, Clone)]
pub struct NameTable {
    names: HashMap<String, String>,
}

impl NameTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_input(path)?;
        let mut names = HashMap::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if line.starts_with('#') {
                continue;
            }
            if let Some((id, name)) = line.split_once('\t') {
                names.insert(id.trim().to_string(), name.trim().to_string());
            }
        }
        log::info!("Loaded {} class names from {}", names.len(), path.display());
        Ok(NameTable { names })
    }

    pub fn insert(&mut self, id: &str, name: &str) {
        self.names.insert(id.to_string(), name.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameResolver for NameTable {
    fn resolve(&mut self, ids: &[String]) -> HashMap<String, String> {
        ids.iter()
            .filter_map(|id| self.names.get(id).map(|name| (id.clone(), name.clone())))
            .collect()
    }
}

/// Lazily filled name cache in front of a resolver
pub struct NameCache {
    resolver: Box<dyn NameResolver>,
    cache: HashMap<String, String>,
}

impl NameCache {
    pub fn new(resolver: Box<dyn NameResolver>) -> Self {
        NameCache {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Resolve every ID not yet cached in one batch. Unresolved IDs are cached as "".
    pub fn prefetch<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = ids
            .into_iter()
            .filter(|id| !self.cache.contains_key(*id))
            .map(String::from)
            .collect();
        if missing.is_empty() {
            return;
        }
        missing.sort();
        missing.dedup();

        let found = self.resolver.resolve(&missing);
        let unresolved = missing.iter().filter(|id| !found.contains_key(*id)).count();
        if unresolved > 0 {
            log::warn!("{unresolved} of {} class names could not be resolved", missing.len());
        }
        for id in missing {
            let name = found.get(&id).cloned().unwrap_or_default();
            self.cache.insert(id, name);
        }
    }

    /// Cached name, or "" if the ID was never resolved
    pub fn get(&self, id: &str) -> &str {
        self.cache.get(id).map(|s| s.as_str()).unwrap_or("")
    }
}
