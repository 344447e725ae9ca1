//! Genome table reader
//!
//! One genome per file. The first line is `#genome<TAB>id<TAB>name`, then one
//! feature per line:
//!
//! `feature_id contig strand begin end function family subsystems protein_md5`
//!
//! Empty or `-` fields are absent values; subsystems are `;`-separated.

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::genome::{Feature, Genome, Location, Strand};

const FEATURE_FIELDS: usize = 9;

/// Open a file and auto-detect gzip compression, returning a boxed BufRead
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    // Check by file extension (faster than reading magic bytes)
    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn optional(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field == "-" {
        None
    } else {
        Some(field.to_string())
    }
}

fn parse_feature_line(line: &str) -> Result<Feature> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FEATURE_FIELDS {
        bail!(
            "expected {} tab-separated fields, found {}",
            FEATURE_FIELDS,
            fields.len()
        );
    }

    let begin: u64 = fields[3]
        .parse()
        .map_err(|e| anyhow!("invalid begin '{}': {e}", fields[3]))?;
    let end: u64 = fields[4]
        .parse()
        .map_err(|e| anyhow!("invalid end '{}': {e}", fields[4]))?;
    let location = Location::new(fields[1], Strand::parse(fields[2])?, begin, end);

    let mut feature = Feature::new(fields[0], location, optional(fields[5]).as_deref().unwrap_or(""));
    feature.family = optional(fields[6]);
    if let Some(subsystems) = optional(fields[7]) {
        feature.subsystems = subsystems
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    feature.protein_md5 = optional(fields[8]);
    Ok(feature)
}

/// Read a genome from any buffered reader. `source` is only used in error messages.
pub fn read_genome<R: BufRead>(reader: R, source: &str) -> Result<Genome> {
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => line?,
        None => bail!("{source}: empty genome table"),
    };
    let parts: Vec<&str> = header.split('\t').collect();
    if parts.len() < 2 || parts[0] != "#genome" || parts[1].is_empty() {
        bail!("{source}: missing '#genome<TAB>id<TAB>name' header line");
    }
    let genome_id = parts[1];
    let genome_name = parts.get(2).copied().unwrap_or("");

    let mut features = Vec::new();
    for (line_no, line) in lines {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let feature = parse_feature_line(&line)
            .with_context(|| format!("{}: line {}", source, line_no + 1))?;
        features.push(feature);
    }

    Ok(Genome::new(genome_id, genome_name, features))
}

/// Load a genome table file (plain or gzipped)
pub fn load_genome<P: AsRef<Path>>(path: P) -> Result<Genome> {
    let path = path.as_ref();
    let reader = open_input(path)?;
    read_genome(reader, &path.display().to_string())
}

/// A directory of genome tables, loaded one genome at a time
#[derive(Debug, Clone)]
pub struct GenomeDirectory {
    files: Vec<PathBuf>,
}

impl GenomeDirectory {
    /// List all `.tsv`/`.tsv.gz` genome tables in sorted file-name order
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("Genome directory {} not found", dir.display());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if path.is_file() && (name.ends_with(".tsv") || name.ends_with(".tsv.gz")) {
                files.push(path);
            }
        }
        files.sort();
        Ok(GenomeDirectory { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Iterate over the genomes, loading each on demand
    pub fn iter(&self) -> impl Iterator<Item = Result<Genome>> + '_ {
        self.files.iter().map(load_genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    const TABLE: &str = "#genome\t83333.1\tEscherichia coli K-12\n\
fig|83333.1.peg.1\tNC_000913\t+\t190\t255\tThr operon leader peptide\t-\t-\t-\n\
# a comment\n\
fig|83333.1.peg.2\tNC_000913\t+\t337\t2799\tAspartokinase (EC 2.7.2.4)\tPF00696\tThreonine biosynthesis;Lysine biosynthesis\tabc123\n";

    #[test]
    fn test_read_genome() {
        let genome = read_genome(Cursor::new(TABLE), "test").unwrap();
        assert_eq!(genome.id, "83333.1");
        assert_eq!(genome.name, "Escherichia coli K-12");
        assert_eq!(genome.len(), 2);

        let peg1 = genome.feature("fig|83333.1.peg.1").unwrap();
        assert_eq!(peg1.family, None);
        assert!(peg1.subsystems.is_empty());

        let peg2 = genome.feature("fig|83333.1.peg.2").unwrap();
        assert_eq!(peg2.family.as_deref(), Some("PF00696"));
        assert_eq!(peg2.subsystems.len(), 2);
        assert_eq!(peg2.protein_md5.as_deref(), Some("abc123"));
        assert_eq!(peg2.location.begin, 337);
    }

    #[test]
    fn test_missing_header() {
        let err = read_genome(Cursor::new("fig|1.1.peg.1\tc\t+\t1\t2\tf\t-\t-\t-\n"), "bad").unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let table = "#genome\t1.1\tX\nfig|1.1.peg.1\tc\t*\t1\t2\tf\t-\t-\t-\n";
        let err = read_genome(Cursor::new(table), "bad.tsv").unwrap_err();
        assert!(format!("{err:#}").contains("bad.tsv: line 2"));
    }

    #[test]
    fn test_directory_plain_and_gzip() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.tsv"), TABLE).unwrap();
        {
            let file = File::create(dir.path().join("a.tsv.gz")).unwrap();
            let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            encoder
                .write_all(b"#genome\t1.1\tOther\nfig|1.1.peg.1\tc\t-\t1\t90\tf\tPF1\t-\t-\n")
                .unwrap();
            encoder.finish().unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let genomes = GenomeDirectory::open(dir.path()).unwrap();
        assert_eq!(genomes.len(), 2);
        let names: Vec<_> = genomes
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tsv.gz", "b.tsv"]);
        let loaded: Vec<Genome> = genomes.iter().collect::<Result<_>>().unwrap();
        assert_eq!(loaded[0].id, "1.1");
        assert_eq!(loaded[1].id, "83333.1");
    }
}
