/// Reports written in every format read back into the same pairs

use couplings::class_filter::NoClassFilter;
use couplings::classifier::{Classifier, FileClassifier, RoleClassifier};
use couplings::engine::CouplingEngine;
use couplings::genome::{Feature, Genome, Location, Strand};
use couplings::neighbors::CloseFinder;
use couplings::pair::ClassPair;
use couplings::pair_filter::WeightPairFilter;
use couplings::report::{read_pairs, ReportFormat};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Cursor;

fn role_genome(id: &str, functions: &[&str]) -> Genome {
    let features = functions
        .iter()
        .enumerate()
        .map(|(i, function)| {
            let begin = 1 + i as u64 * 1000;
            Feature::new(
                &format!("fig|{id}.peg.{}", i + 1),
                Location::new("c1", Strand::Plus, begin, begin + 899),
                function,
            )
            .with_protein_md5(&format!("md5-{function}"))
        })
        .collect();
    Genome::new(id, &format!("Genome {id}"), features)
}

fn corpus() -> Vec<Genome> {
    vec![
        role_genome(
            "1.1",
            &[
                "Aspartokinase (EC 2.7.2.4) / Homoserine dehydrogenase (EC 1.1.1.3)",
                "Homoserine kinase (EC 2.7.1.39)",
                "Threonine synthase (EC 4.2.3.1)",
            ],
        ),
        role_genome(
            "2.1",
            &[
                "Homoserine kinase (EC 2.7.1.39)",
                "Threonine synthase (EC 4.2.3.1)",
                "hypothetical protein",
            ],
        ),
    ]
}

fn engine(classifier: Box<dyn Classifier>) -> CouplingEngine {
    let mut engine = CouplingEngine::new(
        classifier,
        Box::new(CloseFinder::new(200).unwrap()),
        Box::new(NoClassFilter),
    );
    engine.process_batch(&corpus()).unwrap();
    engine
}

fn roundtrip(engine: &mut CouplingEngine, format: ReportFormat) -> (Vec<ClassPair>, Vec<ClassPair>) {
    let filter = WeightPairFilter::new(0.0).unwrap();
    let mut out = Vec::new();
    engine.write_report(&filter, &mut out, format).unwrap();
    let read = read_pairs(Cursor::new(out), engine.classifier(), format).unwrap();
    let expected = engine
        .map()
        .sorted_pairs()
        .into_iter()
        .map(|(pair, _)| pair.clone())
        .collect();
    (read, expected)
}

#[test]
fn test_role_report_roundtrip_all_formats() {
    let mut engine = engine(Box::new(RoleClassifier::new()));
    assert!(!engine.map().is_empty());
    for format in [ReportFormat::Verbose, ReportFormat::Pairs, ReportFormat::Groups] {
        let (read, expected) = roundtrip(&mut engine, format);
        assert_eq!(read, expected, "format {format:?}");
    }
}

#[test]
fn test_role_names_in_verbose_report() {
    let mut engine = engine(Box::new(RoleClassifier::new()));
    let filter = WeightPairFilter::new(0.0).unwrap();
    let mut out = Vec::new();
    engine
        .write_report(&filter, &mut out, ReportFormat::Verbose)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("role1\tname1\trole2\tname2\tsize"));
    assert!(text.contains("Homoserine kinase (EC 2.7.1.39)"));
    assert!(!text.contains("hypothetical"));
}

#[test]
fn test_file_classifier_report_roundtrip() {
    let table: HashMap<String, String> = [
        ("md5-Homoserine kinase (EC 2.7.1.39)", "CLS1"),
        ("md5-Threonine synthase (EC 4.2.3.1)", "CLS2"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let mut engine = engine(Box::new(FileClassifier::from_table(table)));
    assert_eq!(engine.map().len(), 1);
    for format in [ReportFormat::Verbose, ReportFormat::Groups] {
        let (read, expected) = roundtrip(&mut engine, format);
        assert_eq!(read, expected);
        assert_eq!(read, vec![ClassPair::new("CLS1", "CLS2")]);
    }
}
