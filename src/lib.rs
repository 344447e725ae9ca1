// Library exports for couplings
pub mod class_filter;
pub mod class_result;
pub mod classifier;
pub mod config;
pub mod coupling;
pub mod engine;
pub mod genome;
pub mod genome_io;
pub mod logging;
pub mod names;
pub mod neighbors;
pub mod pair;
pub mod pair_filter;
pub mod report;
pub mod roles;
