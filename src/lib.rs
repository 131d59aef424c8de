//! Chartsweep - unused Helm values detector
//!
//! Chartsweep is a CLI tool and library for finding `values.yaml` keys that
//! are never referenced in a Helm chart's templates. Templates are treated
//! as plain text: references are recognized with a literal `.Values.<key>`
//! check plus a registry of helper idioms, with hierarchical fallback for
//! sub-objects passed around by an ancestor key.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface and run orchestration
//! - `config`: Runtime configuration
//! - `keys`: Key extraction from `values.yaml` (via yq/jq)
//! - `patterns`: Registry of reference idioms
//! - `search`: Search backend, per-key resolver, parallel scheduler
//! - `classify`: Parent-key promotion over the aggregate results
//! - `report`: Text/JSON result rendering
//! - `usage`: The per-key result types

pub mod classify;
pub mod cli;
pub mod config;
pub mod keys;
pub mod patterns;
pub mod report;
pub mod search;
pub mod usage;
