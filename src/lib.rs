//! # Money Mule Forensics
//!
//! A graph-based detection and suspicion-scoring engine for batches of
//! financial transactions, built to surface circular fund routing, fan-in /
//! fan-out aggregation, layered shell-account chains, round-trip flows,
//! rapid pass-through movement, and amount structuring — then synthesize
//! the findings into per-account suspicion scores and merged fraud rings.
//!
//! ## Scope
//!
//! This crate consumes an already-validated transaction batch; decoding raw
//! input (CSV, HTTP bodies) and serializing the report to an external wire
//! format are the caller's responsibility. [`analyze`] is the single
//! entry point.
//!
//! ## Pipeline
//!
//! `GraphBuilder` builds the account graph and caches its strongly connected
//! components, then six independent detectors run over the table and graph,
//! `RingMerger` unifies their findings into stable-ID fraud rings, and
//! `Scorer` produces the final per-account suspicion scores.

pub mod anomaly_detector;
pub mod config;
pub mod cycle_detector;
pub mod error;
pub mod graph;
pub mod rapid_movement_detector;
pub mod report;
pub mod ring;
pub mod round_trip_detector;
pub mod scoring;
pub mod shell_detector;
pub mod smurf_detector;
pub mod structuring_detector;
pub mod transaction;

pub use config::EngineConfig;
pub use error::EngineError;
pub use report::EngineReport;
pub use transaction::{Transaction, TransactionTable};

use std::time::Instant;

use graph::GraphBuilder;
use ring::RingMerger;
use scoring::Scorer;

/// Analyze a batch of transactions and produce a full forensic report.
///
/// Validates the input against the engine's boundary invariants (see
/// [`TransactionTable::validate`]), then runs the full detection and scoring
/// pipeline. The only error path is a rejected input table — once a
/// non-empty, valid table is accepted, every downstream detector is
/// best-effort and failures surface only as `tracing::warn!` log lines and
/// the report's `timed_out` flag, never as an `Err`.
pub fn analyze(
    transactions: Vec<Transaction>,
    config: &EngineConfig,
) -> Result<EngineReport, EngineError> {
    let started = Instant::now();
    let table = TransactionTable::validate(transactions, config)?;

    let graph = GraphBuilder::build(&table);

    let cycle_result = cycle_detector::CycleDetector::detect(&graph, config);
    let smurf_rings = smurf_detector::SmurfDetector::detect(&table, config);
    let shell_rings = shell_detector::ShellDetector::detect(&graph, config);
    let round_trip_rings = round_trip_detector::RoundTripDetector::detect(&graph, config);

    let rings = RingMerger::merge(cycle_result.rings, smurf_rings, shell_rings, round_trip_rings);
    let scores = Scorer::score(&rings, &table, &graph, config);

    let processing_time_seconds = started.elapsed().as_secs_f64();
    let report = report::ReportBuilder::build(
        &graph,
        &rings,
        &scores,
        config,
        processing_time_seconds,
        cycle_result.timed_out,
    );

    Ok(report)
}
