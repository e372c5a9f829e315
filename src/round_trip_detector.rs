//! Bi-directional (round-trip) fund flow detection.
//!
//! Grounded on `original_source/backend/app/bidirectional_detector.py`.
//! Catches 2-node laundering loops the cycle detector skips by design
//! (`cycle_min_len` starts at 3): an edge A->B paired with B->A where the
//! total amounts moved in each direction are within `round_trip_amount_tolerance`
//! of each other.

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::ring::RawRing;

pub struct RoundTripDetector;

impl RoundTripDetector {
    pub fn detect(graph: &Graph, config: &EngineConfig) -> Vec<RawRing> {
        let mut rings = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let mut edge_keys: Vec<&(String, String)> = graph.edges().keys().collect();
        edge_keys.sort();

        for (u, v) in edge_keys {
            if !graph.has_edge(v, u) {
                continue;
            }
            let pair = if u < v {
                (u.clone(), v.clone())
            } else {
                (v.clone(), u.clone())
            };
            if !seen.insert(pair.clone()) {
                continue;
            }

            let fwd = graph.edge(u, v).unwrap().total_amount;
            let rev = graph.edge(v, u).unwrap().total_amount;
            if fwd <= 0.0 || rev <= 0.0 {
                continue;
            }

            let larger = fwd.max(rev);
            let smaller = fwd.min(rev);
            let diff_ratio = (larger - smaller) / larger;

            if diff_ratio <= config.round_trip_amount_tolerance {
                let similarity = ((1.0 - diff_ratio) * 1000.0).round() / 1000.0;
                rings.push(RawRing::round_trip(
                    vec![pair.0, pair.1],
                    fwd,
                    rev,
                    similarity,
                ));
            }
        }

        tracing::info!(rings = rings.len(), "round-trip detection");
        rings
    }
}
