//! Circular fund routing (money-mule ring) detection.
//!
//! Grounded on `original_source/backend/app/cycle_detector.py`: restrict the
//! search to strongly connected components of size >= `cycle_min_len`, then
//! enumerate simple cycles within each SCC depth-first, bounded by
//! `cycle_max_len`, `max_cycles`, and a wall-clock deadline. Cycles are
//! canonicalized by only extending a path through nodes lexicographically
//! greater than or equal to its start node — the start is then always the
//! rotation-minimum, matching the Python original's explicit
//! rotate-to-smallest-then-dedup step without a second pass.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::ring::RawRing;

/// Result of a cycle-detection pass: the rings found, and whether the
/// deadline was hit before exhausting the search space.
pub struct CycleDetectionResult {
    pub rings: Vec<RawRing>,
    pub timed_out: bool,
}

pub struct CycleDetector;

impl CycleDetector {
    pub fn detect(graph: &Graph, config: &EngineConfig) -> CycleDetectionResult {
        let mut scc_nodes: Vec<&str> = graph
            .sccs()
            .iter()
            .filter(|scc| scc.len() >= config.cycle_min_len)
            .flat_map(|scc| scc.iter().map(|s| s.as_str()))
            .collect();
        scc_nodes.sort_unstable();

        if scc_nodes.is_empty() {
            return CycleDetectionResult {
                rings: Vec::new(),
                timed_out: false,
            };
        }

        let scc_set: std::collections::HashSet<&str> = scc_nodes.iter().copied().collect();
        let deadline = Instant::now() + Duration::from_secs_f64(config.cycle_timeout_seconds);

        let mut search = Search {
            graph,
            scc_set: &scc_set,
            config,
            deadline,
            rings: Vec::new(),
            timed_out: false,
        };

        'outer: for &start in &scc_nodes {
            if search.timed_out || search.rings.len() >= config.max_cycles {
                break 'outer;
            }
            let mut path = vec![start];
            let mut in_path: std::collections::HashSet<&str> = std::collections::HashSet::new();
            in_path.insert(start);
            search.dfs(start, start, &mut path, &mut in_path);
        }

        tracing::info!(
            rings = search.rings.len(),
            timed_out = search.timed_out,
            "cycle detection"
        );

        CycleDetectionResult {
            rings: search.rings,
            timed_out: search.timed_out,
        }
    }
}

struct Search<'a> {
    graph: &'a Graph,
    scc_set: &'a std::collections::HashSet<&'a str>,
    config: &'a EngineConfig,
    deadline: Instant,
    rings: Vec<RawRing>,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn dfs<'p>(
        &mut self,
        start: &'a str,
        current: &'a str,
        path: &mut Vec<&'a str>,
        in_path: &mut std::collections::HashSet<&'a str>,
    ) {
        if self.timed_out || self.rings.len() >= self.config.max_cycles {
            self.timed_out = self.timed_out || Instant::now() >= self.deadline;
            return;
        }
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }
        if path.len() > self.config.cycle_max_len {
            return;
        }

        for next in self.graph.successors(current) {
            if !self.scc_set.contains(next) {
                continue;
            }
            if next < start {
                continue; // only visit nodes >= start: keeps start canonical-minimal
            }
            if next == start {
                let length = path.len();
                if length >= self.config.cycle_min_len && length <= self.config.cycle_max_len {
                    let members: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                    self.rings.push(RawRing::cycle(members, length));
                    if self.rings.len() >= self.config.max_cycles {
                        return;
                    }
                }
                continue;
            }
            if in_path.contains(next) {
                continue;
            }
            if path.len() + 1 > self.config.cycle_max_len {
                continue;
            }

            path.push(next);
            in_path.insert(next);
            self.dfs(start, next, path, in_path);
            in_path.remove(next);
            path.pop();

            if self.timed_out || self.rings.len() >= self.config.max_cycles {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Transaction, TransactionTable};
    use chrono::{TimeZone, Utc};

    fn tx(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn detects_triangle_cycle() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 90.0, 1),
            tx("T3", "C", "A", 80.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = crate::graph::GraphBuilder::build(&table);
        let result = CycleDetector::detect(&graph, &config);
        assert!(!result.timed_out);
        assert_eq!(result.rings.len(), 1);
        assert_eq!(result.rings[0].members, vec!["A", "B", "C"]);
        assert_eq!(result.rings[0].cycle_length, Some(3));
    }

    #[test]
    fn no_cycle_in_acyclic_chain() {
        let config = EngineConfig::default();
        let rows = vec![tx("T1", "A", "B", 100.0, 0), tx("T2", "B", "C", 90.0, 1)];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = crate::graph::GraphBuilder::build(&table);
        let result = CycleDetector::detect(&graph, &config);
        assert!(result.rings.is_empty());
    }

    #[test]
    fn respects_max_cycles_cap() {
        let mut config = EngineConfig::default();
        config.max_cycles = 1;
        let rows = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "A", 90.0, 1),
            tx("T3", "A", "C", 50.0, 2),
            tx("T4", "C", "A", 40.0, 3),
        ];
        config.cycle_min_len = 2;
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = crate::graph::GraphBuilder::build(&table);
        let result = CycleDetector::detect(&graph, &config);
        assert_eq!(result.rings.len(), 1);
    }
}
