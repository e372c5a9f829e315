//! Layered shell-account chain detection.
//!
//! Grounded on `original_source/backend/app/shell_detector.py`: an iterative,
//! stack-based DFS from every non-shell source node, walking only through
//! "shell" nodes (low total transaction count) until it reaches another
//! non-shell node, at which point a chain of length `SHELL_MIN_CHAIN` to
//! `SHELL_MAX_CHAIN` is recorded.
//!
//! Extends the shell predicate beyond the original: an account is only a
//! shell candidate if its transaction count is at or below `SHELL_MAX_TX`
//! *and* it is not a member of a strongly connected component with more than
//! one node. A low-activity account sitting on a real cycle is evidence for
//! the cycle detector, not an independent layering account, and counting it
//! in both would double-score the same behavior.

use std::collections::{HashSet, VecDeque};

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::ring::RawRing;

pub struct ShellDetector;

impl ShellDetector {
    pub fn detect(graph: &Graph, config: &EngineConfig) -> Vec<RawRing> {
        let nontrivial_scc = graph.nontrivial_scc_members();

        let mut shell_nodes: HashSet<&str> = HashSet::new();
        let mut non_shell_nodes: Vec<&str> = Vec::new();
        for id in graph.node_ids() {
            let stats = graph.node(id).unwrap();
            let is_shell = stats.tx_count as u32 <= config.shell_max_tx && !nontrivial_scc.contains(id);
            if is_shell {
                shell_nodes.insert(id);
            } else {
                non_shell_nodes.push(id);
            }
        }
        non_shell_nodes.sort_unstable();

        tracing::info!(
            shells = shell_nodes.len(),
            total = graph.node_count(),
            "shell detection candidates"
        );

        if shell_nodes.is_empty() {
            return Vec::new();
        }

        let mut rings = Vec::new();
        let mut seen_paths: HashSet<Vec<String>> = HashSet::new();

        'sources: for source in non_shell_nodes {
            if rings.len() >= config.max_shell_chains {
                tracing::warn!(cap = config.max_shell_chains, "shell chain cap reached");
                break 'sources;
            }

            let mut initial: Vec<&str> = graph
                .successors(source)
                .filter(|n| shell_nodes.contains(n))
                .collect();
            initial.sort_unstable();
            if initial.is_empty() {
                continue;
            }

            let mut stack: VecDeque<(Vec<&str>, HashSet<&str>)> = VecDeque::new();
            for nbr in initial {
                let mut visited = HashSet::new();
                visited.insert(source);
                visited.insert(nbr);
                stack.push_back((vec![source, nbr], visited));
            }

            while let Some((path, visited)) = stack.pop_back() {
                if rings.len() >= config.max_shell_chains {
                    break 'sources;
                }
                let current = *path.last().unwrap();
                let n_hops = path.len() - 1;

                let mut next_nodes: Vec<&str> = graph.successors(current).collect();
                next_nodes.sort_unstable();

                for nbr in next_nodes {
                    if visited.contains(nbr) {
                        continue;
                    }

                    let mut new_path = path.clone();
                    new_path.push(nbr);
                    let new_hops = n_hops + 1;
                    let intermediaries: Vec<&str> =
                        new_path[1..new_path.len() - 1].to_vec();

                    if !shell_nodes.contains(nbr) {
                        if new_hops >= config.shell_min_chain
                            && intermediaries.iter().all(|n| shell_nodes.contains(n))
                        {
                            let key: Vec<String> =
                                new_path.iter().map(|s| s.to_string()).collect();
                            if seen_paths.insert(key.clone()) {
                                rings.push(RawRing::shell_chain(
                                    intermediaries.iter().map(|s| s.to_string()).collect(),
                                    new_hops,
                                    source.to_string(),
                                    nbr.to_string(),
                                ));
                                if rings.len() >= config.max_shell_chains {
                                    break 'sources;
                                }
                            }
                        }
                    } else if new_hops < config.shell_max_chain {
                        let mut new_visited = visited.clone();
                        new_visited.insert(nbr);
                        stack.push_back((new_path, new_visited));
                    }
                }
            }
        }

        tracing::info!(rings = rings.len(), "shell detection");
        rings
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
    fn detects_shell_chain() {
        let mut config = EngineConfig::default();
        config.shell_min_chain = 3;
        config.shell_max_tx = 2;
        let rows = vec![
            tx("T1", "SOURCE", "S1", 100.0, 0),
            tx("T2", "S1", "S2", 100.0, 1),
            tx("T3", "S2", "DEST", 100.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = crate::graph::GraphBuilder::build(&table);
        let rings = ShellDetector::detect(&graph, &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].members, vec!["S1", "S2"]);
        assert_eq!(rings[0].chain_length, Some(3));
        assert_eq!(rings[0].shell_intermediaries, vec!["S1", "S2"]);
        assert_eq!(rings[0].shell_entry.as_deref(), Some("SOURCE"));
        assert_eq!(rings[0].shell_exit.as_deref(), Some("DEST"));
    }

    #[test]
    fn excludes_cycle_members_from_shell_candidacy() {
        let mut config = EngineConfig::default();
        config.shell_max_tx = 5;
        // S1 and S2 form a 2-cycle with each other in addition to being on
        // the SOURCE->DEST path, so they must not count as shell layering.
        let rows = vec![
            tx("T1", "SOURCE", "S1", 100.0, 0),
            tx("T2", "S1", "S2", 100.0, 1),
            tx("T3", "S2", "S1", 90.0, 2),
            tx("T4", "S2", "DEST", 100.0, 3),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = crate::graph::GraphBuilder::build(&table);
        let rings = ShellDetector::detect(&graph, &config);
        assert!(rings.is_empty());
    }
}
