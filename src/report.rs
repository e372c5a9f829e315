//! Final report assembly: suspicious accounts, fraud rings, network
//! statistics, and the rendered graph.
//!
//! Grounded on `original_source/backend/app/formatter.py` and `models.py` for
//! the suspicious-accounts/fraud-rings/summary/graph shape, extended with the
//! `risk_score`/`confidence` formulas and `network_statistics` block spec.md
//! §6 specifies but the Python formatter never implemented.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::graph::{EdgeStats, Graph, NodeStats};
use crate::ring::{Pattern, Ring};
use crate::scoring::AccountScore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<String>,
    pub ring_id: String,
    pub risk_explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: String,
    pub risk_score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub graph_density: f64,
    pub avg_degree: f64,
    pub connected_components: usize,
    /// `None` when the graph exceeds `clustering_max_nodes`.
    pub avg_clustering: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
    pub network_statistics: NetworkStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub suspicious: bool,
    #[serde(flatten)]
    pub stats: NodeStats,
    pub suspicion_score: Option<f64>,
    pub detected_patterns: Option<Vec<String>>,
    pub ring_id: Option<String>,
    pub ring_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub stats: EdgeStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReport {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
    pub graph: GraphPayload,
    pub timed_out: bool,
}

impl EngineReport {
    /// Render the report as pretty-printed JSON. A convenience for callers
    /// that don't need their own wire format; the engine itself has no
    /// opinion on how the report gets serialized (see §1: scope).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn risk_base(pattern: Pattern) -> f64 {
    match pattern {
        Pattern::CycleLength3 => 95.0,
        Pattern::CycleLength4 => 88.0,
        Pattern::CycleLength5 => 80.0,
        Pattern::FanIn | Pattern::FanOut => 75.0,
        Pattern::ShellChain => 70.0,
        Pattern::RoundTrip => 82.0,
    }
}

fn confidence_base(pattern: Pattern) -> f64 {
    match pattern {
        Pattern::CycleLength3 => 0.95,
        Pattern::CycleLength4 => 0.90,
        Pattern::CycleLength5 => 0.82,
        Pattern::FanIn | Pattern::FanOut => 0.78,
        Pattern::RoundTrip => 0.80,
        Pattern::ShellChain => 0.65,
    }
}

fn risk_score(ring: &Ring) -> f64 {
    let base = risk_base(ring.pattern);
    let n = ring.members.len();
    let bonus = n.saturating_sub(3) as f64 * 0.5;
    ((base + bonus) * 10.0).round() / 10.0
}

fn risk_score_clamped(ring: &Ring) -> f64 {
    risk_score(ring).min(100.0)
}

fn confidence(ring: &Ring) -> f64 {
    let mut c = confidence_base(ring.pattern);
    let n = ring.members.len();
    if n > 10 {
        c -= ((n - 10) as f64 * 0.01).min(0.15);
    }
    if ring.merged_patterns.len() > 1 {
        c = (c + 0.08).min(1.0);
    }
    if ring.pattern == Pattern::RoundTrip {
        if let Some(similarity) = ring
            .sources
            .iter()
            .filter(|s| s.pattern == Pattern::RoundTrip)
            .filter_map(|s| s.similarity)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        {
            c = c.max(similarity);
        }
    }
    (c * 1000.0).round() / 1000.0
}

pub struct ReportBuilder;

impl ReportBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        graph: &Graph,
        rings: &[Ring],
        scores: &HashMap<String, AccountScore>,
        config: &EngineConfig,
        processing_time_seconds: f64,
        timed_out: bool,
    ) -> EngineReport {
        let mut fraud_rings: Vec<FraudRing> = rings
            .iter()
            .map(|r| FraudRing {
                ring_id: r.ring_id.clone(),
                member_accounts: r.members.clone(),
                pattern_type: r.pattern.as_str().to_string(),
                risk_score: risk_score_clamped(r),
                confidence: confidence(r),
            })
            .collect();
        fraud_rings.sort_by(|a, b| {
            b.risk_score
                .partial_cmp(&a.risk_score)
                .unwrap()
                .then_with(|| a.ring_id.cmp(&b.ring_id))
        });

        let mut suspicious_accounts: Vec<SuspiciousAccount> = scores
            .iter()
            .filter(|(_, s)| s.score >= config.min_suspicion_score)
            .map(|(acc, s)| SuspiciousAccount {
                account_id: acc.clone(),
                suspicion_score: s.score,
                detected_patterns: s.patterns.clone(),
                ring_id: s.ring_ids.first().cloned().unwrap_or_else(|| "UNASSIGNED".to_string()),
                risk_explanation: s.risk_explanation.clone(),
            })
            .collect();
        suspicious_accounts.sort_by(|a, b| {
            b.suspicion_score
                .partial_cmp(&a.suspicion_score)
                .unwrap()
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        let suspicious_ids: HashSet<&str> = suspicious_accounts
            .iter()
            .map(|a| a.account_id.as_str())
            .collect();

        let mut node_ids: Vec<&str> = graph.node_ids().collect();
        node_ids.sort_unstable();
        let nodes: Vec<GraphNode> = node_ids
            .into_iter()
            .map(|id| {
                let stats = graph.node(id).unwrap().clone();
                let suspicious = suspicious_ids.contains(id);
                let score_info = scores.get(id);
                GraphNode {
                    id: id.to_string(),
                    label: id.to_string(),
                    suspicious,
                    stats,
                    suspicion_score: if suspicious { score_info.map(|s| s.score) } else { None },
                    detected_patterns: if suspicious {
                        score_info.map(|s| s.patterns.clone())
                    } else {
                        None
                    },
                    ring_id: if suspicious {
                        score_info.and_then(|s| s.ring_ids.first().cloned())
                    } else {
                        None
                    },
                    ring_ids: if suspicious {
                        score_info.map(|s| s.ring_ids.clone())
                    } else {
                        None
                    },
                }
            })
            .collect();

        let mut edge_keys: Vec<&(String, String)> = graph.edges().keys().collect();
        edge_keys.sort();
        let edges: Vec<GraphEdge> = edge_keys
            .into_iter()
            .map(|(u, v)| GraphEdge {
                source: u.clone(),
                target: v.clone(),
                stats: graph.edge(u, v).unwrap().clone(),
            })
            .collect();

        let network_statistics = compute_network_statistics(graph, config);

        let summary = Summary {
            total_accounts_analyzed: graph.node_count(),
            suspicious_accounts_flagged: suspicious_accounts.len(),
            fraud_rings_detected: fraud_rings.len(),
            processing_time_seconds: (processing_time_seconds * 1000.0).round() / 1000.0,
            network_statistics,
        };

        EngineReport {
            suspicious_accounts,
            fraud_rings,
            summary,
            graph: GraphPayload { nodes, edges },
            timed_out,
        }
    }
}

fn compute_network_statistics(graph: &Graph, config: &EngineConfig) -> NetworkStatistics {
    let n = graph.node_count();
    let e = graph.edge_count();

    let graph_density = if n > 1 {
        e as f64 / (n as f64 * (n as f64 - 1.0))
    } else {
        0.0
    };
    let avg_degree = if n > 0 { 2.0 * e as f64 / n as f64 } else { 0.0 };

    let connected_components = weakly_connected_components(graph);
    let avg_clustering = if n > config.clustering_max_nodes {
        None
    } else {
        Some(average_clustering(graph))
    };

    NetworkStatistics {
        total_nodes: n,
        total_edges: e,
        graph_density,
        avg_degree,
        connected_components,
        avg_clustering,
    }
}

fn weakly_connected_components(graph: &Graph) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut components = 0;
    let mut ids: Vec<&str> = graph.node_ids().collect();
    ids.sort_unstable();

    for &start in &ids {
        if visited.contains(start) {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(node) = stack.pop() {
            for next in graph.successors(node).chain(graph.predecessors(node)) {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
    components
}

/// Average undirected local clustering coefficient across all nodes, using
/// the union of successor and predecessor sets as a node's undirected
/// neighborhood. Nodes with fewer than 2 neighbors contribute 0.
fn average_clustering(graph: &Graph) -> f64 {
    let ids: Vec<&str> = graph.node_ids().collect();
    if ids.is_empty() {
        return 0.0;
    }

    let neighbor_sets: HashMap<&str, HashSet<&str>> = ids
        .iter()
        .map(|&id| {
            let mut set: HashSet<&str> = graph.successors(id).collect();
            set.extend(graph.predecessors(id));
            set.remove(id);
            (id, set)
        })
        .collect();

    let total: f64 = ids
        .iter()
        .map(|&id| {
            let neighbors = &neighbor_sets[id];
            let k = neighbors.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            let neighbor_vec: Vec<&&str> = neighbors.iter().collect();
            for i in 0..neighbor_vec.len() {
                for j in (i + 1)..neighbor_vec.len() {
                    let a = *neighbor_vec[i];
                    let b = *neighbor_vec[j];
                    if neighbor_sets[a].contains(b) || neighbor_sets[b].contains(a) {
                        links += 1;
                    }
                }
            }
            let possible = (k * (k - 1) / 2) as f64;
            links as f64 / possible
        })
        .sum();

    total / ids.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::ring::RawRing;
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
    fn risk_score_and_confidence_match_formula() {
        let raw = RawRing::cycle(vec!["A".into(), "B".into(), "C".into()], 3);
        let rings = crate::ring::RingMerger::merge(vec![raw], vec![], vec![], vec![]);
        let ring = &rings[0];
        // base 95 + max(3-3,0)*0.5 = 95
        assert_eq!(risk_score_clamped(ring), 95.0);
        assert_eq!(confidence(ring), 0.95);
    }

    #[test]
    fn network_statistics_reports_expected_shape() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 90.0, 1),
            tx("T3", "C", "A", 80.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let stats = compute_network_statistics(&graph, &config);
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 3);
        assert_eq!(stats.connected_components, 1);
        assert!(stats.avg_clustering.is_some());
    }

    #[test]
    fn clustering_skipped_above_node_cap() {
        let mut config = EngineConfig::default();
        config.clustering_max_nodes = 1;
        let rows = vec![tx("T1", "A", "B", 100.0, 0), tx("T2", "B", "C", 90.0, 1)];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let stats = compute_network_statistics(&graph, &config);
        assert!(stats.avg_clustering.is_none());
    }

    #[test]
    fn report_round_trips_through_json() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 90.0, 1),
            tx("T3", "C", "A", 80.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let scores = crate::scoring::Scorer::score(&[], &table, &graph, &config);
        let report = ReportBuilder::build(&graph, &[], &scores, &config, 0.001, false);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"total_nodes\": 3"));
    }
}
