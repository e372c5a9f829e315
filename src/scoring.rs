//! Suspicion scoring synthesis.
//!
//! Grounded on `original_source/backend/app/scoring.py`: per-account scores
//! accumulate contributions from ring memberships, a multi-ring bonus, a
//! high-velocity bonus, a betweenness-centrality bonus (small graphs only),
//! and the three non-ring detector signals (amount anomaly, rapid movement,
//! structuring), then get capped at 100 and paired with a deterministic
//! human-readable explanation.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::anomaly_detector::AnomalyDetector;
use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::rapid_movement_detector::{RapidMovement, RapidMovementDetector};
use crate::ring::{Pattern, Ring};
use crate::structuring_detector::{Structuring, StructuringDetector};
use crate::transaction::TransactionTable;

/// A fully scored account, ready for report assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountScore {
    pub score: f64,
    pub patterns: Vec<String>,
    pub ring_ids: Vec<String>,
    pub risk_explanation: String,
}

struct Entry {
    score: f64,
    patterns: BTreeSet<String>,
    ring_ids: Vec<String>,
    min_dwell_minutes: Option<f64>,
    structured_tx_count: Option<usize>,
    avg_amount: Option<f64>,
}

impl Entry {
    fn new() -> Self {
        Self {
            score: 0.0,
            patterns: BTreeSet::new(),
            ring_ids: Vec::new(),
            min_dwell_minutes: None,
            structured_tx_count: None,
            avg_amount: None,
        }
    }
}

pub struct Scorer;

impl Scorer {
    pub fn score(
        rings: &[Ring],
        table: &TransactionTable,
        graph: &Graph,
        config: &EngineConfig,
    ) -> HashMap<String, AccountScore> {
        let anomaly_accounts = AnomalyDetector::detect(table, config);
        let rapid_accounts = RapidMovementDetector::detect(table, config);
        let structuring_accounts = StructuringDetector::detect(table, config);

        let mut data: HashMap<String, Entry> = HashMap::new();

        // 1. Pattern contributions (ring-based).
        for ring in rings {
            let base_score = pattern_base_score(ring.pattern, config);
            let hub = ring
                .sources
                .iter()
                .find(|s| s.pattern == ring.pattern)
                .and_then(|s| s.hub.as_deref());

            // Shell-chain members are, by construction, always the shell
            // interiors (RawRing::shell_chain sets `members` to the
            // intermediaries only); entry/exit endpoints are never in
            // `ring.members` and are scored separately below.
            for acc in &ring.members {
                let entry = data.entry(acc.clone()).or_insert_with(Entry::new);
                if !entry.ring_ids.contains(&ring.ring_id) {
                    entry.ring_ids.push(ring.ring_id.clone());
                }

                match ring.pattern {
                    Pattern::FanIn | Pattern::FanOut => {
                        if Some(acc.as_str()) == hub {
                            entry.score += base_score;
                            entry.patterns.insert(ring.pattern.as_str().to_string());
                        }
                    }
                    _ => {
                        entry.score += base_score;
                        entry.patterns.insert(ring.pattern.as_str().to_string());
                    }
                }
            }

            // Shell-chain entry/exit endpoints: half the shell_chain base
            // score, no pattern label, regardless of which pattern ended up
            // primary for this (possibly merged) ring.
            let shell_endpoints: HashSet<&str> = ring
                .sources
                .iter()
                .filter(|s| s.pattern == Pattern::ShellChain)
                .flat_map(|s| [s.shell_entry.as_deref(), s.shell_exit.as_deref()])
                .flatten()
                .collect();
            for acc in shell_endpoints {
                if ring.members.iter().any(|m| m == acc) {
                    continue;
                }
                let entry = data.entry(acc.to_string()).or_insert_with(Entry::new);
                if !entry.ring_ids.contains(&ring.ring_id) {
                    entry.ring_ids.push(ring.ring_id.clone());
                }
                entry.score += config.score_shell * 0.5;
            }
        }

        // 2. Multi-ring bonus.
        for entry in data.values_mut() {
            let extra_rings = entry.ring_ids.len().saturating_sub(1);
            if extra_rings > 0 {
                entry.score += config.score_multi_ring_bonus * extra_rings as f64;
                entry.patterns.insert("multi_ring".to_string());
            }
        }

        // 3. High-velocity bonus.
        for acc in velocity_accounts(table, config) {
            let entry = data.entry(acc).or_insert_with(Entry::new);
            entry.score += config.score_high_velocity;
            entry.patterns.insert("high_velocity".to_string());
        }

        // 4. Centrality bonus.
        if graph.node_count() <= config.centrality_max_nodes {
            let centrality = betweenness_centrality(graph);
            let max_c = centrality.values().cloned().fold(0.0_f64, f64::max);
            if max_c > 0.0 {
                for (acc, entry) in data.iter_mut() {
                    if let Some(&c) = centrality.get(acc.as_str()) {
                        entry.score += (c / max_c) * config.score_centrality_max;
                    }
                }
            }
        } else {
            tracing::info!(nodes = graph.node_count(), "centrality skipped: graph too large");
        }

        // 5. Amount anomaly bonus.
        for acc in &anomaly_accounts {
            let entry = data.entry(acc.clone()).or_insert_with(Entry::new);
            entry.score += config.score_amount_anomaly;
            entry.patterns.insert("amount_anomaly".to_string());
        }

        // 6. Rapid movement bonus.
        for (acc, info) in &rapid_accounts {
            let entry = data.entry(acc.clone()).or_insert_with(Entry::new);
            entry.score += config.score_rapid_movement;
            entry.patterns.insert("rapid_movement".to_string());
            entry.min_dwell_minutes = Some(info.min_dwell_minutes);
        }

        // 7. Structuring bonus.
        for (acc, info) in &structuring_accounts {
            let entry = data.entry(acc.clone()).or_insert_with(Entry::new);
            entry.score += config.score_structuring;
            entry.patterns.insert("structuring".to_string());
            entry.structured_tx_count = Some(info.structured_tx_count);
            entry.avg_amount = Some(info.avg_amount);
        }

        // 8. Finalize.
        let mut out = HashMap::with_capacity(data.len());
        for (acc, entry) in data {
            let score = (entry.score * 10.0).round() / 10.0;
            let score = score.min(100.0);
            let patterns: Vec<String> = entry.patterns.into_iter().collect();
            let risk_explanation = build_risk_explanation(
                &patterns,
                &entry.ring_ids,
                entry.min_dwell_minutes,
                entry.structured_tx_count,
                entry.avg_amount,
                config,
            );
            out.insert(
                acc,
                AccountScore {
                    score,
                    patterns,
                    ring_ids: entry.ring_ids,
                    risk_explanation,
                },
            );
        }

        tracing::info!(accounts = out.len(), "scoring complete");
        out
    }
}

fn pattern_base_score(pattern: Pattern, config: &EngineConfig) -> f64 {
    match pattern {
        Pattern::CycleLength3 => config.score_cycle_3,
        Pattern::CycleLength4 => config.score_cycle_4,
        Pattern::CycleLength5 => config.score_cycle_5,
        Pattern::FanIn => config.score_fan_in,
        Pattern::FanOut => config.score_fan_out,
        Pattern::ShellChain => config.score_shell,
        Pattern::RoundTrip => config.score_round_trip,
    }
}

fn velocity_accounts(table: &TransactionTable, config: &EngineConfig) -> HashSet<String> {
    let rows = table.rows();
    if rows.is_empty() {
        return HashSet::new();
    }
    let min_ts = rows.iter().map(|t| t.timestamp).min().unwrap();
    let max_ts = rows.iter().map(|t| t.timestamp).max().unwrap();
    let span_days = ((max_ts - min_ts).num_milliseconds() as f64 / 86_400_000.0).max(1.0);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tx in rows {
        *counts.entry(tx.sender_id.as_str()).or_insert(0) += 1;
        *counts.entry(tx.receiver_id.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count as f64 / span_days > config.high_velocity_tx_per_day)
        .map(|(acc, _)| acc.to_string())
        .collect()
}

/// Brandes' algorithm for normalized betweenness centrality on a directed,
/// unweighted graph: BFS shortest-path counting from every source, then a
/// back-propagation accumulation pass. O(V*E).
fn betweenness_centrality(graph: &Graph) -> HashMap<String, f64> {
    let mut nodes: Vec<&str> = graph.node_ids().collect();
    nodes.sort_unstable();
    let n = nodes.len();
    if n < 3 {
        return HashMap::new();
    }
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    let mut centrality = vec![0.0_f64; n];

    for s_idx in 0..n {
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();

        sigma[s_idx] = 1.0;
        dist[s_idx] = 0;
        queue.push_back(s_idx);

        while let Some(v_idx) = queue.pop_front() {
            order.push(v_idx);
            for w in graph.successors(nodes[v_idx]) {
                let w_idx = index[w];
                if dist[w_idx] < 0 {
                    dist[w_idx] = dist[v_idx] + 1;
                    queue.push_back(w_idx);
                }
                if dist[w_idx] == dist[v_idx] + 1 {
                    sigma[w_idx] += sigma[v_idx];
                    preds[w_idx].push(v_idx);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w_idx) = order.pop() {
            for &v_idx in &preds[w_idx] {
                delta[v_idx] += (sigma[v_idx] / sigma[w_idx]) * (1.0 + delta[w_idx]);
            }
            if w_idx != s_idx {
                centrality[w_idx] += delta[w_idx];
            }
        }
    }

    let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
    nodes
        .into_iter()
        .enumerate()
        .map(|(i, acc)| (acc.to_string(), centrality[i] * scale))
        .collect()
}

const PATTERN_EXPLANATIONS: &[(&str, &str)] = &[
    ("cycle_length_3", "Participates in a 3-node circular fund routing cycle"),
    ("cycle_length_4", "Participates in a 4-node circular fund routing cycle"),
    ("cycle_length_5", "Participates in a 5-node circular fund routing cycle"),
    ("shell_chain", "Part of a layered chain through low-activity shell accounts"),
    ("round_trip", "Bi-directional flow with similar amounts (possible round-tripping)"),
    ("amount_anomaly", "Transaction amounts deviate >3\u{3c3} from account's mean"),
    ("rapid_movement", "Receives and forwards funds within minutes (pass-through)"),
    ("structuring", "Multiple transactions just below reporting threshold ($10K)"),
    ("high_velocity", "Unusually high transaction rate (>5 tx/day average)"),
    ("multi_ring", "Belongs to multiple distinct fraud rings"),
];

fn build_risk_explanation(
    patterns: &[String],
    ring_ids: &[String],
    min_dwell_minutes: Option<f64>,
    structured_tx_count: Option<usize>,
    avg_amount: Option<f64>,
    config: &EngineConfig,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    for p in patterns {
        if p == "fan_in" {
            parts.push(format!(
                "Receives from {}+ unique senders within {} hours (aggregator pattern)",
                config.fan_threshold, config.smurf_window_hours
            ));
        } else if p == "fan_out" {
            parts.push(format!(
                "Sends to {}+ unique receivers within {} hours (disperser pattern)",
                config.fan_threshold, config.smurf_window_hours
            ));
        } else if let Some((_, text)) = PATTERN_EXPLANATIONS.iter().find(|(k, _)| k == p) {
            parts.push(text.to_string());
        }
    }

    if ring_ids.len() > 1 {
        parts.push(format!(
            "Connected to {} fraud rings: {}",
            ring_ids.len(),
            ring_ids.join(", ")
        ));
    } else if let Some(first) = ring_ids.first() {
        parts.push(format!("Member of {}", first));
    }

    if let Some(dwell) = min_dwell_minutes {
        parts.push(format!("Fastest pass-through: {} min", dwell));
    }
    if let Some(count) = structured_tx_count {
        parts.push(format!(
            "{} transactions in ${:.0} range (just below $10K threshold)",
            count,
            avg_amount.unwrap_or(0.0)
        ));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{}.", parts.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::ring::RawRing;
    use crate::transaction::Transaction;
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
    fn cycle_members_each_score_base_points() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 90.0, 1),
            tx("T3", "C", "A", 80.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let raw = RawRing::cycle(vec!["A".into(), "B".into(), "C".into()], 3);
        let rings = crate::ring::RingMerger::merge(vec![raw], vec![], vec![], vec![]);

        let scores = Scorer::score(&rings, &table, &graph, &config);
        // All three nodes sit symmetrically on the 3-cycle, so each gets the
        // same (maximal) normalized betweenness centrality bonus on top of
        // the base cycle_length_3 contribution: 35 + 10 = 45.
        for acc in ["A", "B", "C"] {
            let s = scores.get(acc).unwrap();
            assert_eq!(s.score, 45.0);
            assert_eq!(s.patterns, vec!["cycle_length_3".to_string()]);
            assert_eq!(s.ring_ids, vec!["RING_001".to_string()]);
        }
    }

    #[test]
    fn fan_in_only_hub_gets_label() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "S1", "HUB", 10.0, 0),
            tx("T2", "S2", "HUB", 10.0, 1),
            tx("T3", "S3", "HUB", 10.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let raw = RawRing::fan(
            vec!["S1".into(), "S2".into(), "S3".into(), "HUB".into()],
            "HUB".into(),
            crate::ring::HubType::Aggregator,
        );
        let rings = crate::ring::RingMerger::merge(vec![], vec![raw], vec![], vec![]);

        let scores = Scorer::score(&rings, &table, &graph, &config);
        assert_eq!(scores.get("HUB").unwrap().patterns, vec!["fan_in".to_string()]);
        assert_eq!(scores.get("S1").unwrap().patterns.len(), 0);
        assert_eq!(scores.get("S1").unwrap().score, 0.0);
    }

    #[test]
    fn shell_chain_interior_scores_full_endpoints_score_half() {
        let mut config = EngineConfig::default();
        config.centrality_max_nodes = 0; // isolate the shell contribution from the centrality bonus
        let rows = vec![
            tx("T1", "SRC", "X", 100.0, 0),
            tx("T2", "X", "Y", 100.0, 1),
            tx("T3", "Y", "DST", 100.0, 2),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let graph = GraphBuilder::build(&table);
        let raw = RawRing::shell_chain(
            vec!["X".into(), "Y".into()],
            3,
            "SRC".into(),
            "DST".into(),
        );
        let rings = crate::ring::RingMerger::merge(vec![], vec![], vec![raw], vec![]);

        let scores = Scorer::score(&rings, &table, &graph, &config);
        let x = scores.get("X").unwrap();
        let src = scores.get("SRC").unwrap();
        assert!(x.patterns.contains(&"shell_chain".to_string()));
        assert!(!src.patterns.contains(&"shell_chain".to_string()));
        assert_eq!(x.score, config.score_shell);
        assert_eq!(src.score, config.score_shell * 0.5);
        assert_eq!(src.ring_ids, x.ring_ids);
    }
}
