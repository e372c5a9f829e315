//! Directed, weighted transaction graph with cached strongly-connected
//! components.
//!
//! Grounded on `network_analysis.rs` (`TransactionNode` /
//! `TransactionEdge` / `TransactionGraph`), generalized to the full node/edge
//! aggregate shape spec.md §3/§4.1 require, with the exact semantics (including
//! the documented double-counting of `unique_counterparties`) taken from
//! `original_source/backend/app/graph_builder.py`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionTable};

/// Per-account aggregate statistics, computed once at build time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStats {
    pub total_sent: f64,
    pub total_received: f64,
    pub net_flow: f64,
    pub sent_count: usize,
    pub received_count: usize,
    pub tx_count: usize,
    pub avg_sent: f64,
    pub avg_received: f64,
    /// Sum of distinct receivers-as-sender and distinct senders-as-receiver.
    /// Double-counts accounts that appear as counterparty on both sides —
    /// accepted as-is per spec.md §3.
    pub unique_counterparties: usize,
    pub first_tx: DateTime<Utc>,
    pub last_tx: DateTime<Utc>,
}

/// Per-directed-edge aggregate, one per ordered `(sender, receiver)` pair
/// with at least one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeStats {
    pub total_amount: f64,
    pub avg_amount: f64,
    pub tx_count: usize,
    pub first_tx: DateTime<Utc>,
    pub last_tx: DateTime<Utc>,
    /// Originating transactions, ordered by timestamp ascending.
    pub transactions: Vec<Transaction>,
}

/// The directed, weighted account graph built from a validated transaction
/// table. Immutable after construction; the cached SCC list is written once
/// by [`GraphBuilder::build`] and read-only thereafter.
pub struct Graph {
    nodes: HashMap<String, NodeStats>,
    edges: HashMap<(String, String), EdgeStats>,
    /// adjacency list: account -> distinct accounts it has sent to
    successors: HashMap<String, HashSet<String>>,
    /// adjacency list: account -> distinct accounts it has received from
    predecessors: HashMap<String, HashSet<String>>,
    sccs: Vec<Vec<String>>,
}

impl Graph {
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn node(&self, id: &str) -> Option<&NodeStats> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &HashMap<String, NodeStats> {
        &self.nodes
    }

    pub fn edges(&self) -> &HashMap<(String, String), EdgeStats> {
        &self.edges
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeStats> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.contains_key(&(from.to_string(), to.to_string()))
    }

    pub fn successors(&self, account: &str) -> impl Iterator<Item = &str> {
        self.successors
            .get(account)
            .into_iter()
            .flat_map(|s| s.iter().map(|a| a.as_str()))
    }

    pub fn predecessors(&self, account: &str) -> impl Iterator<Item = &str> {
        self.predecessors
            .get(account)
            .into_iter()
            .flat_map(|s| s.iter().map(|a| a.as_str()))
    }

    pub fn in_degree(&self, account: &str) -> usize {
        self.predecessors.get(account).map_or(0, |s| s.len())
    }

    pub fn out_degree(&self, account: &str) -> usize {
        self.successors.get(account).map_or(0, |s| s.len())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Strongly connected components, computed once at build time.
    pub fn sccs(&self) -> &[Vec<String>] {
        &self.sccs
    }

    /// The set of accounts belonging to an SCC of size > 1 (true cycle
    /// participants, as opposed to trivial single-node SCCs).
    pub fn nontrivial_scc_members(&self) -> HashSet<&str> {
        self.sccs
            .iter()
            .filter(|scc| scc.len() > 1)
            .flat_map(|scc| scc.iter().map(|a| a.as_str()))
            .collect()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Builds a [`Graph`] from a validated transaction table via two grouped
/// aggregations (by sender, by receiver) for node stats, and one grouped
/// aggregation (by ordered pair) for edge stats.
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(table: &TransactionTable) -> Graph {
        let rows = table.rows();

        let mut sent_sum: HashMap<&str, f64> = HashMap::new();
        let mut sent_cnt: HashMap<&str, usize> = HashMap::new();
        let mut recv_sum: HashMap<&str, f64> = HashMap::new();
        let mut recv_cnt: HashMap<&str, usize> = HashMap::new();
        let mut sent_cp: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut recv_cp: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut sent_first: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut sent_last: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut recv_first: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut recv_last: HashMap<&str, DateTime<Utc>> = HashMap::new();

        let mut successors: HashMap<String, HashSet<String>> = HashMap::new();
        let mut predecessors: HashMap<String, HashSet<String>> = HashMap::new();
        let mut edge_groups: HashMap<(&str, &str), Vec<&Transaction>> = HashMap::new();

        for tx in rows {
            let s = tx.sender_id.as_str();
            let r = tx.receiver_id.as_str();

            *sent_sum.entry(s).or_insert(0.0) += tx.amount;
            *sent_cnt.entry(s).or_insert(0) += 1;
            *recv_sum.entry(r).or_insert(0.0) += tx.amount;
            *recv_cnt.entry(r).or_insert(0) += 1;
            sent_cp.entry(s).or_default().insert(r);
            recv_cp.entry(r).or_default().insert(s);

            sent_first
                .entry(s)
                .and_modify(|t| *t = (*t).min(tx.timestamp))
                .or_insert(tx.timestamp);
            sent_last
                .entry(s)
                .and_modify(|t| *t = (*t).max(tx.timestamp))
                .or_insert(tx.timestamp);
            recv_first
                .entry(r)
                .and_modify(|t| *t = (*t).min(tx.timestamp))
                .or_insert(tx.timestamp);
            recv_last
                .entry(r)
                .and_modify(|t| *t = (*t).max(tx.timestamp))
                .or_insert(tx.timestamp);

            successors
                .entry(s.to_string())
                .or_default()
                .insert(r.to_string());
            predecessors
                .entry(r.to_string())
                .or_default()
                .insert(s.to_string());

            edge_groups.entry((s, r)).or_default().push(tx);
        }

        let mut all_accounts: HashSet<&str> = HashSet::new();
        for tx in rows {
            all_accounts.insert(tx.sender_id.as_str());
            all_accounts.insert(tx.receiver_id.as_str());
        }

        let mut nodes = HashMap::with_capacity(all_accounts.len());
        for &acc in &all_accounts {
            let sc = *sent_cnt.get(acc).unwrap_or(&0);
            let rc = *recv_cnt.get(acc).unwrap_or(&0);
            let ts = *sent_sum.get(acc).unwrap_or(&0.0);
            let tr = *recv_sum.get(acc).unwrap_or(&0.0);
            let sa = if sc > 0 { ts / sc as f64 } else { 0.0 };
            let ra = if rc > 0 { tr / rc as f64 } else { 0.0 };
            let scp = sent_cp.get(acc).map_or(0, |s| s.len());
            let rcp = recv_cp.get(acc).map_or(0, |s| s.len());

            let first_candidates: Vec<DateTime<Utc>> = [sent_first.get(acc), recv_first.get(acc)]
                .into_iter()
                .flatten()
                .copied()
                .collect();
            let last_candidates: Vec<DateTime<Utc>> = [sent_last.get(acc), recv_last.get(acc)]
                .into_iter()
                .flatten()
                .copied()
                .collect();
            let first_tx = first_candidates
                .into_iter()
                .min()
                .expect("account must have at least one transaction");
            let last_tx = last_candidates
                .into_iter()
                .max()
                .expect("account must have at least one transaction");

            nodes.insert(
                acc.to_string(),
                NodeStats {
                    total_sent: round2(ts),
                    total_received: round2(tr),
                    net_flow: round2(tr - ts),
                    sent_count: sc,
                    received_count: rc,
                    tx_count: sc + rc,
                    avg_sent: round2(sa),
                    avg_received: round2(ra),
                    unique_counterparties: scp + rcp,
                    first_tx,
                    last_tx,
                },
            );
        }

        let mut edges = HashMap::with_capacity(edge_groups.len());
        for ((s, r), mut txs) in edge_groups {
            txs.sort_by_key(|t| t.timestamp);
            let total: f64 = txs.iter().map(|t| t.amount).sum();
            let count = txs.len();
            let first_tx = txs.first().unwrap().timestamp;
            let last_tx = txs.last().unwrap().timestamp;
            edges.insert(
                (s.to_string(), r.to_string()),
                EdgeStats {
                    total_amount: round2(total),
                    avg_amount: round2(total / count as f64),
                    tx_count: count,
                    first_tx,
                    last_tx,
                    transactions: txs.into_iter().cloned().collect(),
                },
            );
        }

        let sccs = compute_sccs(&nodes, &edges);

        tracing::info!(
            nodes = nodes.len(),
            edges = edges.len(),
            sccs = sccs.len(),
            "graph built"
        );

        Graph {
            nodes,
            edges,
            successors,
            predecessors,
            sccs,
        }
    }
}

fn compute_sccs(
    nodes: &HashMap<String, NodeStats>,
    edges: &HashMap<(String, String), EdgeStats>,
) -> Vec<Vec<String>> {
    let mut pg = DiGraph::<String, ()>::new();
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());
    for acc in nodes.keys() {
        let idx = pg.add_node(acc.clone());
        index_of.insert(acc.as_str(), idx);
    }
    for (from, to) in edges.keys() {
        if let (Some(&a), Some(&b)) = (index_of.get(from.as_str()), index_of.get(to.as_str())) {
            pg.add_edge(a, b, ());
        }
    }

    tarjan_scc(&pg)
        .into_iter()
        .map(|scc| scc.into_iter().map(|idx| pg[idx].clone()).collect())
        .collect()
}
