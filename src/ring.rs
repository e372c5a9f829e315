//! Fraud ring representation, merging, and ID assignment.
//!
//! Grounded on `original_source/backend/app/utils.py`. The merge step is
//! promoted from the Python original's order-dependent seed-only pairwise
//! pass to a connected-components merge over the "shares >= 50% of the
//! smaller ring's members" relation, per spec.md §9 — two rings that each
//! independently overlap a third but not each other must end up in the same
//! merged ring, which a single greedy left-to-right pass can miss depending
//! on detection order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

const MERGE_OVERLAP_RATIO: f64 = 0.5;

/// The pattern a ring (or ring membership) was detected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    CycleLength3,
    CycleLength4,
    CycleLength5,
    FanIn,
    FanOut,
    RoundTrip,
    ShellChain,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::CycleLength3 => "cycle_length_3",
            Pattern::CycleLength4 => "cycle_length_4",
            Pattern::CycleLength5 => "cycle_length_5",
            Pattern::FanIn => "fan_in",
            Pattern::FanOut => "fan_out",
            Pattern::RoundTrip => "round_trip",
            Pattern::ShellChain => "shell_chain",
        }
    }

    /// Merge priority, lowest index wins as the primary pattern of a merged ring.
    fn priority() -> &'static [Pattern] {
        &[
            Pattern::CycleLength3,
            Pattern::CycleLength4,
            Pattern::CycleLength5,
            Pattern::FanIn,
            Pattern::FanOut,
            Pattern::RoundTrip,
            Pattern::ShellChain,
        ]
    }
}

/// Who plays the hub role in a smurfing ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubType {
    Aggregator,
    Disperser,
}

/// A single detector's raw finding, before cross-detector merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRing {
    pub members: Vec<String>,
    pub pattern: Pattern,
    pub hub: Option<String>,
    pub hub_type: Option<HubType>,
    /// Populated only for `ShellChain`: the pass-through accounts, excluding
    /// the path's source and destination. Identical to `members` for a raw
    /// shell ring; kept as its own field because the scorer needs to name it.
    pub shell_intermediaries: Vec<String>,
    /// Populated only for `ShellChain`: the path's entry and exit accounts,
    /// which are scored at half weight but are not ring members.
    pub shell_entry: Option<String>,
    pub shell_exit: Option<String>,
    pub forward_amount: Option<f64>,
    pub reverse_amount: Option<f64>,
    pub similarity: Option<f64>,
    pub cycle_length: Option<usize>,
    pub chain_length: Option<usize>,
}

impl RawRing {
    pub fn cycle(members: Vec<String>, length: usize) -> Self {
        let pattern = match length {
            3 => Pattern::CycleLength3,
            4 => Pattern::CycleLength4,
            _ => Pattern::CycleLength5,
        };
        Self {
            members,
            pattern,
            hub: None,
            hub_type: None,
            shell_intermediaries: Vec::new(),
            shell_entry: None,
            shell_exit: None,
            forward_amount: None,
            reverse_amount: None,
            similarity: None,
            cycle_length: Some(length),
            chain_length: None,
        }
    }

    pub fn fan(members: Vec<String>, hub: String, hub_type: HubType) -> Self {
        let pattern = match hub_type {
            HubType::Aggregator => Pattern::FanIn,
            HubType::Disperser => Pattern::FanOut,
        };
        Self {
            members,
            pattern,
            hub: Some(hub),
            hub_type: Some(hub_type),
            shell_intermediaries: Vec::new(),
            shell_entry: None,
            shell_exit: None,
            forward_amount: None,
            reverse_amount: None,
            similarity: None,
            cycle_length: None,
            chain_length: None,
        }
    }

    /// `intermediaries` (the shell interiors) become this ring's `members`,
    /// per spec: a shell_chain ring's member list is the shell interiors
    /// only. `entry`/`exit` are the path's non-shell endpoints, carried
    /// separately so the scorer can award them their reduced, unlabeled
    /// contribution without counting them as ring members.
    pub fn shell_chain(
        intermediaries: Vec<String>,
        chain_length: usize,
        entry: String,
        exit: String,
    ) -> Self {
        Self {
            members: intermediaries.clone(),
            pattern: Pattern::ShellChain,
            hub: None,
            hub_type: None,
            shell_intermediaries: intermediaries,
            shell_entry: Some(entry),
            shell_exit: Some(exit),
            forward_amount: None,
            reverse_amount: None,
            similarity: None,
            cycle_length: None,
            chain_length: Some(chain_length),
        }
    }

    pub fn round_trip(members: Vec<String>, forward_amount: f64, reverse_amount: f64, similarity: f64) -> Self {
        Self {
            members,
            pattern: Pattern::RoundTrip,
            hub: None,
            hub_type: None,
            shell_intermediaries: Vec::new(),
            shell_entry: None,
            shell_exit: None,
            forward_amount: Some(forward_amount),
            reverse_amount: Some(reverse_amount),
            similarity: Some(similarity),
            cycle_length: None,
            chain_length: None,
        }
    }
}

/// A ring after cross-detector merging, with a stable assigned ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id: String,
    pub members: Vec<String>,
    pub pattern: Pattern,
    pub merged_patterns: Vec<Pattern>,
    pub sources: Vec<RawRing>,
}

fn should_merge(a: &HashSet<&String>, b: &HashSet<&String>) -> bool {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return false;
    }
    let overlap = a.intersection(b).count();
    (overlap as f64 / smaller as f64) >= MERGE_OVERLAP_RATIO
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Merges raw detector findings into deduplicated rings with stable IDs.
pub struct RingMerger;

impl RingMerger {
    /// Combine in priority order (cycles first, highest confidence), merge
    /// overlapping rings via connected components, then assign `RING_NNN` IDs
    /// in first-occurrence order.
    pub fn merge(
        cycle_rings: Vec<RawRing>,
        smurf_rings: Vec<RawRing>,
        shell_rings: Vec<RawRing>,
        round_trip_rings: Vec<RawRing>,
    ) -> Vec<Ring> {
        let mut combined = cycle_rings;
        combined.extend(smurf_rings);
        combined.extend(shell_rings);
        combined.extend(round_trip_rings);

        if combined.is_empty() {
            return Vec::new();
        }

        let member_sets: Vec<HashSet<&String>> = combined
            .iter()
            .map(|r| r.members.iter().collect())
            .collect();

        let mut uf = UnionFind::new(combined.len());
        for i in 0..combined.len() {
            for j in (i + 1)..combined.len() {
                if should_merge(&member_sets[i], &member_sets[j]) {
                    uf.union(i, j);
                }
            }
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..combined.len() {
            let root = uf.find(i);
            groups.entry(root).or_default().push(i);
        }

        // Preserve first-occurrence order across groups for deterministic IDs.
        let mut group_order: Vec<usize> = Vec::new();
        let mut seen_roots = HashSet::new();
        for i in 0..combined.len() {
            let root = uf.find(i);
            if seen_roots.insert(root) {
                group_order.push(root);
            }
        }

        let mut rings = Vec::with_capacity(group_order.len());
        for (idx, root) in group_order.into_iter().enumerate() {
            let indices = &groups[&root];
            let mut members: HashSet<String> = HashSet::new();
            let mut patterns: HashSet<Pattern> = HashSet::new();
            let mut sources = Vec::with_capacity(indices.len());
            for &i in indices {
                members.extend(combined[i].members.iter().cloned());
                patterns.insert(combined[i].pattern);
                sources.push(combined[i].clone());
            }

            let mut sorted_members: Vec<String> = members.into_iter().collect();
            sorted_members.sort();

            let primary = Pattern::priority()
                .iter()
                .find(|p| patterns.contains(p))
                .copied()
                .unwrap_or(sources[0].pattern);

            let mut merged_patterns: Vec<Pattern> = patterns.into_iter().collect();
            merged_patterns.sort_by_key(|p| p.as_str());

            rings.push(Ring {
                ring_id: format!("RING_{:03}", idx + 1),
                members: sorted_members,
                pattern: primary,
                merged_patterns,
                sources,
            });
        }

        tracing::info!(raw = combined.len(), merged = rings.len(), "ring merge");
        rings
    }
}
