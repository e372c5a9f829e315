//! Smurfing (fan-in / fan-out) detection.
//!
//! Grounded on `original_source/backend/app/smurf_detector.py`: a two-pointer
//! sliding window over each hub's sorted transaction timestamps finds any
//! `SMURF_WINDOW_HOURS` window containing `FAN_THRESHOLD` or more distinct
//! counterparties. Two semantic false-positive filters run first: receivers
//! whose incoming amounts have high coefficient of variation look like retail
//! merchants (excluded from fan-in), and senders whose outgoing transactions
//! all land within `PAYROLL_BATCH_SECONDS` of each other look like payroll
//! batch runs (excluded from fan-out).

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::config::EngineConfig;
use crate::ring::{HubType, RawRing};
use crate::transaction::{Transaction, TransactionTable};

pub struct SmurfDetector;

impl SmurfDetector {
    pub fn detect(table: &TransactionTable, config: &EngineConfig) -> Vec<RawRing> {
        let rows = table.rows();
        let excluded_fan_in = merchant_receivers(rows, config);
        let excluded_fan_out = payroll_senders(rows, config);

        let window = Duration::hours(config.smurf_window_hours);
        let mut rings = Vec::new();

        let mut by_receiver: HashMap<&str, Vec<&Transaction>> = HashMap::new();
        let mut by_sender: HashMap<&str, Vec<&Transaction>> = HashMap::new();
        for tx in rows {
            by_receiver
                .entry(tx.receiver_id.as_str())
                .or_default()
                .push(tx);
            by_sender.entry(tx.sender_id.as_str()).or_default().push(tx);
        }

        let mut receivers: Vec<&str> = by_receiver.keys().copied().collect();
        receivers.sort_unstable();
        for receiver in receivers {
            if excluded_fan_in.contains(receiver) {
                continue;
            }
            let mut txs = by_receiver[receiver].clone();
            txs.sort_by_key(|t| t.timestamp);
            let times: Vec<_> = txs.iter().map(|t| t.timestamp).collect();
            let counterparts: Vec<&str> = txs.iter().map(|t| t.sender_id.as_str()).collect();

            if let Some(window_senders) =
                sliding_window_unique(&times, &counterparts, receiver, window, config.fan_threshold)
            {
                let mut members: Vec<String> =
                    window_senders.iter().map(|s| s.to_string()).collect();
                members.sort();
                members.push(receiver.to_string());
                rings.push(RawRing::fan(members, receiver.to_string(), HubType::Aggregator));
            }
        }

        let mut senders: Vec<&str> = by_sender.keys().copied().collect();
        senders.sort_unstable();
        for sender in senders {
            if excluded_fan_out.contains(sender) {
                continue;
            }
            let mut txs = by_sender[sender].clone();
            txs.sort_by_key(|t| t.timestamp);
            let times: Vec<_> = txs.iter().map(|t| t.timestamp).collect();
            let counterparts: Vec<&str> = txs.iter().map(|t| t.receiver_id.as_str()).collect();

            if let Some(window_receivers) =
                sliding_window_unique(&times, &counterparts, sender, window, config.fan_threshold)
            {
                let mut members = vec![sender.to_string()];
                let mut rest: Vec<String> =
                    window_receivers.iter().map(|s| s.to_string()).collect();
                rest.sort();
                members.extend(rest);
                rings.push(RawRing::fan(members, sender.to_string(), HubType::Disperser));
            }
        }

        tracing::info!(rings = rings.len(), "smurfing detection");
        rings
    }
}

fn merchant_receivers<'a>(rows: &'a [Transaction], config: &EngineConfig) -> HashSet<&'a str> {
    let mut by_receiver: HashMap<&str, Vec<f64>> = HashMap::new();
    for tx in rows {
        by_receiver
            .entry(tx.receiver_id.as_str())
            .or_default()
            .push(tx.amount);
    }
    let mut excluded = HashSet::new();
    for (receiver, amounts) in by_receiver {
        if amounts.len() < 2 {
            continue;
        }
        let mean: f64 = amounts.iter().sum::<f64>() / amounts.len() as f64;
        if mean == 0.0 {
            continue;
        }
        let variance: f64 =
            amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
        let cv = variance.sqrt() / mean;
        if cv > config.merchant_amount_cv_threshold {
            excluded.insert(receiver);
        }
    }
    excluded
}

fn payroll_senders<'a>(rows: &'a [Transaction], config: &EngineConfig) -> HashSet<&'a str> {
    let mut by_sender: HashMap<&str, Vec<chrono::DateTime<chrono::Utc>>> = HashMap::new();
    for tx in rows {
        by_sender
            .entry(tx.sender_id.as_str())
            .or_default()
            .push(tx.timestamp);
    }
    let mut excluded = HashSet::new();
    for (sender, mut times) in by_sender {
        if times.len() < 2 {
            continue;
        }
        times.sort();
        let span = (*times.last().unwrap() - *times.first().unwrap())
            .num_milliseconds() as f64
            / 1000.0;
        if span <= config.payroll_batch_seconds {
            excluded.insert(sender);
        }
    }
    excluded
}

/// Two-pointer sliding window: finds any window where the number of distinct
/// counterparties (excluding `hub`) reaches `threshold`. Returns the set of
/// counterparties in the first such window found, or `None`.
fn sliding_window_unique<'a>(
    sorted_times: &[chrono::DateTime<chrono::Utc>],
    sorted_counterparts: &[&'a str],
    hub: &str,
    window: Duration,
    threshold: usize,
) -> Option<HashSet<&'a str>> {
    let n = sorted_times.len();
    if n < threshold {
        return None;
    }

    let mut left = 0usize;
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for right in 0..n {
        let cp = sorted_counterparts[right];
        if cp != hub {
            *counts.entry(cp).or_insert(0) += 1;
        }

        while sorted_times[right] - sorted_times[left] > window {
            let lcp = sorted_counterparts[left];
            if lcp != hub {
                if let Some(c) = counts.get_mut(lcp) {
                    *c -= 1;
                    if *c == 0 {
                        counts.remove(lcp);
                    }
                }
            }
            left += 1;
        }

        if counts.len() >= threshold {
            return Some(counts.keys().copied().collect());
        }
    }

    None
}
